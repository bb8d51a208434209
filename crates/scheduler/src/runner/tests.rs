use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tiergate_core::config::SchedulerSettings;
use tokio::sync::{broadcast, Semaphore};

use crate::clock::ManualClock;
use crate::error::SchedulerError;
use crate::events::SchedulerEvent;
use crate::group::{GroupOptions, GroupStatus};
use crate::mitigation::{spawn_mitigation_listener, MitigationSignal};
use crate::routing::RoutingTable;
use crate::runner::Scheduler;
use crate::task::{handler_fn, HandlerError, SharedHandler, TaskContext, TaskOptions};
use crate::types::{Priority, ResourceTier, RiskLevel, TaskClass, TaskStatus};

fn scheduler_with(settings: SchedulerSettings) -> (Scheduler, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_000));
    let scheduler = Scheduler::with_clock(&settings, RoutingTable::builtin(), clock.clone());
    (scheduler, clock)
}

fn scheduler() -> (Scheduler, Arc<ManualClock>) {
    scheduler_with(SchedulerSettings::default())
}

/// Handler that blocks until a permit is released on `gate`.
fn gated(gate: Arc<Semaphore>) -> SharedHandler {
    handler_fn(move |_ctx: TaskContext| {
        let gate = gate.clone();
        async move {
            match gate.acquire().await {
                Ok(permit) => {
                    permit.forget();
                    Ok(json!({ "done": true }))
                }
                Err(e) => Err(HandlerError::failed(e.to_string())),
            }
        }
    })
}

fn counting_failure(attempts: Arc<AtomicUsize>) -> SharedHandler {
    handler_fn(move |_ctx: TaskContext| {
        let attempts = attempts.clone();
        async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err::<serde_json::Value, _>(HandlerError::failed("provider returned 503"))
        }
    })
}

async fn wait_for(mut cond: impl FnMut() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

fn batch(task_type: &str) -> TaskOptions {
    TaskOptions::new(task_type).class(TaskClass::Batch)
}

#[test]
fn submit_assigns_default_tier() {
    let (s, _) = scheduler();
    let task = s.submit(TaskOptions::new("summarize")).unwrap();
    assert_eq!(task.resource_tier, ResourceTier::S);
    assert_eq!(task.status, TaskStatus::Queued);
    assert_eq!(s.stats().total_queued, 1);
    assert_eq!(s.status().queues.batch.queued, 1);
}

#[test]
fn critical_priority_routes_to_max_tier() {
    let (s, _) = scheduler();
    let task = s.submit(TaskOptions::new("code_generation").priority(Priority::Critical)).unwrap();
    assert_eq!(task.resource_tier, ResourceTier::L);
    let task = s.submit(TaskOptions::new("code_generation").priority(Priority::Background)).unwrap();
    assert_eq!(task.resource_tier, ResourceTier::S);
}

#[test]
fn request_drain_coalesces() {
    let (s, _) = scheduler();
    s.request_drain();
    s.request_drain();
    s.request_drain();
    assert!(s.inner.drain_requested.load(Ordering::SeqCst));
}

#[tokio::test]
async fn drain_respects_class_limits() {
    let (s, _) = scheduler();
    let gate = Arc::new(Semaphore::new(0));
    for _ in 0..5 {
        s.submit(batch("data_processing").handler(gated(gate.clone()))).unwrap();
    }
    s.drain();
    let status = s.status();
    assert_eq!(status.queues.batch.running, 2);
    assert_eq!(status.queues.batch.queued, 3);
    assert_eq!(status.stats.total_started, 2);

    // A second pass with no capacity admits nothing.
    s.drain();
    assert_eq!(s.status().queues.batch.running, 2);
    gate.add_permits(10);
}

#[tokio::test]
async fn interactive_is_admitted_first() {
    let (s, _) = scheduler();
    let gate = Arc::new(Semaphore::new(0));
    let mut rx = s.subscribe();
    s.submit(batch("data_processing").handler(gated(gate.clone()))).unwrap();
    s.submit(
        TaskOptions::new("classify")
            .class(TaskClass::Interactive)
            .handler(gated(gate.clone())),
    ).unwrap();
    s.drain();

    let mut started = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let SchedulerEvent::TaskStarted(summary) = event {
            started.push(summary.task_class);
        }
    }
    assert_eq!(started, vec![TaskClass::Interactive, TaskClass::Batch]);
    gate.add_permits(10);
}

#[tokio::test]
async fn higher_priority_is_admitted_first() {
    let (s, _) = scheduler();
    s.adjust_concurrency(TaskClass::Batch, 1);
    let gate = Arc::new(Semaphore::new(0));
    s.submit(batch("low").priority(Priority::Low).handler(gated(gate.clone()))).unwrap();
    s.submit(batch("normal").handler(gated(gate.clone()))).unwrap();
    s.submit(batch("critical").priority(Priority::Critical).handler(gated(gate.clone()))).unwrap();
    s.drain();

    let listing = s.queues();
    assert_eq!(listing.batch.running.len(), 1);
    assert_eq!(listing.batch.running[0].task_type, "critical");
    let queued: Vec<_> = listing.batch.queued.iter().map(|t| t.task_type.as_str()).collect();
    assert_eq!(queued, vec!["normal", "low"]);
    gate.add_permits(10);
}

#[tokio::test]
async fn task_without_handler_completes_with_stub() {
    let (s, _) = scheduler();
    let task = s.submit(TaskOptions::new("route")).unwrap();
    s.drain();
    wait_for(|| s.stats().total_completed == 1).await;

    let done = s.find_task(&task.id).unwrap();
    assert_eq!(done.status, TaskStatus::Completed);
    assert!(done.result.unwrap()["message"].is_string());
    assert!(done.error.is_none());
    assert_eq!(s.status().queues.batch.running, 0);
}

#[tokio::test]
async fn registered_handler_is_used() {
    let (s, _) = scheduler();
    s.register_handler(
        "summarize",
        handler_fn(|ctx: TaskContext| async move {
            Ok::<_, HandlerError>(json!({ "tier": ctx.tier }))
        }),
    );
    let task = s.submit(TaskOptions::new("summarize")).unwrap();
    s.drain();
    wait_for(|| s.stats().total_completed == 1).await;
    let done = s.find_task(&task.id).unwrap();
    assert_eq!(done.result.unwrap()["tier"], "S");
}

#[tokio::test]
async fn averages_follow_the_clock() {
    let (s, clock) = scheduler();
    let gate = Arc::new(Semaphore::new(0));
    s.submit(batch("data_processing").handler(gated(gate.clone()))).unwrap();
    clock.advance(200);
    s.drain();
    clock.advance(300);
    gate.add_permits(1);
    wait_for(|| s.stats().total_completed == 1).await;

    let stats = s.stats();
    assert_eq!(stats.avg_wait_ms, 200);
    assert_eq!(stats.avg_exec_ms, 300);
    let history = s.history(20);
    assert_eq!(history[0].wait_ms, 200);
    assert_eq!(history[0].exec_ms, 300);
}

#[tokio::test]
async fn failing_task_retries_twice_then_fails() {
    let (s, _) = scheduler();
    let runner = s.start();
    let attempts = Arc::new(AtomicUsize::new(0));
    let task = s.submit(batch("code_review").handler(counting_failure(attempts.clone()))).unwrap();

    wait_for(|| s.stats().total_failed == 1).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 3);

    let stats = s.stats();
    assert_eq!(stats.total_retried, 2);
    assert_eq!(stats.total_started, 3);
    assert_eq!(stats.total_completed, 0);

    let failed = s.find_task(&task.id).unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert_eq!(failed.metrics.retries, 2);
    assert!(failed.error.unwrap().contains("503"));
    // Only the terminal outcome reaches history.
    let history = s.history(20);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, task.id);
    assert_eq!(history[0].status, TaskStatus::Failed);
    assert_eq!(history[0].retries, 2);

    s.shutdown();
    runner.await.unwrap();
}

#[tokio::test]
async fn critical_risk_task_never_retries() {
    let (s, _) = scheduler();
    let runner = s.start();
    let attempts = Arc::new(AtomicUsize::new(0));
    s.submit(
        batch("security_scan")
            .risk(RiskLevel::Critical)
            .handler(counting_failure(attempts.clone())),
    ).unwrap();
    wait_for(|| s.stats().total_failed == 1).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(s.stats().total_retried, 0);
    s.shutdown();
    runner.await.unwrap();
}

#[tokio::test]
async fn panicking_handler_counts_as_failure() {
    let (s, _) = scheduler();
    let handler = handler_fn(|ctx: TaskContext| async move {
        if ctx.payload.is_object() {
            panic!("model crashed");
        }
        Ok::<_, HandlerError>(json!({}))
    });
    let task = s.submit(batch("planning").risk(RiskLevel::Critical).handler(handler)).unwrap();
    s.drain();
    wait_for(|| s.stats().total_failed == 1).await;
    let failed = s.find_task(&task.id).unwrap();
    assert!(failed.error.unwrap().contains("model crashed"));
    assert_eq!(s.status().queues.batch.running, 0);
}

#[tokio::test]
async fn zero_limit_admits_nothing() {
    let (s, _) = scheduler();
    s.adjust_concurrency(TaskClass::Training, 0);
    s.submit(TaskOptions::new("monte_carlo_trial").class(TaskClass::Training)).unwrap();
    s.drain();
    let status = s.status();
    assert_eq!(status.queues.training.running, 0);
    assert_eq!(status.queues.training.queued, 1);
}

#[tokio::test]
async fn pause_halts_admission_until_resume() {
    let (s, _) = scheduler();
    let gate = Arc::new(Semaphore::new(0));
    s.pause();
    s.submit(batch("data_processing").handler(gated(gate.clone()))).unwrap();
    s.drain();
    assert_eq!(s.status().queues.batch.running, 0);
    assert!(s.is_paused());

    s.resume();
    s.drain();
    assert_eq!(s.status().queues.batch.running, 1);
    gate.add_permits(1);
}

#[tokio::test]
async fn safe_mode_requeues_running_batch_work() {
    let (s, _) = scheduler();
    let gate = Arc::new(Semaphore::new(0));
    let first = s.submit(batch("data_processing").handler(gated(gate.clone()))).unwrap();
    let second = s.submit(batch("data_processing").handler(gated(gate.clone()))).unwrap();
    s.submit(
        TaskOptions::new("classify")
            .class(TaskClass::Interactive)
            .handler(gated(gate.clone())),
    ).unwrap();
    s.drain();
    assert_eq!(s.status().queues.batch.running, 2);

    s.enter_safe_mode();
    let listing = s.queues();
    assert!(listing.batch.running.is_empty());
    let requeued: Vec<_> = listing.batch.queued.iter().map(|t| t.id.clone()).collect();
    assert_eq!(requeued, vec![first.id.clone(), second.id.clone()]);
    assert!(listing.batch.queued.iter().all(|t| t.status == TaskStatus::Paused));
    assert_eq!(listing.interactive.running.len(), 1);

    // Nothing batch-class is admitted while safe mode holds.
    s.drain();
    assert_eq!(s.status().queues.batch.running, 0);

    // New batch submissions are held back and never queued.
    let held = s.submit(batch("data_processing")).unwrap();
    assert_eq!(held.status, TaskStatus::Paused);
    assert_eq!(s.status().queues.batch.queued, 2);
    assert_eq!(s.stats().total_queued, 3);

    s.exit_safe_mode();
    s.drain();
    let listing = s.queues();
    assert_eq!(listing.batch.running.len(), 2);
    assert!(listing.batch.running.iter().all(|t| t.status == TaskStatus::Running));

    // Superseded attempts finishing late must not be counted.
    gate.add_permits(10);
    wait_for(|| s.stats().total_completed == 3).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(s.stats().total_completed, 3);
    assert_eq!(s.status().queues.batch.running, 0);
}

#[tokio::test]
async fn safe_mode_routes_new_interactive_work_to_min_tier() {
    let (s, _) = scheduler();
    s.enter_safe_mode();
    let task = s.submit(TaskOptions::new("code_review").class(TaskClass::Interactive)).unwrap();
    assert_eq!(task.resource_tier, ResourceTier::M);
    assert_eq!(task.status, TaskStatus::Queued);
    let task = s.submit(TaskOptions::new("code_generation").class(TaskClass::Interactive)).unwrap();
    assert_eq!(task.resource_tier, ResourceTier::S);
}

#[tokio::test]
async fn cancel_only_touches_queued_tasks() {
    let (s, _) = scheduler();
    s.adjust_concurrency(TaskClass::Batch, 1);
    let gate = Arc::new(Semaphore::new(0));
    let running = s.submit(batch("data_processing").handler(gated(gate.clone()))).unwrap();
    let queued = s.submit(batch("data_processing").handler(gated(gate.clone()))).unwrap();
    s.drain();

    let err = s.cancel_task(&running.id).unwrap_err();
    assert!(err.to_string().contains(&running.id));
    assert_eq!(s.status().queues.batch.running, 1);

    let cancelled = s.cancel_task(&queued.id).unwrap();
    assert_eq!(cancelled.status, TaskStatus::Cancelled);
    assert_eq!(s.stats().total_cancelled, 1);
    assert_eq!(s.status().queues.batch.queued, 0);
    assert!(s.cancel_task("task_0_deadbeef").is_err());
    gate.add_permits(10);
}

#[tokio::test]
async fn group_with_failures_completes_with_errors() {
    let (s, _) = scheduler();
    let runner = s.start();
    let mut rx = s.subscribe();
    let handler = handler_fn(|ctx: TaskContext| async move {
        if ctx.payload["ok"].as_bool().unwrap_or(false) {
            Ok(json!({ "ok": true }))
        } else {
            Err(HandlerError::failed("bad shard"))
        }
    });
    let tasks = [true, true, false, true, false]
        .into_iter()
        .map(|ok| {
            batch("pipeline_stage")
                .risk(RiskLevel::Critical)
                .payload(json!({ "ok": ok }))
                .handler(handler.clone())
        })
        .collect();
    let group = s.submit_group(tasks, GroupOptions::default()).unwrap();
    assert_eq!(group.len(), 5);
    assert_eq!(group.max_concurrency, 5);

    let finished = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match rx.recv().await {
                Ok(SchedulerEvent::GroupCompleted(g)) => return g,
                Ok(_) => continue,
                Err(e) => panic!("event stream ended: {e}"),
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(finished.group_id, group.group_id);
    assert_eq!(finished.completed_count, 3);
    assert_eq!(finished.failed_count, 2);
    assert_eq!(finished.status, GroupStatus::CompletedWithErrors);
    assert!(s.active_groups().is_empty());
    s.shutdown();
    runner.await.unwrap();
}

#[test]
fn empty_group_is_rejected() {
    let (s, _) = scheduler();
    assert!(s.submit_group(Vec::new(), GroupOptions::default()).is_err());
}

#[test]
fn duplicate_live_id_is_rejected() {
    let (s, _) = scheduler();
    s.pause();
    let mut first = batch("data_processing");
    first.id = Some("job-7".into());
    s.submit(first.clone()).unwrap();

    let err = s.submit(first).unwrap_err();
    assert!(matches!(err, SchedulerError::DuplicateTask(id) if id == "job-7"));
    assert_eq!(s.status().total_queued(), 1);
    assert_eq!(s.stats().total_queued, 1);
}

#[tokio::test]
async fn group_with_repeated_id_is_rejected_whole() {
    let (s, _) = scheduler();
    let gate = Arc::new(Semaphore::new(0));
    let tasks: Vec<TaskOptions> = (0..2)
        .map(|_| {
            let mut opts = batch("data_processing").handler(gated(gate.clone()));
            opts.id = Some("dup".into());
            opts
        })
        .collect();

    let err = s.submit_group(tasks, GroupOptions::default()).unwrap_err();
    assert!(matches!(err, SchedulerError::DuplicateTask(id) if id == "dup"));
    assert!(s.active_groups().is_empty());
    assert_eq!(s.status().total_queued(), 0);

    s.drain();
    assert_eq!(s.stats().total_started, 0);
}

#[tokio::test]
async fn id_is_reusable_once_the_task_finishes() {
    let (s, _) = scheduler();
    let mut opts = TaskOptions::new("classify");
    opts.id = Some("nightly".into());
    s.submit(opts.clone()).unwrap();
    s.drain();
    wait_for(|| s.stats().total_completed == 1).await;

    s.submit(opts).unwrap();
    s.drain();
    wait_for(|| s.stats().total_completed == 2).await;
    assert_eq!(s.history_len(), 2);
}

#[tokio::test]
async fn group_member_running_under_same_id_blocks_the_group() {
    let (s, _) = scheduler();
    let gate = Arc::new(Semaphore::new(0));
    let mut running = batch("data_processing").handler(gated(gate.clone()));
    running.id = Some("shard-1".into());
    s.submit(running).unwrap();
    s.drain();
    assert_eq!(s.status().total_running(), 1);

    let mut member = batch("data_processing");
    member.id = Some("shard-1".into());
    assert!(s
        .submit_group(vec![batch("lint"), member], GroupOptions::default())
        .is_err());
    assert!(s.active_groups().is_empty());

    gate.add_permits(1);
    wait_for(|| s.stats().total_completed == 1).await;
}

#[tokio::test]
async fn cancelling_a_grouped_task_settles_the_group() {
    let (s, _) = scheduler();
    s.pause();
    let group = s
        .submit_group(vec![batch("documentation")], GroupOptions::default())
        .unwrap();
    assert_eq!(s.active_groups().len(), 1);
    s.cancel_task(&group.task_ids[0]).unwrap();
    assert!(s.active_groups().is_empty());
}

#[tokio::test]
async fn history_is_trimmed_past_the_cap() {
    let settings = SchedulerSettings {
        history_cap: 4,
        history_trim: 2,
        ..SchedulerSettings::default()
    };
    let (s, _) = scheduler_with(settings);
    let runner = s.start();
    for _ in 0..5 {
        s.submit(TaskOptions::new("classify")).unwrap();
    }
    wait_for(|| s.stats().total_completed == 5).await;
    assert_eq!(s.history_len(), 2);
    assert_eq!(s.history(20).len(), 2);
    s.shutdown();
    runner.await.unwrap();
}

#[tokio::test]
async fn run_loop_drains_everything() {
    let (s, _) = scheduler();
    let runner = s.start();
    for i in 0..20 {
        let class = TaskClass::ALL[i % 3];
        s.submit(TaskOptions::new("route").class(class)).unwrap();
    }
    wait_for(|| s.stats().total_completed == 20).await;
    let status = s.status();
    assert_eq!(status.total_queued(), 0);
    assert_eq!(status.total_running(), 0);
    s.shutdown();
    runner.await.unwrap();
}

#[tokio::test]
async fn concurrency_change_is_announced() {
    let (s, _) = scheduler();
    let mut rx = s.subscribe();
    s.adjust_concurrency(TaskClass::Batch, 4);
    assert_eq!(s.concurrency_limit(TaskClass::Batch), 4);
    let event = rx.recv().await.unwrap();
    assert_eq!(event.name(), "scheduler:concurrency_changed");
}

#[tokio::test]
async fn mitigation_signals_map_to_controls() {
    let (s, _) = scheduler();
    s.apply_mitigation(MitigationSignal::ConcurrencyLowered);
    assert_eq!(s.concurrency_limit(TaskClass::Batch), 1);
    assert_eq!(s.concurrency_limit(TaskClass::Training), 0);

    s.adjust_concurrency(TaskClass::Batch, 3);
    s.apply_mitigation(MitigationSignal::BatchPaused);
    assert_eq!(s.concurrency_limit(TaskClass::Batch), 1);

    let (tx, rx) = broadcast::channel(4);
    let listener = spawn_mitigation_listener(s.clone(), rx);
    tx.send(MitigationSignal::SafeModeActivated).unwrap();
    wait_for(|| s.is_safe_mode()).await;
    drop(tx);
    listener.await.unwrap();
}
