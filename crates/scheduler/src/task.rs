use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::types::{Constraints, Priority, ResourceTier, RiskLevel, TaskClass, TaskMetrics, TaskStatus};

/// Error returned by a task handler.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Everything a handler gets to see about the attempt it is running.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub task_id: String,
    pub task_type: String,
    pub payload: Value,
    pub tier: ResourceTier,
    /// Zero-based attempt number (equals the retry count so far).
    pub attempt: u32,
}

/// A unit of work executed on behalf of a task.
///
/// Provider integrations implement this and are either attached to a task
/// directly or registered per task type on the scheduler.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn run(&self, ctx: TaskContext) -> Result<Value, HandlerError>;
}

pub type SharedHandler = Arc<dyn TaskHandler>;

/// Adapter so plain async closures can be used as handlers.
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F, Fut> TaskHandler for FnHandler<F>
where
    F: Fn(TaskContext) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Value, HandlerError>> + Send,
{
    async fn run(&self, ctx: TaskContext) -> Result<Value, HandlerError> {
        (self.0)(ctx).await
    }
}

/// Wrap an async closure into a [`SharedHandler`].
pub fn handler_fn<F, Fut>(f: F) -> SharedHandler
where
    F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

pub(crate) fn new_task_id(now_ms: u64) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("task_{}_{}", now_ms, &hex[..8])
}

pub(crate) fn new_group_id(now_ms: u64) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("grp_{}_{}", now_ms, &hex[..6])
}

/// Constraint fields as submitted. Any field left unset falls back to the
/// same-named top-level option.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConstraintOptions {
    pub max_latency_ms: Option<u64>,
    pub cost_ceiling: Option<f64>,
    pub risk_level: Option<RiskLevel>,
}

/// Submission options. Every field is optional on the wire.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskOptions {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub task_type: Option<String>,
    pub priority: Option<Priority>,
    pub task_class: Option<TaskClass>,
    pub max_latency_ms: Option<u64>,
    pub cost_ceiling: Option<f64>,
    pub risk_level: Option<RiskLevel>,
    pub constraints: ConstraintOptions,
    pub payload: Option<Value>,
    pub parent_id: Option<String>,
    pub group_id: Option<String>,
    pub execution_mode: Option<String>,
    #[serde(skip)]
    pub handler: Option<SharedHandler>,
}

impl TaskOptions {
    pub fn new(task_type: impl Into<String>) -> Self {
        Self {
            task_type: Some(task_type.into()),
            ..Self::default()
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn class(mut self, class: TaskClass) -> Self {
        self.task_class = Some(class);
        self
    }

    pub fn risk(mut self, risk: RiskLevel) -> Self {
        self.risk_level = Some(risk);
        self
    }

    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn handler(mut self, handler: SharedHandler) -> Self {
        self.handler = Some(handler);
        self
    }
}

impl fmt::Debug for TaskOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskOptions")
            .field("id", &self.id)
            .field("task_type", &self.task_type)
            .field("priority", &self.priority)
            .field("task_class", &self.task_class)
            .field("risk_level", &self.risk_level)
            .field("constraints", &self.constraints)
            .field("has_handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}

/// A scheduled unit of work and its lifecycle state.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub priority: Priority,
    pub task_class: TaskClass,
    pub status: TaskStatus,
    /// Fixed at submission.
    pub resource_tier: ResourceTier,
    pub constraints: Constraints,
    pub payload: Value,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub metrics: TaskMetrics,
    pub group_id: Option<String>,
    pub parent_id: Option<String>,
    pub execution_mode: String,
    #[serde(skip)]
    pub(crate) handler: Option<SharedHandler>,
    /// Bumped on every admission; completions carrying a stale value are dropped.
    #[serde(skip)]
    pub(crate) epoch: u64,
}

impl Task {
    /// Build a queued task from options. The tier is filled in by the router.
    pub fn from_options(options: TaskOptions, now_ms: u64) -> Self {
        let nested = options.constraints;
        let constraints = Constraints {
            max_latency_ms: nested.max_latency_ms.or(options.max_latency_ms),
            cost_ceiling: nested.cost_ceiling.or(options.cost_ceiling),
            risk_level: nested.risk_level.or(options.risk_level).unwrap_or_default(),
        };
        Self {
            id: options.id.unwrap_or_else(|| new_task_id(now_ms)),
            task_type: options.task_type.unwrap_or_else(|| "generic".to_string()),
            priority: options.priority.unwrap_or_default(),
            task_class: options.task_class.unwrap_or_default(),
            status: TaskStatus::Queued,
            resource_tier: ResourceTier::M,
            constraints,
            payload: options.payload.unwrap_or_else(|| Value::Object(Default::default())),
            result: None,
            error: None,
            metrics: TaskMetrics {
                queued_at: now_ms,
                ..TaskMetrics::default()
            },
            group_id: options.group_id,
            parent_id: options.parent_id,
            execution_mode: options
                .execution_mode
                .unwrap_or_else(|| "sequential".to_string()),
            handler: options.handler,
            epoch: 0,
        }
    }

    pub fn is_critical_risk(&self) -> bool {
        self.constraints.risk_level == RiskLevel::Critical
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Copy for the history ring, without the handler.
    pub(crate) fn snapshot(&self) -> Task {
        Task {
            handler: None,
            ..self.clone()
        }
    }

    pub fn summary(&self, now_ms: u64) -> TaskSummary {
        let started = self.metrics.started_at;
        let wait_ms = started.unwrap_or(now_ms).saturating_sub(self.metrics.queued_at);
        let exec_ms = started
            .map(|s| self.metrics.completed_at.unwrap_or(now_ms).saturating_sub(s))
            .unwrap_or(0);
        TaskSummary {
            id: self.id.clone(),
            task_type: self.task_type.clone(),
            priority: self.priority,
            task_class: self.task_class,
            tier: self.resource_tier,
            status: self.status,
            wait_ms,
            exec_ms,
            retries: self.metrics.retries,
            error: self.error.clone(),
            group_id: self.group_id.clone(),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("task_type", &self.task_type)
            .field("priority", &self.priority)
            .field("task_class", &self.task_class)
            .field("status", &self.status)
            .field("resource_tier", &self.resource_tier)
            .field("metrics", &self.metrics)
            .field("group_id", &self.group_id)
            .finish_non_exhaustive()
    }
}

/// Compact task view used by events and the HTTP queue/history listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub priority: Priority,
    pub task_class: TaskClass,
    pub tier: ResourceTier,
    pub status: TaskStatus,
    pub wait_ms: u64,
    pub exec_ms: u64,
    pub retries: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}
