use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    #[default]
    Pending,
    Completed,
    CompletedWithErrors,
}

/// Options accepted alongside a group submission.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupOptions {
    pub execution_mode: Option<String>,
    pub max_concurrency: Option<usize>,
}

/// A set of tasks submitted together whose completion is tracked as a unit.
///
/// `execution_mode` and `max_concurrency` are informational; member tasks are
/// admitted by their own class ceilings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParallelGroup {
    pub group_id: String,
    pub task_ids: Vec<String>,
    pub execution_mode: String,
    pub max_concurrency: usize,
    pub completed_count: usize,
    pub failed_count: usize,
    pub status: GroupStatus,
}

impl ParallelGroup {
    pub fn new(group_id: String, task_ids: Vec<String>, options: GroupOptions) -> Self {
        let max_concurrency = options.max_concurrency.unwrap_or(task_ids.len());
        Self {
            group_id,
            task_ids,
            execution_mode: options
                .execution_mode
                .unwrap_or_else(|| "parallel".to_string()),
            max_concurrency,
            completed_count: 0,
            failed_count: 0,
            status: GroupStatus::Pending,
        }
    }

    pub fn len(&self) -> usize {
        self.task_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.task_ids.is_empty()
    }

    /// Count one terminal outcome. Returns true once every member has settled,
    /// at which point the status is final.
    pub fn record(&mut self, succeeded: bool) -> bool {
        if succeeded {
            self.completed_count += 1;
        } else {
            self.failed_count += 1;
        }
        if self.completed_count + self.failed_count >= self.len() {
            self.status = if self.failed_count == 0 {
                GroupStatus::Completed
            } else {
                GroupStatus::CompletedWithErrors
            };
            true
        } else {
            false
        }
    }
}
