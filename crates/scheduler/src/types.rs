use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::SchedulerError;

/// Task priority. Lower numeric value = served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Priority {
    Critical = 0,
    High = 1,
    #[default]
    Normal = 2,
    Low = 3,
    Background = 4,
}

impl Priority {
    /// Map an ordinal (0-4) back to a priority.
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Self::Critical),
            1 => Some(Self::High),
            2 => Some(Self::Normal),
            3 => Some(Self::Low),
            4 => Some(Self::Background),
            _ => None,
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }
}

impl FromStr for Priority {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "normal" => Ok(Self::Normal),
            "low" => Ok(Self::Low),
            "background" => Ok(Self::Background),
            other => Err(SchedulerError::InvalidPriority(other.to_string())),
        }
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.level())
    }
}

/// Wire form: either the ordinal or the name.
#[derive(Deserialize)]
#[serde(untagged)]
enum PriorityRepr {
    Level(u8),
    Name(String),
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match PriorityRepr::deserialize(deserializer)? {
            PriorityRepr::Level(n) => Priority::from_level(n)
                .ok_or_else(|| de::Error::custom(format!("priority level out of range: {n}"))),
            PriorityRepr::Name(name) => name.parse().map_err(de::Error::custom),
        }
    }
}

/// Which queue and concurrency pool owns a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskClass {
    Interactive,
    #[default]
    Batch,
    Training,
}

impl TaskClass {
    /// Fixed drain order: interactive first, training last.
    pub const ALL: [TaskClass; 3] = [TaskClass::Interactive, TaskClass::Batch, TaskClass::Training];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Interactive => "interactive",
            Self::Batch => "batch",
            Self::Training => "training",
        }
    }

    /// Batch and training are suspended while safe mode is active.
    pub fn throttled_by_safe_mode(self) -> bool {
        !matches!(self, Self::Interactive)
    }
}

impl fmt::Display for TaskClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskClass {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interactive" => Ok(Self::Interactive),
            "batch" => Ok(Self::Batch),
            "training" => Ok(Self::Training),
            other => Err(SchedulerError::UnknownTaskClass(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Queued,
    Running,
    Completed,
    Failed,
    /// Suspended by safe mode. A paused task sitting in a queue is admitted
    /// like a queued one once its class is drained again.
    Paused,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Coarse cost/capability bucket. L is the most expensive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceTier {
    L,
    M,
    S,
}

impl fmt::Display for ResourceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::L => "L",
            Self::M => "M",
            Self::S => "S",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Normal,
    Critical,
}

/// Caller-supplied execution constraints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Constraints {
    pub max_latency_ms: Option<u64>,
    pub cost_ceiling: Option<f64>,
    pub risk_level: RiskLevel,
}

/// Timestamps (epoch ms) and retry counter for one task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetrics {
    pub queued_at: u64,
    pub started_at: Option<u64>,
    pub completed_at: Option<u64>,
    pub retries: u32,
}

impl TaskMetrics {
    pub fn wait_ms(&self) -> u64 {
        self.started_at
            .map(|started| started.saturating_sub(self.queued_at))
            .unwrap_or(0)
    }

    pub fn exec_ms(&self) -> u64 {
        match (self.started_at, self.completed_at) {
            (Some(started), Some(completed)) => completed.saturating_sub(started),
            _ => 0,
        }
    }
}

/// One value per task class; serializes as `{interactive, batch, training}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerClass<T> {
    pub interactive: T,
    pub batch: T,
    pub training: T,
}

impl<T> PerClass<T> {
    pub fn new(interactive: T, batch: T, training: T) -> Self {
        Self { interactive, batch, training }
    }

    pub fn get(&self, class: TaskClass) -> &T {
        match class {
            TaskClass::Interactive => &self.interactive,
            TaskClass::Batch => &self.batch,
            TaskClass::Training => &self.training,
        }
    }

    pub fn get_mut(&mut self, class: TaskClass) -> &mut T {
        match class {
            TaskClass::Interactive => &mut self.interactive,
            TaskClass::Batch => &mut self.batch,
            TaskClass::Training => &mut self.training,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> PerClass<U> {
        PerClass {
            interactive: f(&self.interactive),
            batch: f(&self.batch),
            training: f(&self.training),
        }
    }
}

impl PerClass<usize> {
    pub fn total(&self) -> usize {
        self.interactive + self.batch + self.training
    }
}
