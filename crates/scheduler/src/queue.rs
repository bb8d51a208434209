use std::collections::VecDeque;

use crate::task::Task;

/// Per-class wait queue ordered by ascending priority, FIFO among equals.
#[derive(Debug, Default)]
pub struct ClassQueue {
    items: VecDeque<Task>,
}

impl ClassQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert before the first task with a strictly larger priority number.
    pub fn insert_by_priority(&mut self, task: Task) {
        let pos = self
            .items
            .iter()
            .position(|queued| queued.priority > task.priority)
            .unwrap_or(self.items.len());
        self.items.insert(pos, task);
    }

    /// Put a task at the head regardless of priority (safe-mode requeue).
    pub fn push_front(&mut self, task: Task) {
        self.items.push_front(task);
    }

    pub fn pop_front(&mut self) -> Option<Task> {
        self.items.pop_front()
    }

    pub fn remove(&mut self, task_id: &str) -> Option<Task> {
        let pos = self.items.iter().position(|t| t.id == task_id)?;
        self.items.remove(pos)
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.items.iter().any(|t| t.id == task_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.items.iter()
    }

    /// True when priorities never decrease from head to tail.
    pub fn is_priority_ordered(&self) -> bool {
        self.items
            .iter()
            .zip(self.items.iter().skip(1))
            .all(|(a, b)| a.priority <= b.priority)
    }
}
