//! Scheduler runner -- queues, admission, execution and control.
//!
//! Split into focused submodules:
//! - `core`: Scheduler handle, shared state, constructor and read accessors
//! - `scheduling`: submission, group submission and the coalesced drain pass
//! - `execution`: handler invocation, retry/fail classification, history
//! - `control`: safe mode, pause/resume, concurrency changes, cancellation

mod control;
mod core;
mod execution;
mod scheduling;
#[cfg(test)]
mod tests;

pub use self::core::Scheduler;
