//! HTTP surface for the tiergate scheduler and diagnostics.

pub mod api;
pub mod cli;
pub mod router;
pub mod startup;
pub mod state;

pub use router::build_router;
pub use state::AppState;
