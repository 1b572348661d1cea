//! Execution module
//!
//! Intent routing and the paper position state machine

mod executor;
mod router;
mod types;

pub use executor::{CycleOutput, ExecutionState, PositionExecutor};
pub use router::ExecutionRouter;
pub use types::{Action, Directive, Fill, FillSide, Intent, PositionSide};
