//! External process execution.
//!
//! [`CommandRunner`] is the seam between the orchestrator and the operating
//! system. [`SystemRunner`] spawns real processes; tests substitute fakes
//! that record invocations and inject failures.

mod errors;
mod system;
mod types;

pub use errors::{RunError, RunResult};
pub use system::SystemRunner;
pub use types::{ExitOutcome, NullSink, OutputSink, RunOptions};

use crate::command::Invocation;

/// Runs one invocation to completion.
///
/// Output is forwarded to `sink` as it is produced. Returns the exit
/// outcome for any process that ran to completion, success or not.
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        invocation: &Invocation,
        options: &RunOptions,
        sink: &dyn OutputSink,
    ) -> RunResult<ExitOutcome>;
}
