pub mod launcher;
pub mod supervisor;

use crate::stage::StageName;
use std::process::ExitStatus;

// Re-exports for convenience
pub use launcher::{ExternalStage, launch};
pub use supervisor::{PipelineRun, RunReport, StageState, Termination};

/// A single external process as seen by the supervisor.
///
/// `start` must not block on the process; `wait` resolves once it has exited.
pub trait StageProcess: Send {
    fn name(&self) -> StageName;

    fn start(&mut self) -> anyhow::Result<()>;

    fn wait(&mut self) -> impl Future<Output = anyhow::Result<ExitStatus>> + Send;

    /// Kill a started process and reap it
    fn kill(&mut self) -> impl Future<Output = anyhow::Result<()>> + Send;
}
