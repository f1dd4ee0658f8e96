use crate::pipeline::StageProcess;
use anyhow::Context;
use std::process::ExitStatus;
use tracing::{error, info, warn};

/// How a started stage came to an end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    Exited(ExitStatus),
    WaitFailed(String),
    /// Torn down by the supervisor
    Killed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageState {
    NotStarted,
    Started,
    Terminated(Termination),
}

impl StageState {
    pub fn succeeded(&self) -> bool {
        matches!(self, StageState::Terminated(Termination::Exited(status)) if status.success())
    }
}

struct Tracked<S> {
    stage: S,
    state: StageState,
}

impl<S: StageProcess> Tracked<S> {
    fn new(stage: S) -> Self {
        Self {
            stage,
            state: StageState::NotStarted,
        }
    }

    fn start(&mut self) -> anyhow::Result<()> {
        let name = self.stage.name();
        self.stage
            .start()
            .with_context(|| format!("Failed to start {name}"))?;
        info!(stage = name, "Stage started");
        self.state = StageState::Started;
        Ok(())
    }

    async fn wait(&mut self) {
        let name = self.stage.name();
        let termination = match self.stage.wait().await {
            Ok(status) if status.success() => {
                info!(stage = name, %status, "Stage finished");
                Termination::Exited(status)
            }
            Ok(status) => {
                warn!(stage = name, %status, "Stage exited with error");
                Termination::Exited(status)
            }
            Err(error) => {
                warn!(stage = name, ?error, "Failed waiting for stage");
                Termination::WaitFailed(format!("{error:#}"))
            }
        };
        self.state = StageState::Terminated(termination);
    }

    async fn terminate(&mut self) {
        let name = self.stage.name();
        match self.stage.kill().await {
            Ok(()) => info!(stage = name, "Stage killed"),
            Err(error) => error!(stage = name, ?error, "Failed to kill stage"),
        }
        self.state = StageState::Terminated(Termination::Killed);
    }
}

/// Terminal states of both stages after a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub transcode: StageState,
    pub modulation: StageState,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.transcode.succeeded() && self.modulation.succeeded()
    }
}

/// Both stages of one session, not yet started
pub struct PipelineRun<S> {
    transcode: Tracked<S>,
    modulation: Tracked<S>,
}

impl<S: StageProcess> PipelineRun<S> {
    pub fn new(transcode: S, modulation: S) -> Self {
        Self {
            transcode: Tracked::new(transcode),
            modulation: Tracked::new(modulation),
        }
    }

    pub fn transcode_state(&self) -> &StageState {
        &self.transcode.state
    }

    pub fn modulation_state(&self) -> &StageState {
        &self.modulation.state
    }

    /// Start the consumer, then the producer, then wait on both in that reverse order.
    ///
    /// A start failure is returned as an error. Once both are running, exit
    /// statuses and wait errors are only logged and recorded in the report.
    pub async fn supervise(mut self) -> anyhow::Result<RunReport> {
        self.modulation.start()?;

        if let Err(error) = self.transcode.start() {
            self.modulation.terminate().await;
            return Err(error);
        }

        // Producer exit is the end of the stream; the consumer drains and follows
        self.transcode.wait().await;
        self.modulation.wait().await;

        Ok(RunReport {
            transcode: self.transcode.state,
            modulation: self.modulation.state,
        })
    }
}
