use crate::pipeline::{PipelineRun, StageProcess};
use crate::stage::{StageInput, StageName, StageOutput, StagePair, StageSpec};
use anyhow::{Context, anyhow};
use std::io::{PipeReader, PipeWriter};
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tracing::debug;

/// An external program, spawned through tokio
pub struct ExternalStage {
    name: StageName,
    // Holds this stage's pipe end until spawn
    command: Option<Command>,
    child: Option<Child>,
}

impl ExternalStage {
    pub fn new(name: StageName, command: Command) -> Self {
        Self {
            name,
            command: Some(command),
            child: None,
        }
    }

    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    fn child(&mut self) -> anyhow::Result<&mut Child> {
        let name = self.name;
        self.child
            .as_mut()
            .ok_or_else(|| anyhow!("{name} has not been started"))
    }
}

impl StageProcess for ExternalStage {
    fn name(&self) -> StageName {
        self.name
    }

    fn start(&mut self) -> anyhow::Result<()> {
        let mut command = self
            .command
            .take()
            .ok_or_else(|| anyhow!("{} was already started", self.name))?;
        let child = command.spawn()?;
        // Dropping the command closes the orchestrator's copy of the pipe end
        drop(command);
        debug!(stage = self.name, pid = ?child.id(), "Spawned");
        self.child = Some(child);
        Ok(())
    }

    async fn wait(&mut self) -> anyhow::Result<ExitStatus> {
        let status = self.child()?.wait().await?;
        Ok(status)
    }

    async fn kill(&mut self) -> anyhow::Result<()> {
        self.child()?.kill().await?;
        Ok(())
    }
}

/// Wire both stages around one OS pipe and hand back the unstarted run.
///
/// The pipe ends are moved into the stage commands; the caller never holds them.
pub fn launch(stages: &StagePair) -> anyhow::Result<PipelineRun<ExternalStage>> {
    let (reader, writer) = std::io::pipe().context("Failed to set up the frame pipe")?;
    let mut reader = Some(reader);
    let mut writer = Some(writer);

    let transcode = command(&stages.transcode, &mut reader, &mut writer)?;
    let modulation = command(&stages.modulation, &mut reader, &mut writer)?;

    Ok(PipelineRun::new(
        ExternalStage::new(stages.transcode.name, transcode),
        ExternalStage::new(stages.modulation.name, modulation),
    ))
}

fn command(
    spec: &StageSpec,
    reader: &mut Option<PipeReader>,
    writer: &mut Option<PipeWriter>,
) -> anyhow::Result<Command> {
    let mut command = Command::new(&spec.program);
    command.args(&spec.args).stderr(Stdio::inherit());

    match spec.stdin {
        StageInput::Null => command.stdin(Stdio::null()),
        StageInput::Pipe => command.stdin(
            reader
                .take()
                .ok_or_else(|| anyhow!("Frame pipe read end is already claimed"))?,
        ),
    };
    match spec.stdout {
        StageOutput::Inherit => command.stdout(Stdio::inherit()),
        StageOutput::Pipe => command.stdout(
            writer
                .take()
                .ok_or_else(|| anyhow!("Frame pipe write end is already claimed"))?,
        ),
    };

    Ok(command)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::stage::{MODULATION_STAGE, TRANSCODE_STAGE};

    fn shell(name: StageName, script: &str, stdin: StageInput, stdout: StageOutput) -> StageSpec {
        StageSpec {
            name,
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            stdin,
            stdout,
        }
    }

    #[test]
    fn test_two_pipe_readers_are_rejected() {
        let stages = StagePair {
            transcode: shell(TRANSCODE_STAGE, "true", StageInput::Pipe, StageOutput::Pipe),
            modulation: shell(MODULATION_STAGE, "true", StageInput::Pipe, StageOutput::Inherit),
        };
        assert!(launch(&stages).is_err());
    }

    #[tokio::test]
    async fn test_wait_before_start_fails() {
        let mut stage = ExternalStage::new(TRANSCODE_STAGE, Command::new("true"));
        assert!(stage.wait().await.is_err());
        assert!(stage.id().is_none());
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let mut stage = ExternalStage::new(TRANSCODE_STAGE, Command::new("true"));
        stage.start().unwrap();
        assert!(stage.start().is_err());
        assert!(stage.wait().await.unwrap().success());
    }

    #[tokio::test]
    async fn test_kill_running_stage() {
        let mut command = Command::new("sleep");
        command.arg("30");
        let mut stage = ExternalStage::new(MODULATION_STAGE, command);
        stage.start().unwrap();
        assert!(stage.id().is_some());
        stage.kill().await.unwrap();
        assert!(stage.id().is_none());
    }
}
