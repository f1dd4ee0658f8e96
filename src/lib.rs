pub mod config;
pub mod pipeline;
pub mod stage;

use tracing::{debug, info};

//
// Re-export
//
pub use config::{Config, PipelineConfig, Scale};
pub use pipeline::{PipelineRun, RunReport, StageProcess, StageState, Termination};
pub use stage::{StagePair, StageSpec, frequency_arg};

/// Guidance printed when the program is started without any arguments
pub fn usage() -> String {
    format!(
        "No arguments provided.\n\
         To use this transmitter, add the following RTMP URL as a custom output in OBS Studio:\n  \
         {}\n\
         Then run this program with:\n  \
         --freq <frequency in MHz> [--audio=<true|false>]\n\
         Example:\n  \
         ./transmitter --freq 471.25 --audio=false",
        config::INGEST_CLIENT_URL
    )
}

/// Build, launch and supervise one transcode → modulation session.
///
/// Errors only when the pipeline could not be brought up; how the stages
/// exited afterwards is described by the returned report.
pub async fn run(config: &Config, pipeline: &PipelineConfig) -> anyhow::Result<RunReport> {
    let stages = StagePair::build(pipeline, config);
    debug!(command = %stages.transcode.command_line(), "Transcoder command");
    debug!(command = %stages.modulation.command_line(), "Modulator command");

    let run = pipeline::launch(&stages)?;

    info!(
        "Waiting for RTMP stream at {}...",
        config::INGEST_CLIENT_URL
    );
    run.supervise().await
}
