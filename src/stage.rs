use crate::config::{Config, INGEST_LISTEN_URL, PipelineConfig};

pub type StageName = &'static str;
pub const TRANSCODE_STAGE: StageName = "ffmpeg";
pub const MODULATION_STAGE: StageName = "hacktv";

/// Where a stage reads its standard input from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageInput {
    Null,
    /// Read end of the shared frame pipe
    Pipe,
}

/// Where a stage writes its standard output to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageOutput {
    /// Write end of the shared frame pipe
    Pipe,
    /// The orchestrator's own stdout
    Inherit,
}

/// One external process: what to run and how its stdio is wired.
/// Stderr is always forwarded to the orchestrator's stderr.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageSpec {
    pub name: StageName,
    pub program: String,
    pub args: Vec<String>,
    pub stdin: StageInput,
    pub stdout: StageOutput,
}

impl StageSpec {
    /// Printable command line, for logs
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Transcoder and modulator specs for one run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagePair {
    pub transcode: StageSpec,
    pub modulation: StageSpec,
}

impl StagePair {
    pub fn build(pipeline: &PipelineConfig, tools: &Config) -> Self {
        Self {
            transcode: transcode_stage(pipeline, tools),
            modulation: modulation_stage(pipeline, tools),
        }
    }
}

/// Hz argument for the modulator.
///
/// The MHz value is scaled to kHz, rounded, then three zero digits are appended,
/// so 471.25 becomes "471250000".
pub fn frequency_arg(freq_mhz: f64) -> String {
    format!("{:.0}000", freq_mhz * 1000.0)
}

pub fn transcode_stage(pipeline: &PipelineConfig, tools: &Config) -> StageSpec {
    let filter = pipeline.scale.filter();
    let mut args: Vec<String> = [
        "-listen",
        "1",
        "-i",
        INGEST_LISTEN_URL,
        "-vf",
        filter.as_str(),
        "-r",
        pipeline.fps.as_str(),
        "-pix_fmt",
        pipeline.pix_fmt.as_str(),
        "-f",
        "yuv4mpegpipe",
        "-",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    if !pipeline.audio {
        args.push("-an".to_string());
    }

    StageSpec {
        name: TRANSCODE_STAGE,
        program: tools.ffmpeg.clone(),
        args,
        stdin: StageInput::Null,
        stdout: StageOutput::Pipe,
    }
}

pub fn modulation_stage(pipeline: &PipelineConfig, tools: &Config) -> StageSpec {
    let mut args = vec![
        "-m".to_string(),
        tools.mode.clone(),
        "-f".to_string(),
        frequency_arg(pipeline.freq_mhz),
        "-s".to_string(),
        tools.sample_rate.to_string(),
        "-g".to_string(),
        tools.gain.to_string(),
        // read frames from stdin
        "-".to_string(),
    ];
    if !pipeline.audio {
        args.push("--noaudio".to_string());
    }

    StageSpec {
        name: MODULATION_STAGE,
        program: tools.hacktv.clone(),
        args,
        stdin: StageInput::Pipe,
        stdout: StageOutput::Inherit,
    }
}
