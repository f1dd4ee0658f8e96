use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Address the transcoder listens on for the inbound RTMP stream
pub const INGEST_LISTEN_URL: &str = "rtmp://0.0.0.0:1935/live/stream";
/// Address a streaming client on the same host should publish to
pub const INGEST_CLIENT_URL: &str = "rtmp://localhost:1935/live/stream";

pub const DEFAULT_FPS: &str = "15";
pub const DEFAULT_PIX_FMT: &str = "yuv420p";

pub const SCALE_WIDTH_VAR: &str = "SCALE_WIDTH";
pub const SCALE_HEIGHT_VAR: &str = "SCALE_HEIGHT";
pub const FPS_VAR: &str = "FPS";
pub const PIX_FMT_VAR: &str = "PIX_FMT";

/// Command line and tool configuration
///
/// Example configuration file content
/// # Transmitter Configuration
///
/// # External tools
/// ffmpeg = "/usr/bin/ffmpeg"
/// hacktv = "/opt/hacktv/hacktv"
///
/// # Modulation parameters
/// mode = "m"
/// sample_rate = 13500000
/// gain = 40
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[serde(default)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Transmit frequency in MHz (required)
    #[arg(long)]
    #[serde(skip)]
    pub freq: Option<f64>,

    /// Enable audio
    #[arg(
        long,
        action = ArgAction::Set,
        default_value_t = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    #[serde(skip)]
    pub audio: bool,

    /// Transcoder executable
    #[arg(long, default_value = "ffmpeg")]
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    /// Modulator executable
    #[arg(long, default_value = "./hacktv")]
    #[serde(default = "default_hacktv")]
    pub hacktv: String,

    /// Modulator video mode
    #[arg(short, long, default_value = "m")]
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Modulator sample rate in Hz
    #[arg(short, long, default_value_t = 13_500_000)]
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Modulator TX gain in dB
    #[arg(short, long, default_value_t = 40)]
    #[serde(default = "default_gain")]
    pub gain: u32,

    /// Configuration file path (tool settings only)
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            freq: None,
            audio: default_audio(),
            ffmpeg: default_ffmpeg(),
            hacktv: default_hacktv(),
            mode: default_mode(),
            sample_rate: default_sample_rate(),
            gain: default_gain(),
            config: None,
        }
    }
}

impl Config {
    /// Load configuration from CLI args, optionally merging with a config file
    pub fn load() -> Result<Self> {
        let config = Config::parse();
        config.with_file()
    }

    fn with_file(mut self) -> Result<Self> {
        if let Some(config_path) = &self.config {
            let file_config = Self::from_file(Path::new(config_path))?;
            self = self.merge_with_file(file_config);
        }

        self.validate()?;
        Ok(self)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Merge with file config, CLI args take precedence
    fn merge_with_file(mut self, file_config: Config) -> Self {
        // If CLI value is default, use file value
        if self.ffmpeg == default_ffmpeg() {
            self.ffmpeg = file_config.ffmpeg;
        }
        if self.hacktv == default_hacktv() {
            self.hacktv = file_config.hacktv;
        }
        if self.mode == default_mode() {
            self.mode = file_config.mode;
        }
        if self.sample_rate == default_sample_rate() {
            self.sample_rate = file_config.sample_rate;
        }
        if self.gain == default_gain() {
            self.gain = file_config.gain;
        }

        self
    }

    /// Validate the tool settings
    pub fn validate(&self) -> Result<()> {
        if self.ffmpeg.is_empty() {
            bail!("Transcoder executable path cannot be empty");
        }
        if self.hacktv.is_empty() {
            bail!("Modulator executable path cannot be empty");
        }
        if self.mode.is_empty() {
            bail!("Modulator mode cannot be empty");
        }
        if self.sample_rate == 0 {
            bail!("Modulator sample rate must be greater than zero");
        }

        Ok(())
    }

    /// The transmit frequency, rejecting anything that is not a positive MHz value
    pub fn frequency(&self) -> Result<f64> {
        match self.freq {
            Some(freq) if freq.is_finite() && freq > 0.0 => Ok(freq),
            _ => bail!("--freq flag is required and must be a valid frequency in MHz"),
        }
    }
}

/// Frame size handed to the transcoder's scale filter
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scale {
    /// Keep the resolution of the inbound stream
    Passthrough,
    Explicit { width: String, height: String },
}

impl Scale {
    pub fn filter(&self) -> String {
        match self {
            Scale::Passthrough => "scale=iw:ih".to_string(),
            Scale::Explicit { width, height } => format!("scale={width}:{height}"),
        }
    }
}

/// Parameters of one pipeline run, resolved once and never mutated
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub freq_mhz: f64,
    pub audio: bool,
    pub scale: Scale,
    pub fps: String,
    pub pix_fmt: String,
}

impl PipelineConfig {
    /// Resolve against the process environment
    pub fn resolve(config: &Config) -> Result<Self> {
        Self::resolve_with(config, |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup
    pub fn resolve_with<F>(config: &Config, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let freq_mhz = config.frequency()?;
        let var = |key: &str| env(key).filter(|value| !value.is_empty());

        let scale = match (var(SCALE_WIDTH_VAR), var(SCALE_HEIGHT_VAR)) {
            (Some(width), Some(height)) => {
                let scale = Scale::Explicit { width, height };
                info!(filter = %scale.filter(), "Using scale");
                scale
            }
            _ => {
                info!("Using passthrough scale (input resolution from the stream)");
                Scale::Passthrough
            }
        };

        let fps = var(FPS_VAR).unwrap_or_else(|| {
            info!(fps = DEFAULT_FPS, "FPS not set, using default");
            DEFAULT_FPS.to_string()
        });
        if !fps.parse::<u32>().is_ok_and(|n| n > 0) {
            warn!(%fps, "FPS is not a positive integer, passing it through unchanged");
        }

        let pix_fmt = var(PIX_FMT_VAR).unwrap_or_else(|| {
            info!(pix_fmt = DEFAULT_PIX_FMT, "PIX_FMT not set, using default");
            DEFAULT_PIX_FMT.to_string()
        });

        Ok(Self {
            freq_mhz,
            audio: config.audio,
            scale,
            fps,
            pix_fmt,
        })
    }
}

// Default value functions
fn default_audio() -> bool {
    true
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_hacktv() -> String {
    "./hacktv".to_string()
}

fn default_mode() -> String {
    "m".to_string()
}

fn default_sample_rate() -> u32 {
    13_500_000
}

fn default_gain() -> u32 {
    40
}
