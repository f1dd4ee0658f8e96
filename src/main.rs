use rtmp_transmitter::{Config, PipelineConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout belongs to the modulator
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    if std::env::args_os().len() <= 1 {
        println!("{}", rtmp_transmitter::usage());
        std::process::exit(1);
    }

    init_tracing();

    let config = Config::load()?;
    let pipeline = PipelineConfig::resolve(&config)?;

    let report = rtmp_transmitter::run(&config, &pipeline).await?;
    if report.succeeded() {
        info!("Stream ended");
    } else {
        warn!(?report, "Stream ended with errors");
    }

    Ok(())
}
