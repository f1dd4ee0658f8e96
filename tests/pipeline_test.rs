#![cfg(unix)]

use rtmp_transmitter::pipeline::launch;
use rtmp_transmitter::stage::{
    MODULATION_STAGE, StageInput, StageName, StageOutput, StagePair, StageSpec, TRANSCODE_STAGE,
};
use rtmp_transmitter::{StageState, Termination};
use std::time::{Duration, Instant};

fn shell(name: StageName, script: String, stdin: StageInput, stdout: StageOutput) -> StageSpec {
    StageSpec {
        name,
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script],
        stdin,
        stdout,
    }
}

fn stages(producer: &str, consumer: &str) -> StagePair {
    StagePair {
        transcode: shell(
            TRANSCODE_STAGE,
            producer.to_string(),
            StageInput::Null,
            StageOutput::Pipe,
        ),
        modulation: shell(
            MODULATION_STAGE,
            consumer.to_string(),
            StageInput::Pipe,
            StageOutput::Inherit,
        ),
    }
}

/// Bytes written by the producer arrive at the consumer, which sees EOF once the producer exits
#[tokio::test]
async fn test_frames_flow_through_the_pipe() {
    let pair = stages(
        "printf 'YUV4MPEG2 W720 H480'",
        r#"test "$(cat)" = "YUV4MPEG2 W720 H480""#,
    );

    let report = launch(&pair).unwrap().supervise().await.unwrap();

    assert!(report.succeeded(), "{report:?}");
}

#[tokio::test]
async fn test_producer_failure_is_reported_not_raised() {
    let pair = stages("printf partial; exit 3", "cat > /dev/null");

    let report = launch(&pair).unwrap().supervise().await.unwrap();

    match report.transcode {
        StageState::Terminated(Termination::Exited(status)) => assert_eq!(status.code(), Some(3)),
        other => panic!("unexpected producer state {other:?}"),
    }
    assert!(report.modulation.succeeded());
}

#[tokio::test]
async fn test_consumer_start_failure_never_starts_producer() {
    let workspace = tempfile::tempdir().unwrap();
    let marker = workspace.path().join("started");

    let mut pair = stages(&format!("touch '{}'", marker.display()), "cat");
    pair.modulation.program = workspace.path().join("missing").display().to_string();

    assert!(launch(&pair).unwrap().supervise().await.is_err());
    assert!(!marker.exists());
}

#[tokio::test]
async fn test_producer_start_failure_kills_consumer() {
    let mut pair = stages("true", "sleep 30");
    pair.transcode.program = "/nonexistent/ffmpeg".to_string();

    let started = Instant::now();
    let error = launch(&pair).unwrap().supervise().await.unwrap_err();

    assert!(format!("{error:#}").contains("Failed to start ffmpeg"));
    assert!(started.elapsed() < Duration::from_secs(10));
}
