//! End-to-end tailing scenarios: file -> relay -> pipe -> copy task -> console

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use logrelay_core::Locality;
use logrelay_tail::{
    channel, CancellationToken, CopyRelayTask, RelayEnd, TailConfig, TailRelay,
    DEFAULT_PIPE_CAPACITY,
};
use tempfile::tempdir;

fn append(path: &Path, bytes: &[u8]) {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(bytes).unwrap();
}

fn fast_config() -> TailConfig {
    TailConfig::default()
        .with_poll_interval(Duration::from_millis(10))
        .with_detect_interval(Duration::from_millis(5))
}

/// The previous run's log is renamed away and a fresh one is created in its
/// place; only the fresh content is relayed.
#[tokio::test]
async fn test_rename_then_recreate_relays_only_new_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Editor.log");
    std::fs::write(&path, "output of the previous run\n").unwrap();

    let relay = TailRelay::new(&path, fast_config());
    let cancel = CancellationToken::new();
    let mut sink = Vec::new();

    let driver = async {
        tokio::time::sleep(Duration::from_millis(40)).await;
        std::fs::rename(&path, dir.path().join("Editor-prev.log")).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        append(&path, b"A");
        tokio::time::sleep(Duration::from_millis(20)).await;
        append(&path, b"B");
        tokio::time::sleep(Duration::from_millis(80)).await;
        cancel.cancel();
    };
    let (report, ()) = tokio::join!(relay.run(&mut sink, &cancel), driver);

    assert_eq!(sink, b"AB");
    assert_eq!(report.bytes_copied, 2);
    assert_eq!(report.end, RelayEnd::Cancelled);
}

async fn run_pipeline(locality: Locality) -> (Vec<u8>, u64) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Editor.log");

    let (reader, writer) = channel::create(locality, DEFAULT_PIPE_CAPACITY);
    let cancel = CancellationToken::new();
    let relay = TailRelay::new(&path, fast_config().with_close_sink(true));
    let relay_handle = relay.spawn(writer, cancel.clone());
    let console = CopyRelayTask::spawn("console", reader, Vec::new(), false);

    let mut expected = Vec::new();
    for i in 0..50 {
        let line = format!("line {i}: {}\n", "x".repeat(i * 37));
        append(&path, line.as_bytes());
        expected.extend_from_slice(line.as_bytes());
        if i % 10 == 0 {
            tokio::time::sleep(Duration::from_millis(15)).await;
        }
    }
    tokio::time::sleep(Duration::from_millis(60)).await;
    cancel.cancel();

    let report = relay_handle.await.unwrap();
    let (result, output) = console.join().await.unwrap();
    assert!(result.is_success());
    assert_eq!(report.end, RelayEnd::Cancelled);
    assert_eq!(report.bytes_copied, expected.len() as u64);

    let output = output.unwrap();
    assert_eq!(output, expected);
    (output, result.bytes_copied)
}

#[tokio::test]
async fn test_local_pipeline_delivers_every_byte_in_order() {
    let (output, copied) = run_pipeline(Locality::Local).await;
    assert_eq!(copied, output.len() as u64);
}

#[tokio::test]
async fn test_remote_pipeline_delivers_every_byte_in_order() {
    let (output, copied) = run_pipeline(Locality::Remote).await;
    assert_eq!(copied, output.len() as u64);
}

#[tokio::test]
async fn test_severed_remote_link_fails_relay_without_panicking() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Editor.log");

    let (mut reader, writer) = channel::create(Locality::Remote, DEFAULT_PIPE_CAPACITY);
    let cancel = CancellationToken::new();
    let relay_handle =
        TailRelay::new(&path, fast_config().with_close_sink(true)).spawn(writer, cancel.clone());

    reader.sever_link();
    append(&path, b"nobody will read this\n");

    let report = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            tokio::time::sleep(Duration::from_millis(20)).await;
            append(&path, b"more\n");
            if relay_handle.is_finished() {
                break;
            }
        }
        relay_handle.await.unwrap()
    })
    .await
    .expect("relay ends once its sink is gone");

    match report.end {
        RelayEnd::Failed { message } => assert!(message.contains("boundary connection closed")),
        other => panic!("expected failure, got {other:?}"),
    }
}
