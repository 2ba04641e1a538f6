//! The log path is taken from the program's own `-logFile` argument

#![cfg(unix)]

use std::path::PathBuf;

use logrelay_app::config::{RelaySettings, Settings};
use logrelay_app::{run_external, RunOptions};
use logrelay_core::LineSeverity;
use logrelay_tail::{CancellationToken, RelayEnd};
use tempfile::tempdir;

fn fast_settings() -> Settings {
    Settings {
        relay: RelaySettings {
            poll_interval_ms: 10,
            detect_interval_ms: 5,
            grace_period_ms: 150,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// `sh -c SCRIPT NAME -logFile PATH` sees `-logFile` as `$1` and the path as `$2`
fn editor_like(script: &str, log: &str, cwd: PathBuf) -> RunOptions {
    RunOptions {
        program: "sh".to_string(),
        args: vec![
            "-c".to_string(),
            script.to_string(),
            "fake-editor".to_string(),
            "-logFile".to_string(),
            log.to_string(),
        ],
        cwd,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_log_file_argument_is_followed() {
    let dir = tempdir().unwrap();
    let script = r#"
printf '%s\n' '-----CompilerOutput:-stdout--exitcode: 1--compilationhadfailure: True--outfile: Temp/Game.dll' >> "$2"
printf 'Assets/Game.cs(3,7): error CS1002: ; expected\n' >> "$2"
printf '%s\n' '-----EndCompilerOutput---------------' >> "$2"
printf 'Scripts have compiler errors.\n' >> "$2"
exit 1
"#;
    let options = editor_like(script, "Logs/editor.log", dir.path().to_path_buf());
    std::fs::create_dir_all(dir.path().join("Logs")).unwrap();

    let outcome = run_external(
        options,
        &fast_settings(),
        Vec::new(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.log_path, dir.path().join("Logs/editor.log"));
    assert_eq!(outcome.exit.code, Some(1));
    assert_eq!(outcome.relay.end, RelayEnd::Cancelled);

    let tally = outcome.tally.unwrap();
    assert_eq!(tally.blocks_completed(), 1);
    assert_eq!(tally.count(LineSeverity::Error), 1);
    assert_eq!(tally.count(LineSeverity::Failure), 1);
    assert_eq!(tally.first_failure(), Some("Scripts have compiler errors."));
}

#[tokio::test]
async fn test_stale_log_content_is_not_relayed() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("editor.log");
    std::fs::write(&log, "Error: left over from yesterday\n").unwrap();

    let script = r#"
mv "$2" "$2.prev"
printf 'fresh run\n' > "$2"
"#;
    let options = editor_like(script, log.to_str().unwrap(), dir.path().to_path_buf());

    let outcome = run_external(
        options,
        &fast_settings(),
        Vec::new(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(outcome.exit.success());
    assert_eq!(outcome.relay.bytes_copied, "fresh run\n".len() as u64);
    let tally = outcome.tally.unwrap();
    assert_eq!(tally.total_lines(), 1);
    assert!(!tally.has_problems());
}
