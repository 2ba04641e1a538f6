//! Run an external program while relaying its log to a console
//!
//! Order matters: the relay session is started (and the log baseline taken)
//! before the program is spawned, so the program's first write is seen as a
//! change even when it reuses an existing log file.

use std::path::PathBuf;
use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

use logrelay_core::prelude::*;
use logrelay_core::Locality;
use logrelay_tail::{CopyTaskResult, RelayReport};

use crate::annotator::{AnnotatingWriter, SeverityTally};
use crate::config::Settings;
use crate::paths::resolve_log_path;
use crate::process::{ExternalProcess, ProcessExit};
use crate::session::{RelaySession, SessionSummary};

/// One external program invocation plus command-line overrides
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory for the program and for relative log paths
    pub cwd: PathBuf,
    pub log_file: Option<PathBuf>,
    pub locality: Option<Locality>,
    pub annotate: Option<bool>,
    pub grace_period_ms: Option<u64>,
}

/// What happened during a run
#[derive(Debug)]
pub struct RunOutcome {
    pub log_path: PathBuf,
    pub exit: ProcessExit,
    /// The run was cut short by a shutdown request
    pub interrupted: bool,
    pub relay: RelayReport,
    pub copy: CopyTaskResult,
    /// Present when annotation was enabled
    pub tally: Option<SeverityTally>,
}

/// Run `options.program`, relaying its log into `console` until it exits.
///
/// Cancelling `shutdown` kills the program and skips the grace period.
pub async fn run_external<W>(
    options: RunOptions,
    settings: &Settings,
    console: W,
    shutdown: CancellationToken,
) -> Result<RunOutcome>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let log_path = resolve_log_path(
        options.log_file.as_deref(),
        &options.args,
        settings.log.path.as_deref(),
        &options.cwd,
    )?;
    let locality = options.locality.unwrap_or(settings.log.locality);
    let annotate = options.annotate.unwrap_or(settings.log.annotate);
    let mut relay_settings = settings.relay.clone();
    if let Some(grace) = options.grace_period_ms {
        relay_settings.grace_period_ms = grace;
    }

    info!(
        "Running {} with log {} (annotate: {}, {:?})",
        options.program,
        log_path.display(),
        annotate,
        locality
    );

    if annotate {
        let console = AnnotatingWriter::new(console, SeverityTally::new());
        let session = RelaySession::start(&log_path, console, locality, &relay_settings);
        let (exit, interrupted, summary) = supervise(&options, session, &shutdown).await?;

        let tally = summary.console.map(|writer| {
            let (_, tally, open) = writer.finish();
            if !open.is_empty() {
                let names: Vec<&str> = open.iter().map(|b| b.name()).collect();
                debug!("Blocks still open at end of log: {}", names.join(", "));
            }
            tally
        });
        Ok(RunOutcome {
            log_path,
            exit,
            interrupted,
            relay: summary.relay,
            copy: summary.copy,
            tally,
        })
    } else {
        let session = RelaySession::start(&log_path, console, locality, &relay_settings);
        let (exit, interrupted, summary) = supervise(&options, session, &shutdown).await?;
        Ok(RunOutcome {
            log_path,
            exit,
            interrupted,
            relay: summary.relay,
            copy: summary.copy,
            tally: None,
        })
    }
}

/// Spawn the program, wait for it (or for shutdown), then finish the session
async fn supervise<W>(
    options: &RunOptions,
    session: RelaySession<W>,
    shutdown: &CancellationToken,
) -> Result<(ProcessExit, bool, SessionSummary<W>)>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut process =
        match ExternalProcess::spawn(&options.program, &options.args, Some(&options.cwd)) {
            Ok(process) => process,
            Err(e) => {
                // Stop the relay so the console task does not outlive the error.
                if let Err(finish_err) = session.finish_after(Duration::ZERO).await {
                    warn!("Relay session did not stop cleanly: {}", finish_err);
                }
                return Err(e);
            }
        };

    let (exit, interrupted) = tokio::select! {
        exit = process.wait() => (exit?, false),
        _ = shutdown.cancelled() => {
            warn!("Interrupted, stopping {}", process.program());
            process.kill();
            (process.wait().await?, true)
        }
    };

    if exit.success() {
        info!("{} finished successfully", process.program());
    } else {
        warn!("{} exited with {:?}", process.program(), exit.code);
    }

    let summary = if interrupted {
        session.finish_after(Duration::ZERO).await?
    } else {
        session.finish().await?
    };
    Ok((exit, interrupted, summary))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::RelaySettings;
    use logrelay_core::LineSeverity;
    use tempfile::tempdir;

    fn fast_settings() -> Settings {
        Settings {
            relay: RelaySettings {
                poll_interval_ms: 10,
                detect_interval_ms: 5,
                grace_period_ms: 100,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn shell(script: &str, cwd: PathBuf) -> RunOptions {
        RunOptions {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            cwd,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_run_relays_and_tallies_explicit_log() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("build.log");
        let mut options = shell(
            "printf 'Starting build\\nError: missing asset\\n' >> build.log; exit 2",
            dir.path().to_path_buf(),
        );
        options.log_file = Some(PathBuf::from("build.log"));

        let outcome = run_external(
            options,
            &fast_settings(),
            Vec::new(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.log_path, log);
        assert_eq!(outcome.exit.code, Some(2));
        assert!(!outcome.interrupted);
        assert_eq!(outcome.relay.bytes_copied, 36);
        assert!(outcome.copy.is_success());

        let tally = outcome.tally.unwrap();
        assert_eq!(tally.count(LineSeverity::Error), 1);
        assert_eq!(tally.total_lines(), 2);
    }

    #[tokio::test]
    async fn test_run_without_annotation_has_no_tally() {
        let dir = tempdir().unwrap();
        let mut options = shell("echo quiet >> out.log", dir.path().to_path_buf());
        options.log_file = Some(dir.path().join("out.log"));
        options.annotate = Some(false);

        let outcome = run_external(
            options,
            &fast_settings(),
            Vec::new(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(outcome.exit.success());
        assert!(outcome.tally.is_none());
        assert_eq!(outcome.relay.bytes_copied, 6);
    }

    #[tokio::test]
    async fn test_shutdown_kills_program() {
        let dir = tempdir().unwrap();
        let mut options = shell("sleep 30", dir.path().to_path_buf());
        options.log_file = Some(dir.path().join("never.log"));

        let shutdown = CancellationToken::new();
        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            run_external(options, &fast_settings(), Vec::new(), shutdown),
        )
        .await
        .unwrap()
        .unwrap();

        assert!(outcome.interrupted);
        assert!(outcome.exit.killed);
    }

    #[tokio::test]
    async fn test_missing_program_stops_relay_and_fails() {
        let dir = tempdir().unwrap();
        let options = RunOptions {
            program: "logrelay-no-such-program".to_string(),
            cwd: dir.path().to_path_buf(),
            log_file: Some(dir.path().join("x.log")),
            ..Default::default()
        };

        let err = run_external(
            options,
            &fast_settings(),
            Vec::new(),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::ProgramNotFound { .. }));
    }
}
