//! End-of-run report printed to stderr

use logrelay_app::RunOutcome;
use logrelay_tail::RelayEnd;

/// Exit status for an interrupted run (128 + SIGINT)
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Lines describing how a run went, without trailing newlines
pub fn render_run_report(outcome: &RunOutcome) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(failure) = &outcome.copy.failure {
        lines.push(format!("Console output stopped early: {}", failure));
    }
    match &outcome.relay.end {
        RelayEnd::Failed { message } => lines.push(format!("Log relay failed: {}", message)),
        RelayEnd::NeverDetected => lines.push(format!(
            "No output appeared in {}",
            outcome.log_path.display()
        )),
        RelayEnd::Cancelled => {}
    }
    if outcome.relay.restarts > 0 {
        lines.push(format!(
            "Log was truncated or replaced {} time(s) during the run",
            outcome.relay.restarts
        ));
    }

    if let Some(tally) = &outcome.tally {
        lines.push(format!("Log summary: {}", tally.summary()));
        if let Some(failure) = tally.first_failure() {
            lines.push(format!("First failure: {}", failure));
        }
    }

    if outcome.interrupted {
        lines.push("Interrupted".to_string());
    } else {
        match outcome.exit.code {
            Some(code) => lines.push(format!("Process exited with code {}", code)),
            None => lines.push("Process ended without an exit code".to_string()),
        }
    }
    lines
}

/// Exit status to propagate for a finished run
pub fn run_exit_code(outcome: &RunOutcome) -> i32 {
    if outcome.interrupted {
        INTERRUPTED_EXIT_CODE
    } else {
        outcome.exit.exit_code()
    }
}
