//! Offline segmentation of a saved log file
//!
//! Text output indents each line by its block depth. JSON output is NDJSON,
//! one event per line, so scripts can consume it without parsing the text
//! layout.
//!
//! # Example Output
//!
//! ```json
//! {"event":"block_start","name":"Compile","captured":"Temp/Assembly-CSharp.dll","line":8,"timestamp":1704700001000}
//! {"event":"line","text":"Assets/Player.cs(12,5): error CS0103: ...","severity":"error","line":9,"timestamp":1704700001000}
//! ```

use std::io::{BufRead, Write};

use chrono::Utc;
use serde::Serialize;

use logrelay_app::SeverityTally;
use logrelay_core::prelude::*;
use logrelay_core::{LineSeverity, LogSegmenter, SegmentEvent, SegmentListener};

/// How `parse` prints events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// One NDJSON record
#[derive(Debug, Serialize)]
struct EventRecord<'a> {
    #[serde(flatten)]
    event: &'a SegmentEvent,
    /// 1-based input line that produced the event
    line: usize,
    timestamp: i64,
}

/// Totals for one parsed file
#[derive(Debug, Default)]
pub struct ParseSummary {
    pub lines: usize,
    pub tally: SeverityTally,
    /// Blocks still open at end of input, outermost first
    pub open_blocks: Vec<String>,
}

/// Segment every line of `input`, writing events to `output`
pub fn parse_log<R, W>(mut input: R, output: &mut W, format: OutputFormat) -> Result<ParseSummary>
where
    R: BufRead,
    W: Write + ?Sized,
{
    let mut segmenter = LogSegmenter::new(Vec::<SegmentEvent>::new());
    let mut tally = SeverityTally::new();
    let mut buf = Vec::new();
    let mut line_no = 0usize;

    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;

        let mut line: &[u8] = &buf;
        while let Some((&(b'\n' | b'\r'), head)) = line.split_last() {
            line = head;
        }
        let text = String::from_utf8_lossy(line);

        let depth_before = segmenter.depth();
        segmenter.log(&text);
        let events = std::mem::take(segmenter.listener_mut());

        let mut depth = depth_before;
        for event in &events {
            tally.on_event(event);
            if let SegmentEvent::BlockEnd { .. } = event {
                depth = depth.saturating_sub(1);
            }
            match format {
                OutputFormat::Json => write_json(output, event, line_no)?,
                OutputFormat::Text => write_text(output, event, depth)?,
            }
            if let SegmentEvent::BlockStart { .. } = event {
                depth += 1;
            }
        }
    }
    output.flush()?;

    let (_, open) = segmenter.finish();
    Ok(ParseSummary {
        lines: line_no,
        tally,
        open_blocks: open.iter().map(|b| b.name().to_string()).collect(),
    })
}

fn write_json<W: Write + ?Sized>(output: &mut W, event: &SegmentEvent, line: usize) -> Result<()> {
    let record = EventRecord {
        event,
        line,
        timestamp: Utc::now().timestamp_millis(),
    };
    let json = serde_json::to_string(&record).map_err(std::io::Error::from)?;
    writeln!(output, "{}", json)?;
    Ok(())
}

fn write_text<W: Write + ?Sized>(output: &mut W, event: &SegmentEvent, depth: usize) -> Result<()> {
    let indent = "  ".repeat(depth);
    match event {
        SegmentEvent::BlockStart { name, captured } => {
            writeln!(output, "{indent}> {name}: {captured}")?;
        }
        SegmentEvent::BlockEnd { name } => {
            writeln!(output, "{indent}< {name}")?;
        }
        SegmentEvent::Line { text, severity } => match severity {
            LineSeverity::Normal => writeln!(output, "{indent}{text}")?,
            other => writeln!(output, "{indent}[{other}] {text}")?,
        },
    }
    Ok(())
}
