//! Regression test: a recorded Editor.log must always segment the same way

use logrelay_core::{LineSeverity, LogSegmenter, SegmentEvent};

const EDITOR_LOG: &str = include_str!("fixtures/editor.log");

fn segment(text: &str) -> (Vec<SegmentEvent>, usize) {
    let mut segmenter = LogSegmenter::new(Vec::new());
    for line in text.lines() {
        segmenter.log(line);
    }
    let (events, open) = segmenter.finish();
    (events, open.len())
}

fn line(text: &str, severity: LineSeverity) -> SegmentEvent {
    SegmentEvent::line(text, severity)
}

fn normal(text: &str) -> SegmentEvent {
    line(text, LineSeverity::Normal)
}

#[test]
fn test_editor_log_fixture_event_sequence() {
    let (events, open) = segment(EDITOR_LOG);

    let expected = vec![
        normal("Initialize engine version: 2021.3.16f1 (4016570cae0b)"),
        line(
            "WARNING: Shader Unsupported: 'Hidden/Foo' - All passes removed",
            LineSeverity::Warning,
        ),
        SegmentEvent::block_start(
            "Prepare",
            "Refresh: detecting if any assets need to be imported or removed ...",
        ),
        SegmentEvent::block_start("Update", "Assets/Scripts/Player.cs"),
        normal(" done: hash - 5d41402abc4b2a76b9719d911017c592"),
        SegmentEvent::block_end("Update"),
        normal("Refresh: elapses 0.42 seconds"),
        SegmentEvent::block_end("Prepare"),
        SegmentEvent::block_start("Compile", "Temp/Assembly-CSharp.dll"),
        line(
            "Assets/Scripts/Player.cs(12,5): error CS0103: The name 'speed' does not exist in the current context",
            LineSeverity::Error,
        ),
        line(
            "Assets/Scripts/Enemy.cs(40,13): warning CS0168: The variable 'e' is declared but never used",
            LineSeverity::Warning,
        ),
        normal("-----EndCompilerOutput---------------"),
        SegmentEvent::block_end("Compile"),
        SegmentEvent::block_start("Lightmap", "Assets/Scenes/Main.unity"),
        SegmentEvent::block_start("Update", "Assets/Lighting/Main_Lightmap-0.exr"),
        normal(" done: hash - 0cc175b9c0f1b6a831c399e269772661"),
        SegmentEvent::block_end("Update"),
        normal("[Lightmapping] Bake finished in 12.3s"),
        SegmentEvent::block_end("Lightmap"),
        normal("***Player size statistics***"),
        SegmentEvent::block_start("PlayerStatistics", "***Player size statistics***"),
        normal("Level 0 'Assets/Scenes/Main.unity' uses 1.2 mb compressed / 3.4 mb uncompressed."),
        normal("Total compressed size 4.5 mb. Total uncompressed size 9.8 mb."),
        SegmentEvent::block_end("PlayerStatistics"),
        normal(""),
        line(
            "NullReferenceException: Object reference not set to an instance of an object",
            LineSeverity::Failure,
        ),
        normal("  at Builder.Build () [0x00012] in Assets/Editor/Builder.cs:27"),
        line("Aborting batchmode due to failure:", LineSeverity::Failure),
        normal("Exiting batchmode successfully now!"),
    ];

    assert_eq!(events, expected);
    assert_eq!(open, 0, "every block in the fixture is closed");
}

#[test]
fn test_fixture_blocks_balance() {
    let (events, _) = segment(EDITOR_LOG);

    let mut depth = 0i32;
    let mut max_depth = 0i32;
    for event in &events {
        match event {
            SegmentEvent::BlockStart { .. } => depth += 1,
            SegmentEvent::BlockEnd { .. } => depth -= 1,
            SegmentEvent::Line { .. } => {}
        }
        assert!(depth >= 0, "block end without a start");
        max_depth = max_depth.max(depth);
    }
    assert_eq!(depth, 0);
    assert_eq!(max_depth, 2, "Update nests inside Prepare and Lightmap");
}

#[test]
fn test_fixture_is_stable_across_crlf() {
    let crlf = EDITOR_LOG.replace('\n', "\r\n");
    assert_eq!(segment(&crlf).0, segment(EDITOR_LOG).0);
}

#[test]
fn test_fixture_events_serialize_as_ndjson() {
    let (events, _) = segment(EDITOR_LOG);
    let first_block = events
        .iter()
        .find(|e| matches!(e, SegmentEvent::BlockStart { .. }))
        .unwrap();
    let json = serde_json::to_string(first_block).unwrap();
    assert!(json.starts_with(r#"{"event":"block_start","name":"Prepare""#));
}
