//! Integration tests for musicmerge
//!
//! Tests the full pipeline from MusicXML text through comparison and merging back to
//! MusicXML output.

use musicmerge::*;
use std::io::Cursor;

/// One `<note>` element: `"C4 1"` for a quarter C4, `"r 2"` for a half rest.
/// Durations are in quarter notes with `divisions` = 2.
fn note(text: &str) -> String {
    let (head, length) = text.split_once(' ').unwrap();
    let quarters: f64 = length.parse().unwrap();
    let note_type = match quarters {
        q if q == 4.0 => "whole",
        q if q == 2.0 => "half",
        q if q == 1.0 => "quarter",
        _ => "eighth",
    };
    let duration = (quarters * 2.0) as u32;
    if head == "r" {
        return format!(
            "<note><rest/><duration>{}</duration><type>{}</type></note>",
            duration, note_type
        );
    }
    let (step, octave) = head.split_at(1);
    format!(
        "<note><pitch><step>{}</step><octave>{}</octave></pitch><duration>{}</duration><type>{}</type></note>",
        step, octave, duration, note_type
    )
}

/// A part as a list of measures, each measure a list of note specs
fn part_xml(id: &str, measures: &[&[&str]]) -> String {
    let mut xml = format!("<part id=\"{}\">", id);
    for (i, notes) in measures.iter().enumerate() {
        xml.push_str(&format!("<measure number=\"{}\">", i + 1));
        if i == 0 {
            xml.push_str(
                "<attributes><divisions>2</divisions><time><beats>4</beats><beat-type>4</beat-type></time>\
                 <clef><sign>G</sign><line>2</line></clef></attributes>",
            );
        }
        for n in notes.iter() {
            xml.push_str(&note(n));
        }
        xml.push_str("</measure>");
    }
    xml.push_str("</part>");
    xml
}

fn score_xml(parts: &[(&str, &str, &[&[&str]])]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<score-partwise version=\"4.0\"><part-list>");
    for (id, name, _) in parts {
        xml.push_str(&format!(
            "<score-part id=\"{}\"><part-name>{}</part-name></score-part>",
            id, name
        ));
    }
    xml.push_str("</part-list>");
    for (id, _, measures) in parts {
        xml.push_str(&part_xml(id, measures));
    }
    xml.push_str("</score-partwise>");
    xml
}

fn first_version() -> Score {
    parse_musicxml(&score_xml(&[
        (
            "P1",
            "Flute",
            &[&["C5 1", "D5 1", "E5 2"], &["F5 4"], &["G5 2", "r 2"]],
        ),
        ("P2", "Cello", &[&["C3 4"], &["G2 4"], &["C3 4"]]),
    ]))
    .unwrap()
}

fn second_version() -> Score {
    parse_musicxml(&score_xml(&[
        (
            "P1",
            "Flute",
            // m.2 changes pitch
            &[&["C5 1", "D5 1", "E5 2"], &["A5 4"], &["G5 2", "r 2"]],
        ),
        // m.3 changes rhythm
        ("P2", "Cello", &[&["C3 4"], &["G2 4"], &["C3 2", "C3 2"]]),
    ]))
    .unwrap()
}

#[test]
fn test_compare_finds_changed_measures() {
    let a = first_version();
    let b = second_version();
    let report = compare(&a, &b).unwrap();

    let found: Vec<(&str, u32)> = report
        .iter()
        .map(|(part, diff)| (part.part_id.as_str(), diff.number))
        .collect();
    assert_eq!(found, vec![("P1", 2), ("P2", 3)]);
    assert_eq!(report.parts[0].part_name, "Flute");
}

#[test]
fn test_keep_second_everywhere_reproduces_second_score() {
    let a = first_version();
    let b = second_version();
    let report = compare(&a, &b).unwrap();
    let mut session = MergeSession::new(&a, report);
    while !session.is_finished() {
        assert_eq!(session.keep_second().unwrap(), Materialization::Replaced);
    }
    assert_eq!(session.state(), SessionState::Complete);

    // Export and read back before comparing
    let merged = parse_musicxml(&to_musicxml(session.merged())).unwrap();
    assert!(compare(&merged, &b).unwrap().is_empty());
}

#[test]
fn test_keep_first_everywhere_reproduces_first_score() {
    let a = first_version();
    let b = second_version();
    let report = compare(&a, &b).unwrap();
    let mut session = MergeSession::new(&a, report);
    while !session.is_finished() {
        assert_eq!(session.keep_first().unwrap(), Materialization::Kept);
    }
    let merged = session.into_merged();
    assert_eq!(merged, a);
}

#[test]
fn test_cancel_keeps_decisions_so_far() {
    let a = first_version();
    let b = second_version();
    let report = compare(&a, &b).unwrap();
    let mut session = MergeSession::new(&a, report);

    session.keep_second().unwrap();
    let merged = session.cancel().clone();
    assert_eq!(session.state(), SessionState::Cancelled);
    assert!(matches!(
        session.keep_second(),
        Err(MergeError::NoCurrentDifference)
    ));

    assert_eq!(merged.parts[0].measures[1], b.parts[0].measures[1]);
    assert_eq!(merged.parts[1].measures[2], a.parts[1].measures[2]);
}

#[test]
fn test_resume_from_saved_log() {
    let a = first_version();
    let b = second_version();

    let mut session = MergeSession::new(&a, compare(&a, &b).unwrap());
    session.keep_second().unwrap();
    let yaml = session.decision_log().to_yaml().unwrap();

    let log = DecisionLog::from_yaml(&yaml).unwrap();
    let mut resumed = MergeSession::replay(&a, compare(&a, &b).unwrap(), &log).unwrap();
    assert_eq!(resumed.counter(), 2);
    let position = resumed.position().unwrap();
    assert_eq!(position.part_id, "P2");
    assert_eq!(position.measure_number, 3);

    resumed.keep_first().unwrap();
    assert_eq!(resumed.decisions(), &[Source::Second, Source::First]);
    assert_eq!(resumed.merged().parts[0].measures[1], b.parts[0].measures[1]);
}

#[test]
fn test_highlighted_measure_exports_colors() {
    let a = first_version();
    let b = second_version();
    let report = compare(&a, &b).unwrap();
    let session = MergeSession::new(&a, report);

    let highlighted = session.highlighted().unwrap();
    assert_eq!(highlighted.events[0].highlight(), Some(Severity::Major));

    let xml = to_musicxml(&measure_to_score("P1", "Flute", &highlighted));
    assert!(xml.contains("<note color=\"#FF0000\">"));
    // The source scores are never annotated
    assert!(a.parts[0].measures[1].events[0].highlight().is_none());
}

#[test]
fn test_prompt_drives_full_merge() {
    let a = first_version();
    let b = second_version();
    let mut session = MergeSession::new(&a, compare(&a, &b).unwrap());
    let preview = TextPreview::new(Vec::new());
    let mut output = Vec::new();

    let outcome = run_prompt(
        &mut session,
        &preview,
        Cursor::new("n\nc2\nbogus\nc1\n"),
        &mut output,
    )
    .unwrap();

    assert_eq!(outcome, PromptOutcome::Completed);
    let output = String::from_utf8(output).unwrap();
    assert!(output.contains("Checking part: Flute"));
    assert!(output.contains("Checking part: Cello"));
    assert!(output.contains("Invalid option. Try again."));

    let shown = String::from_utf8(preview.into_inner()).unwrap();
    assert_eq!(shown, "Flute (differences): m.2 | F5 4 [major] |\n");

    let merged = session.into_merged();
    assert_eq!(merged.parts[0].measures[1], b.parts[0].measures[1]);
    assert_eq!(merged.parts[1].measures[2], a.parts[1].measures[2]);
}

#[test]
fn test_structural_mismatch_is_reported_before_merging() {
    let a = score_xml(&[("P1", "Flute", &[&["C5 4"], &["D5 4"]])]);
    let b = score_xml(&[("P1", "Flute", &[&["C5 4"], &["D5 4"], &["E5 4"]])]);
    match count_differences(&a, &b) {
        Err(MergeError::StructuralMismatch(StructuralMismatch::MeasureCount {
            first, second, ..
        })) => {
            assert_eq!((first, second), (2, 3));
        }
        other => panic!("expected a measure count mismatch, got {:?}", other),
    }
}

/// Three bars numbered `1`, `X`, `2`; the reader numbers them 1, 2, 2
fn repeated_number_xml(last: &str) -> String {
    score_xml(&[("P1", "Flute", &[&["C4 4"], &["D4 4"], &[last]])])
        .replace("<measure number=\"2\">", "<measure number=\"X\">")
        .replace("<measure number=\"3\">", "<measure number=\"2\">")
}

#[test]
fn test_keep_second_on_repeated_measure_number_lands_in_paired_bar() {
    let a = parse_musicxml(&repeated_number_xml("E4 4")).unwrap();
    let b = parse_musicxml(&repeated_number_xml("F4 4")).unwrap();
    let numbers: Vec<u32> = a.parts[0].measures.iter().map(|m| m.number).collect();
    assert_eq!(numbers, vec![1, 2, 2]);

    let mut session = MergeSession::new(&a, compare(&a, &b).unwrap());
    assert_eq!(session.report().len(), 1);
    assert_eq!(session.keep_second().unwrap(), Materialization::Replaced);

    let merged = session.into_merged();
    let bars: Vec<String> = merged.parts[0].measures.iter().map(|m| m.to_string()).collect();
    assert_eq!(bars[1], a.parts[0].measures[1].to_string());
    assert_eq!(bars[2], b.parts[0].measures[2].to_string());
    assert!(compare(&merged, &b).unwrap().is_empty());
}

#[test]
fn test_identical_documents_have_no_differences() {
    let xml = score_xml(&[("P1", "Flute", &[&["C5 1", "r 1", "E5 2"]])]);
    assert_eq!(count_differences(&xml, &xml).unwrap(), 0);
}
