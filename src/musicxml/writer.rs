use crate::model::*;
use crate::similarity::Severity;
use std::collections::BTreeSet;

/// Divisions per quarter note in exported documents.
/// Divisible by 2, 3, 4, 5, 6 and 8 so common tuplets come out whole.
pub const DIVISIONS: u32 = 480;

/// Convert a Score to MusicXML format
pub fn to_musicxml(score: &Score) -> String {
    let mut xml = String::new();

    // XML declaration and doctype
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(r#"<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 4.0 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">"#);
    xml.push('\n');

    xml.push_str(r#"<score-partwise version="4.0">"#);
    xml.push('\n');

    if let Some(title) = &score.metadata.title {
        xml.push_str("  <work>\n");
        xml.push_str(&format!("    <work-title>{}</work-title>\n", escape_xml(title)));
        xml.push_str("  </work>\n");
    }

    if let Some(composer) = &score.metadata.composer {
        xml.push_str("  <identification>\n");
        xml.push_str(&format!(
            "    <creator type=\"composer\">{}</creator>\n",
            escape_xml(composer)
        ));
        xml.push_str("  </identification>\n");
    }

    // Part list
    xml.push_str("  <part-list>\n");
    for (i, part) in score.parts.iter().enumerate() {
        xml.push_str(&format!(
            "    <score-part id=\"{}\">\n",
            escape_xml(&part_id(part, i))
        ));
        xml.push_str(&format!(
            "      <part-name>{}</part-name>\n",
            escape_xml(&part.name)
        ));
        xml.push_str("    </score-part>\n");
    }
    xml.push_str("  </part-list>\n");

    for (i, part) in score.parts.iter().enumerate() {
        xml.push_str(&format!("  <part id=\"{}\">\n", escape_xml(&part_id(part, i))));
        for (j, measure) in part.measures.iter().enumerate() {
            xml.push_str(&measure_to_xml(measure, j == 0));
        }
        xml.push_str("  </part>\n");
    }

    xml.push_str("</score-partwise>\n");
    xml
}

/// Parts without an id get the same `P{n}` the reader synthesizes
fn part_id(part: &Part, index: usize) -> String {
    if part.id.is_empty() {
        format!("P{}", index + 1)
    } else {
        part.id.clone()
    }
}

fn measure_to_xml(measure: &Measure, first_in_part: bool) -> String {
    let mut xml = String::new();

    xml.push_str(&format!("    <measure number=\"{}\">\n", measure.number));

    if measure.repeat_start {
        xml.push_str("      <barline location=\"left\">\n");
        xml.push_str("        <bar-style>heavy-light</bar-style>\n");
        xml.push_str("        <repeat direction=\"forward\"/>\n");
        xml.push_str("      </barline>\n");
    }

    let has_attributes = first_in_part
        || measure.key_signature.is_some()
        || measure.time_signature.is_some()
        || measure.clef.is_some();
    if has_attributes {
        xml.push_str("      <attributes>\n");
        if first_in_part {
            xml.push_str(&format!("        <divisions>{}</divisions>\n", DIVISIONS));
        }
        if let Some(key) = &measure.key_signature {
            xml.push_str("        <key>\n");
            xml.push_str(&format!("          <fifths>{}</fifths>\n", key.fifths));
            if key.mode == Mode::Minor {
                xml.push_str("          <mode>minor</mode>\n");
            }
            xml.push_str("        </key>\n");
        }
        if let Some(time) = &measure.time_signature {
            xml.push_str("        <time>\n");
            xml.push_str(&format!("          <beats>{}</beats>\n", time.beats));
            xml.push_str(&format!("          <beat-type>{}</beat-type>\n", time.beat_type));
            xml.push_str("        </time>\n");
        }
        if let Some(clef) = &measure.clef {
            xml.push_str("        <clef>\n");
            xml.push_str(&format!("          <sign>{}</sign>\n", clef.sign.musicxml_sign()));
            if let Some(line) = clef.line {
                xml.push_str(&format!("          <line>{}</line>\n", line));
            }
            if clef.octave_change != 0 {
                xml.push_str(&format!(
                    "          <clef-octave-change>{}</clef-octave-change>\n",
                    clef.octave_change
                ));
            }
            xml.push_str("        </clef>\n");
        }
        xml.push_str("      </attributes>\n");
    }

    for event in &measure.events {
        xml.push_str(&event_to_xml(event));
    }

    if measure.repeat_end {
        xml.push_str("      <barline location=\"right\">\n");
        xml.push_str("        <bar-style>light-heavy</bar-style>\n");
        xml.push_str("        <repeat direction=\"backward\"/>\n");
        xml.push_str("      </barline>\n");
    }

    xml.push_str("    </measure>\n");
    xml
}

fn event_to_xml(event: &Event) -> String {
    match event {
        Event::Note(note) => note_to_xml(
            &note.pitch,
            false,
            &note.duration,
            note.stem,
            &note.articulations,
            note.highlight,
        ),
        Event::Chord(chord) => {
            // First pitch carries the chord; the others are marked <chord/>
            chord
                .pitches
                .iter()
                .enumerate()
                .map(|(i, pitch)| {
                    note_to_xml(
                        pitch,
                        i > 0,
                        &chord.duration,
                        chord.stem,
                        &chord.articulations,
                        chord.highlight,
                    )
                })
                .collect()
        }
        Event::Rest(rest) => rest_to_xml(&rest.duration, rest.highlight),
    }
}

fn note_open(highlight: Option<Severity>) -> String {
    match highlight.and_then(|s| s.color()) {
        Some(color) => format!("      <note color=\"{}\">\n", color),
        None => "      <note>\n".to_string(),
    }
}

fn note_to_xml(
    pitch: &Pitch,
    in_chord: bool,
    duration: &Duration,
    stem: Option<Stem>,
    articulations: &BTreeSet<Articulation>,
    highlight: Option<Severity>,
) -> String {
    let mut xml = note_open(highlight);

    if in_chord {
        xml.push_str("        <chord/>\n");
    }

    // Pitch
    xml.push_str("        <pitch>\n");
    xml.push_str(&format!("          <step>{}</step>\n", pitch.step.as_str()));
    if pitch.alter != 0 {
        xml.push_str(&format!("          <alter>{}</alter>\n", pitch.alter));
    }
    xml.push_str(&format!("          <octave>{}</octave>\n", pitch.octave));
    xml.push_str("        </pitch>\n");

    xml.push_str(&duration_to_xml(duration));

    if let Some(stem) = stem {
        xml.push_str(&format!("        <stem>{}</stem>\n", stem.musicxml_value()));
    }

    // Articulations are written once, on the first note of a chord
    if !articulations.is_empty() && !in_chord {
        xml.push_str("        <notations>\n");
        xml.push_str("          <articulations>\n");
        for articulation in articulations {
            xml.push_str(&format!("            <{}/>\n", articulation.musicxml_tag()));
        }
        xml.push_str("          </articulations>\n");
        xml.push_str("        </notations>\n");
    }

    xml.push_str("      </note>\n");
    xml
}

fn rest_to_xml(duration: &Duration, highlight: Option<Severity>) -> String {
    let mut xml = note_open(highlight);
    xml.push_str("        <rest/>\n");
    xml.push_str(&duration_to_xml(duration));
    xml.push_str("      </note>\n");
    xml
}

/// `<duration>`, `<type>` and `<dot/>` elements, in that order
fn duration_to_xml(duration: &Duration) -> String {
    let mut xml = format!(
        "        <duration>{}</duration>\n",
        duration_to_divisions(duration.quarter_length)
    );
    if let Some(note_type) = duration.note_type {
        xml.push_str(&format!("        <type>{}</type>\n", note_type.musicxml_type()));
        for _ in 0..duration.dots {
            xml.push_str("        <dot/>\n");
        }
    }
    xml
}

/// Convert a length in quarter notes to MusicXML divisions
fn duration_to_divisions(quarter_length: f64) -> u32 {
    (quarter_length * DIVISIONS as f64).round().max(0.0) as u32
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
