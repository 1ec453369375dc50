//! MusicXML import
//!
//! Streams a `score-partwise` document through `quick-xml` and builds a [`Score`].
//! Only what the differ and the writer need is read; everything else is skipped.

use crate::error::MergeError;
use crate::model::{
    Articulation, Chord, Clef, ClefSign, Duration, Event, KeySignature, Measure, Mode, Note,
    NoteName, NoteType, Part, Pitch, Rest, Score, Stem, TimeSignature,
};
use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::Reader;
use std::collections::BTreeSet;

/// Parse a `score-partwise` MusicXML document
///
/// # Errors
/// [`MergeError::MusicXml`] for malformed XML, a different root element, or a note
/// whose pitch cannot be read.
pub fn parse_musicxml(xml: &str) -> Result<Score, MergeError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut builder = ScoreBuilder::default();
    let mut path: Vec<String> = Vec::new();

    loop {
        let position = reader.buffer_position();
        let step = match reader.read_event() {
            Ok(XmlEvent::Start(e)) => {
                let name = local_name(&e);
                let result = builder.start(&name, &e, &path);
                path.push(name);
                result
            }
            Ok(XmlEvent::Empty(e)) => {
                let name = local_name(&e);
                builder
                    .start(&name, &e, &path)
                    .and_then(|_| builder.end(&name, &path))
            }
            Ok(XmlEvent::End(_)) => match path.pop() {
                Some(name) => builder.end(&name, &path),
                None => Ok(()),
            },
            Ok(XmlEvent::Text(t)) => match t.unescape() {
                Ok(text) => builder.text(&path, &text),
                Err(e) => Err(e.to_string()),
            },
            Ok(XmlEvent::Eof) => break,
            Ok(_) => Ok(()),
            Err(e) => Err(e.to_string()),
        };
        step.map_err(|message| MergeError::MusicXml { position, message })?;
    }

    builder
        .finish()
        .map_err(|message| MergeError::MusicXml {
            position: xml.len(),
            message,
        })
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart<'_>, key: &str) -> Result<Option<String>, String> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| err.to_string())?;
        if attr.key.as_ref() == key.as_bytes() {
            let value = attr.unescape_value().map_err(|err| err.to_string())?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// A `<note>` element being read
#[derive(Debug, Default)]
struct NoteDraft {
    rest: bool,
    chord: bool,
    grace: bool,
    step: Option<NoteName>,
    alter: i8,
    octave: Option<i8>,
    duration: Option<f64>, // in divisions
    note_type: Option<NoteType>,
    dots: u8,
    stem: Option<Stem>,
    articulations: BTreeSet<Articulation>,
}

#[derive(Debug, Default)]
struct ClefDraft {
    sign: Option<ClefSign>,
    line: Option<u8>,
    octave_change: i8,
}

#[derive(Debug, Default)]
struct TimeDraft {
    beats: Option<u8>,
    beat_type: Option<u8>,
}

#[derive(Debug, Default)]
struct ScoreBuilder {
    score: Score,
    root: Option<String>,
    part_names: Vec<(String, String)>,
    creator_is_composer: bool,
    part: Option<Part>,
    parts_seen: usize,
    measure: Option<Measure>,
    divisions: Option<f64>,
    note: Option<NoteDraft>,
    clef: Option<ClefDraft>,
    time: Option<TimeDraft>,
    key: Option<KeySignature>,
}

impl ScoreBuilder {
    fn start(&mut self, name: &str, e: &BytesStart<'_>, path: &[String]) -> Result<(), String> {
        if path.is_empty() {
            self.root = Some(name.to_string());
            return Ok(());
        }
        let parent = path.last().map(String::as_str).unwrap_or("");

        match name {
            "score-part" => {
                let id = attribute(e, "id")?.unwrap_or_default();
                self.part_names.push((id, String::new()));
            }
            "creator" => {
                self.creator_is_composer = attribute(e, "type")?.as_deref() == Some("composer");
            }
            "part" if parent == "score-partwise" => {
                self.parts_seen += 1;
                let id = attribute(e, "id")?
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| format!("P{}", self.parts_seen));
                let name = self
                    .part_names
                    .iter()
                    .find(|(known, _)| *known == id)
                    .map(|(_, name)| name.clone())
                    .unwrap_or_default();
                self.part = Some(Part::new(id, name));
                self.divisions = None;
            }
            "measure" => {
                let previous = self
                    .part
                    .as_ref()
                    .and_then(|p| p.measures.last())
                    .map(|m| m.number);
                let number = match attribute(e, "number")? {
                    Some(raw) => match raw.trim().parse::<u32>() {
                        Ok(n) => n,
                        Err(_) => {
                            let fallback = previous.map_or(1, |n| n + 1);
                            tracing::warn!(number = %raw, fallback, "non-numeric measure number");
                            fallback
                        }
                    },
                    None => previous.map_or(1, |n| n + 1),
                };
                self.measure = Some(Measure::new(number));
            }
            "note" => self.note = Some(NoteDraft::default()),
            "rest" if parent == "note" => self.with_note(|n| n.rest = true),
            "chord" if parent == "note" => self.with_note(|n| n.chord = true),
            "grace" if parent == "note" => self.with_note(|n| n.grace = true),
            "dot" if parent == "note" => self.with_note(|n| n.dots += 1),
            _ if parent == "articulations" => {
                let articulation = Articulation::from_musicxml(name);
                self.with_note(|n| {
                    n.articulations.insert(articulation);
                });
            }
            "clef" => self.clef = Some(ClefDraft::default()),
            "time" => self.time = Some(TimeDraft::default()),
            "key" => self.key = Some(KeySignature::default()),
            "repeat" if parent == "barline" => {
                let direction = attribute(e, "direction")?;
                if let Some(measure) = self.measure.as_mut() {
                    match direction.as_deref() {
                        Some("forward") => measure.repeat_start = true,
                        Some("backward") => measure.repeat_end = true,
                        _ => {}
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn text(&mut self, path: &[String], text: &str) -> Result<(), String> {
        let Some(name) = path.last().map(String::as_str) else {
            return Ok(());
        };
        let parent = path
            .len()
            .checked_sub(2)
            .and_then(|i| path.get(i))
            .map(String::as_str)
            .unwrap_or("");
        let text = text.trim();

        match (parent, name) {
            ("work", "work-title") => self.score.metadata.title = Some(text.to_string()),
            (_, "movement-title") => {
                if self.score.metadata.title.is_none() {
                    self.score.metadata.title = Some(text.to_string());
                }
            }
            ("identification", "creator") if self.creator_is_composer => {
                self.score.metadata.composer = Some(text.to_string());
            }
            ("score-part", "part-name") => {
                if let Some((_, part_name)) = self.part_names.last_mut() {
                    *part_name = text.to_string();
                }
            }
            ("attributes", "divisions") => {
                let divisions: f64 = parse_number(text, "divisions")?;
                if divisions <= 0.0 {
                    return Err(format!("divisions must be positive, got {}", text));
                }
                self.divisions = Some(divisions);
            }
            ("key", "fifths") => {
                let fifths: i8 = parse_number(text, "fifths")?;
                if let Some(key) = self.key.as_mut() {
                    key.fifths = fifths;
                }
            }
            ("key", "mode") => {
                if let Some(key) = self.key.as_mut() {
                    key.mode = if text == "minor" { Mode::Minor } else { Mode::Major };
                }
            }
            ("time", "beats") => {
                let beats: Option<u8> = text.parse().ok();
                if let Some(time) = self.time.as_mut() {
                    time.beats = beats;
                }
            }
            ("time", "beat-type") => {
                let beat_type: Option<u8> = text.parse().ok();
                if let Some(time) = self.time.as_mut() {
                    time.beat_type = beat_type;
                }
            }
            ("clef", "sign") => {
                if let Some(clef) = self.clef.as_mut() {
                    clef.sign = ClefSign::from_musicxml(text);
                }
            }
            ("clef", "line") => {
                let line: u8 = parse_number(text, "clef line")?;
                if let Some(clef) = self.clef.as_mut() {
                    clef.line = Some(line);
                }
            }
            ("clef", "clef-octave-change") => {
                let change: i8 = parse_number(text, "clef-octave-change")?;
                if let Some(clef) = self.clef.as_mut() {
                    clef.octave_change = change;
                }
            }
            ("pitch", "step") | ("unpitched", "display-step") => {
                let step = NoteName::from_step(text)
                    .ok_or_else(|| format!("invalid pitch step '{}'", text))?;
                self.with_note(|n| n.step = Some(step));
            }
            ("pitch", "alter") => {
                // Microtonal alters are rounded to the nearest semitone
                let alter: f64 = parse_number(text, "alter")?;
                self.with_note(|n| n.alter = alter.round() as i8);
            }
            ("pitch", "octave") | ("unpitched", "display-octave") => {
                let octave: i8 = parse_number(text, "octave")?;
                self.with_note(|n| n.octave = Some(octave));
            }
            ("note", "duration") => {
                let duration: f64 = parse_number(text, "duration")?;
                self.with_note(|n| n.duration = Some(duration));
            }
            ("note", "type") => {
                let note_type = NoteType::from_musicxml(text);
                self.with_note(|n| n.note_type = note_type);
            }
            ("note", "stem") => {
                let stem = Stem::from_musicxml(text);
                self.with_note(|n| n.stem = stem);
            }
            _ => {}
        }
        Ok(())
    }

    fn end(&mut self, name: &str, path: &[String]) -> Result<(), String> {
        let parent = path.last().map(String::as_str).unwrap_or("");
        match name {
            "note" => {
                if let Some(draft) = self.note.take() {
                    self.finish_note(draft)?;
                }
            }
            "clef" => {
                if let (Some(draft), Some(measure)) = (self.clef.take(), self.measure.as_mut()) {
                    // Multi-staff parts: only the first clef is kept
                    if let (Some(sign), None) = (draft.sign, measure.clef) {
                        measure.clef = Some(Clef {
                            sign,
                            line: draft.line,
                            octave_change: draft.octave_change,
                        });
                    }
                }
            }
            "time" => {
                if let (Some(draft), Some(measure)) = (self.time.take(), self.measure.as_mut()) {
                    match (draft.beats, draft.beat_type) {
                        (Some(beats), Some(beat_type)) => {
                            measure.time_signature = Some(TimeSignature { beats, beat_type });
                        }
                        _ => tracing::warn!(
                            measure = measure.number,
                            "unsupported time signature skipped"
                        ),
                    }
                }
            }
            "key" => {
                if let (Some(key), Some(measure)) = (self.key.take(), self.measure.as_mut()) {
                    if measure.key_signature.is_none() {
                        measure.key_signature = Some(key);
                    }
                }
            }
            "measure" => {
                if let (Some(measure), Some(part)) = (self.measure.take(), self.part.as_mut()) {
                    part.measures.push(measure);
                }
            }
            "part" if parent == "score-partwise" => {
                if let Some(part) = self.part.take() {
                    tracing::debug!(part = %part.id, measures = part.measures.len(), "part read");
                    self.score.parts.push(part);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn finish_note(&mut self, draft: NoteDraft) -> Result<(), String> {
        let Some(measure) = self.measure.as_mut() else {
            return Ok(());
        };
        if draft.grace {
            tracing::debug!(measure = measure.number, "grace note skipped");
            return Ok(());
        }

        let quarter_length = match (draft.duration, draft.note_type) {
            (Some(units), _) => units / self.divisions.unwrap_or(1.0),
            (None, Some(note_type)) => Duration::of(note_type, draft.dots).quarter_length,
            (None, None) => 0.0,
        };
        let duration = Duration {
            quarter_length,
            note_type: draft.note_type,
            dots: draft.dots,
        };

        if draft.rest {
            measure.events.push(Event::Rest(Rest::new(duration)));
            return Ok(());
        }

        let (Some(step), Some(octave)) = (draft.step, draft.octave) else {
            return Err(format!("note without pitch in measure {}", measure.number));
        };
        let pitch = Pitch::new(step, draft.alter, octave);

        if draft.chord {
            match measure.events.pop() {
                Some(Event::Note(first)) => {
                    let mut chord = Chord::new(vec![first.pitch, pitch], first.duration);
                    chord.articulations = first.articulations;
                    chord.stem = first.stem;
                    measure.events.push(Event::Chord(chord));
                    return Ok(());
                }
                Some(Event::Chord(mut chord)) => {
                    chord.pitches.push(pitch);
                    measure.events.push(Event::Chord(chord));
                    return Ok(());
                }
                Some(other) => {
                    tracing::warn!(measure = measure.number, "chord note follows a rest");
                    measure.events.push(other);
                }
                None => {
                    tracing::warn!(measure = measure.number, "chord note opens a measure");
                }
            }
        }

        let mut note = Note::new(pitch, duration);
        note.articulations = draft.articulations;
        note.stem = draft.stem;
        measure.events.push(Event::Note(note));
        Ok(())
    }

    fn with_note(&mut self, apply: impl FnOnce(&mut NoteDraft)) {
        if let Some(note) = self.note.as_mut() {
            apply(note);
        }
    }

    fn finish(self) -> Result<Score, String> {
        match self.root.as_deref() {
            Some("score-partwise") => Ok(self.score),
            Some(other) => Err(format!("unsupported root element <{}>", other)),
            None => Err("document has no root element".to_string()),
        }
    }
}

fn parse_number<T: std::str::FromStr>(text: &str, what: &str) -> Result<T, String> {
    text.trim()
        .parse()
        .map_err(|_| format!("invalid {} '{}'", what, text))
}
