//! # Score Model
//!
//! This module defines the in-memory object graph that both versions of a score are
//! loaded into before they are compared and merged.
//!
//! ## Type Hierarchy
//! ```text
//! Score
//!   ├── Metadata (title, composer)
//!   └── Vec<Part>
//!         ├── id / name
//!         └── Vec<Measure>
//!               ├── number (taken from the source document)
//!               ├── clef / time_signature / key_signature: Option<..>
//!               ├── repeat_start / repeat_end: bool
//!               └── Vec<Event> (Note | Chord | Rest)
//!
//! Event (enum)
//!   ├── Note  { pitch, duration, articulations, stem, highlight }
//!   ├── Chord { pitches, duration, articulations, stem, highlight }
//!   └── Rest  { duration, highlight }
//! ```
//!
//! ## Key Concepts
//!
//! ### Measure attributes
//! `clef`, `time_signature` and `key_signature` hold only what is written *in that
//! measure*. A measure in the middle of a piece usually has all three set to `None`
//! even though a clef is in effect. Two measures therefore differ in clef only when one
//! of them changes clef and the other does not (or changes it differently).
//!
//! ### Durations
//! Durations are measured in quarter notes (`quarter_length`), so a half note is `2.0`
//! and an eighth-note triplet member is `1/3`. The written `note_type` and `dots` are
//! kept for export but never used to decide whether two events differ.
//!
//! ### Highlights
//! `highlight` is an annotation that only [`crate::measure_diff::highlight`] sets, on
//! copies of source events. Scores loaded from disk never carry it.

use crate::similarity::Severity;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Time signature (e.g., 4/4, 3/4, 6/8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSignature {
    pub beats: u8,
    pub beat_type: u8,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            beats: 4,
            beat_type: 4,
        }
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats, self.beat_type)
    }
}

/// Mode for key signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Major,
    Minor,
}

/// Key signature (number of sharps/flats)
/// Positive = sharps, Negative = flats, Zero = C major / A minor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct KeySignature {
    pub fifths: i8, // -7 to +7 (flats to sharps)
    pub mode: Mode,
}

/// Clef symbol as written in MusicXML `<sign>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClefSign {
    G,
    F,
    C,
    Percussion,
    Tab,
    None,
}

impl ClefSign {
    pub fn from_musicxml(s: &str) -> Option<Self> {
        match s.trim() {
            "G" => Some(ClefSign::G),
            "F" => Some(ClefSign::F),
            "C" => Some(ClefSign::C),
            "percussion" => Some(ClefSign::Percussion),
            "TAB" => Some(ClefSign::Tab),
            "none" => Some(ClefSign::None),
            _ => None,
        }
    }

    pub fn musicxml_sign(&self) -> &'static str {
        match self {
            ClefSign::G => "G",
            ClefSign::F => "F",
            ClefSign::C => "C",
            ClefSign::Percussion => "percussion",
            ClefSign::Tab => "TAB",
            ClefSign::None => "none",
        }
    }
}

/// A clef placed in a measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Clef {
    pub sign: ClefSign,
    pub line: Option<u8>,
    pub octave_change: i8,
}

impl Clef {
    pub fn treble() -> Self {
        Self {
            sign: ClefSign::G,
            line: Some(2),
            octave_change: 0,
        }
    }

    pub fn bass() -> Self {
        Self {
            sign: ClefSign::F,
            line: Some(4),
            octave_change: 0,
        }
    }
}

/// Note names A through G
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub enum NoteName {
    #[default]
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl NoteName {
    pub fn from_step(s: &str) -> Option<Self> {
        match s.trim() {
            "C" => Some(NoteName::C),
            "D" => Some(NoteName::D),
            "E" => Some(NoteName::E),
            "F" => Some(NoteName::F),
            "G" => Some(NoteName::G),
            "A" => Some(NoteName::A),
            "B" => Some(NoteName::B),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NoteName::C => "C",
            NoteName::D => "D",
            NoteName::E => "E",
            NoteName::F => "F",
            NoteName::G => "G",
            NoteName::A => "A",
            NoteName::B => "B",
        }
    }
}

/// A written pitch. Enharmonic spellings are distinct pitches (C#4 != Db4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Pitch {
    pub step: NoteName,
    pub alter: i8,  // -2..=2, semitones
    pub octave: i8, // middle C = octave 4
}

impl Pitch {
    pub fn new(step: NoteName, alter: i8, octave: i8) -> Self {
        Self { step, alter, octave }
    }

    /// Natural pitch shorthand, e.g. `Pitch::natural(NoteName::C, 4)` for middle C.
    pub fn natural(step: NoteName, octave: i8) -> Self {
        Self::new(step, 0, octave)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let accidental = match self.alter {
            2 => "##",
            1 => "#",
            -1 => "b",
            -2 => "bb",
            _ => "",
        };
        write!(f, "{}{}{}", self.step.as_str(), accidental, self.octave)
    }
}

/// Written note type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoteType {
    Breve,
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
    SixtyFourth,
}

impl NoteType {
    /// Length of the undotted note type in quarter notes
    pub fn quarter_length(&self) -> f64 {
        match self {
            NoteType::Breve => 8.0,
            NoteType::Whole => 4.0,
            NoteType::Half => 2.0,
            NoteType::Quarter => 1.0,
            NoteType::Eighth => 0.5,
            NoteType::Sixteenth => 0.25,
            NoteType::ThirtySecond => 0.125,
            NoteType::SixtyFourth => 0.0625,
        }
    }

    /// MusicXML type name
    pub fn musicxml_type(&self) -> &'static str {
        match self {
            NoteType::Breve => "breve",
            NoteType::Whole => "whole",
            NoteType::Half => "half",
            NoteType::Quarter => "quarter",
            NoteType::Eighth => "eighth",
            NoteType::Sixteenth => "16th",
            NoteType::ThirtySecond => "32nd",
            NoteType::SixtyFourth => "64th",
        }
    }

    pub fn from_musicxml(s: &str) -> Option<Self> {
        match s.trim() {
            "breve" => Some(NoteType::Breve),
            "whole" => Some(NoteType::Whole),
            "half" => Some(NoteType::Half),
            "quarter" => Some(NoteType::Quarter),
            "eighth" => Some(NoteType::Eighth),
            "16th" => Some(NoteType::Sixteenth),
            "32nd" => Some(NoteType::ThirtySecond),
            "64th" => Some(NoteType::SixtyFourth),
            _ => None,
        }
    }
}

/// Sounding length of an event plus how it was written
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Duration {
    pub quarter_length: f64,
    pub note_type: Option<NoteType>,
    pub dots: u8,
}

impl Duration {
    /// Duration of a written note type with `dots` augmentation dots
    pub fn of(note_type: NoteType, dots: u8) -> Self {
        let base = note_type.quarter_length();
        // Each dot adds half of the previous value
        let mut quarter_length = base;
        let mut add = base / 2.0;
        for _ in 0..dots {
            quarter_length += add;
            add /= 2.0;
        }
        Self {
            quarter_length,
            note_type: Some(note_type),
            dots,
        }
    }

    /// Duration given only as a length in quarter notes
    pub fn quarters(quarter_length: f64) -> Self {
        Self {
            quarter_length,
            note_type: None,
            dots: 0,
        }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = (self.quarter_length * 1000.0).round() / 1000.0;
        write!(f, "{}", rounded)
    }
}

/// Articulation marks. Ordered so a set of them compares as a set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Articulation {
    Accent,
    StrongAccent,
    Staccato,
    Staccatissimo,
    Tenuto,
    DetachedLegato,
    Spiccato,
    Stress,
    Unstress,
    Other(String),
}

impl Articulation {
    pub fn from_musicxml(tag: &str) -> Self {
        match tag {
            "accent" => Articulation::Accent,
            "strong-accent" => Articulation::StrongAccent,
            "staccato" => Articulation::Staccato,
            "staccatissimo" => Articulation::Staccatissimo,
            "tenuto" => Articulation::Tenuto,
            "detached-legato" => Articulation::DetachedLegato,
            "spiccato" => Articulation::Spiccato,
            "stress" => Articulation::Stress,
            "unstress" => Articulation::Unstress,
            other => Articulation::Other(other.to_string()),
        }
    }

    pub fn musicxml_tag(&self) -> &str {
        match self {
            Articulation::Accent => "accent",
            Articulation::StrongAccent => "strong-accent",
            Articulation::Staccato => "staccato",
            Articulation::Staccatissimo => "staccatissimo",
            Articulation::Tenuto => "tenuto",
            Articulation::DetachedLegato => "detached-legato",
            Articulation::Spiccato => "spiccato",
            Articulation::Stress => "stress",
            Articulation::Unstress => "unstress",
            Articulation::Other(tag) => tag,
        }
    }
}

/// Stem direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stem {
    Up,
    Down,
    Double,
    Hidden,
}

impl Stem {
    pub fn from_musicxml(s: &str) -> Option<Self> {
        match s.trim() {
            "up" => Some(Stem::Up),
            "down" => Some(Stem::Down),
            "double" => Some(Stem::Double),
            "none" => Some(Stem::Hidden),
            _ => None,
        }
    }

    pub fn musicxml_value(&self) -> &'static str {
        match self {
            Stem::Up => "up",
            Stem::Down => "down",
            Stem::Double => "double",
            Stem::Hidden => "none",
        }
    }
}

/// A single pitched note
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Note {
    pub pitch: Pitch,
    pub duration: Duration,
    pub articulations: BTreeSet<Articulation>,
    pub stem: Option<Stem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Severity>,
}

impl Note {
    pub fn new(pitch: Pitch, duration: Duration) -> Self {
        Self {
            pitch,
            duration,
            articulations: BTreeSet::new(),
            stem: None,
            highlight: None,
        }
    }
}

/// Several pitches sounding together with one shared duration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chord {
    pub pitches: Vec<Pitch>,
    pub duration: Duration,
    pub articulations: BTreeSet<Articulation>,
    pub stem: Option<Stem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Severity>,
}

impl Chord {
    pub fn new(pitches: Vec<Pitch>, duration: Duration) -> Self {
        Self {
            pitches,
            duration,
            articulations: BTreeSet::new(),
            stem: None,
            highlight: None,
        }
    }

    /// Pitches as a set: written order and doubled pitches do not matter
    pub fn pitch_set(&self) -> BTreeSet<Pitch> {
        self.pitches.iter().copied().collect()
    }
}

/// A rest
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rest {
    pub duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Severity>,
}

impl Rest {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            highlight: None,
        }
    }
}

/// Discriminant of an [`Event`], used to test whether two events are of the same kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Note,
    Chord,
    Rest,
}

/// An event in a measure: a note, a chord or a rest
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Event {
    Note(Note),
    Chord(Chord),
    Rest(Rest),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Note(_) => EventKind::Note,
            Event::Chord(_) => EventKind::Chord,
            Event::Rest(_) => EventKind::Rest,
        }
    }

    pub fn duration(&self) -> &Duration {
        match self {
            Event::Note(note) => &note.duration,
            Event::Chord(chord) => &chord.duration,
            Event::Rest(rest) => &rest.duration,
        }
    }

    pub fn is_pitched(&self) -> bool {
        !matches!(self, Event::Rest(_))
    }

    /// Pitch set of a note or chord; empty for a rest
    pub fn pitch_set(&self) -> BTreeSet<Pitch> {
        match self {
            Event::Note(note) => BTreeSet::from([note.pitch]),
            Event::Chord(chord) => chord.pitch_set(),
            Event::Rest(_) => BTreeSet::new(),
        }
    }

    pub fn highlight(&self) -> Option<Severity> {
        match self {
            Event::Note(note) => note.highlight,
            Event::Chord(chord) => chord.highlight,
            Event::Rest(rest) => rest.highlight,
        }
    }

    /// Copy of this event carrying a highlight annotation
    pub fn highlighted(&self, severity: Severity) -> Event {
        let mut copy = self.clone();
        match &mut copy {
            Event::Note(note) => note.highlight = Some(severity),
            Event::Chord(chord) => chord.highlight = Some(severity),
            Event::Rest(rest) => rest.highlight = Some(severity),
        }
        copy
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Note(note) => write!(f, "{} {}", note.pitch, note.duration)?,
            Event::Chord(chord) => {
                let pitches: Vec<String> = chord.pitches.iter().map(|p| p.to_string()).collect();
                write!(f, "[{}] {}", pitches.join(" "), chord.duration)?;
            }
            Event::Rest(rest) => write!(f, "r {}", rest.duration)?,
        }
        match self.highlight() {
            Some(severity) if severity != Severity::Unchanged => write!(f, " [{}]", severity),
            _ => Ok(()),
        }
    }
}

/// A single measure (bar). Replaced wholesale during a merge, never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measure {
    pub number: u32,
    pub clef: Option<Clef>,
    pub time_signature: Option<TimeSignature>,
    pub key_signature: Option<KeySignature>,
    pub repeat_start: bool, // forward repeat barline at the start of the measure
    pub repeat_end: bool,   // backward repeat barline at the end of the measure
    pub events: Vec<Event>,
}

impl Measure {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            clef: None,
            time_signature: None,
            key_signature: None,
            repeat_start: false,
            repeat_end: false,
            events: Vec::new(),
        }
    }

    pub fn with_events(number: u32, events: Vec<Event>) -> Self {
        Self {
            events,
            ..Self::new(number)
        }
    }

    /// Copy of every non-event attribute, with no events
    pub fn attributes_only(&self) -> Self {
        Self {
            number: self.number,
            clef: self.clef,
            time_signature: self.time_signature,
            key_signature: self.key_signature,
            repeat_start: self.repeat_start,
            repeat_end: self.repeat_end,
            events: Vec::new(),
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m.{}", self.number)?;
        if let Some(clef) = &self.clef {
            write!(f, " ({}-clef)", clef.sign.musicxml_sign())?;
        }
        if let Some(time) = &self.time_signature {
            write!(f, " ({})", time)?;
        }
        write!(f, " |")?;
        for event in &self.events {
            write!(f, " {} |", event)?;
        }
        Ok(())
    }
}

/// One instrument/voice line of a score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Part {
    pub id: String,
    pub name: String,
    pub measures: Vec<Measure>,
}

impl Part {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            measures: Vec::new(),
        }
    }
}

/// Document metadata
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub composer: Option<String>,
}

/// A complete musical score
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Score {
    pub metadata: Metadata,
    pub parts: Vec<Part>,
}

impl Score {
    /// First part with the given id
    pub fn part(&self, id: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.id == id)
    }

    /// True when every part carries a non-empty id and no id repeats
    pub fn has_unique_part_ids(&self) -> bool {
        let mut seen = HashSet::new();
        self.parts.iter().all(|p| !p.id.is_empty() && seen.insert(p.id.as_str()))
    }
}
