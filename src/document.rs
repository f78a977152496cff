//! # Document Model
//!
//! The structured output of a decode: a header holding tempo and
//! time-signature changes, plus one track per instrument program.
//!
//! ## Type Hierarchy
//! ```text
//! MidiDocument
//!   ├── Header
//!   │     ├── name: String
//!   │     ├── ticks_per_beat: u32
//!   │     ├── Vec<TempoEvent>          (tick, bpm)
//!   │     └── Vec<TimeSignatureEvent>  (tick, numerator, denominator)
//!   └── Vec<Track>
//!         ├── program: i32 (-1 = drums)
//!         ├── channel: u8 (9 for drums)
//!         ├── instrument: u8, percussion: bool, name
//!         └── Vec<Note> (pitch, start_tick, duration_ticks, velocity)
//! ```
//!
//! Meta-events and notes are kept in the order the decoder appended them;
//! nothing is re-sorted here. Serializers that need tick order sort stably.

use serde::Serialize;

/// Program number of the percussion track
pub const DRUM_PROGRAM: i32 = -1;
/// Zero-indexed MIDI channel reserved for percussion ("channel 10")
pub const DRUM_CHANNEL: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TempoEvent {
    pub tick: u64,
    pub bpm: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSignatureEvent {
    pub tick: u64,
    pub numerator: u32,
    pub denominator: u32,
}

/// A single timed note
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// MIDI key number (0-127)
    pub pitch: u8,
    pub start_tick: u64,
    /// Always at least 1
    pub duration_ticks: u64,
    /// Normalized velocity (0.0-1.0)
    pub velocity: f64,
}

impl Note {
    pub fn end_tick(&self) -> u64 {
        self.start_tick + self.duration_ticks
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub name: String,
    /// REMI program this track was created for
    pub program: i32,
    /// Zero-indexed MIDI channel
    pub channel: u8,
    /// MIDI program-change number
    pub instrument: u8,
    pub percussion: bool,
    pub notes: Vec<Note>,
}

impl Track {
    pub fn is_drums(&self) -> bool {
        self.program == DRUM_PROGRAM
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub name: String,
    /// Pulses per quarter note the ticks are expressed in
    pub ticks_per_beat: u32,
    pub tempos: Vec<TempoEvent>,
    pub time_signatures: Vec<TimeSignatureEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MidiDocument {
    pub header: Header,
    pub tracks: Vec<Track>,
}

impl MidiDocument {
    pub fn new(name: impl Into<String>, ticks_per_beat: u32) -> Self {
        Self {
            header: Header {
                name: name.into(),
                ticks_per_beat,
                tempos: Vec::new(),
                time_signatures: Vec::new(),
            },
            tracks: Vec::new(),
        }
    }

    pub fn track_for_program(&self, program: i32) -> Option<&Track> {
        self.tracks.iter().find(|t| t.program == program)
    }

    pub fn note_count(&self) -> usize {
        self.tracks.iter().map(|t| t.notes.len()).sum()
    }

    /// Tick at which the last note ends, or 0 for a document without notes
    pub fn end_tick(&self) -> u64 {
        self.tracks
            .iter()
            .flat_map(|t| t.notes.iter())
            .map(Note::end_tick)
            .max()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty() && self.header.tempos.is_empty() && self.header.time_signatures.is_empty()
    }
}
