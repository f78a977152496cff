//! # Standard MIDI File Output
//!
//! Writes a [`MidiDocument`] as a format 1 Standard MIDI File.
//!
//! ## Layout
//! - Track 0 (conductor): document name, time signatures, tempos
//! - One track per document track: track name, program change (melodic
//!   tracks only), note-on / note-off pairs on the track's channel
//!
//! Events are sorted by tick with a stable sort, so meta-events sharing a
//! tick keep the order the decoder produced them in. At equal ticks a
//! note-off is written before a note-on, so repeated notes retrigger.
//!
//! ## Example
//! ```rust
//! use remidi::{decode, to_smf_bytes};
//!
//! let doc = decode("Bar_None TimeSig_4/4 Tempo_120.0 Pitch_60 Velocity_100 Duration_1.0.12");
//! let bytes = to_smf_bytes(&doc)?;
//! assert_eq!(&bytes[..4], b"MThd");
//! # Ok::<(), remidi::RemiError>(())
//! ```

use std::path::Path;

use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

use crate::document::{MidiDocument, Track};
use crate::error::RemiError;

const MAX_TICKS_PER_BEAT: u32 = 0x7FFF;
const MAX_DELTA: u64 = 0x0FFF_FFFF;
const MAX_TEMPO: f64 = 0x00FF_FFFF as f64;
const MICROSECONDS_PER_MINUTE: f64 = 60_000_000.0;
/// MIDI clocks per metronome click
const CLOCKS_PER_CLICK: u8 = 24;
const THIRTY_SECONDS_PER_QUARTER: u8 = 8;

/// An event at an absolute tick, before delta encoding.
/// `rank` orders events that share a tick.
struct TimedEvent<'a> {
    tick: u64,
    rank: u8,
    kind: TrackEventKind<'a>,
}

/// Build the in-memory file. The result borrows names from `doc`.
pub fn to_smf(doc: &MidiDocument) -> Result<Smf<'_>, RemiError> {
    let ticks_per_beat = doc.header.ticks_per_beat;
    if ticks_per_beat == 0 || ticks_per_beat > MAX_TICKS_PER_BEAT {
        return Err(RemiError::Smf(format!(
            "resolution {} is outside 1..=32767 ticks per beat",
            ticks_per_beat
        )));
    }

    let mut tracks = Vec::with_capacity(doc.tracks.len() + 1);
    tracks.push(encode_track(conductor_events(doc))?);
    for track in &doc.tracks {
        tracks.push(encode_track(note_events(track))?);
    }

    Ok(Smf {
        header: Header {
            format: Format::Parallel,
            timing: Timing::Metrical(u15::new(ticks_per_beat as u16)),
        },
        tracks,
    })
}

pub fn to_smf_bytes(doc: &MidiDocument) -> Result<Vec<u8>, RemiError> {
    let smf = to_smf(doc)?;
    let mut bytes = Vec::new();
    smf.write_std(&mut bytes)?;
    Ok(bytes)
}

pub fn write_smf(doc: &MidiDocument, path: &Path) -> Result<(), RemiError> {
    let bytes = to_smf_bytes(doc)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

fn conductor_events(doc: &MidiDocument) -> Vec<TimedEvent<'_>> {
    let header = &doc.header;
    let mut events = Vec::with_capacity(header.tempos.len() + header.time_signatures.len() + 1);

    events.push(TimedEvent {
        tick: 0,
        rank: 0,
        kind: TrackEventKind::Meta(MetaMessage::TrackName(header.name.as_bytes())),
    });

    for signature in &header.time_signatures {
        let numerator = match u8::try_from(signature.numerator) {
            Ok(numerator) => numerator,
            Err(_) => {
                log::warn!("skipping time signature {}/{}: numerator too large", signature.numerator, signature.denominator);
                continue;
            }
        };
        if !signature.denominator.is_power_of_two() {
            log::warn!(
                "skipping time signature {}/{}: denominator is not a power of two",
                signature.numerator,
                signature.denominator
            );
            continue;
        }
        events.push(TimedEvent {
            tick: signature.tick,
            rank: 1,
            kind: TrackEventKind::Meta(MetaMessage::TimeSignature(
                numerator,
                signature.denominator.trailing_zeros() as u8,
                CLOCKS_PER_CLICK,
                THIRTY_SECONDS_PER_QUARTER,
            )),
        });
    }

    for tempo in &header.tempos {
        events.push(TimedEvent {
            tick: tempo.tick,
            rank: 2,
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(microseconds_per_beat(tempo.bpm)))),
        });
    }

    events
}

fn note_events(track: &Track) -> Vec<TimedEvent<'_>> {
    let channel = u4::new(track.channel.min(15));
    let mut events = Vec::with_capacity(track.notes.len() * 2 + 2);

    events.push(TimedEvent {
        tick: 0,
        rank: 0,
        kind: TrackEventKind::Meta(MetaMessage::TrackName(track.name.as_bytes())),
    });
    if !track.is_drums() {
        events.push(TimedEvent {
            tick: 0,
            rank: 1,
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange {
                    program: u7::new(track.instrument.min(127)),
                },
            },
        });
    }

    for note in &track.notes {
        let key = u7::new(note.pitch.min(127));
        events.push(TimedEvent {
            tick: note.start_tick,
            rank: 3,
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOn {
                    key,
                    vel: u7::new(velocity_byte(note.velocity)),
                },
            },
        });
        events.push(TimedEvent {
            tick: note.end_tick(),
            rank: 2,
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOff { key, vel: u7::new(0) },
            },
        });
    }

    events
}

/// Sort by tick and delta-encode, closing the track with end-of-track.
fn encode_track(mut events: Vec<TimedEvent<'_>>) -> Result<Vec<TrackEvent<'_>>, RemiError> {
    events.sort_by_key(|e| (e.tick, e.rank));

    let mut encoded = Vec::with_capacity(events.len() + 1);
    let mut previous_tick = 0;
    for event in events {
        let delta = event.tick - previous_tick;
        if delta > MAX_DELTA {
            return Err(RemiError::Smf(format!(
                "gap of {} ticks before tick {} exceeds the largest MIDI delta",
                delta, event.tick
            )));
        }
        encoded.push(TrackEvent {
            delta: u28::new(delta as u32),
            kind: event.kind,
        });
        previous_tick = event.tick;
    }
    encoded.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    Ok(encoded)
}

/// Normalized velocity to a note-on byte. Zero is avoided since a note-on with
/// velocity 0 means note-off.
fn velocity_byte(velocity: f64) -> u8 {
    (velocity * 127.0).round().clamp(1.0, 127.0) as u8
}

fn microseconds_per_beat(bpm: f64) -> u32 {
    (MICROSECONDS_PER_MINUTE / bpm).round().clamp(1.0, MAX_TEMPO) as u32
}
