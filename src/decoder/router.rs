//! Track router and note emitter: Program, Pitch and PitchDrum tokens.

use std::collections::HashMap;

use super::state::{resolve_tick, Meter};
use super::Session;
use crate::diagnostics::DiagnosticKind;
use crate::document::{Note, Track, DRUM_CHANNEL, DRUM_PROGRAM};
use crate::instruments::{program_family, program_name};
use crate::lexer::{Token, TokenKind};
use crate::policy::{DrumDuration, DurationFormat, TrackRouting};

/// Channels available to melodic tracks (all but the drum channel)
const MELODIC_CHANNELS: usize = 15;
const MAX_VELOCITY: f64 = 127.0;
/// Third duration part units per beat under the bars-beats-twelfths format
const TWELFTHS_PER_BEAT: f64 = 12.0;

/// Maps REMI program numbers to tracks of the document being built
#[derive(Debug, Default)]
pub(super) struct TrackRouter {
    tracks_by_program: HashMap<i32, usize>,
    melodic_tracks: usize,
}

impl TrackRouter {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Index of the track for `program`, creating it if needed.
    ///
    /// `program` must be -1 or 0..=127.
    pub(super) fn track_for(&mut self, program: i32, tracks: &mut Vec<Track>) -> usize {
        if let Some(&index) = self.tracks_by_program.get(&program) {
            return index;
        }

        let track = if program == DRUM_PROGRAM {
            Track {
                name: "Drums".to_string(),
                program,
                channel: DRUM_CHANNEL,
                instrument: 0,
                percussion: true,
                notes: Vec::new(),
            }
        } else {
            let instrument = program.clamp(0, 127) as u8;
            let channel = melodic_channel(self.melodic_tracks);
            self.melodic_tracks += 1;
            Track {
                name: program_name(instrument).to_string(),
                program,
                channel,
                instrument,
                percussion: false,
                notes: Vec::new(),
            }
        };

        log::trace!(
            "new track for program {} ({}) on channel {}",
            program,
            if track.percussion { "drums" } else { program_family(track.instrument) },
            track.channel
        );
        let index = tracks.len();
        tracks.push(track);
        self.tracks_by_program.insert(program, index);
        index
    }
}

/// Channel for the `ordinal`-th melodic track: round-robin over 0-8, 10-15.
pub(super) fn melodic_channel(ordinal: usize) -> u8 {
    let channel = (ordinal % MELODIC_CHANNELS) as u8;
    if channel >= DRUM_CHANNEL {
        channel + 1
    } else {
        channel
    }
}

impl Session<'_> {
    pub(super) fn on_program(&mut self, token: &Token<'_>) {
        let program = match token.value_str().parse::<i32>() {
            Ok(program) if program == DRUM_PROGRAM || (0..=127).contains(&program) => program,
            _ => {
                self.record(DiagnosticKind::InvalidProgram, token);
                return;
            }
        };
        self.state.current_program = program;
        if self.policy.track_routing == TrackRouting::ByProgram {
            self.router.track_for(program, &mut self.document.tracks);
        }
    }

    /// Handle a Pitch or PitchDrum token at `tokens[0]`.
    ///
    /// Returns how many tokens after it were consumed: 2 when a Velocity and
    /// Duration pair follows, 0 otherwise.
    pub(super) fn on_pitch(&mut self, tokens: &[Token<'_>]) -> usize {
        let token = &tokens[0];
        let is_drum = token.kind == TokenKind::PitchDrum;

        let (velocity_token, duration_token) = match (tokens.get(1), tokens.get(2)) {
            (Some(v), Some(d)) if v.kind == TokenKind::Velocity && d.kind == TokenKind::Duration => (v, d),
            _ => {
                self.record_dropped_note(DiagnosticKind::MissingLookahead, token);
                return 0;
            }
        };

        // From here on the pair belongs to this pitch, even if the note is dropped.
        let Some(pitch) = parse_pitch(token.value_str()) else {
            self.record_dropped_note(DiagnosticKind::InvalidPitch, token);
            return 2;
        };
        let Some(velocity) = parse_velocity(velocity_token.value_str(), self.policy.velocity_headroom) else {
            self.record_dropped_note(DiagnosticKind::InvalidVelocity, velocity_token);
            return 2;
        };

        let ticks_per_beat = self.policy.ticks_per_beat;
        let duration_parts = if is_drum && self.policy.drum_duration == DrumDuration::Fixed {
            None
        } else {
            match parse_duration_parts(duration_token.value_str()) {
                Some(parts) => Some(parts),
                None => {
                    self.record_dropped_note(DiagnosticKind::InvalidDuration, duration_token);
                    return 2;
                }
            }
        };

        let meter = self.meter_for(token);
        let raw_duration = match duration_parts {
            Some(parts) => duration_ticks(parts, self.policy.duration_format, &meter, ticks_per_beat),
            None => fixed_drum_duration(ticks_per_beat),
        };
        let start_tick = match resolve_tick(self.state.position_tick(&meter, self.policy.position_unit)) {
            Ok(tick) => tick,
            Err(kind) => {
                self.record_dropped_note(kind, token);
                return 2;
            }
        };
        let duration_ticks = match resolve_tick(raw_duration.max(1.0)) {
            Ok(ticks) => ticks.max(1),
            Err(kind) => {
                self.record_dropped_note(kind, duration_token);
                return 2;
            }
        };

        let program = match (self.policy.track_routing, is_drum) {
            (TrackRouting::SingleTrack, _) => 0,
            (TrackRouting::ByProgram, true) => DRUM_PROGRAM,
            (TrackRouting::ByProgram, false) => self.state.current_program,
        };
        let index = self.router.track_for(program, &mut self.document.tracks);
        self.document.tracks[index].notes.push(Note {
            pitch,
            start_tick,
            duration_ticks,
            velocity,
        });
        2
    }
}

fn parse_pitch(value: &str) -> Option<u8> {
    value.parse::<u8>().ok().filter(|pitch| *pitch <= 127)
}

/// MIDI velocity, truncated to an integer and clamped to 0-127, normalized
/// to 0.0-1.0, then scaled.
fn parse_velocity(value: &str, headroom: f64) -> Option<f64> {
    let raw = value.parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some(raw.trunc().clamp(0.0, MAX_VELOCITY) / MAX_VELOCITY * headroom)
}

/// The three integer parts of a `"<a>.<b>.<c>"` duration.
///
/// Missing or empty parts count as 0 and extra parts are ignored.
fn parse_duration_parts(value: &str) -> Option<[i64; 3]> {
    let mut parts = [0i64; 3];
    for (slot, part) in parts.iter_mut().zip(value.split('.')) {
        if !part.is_empty() {
            *slot = part.parse::<i64>().ok()?;
        }
    }
    Some(parts)
}

/// Unrounded tick length of a parsed duration.
///
/// Under the beat/resolution format a zero resolution drops the units term.
fn duration_ticks(parts: [i64; 3], format: DurationFormat, meter: &Meter, ticks_per_beat: u32) -> f64 {
    let ticks_per_beat = ticks_per_beat as f64;
    match format {
        DurationFormat::BeatResolution => {
            let [beats, units, resolution] = parts;
            let units_ticks = if resolution == 0 {
                0.0
            } else {
                units as f64 * ticks_per_beat / resolution as f64
            };
            beats as f64 * ticks_per_beat + units_ticks
        }
        DurationFormat::BarsBeatsTwelfths => {
            let [bars, beats, twelfths] = parts;
            bars as f64 * meter.ticks_per_bar
                + beats as f64 * ticks_per_beat
                + twelfths as f64 * ticks_per_beat / TWELFTHS_PER_BEAT
        }
    }
}

fn fixed_drum_duration(ticks_per_beat: u32) -> f64 {
    (ticks_per_beat / 8).max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_melodic_channels_skip_drum_channel() {
        let channels: Vec<u8> = (0..16).map(melodic_channel).collect();
        assert_eq!(channels, vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 11, 12, 13, 14, 15, 0]);
    }

    #[test]
    fn test_router_reuses_tracks() {
        let mut router = TrackRouter::new();
        let mut tracks = Vec::new();

        assert_eq!(router.track_for(0, &mut tracks), 0);
        assert_eq!(router.track_for(DRUM_PROGRAM, &mut tracks), 1);
        assert_eq!(router.track_for(33, &mut tracks), 2);
        assert_eq!(router.track_for(0, &mut tracks), 0);
        assert_eq!(tracks.len(), 3);

        assert_eq!(tracks[0].channel, 0);
        assert_eq!(tracks[0].name, "Acoustic Grand Piano");
        assert_eq!(tracks[1].channel, DRUM_CHANNEL);
        assert!(tracks[1].percussion);
        assert_eq!(tracks[1].name, "Drums");
        assert_eq!(tracks[1].instrument, 0);
        // The drum track does not use up a melodic channel.
        assert_eq!(tracks[2].channel, 1);
        assert_eq!(tracks[2].instrument, 33);
    }

    fn beat_ticks(value: &str) -> Option<f64> {
        let parts = parse_duration_parts(value)?;
        Some(duration_ticks(parts, DurationFormat::BeatResolution, &Meter::common_time(480), 480))
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(beat_ticks("1.0.12"), Some(480.0));
        assert_eq!(beat_ticks("0.6.12"), Some(240.0));
        assert_eq!(beat_ticks("2.3.8"), Some(1140.0));
        assert_eq!(beat_ticks("2"), Some(960.0));
        assert_eq!(beat_ticks(""), Some(0.0));
        assert_eq!(beat_ticks("1..12"), Some(480.0));
        assert_eq!(beat_ticks("1.0.12.99"), Some(480.0));
        assert_eq!(beat_ticks("1.0.1.junk"), Some(480.0));
    }

    #[test]
    fn test_parse_duration_zero_resolution() {
        assert_eq!(beat_ticks("0.5.0"), Some(0.0));
        assert_eq!(beat_ticks("1.5.0"), Some(480.0));
    }

    #[test]
    fn test_parse_duration_rejects_non_numeric() {
        assert_eq!(parse_duration_parts("one.0.12"), None);
        assert_eq!(parse_duration_parts("1.x.12"), None);
        assert_eq!(beat_ticks("-1.0.12"), Some(-480.0));
    }

    #[test]
    fn test_bars_beats_twelfths_duration() {
        let two_four = Meter::new(2, 4, 480);
        let ticks = |value: &str| {
            let parts = parse_duration_parts(value).unwrap();
            duration_ticks(parts, DurationFormat::BarsBeatsTwelfths, &two_four, 480)
        };
        assert_eq!(ticks("0.6.12"), 6.0 * 480.0 + 480.0);
        assert_eq!(ticks("1.0.0"), 960.0);
        assert_eq!(ticks("0.1.0"), 480.0);
        assert_eq!(ticks("0.0.3"), 120.0);
    }

    #[test]
    fn test_parse_velocity() {
        assert_approx_eq!(parse_velocity("127", 1.0).unwrap(), 1.0);
        assert_approx_eq!(parse_velocity("100", 0.9).unwrap(), 0.9 * 100.0 / 127.0);
        assert_approx_eq!(parse_velocity("300", 1.0).unwrap(), 1.0);
        assert_approx_eq!(parse_velocity("-5", 1.0).unwrap(), 0.0);
        assert!(parse_velocity("loud", 0.9).is_none());
        assert!(parse_velocity("NaN", 0.9).is_none());
        // Fractions are truncated, not rounded.
        assert_approx_eq!(parse_velocity("100.7", 1.0).unwrap(), 100.0 / 127.0);
        assert_approx_eq!(parse_velocity("126.99", 1.0).unwrap(), 126.0 / 127.0);
    }

    #[test]
    fn test_parse_pitch() {
        assert_eq!(parse_pitch("60"), Some(60));
        assert_eq!(parse_pitch("0"), Some(0));
        assert_eq!(parse_pitch("127"), Some(127));
        assert_eq!(parse_pitch("128"), None);
        assert_eq!(parse_pitch("-1"), None);
        assert_eq!(parse_pitch("C4"), None);
    }

    #[test]
    fn test_fixed_drum_duration() {
        assert_eq!(fixed_drum_duration(480), 60.0);
        assert_eq!(fixed_drum_duration(4), 1.0);
    }
}
