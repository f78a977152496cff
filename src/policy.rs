//! # Decode Policy
//!
//! Selects between the decoding rules that diverged across versions of the
//! REMI-to-MIDI converter. The default is the program-routed rule: bars are
//! counted by occurrence, tempo changes sit at the start of the bar, drums get
//! a fixed short duration and velocities keep 10% headroom.
//!
//! Policies can be read from YAML, with any omitted field taking its default:
//!
//! ```rust
//! use remidi::{BarPolicy, DecodePolicy, TempoPlacement};
//!
//! let policy = DecodePolicy::from_yaml(
//!     "bar: bar-indexed\ntempo: at-position\nticks-per-beat: 960\n",
//! )?;
//! assert_eq!(policy.bar, BarPolicy::BarIndexed);
//! assert_eq!(policy.tempo, TempoPlacement::AtPosition);
//! assert_eq!(policy.ticks_per_beat, 960);
//! assert_eq!(policy.velocity_headroom, 0.9);
//! # Ok::<(), remidi::RemiError>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::error::RemiError;

pub const DEFAULT_TICKS_PER_BEAT: u32 = 480;
pub const DEFAULT_VELOCITY_HEADROOM: f64 = 0.9;
pub const DEFAULT_DOCUMENT_NAME: &str = "Converted from REMI";

/// How `Bar_<value>` tokens move the playhead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BarPolicy {
    /// Every Bar token advances one bar; the payload is ignored.
    #[default]
    OccurrenceCounted,
    /// `Bar_<n>` jumps to bar `n` and `Bar_None` advances one bar, counting
    /// from bar 0. Bar `n` starts at `n * ticks_per_bar` of the active meter.
    BarIndexed,
}

/// Where `Tempo_<bpm>` events are placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TempoPlacement {
    /// At the tick where the current bar starts.
    #[default]
    BarStart,
    /// At `bar_tick + position * ticks_per_bar / 24`.
    AtPosition,
}

/// Width of one `Position_<n>` step when placing notes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PositionUnit {
    /// A twelfth of a beat, scaled by the meter: `(4 / denominator) * ticks_per_beat / 12`.
    #[default]
    BeatTwelfths,
    /// A twenty-fourth of the bar: `ticks_per_bar / 24`.
    BarTwentyFourths,
}

/// How the three parts of `Duration_<a>.<b>.<c>` are read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DurationFormat {
    /// `<beats>.<units>.<resolution>`: `beats * ticks_per_beat + units * ticks_per_beat / resolution`.
    #[default]
    BeatResolution,
    /// `<bars>.<beats>.<twelfths>`: `bars * ticks_per_bar + beats * ticks_per_beat + twelfths * ticks_per_beat / 12`.
    BarsBeatsTwelfths,
}

/// Which track a note lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackRouting {
    /// One track per program; drums on their own track.
    #[default]
    ByProgram,
    /// Every note on a single program 0 track; Program tokens do not route.
    SingleTrack,
}

/// Duration given to notes from `PitchDrum` tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrumDuration {
    /// `ticks_per_beat / 8`, regardless of the Duration token.
    #[default]
    Fixed,
    /// Use the Duration token like any pitched note.
    Parsed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DecodePolicy {
    pub bar: BarPolicy,
    pub tempo: TempoPlacement,
    pub drum_duration: DrumDuration,
    pub position_unit: PositionUnit,
    pub duration_format: DurationFormat,
    pub track_routing: TrackRouting,
    /// Multiplier applied after normalizing velocity to 0.0-1.0
    pub velocity_headroom: f64,
    pub reset_position_on_bar: bool,
    /// Pulses per quarter note
    pub ticks_per_beat: u32,
    /// Name written to the document header
    pub name: String,
}

impl Default for DecodePolicy {
    fn default() -> Self {
        Self {
            bar: BarPolicy::default(),
            tempo: TempoPlacement::default(),
            drum_duration: DrumDuration::default(),
            position_unit: PositionUnit::default(),
            duration_format: DurationFormat::default(),
            track_routing: TrackRouting::default(),
            velocity_headroom: DEFAULT_VELOCITY_HEADROOM,
            reset_position_on_bar: false,
            ticks_per_beat: DEFAULT_TICKS_PER_BEAT,
            name: DEFAULT_DOCUMENT_NAME.to_string(),
        }
    }
}

impl DecodePolicy {
    /// Preset reproducing the earliest single-track converter: numeric bar
    /// indices, tempo and notes placed in twenty-fourths of a bar, durations
    /// read as bars, beats and twelfths, position reset on every bar, one
    /// track, and no velocity headroom.
    ///
    /// That converter had no drum tokens; here `PitchDrum` notes join the
    /// single track with their parsed duration.
    pub fn legacy() -> Self {
        Self {
            bar: BarPolicy::BarIndexed,
            tempo: TempoPlacement::AtPosition,
            drum_duration: DrumDuration::Parsed,
            position_unit: PositionUnit::BarTwentyFourths,
            duration_format: DurationFormat::BarsBeatsTwelfths,
            track_routing: TrackRouting::SingleTrack,
            velocity_headroom: 1.0,
            reset_position_on_bar: true,
            ..Self::default()
        }
    }

    /// Parse a policy from YAML and validate it.
    pub fn from_yaml(source: &str) -> Result<Self, RemiError> {
        // An empty document deserializes to unit, not to a struct of defaults.
        if source.trim().is_empty() {
            return Ok(Self::default());
        }
        let policy: DecodePolicy = serde_yaml::from_str(source)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), RemiError> {
        if self.ticks_per_beat == 0 {
            return Err(RemiError::InvalidPolicy(
                "ticks-per-beat must be at least 1".to_string(),
            ));
        }
        if !self.velocity_headroom.is_finite()
            || self.velocity_headroom <= 0.0
            || self.velocity_headroom > 1.0
        {
            return Err(RemiError::InvalidPolicy(format!(
                "velocity-headroom must be in (0, 1], got {}",
                self.velocity_headroom
            )));
        }
        Ok(())
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_ticks_per_beat(mut self, ticks_per_beat: u32) -> Self {
        self.ticks_per_beat = ticks_per_beat;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = DecodePolicy::default();
        assert_eq!(policy.bar, BarPolicy::OccurrenceCounted);
        assert_eq!(policy.tempo, TempoPlacement::BarStart);
        assert_eq!(policy.drum_duration, DrumDuration::Fixed);
        assert_eq!(policy.position_unit, PositionUnit::BeatTwelfths);
        assert_eq!(policy.duration_format, DurationFormat::BeatResolution);
        assert_eq!(policy.track_routing, TrackRouting::ByProgram);
        assert_eq!(policy.ticks_per_beat, 480);
        assert_eq!(policy.name, "Converted from REMI");
        assert!(!policy.reset_position_on_bar);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let policy = DecodePolicy::from_yaml("velocity-headroom: 1.0\nname: Jam\n").unwrap();
        assert_eq!(policy.velocity_headroom, 1.0);
        assert_eq!(policy.name, "Jam");
        assert_eq!(policy.bar, BarPolicy::OccurrenceCounted);
        assert_eq!(policy.ticks_per_beat, 480);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(DecodePolicy::from_yaml("").unwrap(), DecodePolicy::default());
    }

    #[test]
    fn test_enum_spelling() {
        let policy = DecodePolicy::from_yaml(
            "bar: bar-indexed\ntempo: at-position\ndrum-duration: parsed\nreset-position-on-bar: true\n\
             position-unit: bar-twenty-fourths\nduration-format: bars-beats-twelfths\ntrack-routing: single-track\n",
        )
        .unwrap();
        assert_eq!(policy.position_unit, PositionUnit::BarTwentyFourths);
        assert_eq!(policy.duration_format, DurationFormat::BarsBeatsTwelfths);
        assert_eq!(policy.track_routing, TrackRouting::SingleTrack);
        assert_eq!(policy.bar, BarPolicy::BarIndexed);
        assert_eq!(policy.tempo, TempoPlacement::AtPosition);
        assert_eq!(policy.drum_duration, DrumDuration::Parsed);
        assert!(policy.reset_position_on_bar);
    }

    #[test]
    fn test_unknown_enum_value_is_yaml_error() {
        let result = DecodePolicy::from_yaml("bar: sometimes\n");
        assert!(matches!(result, Err(RemiError::Yaml(_))));
    }

    #[test]
    fn test_zero_resolution_rejected() {
        let result = DecodePolicy::from_yaml("ticks-per-beat: 0\n");
        assert!(matches!(result, Err(RemiError::InvalidPolicy(_))));
    }

    #[test]
    fn test_headroom_range() {
        for bad in ["0.0", "-0.5", "1.5", ".nan"] {
            let result = DecodePolicy::from_yaml(&format!("velocity-headroom: {}\n", bad));
            assert!(matches!(result, Err(RemiError::InvalidPolicy(_))), "{} accepted", bad);
        }
    }

    #[test]
    fn test_legacy_preset() {
        let policy = DecodePolicy::legacy();
        assert_eq!(policy.bar, BarPolicy::BarIndexed);
        assert_eq!(policy.tempo, TempoPlacement::AtPosition);
        assert_eq!(policy.position_unit, PositionUnit::BarTwentyFourths);
        assert_eq!(policy.duration_format, DurationFormat::BarsBeatsTwelfths);
        assert_eq!(policy.track_routing, TrackRouting::SingleTrack);
        assert_eq!(policy.velocity_headroom, 1.0);
        assert!(policy.reset_position_on_bar);
        assert!(policy.validate().is_ok());
    }
}
