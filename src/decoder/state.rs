//! The playhead shared by the timeline and note-emission stages.

use crate::diagnostics::DiagnosticKind;
use crate::policy::PositionUnit;

/// Tempo assumed until the first Tempo token
pub const DEFAULT_TEMPO: f64 = 120.0;

/// Position units per quarter-note-equivalent beat
const POSITIONS_PER_BEAT: f64 = 12.0;
/// Position units per bar under the bar-relative unit
const POSITIONS_PER_BAR: f64 = 24.0;

/// Largest tick a note or meta-event may land on
const MAX_TICK: f64 = u32::MAX as f64;

/// Tick widths derived from a time signature
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Meter {
    pub numerator: u32,
    pub denominator: u32,
    pub ticks_per_bar: f64,
    pub ticks_per_position: f64,
}

impl Meter {
    /// Both parts must be non-zero; callers validate before constructing.
    pub fn new(numerator: u32, denominator: u32, ticks_per_beat: u32) -> Self {
        // Length of one signature beat in quarter notes (1.0 for x/4, 0.5 for x/8)
        let beat_scale = 4.0 / denominator as f64;
        let ticks_per_beat = ticks_per_beat as f64;
        Self {
            numerator,
            denominator,
            ticks_per_bar: ticks_per_beat * numerator as f64 * beat_scale,
            ticks_per_position: beat_scale * ticks_per_beat / POSITIONS_PER_BEAT,
        }
    }

    /// 4/4, used when no TimeSig has been seen yet
    pub fn common_time(ticks_per_beat: u32) -> Self {
        Self::new(4, 4, ticks_per_beat)
    }

    pub fn position_width(&self, unit: PositionUnit) -> f64 {
        match unit {
            PositionUnit::BeatTwelfths => self.ticks_per_position,
            PositionUnit::BarTwentyFourths => self.ticks_per_bar / POSITIONS_PER_BAR,
        }
    }
}

/// Playhead state for a single decode call.
///
/// Bar origins are accumulated as `f64` so meters with fractional bar widths
/// do not drift; ticks are rounded only when something is emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserState {
    /// -1 until the first Bar token
    pub current_bar: i64,
    /// Not reset by Bar tokens unless the policy asks for it
    pub current_position: i64,
    pub current_bar_tick: f64,
    pub ticks_per_beat: u32,
    /// None until the first valid TimeSig token
    pub meter: Option<Meter>,
    pub current_tempo: f64,
    pub current_program: i32,
}

impl ParserState {
    pub fn new(ticks_per_beat: u32) -> Self {
        Self {
            current_bar: -1,
            current_position: 0,
            current_bar_tick: 0.0,
            ticks_per_beat,
            meter: None,
            current_tempo: DEFAULT_TEMPO,
            current_program: 0,
        }
    }

    /// Tick of the current position within the current bar
    pub fn position_tick(&self, meter: &Meter, unit: PositionUnit) -> f64 {
        self.current_bar_tick + self.current_position as f64 * meter.position_width(unit)
    }
}

/// Round a computed tick to an emittable integer.
pub fn resolve_tick(raw: f64) -> Result<u64, DiagnosticKind> {
    if !raw.is_finite() {
        return Err(DiagnosticKind::NonFiniteTick);
    }
    let rounded = raw.round();
    if rounded < 0.0 {
        return Err(DiagnosticKind::NegativeTick);
    }
    if rounded > MAX_TICK {
        return Err(DiagnosticKind::TickOutOfRange);
    }
    Ok(rounded as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meter_widths() {
        let four_four = Meter::new(4, 4, 480);
        assert_eq!(four_four.ticks_per_bar, 1920.0);
        assert_eq!(four_four.ticks_per_position, 40.0);

        let six_eight = Meter::new(6, 8, 480);
        assert_eq!(six_eight.ticks_per_bar, 1440.0);
        assert_eq!(six_eight.ticks_per_position, 20.0);

        let three_two = Meter::new(3, 2, 480);
        assert_eq!(three_two.ticks_per_bar, 2880.0);
        assert_eq!(three_two.ticks_per_position, 80.0);
    }

    #[test]
    fn test_position_width() {
        let two_four = Meter::new(2, 4, 480);
        assert_eq!(two_four.position_width(PositionUnit::BeatTwelfths), 40.0);
        assert_eq!(two_four.position_width(PositionUnit::BarTwentyFourths), 40.0);

        let four_four = Meter::common_time(480);
        assert_eq!(four_four.position_width(PositionUnit::BeatTwelfths), 40.0);
        assert_eq!(four_four.position_width(PositionUnit::BarTwentyFourths), 80.0);
    }

    #[test]
    fn test_common_time_fallback() {
        assert_eq!(Meter::common_time(480), Meter::new(4, 4, 480));
    }

    #[test]
    fn test_initial_state() {
        let state = ParserState::new(480);
        assert_eq!(state.current_bar, -1);
        assert_eq!(state.current_position, 0);
        assert_eq!(state.current_bar_tick, 0.0);
        assert_eq!(state.current_program, 0);
        assert_eq!(state.current_tempo, 120.0);
        assert!(state.meter.is_none());
    }

    #[test]
    fn test_position_tick() {
        let mut state = ParserState::new(480);
        state.current_bar_tick = 1920.0;
        state.current_position = 6;
        let meter = Meter::common_time(480);
        assert_eq!(state.position_tick(&meter, PositionUnit::BeatTwelfths), 2160.0);
        assert_eq!(state.position_tick(&meter, PositionUnit::BarTwentyFourths), 2400.0);
    }

    #[test]
    fn test_resolve_tick() {
        assert_eq!(resolve_tick(0.0), Ok(0));
        assert_eq!(resolve_tick(1919.6), Ok(1920));
        assert_eq!(resolve_tick(-0.2), Ok(0));
        assert_eq!(resolve_tick(-40.0), Err(DiagnosticKind::NegativeTick));
        assert_eq!(resolve_tick(f64::NAN), Err(DiagnosticKind::NonFiniteTick));
        assert_eq!(resolve_tick(f64::INFINITY), Err(DiagnosticKind::NonFiniteTick));
        assert_eq!(resolve_tick(u32::MAX as f64), Ok(u32::MAX as u64));
        assert_eq!(resolve_tick(1e12), Err(DiagnosticKind::TickOutOfRange));
    }
}
