//! Timeline stage: Bar, TimeSig, Tempo and Position tokens.

use super::state::{resolve_tick, Meter};
use super::Session;
use crate::diagnostics::DiagnosticKind;
use crate::document::{TempoEvent, TimeSignatureEvent};
use crate::lexer::Token;
use crate::policy::{BarPolicy, PositionUnit, TempoPlacement};

impl Session<'_> {
    pub(super) fn on_bar(&mut self, token: &Token<'_>) {
        match self.policy.bar {
            BarPolicy::OccurrenceCounted => {
                // The first bar starts at tick 0.
                let target = self.state.current_bar.saturating_add(1);
                if target > 0 {
                    let meter = self.meter_for(token);
                    self.state.current_bar_tick += meter.ticks_per_bar;
                }
                self.state.current_bar = target;
            }
            BarPolicy::BarIndexed => {
                self.state.current_bar = self.indexed_bar_target(token);
                self.state.current_bar_tick = self.indexed_bar_tick(token);
            }
        }
        if self.policy.reset_position_on_bar {
            self.state.current_position = 0;
        }

        log::trace!(
            "bar {} starts at tick {}",
            self.state.current_bar,
            self.state.current_bar_tick
        );
    }

    /// Bar numbers are u32; numbering starts at bar 0 before any Bar token.
    fn indexed_bar_target(&mut self, token: &Token<'_>) -> i64 {
        let increment = self.state.current_bar.max(0).saturating_add(1);
        match token.value_str() {
            "" | "None" => increment,
            value => match value.parse::<u32>() {
                Ok(bar) => i64::from(bar),
                Err(_) => {
                    self.record(DiagnosticKind::InvalidBar, token);
                    increment
                }
            },
        }
    }

    /// Origin of the current indexed bar under the active meter.
    fn indexed_bar_tick(&mut self, token: &Token<'_>) -> f64 {
        if self.state.current_bar <= 0 {
            return 0.0;
        }
        let meter = self.meter_for(token);
        self.state.current_bar as f64 * meter.ticks_per_bar
    }

    pub(super) fn on_time_signature(&mut self, token: &Token<'_>) {
        let Some((numerator, denominator)) = parse_time_signature(token.value_str()) else {
            self.record(DiagnosticKind::InvalidTimeSignature, token);
            return;
        };

        let meter = Meter::new(numerator, denominator, self.policy.ticks_per_beat);
        self.state.meter = Some(meter);
        log::trace!("time signature {}/{}", numerator, denominator);

        // Indexed bars are re-measured with the new bar width.
        if self.policy.bar == BarPolicy::BarIndexed && self.state.current_bar > 0 {
            self.state.current_bar_tick = self.state.current_bar as f64 * meter.ticks_per_bar;
        }

        match resolve_tick(self.state.current_bar_tick) {
            Ok(tick) => self.document.header.time_signatures.push(TimeSignatureEvent {
                tick,
                numerator,
                denominator,
            }),
            Err(kind) => self.record(kind, token),
        }
    }

    pub(super) fn on_tempo(&mut self, token: &Token<'_>) {
        let bpm = match token.value_str().parse::<f64>() {
            Ok(bpm) if bpm.is_finite() && bpm > 0.0 => bpm,
            _ => {
                self.record(DiagnosticKind::InvalidTempo, token);
                return;
            }
        };
        self.state.current_tempo = bpm;

        let raw_tick = match self.policy.tempo {
            TempoPlacement::BarStart => self.state.current_bar_tick,
            TempoPlacement::AtPosition => {
                let meter = self.meter_for(token);
                self.state.position_tick(&meter, PositionUnit::BarTwentyFourths)
            }
        };

        match resolve_tick(raw_tick) {
            Ok(tick) => {
                log::trace!("tempo {} bpm at tick {}", bpm, tick);
                self.document.header.tempos.push(TempoEvent { tick, bpm });
            }
            Err(kind) => self.record(kind, token),
        }
    }

    pub(super) fn on_position(&mut self, token: &Token<'_>) {
        // Out-of-range positions are kept and flow into the tick math.
        match token.value_str().parse::<i64>() {
            Ok(position) => self.state.current_position = position,
            Err(_) => self.record(DiagnosticKind::InvalidPosition, token),
        }
    }
}

/// Parse `"<numerator>/<denominator>"`, both non-zero integers.
fn parse_time_signature(value: &str) -> Option<(u32, u32)> {
    let (numerator, denominator) = value.split_once('/')?;
    let numerator = numerator.trim().parse::<u32>().ok()?;
    let denominator = denominator.trim().parse::<u32>().ok()?;
    if numerator == 0 || denominator == 0 {
        return None;
    }
    Some((numerator, denominator))
}
