//! # Diagnostics
//!
//! Decoding is lenient: bad tokens are skipped instead of aborting the decode.
//! Every skip is recorded here, both as a per-reason counter and as a
//! [`Diagnostic`] event pointing at the offending token, so tests and callers
//! can see what was thrown away.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Reason a token did not contribute to the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// No underscore, or a parameter name outside the vocabulary
    UnknownToken,
    /// Pitch/PitchDrum not followed by Velocity then Duration
    MissingLookahead,
    InvalidPitch,
    InvalidVelocity,
    InvalidDuration,
    InvalidTimeSignature,
    InvalidTempo,
    InvalidPosition,
    InvalidProgram,
    InvalidBar,
    /// Velocity or Duration with no pitch in front of it
    OrphanAttribute,
    /// A computed tick was NaN or infinite
    NonFiniteTick,
    /// A computed tick was finite but above `u32::MAX`
    TickOutOfRange,
    NegativeTick,
    /// Meter math ran before any TimeSig and used 4/4
    MeterDefaulted,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::UnknownToken => "unknown-token",
            DiagnosticKind::MissingLookahead => "missing-lookahead",
            DiagnosticKind::InvalidPitch => "invalid-pitch",
            DiagnosticKind::InvalidVelocity => "invalid-velocity",
            DiagnosticKind::InvalidDuration => "invalid-duration",
            DiagnosticKind::InvalidTimeSignature => "invalid-time-signature",
            DiagnosticKind::InvalidTempo => "invalid-tempo",
            DiagnosticKind::InvalidPosition => "invalid-position",
            DiagnosticKind::InvalidProgram => "invalid-program",
            DiagnosticKind::InvalidBar => "invalid-bar",
            DiagnosticKind::OrphanAttribute => "orphan-attribute",
            DiagnosticKind::NonFiniteTick => "non-finite-tick",
            DiagnosticKind::TickOutOfRange => "tick-out-of-range",
            DiagnosticKind::NegativeTick => "negative-tick",
            DiagnosticKind::MeterDefaulted => "meter-defaulted",
        };
        f.write_str(name)
    }
}

/// One recorded skip
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Index of the token in the whitespace-split sequence
    pub token_index: usize,
    /// The token text as it appeared in the input
    pub token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    counts: BTreeMap<DiagnosticKind, usize>,
    events: Vec<Diagnostic>,
    dropped_notes: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: DiagnosticKind, token_index: usize, token: impl Into<String>) {
        let token = token.into();
        log::debug!("{} at token {} ({})", kind, token_index, token);
        *self.counts.entry(kind).or_insert(0) += 1;
        self.events.push(Diagnostic {
            kind,
            token_index,
            token,
        });
    }

    /// Record a skip that cost a note, whatever the reason.
    pub fn record_dropped_note(&mut self, kind: DiagnosticKind, token_index: usize, token: impl Into<String>) {
        self.dropped_notes += 1;
        self.record(kind, token_index, token);
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Number of pitch tokens that produced no note
    pub fn dropped_notes(&self) -> usize {
        self.dropped_notes
    }

    pub fn total(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Diagnostic] {
        &self.events
    }

    pub fn counts(&self) -> impl Iterator<Item = (DiagnosticKind, usize)> + '_ {
        self.counts.iter().map(|(kind, count)| (*kind, *count))
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "no diagnostics");
        }
        writeln!(f, "{} diagnostics ({} dropped notes)", self.total(), self.dropped_notes)?;
        for (kind, count) in self.counts() {
            writeln!(f, "  {:<24} {}", kind.to_string(), count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_by_kind() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.record(DiagnosticKind::UnknownToken, 0, "junk");
        diagnostics.record(DiagnosticKind::UnknownToken, 3, "more");
        diagnostics.record_dropped_note(DiagnosticKind::MissingLookahead, 5, "Pitch_60");

        assert_eq!(diagnostics.count(DiagnosticKind::UnknownToken), 2);
        assert_eq!(diagnostics.count(DiagnosticKind::MissingLookahead), 1);
        assert_eq!(diagnostics.count(DiagnosticKind::InvalidTempo), 0);
        assert_eq!(diagnostics.dropped_notes(), 1);
        assert_eq!(diagnostics.total(), 3);
        assert_eq!(diagnostics.events()[2].token, "Pitch_60");
        assert_eq!(diagnostics.events()[2].token_index, 5);
    }

    #[test]
    fn test_summary_lists_each_kind() {
        let mut diagnostics = Diagnostics::new();
        assert_eq!(diagnostics.to_string(), "no diagnostics\n");

        diagnostics.record(DiagnosticKind::InvalidTempo, 1, "Tempo_fast");
        let summary = diagnostics.to_string();
        assert!(summary.starts_with("1 diagnostics (0 dropped notes)"));
        assert!(summary.contains("invalid-tempo"));
    }
}
