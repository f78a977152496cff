//! # Decoder Module
//!
//! Turns a REMI token string into a [`MidiDocument`].
//!
//! ## Pipeline
//! A single forward scan over the lexed tokens. Each token is handed to one
//! of two stages that share the same [`ParserState`] playhead:
//!
//! - `timeline` - `Bar`, `TimeSig`, `Tempo` and `Position` tokens move the
//!   playhead and append tempo / time-signature events to the header
//! - `router` - `Program`, `Pitch` and `PitchDrum` tokens pick (or create) a
//!   track and append notes to it, reading `Velocity` and `Duration` from the
//!   two tokens after each pitch
//!
//! Anything else is skipped and counted in [`Diagnostics`].
//!
//! ## Timing Model
//! ```text
//! ticks_per_bar      = ticks_per_beat * numerator * (4 / denominator)
//! ticks_per_position = (4 / denominator) * ticks_per_beat / 12
//! note start         = bar_tick + position * ticks_per_position
//! note duration      = max(1, round(bars * ticks_per_beat + units * ticks_per_beat / resolution))
//! ```
//!
//! ## Leniency
//! Decoding never fails and never panics. Malformed input costs the note or
//! event it belongs to and nothing else; before the first `TimeSig` the meter
//! falls back to 4/4.
//!
//! ## Example
//! ```rust
//! use remidi::Decoder;
//!
//! let decoded = Decoder::default()
//!     .decode("Bar_None TimeSig_4/4 Position_0 Tempo_120.0 Pitch_60 Velocity_100 Duration_1.0.12");
//!
//! let track = &decoded.document.tracks[0];
//! assert_eq!(track.notes[0].pitch, 60);
//! assert_eq!(track.notes[0].duration_ticks, 480);
//! assert!(decoded.diagnostics.is_empty());
//! ```

mod router;
pub(crate) mod state;
mod timeline;


use serde::Serialize;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::document::MidiDocument;
use crate::error::RemiError;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::policy::DecodePolicy;

use router::TrackRouter;
pub use state::{Meter, ParserState};

/// Result of a decode: the document plus everything that was skipped
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decoded {
    pub document: MidiDocument,
    pub diagnostics: Diagnostics,
}

/// A configured REMI decoder.
///
/// Holds only the policy, so one decoder can serve any number of decode
/// calls, including from several threads at once.
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    policy: DecodePolicy,
}

impl Decoder {
    pub fn new(policy: DecodePolicy) -> Result<Self, RemiError> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &DecodePolicy {
        &self.policy
    }

    pub fn decode(&self, input: &str) -> Decoded {
        let tokens = Lexer::new(input).tokenize();
        let mut session = Session::new(&self.policy);
        session.run(&tokens);
        log::debug!(
            "decoded {} tokens into {} tracks, {} notes ({} diagnostics)",
            tokens.len(),
            session.document.tracks.len(),
            session.document.note_count(),
            session.diagnostics.total()
        );
        Decoded {
            document: session.document,
            diagnostics: session.diagnostics,
        }
    }
}

/// Mutable state of one decode call.
///
/// The timeline stage writes `document.header`; the router writes
/// `document.tracks`. Both read and write `state`.
struct Session<'p> {
    policy: &'p DecodePolicy,
    state: ParserState,
    router: TrackRouter,
    document: MidiDocument,
    diagnostics: Diagnostics,
}

impl<'p> Session<'p> {
    fn new(policy: &'p DecodePolicy) -> Self {
        Self {
            policy,
            state: ParserState::new(policy.ticks_per_beat),
            router: TrackRouter::new(),
            document: MidiDocument::new(policy.name.clone(), policy.ticks_per_beat),
            diagnostics: Diagnostics::new(),
        }
    }

    fn run(&mut self, tokens: &[Token<'_>]) {
        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            match token.kind {
                TokenKind::Bar => self.on_bar(token),
                TokenKind::TimeSig => self.on_time_signature(token),
                TokenKind::Tempo => self.on_tempo(token),
                TokenKind::Position => self.on_position(token),
                TokenKind::Program => self.on_program(token),
                TokenKind::Pitch | TokenKind::PitchDrum => {
                    i += self.on_pitch(&tokens[i..]);
                }
                TokenKind::Velocity | TokenKind::Duration => {
                    self.record(DiagnosticKind::OrphanAttribute, token);
                }
                TokenKind::Unknown => {
                    self.record(DiagnosticKind::UnknownToken, token);
                }
            }
            i += 1;
        }
    }

    /// Active meter, or 4/4 with a diagnostic if no TimeSig has been seen.
    fn meter_for(&mut self, token: &Token<'_>) -> Meter {
        match self.state.meter {
            Some(meter) => meter,
            None => {
                self.record(DiagnosticKind::MeterDefaulted, token);
                Meter::common_time(self.policy.ticks_per_beat)
            }
        }
    }

    fn record(&mut self, kind: DiagnosticKind, token: &Token<'_>) {
        self.diagnostics.record(kind, token.index, token.to_string());
    }

    fn record_dropped_note(&mut self, kind: DiagnosticKind, token: &Token<'_>) {
        self.diagnostics.record_dropped_note(kind, token.index, token.to_string());
    }
}
