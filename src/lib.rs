pub mod decoder;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod instruments;
pub mod lexer;
pub mod policy;
pub mod smf;

pub use decoder::{Decoded, Decoder};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use document::*;
pub use error::*;
pub use lexer::{Lexer, Token, TokenKind};
pub use policy::{BarPolicy, DecodePolicy, DrumDuration, DurationFormat, PositionUnit, TempoPlacement, TrackRouting};
pub use smf::{to_smf_bytes, write_smf};

/// Decode a REMI token string with the default policy.
/// This is the main entry point for the library.
pub fn decode(source: &str) -> MidiDocument {
    Decoder::default().decode(source).document
}

/// Decode with the default policy, keeping the record of skipped tokens.
pub fn decode_with_diagnostics(source: &str) -> Decoded {
    Decoder::default().decode(source)
}

/// Decode a REMI token string straight to Standard MIDI File bytes.
pub fn decode_to_smf(source: &str) -> Result<Vec<u8>, RemiError> {
    to_smf_bytes(&decode(source))
}
