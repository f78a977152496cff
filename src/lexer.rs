//! # Lexer
//!
//! Splits a REMI token string into typed [`Token`]s.
//!
//! Fragments are separated by runs of whitespace. A fragment is split into a
//! parameter name and a value at its first underscore (`Pitch_60` becomes
//! `Pitch` / `60`, `Program_-1` becomes `Program` / `-1`). Fragments without an
//! underscore, or with a parameter name outside the vocabulary, are kept as
//! [`TokenKind::Unknown`] so the decoder can skip and count them.
//!
//! Lexing never fails and has no side effects; calling [`Lexer::tokenize`]
//! twice yields the same sequence.

/// Parameter names of the REMI vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Bar,
    TimeSig,
    Tempo,
    Position,
    Program,
    Pitch,
    PitchDrum,
    Velocity,
    Duration,
    Unknown,
}

impl TokenKind {
    /// Classify a parameter name. Matching is exact and case-sensitive.
    pub fn from_param(param: &str) -> Self {
        match param {
            "Bar" => TokenKind::Bar,
            "TimeSig" => TokenKind::TimeSig,
            "Tempo" => TokenKind::Tempo,
            "Position" => TokenKind::Position,
            "Program" => TokenKind::Program,
            "Pitch" => TokenKind::Pitch,
            "PitchDrum" => TokenKind::PitchDrum,
            "Velocity" => TokenKind::Velocity,
            "Duration" => TokenKind::Duration,
            _ => TokenKind::Unknown,
        }
    }
}

/// A single `Param_Value` unit, borrowed from the input string
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Text before the first underscore, or the whole fragment if it has none
    pub param: &'a str,
    /// Text after the first underscore
    pub value: Option<&'a str>,
    /// Index of this fragment in the token sequence
    pub index: usize,
}

impl<'a> Token<'a> {
    fn from_fragment(fragment: &'a str, index: usize) -> Self {
        match fragment.split_once('_') {
            Some((param, value)) => Token {
                kind: TokenKind::from_param(param),
                param,
                value: Some(value),
                index,
            },
            None => Token {
                kind: TokenKind::Unknown,
                param: fragment,
                value: None,
                index,
            },
        }
    }

    /// Value text, or `""` when the fragment had no underscore
    pub fn value_str(&self) -> &'a str {
        self.value.unwrap_or("")
    }
}

impl std::fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.value {
            Some(value) => write!(f, "{}_{}", self.param, value),
            None => write!(f, "{}", self.param),
        }
    }
}

/// Lexer for REMI token strings
pub struct Lexer<'a> {
    input: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input }
    }

    /// Iterate over tokens without collecting them.
    pub fn tokens(&self) -> impl Iterator<Item = Token<'a>> + 'a {
        self.input
            .split_whitespace()
            .enumerate()
            .map(|(index, fragment)| Token::from_fragment(fragment, index))
    }

    pub fn tokenize(&self) -> Vec<Token<'a>> {
        self.tokens().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input).tokenize().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_basic_vocabulary() {
        assert_eq!(
            kinds("Bar_None TimeSig_4/4 Position_0 Tempo_120.0 Program_0 Pitch_60 Velocity_100 Duration_1.0.12 PitchDrum_36"),
            vec![
                TokenKind::Bar,
                TokenKind::TimeSig,
                TokenKind::Position,
                TokenKind::Tempo,
                TokenKind::Program,
                TokenKind::Pitch,
                TokenKind::Velocity,
                TokenKind::Duration,
                TokenKind::PitchDrum,
            ]
        );
    }

    #[test]
    fn test_split_on_first_underscore() {
        let tokens = Lexer::new("Program_-1 Foo_bar_baz").tokenize();
        assert_eq!(tokens[0].param, "Program");
        assert_eq!(tokens[0].value, Some("-1"));
        assert_eq!(tokens[1].param, "Foo");
        assert_eq!(tokens[1].value, Some("bar_baz"));
        assert_eq!(tokens[1].kind, TokenKind::Unknown);
    }

    #[test]
    fn test_whitespace_runs_and_empty_input() {
        assert!(Lexer::new("").tokenize().is_empty());
        assert!(Lexer::new("  \n\t ").tokenize().is_empty());

        let tokens = Lexer::new("  Bar_None \n\n\tPosition_4  ").tokenize();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].index, 0);
        assert_eq!(tokens[1].index, 1);
        assert_eq!(tokens[1].value, Some("4"));
    }

    #[test]
    fn test_fragment_without_underscore_is_unknown() {
        let tokens = Lexer::new("<eos> Bar_None").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Unknown);
        assert_eq!(tokens[0].param, "<eos>");
        assert_eq!(tokens[0].value, None);
        assert_eq!(tokens[1].kind, TokenKind::Bar);
    }

    #[test]
    fn test_parameter_names_are_case_sensitive() {
        assert_eq!(kinds("pitch_60 PITCH_60"), vec![TokenKind::Unknown, TokenKind::Unknown]);
    }

    #[test]
    fn test_empty_value() {
        let tokens = Lexer::new("Bar_").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Bar);
        assert_eq!(tokens[0].value, Some(""));
        assert_eq!(tokens[0].value_str(), "");
    }

    #[test]
    fn test_display_roundtrips_fragment() {
        let tokens = Lexer::new("Duration_0.6.12 junk").tokenize();
        assert_eq!(tokens[0].to_string(), "Duration_0.6.12");
        assert_eq!(tokens[1].to_string(), "junk");
    }

    #[test]
    fn test_tokenize_is_restartable() {
        let lexer = Lexer::new("Bar_None Pitch_60");
        assert_eq!(lexer.tokenize(), lexer.tokenize());
    }
}
