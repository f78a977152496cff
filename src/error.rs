//! # Error Types
//!
//! This module defines the error type for the fallible edges of the crate.
//!
//! Decoding itself never fails: malformed tokens are dropped and counted in
//! [`Diagnostics`](crate::Diagnostics) instead. Errors only come from loading a
//! decode policy, writing output, or serializing a document into a container
//! that cannot represent it.
//!
//! ## Error Types
//! - `Io` - Reading token input or writing output failed
//! - `Yaml` - A YAML decode policy could not be parsed, or a YAML dump failed
//! - `InvalidPolicy` - A decode policy field is out of range
//! - `Smf` - The document cannot be written as a Standard MIDI File
//! - `Json` - JSON serialization failed
//!
//! ## Usage
//! ```rust
//! use remidi::{DecodePolicy, RemiError};
//!
//! match DecodePolicy::from_yaml("ticks-per-beat: 0") {
//!     Ok(policy) => println!("resolution {}", policy.ticks_per_beat),
//!     Err(RemiError::InvalidPolicy(message)) => eprintln!("bad policy: {}", message),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemiError {
    /// I/O failure while reading tokens or writing output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML could not be parsed or produced (policy files, document dumps).
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A decode policy field is out of range.
    ///
    /// # Example
    /// ```
    /// # use remidi::RemiError;
    /// let err = RemiError::InvalidPolicy("ticks-per-beat must be at least 1".to_string());
    /// assert_eq!(err.to_string(), "Invalid policy: ticks-per-beat must be at least 1");
    /// ```
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    /// The document cannot be represented in a Standard MIDI File.
    ///
    /// # Example
    /// ```
    /// # use remidi::RemiError;
    /// let err = RemiError::Smf("resolution 40000 exceeds 32767 ticks per beat".to_string());
    /// assert_eq!(
    ///     err.to_string(),
    ///     "Cannot write MIDI file: resolution 40000 exceeds 32767 ticks per beat"
    /// );
    /// ```
    #[error("Cannot write MIDI file: {0}")]
    Smf(String),

    /// JSON serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
