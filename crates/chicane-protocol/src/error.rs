//! Error types for the shared-types layer.
//!
//! Each crate in chicane defines its own error enum. When you see a
//! `ProtocolError` you know the problem is serialization of a shared
//! type, not storage access or session arbitration.

/// Errors that can occur converting shared types to and from JSON.
///
/// `#[derive(thiserror::Error)]` auto-generates the `std::error::Error`
/// implementation; the `#[error("...")]` attributes define the message
/// you see when the error lands in a log line.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into JSON).
    ///
    /// Rare in practice — our types serialize infallibly — but the
    /// `serde_json` API is fallible, and swallowing its error here
    /// would hide a real bug if one ever appeared.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning JSON into a Rust value).
    ///
    /// Common causes: a truncated storage write, a blob written by an
    /// older build with different field names, or a user editing their
    /// browser storage by hand.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
