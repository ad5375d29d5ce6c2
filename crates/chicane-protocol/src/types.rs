//! Core shared types for the chicane lobby.
//!
//! This module defines the vocabulary that every other crate speaks:
//! identifiers for profiles and login sessions, the four table seats,
//! contract strains, and the calls that make up a bridge auction.
//!
//! All of these types cross a serialization boundary at some point —
//! the auction log is stored as JSON rows, and the logged-in identity
//! is persisted to key-value storage — so they all derive serde's
//! `Serialize` and `Deserialize` and pin down their exact JSON shape.

use rand::Rng;
use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player profile.
///
/// This is a "newtype wrapper": a `String` inside a named struct. The
/// string itself comes from the backing store (it is the profile row's
/// primary key), but wrapping it means the compiler stops us from
/// passing a profile id where a session id is expected — both are
/// strings underneath, and mixing them up is exactly the kind of bug
/// the exclusive-login protocol cannot afford.
///
/// `#[serde(transparent)]` tells serde to serialize this as the bare
/// inner string, not as a one-field object. So `ProfileId("ada")`
/// becomes `"ada"` in JSON, which is what the store rows contain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(pub String);

impl ProfileId {
    /// Builds a profile id from anything string-like.
    ///
    /// `impl Into<String>` accepts `&str`, `String`, and so on — the
    /// caller doesn't have to call `.to_string()` first.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id, for handing to storage APIs that want `&str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Display lets us use `{}` in format strings and tracing fields.
/// `tracing::info!(profile = %profile_id, ...)` prints the raw id.
impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unique identifier for one login session on one device.
///
/// Every login attempt mints a fresh `SessionId`. The session row in
/// the backing store records which session currently owns the profile;
/// comparing our id against the row is how a device discovers it has
/// been replaced by a newer login elsewhere.
///
/// Same newtype pattern as [`ProfileId`], same transparent JSON shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Builds a session id from an existing string (e.g. one loaded
    /// back out of persisted identity storage).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mints a fresh random session id.
    ///
    /// 16 random bytes, hex-encoded to 32 characters. That is 128 bits
    /// of randomness — collisions are not a practical concern, so the
    /// store never has to check for duplicates.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let bytes: [u8; 16] = rng.random();
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// The raw id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Seats and sides
// ---------------------------------------------------------------------------

/// One of the four seats at a bridge table.
///
/// Rust enums with no data are still richer than named integers: we
/// hang the rotation and partnership logic directly off the type, so
/// "the seat after South" is `Seat::South.next()` everywhere instead
/// of scattered index arithmetic.
///
/// The `#[serde(rename = "...")]` attributes pin the JSON form to the
/// single-letter compass abbreviations that the stored auction rows
/// use: `"N"`, `"E"`, `"S"`, `"W"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    #[serde(rename = "N")]
    North,
    #[serde(rename = "E")]
    East,
    #[serde(rename = "S")]
    South,
    #[serde(rename = "W")]
    West,
}

impl Seat {
    /// All four seats in calling order. Handy for iteration in tests
    /// and for dealing out a table.
    pub const ALL: [Seat; 4] = [Seat::North, Seat::East, Seat::South, Seat::West];

    /// The next seat in rotation (clockwise around the table).
    ///
    /// The auction proceeds N → E → S → W → N, and the opening lead is
    /// made by the seat after the declarer.
    pub fn next(self) -> Seat {
        match self {
            Seat::North => Seat::East,
            Seat::East => Seat::South,
            Seat::South => Seat::West,
            Seat::West => Seat::North,
        }
    }

    /// The seat directly across the table.
    ///
    /// North partners South; East partners West. When a contract is
    /// won, the declarer's partner becomes the dummy.
    pub fn partner(self) -> Seat {
        match self {
            Seat::North => Seat::South,
            Seat::South => Seat::North,
            Seat::East => Seat::West,
            Seat::West => Seat::East,
        }
    }

    /// The partnership this seat belongs to.
    pub fn side(self) -> Side {
        match self {
            Seat::North | Seat::South => Side::NorthSouth,
            Seat::East | Seat::West => Side::EastWest,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Seat::North => "N",
            Seat::East => "E",
            Seat::South => "S",
            Seat::West => "W",
        };
        write!(f, "{letter}")
    }
}

/// One of the two partnerships at the table.
///
/// JSON form is the conventional pair abbreviation: `"NS"` or `"EW"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "NS")]
    NorthSouth,
    #[serde(rename = "EW")]
    EastWest,
}

impl Side {
    /// Whether the given seat plays for this partnership.
    pub fn holds(self, seat: Seat) -> bool {
        seat.side() == self
    }

    /// The opposing partnership.
    pub fn opponents(self) -> Side {
        match self {
            Side::NorthSouth => Side::EastWest,
            Side::EastWest => Side::NorthSouth,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pair = match self {
            Side::NorthSouth => "NS",
            Side::EastWest => "EW",
        };
        write!(f, "{pair}")
    }
}

// ---------------------------------------------------------------------------
// Strains
// ---------------------------------------------------------------------------

/// The denomination a contract is played in: one of the four suits, or
/// notrump.
///
/// The variants are ordered lowest to highest (clubs below diamonds,
/// notrump above everything), which is the ranking used when comparing
/// bids. Deriving `PartialOrd`/`Ord` makes that ranking available as
/// plain `<` comparisons, because Rust orders enum variants by their
/// declaration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Strain {
    #[serde(rename = "C")]
    Clubs,
    #[serde(rename = "D")]
    Diamonds,
    #[serde(rename = "H")]
    Hearts,
    #[serde(rename = "S")]
    Spades,
    #[serde(rename = "NT")]
    Notrump,
}

impl fmt::Display for Strain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Strain::Clubs => "C",
            Strain::Diamonds => "D",
            Strain::Hearts => "H",
            Strain::Spades => "S",
            Strain::Notrump => "NT",
        };
        write!(f, "{symbol}")
    }
}

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

/// A single call in the auction.
///
/// Every variant records the seat that made it, so a stored auction is
/// just an ordered `Vec<Call>` — no separate "whose turn" bookkeeping
/// that could drift out of sync with the log.
///
/// `#[serde(tag = "type")]` produces "internally tagged" JSON. Instead
/// of `{ "Bid": { "seat": "S", ... } }` it produces:
///   `{ "type": "BID", "seat": "S", "level": 2, "strain": "H" }`
/// which is the shape the stored auction rows use. The
/// `rename_all = "UPPERCASE"` applies to the variant names themselves,
/// giving the tags `"PASS"`, `"BID"`, `"DOUBLE"`, `"REDOUBLE"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Call {
    /// No bid this turn. Three passes in a row after a bid close the
    /// auction; four passes at the start throw the deal in.
    Pass { seat: Seat },

    /// A proposal to win at least `level` + 6 tricks with `strain` as
    /// trump (or no trump). Levels run 1 through 7.
    Bid { seat: Seat, level: u8, strain: Strain },

    /// A challenge to the opponents' standing bid, raising the stakes.
    Double { seat: Seat },

    /// A counter-challenge to a double, raising the stakes again.
    Redouble { seat: Seat },
}

impl Call {
    /// Convenience constructor for a pass.
    pub fn pass(seat: Seat) -> Self {
        Call::Pass { seat }
    }

    /// Convenience constructor for a bid. Arguments read the way a bid
    /// is spoken: level, strain, then who said it.
    pub fn bid(level: u8, strain: Strain, seat: Seat) -> Self {
        Call::Bid { seat, level, strain }
    }

    /// Convenience constructor for a double.
    pub fn double(seat: Seat) -> Self {
        Call::Double { seat }
    }

    /// Convenience constructor for a redouble.
    pub fn redouble(seat: Seat) -> Self {
        Call::Redouble { seat }
    }

    /// The seat that made this call, whatever kind it is.
    pub fn seat(&self) -> Seat {
        match *self {
            Call::Pass { seat }
            | Call::Bid { seat, .. }
            | Call::Double { seat }
            | Call::Redouble { seat } => seat,
        }
    }

    /// Whether this call is a pass.
    pub fn is_pass(&self) -> bool {
        matches!(self, Call::Pass { .. })
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Call::Pass { seat } => write!(f, "{seat}:P"),
            Call::Bid { seat, level, strain } => write!(f, "{seat}:{level}{strain}"),
            Call::Double { seat } => write!(f, "{seat}:X"),
            Call::Redouble { seat } => write!(f, "{seat}:XX"),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
