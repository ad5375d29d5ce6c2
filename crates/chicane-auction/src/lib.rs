//! Pure auction resolution for chicane.
//!
//! Given an ordered list of [`Call`]s, decide whether the auction is
//! still open, passed out, or closed with a contract — and if closed,
//! who declares, who is dummy, and who makes the opening lead.
//!
//! Everything here is a pure function over its inputs. No clocks, no
//! storage, no async: the same call list always resolves to the same
//! result, which is what makes replaying a stored auction log safe.
//!
//! # Robustness
//!
//! The resolver never validates legality. An auction log may contain a
//! double with no bid to double, a redouble out of order, or an
//! insufficient bid — the resolver ignores what it can't use and never
//! panics. Enforcing bidding rules is the table's job at entry time;
//! by the time a log reaches this crate it is history, and history has
//! to resolve to *something*.
//!
//! # Integration
//!
//! The lobby re-exports [`resolve_auction`] for table views:
//!
//! ```
//! use chicane_auction::{resolve_auction, AuctionResult};
//! use chicane_protocol::{Call, Seat, Strain};
//!
//! let calls = [
//!     Call::bid(1, Strain::Spades, Seat::North),
//!     Call::pass(Seat::East),
//!     Call::pass(Seat::South),
//!     Call::pass(Seat::West),
//! ];
//! let result = resolve_auction(&calls);
//! assert!(matches!(result, AuctionResult::Contract { .. }));
//! ```

use serde::{Deserialize, Serialize};

use std::fmt;

use chicane_protocol::{Call, Seat, Side, Strain};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// How many times the standing bid has been challenged.
///
/// A fresh bid always resets this to `Undoubled` — a double applies to
/// the bid standing when it was made, not to any later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Doubling {
    Undoubled,
    Doubled,
    Redoubled,
}

impl Doubling {
    /// The conventional suffix for contract notation: `""`, `"X"`, `"XX"`.
    pub fn suffix(self) -> &'static str {
        match self {
            Doubling::Undoubled => "",
            Doubling::Doubled => "X",
            Doubling::Redoubled => "XX",
        }
    }
}

impl fmt::Display for Doubling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

/// The final contract of a completed auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    /// Odd tricks contracted for (1–7): the declaring side must take
    /// `level + 6` of the 13 tricks.
    pub level: u8,
    /// Trump suit, or notrump.
    pub strain: Strain,
    /// Doubling state of the final bid.
    #[serde(rename = "doubled")]
    pub doubling: Doubling,
    /// The partnership that made the final bid.
    pub declaring_side: Side,
}

/// Standard contract notation: `"2H"`, `"3NTX"`, `"7CXX"`.
impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.level, self.strain, self.doubling.suffix())
    }
}

/// The outcome of resolving a call list.
///
/// A closed sum type rather than a struct of optionals: a consumer
/// cannot read a declarer out of an auction that is still in progress,
/// because the variant carrying one only exists for closed auctions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result")]
pub enum AuctionResult {
    /// Not enough calls yet to close the auction.
    InProgress,
    /// Closed with no bid made: the deal is thrown in and redealt.
    PassedOut,
    /// Closed with a contract.
    Contract {
        contract: Contract,
        /// First member of the declaring side to have bid the contract
        /// strain. Plays both hands.
        declarer: Seat,
        /// The declarer's partner. Their hand is exposed after the
        /// opening lead.
        dummy: Seat,
        /// The seat after the declarer: leads to the first trick.
        opening_leader: Seat,
    },
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolves an ordered call list into an auction outcome.
///
/// Completion rules:
/// - Fewer than four calls: still in progress.
/// - The first four calls are all passes: passed out, regardless of
///   anything recorded after them.
/// - The last non-pass call is followed by exactly three passes:
///   closed. With a bid somewhere in the list that's a contract;
///   with only doubles/redoubles and no bid it's passed out.
/// - Any other shape: still in progress.
pub fn resolve_auction(calls: &[Call]) -> AuctionResult {
    if calls.len() < 4 {
        return AuctionResult::InProgress;
    }
    if calls[..4].iter().all(Call::is_pass) {
        return AuctionResult::PassedOut;
    }

    // At least one of the first four calls is a non-pass, so this
    // position always exists past the early returns above.
    let Some(last_action) = calls.iter().rposition(|call| !call.is_pass()) else {
        return AuctionResult::PassedOut;
    };

    // Closed means exactly three passes follow the last action. More
    // passes than that is a malformed log; treat it as still open
    // rather than guessing.
    if calls.len() != last_action + 4 {
        return AuctionResult::InProgress;
    }

    let Some(contract) = determine_contract(calls) else {
        // Doubles with no bid under them: nothing was ever contracted.
        return AuctionResult::PassedOut;
    };

    match determine_declarer(calls, &contract) {
        Some(declarer) => AuctionResult::Contract {
            contract,
            declarer,
            dummy: declarer.partner(),
            opening_leader: declarer.next(),
        },
        // Unreachable when the contract came from the same call list,
        // but resolution must not panic on any input.
        None => AuctionResult::PassedOut,
    }
}

/// Extracts the standing contract from a call list, or `None` if no
/// bid was ever made.
///
/// Walks the list once, tracking the latest bid and the doubling state
/// of that bid:
/// - a bid replaces the previous one and resets doubling,
/// - a double counts only while a bid is standing,
/// - a redouble counts only while the standing bid is doubled.
pub fn determine_contract(calls: &[Call]) -> Option<Contract> {
    let mut last_bid: Option<(Seat, u8, Strain)> = None;
    let mut doubling = Doubling::Undoubled;

    for call in calls {
        match *call {
            Call::Bid { seat, level, strain } => {
                last_bid = Some((seat, level, strain));
                doubling = Doubling::Undoubled;
            }
            Call::Double { .. } if last_bid.is_some() => {
                doubling = Doubling::Doubled;
            }
            Call::Redouble { .. }
                if last_bid.is_some() && doubling == Doubling::Doubled =>
            {
                doubling = Doubling::Redoubled;
            }
            // Passes, and challenges with nothing to challenge.
            _ => {}
        }
    }

    last_bid.map(|(seat, level, strain)| Contract {
        level,
        strain,
        doubling,
        declaring_side: seat.side(),
    })
}

/// Finds the declarer for a contract: the first seat on the declaring
/// side, in call order, to have bid the contract strain.
///
/// This is why the declarer is not simply "whoever made the final
/// bid" — if North opens 1NT and South later raises to 3NT, North
/// declares, because North named notrump for the partnership first.
pub fn determine_declarer(calls: &[Call], contract: &Contract) -> Option<Seat> {
    calls.iter().find_map(|call| match *call {
        Call::Bid { seat, strain, .. }
            if strain == contract.strain && contract.declaring_side.holds(seat) =>
        {
            Some(seat)
        }
        _ => None,
    })
}

// =========================================================================
// Tests
// =========================================================================
