//! # courtside-core
//!
//! This crate contains the state model for a single elimination bracket:
//! per-round match records, winner selection with toggle/unselect semantics,
//! forward propagation of winners into later rounds and manual-edit pins that
//! protect hand-entered names from being overwritten by propagation.
//!
//! Important types:
//! - [`BracketTree`]: the authoritative in-memory bracket, an ordered
//! sequence of rounds.
//! - [`BracketMatch`]: a single bout of two parties within a round.
//! - [`PlayerSlot`]: a *spot* within a match, which can hold a player name or
//! be a to-be-decided placeholder.
//! - [`Side`]: selects one of the two spots (or scores) of a match.
//!
//! ## Feature Flags
//!
//! `serde`: Adds `Serialize` and `Deserialize` impls to all state types.

mod bracket;

pub use bracket::BracketTree;

use thiserror::Error;

use std::fmt::{self, Display, Formatter};
use std::result;

#[cfg(feature = "serde")]
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// An `Result<T>` using [`enum@Error`] as an error type.
pub type Result<T> = result::Result<T, Error>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("cannot seed a bracket with no entrants")]
    NoEntrants,
    #[error("bracket size {0} is not a power of two")]
    InvalidBracketSize(usize),
    #[error("invalid number of rounds: expected {expected}, found {found}")]
    InvalidRoundCount { expected: usize, found: usize },
    #[error("invalid number of matches in round {round}: expected {expected}, found {found}")]
    InvalidMatchCount {
        round: usize,
        expected: usize,
        found: usize,
    },
    #[error("winner of match {slot} in round {round} is not a player of that match")]
    InvalidWinner { round: usize, slot: usize },
}

/// A spot for a player in a match.
///
/// A spot either holds a player name or is still to be decided (`Tbd`),
/// meaning the feeding match has not produced a winner yet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PlayerSlot {
    Player(String),
    #[default]
    Tbd,
}

impl PlayerSlot {
    /// Creates a new `PlayerSlot` from an [`Option`]. A `Some(name)` value
    /// translates into a `Player(name)` value, a `None` value translates into
    /// a `Tbd` value.
    pub fn new(player: Option<String>) -> Self {
        match player {
            Some(player) => Self::Player(player),
            None => Self::Tbd,
        }
    }

    /// Returns `true` if the `PlayerSlot` is [`Tbd`].
    ///
    /// [`Tbd`]: Self::Tbd
    #[inline]
    pub fn is_tbd(&self) -> bool {
        matches!(self, Self::Tbd)
    }

    /// Returns the player name, or `None` if the spot is still to be decided.
    pub fn as_player(&self) -> Option<&str> {
        match self {
            Self::Player(name) => Some(name),
            Self::Tbd => None,
        }
    }

    /// Takes out the value, leaving [`Self::Tbd`] in its place.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

impl Display for PlayerSlot {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player(name) => f.write_str(name),
            Self::Tbd => f.write_str("TBD"),
        }
    }
}

impl From<&str> for PlayerSlot {
    fn from(name: &str) -> Self {
        Self::Player(name.to_owned())
    }
}

// On the wire a spot is a bare string, with "TBD" as the placeholder
// sentinel. That is also what the stored documents contain.
#[cfg(feature = "serde")]
impl Serialize for PlayerSlot {
    fn serialize<S>(&self, serializer: S) -> result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Player(name) => serializer.serialize_str(name),
            Self::Tbd => serializer.serialize_str("TBD"),
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for PlayerSlot {
    fn deserialize<D>(deserializer: D) -> result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SlotVisitor;

        impl<'de> de::Visitor<'de> for SlotVisitor {
            type Value = PlayerSlot;

            fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
                formatter.write_str("a player name or \"TBD\"")
            }

            fn visit_str<E>(self, v: &str) -> result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                match v {
                    "TBD" => Ok(PlayerSlot::Tbd),
                    name => Ok(PlayerSlot::Player(name.to_owned())),
                }
            }
        }

        deserializer.deserialize_str(SlotVisitor)
    }
}

/// Selects one of the two spots of a [`BracketMatch`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Side {
    Player1,
    Player2,
}

/// A match of two parties within one round of the bracket.
///
/// `winner`, when set, always equals the name in one of the two player spots.
/// The `manually_edited_*` flags are one-way latches set by an explicit name
/// edit; once set, [`BracketTree::rebuild`] never overwrites that spot. They
/// are cleared only by an upstream unselect cascade or a full reset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BracketMatch {
    pub player1: PlayerSlot,
    pub player2: PlayerSlot,
    #[cfg_attr(feature = "serde", serde(default))]
    pub winner: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub score1: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub score2: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub scheduled_time: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_bye: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub manually_edited_p1: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub manually_edited_p2: bool,
}

impl BracketMatch {
    /// Creates a new match between the two given spots.
    pub fn new(player1: PlayerSlot, player2: PlayerSlot) -> Self {
        Self {
            player1,
            player2,
            ..Self::default()
        }
    }

    /// Returns `true` if `name` occupies one of the two player spots.
    pub fn has_player(&self, name: &str) -> bool {
        self.player1.as_player() == Some(name) || self.player2.as_player() == Some(name)
    }

    /// Returns a reference to the spot on the given side.
    #[inline]
    pub fn player(&self, side: Side) -> &PlayerSlot {
        match side {
            Side::Player1 => &self.player1,
            Side::Player2 => &self.player2,
        }
    }

    /// Returns a mutable reference to the spot on the given side.
    #[inline]
    pub fn player_mut(&mut self, side: Side) -> &mut PlayerSlot {
        match side {
            Side::Player1 => &mut self.player1,
            Side::Player2 => &mut self.player2,
        }
    }

    #[inline]
    pub fn score_mut(&mut self, side: Side) -> &mut String {
        match side {
            Side::Player1 => &mut self.score1,
            Side::Player2 => &mut self.score2,
        }
    }

    #[inline]
    pub fn manually_edited(&self, side: Side) -> bool {
        match side {
            Side::Player1 => self.manually_edited_p1,
            Side::Player2 => self.manually_edited_p2,
        }
    }

    pub(crate) fn set_manually_edited(&mut self, side: Side) {
        match side {
            Side::Player1 => self.manually_edited_p1 = true,
            Side::Player2 => self.manually_edited_p2 = true,
        }
    }

    /// Clears the recorded result of this match, keeping the player spots.
    pub(crate) fn clear_result(&mut self) {
        self.winner = None;
        self.score1.clear();
        self.score2.clear();
    }

    /// Clears everything a propagated result ever fed into this match: the
    /// result, both player spots and the manual-edit pins.
    pub(crate) fn clear_derived(&mut self) {
        self.clear_result();
        self.player1 = PlayerSlot::Tbd;
        self.player2 = PlayerSlot::Tbd;
        self.manually_edited_p1 = false;
        self.manually_edited_p2 = false;
    }
}
