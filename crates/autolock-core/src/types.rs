use crate::{
    Result,
    constants::{CLOSE_CUE_HZ, MAX_UID_LENGTH, MIN_UID_LENGTH, OPEN_CUE_HZ, REJECT_CUE_HZ},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use subtle::{Choice, ConstantTimeEq};

/// Lock position.
///
/// A controller always starts `Closed`; there is no unknown state after
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    #[default]
    Closed,
    Opened,
}

impl LockState {
    /// The state a toggle leads to.
    #[inline]
    #[must_use]
    pub fn inverted(self) -> Self {
        match self {
            LockState::Closed => LockState::Opened,
            LockState::Opened => LockState::Closed,
        }
    }

    /// Returns `true` if the latch is released.
    #[inline]
    #[must_use]
    pub fn is_opened(self) -> bool {
        matches!(self, LockState::Opened)
    }

    /// Returns `true` if the latch is engaged.
    #[inline]
    #[must_use]
    pub fn is_closed(self) -> bool {
        matches!(self, LockState::Closed)
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LockState::Closed => write!(f, "Closed"),
            LockState::Opened => write!(f, "Opened"),
        }
    }
}

/// Card identifier: the tag's UID as a lowercase hex string.
///
/// The representation is canonical: the same physical card always yields the
/// same string, regardless of whether it came from a reader or a registry
/// file written by hand in upper case.
///
/// # Security
/// Equality uses a constant-time comparison. Ordering does not, so access
/// checks go through [`CardId::matches_any`] rather than a set lookup.
///
/// # Examples
///
/// ```
/// use autolock_core::CardId;
///
/// let from_reader = CardId::from_bytes(&[0x04, 0xA1, 0xB2, 0xC3]).unwrap();
/// let from_file: CardId = " 04A1B2C3 ".parse().unwrap();
///
/// assert_eq!(from_reader, from_file);
/// assert_eq!(from_reader.as_str(), "04a1b2c3");
/// ```
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardId(String);

impl CardId {
    /// Encode a raw UID.
    ///
    /// # Errors
    /// Returns `Error::InvalidCardFormat` if the UID is not
    /// `MIN_UID_LENGTH..=MAX_UID_LENGTH` bytes long.
    pub fn from_bytes(uid: &[u8]) -> Result<Self> {
        Self::check_len(uid.len())?;
        Ok(CardId(uid.iter().map(|b| format!("{b:02x}")).collect()))
    }

    /// Returns `true` if any of `cards` equals this identifier.
    ///
    /// Every entry is compared in constant time and the scan never stops
    /// early, so the time taken depends only on the number of entries.
    pub fn matches_any<'a>(&self, cards: impl IntoIterator<Item = &'a CardId>) -> bool {
        let found = cards
            .into_iter()
            .fold(Choice::from(0), |found, card| found | self.0.as_bytes().ct_eq(card.0.as_bytes()));
        found.into()
    }

    /// Parse and normalize a hex identifier (trimmed, lowercased).
    ///
    /// # Errors
    /// Returns `Error::InvalidCardFormat` if the string has an odd number of
    /// digits, contains non-hex characters, or decodes to a UID outside the
    /// valid length range.
    pub fn parse(s: &str) -> Result<Self> {
        let hex = s.trim().to_ascii_lowercase();

        if hex.len() % 2 != 0 {
            return Err(Error::InvalidCardFormat(format!(
                "Card id must have an even number of hex digits, got {}",
                hex.len()
            )));
        }

        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidCardFormat(format!(
                "Card id must be hexadecimal: {hex}"
            )));
        }

        Self::check_len(hex.len() / 2)?;
        Ok(CardId(hex))
    }

    fn check_len(len: usize) -> Result<()> {
        if !(MIN_UID_LENGTH..=MAX_UID_LENGTH).contains(&len) {
            return Err(Error::InvalidCardFormat(format!(
                "UID must be {MIN_UID_LENGTH}-{MAX_UID_LENGTH} bytes, got {len}"
            )));
        }
        Ok(())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode back into UID bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0
            .as_bytes()
            .chunks(2)
            .filter_map(|pair| std::str::from_utf8(pair).ok())
            .filter_map(|pair| u8::from_str_radix(pair, 16).ok())
            .collect()
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CardId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CardId::parse(s)
    }
}

impl TryFrom<String> for CardId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        CardId::parse(&value)
    }
}

impl From<CardId> for String {
    fn from(id: CardId) -> Self {
        id.0
    }
}

impl PartialEq for CardId {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl std::hash::Hash for CardId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl PartialOrd for CardId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CardId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

/// Outcome of one bounded card scan.
///
/// Registry membership is decided downstream; a `Card` result says nothing
/// about whether the card may operate the lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanResult {
    /// A card was read within the timeout.
    Card(CardId),
    /// The timeout elapsed with no card in the field.
    NoCard,
    /// No reader could be opened.
    Unavailable,
    /// The transport returned data that is not a valid identifier.
    Failed { reason: String },
}

impl ScanResult {
    /// The card identifier, if one was read.
    #[must_use]
    pub fn card(&self) -> Option<&CardId> {
        match self {
            ScanResult::Card(id) => Some(id),
            _ => None,
        }
    }

    /// Returns `true` if no identifier is available for the state machine.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.card().is_none()
    }
}

impl fmt::Display for ScanResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScanResult::Card(id) => write!(f, "card {id}"),
            ScanResult::NoCard => write!(f, "no card"),
            ScanResult::Unavailable => write!(f, "reader unavailable"),
            ScanResult::Failed { reason } => write!(f, "scan failed: {reason}"),
        }
    }
}

/// Gesture classified from the switch sample history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gesture {
    /// Single rising edge between two ticks.
    Press,
    /// Input held high for the whole long window.
    Hold,
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Gesture::Press => write!(f, "Press"),
            Gesture::Hold => write!(f, "Hold"),
        }
    }
}

/// Audible cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    Open,
    Close,
    Reject,
}

impl Cue {
    /// Frequencies (Hz) making up the cue. `0` is a rest.
    #[must_use]
    pub fn frequencies(self) -> &'static [u32] {
        match self {
            Cue::Open => &OPEN_CUE_HZ,
            Cue::Close => &CLOSE_CUE_HZ,
            Cue::Reject => &REJECT_CUE_HZ,
        }
    }
}

/// Where the scan loop routes each card it reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Registered cards toggle the lock, others are rejected.
    #[default]
    Toggle,
    /// Cards are added to the registry.
    Register,
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScanMode::Toggle => write!(f, "Toggle"),
            ScanMode::Register => write!(f, "Register"),
        }
    }
}

/// What the sampler does after a hold has fired while the switch stays down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldRetrigger {
    /// Fire once per continuous high run; re-arm after a low sample.
    #[default]
    OncePerHold,
    /// Fire again every time the long window refills with high samples.
    EveryWindow,
}

/// Action bound to the hold gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldAction {
    /// Darken both indicators and stop the controller.
    #[default]
    Shutdown,
    /// Emergency unlock: open regardless of the current state.
    Open,
}

/// Result of a registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    NewlyRegistered,
    AlreadyRegistered,
}

impl Registration {
    /// Returns `true` if the registry grew.
    #[inline]
    #[must_use]
    pub fn is_new(self) -> bool {
        matches!(self, Registration::NewlyRegistered)
    }
}

impl fmt::Display for Registration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Registration::NewlyRegistered => write!(f, "newly registered"),
            Registration::AlreadyRegistered => write!(f, "already registered"),
        }
    }
}
