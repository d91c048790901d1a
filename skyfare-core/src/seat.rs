use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Seats per row in the cabin layout.
pub const SEATS_PER_ROW: u32 = 6;

/// Column letters, left to right.
pub const COLUMNS: [char; SEATS_PER_ROW as usize] = ['A', 'B', 'C', 'D', 'E', 'F'];

/// A human-readable seat identifier such as `12C`.
///
/// Internally the label is stored as its 1-based seat number, so ordering labels
/// orders seats front to back, left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeatLabel(u32);

impl SeatLabel {
    /// Label for the 1-based seat number `n`.
    pub fn from_number(number: u32) -> Result<Self, SeatLabelError> {
        if number == 0 {
            return Err(SeatLabelError::ZeroSeat);
        }
        Ok(Self(number))
    }

    pub fn number(&self) -> u32 {
        self.0
    }

    pub fn row(&self) -> u32 {
        (self.0 - 1) / SEATS_PER_ROW + 1
    }

    pub fn column(&self) -> char {
        COLUMNS[((self.0 - 1) % SEATS_PER_ROW) as usize]
    }

    /// Whether the seat exists on a cabin of `total_seats`.
    pub fn fits(&self, total_seats: u32) -> bool {
        self.0 <= total_seats
    }
}

impl fmt::Display for SeatLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row(), self.column())
    }
}

impl FromStr for SeatLabel {
    type Err = SeatLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let column = s
            .chars()
            .last()
            .ok_or_else(|| SeatLabelError::Malformed(s.to_string()))?
            .to_ascii_uppercase();
        let row_part = &s[..s.len() - column.len_utf8()];
        if row_part.is_empty() || !row_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SeatLabelError::Malformed(s.to_string()));
        }

        let row: u32 = row_part
            .parse()
            .map_err(|_| SeatLabelError::Malformed(s.to_string()))?;

        let col_index = COLUMNS
            .iter()
            .position(|c| *c == column)
            .ok_or_else(|| SeatLabelError::Malformed(s.to_string()))?;

        row.checked_sub(1)
            .and_then(|r| r.checked_mul(SEATS_PER_ROW))
            .and_then(|n| n.checked_add(col_index as u32 + 1))
            .map(Self)
            .ok_or_else(|| SeatLabelError::Malformed(s.to_string()))
    }
}

impl Serialize for SeatLabel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SeatLabel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeatLabelError {
    #[error("Seat numbers start at 1")]
    ZeroSeat,

    #[error("Malformed seat label: {0:?}")]
    Malformed(String),
}
