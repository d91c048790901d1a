use serde::{Deserialize, Serialize};
use skyfare_core::SeatLabel;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatState {
    Free,
    Occupied,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeatStatus {
    pub seat: SeatLabel,
    pub state: SeatState,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    #[error("No free seat left in the layout")]
    NoSeatAvailable,

    #[error("Seat {0} is already occupied")]
    SeatTaken(SeatLabel),

    #[error("Seat {seat} does not exist on a {total_seats}-seat cabin")]
    OutOfLayout { seat: SeatLabel, total_seats: u32 },
}

/// Assigns seats on a cabin of `total_seats` numbered front to back.
///
/// The allocator is stateless; callers pass the set of seats held by active bookings,
/// read inside the same transaction that will claim the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeatAllocator;

impl SeatAllocator {
    /// Every seat on the cabin, in ascending order.
    pub fn layout(total_seats: u32) -> impl Iterator<Item = SeatLabel> {
        (1..=total_seats).filter_map(|n| SeatLabel::from_number(n).ok())
    }

    pub fn allocate(
        &self,
        total_seats: u32,
        occupied: &BTreeSet<SeatLabel>,
        requested: Option<SeatLabel>,
    ) -> Result<SeatLabel, AllocationError> {
        match requested {
            Some(seat) => {
                if !seat.fits(total_seats) {
                    return Err(AllocationError::OutOfLayout { seat, total_seats });
                }
                if occupied.contains(&seat) {
                    return Err(AllocationError::SeatTaken(seat));
                }
                Ok(seat)
            }
            None => Self::layout(total_seats)
                .find(|seat| !occupied.contains(seat))
                .ok_or(AllocationError::NoSeatAvailable),
        }
    }

    pub fn seat_map(&self, total_seats: u32, occupied: &BTreeSet<SeatLabel>) -> Vec<SeatStatus> {
        Self::layout(total_seats)
            .map(|seat| SeatStatus {
                seat,
                state: if occupied.contains(&seat) {
                    SeatState::Occupied
                } else {
                    SeatState::Free
                },
            })
            .collect()
    }
}
