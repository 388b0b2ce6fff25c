use chrono::NaiveDate;
use thiserror::Error;

use crate::week::Weekday;

/// Malformed availability vector.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum SlotError {
    #[error("Unsupported length of availability. Expected {expected}, got {found}")]
    InvalidLength { expected: usize, found: usize },
    #[error("Invalid slot value at index {index}: expected 0 or 1, got {value:?}")]
    InvalidSlotValue { index: usize, value: String },
}

/// A stored bitmap blob that does not describe a 7x48 1-bit raster.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum BitmapError {
    #[error("Corrupt schedule bitmap: {reason}")]
    CorruptBitmap { reason: String },
}

impl BitmapError {
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        BitmapError::CorruptBitmap {
            reason: reason.into(),
        }
    }
}

/// Rejected submission payload.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum ValidationError {
    #[error("Invalid availability for date #{position}: {source}")]
    InvalidDateSlots { position: usize, source: SlotError },
    #[error("Invalid availability for {day}: {source}")]
    InvalidWeekdaySlots { day: Weekday, source: SlotError },
    #[error(
        "Length of availability does not match associated dates. Expected {expected}, got {found}"
    )]
    DateCountMismatch { expected: usize, found: usize },
    #[error("Unsupported length of week schedule. Expected {expected}, got {found}")]
    InvalidWeekLength { expected: usize, found: usize },
    #[error("Invalid {field}: {reason}")]
    InvalidName { field: &'static str, reason: String },
}

/// Failure reported by the storage adapter.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum StoreError {
    #[error("Storage backend failure: {message}")]
    Backend { message: String },
    #[error("Storage read timed out for {key}")]
    Timeout { key: String },
    #[error("Event {event} has no associated dates")]
    UnknownEvent { event: u64 },
    #[error("Date {date} does not belong to event {event}")]
    UnknownDate { event: u64, date: u64 },
}

/// Failure while reading and folding stored availability.
#[derive(Error, Debug)]
pub enum AvailabilityError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Bitmap at {key} could not be decoded: {source}")]
    Bitmap { key: String, source: BitmapError },
    #[error("Stored availability of {subject} on {date} is invalid: {source}")]
    CorruptEntry {
        subject: String,
        date: NaiveDate,
        source: SlotError,
    },
    #[error("Availability count overflowed at slot {slot}")]
    CountOverflow { slot: usize },
}
