use crate::error::SlotError;
use chrono::{NaiveTime, Timelike};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// There are 48 half-hour increments within a day.
pub const SLOTS_PER_DAY: usize = 48;

/// Minutes covered by a single slot.
pub const SLOT_MINUTES: u32 = 30;

/// One day of availability for one person, at half-hour resolution.
///
/// Index 0 covers 00:00-00:30 and index 47 covers 23:30-24:00.
/// A `SlotVector` can only be built through the validating constructors,
/// so its length is always exactly [`SLOTS_PER_DAY`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SlotVector([bool; SLOTS_PER_DAY]);

fn check_length(found: usize) -> Result<(), SlotError> {
    if found != SLOTS_PER_DAY {
        return Err(SlotError::InvalidLength {
            expected: SLOTS_PER_DAY,
            found,
        });
    }
    Ok(())
}

impl Default for SlotVector {
    fn default() -> Self {
        SlotVector::all(false)
    }
}

impl SlotVector {
    /// A vector with every slot set to `available`.
    pub fn all(available: bool) -> SlotVector {
        SlotVector([available; SLOTS_PER_DAY])
    }

    /// Parses the 48 character `"0"`/`"1"` string form
    ///
    /// # Examples
    /// ```
    /// use slotplan_libs::slot::SlotVector;
    /// use slotplan_libs::error::SlotError;
    ///
    /// let morning = format!("{}{}", "1".repeat(24), "0".repeat(24));
    /// let slots = SlotVector::parse(&morning).unwrap();
    /// assert!(slots.get(0));
    /// assert!(!slots.get(47));
    ///
    /// assert_eq!(
    ///     SlotVector::parse(&"1".repeat(47)),
    ///     Err(SlotError::InvalidLength { expected: 48, found: 47 })
    /// );
    /// ```
    pub fn parse(input: &str) -> Result<SlotVector, SlotError> {
        check_length(input.chars().count())?;

        let mut slots = [false; SLOTS_PER_DAY];
        for (index, c) in input.chars().enumerate() {
            slots[index] = match c {
                '0' => false,
                '1' => true,
                other => {
                    return Err(SlotError::InvalidSlotValue {
                        index,
                        value: other.to_string(),
                    })
                }
            };
        }

        Ok(SlotVector(slots))
    }

    /// Builds a vector from 48 integers, each 0 or 1.
    pub fn from_slots(input: &[u8]) -> Result<SlotVector, SlotError> {
        check_length(input.len())?;

        let mut slots = [false; SLOTS_PER_DAY];
        for (index, &value) in input.iter().enumerate() {
            slots[index] = match value {
                0 => false,
                1 => true,
                other => {
                    return Err(SlotError::InvalidSlotValue {
                        index,
                        value: other.to_string(),
                    })
                }
            };
        }

        Ok(SlotVector(slots))
    }

    /// Reads the persisted form: 48 bytes, one per slot, each 0 or 1.
    pub fn from_bytes(blob: &[u8]) -> Result<SlotVector, SlotError> {
        SlotVector::from_slots(blob)
    }

    /// Builds a vector from submitted elements, integers and characters mixed freely.
    pub fn from_values(input: &[SlotValue]) -> Result<SlotVector, SlotError> {
        check_length(input.len())?;

        let mut slots = [false; SLOTS_PER_DAY];
        for (index, value) in input.iter().enumerate() {
            slots[index] = value
                .available()
                .ok_or_else(|| SlotError::InvalidSlotValue {
                    index,
                    value: value.to_string(),
                })?;
        }

        Ok(SlotVector(slots))
    }

    /// Copy of this vector with a single slot changed.
    pub fn with(mut self, index: usize, available: bool) -> SlotVector {
        self.0[index] = available;
        self
    }

    pub fn get(&self, index: usize) -> bool {
        self.0[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.0.iter().copied()
    }

    pub fn count_available(&self) -> usize {
        self.0.iter().filter(|&&available| available).count()
    }

    /// Canonical external form, one decimal digit per slot.
    ///
    /// ```
    /// use slotplan_libs::slot::SlotVector;
    ///
    /// let s = "01".repeat(24);
    /// assert_eq!(SlotVector::parse(&s).unwrap().to_representation(), s);
    /// ```
    pub fn to_representation(&self) -> String {
        self.0.iter().map(|&b| if b { '1' } else { '0' }).collect()
    }

    /// The 48-byte persisted form.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.iter().map(|&b| u8::from(b)).collect_vec()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.to_bytes()
    }
}

impl fmt::Display for SlotVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_representation())
    }
}

impl FromStr for SlotVector {
    type Err = SlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SlotVector::parse(s)
    }
}

impl Serialize for SlotVector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_representation())
    }
}

impl<'de> Deserialize<'de> for SlotVector {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        SlotInput::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "arbitrary")]
impl<'a> arbitrary::Arbitrary<'a> for SlotVector {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(SlotVector(u.arbitrary::<[bool; SLOTS_PER_DAY]>()?))
    }
}

/// One element of a submitted array: a 0/1 integer or a `"0"`/`"1"` character.
///
/// Any integer or string is accepted here so that out-of-range elements are
/// reported as [`SlotError::InvalidSlotValue`] with their position.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotValue {
    Int(i64),
    Char(String),
}

impl SlotValue {
    fn available(&self) -> Option<bool> {
        match self {
            SlotValue::Int(0) => Some(false),
            SlotValue::Int(1) => Some(true),
            SlotValue::Char(c) if c == "0" => Some(false),
            SlotValue::Char(c) if c == "1" => Some(true),
            _ => None,
        }
    }
}

impl fmt::Display for SlotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotValue::Int(value) => write!(f, "{}", value),
            SlotValue::Char(value) => f.write_str(value),
        }
    }
}

/// A submitted day of availability, before validation.
///
/// Clients send either a `"0"`/`"1"` string or an array whose elements are
/// 0/1 integers or `"0"`/`"1"` characters.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotInput {
    Text(String),
    Values(Vec<SlotValue>),
}

impl SlotInput {
    pub fn parse(&self) -> Result<SlotVector, SlotError> {
        match self {
            SlotInput::Text(text) => SlotVector::parse(text),
            SlotInput::Values(values) => SlotVector::from_values(values),
        }
    }
}

impl From<&str> for SlotInput {
    fn from(text: &str) -> Self {
        SlotInput::Text(text.to_string())
    }
}

impl From<&[u8]> for SlotInput {
    fn from(digits: &[u8]) -> Self {
        SlotInput::Values(
            digits
                .iter()
                .map(|&digit| SlotValue::Int(i64::from(digit)))
                .collect(),
        )
    }
}

/// Start time of the slot at `index`.
///
/// Returns `None` when `index` is outside the day.
pub fn slot_start(index: usize) -> Option<NaiveTime> {
    if index >= SLOTS_PER_DAY {
        return None;
    }
    let minutes = index as u32 * SLOT_MINUTES;
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}

/// Index of the slot containing `time`, rounding down to the half hour.
pub fn slot_index(time: NaiveTime) -> usize {
    ((time.hour() * 60 + time.minute()) / SLOT_MINUTES) as usize
}
