use crate::error::ValidationError;
use crate::slot::SlotVector;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DAYS_PER_WEEK: usize = 7;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    pub const ALL: [Weekday; DAYS_PER_WEEK] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    /// Monday is 0, Sunday is 6.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Weekday> {
        Weekday::ALL.get(index).copied()
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        Weekday::ALL[day.num_days_from_monday() as usize]
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Weekday::Mon => "MON",
            Weekday::Tue => "TUE",
            Weekday::Wed => "WED",
            Weekday::Thu => "THU",
            Weekday::Fri => "FRI",
            Weekday::Sat => "SAT",
            Weekday::Sun => "SUN",
        };
        f.write_str(name)
    }
}

/// A recurring weekly availability, one [`SlotVector`] per weekday starting on Monday.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct WeekSchedule([SlotVector; DAYS_PER_WEEK]);

impl WeekSchedule {
    pub fn new(days: [SlotVector; DAYS_PER_WEEK]) -> WeekSchedule {
        WeekSchedule(days)
    }

    pub fn all(available: bool) -> WeekSchedule {
        WeekSchedule([SlotVector::all(available); DAYS_PER_WEEK])
    }

    /// Parses seven `"0"`/`"1"` strings, Monday first
    ///
    /// # Examples
    /// ```
    /// use slotplan_libs::week::{WeekSchedule, Weekday};
    ///
    /// let mut days = vec!["0".repeat(48); 7];
    /// days[4] = "1".repeat(48);
    ///
    /// let week = WeekSchedule::parse(&days).unwrap();
    /// assert_eq!(week.day(Weekday::Fri).count_available(), 48);
    /// assert_eq!(week.day(Weekday::Mon).count_available(), 0);
    /// ```
    pub fn parse<S: AsRef<str>>(days: &[S]) -> Result<WeekSchedule, ValidationError> {
        if days.len() != DAYS_PER_WEEK {
            return Err(ValidationError::InvalidWeekLength {
                expected: DAYS_PER_WEEK,
                found: days.len(),
            });
        }

        let mut week = [SlotVector::default(); DAYS_PER_WEEK];
        for (day, input) in Weekday::ALL.into_iter().zip(days) {
            week[day.index()] = SlotVector::parse(input.as_ref())
                .map_err(|source| ValidationError::InvalidWeekdaySlots { day, source })?;
        }

        Ok(WeekSchedule(week))
    }

    pub fn day(&self, day: Weekday) -> &SlotVector {
        &self.0[day.index()]
    }

    pub fn days(&self) -> impl Iterator<Item = (Weekday, &SlotVector)> + '_ {
        Weekday::ALL.into_iter().zip(self.0.iter())
    }

    /// Value at pixel `(weekday, slot)`.
    pub fn get(&self, day: usize, slot: usize) -> bool {
        self.0[day].get(slot)
    }

    pub fn set(&mut self, day: usize, slot: usize, available: bool) {
        self.0[day] = self.0[day].with(slot, available);
    }

    /// The outbound shape: seven arrays of 48 integers.
    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.0.iter().map(SlotVector::to_vec).collect_vec()
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(SlotVector::to_representation).collect_vec()
    }
}

impl From<[SlotVector; DAYS_PER_WEEK]> for WeekSchedule {
    fn from(days: [SlotVector; DAYS_PER_WEEK]) -> Self {
        WeekSchedule(days)
    }
}

#[cfg(feature = "arbitrary")]
impl<'a> arbitrary::Arbitrary<'a> for WeekSchedule {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(WeekSchedule(u.arbitrary::<[SlotVector; DAYS_PER_WEEK]>()?))
    }
}
