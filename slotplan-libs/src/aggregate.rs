use crate::error::AvailabilityError;
use crate::repository::{DateId, EventDate, ScheduleEntry};
use crate::slot::{SlotVector, SLOTS_PER_DAY};
use crate::week::{WeekSchedule, Weekday, DAYS_PER_WEEK};
use itertools::Itertools;
use log::{debug, trace, warn};
use num::{CheckedAdd, Integer};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::Display;

/// Per-slot headcount: how many members are free in each half hour of one day.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct AggregateVector<N = u16>([N; SLOTS_PER_DAY])
where
    N: Integer + Copy;

impl<N> Default for AggregateVector<N>
where
    N: Integer + CheckedAdd + Copy + Display,
{
    fn default() -> Self {
        AggregateVector::zero()
    }
}

impl<N> AggregateVector<N>
where
    N: Integer + CheckedAdd + Copy + Display,
{
    pub fn zero() -> AggregateVector<N> {
        AggregateVector([N::zero(); SLOTS_PER_DAY])
    }

    /// Adds one member's availability.
    ///
    /// # Errors
    /// `CountOverflow` when a slot count no longer fits in `N`.
    pub fn add(&mut self, vector: &SlotVector) -> Result<(), AvailabilityError> {
        for (slot, available) in vector.iter().enumerate() {
            if available {
                self.0[slot] = self.0[slot]
                    .checked_add(&N::one())
                    .ok_or(AvailabilityError::CountOverflow { slot })?;
            }
        }
        Ok(())
    }

    pub fn get(&self, slot: usize) -> N {
        self.0[slot]
    }

    pub fn counts(&self) -> &[N] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|count| count.is_zero())
    }

    /// Digit-string form, one decimal number per slot with no delimiter
    ///
    /// Counts of ten or more render as several digits, which makes the
    /// string longer than 48 characters and ambiguous to split. Use
    /// [`AggregateVector::render_delimited`] where that can happen.
    ///
    /// # Examples
    /// ```
    /// use slotplan_libs::aggregate::{AggregateVector, Heatmap};
    /// use slotplan_libs::slot::SlotVector;
    ///
    /// let everyone = vec![SlotVector::all(true); 3];
    /// let heatmap: AggregateVector = everyone.iter().heatmap().unwrap();
    ///
    /// assert_eq!(heatmap.render(), "3".repeat(48));
    /// ```
    pub fn render(&self) -> String {
        let digits = self.0.iter().map(|count| count.to_string()).collect_vec();
        if digits.iter().any(|d| d.len() > 1) {
            warn!("Rendering availability counts above 9, digit string is ambiguous");
        }
        digits.concat()
    }

    pub fn render_delimited(&self, separator: &str) -> String {
        self.0.iter().join(separator)
    }

    /// Slots with the highest non-zero headcount.
    pub fn best_slots(&self) -> Vec<usize> {
        match self.0.iter().max() {
            Some(max) if !max.is_zero() => self.0.iter().positions(|count| count == max).collect(),
            _ => vec![],
        }
    }
}

impl<N> Serialize for AggregateVector<N>
where
    N: Integer + Copy + Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.as_slice().serialize(serializer)
    }
}

pub trait Heatmap<N>
where
    N: Integer + Copy,
{
    fn heatmap(self) -> Result<AggregateVector<N>, AvailabilityError>;
}

impl<'a, T, N> Heatmap<N> for T
where
    T: Iterator<Item = &'a SlotVector>,
    N: Integer + CheckedAdd + Copy + Display,
{
    /// Elementwise sum of availability vectors. An empty iterator
    /// yields the all-zero vector.
    ///
    /// # Examples
    /// ```
    /// use slotplan_libs::aggregate::{AggregateVector, Heatmap};
    /// use slotplan_libs::slot::SlotVector;
    ///
    /// let morning = SlotVector::parse(&format!("{}{}", "1".repeat(24), "0".repeat(24))).unwrap();
    /// let evening = SlotVector::parse(&format!("{}{}", "0".repeat(24), "1".repeat(24))).unwrap();
    ///
    /// let heatmap: AggregateVector<u8> = vec![morning, evening].iter().heatmap().unwrap();
    /// assert_eq!(heatmap.render(), "1".repeat(48));
    ///
    /// let nobody: AggregateVector<u8> = Vec::<SlotVector>::new().iter().heatmap().unwrap();
    /// assert!(nobody.is_zero());
    /// ```
    fn heatmap(self) -> Result<AggregateVector<N>, AvailabilityError> {
        self.enumerate()
            .try_fold(AggregateVector::zero(), |mut acc, (member, vector)| {
                trace!(
                    "Adding member #{} with {} free slots",
                    member,
                    vector.count_available()
                );
                acc.add(vector)?;
                Ok(acc)
            })
    }
}

/// Folds stored entries for one date.
///
/// Fails on the first entry whose stored form is not a valid vector.
pub fn aggregate(entries: &[ScheduleEntry]) -> Result<AggregateVector, AvailabilityError> {
    let vectors = entries
        .iter()
        .map(|entry| {
            entry
                .vector()
                .map_err(|source| AvailabilityError::CorruptEntry {
                    subject: entry.subject.clone(),
                    date: entry.date,
                    source,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    vectors.iter().heatmap()
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct DateAvailability {
    #[serde(rename = "dateId")]
    pub date_id: DateId,
    pub date: chrono::NaiveDate,
    pub slots: AggregateVector,
}

/// Aggregated availability of an event.
///
/// `NoDates` means the event has no dates at all, which is distinct from
/// dates that nobody has filled in (those are all-zero entries of `Dates`).
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum EventAvailability {
    NoDates,
    Dates(Vec<DateAvailability>),
}

impl EventAvailability {
    /// `{ "YYYY-MM-DD": "<digits>" }`, or `None` for an event without dates.
    pub fn render(&self) -> Option<BTreeMap<String, String>> {
        match self {
            EventAvailability::NoDates => None,
            EventAvailability::Dates(dates) => Some(
                dates
                    .iter()
                    .map(|d| (d.date.format("%Y-%m-%d").to_string(), d.slots.render()))
                    .collect(),
            ),
        }
    }

    pub fn dates(&self) -> &[DateAvailability] {
        match self {
            EventAvailability::NoDates => &[],
            EventAvailability::Dates(dates) => dates,
        }
    }
}

/// Builds the per-date heat-map of an event from its dates and stored entries.
///
/// Every date gets a vector, zero when nobody submitted for it.
pub fn aggregate_event(
    dates: &[EventDate],
    entries: &BTreeMap<DateId, Vec<ScheduleEntry>>,
) -> Result<EventAvailability, AvailabilityError> {
    if dates.is_empty() {
        return Ok(EventAvailability::NoDates);
    }

    let result = dates
        .iter()
        .sorted_by_key(|d| (d.date, d.id))
        .map(|d| -> Result<DateAvailability, AvailabilityError> {
            let slots = match entries.get(&d.id) {
                Some(entries) => aggregate(entries)?,
                None => AggregateVector::zero(),
            };
            Ok(DateAvailability {
                date_id: d.id,
                date: d.date,
                slots,
            })
        })
        .collect::<Result<Vec<_>, AvailabilityError>>()?;

    debug!("Aggregated availability over {} dates", result.len());
    Ok(EventAvailability::Dates(result))
}

/// Headcount per weekday and slot across members' weekly schedules.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct WeekAggregate {
    days: Vec<AggregateVector>,
    members: usize,
}

impl Default for WeekAggregate {
    fn default() -> Self {
        WeekAggregate {
            days: vec![AggregateVector::zero(); DAYS_PER_WEEK],
            members: 0,
        }
    }
}

impl WeekAggregate {
    /// Adds one member's week. On overflow the aggregate is left unchanged.
    pub fn add(&mut self, week: &WeekSchedule) -> Result<(), AvailabilityError> {
        let mut days = self.days.clone();
        for (day, vector) in week.days() {
            days[day.index()].add(vector)?;
        }
        self.days = days;
        self.members += 1;
        Ok(())
    }

    /// A member without a stored schedule counts towards nobody's slots.
    pub fn add_absent(&mut self) {
        self.members += 1;
    }

    pub fn day(&self, day: Weekday) -> &AggregateVector {
        &self.days[day.index()]
    }

    pub fn members(&self) -> usize {
        self.members
    }

    pub fn render(&self) -> Vec<String> {
        self.days.iter().map(AggregateVector::render).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SlotError;
    use chrono::NaiveDate;

    #[test]
    fn overflow_is_reported() {
        let vectors = vec![SlotVector::all(false).with(5, true); 256];
        let result: Result<AggregateVector<u8>, _> = vectors.iter().heatmap();

        assert!(matches!(
            result,
            Err(AvailabilityError::CountOverflow { slot: 5 })
        ));
    }

    #[test]
    fn wide_counts() {
        let vectors = vec![SlotVector::all(false).with(0, true); 12];
        let heatmap: AggregateVector = vectors.iter().heatmap().unwrap();

        assert_eq!(heatmap.render().len(), 49);
        assert!(heatmap.render().starts_with("120"));
        assert!(heatmap.render_delimited(",").starts_with("12,0,0"));
        assert_eq!(heatmap.best_slots(), vec![0]);
        assert_eq!(
            AggregateVector::<u16>::zero().best_slots(),
            Vec::<usize>::new()
        );
    }

    #[test]
    fn corrupt_entry_propagates() {
        let date = NaiveDate::from_ymd_opt(2026, 11, 2).unwrap();
        let entries = vec![ScheduleEntry {
            event: 1,
            date_id: 1,
            date,
            subject: "ada".to_string(),
            availability: vec![1; 47],
        }];

        match aggregate(&entries) {
            Err(AvailabilityError::CorruptEntry {
                subject, source, ..
            }) => {
                assert_eq!(subject, "ada");
                assert_eq!(
                    source,
                    SlotError::InvalidLength {
                        expected: 48,
                        found: 47
                    }
                );
            }
            other => panic!("expected a corrupt entry, got {:?}", other),
        }
    }

    #[test]
    fn week_heatmap() {
        let mut weekdays = WeekSchedule::all(true);
        weekdays.set(Weekday::Sat.index(), 20, false);

        let mut heatmap = WeekAggregate::default();
        heatmap.add(&weekdays).unwrap();
        heatmap.add(&WeekSchedule::all(true)).unwrap();
        heatmap.add_absent();

        assert_eq!(heatmap.members(), 3);
        assert_eq!(heatmap.day(Weekday::Mon).render(), "2".repeat(48));
        assert_eq!(heatmap.day(Weekday::Sat).get(20), 1);
        assert_eq!(heatmap.render().len(), 7);
    }

    #[test]
    fn week_overflow_leaves_aggregate_unchanged() {
        let mut heatmap = WeekAggregate::default();
        heatmap.add(&WeekSchedule::all(true)).unwrap();
        heatmap.days[Weekday::Sun.index()].0[3] = u16::MAX;
        let before = heatmap.clone();

        assert!(matches!(
            heatmap.add(&WeekSchedule::all(true)),
            Err(AvailabilityError::CountOverflow { slot: 3 })
        ));
        assert_eq!(heatmap, before);
        assert_eq!(heatmap.members(), 1);
        assert_eq!(heatmap.day(Weekday::Mon).get(3), 1);
    }
}
