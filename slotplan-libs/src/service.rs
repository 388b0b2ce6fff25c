//! Submission and query flows over a [`ScheduleRepository`].
//!
//! Every function validates its input completely before touching storage, so
//! a submission rejected by validation writes nothing. Storage failures part
//! way through a multi-date submission are returned as is and may leave the
//! earlier dates written.

use crate::aggregate::{
    aggregate, aggregate_event, AggregateVector, EventAvailability, WeekAggregate,
};
use crate::bitmap;
use crate::error::{AvailabilityError, StoreError};
use crate::input::{DateSubmission, EventSubmission, WeeklySubmission};
use crate::repository::{BitmapKey, DateId, EventId, ScheduleRepository, Upserted};
use crate::week::WeekSchedule;
use log::{debug, info};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use serde::Serialize;

/// Stores a member's availability for every date of an event.
///
/// # Errors
/// `StoreError::UnknownEvent` when the event has no dates to submit to, and
/// `ValidationError::DateCountMismatch` when the number of vectors differs
/// from the number of dates.
pub fn submit_event_availability<R>(
    repo: &R,
    event: EventId,
    submission: &EventSubmission,
) -> Result<Vec<Upserted>, AvailabilityError>
where
    R: ScheduleRepository + ?Sized,
{
    let dates = repo.event_dates(event)?;
    if dates.is_empty() {
        return Err(StoreError::UnknownEvent { event }.into());
    }

    let vectors = submission.validate(dates.len())?;

    let upserted = dates
        .iter()
        .zip(vectors.iter())
        .map(|(date, vector)| repo.upsert_entry(event, date.id, &submission.name, vector))
        .collect::<Result<Vec<_>, StoreError>>()?;

    info!(
        "Stored availability of {} for {} dates of event {}",
        submission.name,
        upserted.len(),
        event
    );
    Ok(upserted)
}

/// Stores a member's availability for one date of an event.
pub fn submit_date_availability<R>(
    repo: &R,
    event: EventId,
    submission: &DateSubmission,
) -> Result<Upserted, AvailabilityError>
where
    R: ScheduleRepository + ?Sized,
{
    let vector = submission.validate()?;
    Ok(repo.upsert_entry(event, submission.date, &submission.name, &vector)?)
}

/// Current heat-map of an event, one vector per date
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use slotplan_libs::aggregate::EventAvailability;
/// use slotplan_libs::config::StoreConfig;
/// use slotplan_libs::repository::{MemoryBlobStore, MemoryScheduleRepository};
/// use slotplan_libs::service::event_availability;
///
/// let repo = MemoryScheduleRepository::new(StoreConfig::default(), MemoryBlobStore::new());
/// assert_eq!(event_availability(&repo, 1).unwrap(), EventAvailability::NoDates);
///
/// repo.add_event_date(1, NaiveDate::from_ymd_opt(2026, 11, 2).unwrap());
/// let rendered = event_availability(&repo, 1).unwrap().render().unwrap();
/// assert_eq!(rendered["2026-11-02"], "0".repeat(48));
/// ```
pub fn event_availability<R>(
    repo: &R,
    event: EventId,
) -> Result<EventAvailability, AvailabilityError>
where
    R: ScheduleRepository + ?Sized,
{
    let dates = repo.event_dates(event)?;
    if dates.is_empty() {
        debug!("Event {} has no dates", event);
        return Ok(EventAvailability::NoDates);
    }

    let entries = repo.entries_for_event(event)?;
    aggregate_event(&dates, &entries)
}

pub fn date_availability<R>(
    repo: &R,
    event: EventId,
    date: DateId,
) -> Result<AggregateVector, AvailabilityError>
where
    R: ScheduleRepository + ?Sized,
{
    aggregate(&repo.entries_for_date(event, date)?)
}

pub fn delete_member_entries<R>(
    repo: &R,
    event: EventId,
    name: &str,
) -> Result<usize, AvailabilityError>
where
    R: ScheduleRepository + ?Sized,
{
    Ok(repo.delete_entries(event, name)?)
}

/// A decoded weekly schedule, in the shape returned to clients.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct MemberWeekSchedule {
    pub name: String,
    pub subgroup: Option<String>,
    pub week_schedule: Vec<Vec<u8>>,
}

impl MemberWeekSchedule {
    fn new(key: &BitmapKey, week: &WeekSchedule) -> Self {
        MemberWeekSchedule {
            name: key.member.clone(),
            subgroup: key.subgroup.clone(),
            week_schedule: week.to_rows(),
        }
    }
}

/// Validates, encodes and stores a weekly schedule, replacing any previous one.
pub fn submit_week_schedule<R>(
    repo: &R,
    submission: &WeeklySubmission,
) -> Result<BitmapKey, AvailabilityError>
where
    R: ScheduleRepository + ?Sized,
{
    let (key, week) = submission.validate()?;
    repo.write_bitmap(&key, bitmap::encode(&week))?;
    Ok(key)
}

/// Resets a member to fully available.
pub fn reset_week_schedule<R>(repo: &R, key: &BitmapKey) -> Result<(), AvailabilityError>
where
    R: ScheduleRepository + ?Sized,
{
    repo.write_bitmap(key, bitmap::encode(&WeekSchedule::all(true)))?;
    Ok(())
}

/// Reads one member's week. `None` when nothing was stored; a blob that does
/// not decode is an error.
pub fn read_week<R>(repo: &R, key: &BitmapKey) -> Result<Option<WeekSchedule>, AvailabilityError>
where
    R: ScheduleRepository + ?Sized,
{
    match repo.read_bitmap(key)? {
        None => Ok(None),
        Some(blob) => bitmap::decode(&blob)
            .map(Some)
            .map_err(|source| AvailabilityError::Bitmap {
                key: key.to_string(),
                source,
            }),
    }
}

pub fn member_week_schedule<R>(
    repo: &R,
    key: &BitmapKey,
) -> Result<Option<MemberWeekSchedule>, AvailabilityError>
where
    R: ScheduleRepository + ?Sized,
{
    Ok(read_week(repo, key)?.map(|week| MemberWeekSchedule::new(key, &week)))
}

/// Reads every key, one storage read per member, and waits for all of them.
/// Any failed read fails the whole batch.
fn read_weeks<R>(
    repo: &R,
    keys: &[BitmapKey],
) -> Result<Vec<Option<WeekSchedule>>, AvailabilityError>
where
    R: ScheduleRepository + ?Sized,
{
    #[cfg(feature = "rayon")]
    let weeks = keys.par_iter().map(|key| read_week(repo, key)).collect();

    #[cfg(not(feature = "rayon"))]
    let weeks = keys.iter().map(|key| read_week(repo, key)).collect();

    weeks
}

/// Every stored week of a team, or of one of its subgroups.
pub fn week_schedules<R>(
    repo: &R,
    team: &str,
    subgroup: Option<&str>,
) -> Result<Vec<MemberWeekSchedule>, AvailabilityError>
where
    R: ScheduleRepository + ?Sized,
{
    let keys = repo.list_bitmaps(team, subgroup)?;
    let weeks = read_weeks(repo, &keys)?;

    Ok(keys
        .iter()
        .zip(weeks)
        .filter_map(|(key, week)| week.map(|week| MemberWeekSchedule::new(key, &week)))
        .collect())
}

/// Weekly headcount over the given members. Members without a stored
/// schedule count as unavailable everywhere.
pub fn team_heatmap<R>(
    repo: &R,
    members: &[BitmapKey],
) -> Result<WeekAggregate, AvailabilityError>
where
    R: ScheduleRepository + ?Sized,
{
    let mut heatmap = WeekAggregate::default();
    for week in read_weeks(repo, members)? {
        match week {
            Some(week) => heatmap.add(&week)?,
            None => heatmap.add_absent(),
        }
    }
    debug!("Aggregated {} weekly schedules", heatmap.members());
    Ok(heatmap)
}

/// Weekly headcount over every stored member of a team or subgroup.
pub fn subgroup_heatmap<R>(
    repo: &R,
    team: &str,
    subgroup: Option<&str>,
) -> Result<WeekAggregate, AvailabilityError>
where
    R: ScheduleRepository + ?Sized,
{
    team_heatmap(repo, &repo.list_bitmaps(team, subgroup)?)
}

pub fn delete_member_schedule<R>(repo: &R, key: &BitmapKey) -> Result<usize, AvailabilityError>
where
    R: ScheduleRepository + ?Sized,
{
    Ok(repo.delete_bitmap(&key.team, key.subgroup.as_deref(), Some(&key.member))?)
}

pub fn delete_subgroup_schedules<R>(
    repo: &R,
    team: &str,
    subgroup: &str,
) -> Result<usize, AvailabilityError>
where
    R: ScheduleRepository + ?Sized,
{
    Ok(repo.delete_bitmap(team, Some(subgroup), None)?)
}

pub fn delete_team_schedules<R>(repo: &R, team: &str) -> Result<usize, AvailabilityError>
where
    R: ScheduleRepository + ?Sized,
{
    Ok(repo.delete_bitmap(team, None, None)?)
}
