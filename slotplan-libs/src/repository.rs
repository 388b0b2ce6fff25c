//! Storage seam for per-date entries and weekly bitmaps.
//!
//! The core only talks to storage through [`ScheduleRepository`]. Bitmaps are
//! opaque blobs kept in a [`BlobStore`] that is handed to the repository at
//! construction time.

use crate::config::StoreConfig;
use crate::error::{SlotError, StoreError};
use crate::slot::SlotVector;
use chrono::NaiveDate;
use itertools::Itertools;
use log::{debug, info};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type EventId = u64;
pub type DateId = u64;

/// A calendar date attached to an event.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct EventDate {
    pub id: DateId,
    pub event: EventId,
    pub date: NaiveDate,
}

/// One member's submitted availability for one event date, as stored.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ScheduleEntry {
    pub event: EventId,
    pub date_id: DateId,
    pub date: NaiveDate,
    pub subject: String,
    /// Persisted form, 48 bytes of 0/1.
    pub availability: Vec<u8>,
}

impl ScheduleEntry {
    pub fn vector(&self) -> Result<SlotVector, SlotError> {
        SlotVector::from_bytes(&self.availability)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Upserted {
    Created,
    Replaced,
}

/// Identifies one member's weekly bitmap.
///
/// The team is an opaque identifier, typically a generated `T…` short id or
/// the team's name.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BitmapKey {
    pub team: String,
    pub subgroup: Option<String>,
    pub member: String,
}

impl BitmapKey {
    pub fn new(team: &str, subgroup: Option<&str>, member: &str) -> BitmapKey {
        BitmapKey {
            team: team.to_string(),
            subgroup: subgroup.map(str::to_string),
            member: member.to_string(),
        }
    }

    /// Storage path for this key
    ///
    /// # Examples
    /// ```
    /// use slotplan_libs::config::StoreConfig;
    /// use slotplan_libs::repository::BitmapKey;
    ///
    /// let config = StoreConfig::default();
    ///
    /// assert_eq!(
    ///     BitmapKey::new("T8cYHn2rXpqH5Ayf4JW3uHx", Some("design"), "ada").path(&config),
    ///     "Teams/T8cYHn2rXpqH5Ayf4JW3uHx/design/ada"
    /// );
    /// assert_eq!(
    ///     BitmapKey::new("T8cYHn2rXpqH5Ayf4JW3uHx", None, "ada").path(&config),
    ///     "Teams/T8cYHn2rXpqH5Ayf4JW3uHx/ada"
    /// );
    /// ```
    pub fn path(&self, config: &StoreConfig) -> String {
        match self
            .subgroup
            .as_deref()
            .or(config.default_subgroup.as_deref())
        {
            Some(subgroup) => format!(
                "{}/{}/{}/{}{}",
                config.key_prefix,
                self.team,
                subgroup,
                self.member,
                config.suffix()
            ),
            None => format!(
                "{}/{}/{}{}",
                config.key_prefix,
                self.team,
                self.member,
                config.suffix()
            ),
        }
    }

    /// Inverse of [`BitmapKey::path`]. Paths outside the layout yield `None`.
    pub fn from_path(path: &str, config: &StoreConfig) -> Option<BitmapKey> {
        let rest = path.strip_prefix(&config.key_prefix)?.strip_prefix('/')?;
        let rest = rest.strip_suffix(config.suffix().as_str())?;

        let parts = rest.split('/').collect_vec();
        let (team, subgroup, member) = match parts.as_slice() {
            [team, member] => (team, None, member),
            [team, subgroup, member] => (team, Some(*subgroup), member),
            _ => return None,
        };

        if team.is_empty() || member.is_empty() || subgroup.map_or(false, str::is_empty) {
            return None;
        }

        Some(BitmapKey::new(team, subgroup, member))
    }
}

impl fmt::Display for BitmapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subgroup {
            Some(subgroup) => write!(f, "{}/{}/{}", self.team, subgroup, self.member),
            None => write!(f, "{}/{}", self.team, self.member),
        }
    }
}

fn team_prefix(config: &StoreConfig, team: &str, subgroup: Option<&str>) -> String {
    match subgroup {
        Some(subgroup) => format!("{}/{}/{}/", config.key_prefix, team, subgroup),
        None => format!("{}/{}/", config.key_prefix, team),
    }
}

/// Opaque key/value blob storage, e.g. an object store bucket.
///
/// Implementations own their own I/O deadlines and report them as
/// `StoreError::Timeout`.
pub trait BlobStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn put(&self, key: &str, blob: Vec<u8>) -> Result<(), StoreError>;

    /// Returns whether a blob was removed.
    fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Every key starting with `prefix`, in lexical order.
    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    fn delete_prefix(&self, prefix: &str) -> Result<usize, StoreError> {
        let mut removed = 0;
        for key in self.list(prefix)? {
            if self.delete(&key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.blobs.read().get(key).cloned())
    }

    fn put(&self, key: &str, blob: Vec<u8>) -> Result<(), StoreError> {
        self.blobs.write().insert(key.to_string(), blob);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.blobs.write().remove(key).is_some())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .blobs
            .read()
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }
}

/// Everything the availability core needs from persistence.
pub trait ScheduleRepository: Send + Sync {
    /// Dates of an event, ordered chronologically. Unknown events have none.
    fn event_dates(&self, event: EventId) -> Result<Vec<EventDate>, StoreError>;

    fn entries_for_date(
        &self,
        event: EventId,
        date: DateId,
    ) -> Result<Vec<ScheduleEntry>, StoreError>;

    /// Entries grouped by date. Every date of the event has a key.
    fn entries_for_event(
        &self,
        event: EventId,
    ) -> Result<BTreeMap<DateId, Vec<ScheduleEntry>>, StoreError>;

    /// Creates or fully replaces the entry keyed by (subject, event, date).
    fn upsert_entry(
        &self,
        event: EventId,
        date: DateId,
        subject: &str,
        vector: &SlotVector,
    ) -> Result<Upserted, StoreError>;

    /// Removes every entry of `subject` in the event. Returns how many.
    fn delete_entries(&self, event: EventId, subject: &str) -> Result<usize, StoreError>;

    /// Removes a date together with its entries.
    fn delete_date(&self, event: EventId, date: DateId) -> Result<usize, StoreError>;

    /// Removes every date and entry of an event.
    fn delete_event(&self, event: EventId) -> Result<usize, StoreError>;

    fn read_bitmap(&self, key: &BitmapKey) -> Result<Option<Vec<u8>>, StoreError>;

    fn write_bitmap(&self, key: &BitmapKey, blob: Vec<u8>) -> Result<(), StoreError>;

    /// Deletes one member's bitmap, or every bitmap under the team/subgroup
    /// prefix when `member` is omitted.
    fn delete_bitmap(
        &self,
        team: &str,
        subgroup: Option<&str>,
        member: Option<&str>,
    ) -> Result<usize, StoreError>;

    fn list_bitmaps(
        &self,
        team: &str,
        subgroup: Option<&str>,
    ) -> Result<Vec<BitmapKey>, StoreError>;
}

#[derive(Debug, Default)]
struct Tables {
    next_date_id: DateId,
    dates: BTreeMap<DateId, EventDate>,
    entries: BTreeMap<(EventId, DateId, String), Vec<u8>>,
}

impl Tables {
    fn date_of(&self, event: EventId, date: DateId) -> Result<EventDate, StoreError> {
        self.dates
            .get(&date)
            .filter(|d| d.event == event)
            .copied()
            .ok_or(StoreError::UnknownDate { event, date })
    }

    fn entries_of(&self, date: &EventDate) -> Vec<ScheduleEntry> {
        self.entries
            .range((date.event, date.id, String::new())..)
            .take_while(|((event, date_id, _), _)| *event == date.event && *date_id == date.id)
            .map(|((event, date_id, subject), availability)| ScheduleEntry {
                event: *event,
                date_id: *date_id,
                date: date.date,
                subject: subject.clone(),
                availability: availability.clone(),
            })
            .collect()
    }

    fn remove_date_entries(&mut self, event: EventId, date: DateId) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|(e, d, _), _| !(*e == event && *d == date));
        before - self.entries.len()
    }
}

/// In-process repository: event tables in memory, bitmaps in the given store.
pub struct MemoryScheduleRepository<B: BlobStore> {
    config: StoreConfig,
    blobs: B,
    tables: RwLock<Tables>,
}

impl<B: BlobStore> MemoryScheduleRepository<B> {
    pub fn new(config: StoreConfig, blobs: B) -> Self {
        MemoryScheduleRepository {
            config,
            blobs,
            tables: RwLock::new(Tables::default()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    /// Attaches a calendar date to an event and returns its id.
    pub fn add_event_date(&self, event: EventId, date: NaiveDate) -> DateId {
        let mut tables = self.tables.write();
        tables.next_date_id += 1;
        let id = tables.next_date_id;
        tables.dates.insert(id, EventDate { id, event, date });
        debug!("Added date {} ({}) to event {}", id, date, event);
        id
    }

    /// Stores an already persisted availability row as is, without validation.
    pub fn put_raw_entry(
        &self,
        event: EventId,
        date: DateId,
        subject: &str,
        availability: Vec<u8>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        tables.date_of(event, date)?;
        tables
            .entries
            .insert((event, date, subject.to_string()), availability);
        Ok(())
    }
}

impl<B: BlobStore> ScheduleRepository for MemoryScheduleRepository<B> {
    fn event_dates(&self, event: EventId) -> Result<Vec<EventDate>, StoreError> {
        Ok(self
            .tables
            .read()
            .dates
            .values()
            .filter(|d| d.event == event)
            .copied()
            .sorted_by_key(|d| (d.date, d.id))
            .collect())
    }

    fn entries_for_date(
        &self,
        event: EventId,
        date: DateId,
    ) -> Result<Vec<ScheduleEntry>, StoreError> {
        let tables = self.tables.read();
        let date = tables.date_of(event, date)?;
        Ok(tables.entries_of(&date))
    }

    fn entries_for_event(
        &self,
        event: EventId,
    ) -> Result<BTreeMap<DateId, Vec<ScheduleEntry>>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .dates
            .values()
            .filter(|d| d.event == event)
            .map(|d| (d.id, tables.entries_of(d)))
            .collect())
    }

    fn upsert_entry(
        &self,
        event: EventId,
        date: DateId,
        subject: &str,
        vector: &SlotVector,
    ) -> Result<Upserted, StoreError> {
        let mut tables = self.tables.write();
        tables.date_of(event, date)?;

        let previous = tables
            .entries
            .insert((event, date, subject.to_string()), vector.to_bytes());

        let upserted = match previous {
            Some(_) => Upserted::Replaced,
            None => Upserted::Created,
        };
        info!(
            "{:?} availability of {} for event {} date {}",
            upserted, subject, event, date
        );
        Ok(upserted)
    }

    fn delete_entries(&self, event: EventId, subject: &str) -> Result<usize, StoreError> {
        let mut tables = self.tables.write();
        let before = tables.entries.len();
        tables
            .entries
            .retain(|(e, _, s), _| !(*e == event && s == subject));
        let removed = before - tables.entries.len();
        info!(
            "Removed {} entries of {} from event {}",
            removed, subject, event
        );
        Ok(removed)
    }

    fn delete_date(&self, event: EventId, date: DateId) -> Result<usize, StoreError> {
        let mut tables = self.tables.write();
        tables.date_of(event, date)?;
        tables.dates.remove(&date);
        let removed = tables.remove_date_entries(event, date);
        info!(
            "Removed date {} of event {} with {} entries",
            date, event, removed
        );
        Ok(removed)
    }

    fn delete_event(&self, event: EventId) -> Result<usize, StoreError> {
        let mut tables = self.tables.write();
        let dates = tables
            .dates
            .values()
            .filter(|d| d.event == event)
            .map(|d| d.id)
            .collect_vec();

        let mut removed = 0;
        for date in dates {
            tables.dates.remove(&date);
            removed += tables.remove_date_entries(event, date);
        }
        info!("Removed event {} with {} entries", event, removed);
        Ok(removed)
    }

    fn read_bitmap(&self, key: &BitmapKey) -> Result<Option<Vec<u8>>, StoreError> {
        self.blobs.get(&key.path(&self.config))
    }

    fn write_bitmap(&self, key: &BitmapKey, blob: Vec<u8>) -> Result<(), StoreError> {
        let path = key.path(&self.config);
        info!("Writing {} byte bitmap to {}", blob.len(), path);
        self.blobs.put(&path, blob)
    }

    fn delete_bitmap(
        &self,
        team: &str,
        subgroup: Option<&str>,
        member: Option<&str>,
    ) -> Result<usize, StoreError> {
        let removed = match member {
            Some(member) => {
                let path = BitmapKey::new(team, subgroup, member).path(&self.config);
                usize::from(self.blobs.delete(&path)?)
            }
            None => self
                .blobs
                .delete_prefix(&team_prefix(&self.config, team, subgroup))?,
        };
        info!(
            "Deleted {} bitmaps of team {} (subgroup {:?}, member {:?})",
            removed, team, subgroup, member
        );
        Ok(removed)
    }

    fn list_bitmaps(
        &self,
        team: &str,
        subgroup: Option<&str>,
    ) -> Result<Vec<BitmapKey>, StoreError> {
        Ok(self
            .blobs
            .list(&team_prefix(&self.config, team, subgroup))?
            .iter()
            .filter_map(|path| BitmapKey::from_path(path, &self.config))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 11, day).unwrap()
    }

    #[test]
    fn upsert_replaces_whole_entry() {
        let repo = MemoryScheduleRepository::new(StoreConfig::default(), MemoryBlobStore::new());
        let day = repo.add_event_date(1, date(2));

        let first = SlotVector::all(true);
        let second = SlotVector::all(false).with(10, true);

        assert_eq!(
            repo.upsert_entry(1, day, "ada", &first),
            Ok(Upserted::Created)
        );
        assert_eq!(
            repo.upsert_entry(1, day, "ada", &second),
            Ok(Upserted::Replaced)
        );

        let entries = repo.entries_for_date(1, day).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].vector(), Ok(second));
    }

    #[test]
    fn entries_are_scoped_to_their_event() {
        let repo = MemoryScheduleRepository::new(StoreConfig::default(), MemoryBlobStore::new());
        let mine = repo.add_event_date(1, date(2));
        let theirs = repo.add_event_date(2, date(2));

        assert_eq!(
            repo.upsert_entry(1, theirs, "ada", &SlotVector::all(true)),
            Err(StoreError::UnknownDate {
                event: 1,
                date: theirs
            })
        );

        repo.upsert_entry(2, theirs, "ada", &SlotVector::all(true))
            .unwrap();
        assert!(repo.entries_for_date(1, mine).unwrap().is_empty());
        assert_eq!(repo.entries_for_event(1).unwrap().len(), 1);
    }

    #[test]
    fn dates_are_chronological() {
        let repo = MemoryScheduleRepository::new(StoreConfig::default(), MemoryBlobStore::new());
        let late = repo.add_event_date(7, date(20));
        let early = repo.add_event_date(7, date(3));

        let ids = repo
            .event_dates(7)
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect_vec();
        assert_eq!(ids, vec![early, late]);
        assert!(repo.event_dates(8).unwrap().is_empty());
    }

    #[test]
    fn deleting_a_date_cascades() {
        let repo = MemoryScheduleRepository::new(StoreConfig::default(), MemoryBlobStore::new());
        let first = repo.add_event_date(1, date(2));
        let second = repo.add_event_date(1, date(3));
        for name in ["ada", "grace"] {
            repo.upsert_entry(1, first, name, &SlotVector::all(true))
                .unwrap();
            repo.upsert_entry(1, second, name, &SlotVector::all(true))
                .unwrap();
        }

        assert_eq!(repo.delete_date(1, first), Ok(2));
        assert_eq!(repo.event_dates(1).unwrap().len(), 1);
        assert_eq!(repo.delete_entries(1, "ada"), Ok(1));
        assert_eq!(repo.delete_event(1), Ok(1));
        assert!(repo.event_dates(1).unwrap().is_empty());
    }

    #[test]
    fn bitmap_paths_round_trip() {
        let config = StoreConfig {
            extension: Some("xbm".to_string()),
            ..StoreConfig::default()
        };

        for key in [
            BitmapKey::new("T8cYHn2rXpqH5Ayf4JW3uHx", Some("design"), "ada"),
            BitmapKey::new("T8cYHn2rXpqH5Ayf4JW3uHx", None, "grace"),
            BitmapKey::new("Design Team", Some("ops"), "linus"),
        ] {
            let path = key.path(&config);
            assert!(path.ends_with(".xbm"));
            assert_eq!(BitmapKey::from_path(&path, &config), Some(key));
        }

        for path in [
            "Teams/ada.xbm",
            "Teams/team/design/ops/ada.xbm",
            "Teams/team//ada.xbm",
            "Teams/team/ada",
            "Other/team/ada.xbm",
        ] {
            assert_eq!(BitmapKey::from_path(path, &config), None, "{}", path);
        }
    }

    #[test]
    fn delete_by_prefix() {
        let repo = MemoryScheduleRepository::new(StoreConfig::default(), MemoryBlobStore::new());
        let team = "T8cYHn2rXpqH5Ayf4JW3uHx";

        for key in [
            BitmapKey::new(team, Some("design"), "ada"),
            BitmapKey::new(team, Some("design"), "grace"),
            BitmapKey::new(team, Some("ops"), "linus"),
            BitmapKey::new(team, None, "design"),
            BitmapKey::new("T8cYHn2rXpqH5Ayf4JW3uH", Some("design"), "ada"),
        ] {
            repo.write_bitmap(&key, b"blob".to_vec()).unwrap();
        }

        assert_eq!(repo.list_bitmaps(team, None).unwrap().len(), 4);
        assert_eq!(repo.delete_bitmap(team, Some("design"), None), Ok(2));
        assert_eq!(
            repo.list_bitmaps(team, None).unwrap(),
            vec![
                BitmapKey::new(team, None, "design"),
                BitmapKey::new(team, Some("ops"), "linus"),
            ]
        );
        assert_eq!(repo.delete_bitmap(team, None, Some("design")), Ok(1));
        assert_eq!(repo.delete_bitmap(team, None, None), Ok(1));
        assert_eq!(repo.blobs().len(), 1);
    }
}
