use crate::error::ValidationError;
use crate::repository::{BitmapKey, DateId};
use crate::slot::{SlotInput, SlotVector};
use crate::week::WeekSchedule;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest member or subgroup name accepted.
pub const MAX_NAME_LENGTH: usize = 50;

/// Longest team identifier accepted.
pub const MAX_TEAM_LENGTH: usize = 100;

const SHORT_ID_ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
const SHORT_ID_LENGTH: usize = 22;

fn validate_identifier(
    field: &'static str,
    value: &str,
    max_length: usize,
) -> Result<(), ValidationError> {
    let reason = if value.trim().is_empty() {
        "must not be empty".to_string()
    } else if value.chars().count() > max_length {
        format!("must be at most {} characters", max_length)
    } else if value.contains('/') {
        "must not contain '/'".to_string()
    } else {
        return Ok(());
    };

    Err(ValidationError::InvalidName { field, reason })
}

fn validate_name(field: &'static str, value: &str) -> Result<(), ValidationError> {
    validate_identifier(field, value, MAX_NAME_LENGTH)
}

/// Base57 form of a uuid, 22 characters, most significant digit first.
pub fn short_id(id: Uuid) -> String {
    let base = SHORT_ID_ALPHABET.len() as u128;
    let mut number = id.as_u128();
    let mut digits = Vec::with_capacity(SHORT_ID_LENGTH);

    while number > 0 {
        digits.push(SHORT_ID_ALPHABET[(number % base) as usize]);
        number /= base;
    }
    digits.resize(SHORT_ID_LENGTH, SHORT_ID_ALPHABET[0]);

    digits.iter().rev().map(|&digit| char::from(digit)).collect()
}

/// A fresh team identifier: `T` followed by a short id
///
/// # Examples
/// ```
/// use slotplan_libs::input::generate_team_id;
///
/// let team = generate_team_id();
/// assert_eq!(team.len(), 23);
/// assert!(team.starts_with('T'));
/// ```
pub fn generate_team_id() -> String {
    format!("T{}", short_id(Uuid::new_v4()))
}

/// A member's availability for every date of an event, in chronological order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSubmission {
    pub name: String,
    pub availability: Vec<SlotInput>,
}

impl EventSubmission {
    /// Validates every vector against the number of event dates. Nothing is
    /// returned unless all of them are valid.
    pub fn validate(&self, date_count: usize) -> Result<Vec<SlotVector>, ValidationError> {
        validate_name("name", &self.name)?;

        if self.availability.len() != date_count {
            return Err(ValidationError::DateCountMismatch {
                expected: date_count,
                found: self.availability.len(),
            });
        }

        self.availability
            .iter()
            .enumerate()
            .map(|(position, input)| {
                input
                    .parse()
                    .map_err(|source| ValidationError::InvalidDateSlots { position, source })
            })
            .collect()
    }
}

/// A member's availability for a single date of an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateSubmission {
    pub name: String,
    pub date: DateId,
    pub availability: SlotInput,
}

impl DateSubmission {
    pub fn validate(&self) -> Result<SlotVector, ValidationError> {
        validate_name("name", &self.name)?;

        self.availability
            .parse()
            .map_err(|source| ValidationError::InvalidDateSlots {
                position: 0,
                source,
            })
    }
}

/// A team member's recurring weekly availability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklySubmission {
    pub team: String,
    #[serde(default)]
    pub subgroup: Option<String>,
    pub name: String,
    #[serde(alias = "weekSchedule")]
    pub week_schedule: Vec<String>,
}

impl WeeklySubmission {
    /// Storage key for this member. An empty subgroup means none.
    pub fn key(&self) -> Result<BitmapKey, ValidationError> {
        validate_identifier("team", &self.team, MAX_TEAM_LENGTH)?;
        validate_name("name", &self.name)?;

        let subgroup = self
            .subgroup
            .as_deref()
            .filter(|subgroup| !subgroup.is_empty());
        if let Some(subgroup) = subgroup {
            validate_name("subgroup", subgroup)?;
        }

        Ok(BitmapKey::new(&self.team, subgroup, &self.name))
    }

    pub fn validate(&self) -> Result<(BitmapKey, WeekSchedule), ValidationError> {
        let key = self.key()?;
        let schedule = WeekSchedule::parse(&self.week_schedule)?;
        Ok((key, schedule))
    }
}

/// Every kind of availability submission the core accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Submission {
    Event(EventSubmission),
    Date(DateSubmission),
    Weekly(WeeklySubmission),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SlotError;

    #[test]
    fn event_payload_shapes() {
        let json = format!(
            r#"{{ "kind": "event", "name": "ada", "availability": ["{}", [{}]] }}"#,
            "1".repeat(48),
            vec!["0"; 48].join(",")
        );

        let submission: Submission = serde_json::from_str(&json).unwrap();
        let vectors = match submission {
            Submission::Event(event) => event.validate(2).unwrap(),
            _ => panic!("expected an event submission"),
        };

        assert_eq!(vectors, vec![SlotVector::all(true), SlotVector::all(false)]);
    }

    #[test]
    fn event_date_count_must_match() {
        let submission = EventSubmission {
            name: "ada".to_string(),
            availability: vec![SlotInput::from("1".repeat(48).as_str())],
        };

        assert_eq!(
            submission.validate(2),
            Err(ValidationError::DateCountMismatch {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn reports_invalid_date_position() {
        let submission = EventSubmission {
            name: "ada".to_string(),
            availability: vec![
                SlotInput::from("1".repeat(48).as_str()),
                SlotInput::from(vec![1; 49].as_slice()),
            ],
        };

        assert_eq!(
            submission.validate(2),
            Err(ValidationError::InvalidDateSlots {
                position: 1,
                source: SlotError::InvalidLength {
                    expected: 48,
                    found: 49
                }
            })
        );
    }

    #[test]
    fn names_are_checked() {
        for name in ["", "   ", "a/b"] {
            let submission = DateSubmission {
                name: name.to_string(),
                date: 1,
                availability: SlotInput::from("0".repeat(48).as_str()),
            };
            assert!(matches!(
                submission.validate(),
                Err(ValidationError::InvalidName { field: "name", .. })
            ));
        }

        assert!(validate_name("name", &"x".repeat(50)).is_ok());
        assert!(validate_name("name", &"x".repeat(51)).is_err());
    }

    #[test]
    fn weekly_payload() {
        let json = format!(
            r#"{{ "kind": "weekly", "team": "T8cYHn2rXpqH5Ayf4JW3uHx", "subgroup": "",
                 "name": "ada", "weekSchedule": {} }}"#,
            serde_json::to_string(&vec!["1".repeat(48); 7]).unwrap()
        );

        let submission: Submission = serde_json::from_str(&json).unwrap();
        let (key, week) = match submission {
            Submission::Weekly(weekly) => weekly.validate().unwrap(),
            _ => panic!("expected a weekly submission"),
        };

        assert_eq!(key, BitmapKey::new("T8cYHn2rXpqH5Ayf4JW3uHx", None, "ada"));
        assert_eq!(week, WeekSchedule::all(true));
    }

    #[test]
    fn weekly_team_is_checked() {
        let mut submission = WeeklySubmission {
            team: "teams/design".to_string(),
            subgroup: Some("design".to_string()),
            name: "ada".to_string(),
            week_schedule: vec!["1".repeat(48); 7],
        };

        for team in ["teams/design", "", "T".repeat(101).as_str()] {
            submission.team = team.to_string();
            assert!(matches!(
                submission.validate(),
                Err(ValidationError::InvalidName { field: "team", .. })
            ));
        }

        for team in [
            "T8cYHn2rXpqH5Ayf4JW3uHx",
            "Design Team",
            "67e55044-10b1-426f-9247-bb680e5fe0c8",
        ] {
            submission.team = team.to_string();
            assert_eq!(submission.key().unwrap().team, team);
        }
    }

    #[test]
    fn generated_team_ids() {
        assert_eq!(short_id(Uuid::nil()), "2".repeat(22));
        assert_eq!(
            short_id(Uuid::from_u128(57)),
            format!("{}32", "2".repeat(20))
        );

        let team = generate_team_id();
        assert_eq!(team.chars().count(), 23);
        assert!(team[1..].bytes().all(|b| SHORT_ID_ALPHABET.contains(&b)));
        assert!(validate_identifier("team", &team, MAX_TEAM_LENGTH).is_ok());
        assert_ne!(team, generate_team_id());
    }
}
