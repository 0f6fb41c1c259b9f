//! Campus entities: hostels, canteens and the people who use them.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use super::id::{CanteenId, HostelId};

/// Gender as recorded on a student profile.
///
/// Drives hostel visibility and canteen eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// All genders in form display order.
    pub const ALL: [Self; 3] = [Self::Male, Self::Female, Self::Other];

    /// Wire/form value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown gender value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown gender: {0}")]
pub struct UnknownGender(pub String);

impl FromStr for Gender {
    type Err = UnknownGender;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            _ => Err(UnknownGender(s.to_owned())),
        }
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Owner,
}

impl Role {
    /// Wire value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Owner => "owner",
        }
    }
}

/// A hostel row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hostel {
    pub id: HostelId,
    pub name: String,
    /// Girls' hostel; closed to male students.
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_girls: bool,
}

impl Hostel {
    /// Whether a student of `gender` may pick this hostel.
    #[must_use]
    pub fn admits(&self, gender: Option<Gender>) -> bool {
        !(self.is_girls && gender == Some(Gender::Male))
    }
}

/// Hostels shown in the registration dropdown for a given gender.
///
/// Male students don't see girls' hostels; everyone else (including an
/// unselected gender) sees the full list.
#[must_use]
pub fn hostels_visible_to(hostels: &[Hostel], gender: Option<Gender>) -> Vec<&Hostel> {
    hostels.iter().filter(|h| h.admits(gender)).collect()
}

/// A canteen row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canteen {
    pub id: CanteenId,
    pub name: String,
    #[serde(default)]
    pub based_hostel_id: Option<HostelId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hostels_allowed: Vec<HostelId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_girls: bool,
}

impl Canteen {
    /// Whether residents of `hostel` may order here.
    ///
    /// An empty allow-list means the canteen serves the whole campus.
    #[must_use]
    pub fn serves(&self, hostel: &HostelId) -> bool {
        self.hostels_allowed.is_empty() || self.hostels_allowed.contains(hostel)
    }

    /// Case-insensitive substring match on the canteen name.
    #[must_use]
    pub fn name_matches(&self, query: &str) -> bool {
        let query = query.trim();
        query.is_empty() || self.name.to_lowercase().contains(&query.to_lowercase())
    }
}

/// Treat an explicit JSON `null` column like a missing one.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn hostel(id: &str, is_girls: bool) -> Hostel {
        Hostel {
            id: HostelId::new(id),
            name: id.to_uppercase(),
            is_girls,
        }
    }

    #[test]
    fn test_gender_parse() {
        assert_eq!("Male".parse::<Gender>().unwrap(), Gender::Male);
        assert_eq!(" female ".parse::<Gender>().unwrap(), Gender::Female);
        assert!("".parse::<Gender>().is_err());
    }

    #[test]
    fn test_gender_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Gender::Other).unwrap(), "\"other\"");
        let role: Role = serde_json::from_str("\"owner\"").unwrap();
        assert_eq!(role, Role::Owner);
    }

    #[test]
    fn test_hostels_visible_to_male_hides_girls_hostels() {
        let hostels = vec![hostel("h1", false), hostel("g1", true), hostel("h3", false)];
        let visible: Vec<_> = hostels_visible_to(&hostels, Some(Gender::Male))
            .into_iter()
            .map(|h| h.id.as_str())
            .collect();
        assert_eq!(visible, ["h1", "h3"]);
    }

    #[test]
    fn test_hostels_visible_to_others_sees_all() {
        let hostels = vec![hostel("h1", false), hostel("g1", true)];
        assert_eq!(hostels_visible_to(&hostels, Some(Gender::Female)).len(), 2);
        assert_eq!(hostels_visible_to(&hostels, Some(Gender::Other)).len(), 2);
        assert_eq!(hostels_visible_to(&hostels, None).len(), 2);
    }

    #[test]
    fn test_canteen_serves_and_matches() {
        let canteen = Canteen {
            id: CanteenId::new("c1"),
            name: "Hall 3 Night Canteen".to_string(),
            based_hostel_id: Some(HostelId::new("h3")),
            hostels_allowed: vec![HostelId::new("h3"), HostelId::new("h4")],
            is_girls: false,
        };
        assert!(canteen.serves(&HostelId::new("h4")));
        assert!(!canteen.serves(&HostelId::new("h1")));
        assert!(canteen.name_matches("night"));
        assert!(canteen.name_matches(""));
        assert!(!canteen.name_matches("maggi"));
    }

    #[test]
    fn test_canteen_deserializes_sparse_row() {
        let canteen: Canteen = serde_json::from_str(
            r#"{"id":"c9","name":"Central Mess","hostels_allowed":null}"#,
        )
        .unwrap();
        assert!(canteen.hostels_allowed.is_empty());
        assert!(canteen.serves(&HostelId::new("anything")));
    }
}
