//! Seed profile records from a CSV export of the profile source.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use super::domain::{IdentityKind, ProfileRecord, UserId};
use crate::marketplace::reputation::ReputationSnapshot;

#[derive(Debug, thiserror::Error)]
pub enum ProfileImportError {
    #[error("failed to read profile export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid profile CSV data: {0}")]
    Csv(#[from] csv::Error),
}

pub fn profiles_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<ProfileRecord>, ProfileImportError> {
    let file = std::fs::File::open(path)?;
    profiles_from_reader(file)
}

/// Header: `user_id,display_name,kind,skills,bio,hourly_rate,location,average_rating,total_ratings,completed_jobs`.
/// Skills are `;`-separated. Everything after `kind` may be blank.
pub fn profiles_from_reader<R: Read>(reader: R) -> Result<Vec<ProfileRecord>, ProfileImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for row in csv_reader.deserialize::<ProfileRow>() {
        records.push(row?.into_record());
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    user_id: String,
    display_name: String,
    kind: IdentityKind,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    skills: Option<String>,
    #[serde(default)]
    bio: String,
    #[serde(default)]
    hourly_rate: Option<f64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    location: Option<String>,
    #[serde(default)]
    average_rating: Option<f64>,
    #[serde(default)]
    total_ratings: Option<u32>,
    #[serde(default)]
    completed_jobs: Option<u32>,
}

impl ProfileRow {
    fn into_record(self) -> ProfileRecord {
        let skills = self
            .skills
            .as_deref()
            .map(|raw| {
                raw.split(';')
                    .map(str::trim)
                    .filter(|skill| !skill.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let reputation = match (self.average_rating, self.total_ratings, self.completed_jobs) {
            (None, None, None) => None,
            (average_rating, total_ratings, completed_jobs) => Some(ReputationSnapshot {
                average_rating: average_rating.unwrap_or_default(),
                completed_jobs: completed_jobs.unwrap_or_default(),
                total_ratings: total_ratings.unwrap_or_default(),
            }),
        };

        ProfileRecord {
            user_id: UserId(self.user_id),
            display_name: self.display_name,
            kind: self.kind,
            skills,
            bio: self.bio,
            hourly_rate: self.hourly_rate,
            location: self.location,
            reputation,
        }
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
