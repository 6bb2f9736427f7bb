use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One job listing from the static catalog. Never mutated after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Posting {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub mode: WorkMode,
    pub experience: Experience,
    pub salary_range: String, // free text, leading integer used for sorting
    pub skills: Vec<String>,
    pub description: String,
    pub source: String, // "LinkedIn", "Naukri", "Indeed", ...
    pub posted_days_ago: u32,
    pub apply_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkMode {
    Remote,
    Hybrid,
    Onsite,
}

impl fmt::Display for WorkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkMode::Remote => "Remote",
            WorkMode::Hybrid => "Hybrid",
            WorkMode::Onsite => "Onsite",
        };
        f.pad(s)
    }
}

impl FromStr for WorkMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "remote" => Ok(WorkMode::Remote),
            "hybrid" => Ok(WorkMode::Hybrid),
            "onsite" => Ok(WorkMode::Onsite),
            other => bail!("Unknown work mode: '{}' (expected remote, hybrid, or onsite)", other),
        }
    }
}

/// Experience bracket, in years except for freshers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Experience {
    Fresher,
    #[serde(rename = "0-1")]
    ZeroToOne,
    #[serde(rename = "1-3")]
    OneToThree,
    #[serde(rename = "3-5")]
    ThreeToFive,
}

impl fmt::Display for Experience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Experience::Fresher => "Fresher",
            Experience::ZeroToOne => "0-1",
            Experience::OneToThree => "1-3",
            Experience::ThreeToFive => "3-5",
        };
        f.pad(s)
    }
}

impl FromStr for Experience {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fresher" => Ok(Experience::Fresher),
            "0-1" => Ok(Experience::ZeroToOne),
            "1-3" => Ok(Experience::OneToThree),
            "3-5" => Ok(Experience::ThreeToFive),
            other => bail!("Unknown experience bracket: '{}' (expected fresher, 0-1, 1-3, or 3-5)", other),
        }
    }
}

/// Application status for a posting. Anything absent from the ledger is
/// `NotApplied`; that default is never written back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    #[default]
    #[serde(rename = "Not Applied")]
    NotApplied,
    Applied,
    Rejected,
    Selected,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::NotApplied => "Not Applied",
            JobStatus::Applied => "Applied",
            JobStatus::Rejected => "Rejected",
            JobStatus::Selected => "Selected",
        };
        f.pad(s)
    }
}

impl FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', " ").as_str() {
            "not applied" => Ok(JobStatus::NotApplied),
            "applied" => Ok(JobStatus::Applied),
            "rejected" => Ok(JobStatus::Rejected),
            "selected" => Ok(JobStatus::Selected),
            other => bail!(
                "Unknown status: '{}' (expected not-applied, applied, rejected, or selected)",
                other
            ),
        }
    }
}

/// One ledger entry: current status plus when it last changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    pub status: JobStatus,
    pub updated_at: DateTime<Utc>,
}

/// The user's matching criteria. Saved wholesale; a record saved with all
/// defaults is still a saved record, distinct from never having saved one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub role_keywords: String, // comma-separated
    pub preferred_locations: Vec<String>,
    pub preferred_mode: Vec<WorkMode>,
    #[serde(default)]
    pub experience_level: Option<Experience>,
    pub skills: String, // comma-separated
    pub min_match_score: u8,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            role_keywords: String::new(),
            preferred_locations: Vec::new(),
            preferred_mode: Vec::new(),
            experience_level: None,
            skills: String::new(),
            min_match_score: 40,
        }
    }
}

/// One day's digest as persisted: posting ids with the score they carried at
/// generation time. Immutable once written for its date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDigest {
    pub date: String, // YYYY-MM-DD, local calendar
    pub entries: Vec<DigestEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestEntry {
    pub job_id: String,
    pub match_score: u8,
}

/// True iff the string parses as an absolute http or https URL.
pub fn valid_http_url(s: &str) -> bool {
    match url::Url::parse(s.trim()) {
        Ok(u) => matches!(u.scheme(), "http" | "https"),
        Err(_) => false,
    }
}
