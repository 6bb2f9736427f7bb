use std::collections::HashMap;
use std::str::FromStr;

use anyhow::bail;

use crate::models::{Experience, JobStatus, Posting, Preferences, StatusEntry, WorkMode};
use crate::score::{match_score, salary_value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    /// Most recent first (ascending days-since-posted).
    #[default]
    Latest,
    Oldest,
    MatchScore,
    Salary,
}

impl FromStr for SortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "latest" => Ok(SortKey::Latest),
            "oldest" => Ok(SortKey::Oldest),
            "match" | "match-score" | "matchscore" => Ok(SortKey::MatchScore),
            "salary" => Ok(SortKey::Salary),
            other => bail!("Unknown sort key: '{}' (expected latest, oldest, match-score, or salary)", other),
        }
    }
}

/// Filter specification: a conjunction of independently optional criteria.
/// `None` means the criterion is skipped.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    pub keyword: Option<String>,
    pub location: Option<String>,
    pub mode: Option<WorkMode>,
    pub experience: Option<Experience>,
    pub source: Option<String>,
    pub status: Option<JobStatus>,
    pub sort: SortKey,
    /// Keep only postings at or above the preference threshold. Only has an
    /// effect when preferences exist.
    pub threshold: bool,
}

/// Run the catalog through the filter conjunction and sort, returning a fresh
/// ordered view of (posting, score). Postings score 0 when no preferences
/// have been saved. All sorts are stable, so ties keep catalog order.
pub fn apply<'a>(
    postings: &'a [Posting],
    prefs: Option<&Preferences>,
    ledger: &HashMap<String, StatusEntry>,
    filters: &Filters,
) -> Vec<(&'a Posting, u8)> {
    let mut result: Vec<(&Posting, u8)> = postings
        .iter()
        .map(|p| (p, prefs.map(|prefs| match_score(p, prefs)).unwrap_or(0)))
        .collect();

    if filters.threshold {
        if let Some(prefs) = prefs {
            result.retain(|(_, score)| *score >= prefs.min_match_score);
        }
    }

    if let Some(keyword) = &filters.keyword {
        let keyword = keyword.trim().to_lowercase();
        if !keyword.is_empty() {
            result.retain(|(p, _)| {
                p.title.to_lowercase().contains(&keyword)
                    || p.company.to_lowercase().contains(&keyword)
            });
        }
    }

    if let Some(location) = &filters.location {
        result.retain(|(p, _)| p.location == *location);
    }
    if let Some(mode) = filters.mode {
        result.retain(|(p, _)| p.mode == mode);
    }
    if let Some(experience) = filters.experience {
        result.retain(|(p, _)| p.experience == experience);
    }
    if let Some(source) = &filters.source {
        result.retain(|(p, _)| p.source == *source);
    }
    if let Some(status) = filters.status {
        result.retain(|(p, _)| {
            ledger.get(&p.id).map(|e| e.status).unwrap_or_default() == status
        });
    }

    match filters.sort {
        SortKey::Latest => result.sort_by_key(|(p, _)| p.posted_days_ago),
        SortKey::Oldest => result.sort_by(|a, b| b.0.posted_days_ago.cmp(&a.0.posted_days_ago)),
        SortKey::MatchScore => result.sort_by(|a, b| b.1.cmp(&a.1)),
        SortKey::Salary => result.sort_by(|a, b| {
            salary_value(&b.0.salary_range).cmp(&salary_value(&a.0.salary_range))
        }),
    }

    result
}
