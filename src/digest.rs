use anyhow::Result;
use chrono::{Local, NaiveDate};
use tracing::debug;

use crate::catalog::Catalog;
use crate::db::Store;
use crate::models::{DigestEntry, Experience, Posting, Preferences, StoredDigest};
use crate::score::match_score;

/// A digest holds at most this many entries.
pub const MAX_ENTRIES: usize = 10;

/// Calendar-day key for the local date, `YYYY-MM-DD`.
pub fn today_key() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Return the digest for `day_key`, computing and committing it if this is
/// the first generation for that day.
///
/// A day already committed is returned unchanged, even if preferences have
/// changed since. The day key is an explicit parameter; this function never
/// reads the clock.
pub fn generate(
    store: &Store,
    day_key: &str,
    catalog: &Catalog,
    prefs: &Preferences,
) -> Result<StoredDigest> {
    if let Some(existing) = store.load_digest(day_key)? {
        debug!(date = day_key, "digest already committed for this day");
        return Ok(existing);
    }

    let mut scored: Vec<(&Posting, u8)> = catalog
        .postings()
        .iter()
        .map(|p| (p, match_score(p, prefs)))
        .collect();
    // Highest score first, fresher posting first on ties; the stable sort
    // keeps catalog order as the last resort.
    scored.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then(a.0.posted_days_ago.cmp(&b.0.posted_days_ago))
    });
    scored.truncate(MAX_ENTRIES);

    let digest = StoredDigest {
        date: day_key.to_string(),
        entries: scored
            .into_iter()
            .map(|(p, score)| DigestEntry {
                job_id: p.id.clone(),
                match_score: score,
            })
            .collect(),
    };
    store.save_digest(&digest)?;
    Ok(digest)
}

/// Resolve snapshot entries back to catalog postings. Ids that no longer
/// resolve are dropped from the view; the stored snapshot is not rewritten.
pub fn hydrate<'a>(digest: &StoredDigest, catalog: &'a Catalog) -> Vec<(&'a Posting, u8)> {
    digest
        .entries
        .iter()
        .filter_map(|entry| catalog.get(&entry.job_id).map(|p| (p, entry.match_score)))
        .collect()
}

fn display_date(day_key: &str) -> String {
    match NaiveDate::parse_from_str(day_key, "%Y-%m-%d") {
        Ok(date) => date.format("%A, %-d %B %Y").to_string(),
        Err(_) => day_key.to_string(),
    }
}

fn experience_label(experience: Experience) -> String {
    match experience {
        Experience::Fresher => "Fresher".to_string(),
        other => format!("{} yrs", other),
    }
}

/// The shareable plain-text rendering of a digest.
pub fn to_plain_text(digest: &StoredDigest, catalog: &Catalog) -> String {
    let entries = hydrate(digest, catalog);
    let mut lines = vec![
        format!("Top {} Jobs For You — 9AM Digest", entries.len()),
        display_date(&digest.date),
        String::new(),
    ];
    for (i, (posting, score)) in entries.iter().enumerate() {
        lines.push(format!("{}. {} at {}", i + 1, posting.title, posting.company));
        lines.push(format!(
            "   {} · {} · Match: {}%",
            posting.location,
            experience_label(posting.experience),
            score
        ));
        lines.push(format!("   Apply: {}", posting.apply_url));
    }
    lines.push(String::new());
    lines.push("This digest was generated based on your preferences.".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkMode;

    fn posting(id: &str, title: &str, days: u32) -> Posting {
        Posting {
            id: id.to_string(),
            title: title.to_string(),
            company: "Acme".to_string(),
            location: "Chennai".to_string(),
            mode: WorkMode::Onsite,
            experience: Experience::Fresher,
            salary_range: "5-7 LPA".to_string(),
            skills: vec![],
            description: String::new(),
            source: "Naukri".to_string(),
            posted_days_ago: days,
            apply_url: format!("https://example.com/{}", id),
        }
    }

    fn keyword_prefs(keyword: &str) -> Preferences {
        Preferences {
            role_keywords: keyword.to_string(),
            ..Preferences::default()
        }
    }

    /// 15 postings: j0..j7 match the "alpha" keyword (j0..j2 also fresh),
    /// j8..j14 score zero.
    fn wide_catalog() -> Catalog {
        let postings = (0..15)
            .map(|i| {
                let title = if i < 8 {
                    format!("Alpha Role {}", i)
                } else {
                    format!("Beta Role {}", i)
                };
                posting(&format!("j{}", i), &title, i)
            })
            .collect();
        Catalog::new(postings)
    }

    #[test]
    fn takes_top_ten_by_score_then_freshness() {
        let store = Store::in_memory().unwrap();
        let catalog = wide_catalog();
        let digest = generate(&store, "2024-01-10", &catalog, &keyword_prefs("alpha")).unwrap();

        assert_eq!(digest.entries.len(), MAX_ENTRIES);
        let ids: Vec<&str> = digest.entries.iter().map(|e| e.job_id.as_str()).collect();
        assert_eq!(ids, vec!["j0", "j1", "j2", "j3", "j4", "j5", "j6", "j7", "j8", "j9"]);
        let scores: Vec<u8> = digest.entries.iter().map(|e| e.match_score).collect();
        assert_eq!(scores, vec![30, 30, 30, 25, 25, 25, 25, 25, 0, 0]);

        for pair in digest.entries.windows(2) {
            assert!(pair[0].match_score >= pair[1].match_score);
        }
    }

    #[test]
    fn generation_is_idempotent_per_day() {
        let store = Store::in_memory().unwrap();
        let catalog = wide_catalog();

        let first = generate(&store, "2024-01-10", &catalog, &keyword_prefs("alpha")).unwrap();
        // Different preferences, same day: the committed snapshot wins.
        let second = generate(&store, "2024-01-10", &catalog, &keyword_prefs("beta")).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.load_digest("2024-01-10").unwrap().unwrap(), first);
    }

    #[test]
    fn each_day_gets_an_independent_snapshot() {
        let store = Store::in_memory().unwrap();
        let catalog = wide_catalog();

        let day_one = generate(&store, "2024-01-10", &catalog, &keyword_prefs("alpha")).unwrap();
        let day_two = generate(&store, "2024-01-11", &catalog, &keyword_prefs("beta")).unwrap();
        assert_ne!(day_one.entries, day_two.entries);

        // Neither overwrote the other.
        assert_eq!(store.load_digest("2024-01-10").unwrap().unwrap(), day_one);
        assert_eq!(store.load_digest("2024-01-11").unwrap().unwrap(), day_two);
    }

    #[test]
    fn hydration_drops_unresolvable_ids_without_rewriting() {
        let store = Store::in_memory().unwrap();
        let full = wide_catalog();
        let digest = generate(&store, "2024-01-10", &full, &keyword_prefs("alpha")).unwrap();

        // Rehydrate against a catalog that no longer contains j0.
        let shrunk = Catalog::new(
            full.postings()
                .iter()
                .filter(|p| p.id != "j0")
                .cloned()
                .collect(),
        );
        let view = hydrate(&digest, &shrunk);
        assert_eq!(view.len(), MAX_ENTRIES - 1);
        assert!(view.iter().all(|(p, _)| p.id != "j0"));

        // The stored snapshot still lists all ten.
        let stored = store.load_digest("2024-01-10").unwrap().unwrap();
        assert_eq!(stored.entries.len(), MAX_ENTRIES);
    }

    #[test]
    fn plain_text_lists_every_entry_with_apply_links() {
        let store = Store::in_memory().unwrap();
        let catalog = wide_catalog();
        let digest = generate(&store, "2024-01-10", &catalog, &keyword_prefs("alpha")).unwrap();

        let text = to_plain_text(&digest, &catalog);
        assert!(text.starts_with("Top 10 Jobs For You"));
        assert!(text.contains("Wednesday, 10 January 2024"));
        assert!(text.contains("1. Alpha Role 0 at Acme"));
        assert!(text.contains("Match: 30%"));
        assert!(text.contains("Apply: https://example.com/j0"));
        assert!(text.ends_with("This digest was generated based on your preferences."));
    }

    #[test]
    fn today_key_is_a_calendar_date() {
        let key = today_key();
        assert!(NaiveDate::parse_from_str(&key, "%Y-%m-%d").is_ok());
    }
}
