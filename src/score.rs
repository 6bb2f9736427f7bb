use std::sync::OnceLock;

use regex::Regex;

use crate::models::{Posting, Preferences};

/// Split comma-separated preference text into trimmed, lower-cased terms.
/// Empty segments are dropped so blank input never matches anything.
fn split_csv(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Score a posting against the user's preferences: an additive point system,
/// each rule contributing at most once, capped at 100.
///
/// Pure and total: malformed preference text degrades to "no contribution".
pub fn match_score(posting: &Posting, prefs: &Preferences) -> u8 {
    let mut score: u32 = 0;

    let keywords = split_csv(&prefs.role_keywords);
    let user_skills = split_csv(&prefs.skills);
    let title = posting.title.to_lowercase();
    let description = posting.description.to_lowercase();

    // +25 if any role keyword appears in the title
    if !keywords.is_empty() && keywords.iter().any(|kw| title.contains(kw.as_str())) {
        score += 25;
    }

    // +15 if any role keyword appears in the description
    if !keywords.is_empty() && keywords.iter().any(|kw| description.contains(kw.as_str())) {
        score += 15;
    }

    // +15 if the location is one of the preferred locations
    if !prefs.preferred_locations.is_empty()
        && prefs.preferred_locations.iter().any(|l| *l == posting.location)
    {
        score += 15;
    }

    // +10 if the work mode is one of the preferred modes
    if !prefs.preferred_mode.is_empty() && prefs.preferred_mode.contains(&posting.mode) {
        score += 10;
    }

    // +10 if the experience bracket matches exactly
    if prefs.experience_level.is_some_and(|exp| exp == posting.experience) {
        score += 10;
    }

    // +15 if any user skill matches a posting skill tag
    if !user_skills.is_empty()
        && posting
            .skills
            .iter()
            .any(|tag| user_skills.contains(&tag.to_lowercase()))
    {
        score += 15;
    }

    // +5 if posted within the last two days
    if posting.posted_days_ago <= 2 {
        score += 5;
    }

    // +5 if sourced from LinkedIn
    if posting.source == "LinkedIn" {
        score += 5;
    }

    score.min(100) as u8
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid regex"))
}

/// First integer embedded in the salary text, used for the salary sort.
/// Text with no digits sorts as 0.
pub fn salary_value(range: &str) -> u64 {
    number_re()
        .find(range)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Experience, WorkMode};

    fn frontend_posting() -> Posting {
        Posting {
            id: "j1".to_string(),
            title: "Frontend Engineer".to_string(),
            company: "Acme".to_string(),
            location: "Bangalore".to_string(),
            mode: WorkMode::Remote,
            experience: Experience::OneToThree,
            salary_range: "12-18 LPA".to_string(),
            skills: vec!["React".to_string()],
            description: "Ship UI features with a modern stack.".to_string(),
            source: "LinkedIn".to_string(),
            posted_days_ago: 1,
            apply_url: "https://example.com/j1".to_string(),
        }
    }

    fn matching_prefs() -> Preferences {
        Preferences {
            role_keywords: "frontend".to_string(),
            preferred_locations: vec!["Bangalore".to_string()],
            preferred_mode: vec![WorkMode::Remote],
            experience_level: Some(Experience::OneToThree),
            skills: "react".to_string(),
            min_match_score: 40,
        }
    }

    #[test]
    fn full_match_scenario_scores_eighty_five() {
        // 25 title + 15 location + 10 mode + 10 experience + 15 skill
        // + 5 fresh + 5 LinkedIn; "frontend" is not in the description.
        assert_eq!(match_score(&frontend_posting(), &matching_prefs()), 85);
    }

    #[test]
    fn blank_preferences_leave_only_posting_side_points() {
        let prefs = Preferences {
            min_match_score: 0,
            ..Preferences::default()
        };
        // Fresh (+5) and LinkedIn (+5) still apply.
        assert_eq!(match_score(&frontend_posting(), &prefs), 10);
    }

    #[test]
    fn empty_keyword_text_never_awards_keyword_points() {
        let mut prefs = matching_prefs();
        prefs.role_keywords = "  ,   , ".to_string();
        // Loses the 25 title points only.
        assert_eq!(match_score(&frontend_posting(), &prefs), 60);
    }

    #[test]
    fn description_keyword_adds_fifteen() {
        let mut posting = frontend_posting();
        posting.description = "We need a frontend specialist.".to_string();
        assert_eq!(match_score(&posting, &matching_prefs()), 100);
    }

    #[test]
    fn score_caps_at_one_hundred() {
        let mut posting = frontend_posting();
        posting.description = "frontend work across the board".to_string();
        let score = match_score(&posting, &matching_prefs());
        assert_eq!(score, 100);
    }

    #[test]
    fn score_stays_in_range_across_inputs() {
        let postings = [
            frontend_posting(),
            Posting {
                skills: vec![],
                description: String::new(),
                posted_days_ago: 30,
                source: "Naukri".to_string(),
                ..frontend_posting()
            },
        ];
        let prefs_variants = [
            Preferences::default(),
            matching_prefs(),
            Preferences {
                role_keywords: "e".to_string(),
                skills: "react,java,python".to_string(),
                ..matching_prefs()
            },
        ];
        for p in &postings {
            for prefs in &prefs_variants {
                let s = match_score(p, prefs);
                assert!(s <= 100, "score {} out of range", s);
            }
        }
    }

    #[test]
    fn scoring_is_pure() {
        let posting = frontend_posting();
        let prefs = matching_prefs();
        assert_eq!(match_score(&posting, &prefs), match_score(&posting, &prefs));
    }

    #[test]
    fn skill_match_is_case_insensitive() {
        let mut prefs = matching_prefs();
        prefs.skills = "REACT".to_string();
        assert_eq!(match_score(&frontend_posting(), &prefs), 85);
    }

    #[test]
    fn location_match_is_case_sensitive() {
        let mut prefs = matching_prefs();
        prefs.preferred_locations = vec!["bangalore".to_string()];
        // Loses the 15 location points.
        assert_eq!(match_score(&frontend_posting(), &prefs), 70);
    }

    #[test]
    fn salary_value_takes_first_number() {
        assert_eq!(salary_value("12-18 LPA"), 12);
        assert_eq!(salary_value("Up to 25 LPA"), 25);
        assert_eq!(salary_value("Competitive"), 0);
        assert_eq!(salary_value(""), 0);
    }
}
