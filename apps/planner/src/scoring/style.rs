//! Bullet style checks — the four booleans behind a bullet's style quality.

use crate::models::content::StyleFlags;

/// Action verbs that count as a strong opener.
const STRONG_VERBS: &[&str] = &[
    "architected",
    "automated",
    "built",
    "delivered",
    "designed",
    "developed",
    "drove",
    "engineered",
    "implemented",
    "improved",
    "launched",
    "led",
    "migrated",
    "optimized",
    "owned",
    "reduced",
    "scaled",
    "shipped",
    "streamlined",
];

/// Weak filler phrases that are always taboo, independent of the company
/// profile's banned list.
const WEAK_PHRASES: &[&str] = &[
    "responsible for",
    "worked on",
    "helped with",
    "participated in",
];

/// True when the bullet opens with a strong action verb.
pub fn has_strong_verb(text: &str) -> bool {
    text.split_whitespace()
        .next()
        .map(|first| {
            let first = first
                .trim_matches(|c: char| !c.is_alphabetic())
                .to_lowercase();
            STRONG_VERBS.contains(&first.as_str())
        })
        .unwrap_or(false)
}

/// True when the bullet carries a quantified outcome (digits, %, $).
pub fn has_quantified_impact(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit() || c == '%' || c == '$')
}

/// True when the bullet contains a weak phrase or a company-banned phrase.
pub fn contains_taboo(text: &str, banned_phrases: &[String]) -> bool {
    let lower = text.to_lowercase();
    WEAK_PHRASES.iter().any(|p| lower.contains(p))
        || banned_phrases
            .iter()
            .any(|p| !p.is_empty() && lower.contains(&p.to_lowercase()))
}

/// Runs all four style checks against a bullet text.
pub fn compute_style_flags(
    text: &str,
    target_max_chars: usize,
    banned_phrases: &[String],
) -> StyleFlags {
    StyleFlags {
        strong_verb: has_strong_verb(text),
        quantified_impact: has_quantified_impact(text),
        taboo_free: !contains_taboo(text, banned_phrases),
        within_length: text.chars().count() <= target_max_chars,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strong_verb_detected_case_insensitive() {
        assert!(has_strong_verb("Reduced p99 latency by 40%"));
        assert!(has_strong_verb("shipped the new billing pipeline"));
        assert!(!has_strong_verb("Was responsible for deployments"));
        assert!(!has_strong_verb(""));
    }

    #[test]
    fn test_quantified_impact_detected() {
        assert!(has_quantified_impact("Cut costs by 30%"));
        assert!(has_quantified_impact("Saved $2M annually"));
        assert!(!has_quantified_impact("Improved team velocity"));
    }

    #[test]
    fn test_weak_phrases_are_taboo() {
        assert!(contains_taboo("Responsible for the CI pipeline", &[]));
        assert!(!contains_taboo("Owned the CI pipeline", &[]));
    }

    #[test]
    fn test_company_banned_phrase_is_taboo() {
        let banned = vec!["rockstar".to_string()];
        assert!(contains_taboo("Rockstar engineer on the team", &banned));
        assert!(!contains_taboo("Senior engineer on the team", &banned));
    }

    #[test]
    fn test_compute_style_flags_all_pass() {
        let flags = compute_style_flags("Reduced build times by 60%", 180, &[]);
        assert!(flags.strong_verb);
        assert!(flags.quantified_impact);
        assert!(flags.taboo_free);
        assert!(flags.within_length);
        assert_eq!(flags.quality(), 1.0);
    }

    #[test]
    fn test_compute_style_flags_over_length() {
        let long = "Reduced x by 1% ".repeat(20);
        let flags = compute_style_flags(&long, 100, &[]);
        assert!(!flags.within_length);
    }
}
