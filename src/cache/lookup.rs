//! Case-insensitive prefix lookup over cached keys
//!
//! Resolves a partial key such as `"aq"` to the full key it abbreviates, or
//! reports that the prefix is ambiguous or matches nothing.

/// Outcome of resolving a partial key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    /// No key starts with the prefix
    NoMatch,
    /// Exactly one key starts with the prefix
    Unique {
        /// The full key as stored
        key: String,
        /// Its value
        value: String,
    },
    /// Several keys start with the prefix, sorted
    Ambiguous(Vec<String>),
}

/// Finds every key whose lowercase form starts with the lowercased `partial`
///
/// An empty `partial` matches every key. Callers that want to reject empty
/// queries must do so before getting here.
pub fn lookup<'a, I>(entries: I, partial: &str) -> MatchResult
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let needle = partial.to_lowercase();

    let mut matches: Vec<(&String, &String)> = entries
        .into_iter()
        .filter(|(key, _)| key.to_lowercase().starts_with(&needle))
        .collect();

    match matches.len() {
        0 => MatchResult::NoMatch,
        1 => {
            let (key, value) = matches.remove(0);
            MatchResult::Unique {
                key: key.clone(),
                value: value.clone(),
            }
        }
        _ => {
            let mut keys: Vec<String> = matches.into_iter().map(|(k, _)| k.clone()).collect();
            keys.sort();
            MatchResult::Ambiguous(keys)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn signs() -> HashMap<String, String> {
        HashMap::from([
            ("Aries".to_string(), "Rams abound.".to_string()),
            ("Aquarius".to_string(), "Water everywhere.".to_string()),
        ])
    }

    #[test]
    fn test_unique_prefix() {
        let entries = signs();
        assert_eq!(
            lookup(&entries, "ar"),
            MatchResult::Unique {
                key: "Aries".to_string(),
                value: "Rams abound.".to_string(),
            }
        );
    }

    #[test]
    fn test_ambiguous_prefix_lists_all_candidates() {
        let entries = signs();
        assert_eq!(
            lookup(&entries, "a"),
            MatchResult::Ambiguous(vec!["Aquarius".to_string(), "Aries".to_string()])
        );
    }

    #[test]
    fn test_no_match() {
        let entries = signs();
        assert_eq!(lookup(&entries, "z"), MatchResult::NoMatch);
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let entries = signs();
        assert!(matches!(
            lookup(&entries, "ARI"),
            MatchResult::Unique { ref key, .. } if key == "Aries"
        ));
    }

    #[test]
    fn test_stored_case_is_preserved() {
        let entries = HashMap::from([("SCORPIO".to_string(), "Sting.".to_string())]);
        assert!(matches!(
            lookup(&entries, "scor"),
            MatchResult::Unique { ref key, .. } if key == "SCORPIO"
        ));
    }

    #[test]
    fn test_empty_prefix_matches_everything() {
        let entries = signs();
        assert_eq!(
            lookup(&entries, ""),
            MatchResult::Ambiguous(vec!["Aquarius".to_string(), "Aries".to_string()])
        );
    }

    #[test]
    fn test_full_key_match_is_unique() {
        let entries = signs();
        assert!(matches!(
            lookup(&entries, "aquarius"),
            MatchResult::Unique { ref key, .. } if key == "Aquarius"
        ));
    }

    #[test]
    fn test_prefix_longer_than_key_does_not_match() {
        let entries = signs();
        assert_eq!(lookup(&entries, "ariesx"), MatchResult::NoMatch);
    }

    #[test]
    fn test_empty_store() {
        let entries: HashMap<String, String> = HashMap::new();
        assert_eq!(lookup(&entries, "ar"), MatchResult::NoMatch);
    }
}
