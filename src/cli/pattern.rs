//! Resolve a user pattern to exactly one tracked hook.
//!
//! Matching is by substring. An exact identity always wins. The resolver never
//! guesses: no match or several matches are errors.

use crate::error::{Error, Result};

/// Most suggestions offered for a pattern that matched nothing.
const MAX_SUGGESTIONS: usize = 3;

/// Resolve `pattern` against tracked identities.
///
/// # Errors
///
/// Returns [`Error::NoMatch`] with suggestions when nothing matches and
/// [`Error::AmbiguousPattern`] when more than one identity does.
pub fn resolve<'a, I>(pattern: &str, identities: I) -> Result<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let identities: Vec<&String> = identities.into_iter().collect();

    if let Some(exact) = identities.iter().find(|id| id.as_str() == pattern) {
        return Ok((*exact).clone());
    }

    let mut matches: Vec<String> = identities
        .iter()
        .filter(|id| id.contains(pattern))
        .map(|id| (*id).clone())
        .collect();

    match matches.len() {
        0 => Err(Error::NoMatch {
            pattern: pattern.to_string(),
            suggestions: suggest(pattern, &identities),
        }),
        1 => Ok(matches.remove(0)),
        _ => {
            matches.sort();
            Err(Error::AmbiguousPattern {
                pattern: pattern.to_string(),
                candidates: matches,
            })
        }
    }
}

/// Closest identities by shared words, then edit distance.
fn suggest(pattern: &str, identities: &[&String]) -> Vec<String> {
    let words: Vec<&str> = pattern.split_whitespace().collect();
    let budget = pattern.chars().count().max(3);

    let mut scored: Vec<(usize, usize, &String)> = identities
        .iter()
        .map(|id| {
            let shared = id
                .split_whitespace()
                .filter(|w| words.iter().any(|p| w.contains(p) || p.contains(w)))
                .count();
            let distance = best_window_distance(pattern, id);
            (shared, distance, *id)
        })
        .filter(|(shared, distance, _)| *shared > 0 || *distance <= budget / 2)
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(b.2)));
    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, _, id)| id.clone())
        .collect()
}

/// Smallest edit distance between `pattern` and any same-length window of
/// `text`, so a typo inside a long command still scores well.
fn best_window_distance(pattern: &str, text: &str) -> usize {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    if t.len() <= p.len() {
        return levenshtein(&p, &t);
    }
    (0..=t.len() - p.len())
        .map(|start| levenshtein(&p, &t[start..start + p.len()]))
        .min()
        .unwrap_or(usize::MAX)
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn unique_substring_resolves() {
        let tracked = ids(&["npm run lint", "cargo test --workspace"]);
        assert_eq!(resolve("cargo", &tracked).unwrap(), "cargo test --workspace");
    }

    #[test]
    fn exact_match_beats_substring() {
        let tracked = ids(&["make", "make lint", "make test"]);
        assert_eq!(resolve("make", &tracked).unwrap(), "make");
    }

    #[test]
    fn matching_is_case_sensitive() {
        let tracked = ids(&["Make Lint"]);
        assert!(matches!(
            resolve("make", &tracked),
            Err(Error::NoMatch { .. })
        ));
    }

    #[test]
    fn multiple_matches_are_ambiguous() {
        let tracked = ids(&["npm run lint", "cargo clippy", "eslint ."]);
        let Err(Error::AmbiguousPattern { candidates, .. }) = resolve("lint", &tracked) else {
            panic!("expected ambiguity");
        };
        assert_eq!(candidates, ids(&["eslint .", "npm run lint"]));
    }

    #[test]
    fn no_match_suggests_similar() {
        let tracked = ids(&["npm run lint", "cargo test", "./scripts/format.sh"]);
        let Err(Error::NoMatch { suggestions, .. }) = resolve("npm run lnt", &tracked) else {
            panic!("expected no match");
        };
        assert_eq!(suggestions.first().map(String::as_str), Some("npm run lint"));
        assert!(!suggestions.contains(&"./scripts/format.sh".to_string()));
    }

    #[test]
    fn no_match_with_nothing_similar() {
        let tracked = ids(&["cargo test"]);
        let Err(Error::NoMatch { suggestions, .. }) = resolve("zzzzzzzz", &tracked) else {
            panic!("expected no match");
        };
        assert!(suggestions.is_empty());
    }

    #[test]
    fn levenshtein_basics() {
        let c = |s: &str| s.chars().collect::<Vec<_>>();
        assert_eq!(levenshtein(&c("kitten"), &c("sitting")), 3);
        assert_eq!(levenshtein(&c(""), &c("abc")), 3);
        assert_eq!(levenshtein(&c("lint"), &c("lint")), 0);
    }
}
