//! Pattern-property refinement and final selection for similarity matching.
//!
//! Phase 1 (preliminary Jaccard scoring over required paths and variants)
//! runs inside the metadata store; see
//! [`crate::store::SchemaStore::find_candidates_by_path_overlap`]. This
//! module is phase 2: each surviving candidate's pattern properties are
//! matched against the input paths and its score recomputed, then the best
//! candidate above the confidence threshold wins.

use std::collections::HashSet;

use regex::Regex;
use serde_json::Value;

use crate::model::{MatchKind, MatchResult};
use crate::schema::PatternProperty;

/// Damping factor applied to the unmatched share of the input paths.
pub const UNMATCHED_INPUT_DAMPING: f64 = 0.6;
/// Candidates below this preliminary score are discarded in phase 1.
pub const PRELIMINARY_THRESHOLD: f64 = 0.2;
/// At most this many candidates survive phase 1.
pub const CANDIDATE_LIMIT: usize = 5;
/// Refined candidates below this score are rejected.
pub const FINAL_THRESHOLD: f64 = 0.3;

/// A stored schema as returned by the phase-1 overlap query, ordered by
/// preliminary score descending (ties by registration order).
#[derive(Debug, Clone)]
pub struct SchemaCandidate {
    pub id: i64,
    pub name: String,
    pub version: String,
    pub content: Value,
    pub preliminary_score: f64,
    pub matched_count: usize,
    pub required_path_count: usize,
    pub pattern_properties: Vec<PatternProperty>,
}

/// An input path split at its first dot into the head property and the
/// remainder. `subpath` is `None` for top-level properties.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ParsedPath<'a> {
    prefix: &'a str,
    subpath: Option<&'a str>,
}

fn parse_path(path: &str) -> ParsedPath<'_> {
    match path.find('.') {
        Some(dot) if dot > 0 => ParsedPath {
            prefix: &path[..dot],
            subpath: Some(&path[dot + 1..]),
        },
        _ => ParsedPath {
            prefix: path,
            subpath: None,
        },
    }
}

/// Refine phase-1 candidates against the input paths and pick the winner.
///
/// Candidates with no pattern properties keep their preliminary score.
/// Ties on the final score resolve to the earlier candidate, i.e. the one
/// with the higher preliminary score or earlier registration.
pub fn refine_candidates(
    input_paths: &HashSet<String>,
    candidates: Vec<SchemaCandidate>,
) -> MatchResult<Value> {
    if candidates.is_empty() {
        return MatchResult::None;
    }

    let parsed: Vec<ParsedPath<'_>> = input_paths.iter().map(|p| parse_path(p)).collect();
    let input_count = input_paths.len();

    let mut best: Option<(f64, SchemaCandidate)> = None;
    for candidate in candidates {
        let final_score = final_score(&candidate, &parsed, input_count);
        tracing::debug!(
            schema = %candidate.name,
            version = %candidate.version,
            preliminary = candidate.preliminary_score,
            refined = final_score,
            "scored candidate"
        );
        if final_score < FINAL_THRESHOLD {
            continue;
        }
        match &best {
            Some((best_score, _)) if final_score <= *best_score => {}
            _ => best = Some((final_score, candidate)),
        }
    }

    match best {
        Some((_, winner)) => MatchResult::Match {
            name: winner.name,
            version: winner.version,
            resource: winner.content,
            kind: MatchKind::SimilarityMatch,
        },
        None => MatchResult::None,
    }
}

fn final_score(candidate: &SchemaCandidate, parsed: &[ParsedPath<'_>], input_count: usize) -> f64 {
    if candidate.pattern_properties.is_empty() {
        return candidate.preliminary_score;
    }

    let matched_patterns = count_matched_patterns(&candidate.pattern_properties, parsed);
    let total_matched = candidate.matched_count + matched_patterns;
    let total_required = candidate.required_path_count + candidate.pattern_properties.len();

    total_matched as f64
        / (total_required as f64
            + UNMATCHED_INPUT_DAMPING * (input_count as f64 - total_matched as f64))
}

/// Count pattern properties satisfied by the input.
///
/// A pattern counts once per distinct input prefix that fully matches its
/// regex and whose subpaths form a superset of the pattern's required
/// subpaths. Unparsable stored regexes match nothing.
fn count_matched_patterns(patterns: &[PatternProperty], parsed: &[ParsedPath<'_>]) -> usize {
    let mut matched = 0;
    for pattern in patterns {
        let regex = match full_match_regex(&pattern.pattern_regex) {
            Ok(regex) => regex,
            Err(error) => {
                tracing::warn!(
                    pattern = %pattern.pattern_regex,
                    %error,
                    "ignoring unparsable stored pattern property"
                );
                continue;
            }
        };

        let matched_prefixes: HashSet<&str> = parsed
            .iter()
            .filter(|p| regex.is_match(p.prefix))
            .map(|p| p.prefix)
            .collect();

        for prefix in matched_prefixes {
            let available: HashSet<&str> = parsed
                .iter()
                .filter(|p| p.prefix == prefix)
                .filter_map(|p| p.subpath)
                .collect();
            if pattern
                .required_sub_paths
                .iter()
                .all(|sub| available.contains(sub.as_str()))
            {
                matched += 1;
            }
        }
    }
    matched
}

/// Compile a stored pattern as a whole-string match, the way the reference
/// matcher applied it.
fn full_match_regex(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}
