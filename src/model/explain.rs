//! Turns the classifier's most important features into short, non-technical reasons.

/// Keyword groups checked in order; the first group matching a feature name wins.
const KEYWORD_REASONS: &[(&[&str], &str)] = &[
    (
        &["entropy"],
        "The file looks heavily scrambled, a common way malware hides itself.",
    ),
    (
        &["import", "crypt", "virtualalloc"],
        "It appears to contain code related to encrypting or changing files.",
    ),
    (
        &["section", "numberofsections"],
        "Its internal structure looks unusual compared to normal programs.",
    ),
    (
        &["bitcoin", "btc"],
        "It has patterns related to cryptocurrency usage.",
    ),
    (
        &["write", "bulk", "encrypt"],
        "It shows patterns similar to fast file changes seen in ransomware.",
    ),
];

pub const REASON_GENERIC: &str =
    "This file's characteristics look unusual compared to safe files.";

pub const MAX_STATIC_REASONS: usize = 3;

/// Rank features by importance, highest first; ties keep input order.
pub fn top_features(names: &[String], importances: &[f64], k: usize) -> Vec<(String, f64)> {
    let mut pairs: Vec<(String, f64)> = names
        .iter()
        .cloned()
        .zip(importances.iter().copied())
        .collect();
    pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
    pairs.truncate(k);
    pairs
}

/// Map ranked features to reasons: deduplicated, order kept, at most three,
/// never empty.
pub fn friendly_explanations(top: &[(String, f64)]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for (feature, _) in top {
        let f = feature.to_lowercase();
        let hit = KEYWORD_REASONS
            .iter()
            .find(|(keys, _)| keys.iter().any(|k| f.contains(k)));
        if let Some((_, msg)) = hit {
            if !out.iter().any(|m| m == msg) {
                out.push((*msg).to_string());
            }
        }
    }
    if out.is_empty() {
        out.push(REASON_GENERIC.to_string());
    }
    out.truncate(MAX_STATIC_REASONS);
    out
}
