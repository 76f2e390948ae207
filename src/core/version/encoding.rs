// ─── Version Encoding ───
// Canonicalizes raw version tokens into sorted, deduplicated integer keys.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::warn;

/// Legacy selector labels still sent by older clients.
const LEGACY_ALIASES: &[(&str, u32)] = &[("1.20.x", 20), ("1.21.x", 21)];

/// Sorted, deduplicated set of version keys for one resolution request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VersionSet(Vec<u32>);

impl VersionSet {
    pub fn from_keys<I: IntoIterator<Item = u32>>(keys: I) -> Self {
        let unique: BTreeSet<u32> = keys.into_iter().collect();
        Self(unique.into_iter().collect())
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn min(&self) -> Option<u32> {
        self.0.first().copied()
    }

    pub fn max(&self) -> Option<u32> {
        self.0.last().copied()
    }
}

/// Outcome of [`normalize`]: the usable keys plus every token that was dropped.
#[derive(Debug, Clone, Default)]
pub struct NormalizedVersions {
    pub versions: VersionSet,
    pub rejected: Vec<String>,
}

/// Convert one raw token into a version key.
pub fn parse_version_key(raw: &str) -> Option<u32> {
    let token = raw.trim();
    if let Ok(key) = token.parse::<u32>() {
        return Some(key);
    }
    LEGACY_ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(token))
        .map(|(_, key)| *key)
}

/// Normalize raw version tokens.
///
/// Unconvertible tokens are dropped and reported, never fatal: version
/// selection is advisory UI state.
pub fn normalize<I, S>(raw: I) -> NormalizedVersions
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut keys = Vec::new();
    let mut rejected = Vec::new();

    for token in raw {
        let token = token.as_ref();
        match parse_version_key(token) {
            Some(key) => keys.push(key),
            None => {
                warn!("Dropping unrecognized version token {:?}", token);
                rejected.push(token.to_string());
            }
        }
    }

    NormalizedVersions {
        versions: VersionSet::from_keys(keys),
        rejected,
    }
}
