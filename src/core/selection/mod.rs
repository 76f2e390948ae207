// ─── Selection Tracker ───
// Explicit selection value handed to the assembler. Owned by the caller and
// left untouched for the duration of one assembly.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::{BundlerError, BundlerResult};

/// Storage namespace of a pack under `packs/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackKey(String);

impl PackKey {
    /// Validate a raw key. A key is one path segment and can never leave `packs/`.
    pub fn new(raw: impl Into<String>) -> BundlerResult<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed == "."
            || trimmed.contains('/')
            || trimmed.contains('\\')
            || trimmed.contains("..")
        {
            return Err(BundlerError::InvalidPackKey(raw));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PackKey {
    type Error = BundlerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PackKey::new(value)
    }
}

impl From<PackKey> for String {
    fn from(key: PackKey) -> Self {
        key.0
    }
}

/// Selected packs plus raw version tokens.
///
/// Pack order is kept: it decides which pack wins a path collision.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionState {
    packs: Vec<PackKey>,
    versions: Vec<String>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn packs(&self) -> &[PackKey] {
        &self.packs
    }

    pub fn versions(&self) -> &[String] {
        &self.versions
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }

    pub fn select_pack(&mut self, pack: PackKey) {
        if !self.packs.contains(&pack) {
            self.packs.push(pack);
        }
    }

    pub fn deselect_pack(&mut self, pack: &PackKey) {
        self.packs.retain(|p| p != pack);
    }

    /// Flip a pack; returns whether it is selected afterwards.
    pub fn toggle_pack(&mut self, pack: PackKey) -> bool {
        if self.packs.contains(&pack) {
            self.deselect_pack(&pack);
            false
        } else {
            self.packs.push(pack);
            true
        }
    }

    pub fn select_version(&mut self, token: impl Into<String>) {
        let token = token.into();
        if !token.is_empty() && !self.versions.contains(&token) {
            self.versions.push(token);
        }
    }

    pub fn deselect_version(&mut self, token: &str) {
        self.versions.retain(|v| v != token);
    }

    pub fn toggle_version(&mut self, token: impl Into<String>) -> bool {
        let token = token.into();
        if self.versions.contains(&token) {
            self.deselect_version(&token);
            false
        } else {
            self.select_version(token);
            true
        }
    }

    /// Build a selection from raw CLI/IPC input, rejecting invalid pack keys.
    pub fn from_raw<P, V>(packs: P, versions: V) -> BundlerResult<Self>
    where
        P: IntoIterator,
        P::Item: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        let mut state = Self::new();
        for raw in packs {
            state.select_pack(PackKey::new(raw)?);
        }
        for token in versions {
            state.select_version(token);
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> PackKey {
        PackKey::new(raw).unwrap()
    }

    #[test]
    fn pack_key_rejects_path_escapes() {
        assert!(PackKey::new("fresh_crops").is_ok());
        assert!(PackKey::new("").is_err());
        assert!(PackKey::new("  ").is_err());
        assert!(PackKey::new("../secrets").is_err());
        assert!(PackKey::new("a/b").is_err());
        assert!(PackKey::new("a\\b").is_err());
        assert!(PackKey::new(".").is_err());
        assert!(PackKey::new(" . ").is_err());
        assert!(PackKey::new("v1.2").is_ok());
    }

    #[test]
    fn toggling_packs_keeps_insertion_order() {
        let mut state = SelectionState::new();
        assert!(state.toggle_pack(key("fresh_crops")));
        assert!(state.toggle_pack(key("grand_world")));
        state.select_pack(key("fresh_crops"));
        assert_eq!(state.packs(), &[key("fresh_crops"), key("grand_world")]);

        assert!(!state.toggle_pack(key("fresh_crops")));
        assert_eq!(state.packs(), &[key("grand_world")]);
    }

    #[test]
    fn versions_are_kept_raw_and_unique() {
        let mut state = SelectionState::new();
        state.select_version("1.21.x");
        state.select_version("1.21.x");
        state.select_version("20");
        assert_eq!(state.versions(), &["1.21.x".to_string(), "20".to_string()]);

        assert!(!state.toggle_version("20"));
        assert_eq!(state.versions(), &["1.21.x".to_string()]);
    }

    #[test]
    fn from_raw_fails_on_invalid_pack() {
        let err = SelectionState::from_raw(["ok", "../nope"], ["20"]).unwrap_err();
        assert!(matches!(err, BundlerError::InvalidPackKey(_)));
    }
}
