use std::fmt;

use serde::{Serialize, Serializer};

use super::encoding::VersionSet;

/// A synthetic variant folder: the contiguous run `[start, start + len)`.
///
/// Rendered as the underscore-joined run, e.g. `18_19_20`. Candidates are
/// generated and probed, never listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FolderCandidate {
    pub start: u32,
    pub len: u32,
}

impl FolderCandidate {
    pub fn new(start: u32, len: u32) -> Self {
        Self { start, len }
    }

    /// Last version in the run (inclusive). Only meaningful for `len >= 1`.
    pub fn end(&self) -> u32 {
        self.start + self.len.saturating_sub(1)
    }

    pub fn versions(&self) -> impl Iterator<Item = u32> {
        self.start..self.start + self.len
    }

    pub fn contains(&self, version: u32) -> bool {
        self.len > 0 && version >= self.start && version <= self.end()
    }

    /// Compatible iff every requested key lies inside the run.
    pub fn is_compatible(&self, requested: &VersionSet) -> bool {
        requested.as_slice().iter().all(|v| self.contains(*v))
    }
}

impl fmt::Display for FolderCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for version in self.versions() {
            if !first {
                f.write_str("_")?;
            }
            write!(f, "{}", version)?;
            first = false;
        }
        Ok(())
    }
}

impl Serialize for FolderCandidate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_underscore_joined_run() {
        assert_eq!(FolderCandidate::new(1, 3).to_string(), "1_2_3");
        assert_eq!(FolderCandidate::new(18, 3).to_string(), "18_19_20");
        assert_eq!(FolderCandidate::new(0, 1).to_string(), "0");
    }

    #[test]
    fn compatibility_requires_every_requested_key() {
        let requested = VersionSet::from_keys([20, 21]);
        assert!(FolderCandidate::new(20, 2).is_compatible(&requested));
        assert!(FolderCandidate::new(19, 3).is_compatible(&requested));
        assert!(!FolderCandidate::new(21, 2).is_compatible(&requested));
        assert!(!FolderCandidate::new(20, 1).is_compatible(&requested));
    }

    #[test]
    fn empty_request_is_compatible_with_any_run() {
        assert!(FolderCandidate::new(7, 1).is_compatible(&VersionSet::default()));
    }
}
