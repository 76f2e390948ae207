pub mod encoding;
pub mod folder;

pub use encoding::{normalize, parse_version_key, NormalizedVersions, VersionSet};
pub use folder::FolderCandidate;
