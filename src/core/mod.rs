// ─── Tinkercraft Core ───
// Pack bundler: resolves version-specific pack variants and zips their files.
//
// Architecture:
//   core/
//     version/      Version token encoding + folder candidates
//     source/       Read-only pack layout over HTTP or a local directory
//     resolver/     Smallest-compatible folder search by probing
//     manifest/     manifest.json parsing + path normalization
//     archive/      Last-write-wins archive sink + zip output
//     assembler/    Per-pack pipeline + assembly report
//     selection/    Explicit pack/version selection value
//     state/        Settings + shared HTTP client

pub mod archive;
pub mod assembler;
pub mod error;
pub mod http;
pub mod manifest;
pub mod resolver;
pub mod selection;
pub mod source;
pub mod state;
pub mod version;
