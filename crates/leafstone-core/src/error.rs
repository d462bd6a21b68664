//! Typed errors surfaced by the core

use thiserror::Error;

/// Errors raised while extracting directives from component source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    /// Two `@requires-asset` directives publish to the same `/assets/<filename>` URL
    #[error(
        "Asset filename conflict: \"{filename}\" is used by multiple assets\n   \
         Consider using custom filenames: {suggestion}"
    )]
    AssetConflict {
        filename: String,
        suggestion: String,
    },

    /// A destination filename that would land outside `assets/`
    #[error("Invalid asset filename: \"{filename}\" must be a plain file name without path separators")]
    InvalidAssetFilename { filename: String },
}
