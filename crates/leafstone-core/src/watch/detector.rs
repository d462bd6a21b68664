//! Change classification for the watched component

use crate::directives::{self, Declarations};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Serialized form of the applied declarations, compared by equality only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSnapshot(String);

impl WatchSnapshot {
    pub fn of(declarations: &Declarations) -> Result<Self> {
        serde_json::to_string(declarations)
            .map(Self)
            .context("Failed to serialize declarations")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// What a change notification turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// Same text as the last applied version (duplicate notification)
    Unchanged,
    /// The body changed but the directives did not: hot patch
    ContentOnly { content: String },
    /// Dependencies or assets changed: restart
    DeclarationsChanged {
        previous: Declarations,
        declarations: Declarations,
    },
    /// The new text cannot be applied, e.g. an asset filename conflict
    Rejected { reason: String },
}

/// Compares each new version of the component against the applied snapshot
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    component_path: PathBuf,
    content: String,
    declarations: Declarations,
    snapshot: WatchSnapshot,
}

impl ChangeDetector {
    /// Start from the content and declarations the current session was built from
    pub fn new(component_path: &Path, content: String, declarations: Declarations) -> Result<Self> {
        let snapshot = WatchSnapshot::of(&declarations)?;
        Ok(Self {
            component_path: component_path.to_path_buf(),
            content,
            declarations,
            snapshot,
        })
    }

    pub fn snapshot(&self) -> &WatchSnapshot {
        &self.snapshot
    }

    /// Classify `content`. A `ContentOnly` result becomes the new applied text.
    pub fn classify(&mut self, content: String) -> ChangeEvent {
        if content == self.content {
            return ChangeEvent::Unchanged;
        }

        let declarations = match directives::extract(&content, &self.component_path) {
            Ok(declarations) => declarations,
            Err(e) => {
                return ChangeEvent::Rejected {
                    reason: e.to_string(),
                }
            }
        };

        let snapshot = match WatchSnapshot::of(&declarations) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                return ChangeEvent::Rejected {
                    reason: format!("{:#}", e),
                }
            }
        };

        if snapshot == self.snapshot {
            self.content = content.clone();
            ChangeEvent::ContentOnly { content }
        } else {
            ChangeEvent::DeclarationsChanged {
                previous: self.declarations.clone(),
                declarations,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATH: &str = "/fake/path/Counter.jsx";
    const V1: &str = "// @requires lodash@4.17.21\nexport default () => <p>one</p>;\n";

    fn detector() -> ChangeDetector {
        let declarations = directives::extract(V1, Path::new(PATH)).unwrap();
        ChangeDetector::new(Path::new(PATH), V1.to_string(), declarations).unwrap()
    }

    #[test]
    fn test_identical_text_is_unchanged() {
        assert_eq!(detector().classify(V1.to_string()), ChangeEvent::Unchanged);
    }

    #[test]
    fn test_body_edit_is_content_only() {
        let mut detector = detector();
        let v2 = V1.replace("one", "two");

        assert_eq!(
            detector.classify(v2.clone()),
            ChangeEvent::ContentOnly {
                content: v2.clone()
            }
        );
        // The edit is now the applied text
        assert_eq!(detector.classify(v2), ChangeEvent::Unchanged);
    }

    #[test]
    fn test_new_requires_line_changes_declarations() {
        let mut detector = detector();
        let v2 = format!("// @requires moment\n{}", V1);

        match detector.classify(v2) {
            ChangeEvent::DeclarationsChanged {
                previous,
                declarations,
            } => {
                assert_eq!(previous.dependencies.len(), 1);
                assert_eq!(declarations.dependencies["moment"], "latest");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_new_asset_changes_declarations() {
        let mut detector = detector();
        let v2 = format!("// @requires-asset ./logo.svg\n{}", V1);

        assert!(matches!(
            detector.classify(v2),
            ChangeEvent::DeclarationsChanged { .. }
        ));
    }

    #[test]
    fn test_conflict_is_rejected_and_not_applied() {
        let mut detector = detector();
        let v2 = format!(
            "// @requires-asset ./logo.svg\n// @requires-asset ../logo.svg\n{}",
            V1
        );

        match detector.classify(v2.clone()) {
            ChangeEvent::Rejected { reason } => assert!(reason.contains("logo.svg")),
            other => panic!("unexpected event: {:?}", other),
        }
        // Still rejected on the next notification for the same text
        assert!(matches!(
            detector.classify(v2),
            ChangeEvent::Rejected { .. }
        ));
    }

    #[test]
    fn test_snapshot_is_stable() {
        let a = detector();
        let b = detector();
        assert_eq!(a.snapshot(), b.snapshot());
        assert!(a.snapshot().as_str().contains("lodash"));
    }
}
