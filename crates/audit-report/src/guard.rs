//! Overwrite guard consulted before any file is created or truncated.

use std::path::Path;
use std::sync::Arc;

use dialoguer::{theme::ColorfulTheme, Confirm};

/// Decides whether a file may be (re)written.
///
/// Writers call `confirm` exactly once per artifact. A `false` answer is a
/// deliberate skip, not an error.
pub trait OverwriteGuard: Send + Sync {
    fn confirm(&self, path: &Path, force: bool) -> bool;
}

impl<G: OverwriteGuard + ?Sized> OverwriteGuard for Arc<G> {
    fn confirm(&self, path: &Path, force: bool) -> bool {
        (**self).confirm(path, force)
    }
}

/// Asks on the terminal when an existing file would be replaced.
/// A prompt that cannot be shown (no TTY) counts as "no".
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptGuard;

impl OverwriteGuard for PromptGuard {
    fn confirm(&self, path: &Path, force: bool) -> bool {
        if force || !path.exists() {
            return true;
        }
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "File {} already exists. Do you want to overwrite it?",
                path.display()
            ))
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

/// Fixed answer for existing files, for batch runs and tests.
#[derive(Debug, Clone, Copy)]
pub struct NonInteractiveGuard {
    pub overwrite: bool,
}

impl NonInteractiveGuard {
    pub fn overwrite() -> Self {
        Self { overwrite: true }
    }

    pub fn keep_existing() -> Self {
        Self { overwrite: false }
    }
}

impl OverwriteGuard for NonInteractiveGuard {
    fn confirm(&self, path: &Path, force: bool) -> bool {
        force || !path.exists() || self.overwrite
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_always_confirmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.json");
        assert!(NonInteractiveGuard::keep_existing().confirm(&path, false));
        assert!(PromptGuard.confirm(&path, false));
    }

    #[test]
    fn existing_file_needs_force_or_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.json");
        std::fs::write(&path, "{}").unwrap();

        assert!(!NonInteractiveGuard::keep_existing().confirm(&path, false));
        assert!(NonInteractiveGuard::keep_existing().confirm(&path, true));
        assert!(NonInteractiveGuard::overwrite().confirm(&path, false));
        assert!(PromptGuard.confirm(&path, true));
    }
}
