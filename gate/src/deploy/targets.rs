//! Physical target directory resolution

use std::path::PathBuf;

use crate::models::target::{Target, TargetType};

/// Roots of the managed directory trees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRoots {
    pub themes: PathBuf,
    pub plugins: PathBuf,
    pub mu_plugins: PathBuf,
}

impl TargetRoots {
    /// Directory a target's files are written under.
    ///
    /// Themes and plugins get their own subdirectory; must-use plugins live
    /// directly in the must-use root.
    pub fn resolve(&self, target: &Target) -> PathBuf {
        match target.kind {
            TargetType::Theme => self.themes.join(&target.slug),
            TargetType::Plugin => self.plugins.join(&target.slug),
            TargetType::MuPlugin => self.mu_plugins.clone(),
        }
    }

    pub fn all(&self) -> [(TargetType, &PathBuf); 3] {
        [
            (TargetType::Theme, &self.themes),
            (TargetType::Plugin, &self.plugins),
            (TargetType::MuPlugin, &self.mu_plugins),
        ]
    }
}
