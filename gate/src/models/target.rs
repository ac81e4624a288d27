//! Deployment targets

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static SLUG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z0-9_-]+$").expect("slug regex is valid"));

/// Category of destination subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetType {
    Theme,
    Plugin,
    MuPlugin,
}

impl TargetType {
    pub const ALL: [TargetType; 3] = [TargetType::Theme, TargetType::Plugin, TargetType::MuPlugin];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Theme => "theme",
            TargetType::Plugin => "plugin",
            TargetType::MuPlugin => "mu-plugin",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "theme" => Ok(TargetType::Theme),
            "plugin" => Ok(TargetType::Plugin),
            "mu-plugin" => Ok(TargetType::MuPlugin),
            _ => Err(format!("Unknown target type: {}", s)),
        }
    }
}

/// A validated destination: type plus slug
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    #[serde(rename = "type")]
    pub kind: TargetType,
    pub slug: String,
}

impl Target {
    pub fn new(kind: TargetType, slug: impl Into<String>) -> Self {
        Self {
            kind,
            slug: slug.into(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.slug)
    }
}

/// Target as submitted, before the type has been checked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedTarget {
    #[serde(rename = "type")]
    pub target_type: String,
    pub slug: String,
}

/// Slugs are non-empty and limited to `[a-z0-9_-]`, case-insensitively.
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_PATTERN.is_match(slug)
}
