//! Per-file path and extension rules

use std::path::{Component, Path};
use std::sync::LazyLock;

use regex::Regex;

static DRIVE_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z]:").expect("drive letter regex is valid"));

/// Text, code and static asset types only
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "php", "css", "js", "json", "txt", "md", "html", "twig", "svg", "png", "jpg", "jpeg", "gif",
    "woff", "woff2", "ttf", "eot",
];

/// Extensions whose content is executed by the web server
pub const SCRIPT_EXTENSIONS: &[&str] = &["php"];

/// Core-system locations that deployments may never write into
pub const RESERVED_PREFIXES: &[&str] = &["wp-admin", "wp-includes", "wp-content/uploads"];

/// Check a relative path; the error is a human-readable reason
pub fn check_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("File path cannot be empty.".to_string());
    }

    if path.contains("..") {
        return Err("Path traversal (..) is not allowed.".to_string());
    }

    if path.starts_with('/') || path.starts_with('\\') || DRIVE_LETTER.is_match(path) {
        return Err("Absolute paths are not allowed.".to_string());
    }

    if path.contains('\0') {
        return Err("Null bytes in paths are not allowed.".to_string());
    }

    let lowered = Path::new(path)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| c.as_os_str().to_string_lossy().to_lowercase())
        .collect::<Vec<_>>()
        .join("/");
    if let Some(prefix) = RESERVED_PREFIXES.iter().find(|p| lowered.starts_with(*p)) {
        return Err(format!("Cannot deploy to core directory: {}", prefix));
    }

    Ok(())
}

/// Lowercased extension of the final path component
pub fn extension_of(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| ext.to_lowercase())
}

/// Check the extension against the allow-list
pub fn check_file_type(path: &str) -> Result<(), String> {
    match extension_of(path) {
        None => Err("File must have an extension.".to_string()),
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        Some(ext) => Err(format!("File extension \".{}\" is not allowed.", ext)),
    }
}

pub fn is_script(path: &str) -> bool {
    extension_of(path).is_some_and(|ext| SCRIPT_EXTENSIONS.contains(&ext.as_str()))
}
