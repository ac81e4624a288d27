//! Dangerous-construct scanner for script content

use std::sync::LazyLock;

use regex::Regex;

/// A compiled pattern and the warning it produces
pub struct DangerousPattern {
    regex: Regex,
    message: &'static str,
}

const PATTERNS: &[(&str, &str)] = &[
    (r"eval\s*\(", "eval() usage detected"),
    (r"shell_exec\s*\(", "shell_exec() usage detected"),
    (r"\bexec\s*\(", "exec() usage detected"),
    (r"system\s*\(", "system() usage detected"),
    (r"passthru\s*\(", "passthru() usage detected"),
    (r"proc_open\s*\(", "proc_open() usage detected"),
    (r"popen\s*\(", "popen() usage detected"),
    (
        r"base64_decode\s*\([^)]*\)\s*\)",
        "base64_decode() used in nested call (possible execution)",
    ),
    (
        r#"preg_replace\s*\(\s*['"][^"']*/e"#,
        "preg_replace with /e modifier detected",
    ),
    (
        r#"(include|require)(_once)?\s*\(?\s*['"]https?://"#,
        "Remote file include detected",
    ),
    (
        r#"file_get_contents\s*\(\s*['"]https?://"#,
        "Remote file_get_contents detected",
    ),
    (
        r"\$_(?:GET|POST|REQUEST|COOKIE|SERVER)\s*\[",
        "Direct superglobal access (consider sanitization)",
    ),
];

static COMPILED: LazyLock<Vec<DangerousPattern>> = LazyLock::new(|| {
    PATTERNS
        .iter()
        .map(|(pattern, message)| DangerousPattern {
            regex: Regex::new(&format!("(?i){}", pattern)).expect("dangerous pattern is valid"),
            message,
        })
        .collect()
});

/// One message per matching pattern, in table order
pub fn scan(content: &str) -> Vec<&'static str> {
    COMPILED
        .iter()
        .filter(|p| p.regex.is_match(content))
        .map(|p| p.message)
        .collect()
}
