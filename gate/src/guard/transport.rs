//! Encrypted-transport check with a local development exemption

const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1"];
const LOCAL_SUFFIXES: &[&str] = &[".local", ".test"];

/// Strip any port and IPv6 brackets from a `Host`-style value
fn bare_host(host: &str) -> &str {
    let host = host.trim();
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    match host.rsplit_once(':') {
        // a single colon is a port separator; more than one is a bare IPv6 address
        Some((name, port)) if !name.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => {
            name
        }
        _ => host,
    }
}

/// Whether `host` names a local development machine
pub fn is_local_host(host: &str) -> bool {
    let host = bare_host(host).to_ascii_lowercase();
    if host.is_empty() {
        return false;
    }
    LOCAL_HOSTS.contains(&host.as_str()) || LOCAL_SUFFIXES.iter().any(|s| host.ends_with(s))
}
