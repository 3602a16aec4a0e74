use axum::http::{header::USER_AGENT, HeaderMap};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng, RngCore};
use sha2::{Digest, Sha256};
use url::Url;

pub const UNKNOWN_CLIENT_IP: &str = "unknown";
pub const CONSOLE_TOKEN_LENGTH: usize = 12;

/// Compares two secrets without short-circuiting on the first differing byte.
/// Both sides are digested first so the comparison length never depends on
/// the secret length.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let left = Sha256::digest(a.as_bytes());
    let right = Sha256::digest(b.as_bytes());
    left.iter()
        .zip(right.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// 256 bits from the OS RNG, hex encoded.
pub fn generate_session_secret() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn generate_console_token() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(CONSOLE_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Exactly twelve ASCII alphanumerics.
pub fn is_valid_console_token(token: &str) -> bool {
    token.len() == CONSOLE_TOKEN_LENGTH && token.bytes().all(|b| b.is_ascii_alphanumeric())
}

pub fn extract_client_ip(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty());
    if let Some(ip) = forwarded {
        return ip;
    }
    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| UNKNOWN_CLIENT_IP.to_string())
}

pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|agent| agent.trim().to_string())
        .filter(|agent| !agent.is_empty())
}

/// Reduces an `Origin`/`Referer` URL, or a bare `Host` value, to
/// `host[:port]` in lowercase.
pub fn origin_authority(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "null" {
        return None;
    }
    if raw.contains("://") {
        let url = Url::parse(raw).ok()?;
        let host = url.host_str()?.to_ascii_lowercase();
        return Some(match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host,
        });
    }
    Some(raw.trim_end_matches('/').to_ascii_lowercase())
}

/// Matches an authority against allow-list entries. Entries are hosts,
/// optionally with a port, or `*.suffix` wildcards covering any subdomain.
pub fn is_allowed_authority(authority: &str, allowed: &[String]) -> bool {
    let host = authority
        .rsplit_once(':')
        .filter(|(_, port)| port.chars().all(|c| c.is_ascii_digit()))
        .map(|(host, _)| host)
        .unwrap_or(authority);

    allowed.iter().any(|entry| {
        let entry = entry.trim().to_ascii_lowercase();
        if let Some(suffix) = entry.strip_prefix("*.") {
            host.len() > suffix.len() + 1 && host.ends_with(&format!(".{}", suffix))
        } else {
            entry == authority || entry == host
        }
    })
}
