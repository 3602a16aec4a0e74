use std::time::Duration;

/// Console cookies are always `SameSite=Strict`; only `Secure` varies.
#[derive(Debug, Clone, Copy)]
pub struct CookieOptions {
    pub secure: bool,
}

impl CookieOptions {
    /// `Secure` only in production so local http development still works.
    pub fn console(production_mode: bool) -> Self {
        Self {
            secure: production_mode,
        }
    }
}

pub const SESSION_COOKIE_NAME: &str = "console_session";
pub const LEGACY_COOKIE_NAME: &str = "console_auth";
pub const CONSOLE_COOKIE_PATH: &str = "/";

pub fn build_auth_cookie(
    name: &str,
    value: &str,
    max_age: Duration,
    path: &str,
    options: CookieOptions,
) -> String {
    let mut cookie = format!(
        "{}={}; Path={}; Max-Age={}; HttpOnly; SameSite=Strict",
        name,
        value,
        path,
        max_age.as_secs()
    );
    if options.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn build_clear_cookie(name: &str, path: &str, options: CookieOptions) -> String {
    let mut cookie = format!(
        "{}=; Path={}; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Strict",
        name, path
    );
    if options.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn extract_cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|pair| {
        let mut parts = pair.splitn(2, '=');
        let key = parts.next()?.trim();
        let value = parts.next()?.trim();
        if key == name && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

/// Looks up a cookie across every `Cookie` header on the request.
pub fn cookie_from_headers(headers: &axum::http::HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|raw| extract_cookie_value(raw, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::COOKIE, HeaderMap, HeaderValue};

    #[test]
    fn build_auth_cookie_includes_security_attributes() {
        let cookie = build_auth_cookie(
            SESSION_COOKIE_NAME,
            "abc",
            Duration::from_secs(3600),
            CONSOLE_COOKIE_PATH,
            CookieOptions::console(true),
        );
        assert!(cookie.starts_with("console_session=abc"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Secure"));
    }

    #[test]
    fn build_clear_cookie_expires_immediately() {
        let cookie = build_clear_cookie(
            LEGACY_COOKIE_NAME,
            CONSOLE_COOKIE_PATH,
            CookieOptions::console(false),
        );
        assert!(cookie.starts_with("console_auth=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains("1970"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn extract_cookie_value_finds_matching_name() {
        let header = "a=1; console_session=token-value; b=2";
        assert_eq!(
            extract_cookie_value(header, SESSION_COOKIE_NAME).as_deref(),
            Some("token-value")
        );
        assert!(extract_cookie_value(header, "missing").is_none());
        assert!(extract_cookie_value("console_session=", SESSION_COOKIE_NAME).is_none());
    }

    #[test]
    fn cookie_from_headers_scans_all_cookie_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(COOKIE, HeaderValue::from_static("console_auth=legacy"));
        assert_eq!(
            cookie_from_headers(&headers, LEGACY_COOKIE_NAME).as_deref(),
            Some("legacy")
        );
    }
}
