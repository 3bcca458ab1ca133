//! Session cookie formatting and parsing

use std::fmt::Write;

pub const SESSION_COOKIE_NAME: &str = "mse_session";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

/// Attributes of the `Set-Cookie` header carrying the session id
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub name: String,
    pub path: String,
    pub secure: bool,
    pub same_site: SameSite,
    pub max_age: Option<i64>,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: SESSION_COOKIE_NAME.to_string(),
            path: "/".to_string(),
            secure: true,
            same_site: SameSite::Lax,
            max_age: None,
        }
    }
}

impl CookieConfig {
    /// Plain-HTTP variant for local runs
    pub fn development() -> Self {
        Self {
            secure: false,
            ..Default::default()
        }
    }

    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// `Set-Cookie` value storing `session_id`; always `HttpOnly`
    pub fn build_cookie(&self, session_id: &str) -> String {
        self.render(session_id, self.max_age)
    }

    /// `Set-Cookie` value that makes the browser drop the session cookie
    pub fn build_clear_cookie(&self) -> String {
        self.render("", Some(0))
    }

    fn render(&self, value: &str, max_age: Option<i64>) -> String {
        let mut cookie = format!(
            "{}={}; Path={}; HttpOnly; SameSite={}",
            self.name,
            value,
            self.path,
            self.same_site.as_str()
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        if let Some(max_age) = max_age {
            let _ = write!(cookie, "; Max-Age={}", max_age);
        }
        cookie
    }
}

/// Value of `cookie_name` in a `Cookie` request header
pub fn extract_session_id(cookie_header: &str, cookie_name: &str) -> Option<String> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| name.trim() == cookie_name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_cookie() {
        let cookie = CookieConfig::development()
            .with_max_age(600)
            .build_cookie("abc123");

        assert_eq!(
            cookie,
            "mse_session=abc123; Path=/; HttpOnly; SameSite=Lax; Max-Age=600"
        );
    }

    #[test]
    fn test_secure_and_clear_cookie() {
        let config = CookieConfig::default();
        assert!(config.build_cookie("x").ends_with("; Secure"));

        let clear = config.build_clear_cookie();
        assert!(clear.starts_with("mse_session=;"));
        assert!(clear.contains("Max-Age=0"));
    }

    #[test]
    fn test_extract_session_id() {
        let cookie = "theme=dark; mse_session=abc123; other=value";
        assert_eq!(
            extract_session_id(cookie, SESSION_COOKIE_NAME),
            Some("abc123".to_string())
        );
        assert_eq!(extract_session_id(cookie, "missing"), None);
        assert_eq!(extract_session_id("mse_session=", SESSION_COOKIE_NAME), None);
    }
}
