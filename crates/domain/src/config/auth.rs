use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Credentials
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How the credential header is built.
///
/// The key is taken from `api_key` if set, otherwise from the environment
/// variable named by `api_key_env`.  With neither, requests go out
/// unauthenticated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Header carrying the credential.
    #[serde(default = "d_header")]
    pub header: String,
    /// Optional scheme prefix (`Bearer`).  When unset and the header is
    /// `Authorization`, `Bearer` is assumed.
    #[serde(default)]
    pub scheme: Option<String>,
    /// Plaintext key.  Prefer `api_key_env`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable holding the key.
    #[serde(default = "d_key_env")]
    pub api_key_env: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            header: d_header(),
            scheme: None,
            api_key: None,
            api_key_env: d_key_env(),
        }
    }
}

impl AuthConfig {
    /// The scheme actually applied, after the `Authorization` defaulting rule.
    pub fn effective_scheme(&self) -> Option<&str> {
        match self.scheme.as_deref() {
            Some(s) if !s.trim().is_empty() => Some(s.trim()),
            Some(_) | None if self.header.eq_ignore_ascii_case("authorization") => Some("Bearer"),
            _ => None,
        }
    }
}

fn d_header() -> String {
    "Authorization".into()
}
fn d_key_env() -> Option<String> {
    Some("AGSTREAM_API_KEY".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_header_defaults_to_bearer() {
        let auth = AuthConfig::default();
        assert_eq!(auth.effective_scheme(), Some("Bearer"));
    }

    #[test]
    fn custom_header_has_no_scheme() {
        let auth = AuthConfig {
            header: "X-Api-Key".into(),
            ..Default::default()
        };
        assert_eq!(auth.effective_scheme(), None);
    }

    #[test]
    fn explicit_scheme_wins() {
        let auth = AuthConfig {
            scheme: Some("Token".into()),
            ..Default::default()
        };
        assert_eq!(auth.effective_scheme(), Some("Token"));
    }

    #[test]
    fn blank_scheme_falls_back() {
        let auth = AuthConfig {
            header: "X-Api-Key".into(),
            scheme: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(auth.effective_scheme(), None);
    }
}
