//! Credential header construction from `[auth]`.

use ags_domain::config::AuthConfig;
use ags_domain::error::{Error, Result};
use ags_sse::Credential;

/// Resolve the API key and build the header to send.
///
/// Resolution order:
/// 1. `api_key` (plaintext, warns)
/// 2. the environment variable named by `api_key_env`
///
/// Returns `Ok(None)` when no key is configured or the variable is unset;
/// the stream then goes out unauthenticated.
pub fn resolve_credential(auth: &AuthConfig) -> Result<Option<Credential>> {
    let key = match resolve_key(auth)? {
        Some(key) => key,
        None => return Ok(None),
    };

    if auth.header.trim().is_empty() {
        return Err(Error::Auth("auth.header must not be empty".into()));
    }

    let value = match auth.effective_scheme() {
        Some(scheme) => format!("{scheme} {key}"),
        None => key,
    };
    Ok(Some(Credential::new(auth.header.trim(), value)))
}

fn resolve_key(auth: &AuthConfig) -> Result<Option<String>> {
    if let Some(key) = auth.api_key.as_deref().filter(|k| !k.is_empty()) {
        tracing::warn!(
            "API key loaded from plaintext config field 'auth.api_key', \
             prefer 'auth.api_key_env'"
        );
        return Ok(Some(key.to_owned()));
    }

    let Some(var) = auth.api_key_env.as_deref().filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    match std::env::var(var) {
        Ok(key) if !key.is_empty() => Ok(Some(key)),
        Ok(_) | Err(std::env::VarError::NotPresent) => {
            tracing::debug!(env_var = %var, "no API key in environment, connecting without credentials");
            Ok(None)
        }
        Err(std::env::VarError::NotUnicode(_)) => Err(Error::Auth(format!(
            "environment variable '{var}' is not valid UTF-8"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env() -> AuthConfig {
        AuthConfig {
            api_key_env: None,
            ..Default::default()
        }
    }

    #[test]
    fn plaintext_key_gets_bearer_by_default() {
        let auth = AuthConfig {
            api_key: Some("sk-test-123".into()),
            ..no_env()
        };
        let cred = resolve_credential(&auth).unwrap().unwrap();
        assert_eq!(cred.header, "Authorization");
        assert_eq!(cred.value, "Bearer sk-test-123");
    }

    #[test]
    fn custom_header_without_scheme_sends_raw_key() {
        let auth = AuthConfig {
            header: "X-API-Key".into(),
            api_key: Some("k".into()),
            ..no_env()
        };
        let cred = resolve_credential(&auth).unwrap().unwrap();
        assert_eq!(cred.header, "X-API-Key");
        assert_eq!(cred.value, "k");
    }

    #[test]
    fn explicit_scheme_is_used() {
        let auth = AuthConfig {
            scheme: Some("Token".into()),
            api_key: Some("abc".into()),
            ..no_env()
        };
        let cred = resolve_credential(&auth).unwrap().unwrap();
        assert_eq!(cred.value, "Token abc");
    }

    #[test]
    fn key_from_environment() {
        let var = "AGSTREAM_TEST_RESOLVE_ENV_KEY_7781";
        std::env::set_var(var, "env-secret");
        let auth = AuthConfig {
            api_key_env: Some(var.into()),
            ..Default::default()
        };
        let cred = resolve_credential(&auth).unwrap().unwrap();
        assert_eq!(cred.value, "Bearer env-secret");
        std::env::remove_var(var);
    }

    #[test]
    fn unset_environment_means_no_credential() {
        let auth = AuthConfig {
            api_key_env: Some("AGSTREAM_TEST_SURELY_UNSET_VAR_5512".into()),
            ..Default::default()
        };
        assert!(resolve_credential(&auth).unwrap().is_none());
        assert!(resolve_credential(&no_env()).unwrap().is_none());
    }

    #[test]
    fn empty_header_rejected() {
        let auth = AuthConfig {
            header: "  ".into(),
            api_key: Some("k".into()),
            ..no_env()
        };
        assert!(matches!(resolve_credential(&auth), Err(Error::Auth(_))));
    }
}
