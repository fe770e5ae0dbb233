//! Credential lookup and the opaque key holder.

use crate::error::Error;
use reqwest::header::HeaderValue;
use std::env;
use std::fmt;

/// Environment variable consulted when no key is passed explicitly.
pub const API_KEY_ENV: &str = "PPLX_API_KEY";

/// Source of credentials, queried by name at client construction.
pub trait CredentialSource: Send + Sync {
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Reads credentials from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn lookup(&self, name: &str) -> Option<String> {
        env::var(name).ok()
    }
}

impl<F> CredentialSource for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn lookup(&self, name: &str) -> Option<String> {
        self(name)
    }
}

/// Bearer token holder. Never printed; only turned into a header value on demand.
#[derive(Clone)]
pub struct ApiKey(Box<str>);

impl ApiKey {
    /// Wrap a key, rejecting empty values and characters invalid in a header.
    pub fn new(key: impl Into<String>) -> Result<Self, Error> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(Error::configuration("API key is empty"));
        }
        if HeaderValue::from_str(&key).is_err() {
            return Err(Error::configuration(
                "API key contains characters not allowed in an HTTP header",
            ));
        }
        Ok(Self(key.into_boxed_str()))
    }

    /// Resolve a key: the explicit value wins, otherwise the source is asked for [`API_KEY_ENV`].
    /// Empty or whitespace-only values count as absent.
    pub fn resolve(explicit: Option<String>, source: &dyn CredentialSource) -> Result<Self, Error> {
        explicit
            .filter(|k| !k.trim().is_empty())
            .or_else(|| source.lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()))
            .ok_or_else(|| {
                Error::configuration(format!(
                    "API key not found. Set {API_KEY_ENV} environment variable or pass it directly."
                ))
            })
            .and_then(Self::new)
    }

    /// `Authorization` header value, marked sensitive so it is redacted from debug output.
    pub(crate) fn bearer(&self) -> Option<HeaderValue> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.0)).ok()?;
        value.set_sensitive(true);
        Some(value)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}
