//! Organization and API key used to authenticate one CLI invocation.

use std::fmt;

use axum::http::HeaderMap;

use crate::errors::CliError;

pub const ORG_HEADER: &str = "X-CY-ORG";
pub const API_KEY_HEADER: &str = "X-CY-API-KEY";
pub const ORG_ENV: &str = "CY_ORG";
pub const API_KEY_ENV: &str = "CY_API_KEY";
pub const API_URL_ENV: &str = "CY_API_URL";

/// Cycloid credentials for a single request.
///
/// Passed explicitly to every CLI call and never stored on shared state.
/// `Debug` output redacts the API key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    organization: String,
    api_key: String,
}

impl Credentials {
    pub fn new(organization: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { organization: organization.into(), api_key: api_key.into() }
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Extract credentials from inbound HTTP headers.
    ///
    /// `HeaderMap` lookups ignore case, so `X-CY-ORG`, `x-cy-org` and
    /// `X-Cy-Org` are equivalent.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, CliError> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let organization = header(ORG_HEADER).ok_or_else(|| CliError::validation(ORG_HEADER))?;
        let api_key = header(API_KEY_HEADER).ok_or_else(|| CliError::validation(API_KEY_HEADER))?;
        Ok(Self { organization, api_key })
    }

    /// Read `CY_ORG` and `CY_API_KEY` from the process environment.
    pub fn from_env() -> Result<Self, CliError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, CliError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let organization = var(ORG_ENV).ok_or_else(|| CliError::validation(ORG_ENV))?;
        let api_key = var(API_KEY_ENV).ok_or_else(|| CliError::validation(API_KEY_ENV))?;
        Ok(Self { organization, api_key })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("organization", &self.organization)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}
