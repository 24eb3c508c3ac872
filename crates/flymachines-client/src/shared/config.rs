use crate::shared::error::{MachinesError, MachinesResult};
use reqwest::Url;

pub const PUBLIC_BASE_URL: &str = "https://api.machines.dev";
pub const PRIVATE_BASE_URL: &str = "http://_api.internal:4280";
pub const DEFAULT_BASE_URL: &str = PUBLIC_BASE_URL;

pub const API_HOSTNAME_ENV: &str = "FLY_API_HOSTNAME";
pub const API_TOKEN_ENV: &str = "FLY_API_TOKEN";

/// Connection settings for a [`crate::MachinesClient`].
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_token: String,
    pub app_name: String,
}

impl ClientConfig {
    pub fn new(app_name: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token: api_token.into(),
            app_name: app_name.into(),
        }
    }

    /// Reads `FLY_API_HOSTNAME` and `FLY_API_TOKEN`, falling back to the
    /// public endpoint and an empty token.
    pub fn from_env(app_name: impl Into<String>) -> Self {
        Self::from_lookup(app_name, |key| std::env::var(key).ok())
    }

    fn from_lookup<F>(app_name: impl Into<String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            base_url: lookup(API_HOSTNAME_ENV).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_token: lookup(API_TOKEN_ENV).unwrap_or_default(),
            app_name: app_name.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_token(mut self, api_token: impl Into<String>) -> Self {
        self.api_token = api_token.into();
        self
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    pub fn validate(&self) -> MachinesResult<()> {
        if self.app_name.is_empty() {
            return Err(MachinesError::AppNameRequired);
        }
        if self.api_token.is_empty() {
            return Err(MachinesError::AuthRequired);
        }
        Ok(())
    }

    /// Absolute URL for an app-scoped path, `{base_url}/v1/apps/{app}/{segments..}`.
    ///
    /// The app name and every segment are percent-encoded one at a time, so a
    /// machine id can never add path segments, a query or a fragment.
    pub fn url_for(&self, segments: &[&str]) -> MachinesResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| MachinesError::InvalidRequest(format!("invalid base url: {e}")))?;

        if let Some(segment) = std::iter::once(self.app_name.as_str())
            .chain(segments.iter().copied())
            .find(|s| s.is_empty() || *s == "." || *s == "..")
        {
            return Err(MachinesError::InvalidRequest(format!(
                "invalid path segment '{segment}'"
            )));
        }

        url.path_segments_mut()
            .map_err(|_| {
                MachinesError::InvalidRequest(format!("invalid base url: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(["v1", "apps", self.app_name.as_str()])
            .extend(segments);
        Ok(url)
    }
}

// The token is a credential; keep it out of debug output.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"<redacted>")
            .field("app_name", &self.app_name)
            .finish()
    }
}
