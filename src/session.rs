use reqwest::blocking::RequestBuilder;
use std::fmt;

use crate::settings::Settings;

pub const API_TOKEN_ENV: &str = "LECTIO_API_TOKEN";

/// Credentials and endpoint for backend calls. Built once at startup and
/// handed to every collaborator that talks to the API.
#[derive(Clone)]
pub struct Session {
    api_base_url: String,
    token: Option<String>,
}

impl Session {
    pub fn new(api_base_url: impl Into<String>, token: Option<String>) -> Self {
        let api_base_url = api_base_url.into().trim_end_matches('/').to_string();
        let token = token.filter(|t| !t.trim().is_empty());
        Self {
            api_base_url,
            token,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.api_base_url.clone(),
            std::env::var(API_TOKEN_ENV).ok(),
        )
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path.trim_start_matches('/'))
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Attaches the bearer token, if any, to an outgoing request.
    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("api_base_url", &self.api_base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
