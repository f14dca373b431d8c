//! Notification channel configuration parsing from environment variables.

use std::env;

/// Twilio credentials and routing for alert delivery
#[derive(Clone)]
pub struct NotifierEnvConfig {
    pub twilio_sid: String,
    pub twilio_auth_token: String,
    pub twilio_from: String,
    pub twilio_to: String,
    pub twilio_api_url: String,
}

impl Default for NotifierEnvConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl NotifierEnvConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            twilio_sid: var("TWILIO_SID").unwrap_or_default(),
            twilio_auth_token: var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            twilio_from: var("TWILIO_FROM")
                .unwrap_or_else(|| "whatsapp:+14155238886".to_string()),
            twilio_to: var("TWILIO_TO").unwrap_or_default(),
            twilio_api_url: var("TWILIO_API_URL")
                .unwrap_or_else(|| "https://api.twilio.com".to_string()),
        }
    }

    /// Credentials and recipient are all present
    pub fn is_configured(&self) -> bool {
        [&self.twilio_sid, &self.twilio_auth_token, &self.twilio_to]
            .iter()
            .all(|v| !v.trim().is_empty())
    }
}

// Keep the auth token out of logs
impl std::fmt::Debug for NotifierEnvConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifierEnvConfig")
            .field("twilio_sid", &self.twilio_sid)
            .field("twilio_auth_token", &"<redacted>")
            .field("twilio_from", &self.twilio_from)
            .field("twilio_to", &self.twilio_to)
            .field("twilio_api_url", &self.twilio_api_url)
            .finish()
    }
}
