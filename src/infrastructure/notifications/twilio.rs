use crate::domain::errors::NotificationError;
use crate::domain::ports::Notifier;
use crate::infrastructure::core::http_client_factory::HttpClientFactory;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

/// Sends alerts through the Twilio Messages API (WhatsApp or SMS).
pub struct TwilioNotifier {
    client: Client,
    api_url: String,
    account_sid: String,
    auth_token: String,
    from: String,
    to: String,
}

impl TwilioNotifier {
    pub fn new(
        api_url: String,
        account_sid: String,
        auth_token: String,
        from: String,
        to: String,
    ) -> Result<Self, NotificationError> {
        let missing: Vec<&str> = [
            ("TWILIO_SID", &account_sid),
            ("TWILIO_AUTH_TOKEN", &auth_token),
            ("TWILIO_FROM", &from),
            ("TWILIO_TO", &to),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(NotificationError::NotConfigured {
                reason: format!("missing {}", missing.join(", ")),
            });
        }

        Ok(Self {
            // Message sends are not idempotent: no retry middleware
            client: HttpClientFactory::create_plain_client(),
            api_url: api_url.trim_end_matches('/').to_string(),
            account_sid,
            auth_token,
            from,
            to,
        })
    }

    pub fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_url, self.account_sid
        )
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotificationError> {
        let form = [
            ("From", self.from.as_str()),
            ("To", self.to.as_str()),
            ("Body", message),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| NotificationError::SendFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!("TwilioNotifier: Accepted with status {}", status);
        info!("TwilioNotifier: Message delivered to {}", self.to);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "twilio"
    }
}
