use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::time::Duration;
use url::form_urlencoded;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// Client for idempotent reads, retrying transient failures
    /// (exponential backoff, at most 3 retries).
    pub fn create_client() -> ClientWithMiddleware {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

        ClientBuilder::new(Self::create_plain_client())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build()
    }

    /// Client without retries, for requests that must not be replayed
    /// (sending a message twice is worse than not sending it).
    pub fn create_plain_client() -> Client {
        Client::builder()
            .pool_max_idle_per_host(5)
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new())
    }
}

/// Append URL-encoded query parameters to `base_url`.
///
/// The middleware request builder has no `.query()`, so the query string is
/// built up front.
pub fn build_url_with_query<K, V>(base_url: &str, params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if params.is_empty() {
        return base_url.to_string();
    }

    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|(k, v)| (k.as_ref(), v.as_ref())))
        .finish();

    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", base_url, separator, query)
}
