use std::time::Duration;
use tracing::warn;

pub use reqwest::Client as HttpClient;

pub const MAX_RETRIES: usize = 3;
pub const BASE_DELAY: Duration = Duration::from_millis(750);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Classified fetch failure; the retry loop only re-attempts transient
/// variants.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("rate limited (http 429)")]
    RateLimited,

    #[error("http status {0}")]
    Status(reqwest::StatusCode),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network(_) | FetchError::RateLimited => true,
            FetchError::Status(status) => status.is_server_error(),
        }
    }
}

/// Standard client: identified user-agent and a per-call timeout.
pub fn std_client_build(user_agent: &str) -> HttpClient {
    reqwest::ClientBuilder::new()
        .user_agent(user_agent)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("failed to build reqwest client")
}

/// GET `url` as text, retrying transient failures with exponential
/// backoff. Non-transient failures return immediately.
pub async fn fetch_text(client: &HttpClient, url: &str) -> Result<String, FetchError> {
    let mut delay = BASE_DELAY;
    let mut attempt = 0;

    loop {
        attempt += 1;
        let err = match send(client, url).await {
            Ok(body) => return Ok(body),
            Err(err) => err,
        };

        if attempt >= MAX_RETRIES || !err.is_transient() {
            return Err(err);
        }

        warn!("fetch attempt {attempt} failed for {url}, error({err}); retrying in {delay:?}");
        tokio::time::sleep(delay).await;
        delay *= 2;
    }
}

async fn send(client: &HttpClient, url: &str) -> Result<String, FetchError> {
    let response = client.get(url).send().await?;

    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchError::RateLimited);
    }
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }

    Ok(response.text().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(FetchError::RateLimited.is_transient());
        assert!(FetchError::Status(reqwest::StatusCode::BAD_GATEWAY).is_transient());
        assert!(!FetchError::Status(reqwest::StatusCode::NOT_FOUND).is_transient());
        assert!(!FetchError::Status(reqwest::StatusCode::FORBIDDEN).is_transient());
    }
}
