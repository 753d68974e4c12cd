//! Transactional Email Notifier
//!
//! Delivers tamper alerts through an HTTP mail API. The API key is held
//! in configuration loaded from the environment, never in source.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::alert::notifier::{AlertError, Notifier};
use crate::config::AlertConfig;

pub struct HttpMailer {
    client: reqwest::Client,
    config: AlertConfig,
}

impl HttpMailer {
    pub fn new(config: AlertConfig) -> Result<Self, AlertError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Notifier for HttpMailer {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), AlertError> {
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({
                "from": self.config.from,
                "to": self.config.recipient,
                "subject": subject,
                "text": body,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AlertError::Api(format!(
                "mail API returned HTTP {}",
                status.as_u16()
            )));
        }

        debug!("alert mail accepted for {}", self.config.recipient);
        Ok(())
    }

    fn name(&self) -> &str {
        "http-mailer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mailer_for(server: &MockServer) -> HttpMailer {
        HttpMailer::new(AlertConfig {
            api_url: format!("{}/messages", server.uri()),
            api_key: "test-key".to_string(),
            from: "ledger@example.com".to_string(),
            recipient: "ops@example.com".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn posts_message_with_bearer_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "to": "ops@example.com",
                "subject": "chain broken",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mailer = mailer_for(&server);
        mailer.notify("chain broken", "details").await.unwrap();
    }

    #[tokio::test]
    async fn non_success_status_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mailer = mailer_for(&server);
        let err = mailer.notify("subject", "body").await.unwrap_err();
        assert!(matches!(err, AlertError::Api(_)));
    }
}
