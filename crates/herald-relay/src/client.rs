// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the relay API.
//!
//! Every call is a JSON `POST` carrying the account API key in the body.
//! Transport failures and 5xx/429 replies surface as [`HeraldError::Channel`]
//! (worth retrying); other 4xx replies as [`HeraldError::Validation`].

use std::time::Duration;

use herald_config::model::RelayConfig;
use herald_core::{HeraldError, MessageId};
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::types::{
    DeviceState, DeviceStatusResponse, NumberKeyRequest, PairRequest, PairResponse, RelayReply,
    SendFileRequest, SendImageRequest, SendTextRequest,
};

#[derive(Debug, Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RelayClient {
    pub fn new(config: &RelayConfig) -> Result<Self, HeraldError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| HeraldError::Config("relay.api_key is not set".into()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| HeraldError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn post<B, R>(&self, endpoint: &str, body: &B) -> Result<R, HeraldError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{endpoint}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| HeraldError::Channel {
                message: format!("relay request to /{endpoint} failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(endpoint, status = %status, "relay response received");
        let text = response.text().await.map_err(|e| HeraldError::Channel {
            message: format!("failed to read relay response: {e}"),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            let detail = serde_json::from_str::<RelayReply>(&text)
                .ok()
                .and_then(|r| r.message)
                .unwrap_or(text);
            let message = format!("relay returned {status} for /{endpoint}: {detail}");
            return Err(if is_transient_status(status) {
                HeraldError::channel(message)
            } else {
                HeraldError::Validation(message)
            });
        }

        serde_json::from_str(&text).map_err(|e| HeraldError::Channel {
            message: format!("unexpected relay response from /{endpoint}: {e}"),
            source: Some(Box::new(e)),
        })
    }

    /// Starts (or resumes) linking a device for the tenant.
    pub async fn pair(&self, tenant: &str) -> Result<PairResponse, HeraldError> {
        self.post(
            "pair",
            &PairRequest {
                api_key: &self.api_key,
                tenant,
            },
        )
        .await
    }

    pub async fn device_status(&self, number_key: &str) -> Result<DeviceState, HeraldError> {
        let reply: DeviceStatusResponse = self
            .post(
                "device_status",
                &NumberKeyRequest {
                    api_key: &self.api_key,
                    number_key,
                },
            )
            .await?;
        Ok(reply.status)
    }

    pub async fn send_text(
        &self,
        number_key: &str,
        phone_no: &str,
        message: &str,
    ) -> Result<MessageId, HeraldError> {
        let reply = self
            .post(
                "send_message",
                &SendTextRequest {
                    api_key: &self.api_key,
                    number_key,
                    phone_no,
                    message,
                },
            )
            .await?;
        accepted(reply)
    }

    pub async fn send_image(
        &self,
        number_key: &str,
        phone_no: &str,
        url: &str,
        caption: &str,
    ) -> Result<MessageId, HeraldError> {
        let reply = self
            .post(
                "send_image_url",
                &SendImageRequest {
                    api_key: &self.api_key,
                    number_key,
                    phone_no,
                    url,
                    message: caption,
                    separate_caption: "0",
                },
            )
            .await?;
        accepted(reply)
    }

    pub async fn send_file(
        &self,
        number_key: &str,
        phone_no: &str,
        url: &str,
        file_name: &str,
        message: &str,
    ) -> Result<MessageId, HeraldError> {
        let reply = self
            .post(
                "send_file_url",
                &SendFileRequest {
                    api_key: &self.api_key,
                    number_key,
                    phone_no,
                    url,
                    file_name,
                    message,
                },
            )
            .await?;
        accepted(reply)
    }

    pub async fn logout(&self, number_key: &str) -> Result<(), HeraldError> {
        let reply: RelayReply = self
            .post(
                "logout",
                &NumberKeyRequest {
                    api_key: &self.api_key,
                    number_key,
                },
            )
            .await?;
        if reply.is_ok() {
            Ok(())
        } else {
            Err(HeraldError::channel(format!(
                "relay refused logout: {}",
                reply.message.unwrap_or_default()
            )))
        }
    }
}

fn accepted(reply: RelayReply) -> Result<MessageId, HeraldError> {
    if !reply.is_ok() {
        return Err(HeraldError::channel(format!(
            "relay did not accept the message: {}",
            reply.message.unwrap_or_else(|| "no reason given".into())
        )));
    }
    Ok(MessageId(reply.id.unwrap_or_default()))
}

/// Status codes worth retrying.
fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error()
        || matches!(
            status,
            StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> RelayClient {
        RelayClient::new(&RelayConfig {
            api_url: format!("{base_url}/"),
            api_key: Some("test-api-key".into()),
            ..RelayConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let err = RelayClient::new(&RelayConfig::default()).unwrap_err();
        assert!(matches!(err, HeraldError::Config(_)));
    }

    #[tokio::test]
    async fn send_text_posts_the_expected_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send_message"))
            .and(body_partial_json(serde_json::json!({
                "api_key": "test-api-key",
                "number_key": "nk1",
                "phone_no": "6281234567890",
                "message": "hello"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "200", "id": "m-1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let id = test_client(&server.uri())
            .send_text("nk1", "6281234567890", "hello")
            .await
            .unwrap();
        assert_eq!(id.0, "m-1");
    }

    #[tokio::test]
    async fn image_caption_is_sent_inline() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send_image_url"))
            .and(body_partial_json(serde_json::json!({
                "url": "https://cdn.example.com/a.png",
                "message": "caption",
                "separate_caption": "0"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": 200})))
            .expect(1)
            .mount(&server)
            .await;

        test_client(&server.uri())
            .send_image("nk1", "628123", "https://cdn.example.com/a.png", "caption")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejected_payload_is_not_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send_message"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"message": "phone_no not registered"})),
            )
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .send_text("nk1", "628123", "hi")
            .await
            .unwrap_err();
        assert!(!err.is_transient());
        assert!(err.to_string().contains("phone_no not registered"), "got: {err}");
    }

    #[tokio::test]
    async fn server_errors_are_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send_message"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .send_text("nk1", "628123", "hi")
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn ok_http_with_failed_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send_message"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "500", "message": "device offline"})),
            )
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .send_text("nk1", "628123", "hi")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("device offline"));
    }

    #[tokio::test]
    async fn device_status_parses_states() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/device_status"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "logged_out"})),
            )
            .mount(&server)
            .await;

        let state = test_client(&server.uri()).device_status("nk1").await.unwrap();
        assert_eq!(state, DeviceState::LoggedOut);
    }
}
