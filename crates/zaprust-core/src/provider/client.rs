//! WhatsApp provider HTTP client

use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use zaprust_common::types::{MediaKind, PhoneNumber};
use zaprust_common::{Error, Result};
use zaprust_storage::models::ApiKind;

use super::outcome::SendOutcome;

/// Provider client configuration
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider kind
    pub kind: ApiKind,
    /// Base URL of the gateway or cloud API
    pub server_url: String,
    /// Gateway instance name (Evolution) or phone number id (cloud API)
    pub instance_name: String,
    /// Decrypted access token
    pub access_token: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// HTTP client for sending WhatsApp messages through one provider
pub struct WhatsAppClient {
    config: ProviderConfig,
    client: Client,
}

impl WhatsAppClient {
    /// Create a new provider client
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Provider(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Normalize a destination number to the form this provider expects
    fn format_destination(&self, number: &str) -> String {
        if number.contains('@') {
            // Already a gateway JID
            return number.to_string();
        }

        match (self.config.kind, PhoneNumber::parse(number)) {
            // Self-hosted gateways address by JID
            (ApiKind::EvolutionWeb | ApiKind::EvolutionCloud, Some(phone)) => phone.whatsapp_jid(),
            (ApiKind::EvolutionWeb | ApiKind::EvolutionCloud, None) => {
                format!("{}@s.whatsapp.net", number)
            }
            // The cloud API takes bare digits
            (ApiKind::WhatsappCloud, Some(phone)) => phone.digits().to_string(),
            (ApiKind::WhatsappCloud, None) => number.trim_start_matches('+').to_string(),
        }
    }

    /// Build a request with this provider's auth header
    fn build_request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.server_url.trim_end_matches('/'), path);
        let request = self.client.request(method, &url);

        match self.config.kind {
            ApiKind::EvolutionWeb | ApiKind::EvolutionCloud => {
                request.header("apikey", &self.config.access_token)
            }
            ApiKind::WhatsappCloud => request.header(
                "Authorization",
                format!("Bearer {}", self.config.access_token),
            ),
        }
    }

    /// Send a text message
    pub async fn send_text(&self, number: &str, body: &str) -> SendOutcome {
        let destination = self.format_destination(number);

        let (path, payload) = match self.config.kind {
            ApiKind::EvolutionWeb | ApiKind::EvolutionCloud => (
                format!("/message/sendText/{}", self.config.instance_name),
                serde_json::json!({
                    "number": destination,
                    "text": body,
                }),
            ),
            ApiKind::WhatsappCloud => (
                format!("/{}/messages", self.config.instance_name),
                serde_json::json!({
                    "messaging_product": "whatsapp",
                    "recipient_type": "individual",
                    "to": destination,
                    "type": "text",
                    "text": { "preview_url": false, "body": body },
                }),
            ),
        };

        self.dispatch(&path, &payload).await
    }

    /// Send a media message with a caption
    pub async fn send_media(
        &self,
        number: &str,
        body: &str,
        media_url: &str,
        media_kind: MediaKind,
    ) -> SendOutcome {
        let destination = self.format_destination(number);

        let (path, payload) = match self.config.kind {
            ApiKind::EvolutionWeb | ApiKind::EvolutionCloud => (
                format!("/message/sendMedia/{}", self.config.instance_name),
                serde_json::json!({
                    "number": destination,
                    "mediatype": media_kind.to_string(),
                    "media": media_url,
                    "caption": body,
                }),
            ),
            ApiKind::WhatsappCloud => {
                let mut payload = serde_json::json!({
                    "messaging_product": "whatsapp",
                    "recipient_type": "individual",
                    "to": destination,
                    "type": media_kind.to_string(),
                });
                payload[media_kind.to_string().as_str()] = serde_json::json!({
                    "link": media_url,
                    "caption": body,
                });
                (format!("/{}/messages", self.config.instance_name), payload)
            }
        };

        self.dispatch(&path, &payload).await
    }

    /// Check connectivity to the provider
    pub async fn test_connection(&self) -> Result<()> {
        let path = match self.config.kind {
            ApiKind::EvolutionWeb | ApiKind::EvolutionCloud => {
                "/instance/fetchInstances".to_string()
            }
            ApiKind::WhatsappCloud => format!("/{}", self.config.instance_name),
        };

        let response = self
            .build_request(reqwest::Method::GET, &path)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Connection test failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Provider(format!(
                "Connection test failed: HTTP {}",
                status
            )));
        }

        // Evolution answers with the list of instances; the configured one
        // must be among them
        if matches!(
            self.config.kind,
            ApiKind::EvolutionWeb | ApiKind::EvolutionCloud
        ) {
            let instances: Value = response
                .json()
                .await
                .map_err(|e| Error::Provider(format!("Connection test failed: {}", e)))?;

            let found = instances
                .as_array()
                .map(|list| {
                    list.iter().any(|instance| {
                        instance
                            .get("instance_name")
                            .or_else(|| instance.pointer("/instance/instanceName"))
                            .and_then(Value::as_str)
                            == Some(self.config.instance_name.as_str())
                    })
                })
                .unwrap_or(false);

            if !found {
                return Err(Error::Provider(format!(
                    "Instance '{}' not found",
                    self.config.instance_name
                )));
            }
        }

        Ok(())
    }

    /// POST a payload and classify the response
    async fn dispatch(&self, path: &str, payload: &Value) -> SendOutcome {
        let response = match self
            .build_request(reqwest::Method::POST, path)
            .json(payload)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                // Timeouts and connection errors never reached the
                // provider, so a retry is safe
                warn!("Provider request error: {}", e);
                return SendOutcome::TemporaryFailure {
                    error: request_error_message(&e),
                };
            }
        };

        let status = response.status();
        if status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let provider_message_id = extract_message_id(&body);
            debug!(
                status = %status,
                message_id = provider_message_id.as_deref().unwrap_or("-"),
                "Provider accepted message"
            );
            return SendOutcome::Sent {
                provider_message_id,
            };
        }

        let body = response.text().await.unwrap_or_default();
        let error = format!("HTTP {}: {}", status.as_u16(), truncate(&body, 500));

        if is_retryable_status(status) {
            SendOutcome::TemporaryFailure { error }
        } else {
            SendOutcome::PermanentFailure { error }
        }
    }
}

/// Whether an HTTP status warrants a retry
fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}

/// Human-readable message for a reqwest error
fn request_error_message(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timed out".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else {
        format!("Request failed: {}", e)
    }
}

/// Pull the provider message id out of a send response.
///
/// Evolution returns `{"key": {"id": ...}}`; the cloud API returns
/// `{"messages": [{"id": ...}]}`.
fn extract_message_id(body: &Value) -> Option<String> {
    body.pointer("/key/id")
        .or_else(|| body.pointer("/messages/0/id"))
        .and_then(Value::as_str)
        .map(String::from)
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        s
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        &s[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn evolution_client(server_url: &str) -> WhatsAppClient {
        WhatsAppClient::new(ProviderConfig {
            kind: ApiKind::EvolutionWeb,
            server_url: server_url.to_string(),
            instance_name: "main".to_string(),
            access_token: "test-key".to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn cloud_client(server_url: &str) -> WhatsAppClient {
        WhatsAppClient::new(ProviderConfig {
            kind: ApiKind::WhatsappCloud,
            server_url: server_url.to_string(),
            instance_name: "123456789".to_string(),
            access_token: "cloud-token".to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_status_classification() {
        assert!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::REQUEST_TIMEOUT));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::FORBIDDEN));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_extract_message_id() {
        let evolution = serde_json::json!({"key": {"id": "ABC123"}});
        assert_eq!(extract_message_id(&evolution).as_deref(), Some("ABC123"));

        let cloud = serde_json::json!({"messages": [{"id": "wamid.XYZ"}]});
        assert_eq!(extract_message_id(&cloud).as_deref(), Some("wamid.XYZ"));

        assert_eq!(extract_message_id(&Value::Null), None);
    }

    #[tokio::test]
    async fn test_send_text_evolution_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/message/sendText/main"))
            .and(header("apikey", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "number": "5511912345678@s.whatsapp.net",
                "text": "hello",
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"key": {"id": "MSG1"}})),
            )
            .mount(&server)
            .await;

        let client = evolution_client(&server.uri());
        match client.send_text("5511912345678", "hello").await {
            SendOutcome::Sent {
                provider_message_id,
            } => assert_eq!(provider_message_id.as_deref(), Some("MSG1")),
            other => panic!("expected Sent, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_text_cloud_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/123456789/messages"))
            .and(header("Authorization", "Bearer cloud-token"))
            .and(body_partial_json(serde_json::json!({
                "messaging_product": "whatsapp",
                "to": "5511912345678",
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"messages": [{"id": "wamid.1"}]})),
            )
            .mount(&server)
            .await;

        let client = cloud_client(&server.uri());
        match client.send_text("+5511912345678", "hello").await {
            SendOutcome::Sent {
                provider_message_id,
            } => assert_eq!(provider_message_id.as_deref(), Some("wamid.1")),
            other => panic!("expected Sent, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_media_evolution() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/message/sendMedia/main"))
            .and(body_partial_json(serde_json::json!({
                "mediatype": "image",
                "media": "https://cdn.example.com/promo.jpg",
                "caption": "look at this",
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = evolution_client(&server.uri());
        let outcome = client
            .send_media(
                "5511912345678",
                "look at this",
                "https://cdn.example.com/promo.jpg",
                MediaKind::Image,
            )
            .await;
        assert!(matches!(outcome, SendOutcome::Sent { .. }));
    }

    #[tokio::test]
    async fn test_server_error_is_temporary() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/message/sendText/main"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let client = evolution_client(&server.uri());
        let outcome = client.send_text("5511912345678", "hello").await;
        match outcome {
            SendOutcome::TemporaryFailure { error } => assert!(error.contains("503")),
            other => panic!("expected TemporaryFailure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_auth_error_is_permanent() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/message/sendText/main"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad apikey"))
            .mount(&server)
            .await;

        let client = evolution_client(&server.uri());
        let outcome = client.send_text("5511912345678", "hello").await;
        match outcome {
            SendOutcome::PermanentFailure { error } => assert!(error.contains("401")),
            other => panic!("expected PermanentFailure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_temporary() {
        // Nothing listens on this port
        let client = evolution_client("http://127.0.0.1:1");
        let outcome = client.send_text("5511912345678", "hello").await;
        assert!(matches!(outcome, SendOutcome::TemporaryFailure { .. }));
    }

    #[tokio::test]
    async fn test_connection_check_finds_instance() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/instance/fetchInstances"))
            .and(header("apikey", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"instance_name": "other"},
                {"instance_name": "main"},
            ])))
            .mount(&server)
            .await;

        let client = evolution_client(&server.uri());
        assert!(client.test_connection().await.is_ok());
    }

    #[tokio::test]
    async fn test_connection_check_missing_instance() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/instance/fetchInstances"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{"instance_name": "other"}])),
            )
            .mount(&server)
            .await;

        let client = evolution_client(&server.uri());
        assert!(client.test_connection().await.is_err());
    }
}
