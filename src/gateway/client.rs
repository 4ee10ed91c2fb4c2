//! Shared HTTP transport for every backend call.
//!
//! Failures are classified once, here, into the four classes the screens
//! message differently: auth required, server error, timeout, and the rest.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::{ConfigError, GatewayError};

/// REST client for the nutrition backend.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<SecretString>,
    request_timeout: Duration,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.access_token.is_some())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("nutri-flow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            request_timeout: config.request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Same client with a different bearer token (after login/logout).
    pub fn with_access_token(mut self, token: Option<SecretString>) -> Self {
        self.access_token = token;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, GatewayError> {
        let request = self.request(Method::GET, path);
        self.send(request, path, self.request_timeout).await
    }

    /// GET with query parameters, e.g. `&[("days", 30)]`.
    pub async fn get_json_with_query<Q, R>(&self, path: &str, query: &Q) -> Result<R, GatewayError>
    where
        Q: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = self.request(Method::GET, path).query(query);
        self.send(request, path, self.request_timeout).await
    }

    pub async fn post_json<B, R>(
        &self,
        path: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<R, GatewayError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = self.request(Method::POST, path).json(body);
        self.send(request, path, timeout).await
    }

    pub async fn put_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, GatewayError> {
        let request = self.request(Method::PUT, path);
        self.send(request, path, self.request_timeout).await
    }

    pub async fn put_json_body<B, R>(&self, path: &str, body: &B) -> Result<R, GatewayError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = self.request(Method::PUT, path).json(body);
        self.send(request, path, self.request_timeout).await
    }

    pub async fn delete_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, GatewayError> {
        let request = self.request(Method::DELETE, path);
        self.send(request, path, self.request_timeout).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.http.request(method, self.url(path));
        match &self.access_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    async fn send<R: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
        timeout: Duration,
    ) -> Result<R, GatewayError> {
        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_transport(&e, timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_transport(&e, timeout))?;

        if !status.is_success() {
            let err = classify_status(status, &body, timeout);
            tracing::warn!(
                path,
                status = status.as_u16(),
                kind = %err.kind(),
                "Backend call failed"
            );
            return Err(err);
        }

        tracing::debug!(path, status = status.as_u16(), "Backend call succeeded");
        serde_json::from_str(&body).map_err(|e| GatewayError::InvalidResponse {
            reason: format!("{path}: {e}"),
        })
    }
}

/// Map a non-2xx status to a gateway error.
pub fn classify_status(status: StatusCode, body: &str, timeout: Duration) -> GatewayError {
    let detail = extract_detail(body);
    let code = status.as_u16();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::AuthRequired {
            status: code,
            detail,
        },
        StatusCode::REQUEST_TIMEOUT => GatewayError::Timeout { timeout },
        s if s.is_server_error() => GatewayError::ServiceUnavailable {
            status: code,
            detail,
        },
        _ => GatewayError::Rejected {
            status: code,
            detail,
        },
    }
}

fn classify_transport(err: &reqwest::Error, timeout: Duration) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout { timeout }
    } else {
        GatewayError::Transport {
            reason: err.to_string(),
        }
    }
}

/// Pull a FastAPI-style `detail` out of an error body. Validation errors
/// carry a list of objects with `msg` fields.
fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            (!msgs.is_empty()).then(|| msgs.join("; "))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    const T: Duration = Duration::from_secs(1);

    #[test]
    fn classifies_auth_statuses() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            let err = classify_status(status, r#"{"detail":"Not authenticated"}"#, T);
            assert_eq!(err.kind(), FailureKind::AuthRequired);
            assert_eq!(err.detail(), Some("Not authenticated"));
        }
    }

    #[test]
    fn classifies_server_errors() {
        for status in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            assert_eq!(
                classify_status(status, "", T).kind(),
                FailureKind::ServiceUnavailable
            );
        }
    }

    #[test]
    fn request_timeout_status_is_timeout() {
        let err = classify_status(StatusCode::REQUEST_TIMEOUT, "", T);
        assert!(matches!(err, GatewayError::Timeout { timeout } if timeout == T));
    }

    #[test]
    fn other_client_errors_are_unknown() {
        let err = classify_status(StatusCode::NOT_FOUND, r#"{"detail":"Booking not found"}"#, T);
        assert_eq!(err.kind(), FailureKind::Unknown);
        assert_eq!(err.detail(), Some("Booking not found"));
    }

    #[test]
    fn extracts_validation_detail_list() {
        let body = r#"{"detail":[{"loc":["body","weight"],
            "msg":"ensure this value is greater than or equal to 20"}]}"#;
        assert_eq!(
            extract_detail(body).as_deref(),
            Some("ensure this value is greater than or equal to 20")
        );
        assert_eq!(extract_detail("<html>oops</html>"), None);
        assert_eq!(extract_detail(r#"{"error":"x"}"#), None);
    }

    #[test]
    fn url_joins_cleanly() {
        let config = ClientConfig {
            base_url: "http://localhost:8000/api/".to_string(),
            ..ClientConfig::default()
        };
        let client = ApiClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000/api");
        assert_eq!(
            client.url("/dietplan/generate"),
            "http://localhost:8000/api/dietplan/generate"
        );
        assert_eq!(
            client.url("consultations/book"),
            "http://localhost:8000/api/consultations/book"
        );
    }

    #[test]
    fn debug_hides_token() {
        let config = ClientConfig {
            access_token: Some(SecretString::from("super-secret")),
            ..ClientConfig::default()
        };
        let client = ApiClient::new(&config).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("authenticated: true"));
    }
}
