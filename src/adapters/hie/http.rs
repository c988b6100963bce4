//! Shared reqwest plumbing for the network and internal API clients

use crate::domain::{GatewayError, HieError, Result};
use reqwest::{Client, ClientBuilder, RequestBuilder, Response};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::SecretString;

const API_KEY_HEADER: &str = "x-api-key";

/// Build a client with request and connect timeouts
pub fn build_http_client(timeout_seconds: u64) -> Result<Client> {
    ClientBuilder::new()
        .timeout(Duration::from_secs(timeout_seconds))
        .connect_timeout(Duration::from_secs(timeout_seconds.min(10)))
        .user_agent(concat!("hie-orchestrator/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| HieError::Configuration(format!("Failed to build HTTP client: {e}")))
}

/// Join a base URL and a path without doubling slashes
pub fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

pub fn with_api_key(request: RequestBuilder, api_key: Option<&SecretString>) -> RequestBuilder {
    match api_key {
        Some(key) => request.header(API_KEY_HEADER, key.expose_secret().as_str()),
        None => request,
    }
}

/// Send a request, mapping transport failures and non-2xx statuses
pub async fn send(request: RequestBuilder, url: &str) -> std::result::Result<Response, GatewayError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            GatewayError::Timeout(format!("{url}: {e}"))
        } else {
            GatewayError::ConnectionFailed(format!("{url}: {e}"))
        }
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    if status.is_server_error() {
        Err(GatewayError::ServerError {
            status: status.as_u16(),
            message,
        })
    } else {
        Err(GatewayError::ClientError {
            status: status.as_u16(),
            message,
        })
    }
}

/// Decode a JSON response body
pub async fn read_json<T: DeserializeOwned>(
    response: Response,
    url: &str,
) -> std::result::Result<T, GatewayError> {
    response
        .json::<T>()
        .await
        .map_err(|e| GatewayError::InvalidResponse(format!("{url}: {e}")))
}
