//! Shared HTTP plumbing for the driver backends.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};

use crate::config::default_user_agent;
use crate::error::{DriverError, DriverResult};

/// Builds an HTTP client with the given request timeout.
pub(crate) fn build_client(timeout: Duration) -> DriverResult<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(default_user_agent())
        .build()
        .map_err(|err| DriverError::invalid_config(err.to_string()))
}

/// Attaches bearer authentication when a token is configured.
pub(crate) fn authorized(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

/// Converts a non-success response into a reported failure.
///
/// The body is truncated so oversized error pages cannot balloon runner
/// messages downstream.
pub(crate) async fn failure_from_response(response: Response) -> DriverError {
    let status = response.status();
    let body: Option<String> = response
        .text()
        .await
        .ok()
        .map(|b| b.chars().take(1024).collect::<String>())
        .filter(|b| !b.trim().is_empty());

    match body {
        Some(body) => DriverError::reported_failure(format!("HTTP {status}: {body}")),
        None => DriverError::reported_failure(format!("HTTP {status}")),
    }
}
