// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::future::Future;
use std::time::Duration;

use log::debug;
use reqwest::StatusCode;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const USER_AGENT: &str = concat!("trailmap/", env!("CARGO_PKG_VERSION"));

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Standard reason phrase for the status, e.g. "Unauthorized" for 401.
    #[must_use]
    pub fn canonical_reason(&self) -> Option<&'static str> {
        StatusCode::from_u16(self.status)
            .ok()
            .and_then(|status| status.canonical_reason())
    }
}

/// The request never produced a response.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Minimal async GET used by the remote services.
pub trait HttpTransport: Send + Sync + 'static {
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// [`HttpTransport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TransportError(e.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        debug!("HTTP {} with {} byte body", status, body.len());
        Ok(HttpResponse { status, body })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        let ok = HttpResponse { status: 204, body: String::new() };
        let redirect = HttpResponse { status: 301, body: String::new() };
        assert!(ok.is_success());
        assert!(!redirect.is_success());
    }

    #[test]
    fn test_canonical_reason() {
        let response = HttpResponse { status: 401, body: String::new() };
        assert_eq!(response.canonical_reason(), Some("Unauthorized"));

        let unknown = HttpResponse { status: 599, body: String::new() };
        assert_eq!(unknown.canonical_reason(), None);
    }

    #[tokio::test]
    async fn test_fake_transport_replays_in_order() {
        let transport = fake::FakeTransport::new().respond(200, "first").fail("offline");

        assert_eq!(transport.get("http://a").await.unwrap().body, "first");
        assert_eq!(transport.get("http://b").await.unwrap_err().0, "offline");
        assert!(transport.get("http://c").await.is_err());
        assert_eq!(transport.calls(), 3);
        assert_eq!(transport.urls()[1], "http://b");
    }
}
