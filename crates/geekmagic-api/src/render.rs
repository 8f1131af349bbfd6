// HTML render service client.
//
// The device can only show images, so HTML content is rasterized by an
// external service first: `POST <render_url>` with `{"html": ...}` returns
// the JPEG bytes.

use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::retry::RetryPolicy;

const RENDER_ENDPOINT: &str = "render";

#[derive(Serialize)]
struct RenderRequest<'a> {
    html: &'a str,
}

/// Client for an HTML-to-image render service.
#[derive(Debug, Clone)]
pub struct RenderClient {
    http: reqwest::Client,
    url: Url,
    policy: RetryPolicy,
}

impl RenderClient {
    pub fn new(http: reqwest::Client, url: Url) -> Self {
        Self {
            http,
            url,
            policy: RetryPolicy {
                max_attempts: 1,
                timeout: Duration::from_secs(30),
                delay: Duration::ZERO,
            },
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Render `html` into image bytes. Anything but HTTP 200 is an error.
    pub async fn render(&self, html: &str) -> Result<Bytes, Error> {
        debug!(url = %self.url, len = html.len(), "rendering HTML");
        crate::retry::retry(self.policy, RENDER_ENDPOINT, || async move {
            let resp = self
                .http
                .post(self.url.clone())
                .json(&RenderRequest { html })
                .send()
                .await
                .map_err(|e| Error::transport(RENDER_ENDPOINT, e))?;
            let status = resp.status().as_u16();
            let body = resp
                .bytes()
                .await
                .map_err(|e| Error::transport(RENDER_ENDPOINT, e))?;
            if status != 200 {
                return Err(Error::UnexpectedStatus {
                    endpoint: RENDER_ENDPOINT.to_owned(),
                    status,
                    body: String::from_utf8_lossy(&body).chars().take(200).collect(),
                });
            }
            Ok(body)
        })
        .await
    }
}
