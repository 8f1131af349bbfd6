use bytes::Bytes;
use tracing::trace;

use super::{PreparedRequest, RawResponse, Transport};
use crate::endpoint::Method;
use crate::error::Error;

/// `reqwest`-backed transport for well-behaved endpoints.
#[derive(Debug, Clone)]
pub struct StrictTransport {
    http: reqwest::Client,
}

impl StrictTransport {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Transport for StrictTransport {
    async fn execute(&self, request: &PreparedRequest) -> Result<RawResponse, Error> {
        let builder = match request.method {
            Method::Get => self.http.get(request.url.clone()),
            Method::Post => self.http.post(request.url.clone()),
        };
        let builder = builder.header(reqwest::header::ACCEPT, request.shape.accept());
        let builder = match &request.body {
            Some(part) => builder
                .header(reqwest::header::CONTENT_TYPE, part.content_type())
                .body(part.body.clone()),
            None => builder,
        };

        let resp = builder
            .send()
            .await
            .map_err(|e| Error::transport(request.endpoint, e))?;
        let status = resp.status().as_u16();
        let body: Bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::transport(request.endpoint, e))?;
        trace!(endpoint = request.endpoint, status, len = body.len(), "strict response");

        Ok(RawResponse { status, body })
    }
}
