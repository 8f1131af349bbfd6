// Remote image download for sources given as URLs.

use std::time::Duration;

use bytes::Bytes;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::retry::{RetryPolicy, retry};

const FETCH_ENDPOINT: &str = "fetch";

const FETCH_POLICY: RetryPolicy = RetryPolicy {
    max_attempts: 1,
    timeout: Duration::from_secs(30),
    delay: Duration::ZERO,
};

/// Download the image at `url`. Anything but HTTP 200 is an error.
pub async fn fetch_image(http: &reqwest::Client, url: &Url) -> Result<Bytes, Error> {
    debug!(%url, "downloading image");
    retry(FETCH_POLICY, FETCH_ENDPOINT, || async move {
        let resp = http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::transport(FETCH_ENDPOINT, e))?;
        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::transport(FETCH_ENDPOINT, e))?;
        if status != 200 {
            return Err(Error::UnexpectedStatus {
                endpoint: FETCH_ENDPOINT.to_owned(),
                status,
                body: String::from_utf8_lossy(&body).chars().take(200).collect(),
            });
        }
        Ok(body)
    })
    .await
}
