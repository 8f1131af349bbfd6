// Device HTTP client
//
// Wraps both transports with device-specific URL construction, status
// mapping, and the bounded retry policy. Callers never see raw HTTP: every
// operation returns a typed value or an `Error` tagged with its endpoint.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::endpoint::{Endpoint, EndpointRequest, Multipart, TransportKind, wire_bool};
use crate::error::Error;
use crate::listing::{ImageDirectory, parse_file_list};
use crate::models::{
    BrightnessResponse, DeviceStatus, SpaceResponse, ThemeResponse, VersionResponse,
};
use crate::retry::{RetryPolicy, retry};
use crate::transport::{
    LenientTransport, PreparedRequest, RawResponse, StrictTransport, Transport, TransportConfig,
};

/// Theme id of the photo-album display, shared by every firmware variant.
pub const PHOTO_ALBUM_THEME: i64 = 3;

/// Tuning knobs for a [`DeviceClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Budget for status queries and `/set` / `/delete` calls.
    pub query_retry: RetryPolicy,
    /// Budget for `/doUpload`.
    pub upload_retry: RetryPolicy,
    /// Append `_=<unix millis>` to status queries. Some firmware revisions
    /// serve stale JSON from cache without it.
    pub cache_buster: bool,
    pub transport: TransportConfig,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            query_retry: RetryPolicy::query(),
            upload_retry: RetryPolicy::upload(),
            cache_buster: false,
            transport: TransportConfig::default(),
        }
    }
}

impl ClientOptions {
    /// Override both per-attempt deadlines.
    pub fn with_timeouts(mut self, query: Duration, upload: Duration) -> Self {
        self.query_retry = self.query_retry.with_timeout(query);
        self.upload_retry = self.upload_retry.with_timeout(upload);
        self
    }
}

/// HTTP client for one GeekMagic device.
///
/// Cheap to share behind an `Arc`; holds no per-request state.
#[derive(Debug, Clone)]
pub struct DeviceClient {
    base_url: Url,
    strict: StrictTransport,
    lenient: LenientTransport,
    options: ClientOptions,
}

impl DeviceClient {
    /// Create a client for `host`, which may be a bare address
    /// (`192.168.1.50`, `frame.local:8080`) or a full `http://` URL.
    pub fn new(host: &str, options: ClientOptions) -> Result<Self, Error> {
        let base_url = device_url(host)?;
        let http = options.transport.build_client()?;
        Ok(Self::with_client(http, base_url, options))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, options: ClientOptions) -> Self {
        Self {
            base_url,
            strict: StrictTransport::new(http),
            lenient: LenientTransport::new(&options.transport),
            options,
        }
    }

    /// The device base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Status queries ───────────────────────────────────────────────

    /// Fetch theme, brightness and model in one pass.
    ///
    /// The three endpoints are independent: a 404 or an exhausted retry on
    /// one of them just leaves that field `None`. Only when every endpoint
    /// failed is the device reported unreachable.
    pub async fn get_status(&self) -> Result<DeviceStatus, Error> {
        let mut status = DeviceStatus::default();
        let mut failures: Vec<Error> = Vec::new();

        match self.get_theme().await {
            Ok(v) => status.theme = v,
            Err(e) => failures.push(e),
        }
        match self.get_brightness().await {
            Ok(v) => status.brightness = v,
            Err(e) => failures.push(e),
        }
        match self.get_model().await {
            Ok(v) => status.model = v,
            Err(e) => failures.push(e),
        }

        if failures.len() == 3 {
            let reason = failures
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::ConnectFailed {
                url: self.base_url.to_string(),
                reason,
            });
        }
        for e in &failures {
            warn!(error = %e, "status field unavailable, keeping last known value");
        }

        Ok(status)
    }

    /// `GET /app.json` -- active theme id.
    pub async fn get_theme(&self) -> Result<Option<i64>, Error> {
        let resp: Option<ThemeResponse> = self.get_json(Endpoint::Theme).await?;
        Ok(resp.and_then(|r| r.theme))
    }

    /// `GET /brt.json` -- backlight brightness.
    pub async fn get_brightness(&self) -> Result<Option<i64>, Error> {
        let resp: Option<BrightnessResponse> = self.get_json(Endpoint::Brightness).await?;
        Ok(resp.and_then(|r| r.brt))
    }

    /// `GET /v.json` -- model string, e.g. `SmallTV-Ultra`.
    pub async fn get_model(&self) -> Result<Option<String>, Error> {
        let resp: Option<VersionResponse> = self.get_json(Endpoint::Version).await?;
        Ok(resp.and_then(|r| r.m))
    }

    /// `GET /space.json` -- free flash in bytes.
    pub async fn get_free_space(&self) -> Result<Option<u64>, Error> {
        let resp: Option<SpaceResponse> = self.get_json(Endpoint::Space).await?;
        Ok(resp
            .and_then(|r| r.free)
            .and_then(|free| u64::try_from(free).ok()))
    }

    // ── Directory listings ───────────────────────────────────────────

    /// List files in `dir`, or an empty list if the listing failed.
    ///
    /// Listing failures are logged, never raised.
    pub async fn list_images(&self, dir: ImageDirectory) -> Vec<String> {
        match self.try_list_images(dir).await {
            Ok(files) => files,
            Err(e) => {
                error!(%dir, error = %e, "error fetching image list");
                Vec::new()
            }
        }
    }

    /// List files in `dir`, surfacing fetch errors.
    ///
    /// `GET /filelist?dir=<dir>` over the lenient transport.
    pub async fn try_list_images(&self, dir: ImageDirectory) -> Result<Vec<String>, Error> {
        let req = EndpointRequest::new(Endpoint::FileList, self.options.query_retry)
            .param("dir", dir.path());
        let html = self.fetch(req, decode_text).await?;
        let files = parse_file_list(&html, dir);
        debug!(%dir, count = files.len(), "listed images");
        Ok(files)
    }

    // ── Control ──────────────────────────────────────────────────────

    /// `GET /set?theme=<id>`
    pub async fn set_theme(&self, theme: i64) -> Result<(), Error> {
        self.control(self.set().param("theme", theme)).await
    }

    /// `GET /set?brt=<value>`
    pub async fn set_brightness(&self, value: u8) -> Result<(), Error> {
        self.control(self.set().param("brt", value)).await
    }

    /// Show `/image/<filename>`.
    ///
    /// Setting the image alone does not change what is on screen unless the
    /// photo-album theme is active, so `force_theme_switch` follows up with
    /// `set_theme(PHOTO_ALBUM_THEME)`.
    pub async fn set_image(
        &self,
        filename: &str,
        timeout: Option<u32>,
        force_theme_switch: bool,
    ) -> Result<(), Error> {
        let req = self
            .set()
            .param("img", ImageDirectory::Image.file_path(filename))
            .param_opt("timeout", timeout);
        self.control(req).await?;
        if force_theme_switch {
            self.set_theme(PHOTO_ALBUM_THEME).await?;
        }
        Ok(())
    }

    /// `GET /set?gif=/gif/<filename>` -- small image of the weather themes.
    pub async fn set_small_image(&self, filename: &str) -> Result<(), Error> {
        let req = self
            .set()
            .param("gif", ImageDirectory::Gif.file_path(filename));
        self.control(req).await
    }

    /// `GET /delete?file=/image/<filename>`
    pub async fn delete_image(&self, filename: &str) -> Result<(), Error> {
        let req = EndpointRequest::new(Endpoint::Delete, self.options.query_retry)
            .param("file", ImageDirectory::Image.file_path(filename));
        self.control(req).await
    }

    /// `GET /set?msg=..&sbj=..&style=..[&timeout=..]`
    pub async fn set_message(
        &self,
        text: &str,
        subject: &str,
        style: &str,
        timeout: Option<u32>,
    ) -> Result<(), Error> {
        let req = self
            .set()
            .param("msg", text)
            .param("sbj", subject)
            .param("style", style)
            .param_opt("timeout", timeout);
        self.control(req).await
    }

    /// `GET /set?cnt=<datetime>&sbj=..[&timeout=..]`
    pub async fn set_countdown(
        &self,
        datetime: &str,
        subject: &str,
        timeout: Option<u32>,
    ) -> Result<(), Error> {
        let req = self
            .set()
            .param("cnt", datetime)
            .param("sbj", subject)
            .param_opt("timeout", timeout);
        self.control(req).await
    }

    /// `GET /set?note=..[&rpm=..]&force=..[&timeout=..]`
    pub async fn set_note(
        &self,
        text: &str,
        rpm: Option<u32>,
        force: bool,
        timeout: Option<u32>,
    ) -> Result<(), Error> {
        let req = self
            .set()
            .param("note", text)
            .param_opt("rpm", rpm)
            .param("force", wire_bool(force))
            .param_opt("timeout", timeout);
        self.control(req).await
    }

    // ── Upload ───────────────────────────────────────────────────────

    /// Upload a file into `/image/`.
    ///
    /// `POST /doUpload?dir=/image/` with a single multipart part `file`.
    /// Goes over the lenient transport: the firmware answers with duplicate
    /// `Content-Length` headers.
    pub async fn upload_file(&self, data: &[u8], filename: &str) -> Result<(), Error> {
        let part = Multipart::single_file("file", filename, "image/jpeg", data);
        let req = EndpointRequest::new(Endpoint::Upload, self.options.upload_retry)
            .param("dir", "/image/")
            .body(part);
        debug!(filename, bytes = data.len(), "uploading file");
        match self.fetch(req, decode_text).await {
            Ok(_) => Ok(()),
            Err(e) => {
                if let Error::UnexpectedStatus { status, body, .. } = &e {
                    error!(status, body = %body, "upload failed");
                }
                Err(e)
            }
        }
    }

    // ── Request helpers ──────────────────────────────────────────────

    fn set(&self) -> EndpointRequest {
        EndpointRequest::new(Endpoint::Set, self.options.query_retry)
    }

    async fn control(&self, req: EndpointRequest) -> Result<(), Error> {
        self.fetch(req, |_, _| Ok(())).await
    }

    /// GET a JSON endpoint. A 404 is a valid answer and comes back as `None`.
    async fn get_json<T: DeserializeOwned>(&self, endpoint: Endpoint) -> Result<Option<T>, Error> {
        let req = EndpointRequest::new(endpoint, self.options.query_retry);
        match self.fetch(req, decode_json::<T>).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => {
                info!(
                    endpoint = endpoint.path(),
                    "404 received, using last known value if available"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Run a request through the retry policy. Decoding happens inside the
    /// attempt, so a garbled body is retried like a dropped connection.
    async fn fetch<T>(
        &self,
        mut req: EndpointRequest,
        decode: impl Fn(&'static str, RawResponse) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let endpoint = req.endpoint;
        if self.options.cache_buster && endpoint.is_status_query() {
            req = req.param("_", chrono::Utc::now().timestamp_millis());
        }

        let prepared = PreparedRequest {
            endpoint: endpoint.path(),
            method: endpoint.method(),
            shape: endpoint.shape(),
            url: req.url(&self.base_url),
            body: req.body.clone(),
        };
        let kind = endpoint.transport();
        let prepared = &prepared;
        let decode = &decode;

        retry(req.retry, endpoint.path(), || async move {
            debug!("{} {}", prepared.method.as_str(), prepared.url);
            let resp = match kind {
                TransportKind::Strict => self.strict.execute(prepared).await?,
                TransportKind::Lenient => self.lenient.execute(prepared).await?,
            };
            let resp = check_status(prepared.endpoint, resp)?;
            decode(prepared.endpoint, resp)
        })
        .await
    }
}

/// Normalize a host entry into a device base URL.
pub fn device_url(host: &str) -> Result<Url, Error> {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        Ok(Url::parse(host)?)
    } else {
        Ok(Url::parse(&format!("http://{host}"))?)
    }
}

fn check_status(endpoint: &'static str, resp: RawResponse) -> Result<RawResponse, Error> {
    match resp.status {
        404 => Err(Error::NotFound {
            endpoint: endpoint.to_owned(),
        }),
        _ if resp.is_success() => Ok(resp),
        status => {
            let body = resp.text();
            Err(Error::UnexpectedStatus {
                endpoint: endpoint.to_owned(),
                status,
                body: body.chars().take(200).collect(),
            })
        }
    }
}

fn decode_text(_endpoint: &'static str, resp: RawResponse) -> Result<String, Error> {
    Ok(resp.text())
}

fn decode_json<T: DeserializeOwned>(endpoint: &'static str, resp: RawResponse) -> Result<T, Error> {
    // The firmware serves JSON as text/html; the content type is ignored.
    serde_json::from_slice(&resp.body).map_err(|e| {
        let body = resp.text();
        Error::Deserialization {
            endpoint: endpoint.to_owned(),
            message: e.to_string(),
            body: body.chars().take(200).collect(),
        }
    })
}
