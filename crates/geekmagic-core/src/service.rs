// ── Batch services ──
//
// Push one image to several devices at once. Each target runs its own
// future; a failure on one device is recorded in its outcome and never
// stops the others.

use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, error, info};
use url::Url;

use geekmagic_api::{RenderClient, TransportConfig};

use crate::coordinator::Coordinator;
use crate::error::CoreError;
use crate::registry::DeviceRegistry;

/// Name every pushed image is stored under on the device.
pub const UPLOAD_FILENAME: &str = "geekmagic.jpg";

/// Result of delivering to one device.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryOutcome {
    pub device: String,
    #[serde(serialize_with = "serialize_result")]
    pub result: Result<(), CoreError>,
}

impl DeliveryOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

fn serialize_result<S: serde::Serializer>(
    result: &Result<(), CoreError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match result {
        Ok(()) => serializer.serialize_none(),
        Err(e) => serializer.serialize_some(&e.to_string()),
    }
}

/// The device only decodes baseline JPEG.
pub fn validate_image_filename(filename: &str) -> Result<(), CoreError> {
    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        Ok(())
    } else {
        Err(CoreError::ValidationFailed {
            message: format!("{filename}: only .jpg and .jpeg images are supported"),
        })
    }
}

/// Download a JPEG from `url`. The image is named after the last path
/// segment, which must pass [`validate_image_filename`] before anything
/// is fetched.
pub async fn fetch_image(url: &Url) -> Result<(String, Vec<u8>), CoreError> {
    let filename = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| CoreError::ValidationFailed {
            message: format!("{url}: URL does not name a file"),
        })?
        .to_owned();
    validate_image_filename(&filename)?;

    let http = TransportConfig::default().build_client()?;
    let data = geekmagic_api::fetch_image(&http, url).await?;
    if data.is_empty() {
        return Err(CoreError::ValidationFailed {
            message: format!("{url}: downloaded image is empty"),
        });
    }
    debug!(%url, bytes = data.len(), "image downloaded");
    Ok((filename, data.to_vec()))
}

/// Upload `data` to every device in `ids` and switch each to the photo
/// album showing it.
pub async fn send_image(
    registry: &DeviceRegistry,
    ids: &[String],
    data: &[u8],
    filename: &str,
) -> Result<Vec<DeliveryOutcome>, CoreError> {
    validate_image_filename(filename)?;
    Ok(deliver(registry, ids, data).await)
}

/// Render `html` once, then deliver the image like [`send_image`].
///
/// A render failure aborts before any device is touched.
pub async fn send_html(
    registry: &DeviceRegistry,
    ids: &[String],
    html: &str,
    render: &RenderClient,
) -> Result<Vec<DeliveryOutcome>, CoreError> {
    if html.trim().is_empty() {
        return Err(CoreError::ValidationFailed {
            message: "no HTML content provided".into(),
        });
    }
    let image = render.render(html).await?;
    debug!(bytes = image.len(), "HTML rendered");
    Ok(deliver(registry, ids, &image).await)
}

async fn deliver(registry: &DeviceRegistry, ids: &[String], data: &[u8]) -> Vec<DeliveryOutcome> {
    let jobs = ids.iter().map(|id| async move {
        let result = match registry.require(id) {
            Ok(handle) => push_image(&handle.coordinator, data).await,
            Err(e) => Err(e),
        };
        match &result {
            Ok(()) => info!(device = %id, "image delivered"),
            Err(e) => error!(device = %id, error = %e, "image delivery failed"),
        }
        DeliveryOutcome {
            device: id.clone(),
            result,
        }
    });
    join_all(jobs).await
}

async fn push_image(coordinator: &Coordinator, data: &[u8]) -> Result<(), CoreError> {
    coordinator.upload_file(data, UPLOAD_FILENAME).await?;
    coordinator.set_image(UPLOAD_FILENAME, None, true).await?;
    if let Err(e) = coordinator.refresh_now().await {
        debug!(error = %e, "post-delivery refresh failed");
    }
    Ok(())
}
