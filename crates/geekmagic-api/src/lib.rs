//! Async Rust client for GeekMagic / SmallTV picture-frame devices.
//!
//! The device exposes a small, quirky HTTP surface: JSON status endpoints
//! that may 404 depending on firmware, a generic `/set` control endpoint,
//! HTML directory listings, and a multipart upload that answers with
//! duplicate `Content-Length` headers. [`DeviceClient`] absorbs all of that:
//!
//! - **Two transports** behind one [`transport::Transport`] trait, chosen
//!   per endpoint by a static table ([`Endpoint::transport`]).
//! - **Bounded retry** ([`retry::retry`]): every call gets two attempts with
//!   a per-attempt deadline; a 404 is an answer, not a failure.
//! - **Typed results**: [`DeviceStatus`], image lists, or an [`Error`]
//!   tagged with the failing endpoint.

pub mod client;
pub mod endpoint;
pub mod error;
pub mod fetch;
pub mod listing;
pub mod models;
pub mod render;
pub mod retry;
pub mod transport;

pub use client::{ClientOptions, DeviceClient, PHOTO_ALBUM_THEME, device_url};
pub use endpoint::{Endpoint, EndpointRequest, ResponseShape, TransportKind};
pub use error::Error;
pub use fetch::fetch_image;
pub use listing::{ImageDirectory, parse_file_list};
pub use models::DeviceStatus;
pub use render::RenderClient;
pub use retry::RetryPolicy;
pub use transport::TransportConfig;
