// Device endpoint table and per-call request descriptions.
//
// `Endpoint` is the static routing table: which path, which transport,
// which response shape and which retry budget. `EndpointRequest` is the
// per-call description built fresh by each client operation.

use bytes::Bytes;
use url::Url;

use crate::retry::RetryPolicy;

/// HTTP method used by the device surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// What the caller expects back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    Json,
    Text,
}

impl ResponseShape {
    /// `Accept` header value sent with the request.
    pub fn accept(self) -> &'static str {
        match self {
            Self::Json => "application/json, */*",
            Self::Text => "*/*",
        }
    }
}

/// Which transport executes a request.
///
/// The device firmware emits duplicate `Content-Length` headers on some
/// endpoints, which strict HTTP stacks reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// `reqwest` -- well-formed JSON and control endpoints.
    Strict,
    /// Raw HTTP/1.1 over TCP that tolerates repeated headers.
    Lenient,
}

/// Every endpoint the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Theme,
    Brightness,
    Version,
    Space,
    FileList,
    Set,
    Delete,
    Upload,
}

impl Endpoint {
    /// Path relative to the device root, without a leading slash.
    pub fn path(self) -> &'static str {
        match self {
            Self::Theme => "app.json",
            Self::Brightness => "brt.json",
            Self::Version => "v.json",
            Self::Space => "space.json",
            Self::FileList => "filelist",
            Self::Set => "set",
            Self::Delete => "delete",
            Self::Upload => "doUpload",
        }
    }

    pub fn method(self) -> Method {
        match self {
            Self::Upload => Method::Post,
            _ => Method::Get,
        }
    }

    pub fn shape(self) -> ResponseShape {
        match self {
            Self::Theme | Self::Brightness | Self::Version | Self::Space => ResponseShape::Json,
            Self::FileList | Self::Set | Self::Delete | Self::Upload => ResponseShape::Text,
        }
    }

    pub fn transport(self) -> TransportKind {
        match self {
            Self::FileList | Self::Upload => TransportKind::Lenient,
            _ => TransportKind::Strict,
        }
    }

    /// Whether the optional cache-buster applies to this endpoint.
    pub fn is_status_query(self) -> bool {
        matches!(
            self,
            Self::Theme | Self::Brightness | Self::Version | Self::Space
        )
    }
}

/// A `multipart/form-data` body with a single file part.
#[derive(Debug, Clone)]
pub struct Multipart {
    pub boundary: String,
    pub body: Bytes,
}

impl Multipart {
    /// Build a body with one part named `field`.
    pub fn single_file(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        let boundary = format!("geekmagic-{}", uuid::Uuid::new_v4().simple());
        let mut body = Vec::with_capacity(data.len() + 256);
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{}\"\r\n",
                filename.replace('"', "")
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        Self {
            boundary,
            body: Bytes::from(body),
        }
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }
}

/// One device call: endpoint, ordered query pairs, optional body, retry budget.
#[derive(Debug, Clone)]
pub struct EndpointRequest {
    pub endpoint: Endpoint,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<Multipart>,
    pub retry: RetryPolicy,
}

impl EndpointRequest {
    pub fn new(endpoint: Endpoint, retry: RetryPolicy) -> Self {
        Self {
            endpoint,
            query: Vec::new(),
            body: None,
            retry,
        }
    }

    /// Append a query pair. Order of calls is the order on the wire.
    pub fn param(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    /// Append a query pair only when `value` is present.
    pub fn param_opt<T: ToString>(self, key: &'static str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.param(key, v),
            None => self,
        }
    }

    pub fn body(mut self, body: Multipart) -> Self {
        self.body = Some(body);
        self
    }

    /// Resolve the full URL against the device base.
    ///
    /// Pairs are form-urlencoded in insertion order, never sorted.
    pub fn url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        url.set_path(&format!(
            "{}/{}",
            base.path().trim_end_matches('/'),
            self.endpoint.path()
        ));
        url.set_query(None);
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                pairs.append_pair(key, value);
            }
        }
        url
    }
}

/// Python-style boolean literal, as the device firmware expects it.
pub(crate) fn wire_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://192.168.1.50").unwrap()
    }

    #[test]
    fn query_keeps_insertion_order() {
        let req = EndpointRequest::new(Endpoint::Set, RetryPolicy::query())
            .param("msg", "hello world")
            .param("sbj", "Alert")
            .param("style", "b")
            .param("timeout", 30);
        assert_eq!(
            req.url(&base()).as_str(),
            "http://192.168.1.50/set?msg=hello+world&sbj=Alert&style=b&timeout=30"
        );
    }

    #[test]
    fn slashes_in_values_are_encoded() {
        let req = EndpointRequest::new(Endpoint::Set, RetryPolicy::query())
            .param("img", "/image/x.jpg");
        assert_eq!(
            req.url(&base()).as_str(),
            "http://192.168.1.50/set?img=%2Fimage%2Fx.jpg"
        );
    }

    #[test]
    fn optional_params_are_skipped() {
        let req = EndpointRequest::new(Endpoint::Set, RetryPolicy::query())
            .param("note", "milk")
            .param_opt::<u32>("rpm", None)
            .param("force", wire_bool(true))
            .param_opt("timeout", Some(5));
        assert_eq!(
            req.url(&base()).as_str(),
            "http://192.168.1.50/set?note=milk&force=True&timeout=5"
        );
    }

    #[test]
    fn no_query_means_no_question_mark() {
        let req = EndpointRequest::new(Endpoint::Theme, RetryPolicy::query());
        assert_eq!(req.url(&base()).as_str(), "http://192.168.1.50/app.json");
    }

    #[test]
    fn transport_table_routes_quirky_endpoints() {
        assert_eq!(Endpoint::FileList.transport(), TransportKind::Lenient);
        assert_eq!(Endpoint::Upload.transport(), TransportKind::Lenient);
        assert_eq!(Endpoint::Set.transport(), TransportKind::Strict);
        assert_eq!(Endpoint::Version.shape(), ResponseShape::Json);
        assert_eq!(Endpoint::Upload.method(), Method::Post);
    }

    #[test]
    fn multipart_body_wraps_file() {
        let part = Multipart::single_file("file", "a.jpg", "image/jpeg", b"JPEG");
        let text = String::from_utf8(part.body.to_vec()).unwrap();
        assert!(text.starts_with(&format!("--{}\r\n", part.boundary)));
        assert!(text.contains("name=\"file\"; filename=\"a.jpg\""));
        assert!(text.contains("Content-Type: image/jpeg\r\n\r\nJPEG\r\n"));
        assert!(text.ends_with(&format!("--{}--\r\n", part.boundary)));
        assert!(part.content_type().starts_with("multipart/form-data; boundary="));
    }
}
