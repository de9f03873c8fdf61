//! Resource loading for images referenced by a captured subtree.
//!
//! `data:` URLs are decoded in-process, `file:` URLs are read from disk and
//! `http(s):` URLs are fetched with `reqwest` when the `remote` feature is
//! enabled. Every fetch runs in CORS mode: a cross-origin response must be
//! allowed by its `Access-Control-Allow-Origin` header, otherwise the resource
//! is refused instead of tainting the output.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use url::Url;

use crate::{Error, Result};

/// A single resource fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    /// Absolute URL after resolution against the document base
    pub url: String,
    /// Serialized origin of the requesting document, if it has one
    pub origin: Option<String>,
}

impl ResourceRequest {
    /// Resolve `src` against an optional document base URL.
    pub fn resolve(src: &str, base: Option<&Url>) -> Result<Self> {
        let src = src.trim();
        let url = match Url::parse(src) {
            Ok(u) => u,
            Err(url::ParseError::RelativeUrlWithoutBase) => match base {
                Some(b) => b
                    .join(src)
                    .map_err(|e| Error::Resource(format!("{}: {}", src, e)))?,
                None => {
                    return Err(Error::Resource(format!(
                        "{}: relative URL without a document base",
                        src
                    )))
                }
            },
            Err(e) => return Err(Error::Resource(format!("{}: {}", src, e))),
        };
        let origin = base
            .map(|b| b.origin())
            .filter(|o| o.is_tuple())
            .map(|o| o.ascii_serialization());
        Ok(Self {
            url: url.to_string(),
            origin,
        })
    }

    /// True when the request leaves the document's origin.
    pub fn is_cross_origin(&self) -> bool {
        let Some(origin) = &self.origin else {
            return true;
        };
        match Url::parse(&self.url) {
            Ok(u) => u.origin().ascii_serialization() != *origin,
            Err(_) => true,
        }
    }
}

/// Fetches raw resource bytes for the rasterizer.
#[async_trait]
pub trait ResourceLoader: Send + Sync {
    async fn load(&self, request: &ResourceRequest) -> Result<Vec<u8>>;
}

/// Loader handling `data:`, `file:` and (with `remote`) `http(s):` URLs.
pub struct DefaultResourceLoader {
    #[cfg(feature = "remote")]
    client: reqwest::Client,
}

impl DefaultResourceLoader {
    pub fn new() -> Result<Self> {
        #[cfg(feature = "remote")]
        {
            let client = reqwest::Client::builder()
                .build()
                .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
            Ok(Self { client })
        }
        #[cfg(not(feature = "remote"))]
        {
            Ok(Self {})
        }
    }

    #[cfg(feature = "remote")]
    async fn fetch_http(&self, request: &ResourceRequest) -> Result<Vec<u8>> {
        let mut req = self.client.get(&request.url);
        let cross_origin = request.is_cross_origin();
        if cross_origin {
            if let Some(origin) = &request.origin {
                req = req.header("Origin", origin.as_str());
            }
        }
        let resp = req
            .send()
            .await
            .map_err(|e| Error::Resource(format!("{}: {}", request.url, e)))?
            .error_for_status()
            .map_err(|e| Error::Resource(format!("{}: {}", request.url, e)))?;

        if cross_origin {
            let allowed = resp
                .headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim() == "*" || Some(v.trim()) == request.origin.as_deref())
                .unwrap_or(false);
            if !allowed {
                return Err(Error::Resource(format!(
                    "{}: blocked by CORS policy (no matching Access-Control-Allow-Origin)",
                    request.url
                )));
            }
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::Resource(format!("{}: {}", request.url, e)))?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl ResourceLoader for DefaultResourceLoader {
    async fn load(&self, request: &ResourceRequest) -> Result<Vec<u8>> {
        let url = Url::parse(&request.url)
            .map_err(|e| Error::Resource(format!("{}: {}", request.url, e)))?;
        match url.scheme() {
            "data" => decode_data_url(&request.url),
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| Error::Resource(format!("{}: not a local path", request.url)))?;
                tokio::fs::read(&path)
                    .await
                    .map_err(|e| Error::Resource(format!("{}: {}", path.display(), e)))
            }
            #[cfg(feature = "remote")]
            "http" | "https" => self.fetch_http(request).await,
            other => Err(Error::Resource(format!(
                "{}: unsupported scheme '{}'",
                request.url, other
            ))),
        }
    }
}

/// Decode the payload of a `data:` URL (base64 or plain).
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| Error::Resource("not a data URL".into()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::Resource("malformed data URL".into()))?;
    if meta.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
        // whitespace is legal inside data URLs pasted from editors
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| Error::Resource(format!("invalid base64 in data URL: {}", e)))
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}

/// Build a `data:` URL for a byte buffer.
pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}
