//! Favicon discovery for arbitrary web pages.
//!
//! The resolver fetches a page, looks for `<link rel="icon">` (then
//! `rel="shortcut icon"`), normalizes the reference against the page URL and
//! fetches the image. Pages without a usable tag, or pages that cannot be
//! fetched, fall back to `{host-root}/favicon.ico`.

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;

use crate::types::errors::FaviconError;
use crate::types::favicon::{FetchedContent, DEFAULT_FAVICON_NAME};

/// `rel` values recognized as favicon declarations, in lookup order.
const ICON_RELS: [&str; 2] = ["icon", "shortcut icon"];

/// A plain HTTP response as seen by the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub body: Vec<u8>,
}

/// Outbound HTTP GET, abstracted so tests never hit the network.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, FaviconError>;
}

/// [`HttpFetcher`] backed by a shared `reqwest::Client`.
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(user_agent: &str) -> Result<Self, FaviconError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| FaviconError::Network {
                url: String::new(),
                message: format!("failed to build http client: {}", e),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get(&self, url: &str) -> Result<HttpResponse, FaviconError> {
        let network = |e: reqwest::Error| FaviconError::Network {
            url: url.to_string(),
            message: e.to_string(),
        };
        let resp = self.client.get(url).send().await.map_err(network)?;
        let header = |name| {
            resp.headers()
                .get(name)
                .and_then(|v: &reqwest::header::HeaderValue| v.to_str().ok())
                .map(str::to_string)
        };
        let status = resp.status().as_u16();
        let content_type = header(CONTENT_TYPE);
        let content_disposition = header(CONTENT_DISPOSITION);
        let body = resp.bytes().await.map_err(network)?.to_vec();
        Ok(HttpResponse {
            status,
            content_type,
            content_disposition,
            body,
        })
    }
}

/// What a fetch is expected to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchType {
    /// Any content type is accepted.
    Any,
    /// The response must declare an `image/*` content type.
    Image,
}

/// The URL forms a favicon reference is resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageUrls {
    /// e.g. `http`
    pub scheme: String,
    /// `scheme://host[:port]`
    pub host_root: String,
    /// `scheme://host[:port]/path` with a trailing `index.htm(l)` removed.
    pub page_root: String,
}

impl PageUrls {
    pub fn parse(raw: &str) -> Result<Self, FaviconError> {
        let invalid = |reason: String| FaviconError::InvalidUrl {
            url: raw.to_string(),
            reason,
        };
        let parsed = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| invalid("missing host".to_string()))?;
        let authority = match parsed.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let path = parsed.path();
        let path = path
            .strip_suffix("index.html")
            .or_else(|| path.strip_suffix("index.htm"))
            .unwrap_or(path);
        let host_root = format!("{}://{}", parsed.scheme(), authority);
        Ok(Self {
            scheme: parsed.scheme().to_string(),
            page_root: format!("{}{}", host_root, path),
            host_root,
        })
    }
}

/// Decodes a page body for tag lookup.
///
/// Invalid UTF-8 sequences (Latin-1 and Windows-1252 pages) are replaced,
/// leaving the ASCII tag and attribute names intact. A NUL byte means the
/// body is binary and not markup.
pub fn decode_markup(body: &[u8]) -> Result<Cow<'_, str>, String> {
    if let Some(offset) = body.iter().position(|b| *b == 0) {
        return Err(format!("binary content, NUL byte at offset {}", offset));
    }
    Ok(String::from_utf8_lossy(body))
}

/// Finds the first favicon reference in `markup`: `rel="icon"` wins over
/// `rel="shortcut icon"`, and document order decides within one kind.
pub fn find_favicon_href(markup: &str) -> Option<String> {
    let document = Html::parse_document(markup);
    let selector = Selector::parse("link[rel][href]").ok()?;
    let links: Vec<(String, String)> = document
        .select(&selector)
        .filter_map(|link| {
            let rel = link.value().attr("rel")?;
            let href = link.value().attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            let rel = rel.split_whitespace().collect::<Vec<_>>().join(" ");
            Some((rel.to_ascii_lowercase(), href.to_string()))
        })
        .collect();

    ICON_RELS.iter().find_map(|wanted| {
        links
            .iter()
            .find(|(rel, _)| rel == wanted)
            .map(|(_, href)| href.clone())
    })
}

/// Turns a favicon reference into an absolute URL.
///
/// - `//cdn/x.png` gets the page scheme
/// - `/img/x.png` is appended to the host root
/// - `./x.png` and bare `x.png` are resolved below the page root
/// - anything with a scheme is returned unchanged
pub fn resolve_icon_url(href: &str, urls: &PageUrls) -> String {
    let href = href.trim();
    if href.starts_with("//") {
        format!("{}:{}", urls.scheme, href)
    } else if href.starts_with('/') {
        format!("{}{}", urls.host_root, href)
    } else if let Some(relative) = href.strip_prefix("./") {
        join_below(&urls.page_root, relative)
    } else if Url::parse(href).is_ok() {
        href.to_string()
    } else {
        join_below(&urls.page_root, href)
    }
}

fn join_below(root: &str, relative: &str) -> String {
    format!("{}/{}", root.trim_end_matches('/'), relative.trim_start_matches('/'))
}

/// Picks the `filename` parameter out of a `Content-Disposition` header.
pub fn disposition_filename(header: &str) -> Option<String> {
    header.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("filename") {
            return None;
        }
        let value = value.trim().trim_matches('"').trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Locates and downloads favicons.
pub struct FaviconResolver {
    fetcher: Arc<dyn HttpFetcher>,
}

impl FaviconResolver {
    pub fn new(fetcher: Arc<dyn HttpFetcher>) -> Self {
        Self { fetcher }
    }

    /// Resolves the favicon of the page at `page_url` and downloads it.
    ///
    /// A body that is not text at all fails hard. Markup without a favicon
    /// tag, or a page that cannot be fetched, falls back to
    /// `{host-root}/favicon.ico`.
    pub async fn resolve(&self, page_url: &str) -> Result<FetchedContent, FaviconError> {
        let urls = PageUrls::parse(page_url)?;

        let href = match self.fetch(page_url, FetchType::Any).await {
            Ok(page) => {
                let markup = decode_markup(&page.payload).map_err(|reason| {
                    FaviconError::MalformedMarkup {
                        url: page_url.to_string(),
                        reason,
                    }
                })?;
                find_favicon_href(&markup)
            }
            Err(err) => {
                debug!(url = page_url, error = %err, "page fetch failed, using favicon.ico fallback");
                None
            }
        };

        match href {
            Some(href) => {
                let icon_url = resolve_icon_url(&href, &urls);
                info!(url = page_url, icon = %icon_url, "favicon declared on page");
                self.fetch(&icon_url, FetchType::Image).await
            }
            None => {
                let fallback = format!("{}/{}", urls.host_root, DEFAULT_FAVICON_NAME);
                info!(url = page_url, icon = %fallback, "no favicon declared, trying default location");
                let mut content = self.fetch(&fallback, FetchType::Image).await?;
                content.file_name = DEFAULT_FAVICON_NAME.to_string();
                Ok(content)
            }
        }
    }

    /// Fetches `url`, enforcing an image content type for [`FetchType::Image`].
    ///
    /// The file name is the last path segment when it has an extension, else
    /// the `Content-Disposition` filename, else `favicon.ico`.
    pub async fn fetch(&self, url: &str, what: FetchType) -> Result<FetchedContent, FaviconError> {
        let parsed = Url::parse(url).map_err(|e| FaviconError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let from_path = parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| Path::new(segment).extension().is_some())
            .map(str::to_string);

        let resp = self.fetcher.get(url).await?;
        if resp.status != 200 {
            return Err(FaviconError::Status {
                url: url.to_string(),
                status: resp.status,
            });
        }
        let mime_type = resp.content_type.unwrap_or_default();
        if what == FetchType::Image && !mime_type.starts_with("image/") {
            return Err(FaviconError::NotAnImage {
                url: url.to_string(),
                content_type: mime_type,
            });
        }

        let file_name = from_path
            .or_else(|| resp.content_disposition.as_deref().and_then(disposition_filename))
            .unwrap_or_else(|| DEFAULT_FAVICON_NAME.to_string());

        Ok(FetchedContent {
            url: url.to_string(),
            file_name,
            mime_type,
            payload: resp.body,
        })
    }
}
