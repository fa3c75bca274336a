pub mod fast;
pub mod html;
pub mod raiplay;

#[cfg(test)]
mod tests;

use crate::config::DownloaderConfig;
use crate::error::{Error, Result};
use crate::filter::{MediaFilter, MediaFilterConfig};
use crate::results::{MediaReference, PageContent};
use crate::utils::url_extension;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::Url;

/// Interchangeable markup backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserBackend {
    /// Full HTML5 DOM (scraper)
    #[default]
    Dom,
    /// Single-pass tag scanner, no tree is built
    Fast,
}

impl ParserBackend {
    /// Extract the candidate tags from markup, in document order
    pub fn scan(&self, markup: &str) -> Vec<Tag> {
        match self {
            ParserBackend::Dom => html::scan(markup),
            ParserBackend::Fast => fast::scan(markup),
        }
    }
}

/// Element names that can carry a media marker
pub(crate) const MARKER_TAGS: &[&str] = &["video", "audio", "source", "meta", "a", "rai-episodes"];

/// Attributes that mark any element as carrying a media URL
pub(crate) const DATA_URL_ATTRS: &[&str] = &["data-video-url", "data-media-url"];

const OG_VIDEO_PROPERTIES: &[&str] = &["og:video", "og:video:url", "og:video:secure_url"];

/// A start tag with its attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Lowercase element name
    pub name: String,
    /// Attributes in source order, names lowercased
    pub attrs: Vec<(String, String)>,
}

impl Tag {
    /// Value of the first attribute with this name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the tag is worth handing to the locator
    pub fn is_candidate(&self) -> bool {
        MARKER_TAGS.contains(&self.name.as_str())
            || DATA_URL_ATTRS.iter().any(|a| self.attr(a).is_some())
    }

    fn title(&self) -> Option<String> {
        self.attr("title")
            .or_else(|| self.attr("data-title"))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }

    /// Media URLs this tag points at
    fn markers(&self) -> Vec<Marker> {
        let mut markers = Vec::new();
        let title = self.title();
        let mut push = |url: &str, kind: MarkerKind| {
            let url = url.trim();
            if !url.is_empty() {
                markers.push(Marker {
                    url: url.to_string(),
                    title: title.clone(),
                    kind,
                });
            }
        };

        match self.name.as_str() {
            "video" | "audio" => {
                if let Some(src) = self.attr("src") {
                    push(src, MarkerKind::Explicit);
                }
            }
            "source" => {
                if let Some(src) = self.attr("src") {
                    // Typed sources are explicit; untyped ones could be images in <picture>
                    let typed = self.attr("type").is_some_and(|t| {
                        let t = t.trim().to_ascii_lowercase();
                        t.starts_with("video/")
                            || t.starts_with("audio/")
                            || t.starts_with("application/")
                    });
                    let kind = if typed {
                        MarkerKind::Explicit
                    } else {
                        MarkerKind::Link
                    };
                    push(src, kind);
                }
            }
            "meta" => {
                let property = self.attr("property").or_else(|| self.attr("name"));
                if let (Some(property), Some(content)) = (property, self.attr("content")) {
                    if OG_VIDEO_PROPERTIES.contains(&property.trim().to_ascii_lowercase().as_str())
                    {
                        push(content, MarkerKind::Explicit);
                    }
                }
            }
            "a" => {
                if let Some(href) = self.attr("href") {
                    push(href, MarkerKind::Link);
                }
            }
            _ => {}
        }

        for attr in DATA_URL_ATTRS {
            if let Some(url) = self.attr(attr) {
                push(url, MarkerKind::Explicit);
            }
        }

        markers
    }
}

/// How strongly a marker implies media
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerKind {
    /// The element exists to point at media
    Explicit,
    /// A plain link, media only if the filter says so
    Link,
}

#[derive(Debug, Clone)]
struct Marker {
    url: String,
    title: Option<String>,
    kind: MarkerKind,
}

/// Media references found on a page, in document order
///
/// Iterating is side-effect free and can be repeated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaReferences {
    source_url: String,
    references: Vec<MediaReference>,
}

impl MediaReferences {
    pub fn iter(&self) -> std::slice::Iter<'_, MediaReference> {
        self.references.iter()
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    /// The reference chosen when only one is wanted (first in document order)
    pub fn first(&self) -> &MediaReference {
        // Never empty: `MediaLocator::locate` fails instead of building an empty set
        &self.references[0]
    }

    /// URL of the page the references were found on
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn into_vec(self) -> Vec<MediaReference> {
        self.references
    }
}

impl IntoIterator for MediaReferences {
    type Item = MediaReference;
    type IntoIter = std::vec::IntoIter<MediaReference>;

    fn into_iter(self) -> Self::IntoIter {
        self.references.into_iter()
    }
}

impl<'a> IntoIterator for &'a MediaReferences {
    type Item = &'a MediaReference;
    type IntoIter = std::slice::Iter<'a, MediaReference>;

    fn into_iter(self) -> Self::IntoIter {
        self.references.iter()
    }
}

/// Finds media references in fetched pages
#[derive(Debug)]
pub struct MediaLocator {
    backend: ParserBackend,
    filter: MediaFilter,
}

impl MediaLocator {
    pub fn new(backend: ParserBackend, filter: MediaFilter) -> Self {
        Self { backend, filter }
    }

    /// Build a locator from the shared configuration
    pub fn from_config(config: &DownloaderConfig) -> Result<Self> {
        let filter = MediaFilter::new(MediaFilterConfig::from(config))?;
        Ok(Self::new(config.parser_backend, filter))
    }

    pub fn backend(&self) -> ParserBackend {
        self.backend
    }

    /// Locate every media reference in the page
    ///
    /// References come back in document order with duplicate URLs removed
    /// (first occurrence wins). Fails with a parse error when the page has no
    /// media marker at all.
    pub fn locate(&self, page: &PageContent) -> Result<MediaReferences> {
        let base = Url::parse(&page.url)
            .map_err(|e| Error::parse(&page.url, format!("invalid page URL: {}", e)))?;

        let tags = self.backend.scan(&page.body);
        ::log::debug!(
            "{:?} backend found {} candidate tags in {}",
            self.backend,
            tags.len(),
            page.url
        );

        let mut seen = HashSet::new();
        let mut references = Vec::new();

        for marker in tags.iter().flat_map(Tag::markers) {
            let resolved = match base.join(&marker.url) {
                Ok(url) => url,
                Err(e) => {
                    ::log::debug!("Skipping unresolvable URL {:?}: {}", marker.url, e);
                    continue;
                }
            };

            let accepted = match marker.kind {
                MarkerKind::Explicit => self.filter.accepts_marker(&resolved),
                MarkerKind::Link => self.filter.is_media(&resolved),
            };
            if !accepted || !seen.insert(resolved.to_string()) {
                continue;
            }

            let url = resolved.to_string();
            let format_hint = url_extension(&url);
            references.push(MediaReference {
                url,
                title: marker.title,
                format_hint,
            });
        }

        if references.is_empty() {
            return Err(Error::parse(&page.url, "no media markers found"));
        }

        ::log::info!("Found {} media references in {}", references.len(), page.url);

        Ok(MediaReferences {
            source_url: page.url.clone(),
            references,
        })
    }
}

impl Default for MediaLocator {
    fn default() -> Self {
        Self::new(ParserBackend::default(), MediaFilter::default())
    }
}
