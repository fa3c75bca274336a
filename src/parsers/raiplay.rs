//! RaiPlay page and JSON structure
//!
//! A single episode page `…/name.html` has a JSON twin `…/name.json` whose
//! `name` field is the episode title. A series page carries a
//! `<rai-episodes>` element pointing at the episodes document, which lists
//! the episode cards of every season.

use crate::error::{Error, Result};
use crate::parsers::ParserBackend;
use crate::results::{MediaReference, PageContent};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

/// Attributes of `<rai-episodes>` that make up the episodes document path
const EPISODES_ATTRS: [&str; 4] = ["base_path", "block", "set", "episode_path"];

/// One episode entry of a season
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EpisodeCard {
    pub name: String,
    pub weblink: String,
}

impl EpisodeCard {
    /// Media reference for the episode page, resolved against the RaiPlay host
    pub fn to_reference(&self, host: &str) -> Result<MediaReference> {
        let url = resolve(host, &self.weblink)?;
        Ok(MediaReference::new(url).with_title(self.name.clone()))
    }
}

/// URL of the episodes document advertised by a series page
pub fn locate_episodes_endpoint(
    page: &PageContent,
    backend: ParserBackend,
    host: &str,
) -> Result<String> {
    let tag = backend
        .scan(&page.body)
        .into_iter()
        .find(|t| t.name == "rai-episodes")
        .ok_or_else(|| {
            Error::parse(
                &page.url,
                "no rai-episodes element; the page structure might have changed",
            )
        })?;

    let mut parts = Vec::with_capacity(EPISODES_ATTRS.len());
    for attr in EPISODES_ATTRS {
        let value = tag
            .attr(attr)
            .ok_or_else(|| Error::parse(&page.url, format!("rai-episodes is missing {}", attr)))?;
        parts.push(value.trim_matches('/'));
    }

    // base_path is absolute on the host; the rest are single segments
    let path = format!("/{}", parts.join("/"));
    let endpoint = resolve(host, &path)?;
    ::log::debug!("Episodes document for {}: {}", page.url, endpoint);
    Ok(endpoint)
}

/// JSON twin of an episode page (`.html` replaced by `.json`)
pub fn episode_json_url(page_url: &str) -> Result<String> {
    let mut url =
        Url::parse(page_url).map_err(|e| Error::parse(page_url, format!("invalid URL: {}", e)))?;

    let path = url.path().to_string();
    let stem = path
        .strip_suffix(".html")
        .ok_or_else(|| Error::parse(page_url, "episode URL does not end in .html"))?;
    url.set_path(&format!("{}.json", stem));
    Ok(url.to_string())
}

/// Episode title from its JSON document
pub fn episode_title(json: &Value, source_url: &str) -> Result<String> {
    json.get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::parse(source_url, "episode JSON has no name"))
}

/// Episode cards of a season, starting at `first`
///
/// `season` is zero-based. A `first` past the last card yields an empty list.
pub fn season_cards(
    json: &Value,
    season: usize,
    first: usize,
    source_url: &str,
) -> Result<Vec<EpisodeCard>> {
    let seasons = json
        .get("seasons")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::parse(source_url, "episodes JSON has no seasons"))?;

    let season_value = seasons.get(season).ok_or_else(|| {
        Error::parse(
            source_url,
            format!(
                "season {} not found ({} available)",
                season + 1,
                seasons.len()
            ),
        )
    })?;

    let cards = season_value
        .get("episodes")
        .and_then(Value::as_array)
        .and_then(|episodes| episodes.first())
        .and_then(|block| block.get("cards"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            Error::parse(
                source_url,
                format!("season {} has no episode cards", season + 1),
            )
        })?;

    cards
        .iter()
        .skip(first)
        .map(|card| {
            EpisodeCard::deserialize(card).map_err(|e| {
                Error::parse(source_url, format!("malformed episode card: {}", e))
            })
        })
        .collect()
}

/// Join a possibly relative RaiPlay link onto the host
fn resolve(host: &str, link: &str) -> Result<String> {
    let base = Url::parse(host).map_err(|e| Error::Config(format!("invalid host {}: {}", host, e)))?;
    base.join(link)
        .map(|u| u.to_string())
        .map_err(|e| Error::parse(link, format!("cannot resolve link: {}", e)))
}
