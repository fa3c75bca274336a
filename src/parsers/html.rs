use crate::parsers::Tag;
use scraper::{Html, Selector};
use std::sync::LazyLock;

static CANDIDATE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("video, audio, source, meta, a, rai-episodes, [data-video-url], [data-media-url]")
        .expect("candidate selector should be valid")
});

/// Parses an HTML document and returns the candidate tags in document order
pub fn scan(html: &str) -> Vec<Tag> {
    let doc = Html::parse_document(html);

    let tags = doc
        .select(&CANDIDATE_SELECTOR)
        .map(|el| {
            let element = el.value();
            Tag {
                name: element.name().to_ascii_lowercase(),
                attrs: element
                    .attrs()
                    .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
                    .collect(),
            }
        })
        .collect::<Vec<_>>();

    ::log::debug!("DOM parser found {} candidate tags", tags.len());
    tags
}
