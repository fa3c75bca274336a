use crate::error::Error;
use crate::filter::{MediaFilter, MediaFilterConfig};
use crate::parsers::{MediaLocator, ParserBackend};
use crate::results::{MediaReference, PageContent};

const BACKENDS: [ParserBackend; 2] = [ParserBackend::Dom, ParserBackend::Fast];

fn locator(backend: ParserBackend) -> MediaLocator {
    MediaLocator::new(backend, MediaFilter::default())
}

fn page(body: &str) -> PageContent {
    PageContent::new("https://example.test/show/ep1", body)
}

#[test]
fn test_single_marker_yields_one_reference() {
    let html = r#"<html><body><h1>Episode 1</h1>
        <video controls src="https://cdn.test/ep1.mp4"></video>
        </body></html>"#;

    for backend in BACKENDS {
        let refs = locator(backend).locate(&page(html)).unwrap();
        assert_eq!(refs.len(), 1, "{:?}", backend);
        assert_eq!(
            refs.first(),
            &MediaReference::new("https://cdn.test/ep1.mp4").with_format_hint("mp4")
        );
    }
}

#[test]
fn test_no_marker_is_parse_error() {
    let html = r#"<html><body><p>Nothing to see</p><a href="/about.html">About</a></body></html>"#;

    for backend in BACKENDS {
        match locator(backend).locate(&page(html)) {
            Err(Error::Parse { source_url, .. }) => {
                assert_eq!(source_url, "https://example.test/show/ep1")
            }
            other => panic!("{:?}: expected parse error, got {:?}", backend, other),
        }
    }
}

#[test]
fn test_empty_body_is_parse_error() {
    for backend in BACKENDS {
        assert!(locator(backend).locate(&page("")).is_err());
    }
}

#[test]
fn test_locate_is_idempotent() {
    let html = r#"<video src="/a.mp4"></video><a href="/b.m3u8">b</a>"#;
    let content = page(html);

    for backend in BACKENDS {
        let locator = locator(backend);
        let first = locator.locate(&content).unwrap();
        let second = locator.locate(&content).unwrap();
        assert_eq!(first, second);

        // Iterating the same result twice yields the same sequence
        let a: Vec<_> = first.iter().cloned().collect();
        let b: Vec<_> = first.iter().cloned().collect();
        assert_eq!(a, b);
    }
}

#[test]
fn test_document_order_and_dedup() {
    let html = r#"<html><head>
        <meta property="og:video" content="https://cdn.test/og.mp4">
        </head><body>
        <a href="/files/second.mp4" title="Second">Second</a>
        <video src="https://cdn.test/og.mp4"></video>
        <div data-video-url="/stream/third.m3u8"></div>
        <a href="/files/second.mp4">again</a>
        </body></html>"#;

    for backend in BACKENDS {
        let refs = locator(backend).locate(&page(html)).unwrap();
        let urls: Vec<_> = refs.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://cdn.test/og.mp4",
                "https://example.test/files/second.mp4",
                "https://example.test/stream/third.m3u8",
            ],
            "{:?}",
            backend
        );
        assert_eq!(refs.first().url, "https://cdn.test/og.mp4");
        assert_eq!(refs.iter().nth(1).unwrap().title.as_deref(), Some("Second"));
        assert_eq!(
            refs.iter().nth(2).unwrap().format_hint.as_deref(),
            Some("m3u8")
        );
    }
}

#[test]
fn test_backends_are_equivalent() {
    let html = r#"<!doctype html>
        <html><head>
        <meta property="og:video:secure_url" content="https://cdn.test/og.mp4?x=1&amp;y=2" />
        <meta property="og:title" content="Ignored">
        </head><body>
        <!-- <video src="/commented.mp4"></video> -->
        <video poster="/p.jpg"><source src="/media/hls.m3u8" type="application/x-mpegURL"><source src="/media/low.webm" type="video/webm"></video>
        <picture><source srcset="/img.webp"><img src="/img.jpg"></picture>
        <audio src='/radio/ep.mp3' data-title="Radio"></audio>
        <a href="https://other.test/page.html">not media</a>
        <a HREF="https://cdn.test/Download.MP4">download</a>
        <script>var x = "<video src='/script.mp4'>";</script>
        </body></html>"#;

    let dom = locator(ParserBackend::Dom).locate(&page(html)).unwrap();
    let fast = locator(ParserBackend::Fast).locate(&page(html)).unwrap();
    assert_eq!(dom, fast);

    let urls: Vec<_> = dom.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://cdn.test/og.mp4?x=1&y=2",
            "https://example.test/media/hls.m3u8",
            "https://example.test/media/low.webm",
            "https://example.test/radio/ep.mp3",
            "https://cdn.test/Download.MP4",
        ]
    );
    assert_eq!(dom.iter().nth(3).unwrap().title.as_deref(), Some("Radio"));
}

#[test]
fn test_backends_agree_on_entities_and_raw_text() {
    let cases = [
        (
            r#"<video src="/a.mp4" title="Citt&agrave; &egrave; bella"></video>"#,
            "https://example.test/a.mp4",
            Some("Città è bella"),
        ),
        (
            r#"<noscript><a href="/ns.mp4">fallback</a></noscript><video src="/b.mp4"></video>"#,
            "https://example.test/b.mp4",
            None,
        ),
        (
            r#"<textarea><video src="/t.mp4"></video></textarea><audio src="/c.mp3"></audio>"#,
            "https://example.test/c.mp3",
            None,
        ),
    ];

    for (html, url, title) in cases {
        let dom = locator(ParserBackend::Dom).locate(&page(html)).unwrap();
        let fast = locator(ParserBackend::Fast).locate(&page(html)).unwrap();
        assert_eq!(dom, fast, "{}", html);
        assert_eq!(dom.len(), 1, "{}", html);
        assert_eq!(dom.first().url, url);
        assert_eq!(dom.first().title.as_deref(), title);
    }
}

#[test]
fn test_explicit_markers_bypass_include_patterns() {
    // A video element without a recognisable extension is still media
    let html = r#"<video src="https://cdn.test/relinker?cont=abc"></video>
        <a href="https://cdn.test/relinker?cont=def">link</a>"#;

    for backend in BACKENDS {
        let refs = locator(backend).locate(&page(html)).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs.first().url, "https://cdn.test/relinker?cont=abc");
        assert_eq!(refs.first().format_hint, None);
    }
}

#[test]
fn test_exclude_patterns_apply_to_all_markers() {
    let filter = MediaFilter::new(MediaFilterConfig {
        exclude_patterns: vec!["trailer".to_string()],
        ..MediaFilterConfig::default()
    })
    .unwrap();
    let locator = MediaLocator::new(ParserBackend::Dom, filter);

    let html = r#"<video src="/trailer.mp4"></video><a href="/full.mp4">full</a>"#;
    let refs = locator.locate(&page(html)).unwrap();
    assert_eq!(refs.len(), 1);
    assert_eq!(refs.first().url, "https://example.test/full.mp4");
}

#[test]
fn test_invalid_page_url() {
    let content = PageContent::new("not a url", r#"<video src="/a.mp4"></video>"#);
    assert!(matches!(
        MediaLocator::default().locate(&content),
        Err(Error::Parse { .. })
    ));
}
