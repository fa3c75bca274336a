use url::Url;

const MAX_STEM_LEN: usize = 120;

/// Convert a title to a filesystem-safe file stem
///
/// Keeps alphanumerics, spaces, `-` and `_`, drops everything else and trims
/// trailing whitespace.
pub fn sanitize_filename(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .take(MAX_STEM_LEN)
        .collect();
    cleaned.trim_end().to_string()
}

/// Last path segment of a URL, if it has one
pub fn last_path_segment(url: &Url) -> Option<&str> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
}

/// Split a file name into stem and lowercase extension
pub fn split_extension(name: &str) -> (&str, Option<String>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            (stem, Some(ext.to_ascii_lowercase()))
        }
        _ => (name, None),
    }
}

/// Extension of the URL's last path segment
pub fn url_extension(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let name = last_path_segment(&parsed)?;
    split_extension(name).1
}

/// Shorten a label for a progress bar, appending an ellipsis when cut
pub fn truncate_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        label.to_string()
    } else {
        let cut: String = label.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Il Commissario Montalbano"), "Il Commissario Montalbano");
        assert_eq!(sanitize_filename("Ep. 1: L'inizio / parte 2"), "Ep 1 Linizio  parte 2");
        assert_eq!(sanitize_filename("trailing   "), "trailing");
        assert_eq!(sanitize_filename("? leading"), " leading");
        assert_eq!(sanitize_filename("   "), "");
        assert_eq!(sanitize_filename("àèì-ok_1"), "àèì-ok_1");
        assert_eq!(sanitize_filename("???"), "");
    }

    #[test]
    fn test_sanitize_filename_limits_length() {
        let long = "a".repeat(500);
        assert_eq!(sanitize_filename(&long).len(), MAX_STEM_LEN);
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("ep1.mp4"), ("ep1", Some("mp4".to_string())));
        assert_eq!(split_extension("index.M3U8"), ("index", Some("m3u8".to_string())));
        assert_eq!(split_extension("ep1"), ("ep1", None));
        assert_eq!(split_extension(".hidden"), (".hidden", None));
    }

    #[test]
    fn test_url_extension() {
        assert_eq!(url_extension("https://cdn.test/ep1.mp4?token=x"), Some("mp4".to_string()));
        assert_eq!(url_extension("https://cdn.test/show/"), None);
        assert_eq!(url_extension("not a url"), None);
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("short", 10), "short");
        assert_eq!(truncate_label("a much longer title", 6), "a much...");
    }
}
