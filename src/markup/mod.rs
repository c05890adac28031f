use regex::Regex;
use std::sync::LazyLock;

pub(crate) const WORDS_PER_MINUTE: usize = 200;

/// Placeholder the visual editor is seeded with when the buffer is empty.
pub(crate) const EMPTY_EDITOR_HTML: &str = "<p><br></p>";

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static BODY_CONTENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<body[^>]*>(.*?)</body>").expect("valid regex"));

static DOCUMENT_TAGS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)<!DOCTYPE[^>]*>",
        r"(?i)<html[^>]*>",
        r"(?i)</html>",
        r"(?is)<head[^>]*>.*?</head>",
        r"(?i)<meta[^>]*>",
        r"(?is)<title[^>]*>.*?</title>",
        r"(?i)<link[^>]*>",
        r"(?i)<body[^>]*>",
        r"(?i)</body>",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Reduce a full HTML document to the fragment the renderer may hold.
///
/// Input without `<html`/`<body` markers is only trimmed. When the body cannot
/// be matched (unterminated or empty), document-level tags are stripped instead.
pub(crate) fn clean_html_fragment(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    let lower = html.to_lowercase();
    if !lower.contains("<html") && !lower.contains("<body") {
        return html.trim().to_string();
    }

    if let Some(body) = BODY_CONTENT
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
    {
        return body.trim().to_string();
    }

    let mut out = html.to_string();
    for re in DOCUMENT_TAGS.iter() {
        out = re.replace_all(&out, "").into_owned();
    }
    out.trim().to_string()
}

/// Count whitespace-separated tokens the way a plain split does: empty text is one token.
pub(crate) fn word_count(text: &str) -> usize {
    WHITESPACE.split(text).count()
}

/// Minutes to read at 200 words per minute, never below one.
pub(crate) fn reading_time_minutes(markdown: &str) -> usize {
    word_count(markdown).div_ceil(WORDS_PER_MINUTE).max(1)
}

/// Content as it leaves the rich-text widget.
///
/// The widget boundary decides once which kind it produced; nothing downstream
/// inspects the payload to guess.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum EditorContent {
    /// Plain string payload, taken verbatim.
    Raw(String),
    /// Markup taken from a live DOM subtree; may carry document-level wrappers.
    Fragment(String),
}

impl EditorContent {
    pub fn into_html(self) -> String {
        match self {
            EditorContent::Raw(s) => s,
            EditorContent::Fragment(s) => clean_html_fragment(&s),
        }
    }
}

/// `data:` URL for a base64 image field, with the media type read from the leading bytes.
pub(crate) fn image_data_url(base64: &str) -> String {
    let mime = match base64.as_bytes() {
        [b'i', b'V', b'B', b'O', b'R', ..] => "image/png",
        [b'/', b'9', b'j', b'/', ..] => "image/jpeg",
        [b'R', b'0', b'l', b'G', b'O', b'D', ..] => "image/gif",
        [b'U', b'k', b'l', b'G', b'R', ..] => "image/webp",
        [b'P', b'H', b'N', b'2', b'Z', ..] | [b'P', b'D', b'9', b'4', ..] => "image/svg+xml",
        _ => "image/png",
    };
    format!("data:{mime};base64,{base64}")
}

/// A live editing surface the viewer can pull content from.
pub(crate) trait ContentSource: Send + Sync {
    fn snapshot(&self) -> EditorContent;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_full_document_extracts_body() {
        assert_eq!(clean_html_fragment("<html><body>X</body></html>"), "X");
    }

    #[test]
    fn test_clean_body_with_attributes_and_newlines() {
        let doc = "<!DOCTYPE html>\n<HTML><head><title>t</title></head>\n<BODY class=\"a\">\n  <p>one</p>\n<p>two</p>\n</BODY></HTML>";
        assert_eq!(clean_html_fragment(doc), "<p>one</p>\n<p>two</p>");
    }

    #[test]
    fn test_clean_plain_fragment_is_trimmed_only() {
        assert_eq!(clean_html_fragment("  <p>hello</p>\n"), "<p>hello</p>");
        assert_eq!(clean_html_fragment(""), "");
    }

    #[test]
    fn test_clean_unterminated_body_strips_tags() {
        let out = clean_html_fragment(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>T</title></head><body><p>X</p>",
        );
        assert_eq!(out, "<p>X</p>");
    }

    #[test]
    fn test_clean_empty_body_falls_back() {
        let out = clean_html_fragment("<html><link rel=\"x\"><body></body></html>");
        assert_eq!(out, "");
    }

    #[test]
    fn test_image_data_url_detects_media_type() {
        assert_eq!(image_data_url("/9j/4AAQ"), "data:image/jpeg;base64,/9j/4AAQ");
        assert_eq!(image_data_url("iVBORw0KGgo"), "data:image/png;base64,iVBORw0KGgo");
        assert!(image_data_url("R0lGODlh").starts_with("data:image/gif;"));
        assert!(image_data_url("PHN2ZyB4").starts_with("data:image/svg+xml;"));
    }

    #[test]
    fn test_reading_time_boundaries() {
        let four_hundred = vec!["word"; 400].join(" ");
        assert_eq!(reading_time_minutes(&four_hundred), 2);
        assert_eq!(reading_time_minutes("word"), 1);
        assert_eq!(reading_time_minutes(""), 1);

        let two_hundred_one = vec!["w"; 201].join(" ");
        assert_eq!(reading_time_minutes(&two_hundred_one), 2);
    }

    #[test]
    fn test_word_count_matches_plain_split() {
        assert_eq!(word_count(""), 1);
        assert_eq!(word_count("a  b\n\tc"), 3);
        // Leading/trailing whitespace yields empty edge tokens.
        assert_eq!(word_count(" a "), 3);
    }

    #[test]
    fn test_editor_content_into_html() {
        assert_eq!(
            EditorContent::Raw("<html><body>x</body></html>".to_string()).into_html(),
            "<html><body>x</body></html>"
        );
        assert_eq!(
            EditorContent::Fragment("<html><body>x</body></html>".to_string()).into_html(),
            "x"
        );
    }
}
