//! Strips executable content from model-produced HTML before it reaches the browser.

use once_cell::sync::Lazy;
use regex::Regex;

const EMBEDDING_TAGS: &[&str] = &["iframe", "object", "embed", "base"];

static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid regex"));
static SCRIPT_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</?script\b[^>]*>").expect("valid regex"));

/// Paired and self-closing forms of each embedding tag.
static EMBEDDING: Lazy<Vec<Regex>> = Lazy::new(|| {
    EMBEDDING_TAGS
        .iter()
        .flat_map(|tag| {
            [
                format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>"),
                format!(r"(?i)</?{tag}\b[^>]*>"),
            ]
        })
        .map(|pattern| Regex::new(&pattern).expect("valid regex"))
        .collect()
});

static EVENT_HANDLERS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r#"(?i)\son\w+\s*=\s*"[^"]*""#).expect("valid regex"),
        Regex::new(r"(?i)\son\w+\s*=\s*'[^']*'").expect("valid regex"),
        Regex::new(r"(?i)\son\w+\s*=\s*[^\s>]+").expect("valid regex"),
    ]
});

static JS_HREF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)href\s*=\s*['"]\s*javascript:[^'"]*['"]"#).expect("valid regex")
});
static JS_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)src\s*=\s*['"]\s*javascript:[^'"]*['"]"#).expect("valid regex")
});

pub fn sanitize_html(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    let mut out = SCRIPT_BLOCK.replace_all(html, "").into_owned();
    out = SCRIPT_OPEN.replace_all(&out, "").into_owned();
    for pattern in EMBEDDING.iter() {
        out = pattern.replace_all(&out, "").into_owned();
    }
    for pattern in EVENT_HANDLERS.iter() {
        out = pattern.replace_all(&out, "").into_owned();
    }
    out = JS_HREF.replace_all(&out, r##"href="#sanitized""##).into_owned();
    out = JS_SRC.replace_all(&out, r#"src="about:blank""#).into_owned();

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_blocks_removed() {
        let html = "<h1>Jane</h1><SCRIPT type=\"text/javascript\">alert(1)\n</script><p>Rust</p>";
        assert_eq!(sanitize_html(html), "<h1>Jane</h1><p>Rust</p>");
    }

    #[test]
    fn test_unclosed_script_tag_removed() {
        assert_eq!(sanitize_html("<p>a</p><script src=x>"), "<p>a</p>");
    }

    #[test]
    fn test_embedding_tags_removed() {
        let html = "<div><iframe src=\"https://evil\"></iframe><embed src=\"x.swf\"/><base href=\"/\"></div>";
        assert_eq!(sanitize_html(html), "<div></div>");
    }

    #[test]
    fn test_event_handlers_stripped() {
        let html = r#"<li onclick="steal()" class="b">A</li><img onerror='x()' src="a.png"><p onmouseover=go>t</p>"#;
        assert_eq!(
            sanitize_html(html),
            r#"<li class="b">A</li><img src="a.png"><p>t</p>"#
        );
    }

    #[test]
    fn test_javascript_uris_neutralized() {
        let html = r#"<a href="javascript:alert(1)">x</a><img src=' javascript:void(0)'>"#;
        assert_eq!(
            sanitize_html(html),
            r##"<a href="#sanitized">x</a><img src="about:blank">"##
        );
    }

    #[test]
    fn test_plain_resume_html_untouched() {
        let html = "<section><h2>Experience</h2><ul><li>Cut costs by 30%</li></ul></section>";
        assert_eq!(sanitize_html(html), html);
    }
}
