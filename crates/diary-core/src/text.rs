//! Plaintext extraction from the editor's HTML markup.
//!
//! Used for word counts and for the search index content.

/// Tags that separate words when removed.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote",
    "pre", "hr", "tr", "td", "th", "table", "section", "article",
];

/// Strip markup tags and decode the common entities.
///
/// Block-level tags become whitespace so that `<p>a</p><p>b</p>` reads as
/// two words. Inline tags vanish without a gap.
pub fn strip_markup(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut rest = markup;

    while let Some(start) = rest.find('<') {
        out.push_str(&decode_entities(&rest[..start]));
        let after = &rest[start + 1..];
        match after.find('>') {
            Some(end) => {
                if is_block_tag(&after[..end]) {
                    out.push(' ');
                }
                rest = &after[end + 1..];
            }
            None => {
                // Unterminated '<' is literal text
                out.push('<');
                rest = after;
            }
        }
    }
    out.push_str(&decode_entities(rest));
    out
}

/// Word count of `markup` once tags are stripped.
pub fn count_words(markup: &str) -> u32 {
    let count = strip_markup(markup).split_whitespace().count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Lowercase element name of the text between `<` and `>`, and whether it
/// is a closing tag.
pub(crate) fn tag_name(tag: &str) -> (String, bool) {
    let closing = tag.starts_with('/');
    let name = tag
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    (name, closing)
}

fn is_block_tag(tag: &str) -> bool {
    let (name, _) = tag_name(tag);
    BLOCK_TAGS.contains(&name.as_str())
}

pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
