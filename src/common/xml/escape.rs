use crate::ooxml::opc::error::{OpcError, Result};
use aho_corasick::{AhoCorasick, MatchKind};
use once_cell::sync::Lazy;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;

// Static initialization: automaton is built only once, thread-safe
static XML_ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .build(["&", "<", ">", "\"", "'"])
        .expect("Failed to build XML escaper")
});

// LeftmostLongest so "&amp;lt;" unescapes to "&lt;" rather than "<"
static XML_UNESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .match_kind(MatchKind::LeftmostLongest)
        .build(["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"])
        .expect("Failed to build XML unescaper")
});

/// Escape XML special characters for use in attribute values and text.
///
/// # Examples
///
/// ```
/// use opcgraph::common::xml::escape_xml;
/// assert_eq!(escape_xml("a & b"), "a &amp; b");
/// assert_eq!(escape_xml("<r Id=\"1\"/>"), "&lt;r Id=&quot;1&quot;/&gt;");
/// ```
#[inline]
pub fn escape_xml(s: &str) -> String {
    XML_ESCAPER.replace_all(s, &["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"])
}

/// Unescape the five predefined XML entities.
///
/// Unknown or malformed entities are left unchanged.
///
/// ```
/// use opcgraph::common::xml::unescape_xml;
/// assert_eq!(unescape_xml("&lt;a &amp; b&gt;"), "<a & b>");
/// assert_eq!(unescape_xml("&amp;lt;"), "&lt;");
/// assert_eq!(unescape_xml("&invalid;"), "&invalid;");
/// ```
#[inline]
pub fn unescape_xml(s: &str) -> String {
    XML_UNESCAPER.replace_all(s, &["&", "<", ">", "\"", "'"])
}

/// Append the character data carried by a text-like reader event to `out`.
///
/// quick-xml reports entity references inside text as separate `GeneralRef` events,
/// so element text has to be stitched back together from `Text` and `GeneralRef`
/// events. Returns `false` for any other kind of event.
pub fn push_text_event(out: &mut String, event: &Event<'_>) -> Result<bool> {
    match event {
        Event::Text(text) => {
            out.push_str(&text.decode()?);
            Ok(true)
        },
        Event::GeneralRef(reference) => {
            if let Some(ch) = reference.resolve_char_ref()? {
                out.push(ch);
                return Ok(true);
            }
            let name = reference.decode()?;
            let resolved = resolve_predefined_entity(&name)
                .ok_or_else(|| OpcError::XmlError(format!("Unknown entity '&{};'", name)))?;
            out.push_str(resolved);
            Ok(true)
        },
        _ => Ok(false),
    }
}
