//! DrawingML text elements.
//!
//! Text bodies and paragraphs are handled as XML fragments and edited with
//! quick-xml event rewriting, so markup this module does not understand passes
//! through unchanged.

use crate::ooxml::opc::constants::namespace;
use crate::ooxml::opc::error::{OpcError, Result};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::fmt;
use std::str::FromStr;

/// Horizontal alignment of a paragraph.
///
/// Maps to the `ST_TextAlignType` tokens used by the `algn` attribute of `<a:pPr>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParagraphAlignment {
    Center,
    Distribute,
    Justify,
    JustifyLow,
    Left,
    Right,
    ThaiDistribute,
}

impl ParagraphAlignment {
    pub const ALL: [ParagraphAlignment; 7] = [
        ParagraphAlignment::Center,
        ParagraphAlignment::Distribute,
        ParagraphAlignment::Justify,
        ParagraphAlignment::JustifyLow,
        ParagraphAlignment::Left,
        ParagraphAlignment::Right,
        ParagraphAlignment::ThaiDistribute,
    ];

    /// The text-align-type token for this alignment.
    pub const fn as_token(self) -> &'static str {
        match self {
            ParagraphAlignment::Center => "ctr",
            ParagraphAlignment::Distribute => "dist",
            ParagraphAlignment::Justify => "just",
            ParagraphAlignment::JustifyLow => "justLow",
            ParagraphAlignment::Left => "l",
            ParagraphAlignment::Right => "r",
            ParagraphAlignment::ThaiDistribute => "thaiDist",
        }
    }

    /// Map an optional `algn` token to an alignment. An absent token means
    /// "inherited" and maps to None.
    ///
    /// Fails with [`OpcError::InvalidValue`] for a token that is not a text-align type.
    pub fn from_text_align_type(token: Option<&str>) -> Result<Option<Self>> {
        token.map(str::parse::<Self>).transpose()
    }

    /// Map an optional alignment back to its `algn` token.
    pub fn to_text_align_type(alignment: Option<Self>) -> Option<&'static str> {
        alignment.map(Self::as_token)
    }
}

impl FromStr for ParagraphAlignment {
    type Err = OpcError;

    fn from_str(token: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|alignment| alignment.as_token() == token)
            .ok_or_else(|| OpcError::InvalidValue(format!("unknown text align type '{}'", token)))
    }
}

impl fmt::Display for ParagraphAlignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

fn xml_error(context: &str, err: impl fmt::Display) -> OpcError {
    OpcError::XmlError(format!("{}: {}", context, err))
}

/// A `<p:txBody>` shape text body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBody {
    xml: String,
}

impl TextBody {
    /// XML of a new, empty text body: body properties, list style and one
    /// empty paragraph.
    pub fn new_xml() -> String {
        format!(
            "<p:txBody xmlns:a=\"{}\" xmlns:p=\"{}\">\n  <a:bodyPr/>\n  <a:lstStyle/>\n  <a:p/>\n</p:txBody>\n",
            namespace::DML_MAIN,
            namespace::PML_MAIN
        )
    }

    /// A new, empty text body.
    pub fn new() -> Self {
        Self {
            xml: Self::new_xml(),
        }
    }

    /// Wrap existing `<p:txBody>` XML.
    pub fn from_xml<S: Into<String>>(xml: S) -> Self {
        Self { xml: xml.into() }
    }

    #[inline]
    pub fn xml(&self) -> &str {
        &self.xml
    }

    /// The `<a:p>` children of this text body, in document order.
    pub fn paragraphs(&self) -> Result<Vec<TextParagraph>> {
        let mut reader = Reader::from_str(&self.xml);
        let mut paragraphs = Vec::new();
        let mut depth = 0usize;
        let mut start = None;

        loop {
            let before = reader.buffer_position() as usize;
            match reader.read_event()? {
                Event::Start(e) => {
                    if depth == 1 && e.local_name().as_ref() == b"p" {
                        start = Some(before);
                    }
                    depth += 1;
                },
                Event::Empty(e) => {
                    if depth == 1 && e.local_name().as_ref() == b"p" {
                        let end = reader.buffer_position() as usize;
                        paragraphs.push(TextParagraph::from_xml(&self.xml[before..end]));
                    }
                },
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                    if depth == 1 {
                        if let Some(begin) = start.take() {
                            let end = reader.buffer_position() as usize;
                            paragraphs.push(TextParagraph::from_xml(&self.xml[begin..end]));
                        }
                    }
                },
                Event::Eof => break,
                _ => {},
            }
        }

        Ok(paragraphs)
    }
}

impl Default for TextBody {
    fn default() -> Self {
        Self::new()
    }
}

/// A single `<a:p>` paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextParagraph {
    xml: String,
}

impl TextParagraph {
    /// Wrap the XML of one `<a:p>` element.
    pub fn from_xml<S: Into<String>>(xml: S) -> Self {
        Self { xml: xml.into() }
    }

    #[inline]
    pub fn to_xml(&self) -> &str {
        &self.xml
    }

    /// Raw value of the `algn` attribute on the `<a:pPr>` child, if any.
    pub fn algn(&self) -> Result<Option<String>> {
        let mut reader = Reader::from_str(&self.xml);
        let mut depth = 0usize;

        loop {
            let (e, is_start) = match reader.read_event()? {
                Event::Start(e) => (e, true),
                Event::Empty(e) => (e, false),
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                    continue;
                },
                Event::Eof => return Ok(None),
                _ => continue,
            };

            if depth == 1 && e.local_name().as_ref() == b"pPr" {
                for attr in e.attributes() {
                    let attr = attr?;
                    if attr.key.as_ref() == b"algn" {
                        let value = attr.decode_and_unescape_value(reader.decoder())?;
                        return Ok(Some(value.into_owned()));
                    }
                }
                return Ok(None);
            }
            if is_start {
                depth += 1;
            }
        }
    }

    /// Paragraph alignment, or None when it is inherited.
    pub fn alignment(&self) -> Result<Option<ParagraphAlignment>> {
        ParagraphAlignment::from_text_align_type(self.algn()?.as_deref())
    }

    /// Set or clear the paragraph alignment.
    pub fn set_alignment(&mut self, alignment: Option<ParagraphAlignment>) -> Result<()> {
        self.set_algn(ParagraphAlignment::to_text_align_type(alignment))
    }

    /// Set the `algn` attribute on the `<a:pPr>` child.
    ///
    /// With `Some`, a missing `<a:pPr>` is created as the first child. With `None`,
    /// the attribute is removed, and an `<a:pPr>` left without attributes is removed
    /// together with its children.
    pub fn set_algn(&mut self, value: Option<&str>) -> Result<()> {
        let has_ppr = self.has_ppr()?;
        let mut reader = Reader::from_str(&self.xml);
        let mut writer = Writer::new(Vec::with_capacity(self.xml.len() + 32));
        let mut depth = 0usize;
        // inside an attribute-less <a:pPr> that is being dropped
        let mut skipping = false;
        let mut skip_depth = 0usize;

        loop {
            let event = reader.read_event()?;

            if skipping {
                match event {
                    Event::Start(_) => skip_depth += 1,
                    Event::End(_) if skip_depth == 0 => skipping = false,
                    Event::End(_) => skip_depth -= 1,
                    Event::Eof => break,
                    _ => {},
                }
                continue;
            }

            match event {
                Event::Start(e) if depth == 0 => {
                    let ppr_name = sibling_name(&e, "pPr")?;
                    write(&mut writer, Event::Start(e))?;
                    if let (Some(value), false) = (value, has_ppr) {
                        write(&mut writer, Event::Empty(new_ppr(&ppr_name, value)))?;
                    }
                    depth += 1;
                },
                Event::Empty(e) if depth == 0 => match (value, has_ppr) {
                    (Some(value), false) => {
                        let root_name = std::str::from_utf8(e.name().as_ref())?.to_string();
                        let ppr_name = sibling_name(&e, "pPr")?;
                        write(&mut writer, Event::Start(e))?;
                        write(&mut writer, Event::Empty(new_ppr(&ppr_name, value)))?;
                        write(&mut writer, Event::End(BytesEnd::new(root_name)))?;
                    },
                    _ => write(&mut writer, Event::Empty(e))?,
                },
                Event::Start(e) if depth == 1 && e.local_name().as_ref() == b"pPr" => {
                    let (ppr, attr_count) = rewrite_algn(&e, value)?;
                    if attr_count == 0 {
                        skipping = true;
                        skip_depth = 0;
                    } else {
                        depth += 1;
                        write(&mut writer, Event::Start(ppr))?;
                    }
                },
                Event::Empty(e) if depth == 1 && e.local_name().as_ref() == b"pPr" => {
                    let (ppr, attr_count) = rewrite_algn(&e, value)?;
                    if attr_count > 0 {
                        write(&mut writer, Event::Empty(ppr))?;
                    }
                },
                Event::Start(e) => {
                    depth += 1;
                    write(&mut writer, Event::Start(e))?;
                },
                Event::End(e) => {
                    depth = depth.saturating_sub(1);
                    write(&mut writer, Event::End(e))?;
                },
                Event::Eof => break,
                other => write(&mut writer, other)?,
            }
        }

        self.xml = String::from_utf8(writer.into_inner())
            .map_err(|e| xml_error("Invalid UTF-8 in generated XML", e))?;
        Ok(())
    }

    fn has_ppr(&self) -> Result<bool> {
        let mut reader = Reader::from_str(&self.xml);
        let mut depth = 0usize;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    if depth == 1 && e.local_name().as_ref() == b"pPr" {
                        return Ok(true);
                    }
                    depth += 1;
                },
                Event::Empty(e) => {
                    if depth == 1 && e.local_name().as_ref() == b"pPr" {
                        return Ok(true);
                    }
                },
                Event::End(_) => depth = depth.saturating_sub(1),
                Event::Eof => return Ok(false),
                _ => {},
            }
        }
    }
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| xml_error("Failed to write paragraph XML", e))
}

/// Qualified name of `local` using the namespace prefix of `element`.
fn sibling_name(element: &BytesStart<'_>, local: &str) -> Result<String> {
    let name = element.name();
    Ok(match name.prefix() {
        Some(prefix) => format!("{}:{}", std::str::from_utf8(prefix.as_ref())?, local),
        None => local.to_string(),
    })
}

fn new_ppr(name: &str, algn: &str) -> BytesStart<'static> {
    let mut ppr = BytesStart::new(name.to_string());
    ppr.push_attribute(("algn", algn));
    ppr
}

/// Copy `ppr` with its `algn` attribute replaced, added, or (for None) dropped.
///
/// Returns the new start tag and its attribute count.
fn rewrite_algn(ppr: &BytesStart<'_>, algn: Option<&str>) -> Result<(BytesStart<'static>, usize)> {
    let name = std::str::from_utf8(ppr.name().as_ref())?.to_string();
    let mut rewritten = BytesStart::new(name);
    let mut attr_count = 0usize;
    let mut replaced = false;

    for attr in ppr.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"algn" {
            if let Some(value) = algn {
                rewritten.push_attribute(("algn", value));
                attr_count += 1;
                replaced = true;
            }
            continue;
        }
        rewritten.push_attribute(attr);
        attr_count += 1;
    }

    if let (Some(value), false) = (algn, replaced) {
        rewritten.push_attribute(("algn", value));
        attr_count += 1;
    }

    Ok((rewritten, attr_count))
}
