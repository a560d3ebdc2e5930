//! Tag stream over the registry's XML dialect.
//!
//! The dialect is deliberately small: a closed tag vocabulary, no attributes,
//! no namespaces. A tag's value is the text immediately following its opening
//! tag, up to the next `<`. Whitespace between tags is insignificant.

use crate::error::{RegistryError, Result};
use std::io::Write;

/// Tag vocabulary of the registry file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    ProductRegistry,
    Version,
    Components,
    CompId,
    CompVersion,
    UniqueName,
    DisplayName,
    CompInstance,
    Parent,
    Children,
    CompType,
    Location,
    Uninstaller,
    Compatible,
    Dependent,
    Required,
    Data,
    Instance,
    CompRef,
    Key,
    Value,
    Name,
    Id,
    Vendor,
    Language,
    LocalizedName,
}

/// Static name table; the index of each entry is the tag's numeric id.
const TAG_NAMES: [(&str, Tag); 26] = [
    ("productregistry", Tag::ProductRegistry),
    ("version", Tag::Version),
    ("components", Tag::Components),
    ("compid", Tag::CompId),
    ("compversion", Tag::CompVersion),
    ("uniquename", Tag::UniqueName),
    ("displayname", Tag::DisplayName),
    ("compinstance", Tag::CompInstance),
    ("parent", Tag::Parent),
    ("children", Tag::Children),
    ("comptype", Tag::CompType),
    ("location", Tag::Location),
    ("uninstaller", Tag::Uninstaller),
    ("compatible", Tag::Compatible),
    ("dependent", Tag::Dependent),
    ("required", Tag::Required),
    ("data", Tag::Data),
    ("instance", Tag::Instance),
    ("compref", Tag::CompRef),
    ("key", Tag::Key),
    ("value", Tag::Value),
    ("name", Tag::Name),
    ("id", Tag::Id),
    ("vendor", Tag::Vendor),
    ("language", Tag::Language),
    ("localizedname", Tag::LocalizedName),
];

impl Tag {
    pub fn from_name(name: &str) -> Option<Tag> {
        TAG_NAMES
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, tag)| *tag)
    }

    pub fn name(self) -> &'static str {
        TAG_NAMES[self as usize].0
    }
}

/// One item of the tag stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagEvent {
    Open { tag: Tag, value: Option<String> },
    Close { tag: Tag },
}

/// Pull reader producing [`TagEvent`]s from registry text.
pub struct TagReader<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    pending_close: Option<Tag>,
}

impl<'a> TagReader<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            pending_close: None,
        }
    }

    /// Line of the most recently consumed input.
    pub fn line(&self) -> usize {
        self.line
    }

    fn error(&self, message: impl Into<String>) -> RegistryError {
        RegistryError::Parse {
            line: self.line,
            message: message.into(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn advance(&mut self, len: usize) -> &'a str {
        let consumed = &self.input[self.pos..self.pos + len];
        self.line += consumed.matches('\n').count();
        self.pos += len;
        consumed
    }

    /// Consume everything up to and including `terminator`.
    fn skip_past(&mut self, terminator: &str) -> Result<()> {
        match self.rest().find(terminator) {
            Some(idx) => {
                self.advance(idx + terminator.len());
                Ok(())
            }
            None => Err(self.error(format!("Unterminated construct, expected {:?}", terminator))),
        }
    }

    /// Consume text up to the next `<` (or end of input).
    fn take_text(&mut self) -> &'a str {
        let len = self.rest().find('<').unwrap_or(self.rest().len());
        self.advance(len)
    }

    /// Next tag, or `None` at end of input.
    pub fn read_tag(&mut self) -> Result<Option<TagEvent>> {
        if let Some(tag) = self.pending_close.take() {
            return Ok(Some(TagEvent::Close { tag }));
        }

        loop {
            let text = self.take_text();
            if !text.trim().is_empty() {
                return Err(self.error(format!("Unexpected text {:?}", text.trim())));
            }
            if self.rest().is_empty() {
                return Ok(None);
            }

            let rest = self.rest();
            if rest.starts_with("<?") {
                self.skip_past("?>")?;
                continue;
            }
            if rest.starts_with("<!--") {
                self.skip_past("-->")?;
                continue;
            }

            let end = match rest.find('>') {
                Some(end) => end,
                None => return Err(self.error("Unterminated tag")),
            };
            let raw = self.advance(end + 1);
            let inner = raw[1..raw.len() - 1].trim();

            if let Some(name) = inner.strip_prefix('/') {
                let tag = self.lookup(name.trim())?;
                return Ok(Some(TagEvent::Close { tag }));
            }

            if let Some(name) = inner.strip_suffix('/') {
                let tag = self.lookup(name.trim())?;
                self.pending_close = Some(tag);
                return Ok(Some(TagEvent::Open { tag, value: None }));
            }

            let tag = self.lookup(inner)?;
            let text = self.take_text().trim();
            let value = if text.is_empty() {
                None
            } else {
                Some(unescape(text))
            };
            return Ok(Some(TagEvent::Open { tag, value }));
        }
    }

    fn lookup(&self, name: &str) -> Result<Tag> {
        if name.contains(char::is_whitespace) {
            return Err(self.error(format!("Attributes are not supported: <{}>", name)));
        }
        Tag::from_name(name).ok_or_else(|| self.error(format!("Unknown tag <{}>", name)))
    }
}

/// Indenting writer for the registry dialect.
pub struct TagWriter<W: Write> {
    out: W,
    depth: usize,
}

impl<W: Write> TagWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, depth: 0 }
    }

    fn indent(&mut self) -> std::io::Result<()> {
        for _ in 0..self.depth {
            self.out.write_all(b"  ")?;
        }
        Ok(())
    }

    /// Open `tag`, with `value` as its leading text; nested tags follow.
    pub fn write_open(&mut self, tag: Tag, value: Option<&str>) -> std::io::Result<()> {
        self.indent()?;
        match value {
            Some(value) => writeln!(self.out, "<{}>{}", tag.name(), escape(value))?,
            None => writeln!(self.out, "<{}>", tag.name())?,
        }
        self.depth += 1;
        Ok(())
    }

    pub fn write_close(&mut self, tag: Tag) -> std::io::Result<()> {
        self.depth = self.depth.saturating_sub(1);
        self.indent()?;
        writeln!(self.out, "</{}>", tag.name())
    }

    /// Single-line `<tag>value</tag>`.
    pub fn write_tag(&mut self, tag: Tag, value: &str) -> std::io::Result<()> {
        self.indent()?;
        writeln!(self.out, "<{0}>{1}</{0}>", tag.name(), escape(value))
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
