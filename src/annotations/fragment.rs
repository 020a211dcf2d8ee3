//! Single-line element fragments.
//!
//! The classifier answers with one element per line, e.g.
//! `<emotion int_id="i003" sent_id="s1" tags="ira, miedo"/>`. Each line must
//! be a well-formed element on its own: a name, quoted attributes, either
//! self-closing or closed by a matching tag, text content without child
//! elements, and nothing after it.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z_][\w.:-]*").unwrap());

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^([A-Za-z_][\w.:-]*)\s*=\s*(?:"([^"<]*)"|'([^'<]*)')"#).unwrap()
});

/// Reasons a fragment line is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FragmentError {
    #[error("Empty line")]
    Empty,

    #[error("Not an element")]
    NotAnElement,

    #[error("Malformed attribute at byte {0}")]
    BadAttribute(usize),

    #[error("Duplicate attribute: {0}")]
    DuplicateAttribute(String),

    #[error("Element <{0}> is not closed")]
    Unclosed(String),

    #[error("Child elements are not supported")]
    NestedElement,

    #[error("Unexpected content after the element")]
    TrailingContent,

    #[error("Invalid entity reference: {0}")]
    BadEntity(String),
}

/// A parsed one-line element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
}

impl Fragment {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Parse one line as a single element
pub fn parse_fragment(line: &str) -> Result<Fragment, FragmentError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(FragmentError::Empty);
    }

    let rest = line.strip_prefix('<').ok_or(FragmentError::NotAnElement)?;
    let name = NAME.find(rest).ok_or(FragmentError::NotAnElement)?.as_str();
    let mut pos = 1 + name.len();

    let mut attributes: Vec<(String, String)> = Vec::new();

    loop {
        let rest = &line[pos..];
        let trimmed = rest.trim_start();
        let had_space = trimmed.len() < rest.len();
        pos += rest.len() - trimmed.len();

        if let Some(after) = trimmed.strip_prefix("/>") {
            if !after.is_empty() {
                return Err(FragmentError::TrailingContent);
            }
            return Ok(Fragment {
                name: name.to_string(),
                attributes,
                text: String::new(),
            });
        }

        if trimmed.starts_with('>') {
            pos += 1;
            break;
        }

        if trimmed.is_empty() {
            return Err(FragmentError::Unclosed(name.to_string()));
        }

        // Attributes must be separated from the name and from each other
        if !had_space {
            return Err(FragmentError::BadAttribute(pos));
        }

        let caps = ATTRIBUTE
            .captures(trimmed)
            .ok_or(FragmentError::BadAttribute(pos))?;
        let key = caps[1].to_string();
        let raw = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());

        if attributes.iter().any(|(k, _)| *k == key) {
            return Err(FragmentError::DuplicateAttribute(key));
        }
        attributes.push((key, decode_entities(raw)?));
        pos += caps[0].len();
    }

    let body = &line[pos..];
    let closing = format!("</{}", name);
    let close_at = body
        .rfind(&closing)
        .ok_or_else(|| FragmentError::Unclosed(name.to_string()))?;

    let tail = body[close_at + closing.len()..].trim_start();
    if tail != ">" {
        return Err(if tail.starts_with('>') {
            FragmentError::TrailingContent
        } else {
            FragmentError::Unclosed(name.to_string())
        });
    }

    let content = &body[..close_at];
    if content.contains('<') {
        return Err(FragmentError::NestedElement);
    }

    Ok(Fragment {
        name: name.to_string(),
        attributes,
        text: decode_entities(content)?,
    })
}

/// Decode the predefined XML entities and numeric character references
pub fn decode_entities(raw: &str) -> Result<String, FragmentError> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| FragmentError::BadEntity(after.chars().take(8).collect()))?;
        let entity = &after[..semi];

        let decoded = match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            _ => numeric_reference(entity).ok_or_else(|| FragmentError::BadEntity(entity.to_string()))?,
        };
        out.push(decoded);
        rest = &after[semi + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

fn numeric_reference(entity: &str) -> Option<char> {
    let digits = entity.strip_prefix('#')?;
    let code = match digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}

/// Escape text for use inside an element or a double-quoted attribute
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
