//! Image reference extraction.
//!
//! Finds embedded images in plain text. Two syntaxes are recognised:
//!
//! - Markdown inline images: `![alt](path/to/image.png)`
//! - HTML tags: `<img src="image.png" alt="alt" width="500" height="300">`
//!
//! Dimensions can also ride along as query parameters on the path
//! (`image.png?width=500&height=300`); those parameters are stripped from the cleaned path.
//! An explicit tag attribute always wins over a query parameter.
//!
//! Extraction never fails: a tag without a usable `src` is simply skipped.

use once_cell::sync::Lazy;
use regex::Regex;

static IMAGE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"!\[(?P<alt>[^\]]*)\]\((?P<path>[^)]+)\)|(?P<tag><img\b[^>]*>)"#)
        .expect("image pattern is valid")
});

static ATTRIBUTE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?P<name>src|alt|width|height)\s*=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')"#)
        .expect("attribute pattern is valid")
});

/// An image referenced from document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub alt_text: String,
    /// The path with any `width`/`height` query parameters removed
    pub path: String,
    /// `false` only when the path starts with `http://` or `https://`
    pub is_local: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ImageReference {
    fn new(alt_text: String, raw_path: &str, width: Option<u32>, height: Option<u32>) -> Self {
        let (path, query_width, query_height) = parse_image_path(raw_path);
        ImageReference {
            alt_text,
            is_local: is_local_path(&path),
            path,
            width: width.or(query_width),
            height: height.or(query_height),
        }
    }

    /// Caption fragment describing the dimensions, e.g. `(width: 100px, height: 50px)`.
    ///
    /// Returns `None` when neither dimension is known.
    pub fn dimension_note(&self) -> Option<String> {
        let parts: Vec<String> = [("width", self.width), ("height", self.height)]
            .into_iter()
            .filter_map(|(name, value)| value.map(|px| format!("{name}: {px}px")))
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(format!("({})", parts.join(", ")))
        }
    }
}

/// Iterator over the image references of a text, in order of appearance.
///
/// Created by [`find_image_references`]. Cloning the iterator restarts from the clone point.
#[derive(Debug, Clone)]
pub struct ImageReferences<'a> {
    text: &'a str,
    position: usize,
}

impl Iterator for ImageReferences<'_> {
    type Item = ImageReference;

    fn next(&mut self) -> Option<ImageReference> {
        while self.position <= self.text.len() {
            let captures = IMAGE_REGEX.captures_at(self.text, self.position)?;
            let whole = captures.get(0)?;
            self.position = if whole.end() > whole.start() {
                whole.end()
            } else {
                whole.end() + 1
            };

            if let Some(path) = captures.name("path") {
                let alt = captures
                    .name("alt")
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                if let Some(path) = markdown_destination(path.as_str()) {
                    return Some(ImageReference::new(alt, path, None, None));
                }
            } else if let Some(tag) = captures.name("tag") {
                if let Some(reference) = parse_img_tag(tag.as_str()) {
                    return Some(reference);
                }
            }
        }
        None
    }
}

/// Scan `text` for image references.
pub fn find_image_references(text: &str) -> ImageReferences<'_> {
    ImageReferences { text, position: 0 }
}

/// Whether a path refers to a file on disk rather than a network URL.
pub fn is_local_path(path: &str) -> bool {
    !path.starts_with("http://") && !path.starts_with("https://")
}

/// Split `width` and `height` query parameters off an image path.
///
/// Returns the cleaned path and the parsed dimensions. Parameters that are not positive integers
/// are kept in the path untouched, as is every other parameter and their order.
pub fn parse_image_path(path: &str) -> (String, Option<u32>, Option<u32>) {
    let Some((base, query)) = path.split_once('?') else {
        return (path.to_string(), None, None);
    };

    let mut width = None;
    let mut height = None;
    let mut kept = Vec::new();

    for param in query.split('&') {
        match param.split_once('=') {
            Some(("width", value)) => match parse_dimension(value) {
                Some(px) => width = Some(px),
                None => kept.push(param),
            },
            Some(("height", value)) => match parse_dimension(value) {
                Some(px) => height = Some(px),
                None => kept.push(param),
            },
            _ => kept.push(param),
        }
    }

    let mut cleaned = base.to_string();
    if !kept.is_empty() {
        cleaned.push('?');
        cleaned.push_str(&kept.join("&"));
    }
    (cleaned, width, height)
}

fn parse_dimension(value: &str) -> Option<u32> {
    value.parse::<u32>().ok().filter(|px| *px > 0)
}

/// The destination part of `![alt](destination "title")`.
fn markdown_destination(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let destination = if let Some(rest) = trimmed.strip_prefix('<') {
        rest.split_once('>').map(|(inner, _)| inner)?
    } else {
        trimmed.split_whitespace().next()?
    };
    if destination.is_empty() {
        None
    } else {
        Some(destination)
    }
}

fn parse_img_tag(tag: &str) -> Option<ImageReference> {
    let mut src = None;
    let mut alt = String::new();
    let mut width = None;
    let mut height = None;

    for captures in ATTRIBUTE_REGEX.captures_iter(tag) {
        let Some(name) = captures.name("name") else {
            continue;
        };
        let Some(value) = captures.name("dq").or_else(|| captures.name("sq")) else {
            continue;
        };
        let value = value.as_str();
        match name.as_str().to_ascii_lowercase().as_str() {
            "src" => src = Some(value),
            "alt" => alt = value.to_string(),
            "width" => width = parse_dimension(value),
            "height" => height = parse_dimension(value),
            _ => {}
        }
    }

    let src = src.filter(|s| !s.is_empty())?;
    Some(ImageReference::new(alt, src, width, height))
}
