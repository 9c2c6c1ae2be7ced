use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::super::{
    Document, DocumentError, DocumentFormat, DocumentLoader, LoadFuture, MAX_HANDOUT_BYTES,
};
use super::parse_blocking;

const DOCUMENT_PART: &str = "word/document.xml";

static RUN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|</w:p>|<w:tab\s*/>|<w:br(?:\s[^>]*)?/>")
        .expect("docx run regex is valid")
});

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(lt|gt|quot|apos|amp|#[0-9]{1,7}|#[xX][0-9A-Fa-f]{1,6});")
        .expect("entity regex is valid")
});

/// Word `.docx` handouts. Only the main document body is read; headers,
/// footers and comments are ignored.
#[derive(Debug, Clone, Copy)]
pub struct DocxLoader {
    pub limit: u64,
}

impl Default for DocxLoader {
    fn default() -> Self {
        Self {
            limit: MAX_HANDOUT_BYTES,
        }
    }
}

impl DocumentLoader for DocxLoader {
    fn load(&self, path: &Path) -> LoadFuture<'_> {
        let source = path.to_path_buf();
        Box::pin(async move {
            let limit = self.limit;
            let text =
                parse_blocking(source.clone(), limit, move |p| read_docx(p, limit)).await?;
            Ok(Document {
                text,
                source,
                format: DocumentFormat::Docx,
            })
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["docx"]
    }
}

/// The limit applies to the inflated body part as well as the archive on disk.
fn read_docx(path: &Path, limit: u64) -> Result<String, DocumentError> {
    let too_large = |size| DocumentError::TooLarge {
        path: path.to_path_buf(),
        size,
        limit,
    };
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let part = match archive.by_name(DOCUMENT_PART) {
        Ok(part) => part,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(DocumentError::MissingPart(DOCUMENT_PART));
        }
        Err(e) => return Err(e.into()),
    };
    if part.size() > limit {
        return Err(too_large(part.size()));
    }
    // declared sizes can lie; never inflate past the limit
    let mut xml = String::new();
    let read = part.take(limit.saturating_add(1)).read_to_string(&mut xml)?;
    let read = u64::try_from(read).unwrap_or(u64::MAX);
    if read > limit {
        return Err(too_large(read));
    }
    Ok(document_xml_to_text(&xml))
}

/// Flatten WordprocessingML body XML into text, one line per paragraph.
pub(crate) fn document_xml_to_text(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len() / 4);
    for caps in RUN_RE.captures_iter(xml) {
        if let Some(run) = caps.get(1) {
            out.push_str(&decode_entities(run.as_str()));
            continue;
        }
        match caps.get(0).map(|m| m.as_str()) {
            Some("</w:p>") => out.push('\n'),
            Some(tag) if tag.starts_with("<w:tab") => out.push('\t'),
            Some(_) => out.push('\n'),
            None => {}
        }
    }
    out.trim_end().to_owned()
}

/// Named XML entities and numeric character references, decoded in one pass.
fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_owned();
    }
    ENTITY_RE
        .replace_all(s, |caps: &regex::Captures<'_>| {
            let decoded = match &caps[1] {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "amp" => Some('&'),
                reference => reference
                    .strip_prefix("#x")
                    .or_else(|| reference.strip_prefix("#X"))
                    .map_or_else(
                        || reference.strip_prefix('#').and_then(|d| d.parse().ok()),
                        |hex| u32::from_str_radix(hex, 16).ok(),
                    )
                    .and_then(char::from_u32),
            };
            decoded.map_or_else(|| caps[0].to_owned(), String::from)
        })
        .into_owned()
}
