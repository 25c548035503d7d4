use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::docx::package::DocxPackage;
use crate::docx::xml::{parse_markup, XmlEvent};
use crate::error::DocxError;
use crate::segment::Segment;

/// WordprocessingML main namespace. Paragraph and text elements are
/// matched through whatever prefix the document binds to this URI
/// (conventionally `w`), never through a hard-coded prefix.
pub const WORDPROCESSING_NS: &str =
    "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Extract ordered segments from raw `word/document.xml` bytes.
///
/// One segment per paragraph whose concatenated text-node content is
/// non-empty after trimming; whitespace-only paragraphs are dropped and
/// consume no sequence number. All-or-nothing: any markup failure
/// returns an error with no partial output.
pub fn extract_segments(xml_bytes: &[u8]) -> Result<Vec<Segment>, DocxError> {
    let events = parse_markup(xml_bytes)?;
    let prefixes = namespace_prefixes(&events);
    if prefixes.is_empty() {
        // Namespace never bound: nothing in the document can be a
        // WordprocessingML paragraph.
        return Ok(Vec::new());
    }

    // Captures for paragraphs still open, innermost last. Nested
    // paragraphs each collect their own text; inner text is never
    // flattened into the parent.
    let mut open: Vec<ParaCapture> = Vec::new();
    // Paragraphs closed so far, keyed by document (pre-)order.
    let mut closed: Vec<ParaCapture> = Vec::new();
    let mut stack: Vec<Elem> = Vec::new();
    let mut open_text_nodes: usize = 0;

    for (idx, ev) in events.iter().enumerate() {
        match ev {
            XmlEvent::Start { name, .. } => {
                let kind = classify(name, &prefixes);
                match kind {
                    Elem::Paragraph => open.push(ParaCapture {
                        order: idx,
                        text: String::new(),
                    }),
                    Elem::TextNode => open_text_nodes += 1,
                    Elem::Other => {}
                }
                stack.push(kind);
            }
            XmlEvent::Empty { .. } => {
                // <w:p/> has no content, <w:t/> contributes nothing.
            }
            XmlEvent::Text { text } => {
                // Only text inside a text node counts; stray character
                // data between runs is not document text.
                if open_text_nodes > 0 {
                    if let Some(cap) = open.last_mut() {
                        cap.text.push_str(text);
                    }
                }
            }
            XmlEvent::End { name } => match stack.pop() {
                Some(Elem::Paragraph) => {
                    if let Some(cap) = open.pop() {
                        closed.push(cap);
                    }
                }
                Some(Elem::TextNode) => {
                    open_text_nodes = open_text_nodes.saturating_sub(1);
                }
                Some(Elem::Other) => {}
                None => {
                    return Err(DocxError::MalformedMarkup(format!(
                        "closing tag </{name}> without matching open element"
                    )))
                }
            },
        }
    }

    // Number in document order of the opening tags, counting only
    // paragraphs that survive the trim filter, so ids stay dense.
    closed.sort_by_key(|c| c.order);
    let mut segments: Vec<Segment> = Vec::new();
    for cap in closed {
        let trimmed = cap.text.trim();
        if trimmed.is_empty() {
            continue;
        }
        segments.push(Segment::new(segments.len() + 1, trimmed.to_string()));
    }
    Ok(segments)
}

/// Open the package at `path` and extract its segments.
pub fn extract_docx_segments(path: &Path) -> Result<Vec<Segment>, DocxError> {
    let pkg = DocxPackage::read(path)?;
    extract_segments(pkg.main_document()?)
}

#[derive(Clone, Copy)]
enum Elem {
    Paragraph,
    TextNode,
    Other,
}

struct ParaCapture {
    order: usize,
    text: String,
}

fn classify(name: &str, prefixes: &[String]) -> Elem {
    if is_ns_element(name, prefixes, "p") {
        Elem::Paragraph
    } else if is_ns_element(name, prefixes, "t") {
        Elem::TextNode
    } else {
        Elem::Other
    }
}

fn is_ns_element(name: &str, prefixes: &[String], local: &str) -> bool {
    match name.split_once(':') {
        Some((prefix, l)) => l == local && prefixes.iter().any(|p| p == prefix),
        None => name == local && prefixes.iter().any(|p| p.is_empty()),
    }
}

/// Prefixes bound to the WordprocessingML namespace anywhere in the
/// stream. OOXML binds them on the root element; an empty string means
/// the default namespace.
fn namespace_prefixes(events: &[XmlEvent]) -> Vec<String> {
    let mut prefixes: Vec<String> = Vec::new();
    for ev in events {
        let (XmlEvent::Start { attrs, .. } | XmlEvent::Empty { attrs, .. }) = ev else {
            continue;
        };
        for (key, value) in attrs {
            if value != WORDPROCESSING_NS {
                continue;
            }
            let prefix = if key == "xmlns" {
                Some("")
            } else {
                key.strip_prefix("xmlns:")
            };
            if let Some(prefix) = prefix {
                if !prefixes.iter().any(|p| p == prefix) {
                    prefixes.push(prefix.to_string());
                }
            }
        }
    }
    prefixes
}

/// Write segments as a pretty-printed UTF-8 JSON array, order
/// preserved, non-ASCII characters unescaped.
pub fn save_segments_json(segments: &[Segment], path: &Path) -> anyhow::Result<()> {
    fs::write(
        path,
        serde_json::to_vec_pretty(segments).context("serialize segments json")?,
    )
    .with_context(|| format!("write segments json: {}", path.display()))?;
    Ok(())
}

/// Inverse of [`save_segments_json`], for review tooling and the
/// eventual merge step.
pub fn load_segments_json(path: &Path) -> anyhow::Result<Vec<Segment>> {
    let data =
        fs::read(path).with_context(|| format!("read segments json: {}", path.display()))?;
    serde_json::from_slice(&data)
        .with_context(|| format!("parse segments json: {}", path.display()))
}

/// Default output path: `<stem>_segments.json` beside the input.
pub fn default_segments_output_for(input_docx: &Path) -> PathBuf {
    let stem = input_docx
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("docx");
    let dir = input_docx.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!("{stem}_segments.json"))
}
