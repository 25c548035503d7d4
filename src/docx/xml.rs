use encoding_rs::{Encoding, UTF_8};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::DocxError;

/// Flat event-stream view of one XML part, reduced to what text
/// extraction needs. Text covers both character data and CDATA; the
/// prolog, comments and processing instructions carry no extractable
/// content and are dropped during parsing.
#[derive(Clone, Debug)]
pub enum XmlEvent {
    Start {
        name: String,
        attrs: Vec<(String, String)>,
    },
    End {
        name: String,
    },
    Empty {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text {
        text: String,
    },
}

/// Decode raw markup bytes honoring a BOM or the prolog's declared
/// encoding, defaulting to UTF-8. Bytes invalid under the chosen
/// encoding are `MalformedMarkup`, not silently replaced.
pub fn decode_markup(bytes: &[u8]) -> Result<String, DocxError> {
    let encoding = match declared_encoding(bytes) {
        Some(label) => Encoding::for_label(label.as_bytes()).ok_or_else(|| {
            DocxError::MalformedMarkup(format!("unknown declared encoding: {label}"))
        })?,
        None => UTF_8,
    };
    // decode() sniffs the BOM itself; a BOM wins over the declaration.
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(DocxError::MalformedMarkup(format!(
            "markup is not valid {}",
            used.name()
        )));
    }
    Ok(text.into_owned())
}

/// Pull the encoding label out of an ASCII-compatible `<?xml ...?>`
/// prolog. UTF-16 prologs are covered by their mandatory BOM instead.
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(256)];
    if !head.starts_with(b"<?xml") {
        return None;
    }
    let end = head.windows(2).position(|w| w == b"?>")?;
    let decl = std::str::from_utf8(&head[..end]).ok()?;
    let pos = decl.find("encoding")?;
    let rest = decl[pos + "encoding".len()..].trim_start();
    let rest = rest.strip_prefix('=')?.trim_start();
    let quote = rest.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let rest = &rest[1..];
    let close = rest.find(quote)?;
    Some(rest[..close].to_string())
}

/// Parse one markup part into an event stream. All-or-nothing: any
/// parse error, encoding mismatch or unbalanced element fails the whole
/// part with `MalformedMarkup`.
pub fn parse_markup(xml_bytes: &[u8]) -> Result<Vec<XmlEvent>, DocxError> {
    let text = decode_markup(xml_bytes)?;
    let mut reader = Reader::from_str(&text);
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = true;

    let mut events: Vec<XmlEvent> = Vec::new();
    let mut depth: usize = 0;
    loop {
        let ev = reader.read_event().map_err(|e| {
            DocxError::MalformedMarkup(format!(
                "xml error at position {}: {e}",
                reader.buffer_position()
            ))
        })?;
        match ev {
            Event::Eof => break,
            Event::Start(s) => {
                depth += 1;
                events.push(XmlEvent::Start {
                    name: bytes_to_string(s.name().as_ref()),
                    attrs: collect_attrs(&s)?,
                });
            }
            Event::End(e) => {
                // Mismatched names are already rejected by the reader;
                // this guards against a stray close tag.
                depth = depth.checked_sub(1).ok_or_else(|| {
                    DocxError::MalformedMarkup(format!(
                        "unexpected closing tag </{}>",
                        bytes_to_string(e.name().as_ref())
                    ))
                })?;
                events.push(XmlEvent::End {
                    name: bytes_to_string(e.name().as_ref()),
                });
            }
            Event::Empty(s) => {
                events.push(XmlEvent::Empty {
                    name: bytes_to_string(s.name().as_ref()),
                    attrs: collect_attrs(&s)?,
                });
            }
            Event::Text(t) => {
                let txt = t
                    .unescape()
                    .map_err(|e| DocxError::MalformedMarkup(format!("unescape text: {e}")))?
                    .into_owned();
                events.push(XmlEvent::Text { text: txt });
            }
            Event::CData(t) => {
                events.push(XmlEvent::Text {
                    text: bytes_to_string(t.into_inner().as_ref()),
                });
            }
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }
    if depth != 0 {
        return Err(DocxError::MalformedMarkup(format!(
            "{depth} element(s) left open at end of markup"
        )));
    }
    Ok(events)
}

fn collect_attrs(s: &BytesStart<'_>) -> Result<Vec<(String, String)>, DocxError> {
    let mut attrs: Vec<(String, String)> = Vec::new();
    for a in s.attributes() {
        let a = a.map_err(|e| DocxError::MalformedMarkup(format!("attribute: {e}")))?;
        let key = bytes_to_string(a.key.as_ref());
        let val = a
            .unescape_value()
            .map_err(|e| DocxError::MalformedMarkup(format!("attribute value: {e}")))?
            .into_owned();
        attrs.push((key, val));
    }
    Ok(attrs)
}

fn bytes_to_string(bytes: impl AsRef<[u8]>) -> String {
    String::from_utf8_lossy(bytes.as_ref()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::{decode_markup, parse_markup, XmlEvent};
    use crate::error::DocxError;

    fn texts(events: &[XmlEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|e| match e {
                XmlEvent::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn default_encoding_is_utf8() {
        let events = parse_markup("<d><t>caf\u{e9}</t></d>".as_bytes()).expect("parse");
        assert_eq!(texts(&events), vec!["café"]);
    }

    #[test]
    fn declared_latin1_encoding_is_honored() {
        let xml = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><d><t>caf\xe9</t></d>";
        let events = parse_markup(xml).expect("parse");
        assert_eq!(texts(&events), vec!["café"]);
    }

    #[test]
    fn utf16_bom_wins() {
        let xml = "<?xml version=\"1.0\" encoding=\"UTF-16\"?><d><t>hi</t></d>";
        let mut bytes: Vec<u8> = vec![0xFF, 0xFE];
        for unit in xml.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let events = parse_markup(&bytes).expect("parse");
        assert_eq!(texts(&events), vec!["hi"]);
    }

    #[test]
    fn unknown_declared_encoding_is_malformed() {
        let xml = b"<?xml version=\"1.0\" encoding=\"KLINGON-8\"?><d/>";
        assert!(matches!(
            decode_markup(xml),
            Err(DocxError::MalformedMarkup(_))
        ));
    }

    #[test]
    fn invalid_utf8_bytes_are_malformed() {
        let xml = b"<d><t>\xff</t></d>";
        assert!(matches!(
            parse_markup(xml),
            Err(DocxError::MalformedMarkup(_))
        ));
    }

    #[test]
    fn mismatched_end_tag_is_malformed() {
        assert!(matches!(
            parse_markup(b"<a><b></a></b>"),
            Err(DocxError::MalformedMarkup(_))
        ));
    }

    #[test]
    fn unclosed_element_is_malformed() {
        assert!(matches!(
            parse_markup(b"<a><b></b>"),
            Err(DocxError::MalformedMarkup(_))
        ));
    }

    #[test]
    fn entities_are_unescaped_in_text_and_attrs() {
        let events = parse_markup(b"<d a=\"x&amp;y\"><t>1 &lt; 2</t></d>").expect("parse");
        assert_eq!(texts(&events), vec!["1 < 2"]);
        match &events[0] {
            XmlEvent::Start { attrs, .. } => {
                assert_eq!(attrs[0], ("a".to_string(), "x&y".to_string()))
            }
            other => panic!("expected start event, got {other:?}"),
        }
    }

    #[test]
    fn cdata_counts_as_text() {
        let events = parse_markup(b"<d><t><![CDATA[a & b]]></t></d>").expect("parse");
        assert_eq!(texts(&events), vec!["a & b"]);
    }
}
