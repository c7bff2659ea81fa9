//! Package relationship resolution.
//!
//! Each part may carry a companion `.rels` part mapping relationship ids
//! (`rId1`) to targets. Targets are stored relative to the source part's
//! directory and may climb with `..` (`../charts/chart1.xml`), so resolving
//! them collapses the path against the source's base directory.

use crate::error::{SheetError, SheetResult};
use quick_xml::events::Event;
use quick_xml::Reader;

#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

/// Companion `.rels` part name for a part
/// (`xl/worksheets/sheet1.xml` → `xl/worksheets/_rels/sheet1.xml.rels`).
pub fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Parse a `.rels` part into its relationship list, in document order.
pub fn parse_relationships(xml: &[u8]) -> SheetResult<Vec<Relationship>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut rels = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let mut id = String::new();
                let mut rel_type = String::new();
                let mut target = String::new();
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).into_owned();
                    match attr.key.as_ref() {
                        b"Id" => id = value,
                        b"Type" => rel_type = value,
                        b"Target" => target = value,
                        _ => {}
                    }
                }
                if !id.is_empty() && !target.is_empty() {
                    rels.push(Relationship {
                        id,
                        rel_type,
                        target,
                    });
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(SheetError::Archive(format!(
                    "Malformed relationships part: {}",
                    e
                )));
            }
        }
        buf.clear();
    }
    Ok(rels)
}

/// Resolve a relationship target against its source part's directory,
/// collapsing `.` and `..` segments. Absolute targets (leading `/`) are
/// taken from the package root.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    let mut segments: Vec<&str> = if target.starts_with('/') {
        Vec::new()
    } else {
        let base = source_part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
        base.split('/').filter(|s| !s.is_empty()).collect()
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
