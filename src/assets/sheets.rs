//! Sheet name to worksheet part mapping.
//!
//! `xl/workbook.xml` lists sheets with display names and relationship ids;
//! the workbook's `.rels` part maps those ids to worksheet parts. Packages
//! written by some producers omit or scramble the relationship layer, so a
//! sheet whose id cannot be resolved falls back to the positional
//! `xl/worksheets/sheetN.xml` convention.

use crate::assets::archive::Archive;
use crate::assets::rels;
use crate::error::{SheetError, SheetResult};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;

const WORKBOOK_PART: &str = "xl/workbook.xml";

/// Ordered (sheet name, worksheet part path) pairs.
pub fn sheet_parts(archive: &Archive) -> SheetResult<Vec<(String, String)>> {
    let Some(workbook_xml) = archive.part(WORKBOOK_PART) else {
        return Err(SheetError::Archive(format!("Missing {}", WORKBOOK_PART)));
    };

    let targets: HashMap<String, String> = archive
        .part(&rels::rels_part_for(WORKBOOK_PART))
        .map(rels::parse_relationships)
        .transpose()?
        .unwrap_or_default()
        .into_iter()
        .map(|r| (r.id, rels::resolve_target(WORKBOOK_PART, &r.target)))
        .collect();

    let mut reader = Reader::from_reader(workbook_xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"sheet" =>
            {
                let mut name = String::new();
                let mut rel_id = String::new();
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).into_owned();
                    match attr.key.local_name().as_ref() {
                        b"name" => name = value,
                        b"id" => rel_id = value,
                        _ => {}
                    }
                }
                if name.is_empty() {
                    continue;
                }
                let part = targets.get(&rel_id).cloned().unwrap_or_else(|| {
                    format!("xl/worksheets/sheet{}.xml", sheets.len() + 1)
                });
                sheets.push((name, part));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(SheetError::Archive(format!("Malformed workbook part: {}", e)));
            }
        }
        buf.clear();
    }
    Ok(sheets)
}
