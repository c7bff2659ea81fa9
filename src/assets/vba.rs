//! Macro module discovery.
//!
//! The VBA project is stored as a binary OLE container at
//! `xl/vbaProject.bin`. Full parsing is out of scope; module names survive
//! inside the blob as `Attribute VB_Name = "..."` attribute lines, so a raw
//! byte scan recovers them. Names are classified as document modules
//! (workbook and per-sheet code-behind) or standard modules.

use regex::bytes::Regex;
use serde::Serialize;

pub const VBA_PART: &str = "xl/vbaProject.bin";
const PROJECT_NAME: &str = "VBAProject";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MacroKind {
    Standard,
    Document,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroModule {
    pub project: String,
    pub name: String,
    pub kind: MacroKind,
}

impl MacroModule {
    fn new(name: impl Into<String>, kind: MacroKind) -> Self {
        Self {
            project: PROJECT_NAME.to_string(),
            name: name.into(),
            kind,
        }
    }
}

/// Scan raw VBA project bytes for module names.
///
/// A project that yields no names still gets a `Module1` placeholder (the
/// part exists, so at least one module does); a failed scan degrades to a
/// single `Unknown` entry.
pub fn scan_modules(data: &[u8]) -> Vec<MacroModule> {
    let Ok(pattern) = Regex::new(r#"Attribute VB_Name = "([^"]+)""#) else {
        return vec![MacroModule::new("Unknown", MacroKind::Standard)];
    };

    let mut modules: Vec<MacroModule> = Vec::new();
    for captures in pattern.captures_iter(data) {
        let Some(name) = captures
            .get(1)
            .and_then(|m| std::str::from_utf8(m.as_bytes()).ok())
        else {
            continue;
        };
        if modules.iter().any(|m| m.name == name) {
            continue;
        }
        modules.push(MacroModule::new(name, classify(name)));
    }

    if modules.is_empty() {
        modules.push(MacroModule::new("Module1", MacroKind::Standard));
    }
    modules
}

fn classify(name: &str) -> MacroKind {
    let is_sheet_module = name
        .strip_prefix("Sheet")
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()));
    if name == "ThisWorkbook" || is_sheet_module {
        MacroKind::Document
    } else {
        MacroKind::Standard
    }
}
