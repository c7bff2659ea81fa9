//! Asset discovery facade.
//!
//! Walks the workbook package for charts, images, and macro modules. Every
//! lookup is advisory: failures at any level (missing file, broken archive,
//! malformed XML) degrade to empty results instead of propagating, and are
//! logged at warn/debug level. Results are memoized per resolver, as are
//! chart part classifications that several anchors may share.

use crate::assets::archive::Archive;
use crate::assets::drawing::{self, DrawingAnchor};
use crate::assets::rels::{self, Relationship};
use crate::assets::sheets;
use crate::assets::vba::{self, MacroModule};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartInfo {
    pub sheet: String,
    pub name: String,
    pub chart_type: String,
    pub anchor: String,
    pub series: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageInfo {
    pub sheet: String,
    pub name: String,
    pub anchor: String,
    pub media_type: String,
}

/// Lazily opens the package and caches intermediate lookups. A resolver
/// without a backing file answers every query with an empty list.
#[derive(Debug, Default)]
pub struct AssetResolver {
    path: Option<PathBuf>,
    /// Outer `None`: not opened yet. Inner `None`: unreadable or detached.
    archive: Option<Option<Archive>>,
    chart_types: HashMap<String, String>,
    charts: Option<Vec<ChartInfo>>,
    images: Option<Vec<ImageInfo>>,
    macros: Option<Vec<MacroModule>>,
}

impl AssetResolver {
    pub fn for_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// A resolver with no backing package (in-memory workbooks).
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn charts(&mut self) -> &[ChartInfo] {
        if self.charts.is_none() {
            self.ensure_archive();
            let charts = match self.archive.as_ref().and_then(Option::as_ref) {
                Some(archive) => collect_charts(archive, &mut self.chart_types),
                None => Vec::new(),
            };
            self.charts = Some(charts);
        }
        self.charts.as_deref().unwrap_or(&[])
    }

    pub fn images(&mut self) -> &[ImageInfo] {
        if self.images.is_none() {
            self.ensure_archive();
            let images = match self.archive.as_ref().and_then(Option::as_ref) {
                Some(archive) => collect_images(archive),
                None => Vec::new(),
            };
            self.images = Some(images);
        }
        self.images.as_deref().unwrap_or(&[])
    }

    pub fn macros(&mut self) -> &[MacroModule] {
        if self.macros.is_none() {
            self.ensure_archive();
            let macros = match self.archive.as_ref().and_then(Option::as_ref) {
                Some(archive) => archive
                    .part(vba::VBA_PART)
                    .map(vba::scan_modules)
                    .unwrap_or_default(),
                None => Vec::new(),
            };
            self.macros = Some(macros);
        }
        self.macros.as_deref().unwrap_or(&[])
    }

    fn ensure_archive(&mut self) {
        if self.archive.is_some() {
            return;
        }
        let opened = match &self.path {
            None => None,
            Some(path) => match Archive::open(path) {
                Ok(archive) => Some(archive),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "asset discovery disabled");
                    None
                }
            },
        };
        self.archive = Some(opened);
    }
}

/// Drawing parts attached to a worksheet part, with their anchors and
/// relationship lists.
fn drawings_of(
    archive: &Archive,
    sheet_part: &str,
) -> Vec<(String, Vec<DrawingAnchor>, Vec<Relationship>)> {
    let sheet_rels = relationships_of(archive, sheet_part);

    let mut drawings = Vec::new();
    for rel in sheet_rels {
        if !rel.rel_type.ends_with("/drawing") {
            continue;
        }
        let drawing_part = rels::resolve_target(sheet_part, &rel.target);
        let Some(xml) = archive.part(&drawing_part) else {
            debug!(part = %drawing_part, "drawing part missing");
            continue;
        };
        match drawing::parse_drawing(xml) {
            Ok(anchors) => {
                let drawing_rels = relationships_of(archive, &drawing_part);
                drawings.push((drawing_part, anchors, drawing_rels));
            }
            Err(e) => debug!(part = %drawing_part, error = %e, "drawing part skipped"),
        }
    }
    drawings
}

fn relationships_of(archive: &Archive, part: &str) -> Vec<Relationship> {
    archive
        .part(&rels::rels_part_for(part))
        .and_then(|xml| rels::parse_relationships(xml).ok())
        .unwrap_or_default()
}

fn collect_charts(archive: &Archive, chart_types: &mut HashMap<String, String>) -> Vec<ChartInfo> {
    let sheets = match sheets::sheet_parts(archive) {
        Ok(sheets) => sheets,
        Err(e) => {
            warn!(error = %e, "sheet discovery failed");
            return Vec::new();
        }
    };

    let mut charts = Vec::new();
    for (sheet_name, sheet_part) in sheets {
        for (drawing_part, anchors, drawing_rels) in drawings_of(archive, &sheet_part) {
            for anchor in anchors {
                let Some(rid) = &anchor.chart_rid else {
                    continue;
                };
                let Some(rel) = drawing_rels.iter().find(|r| &r.id == rid) else {
                    debug!(%rid, "chart relationship missing");
                    continue;
                };
                let chart_part = rels::resolve_target(&drawing_part, &rel.target);
                let Some(xml) = archive.part(&chart_part) else {
                    debug!(part = %chart_part, "chart part missing");
                    continue;
                };
                let chart_type = chart_types
                    .entry(chart_part.clone())
                    .or_insert_with(|| drawing::chart_type(xml))
                    .clone();
                let name = if anchor.name.is_empty() {
                    format!("Chart {}", charts.len() + 1)
                } else {
                    anchor.name.clone()
                };
                charts.push(ChartInfo {
                    sheet: sheet_name.clone(),
                    name,
                    chart_type,
                    anchor: anchor.anchor.clone(),
                    series: drawing::chart_series(xml),
                });
            }
        }
    }
    charts
}

fn collect_images(archive: &Archive) -> Vec<ImageInfo> {
    let sheets = match sheets::sheet_parts(archive) {
        Ok(sheets) => sheets,
        Err(e) => {
            warn!(error = %e, "sheet discovery failed");
            return Vec::new();
        }
    };

    let mut images = Vec::new();
    for (sheet_name, sheet_part) in sheets {
        for (drawing_part, anchors, drawing_rels) in drawings_of(archive, &sheet_part) {
            for anchor in anchors {
                let Some(rid) = &anchor.image_rid else {
                    continue;
                };
                let Some(rel) = drawing_rels.iter().find(|r| &r.id == rid) else {
                    debug!(%rid, "image relationship missing");
                    continue;
                };
                let media_part = rels::resolve_target(&drawing_part, &rel.target);
                let name = if anchor.name.is_empty() {
                    format!("Image {}", images.len() + 1)
                } else {
                    anchor.name.clone()
                };
                images.push(ImageInfo {
                    sheet: sheet_name.clone(),
                    name,
                    anchor: anchor.anchor.clone(),
                    media_type: media_type_of(&media_part).to_string(),
                });
            }
        }
    }
    images
}

/// Media type from a part path's extension; unrecognized extensions fall
/// back to the generic binary type.
fn media_type_of(part: &str) -> &'static str {
    let extension = part
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
