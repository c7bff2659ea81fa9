//! Zip container access.
//!
//! The workbook file is a zip package of XML parts. The whole part map is
//! read up front into memory; asset queries are metadata-sized, so holding
//! the decompressed parts is cheaper than re-seeking the archive per query.

use crate::error::{SheetError, SheetResult};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Part name → raw bytes, keyed without a leading slash
/// (`xl/workbook.xml`, `xl/media/image1.png`, ...).
#[derive(Debug, Default)]
pub struct Archive {
    parts: HashMap<String, Vec<u8>>,
}

impl Archive {
    /// Read every part of the zip package at `path`.
    pub fn open(path: &Path) -> SheetResult<Self> {
        let file = File::open(path)?;
        let mut zip = zip::ZipArchive::new(file)
            .map_err(|e| SheetError::Archive(format!("Cannot read package: {}", e)))?;

        let mut parts = HashMap::new();
        for i in 0..zip.len() {
            let mut entry = zip
                .by_index(i)
                .map_err(|e| SheetError::Archive(format!("Cannot read package entry: {}", e)))?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().trim_start_matches('/').to_string();
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data)?;
            parts.insert(name, data);
        }
        Ok(Self { parts })
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts.get(name).map(Vec::as_slice)
    }
}
