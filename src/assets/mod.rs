//! Embedded asset discovery: charts, images, and macro modules pulled from
//! the workbook's zip package by walking its XML part tree and relationship
//! maps.

pub mod archive;
pub mod drawing;
pub mod rels;
pub mod resolver;
pub mod sheets;
pub mod vba;

pub use resolver::{AssetResolver, ChartInfo, ImageInfo};
pub use vba::{MacroKind, MacroModule};
