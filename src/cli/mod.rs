//! CLI command handlers

pub mod commands;

pub use commands::{assets, calc, cell, circular, export_csv, summary};
