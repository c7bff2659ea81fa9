//! Custom formula registry.
//!
//! An explicit registry value owned by each workbook session (no
//! process-global state): registered names are tracked here so the formula
//! summary can distinguish user-defined functions from built-ins, and the
//! calculation adapter dispatches unknown function names through it.
//! Localization maps translated function names to the canonical ones the
//! engine understands.

use crate::error::{SheetError, SheetResult};
use std::collections::HashMap;
use std::sync::Arc;

/// A user-supplied function: numeric arguments in, numeric result out.
pub type CustomFn = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

#[derive(Clone, Default)]
pub struct FormulaRegistry {
    functions: HashMap<String, CustomFn>,
    locale: HashMap<String, String>,
}

impl FormulaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one function. Names are case-insensitive and stored
    /// uppercased; an empty name is rejected. Re-registering a name
    /// replaces the previous implementation.
    pub fn register(&mut self, name: &str, function: CustomFn) -> SheetResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SheetError::InvalidInput(
                "Custom formula name must not be empty".to_string(),
            ));
        }
        self.functions.insert(name.to_uppercase(), function);
        Ok(())
    }

    /// Register a batch of functions; fails on the first invalid name
    /// without rolling back earlier entries.
    pub fn register_many(
        &mut self,
        functions: impl IntoIterator<Item = (String, CustomFn)>,
    ) -> SheetResult<()> {
        for (name, function) in functions {
            self.register(&name, function)?;
        }
        Ok(())
    }

    /// Merge a localization dictionary (localized name → canonical name).
    pub fn localize(&mut self, dictionary: HashMap<String, String>) {
        for (localized, canonical) in dictionary {
            self.locale
                .insert(localized.to_uppercase(), canonical.to_uppercase());
        }
    }

    /// Look up an implementation by name (any casing).
    pub fn lookup(&self, name: &str) -> Option<&CustomFn> {
        self.functions.get(&name.to_uppercase())
    }

    /// Canonical name for a localized function name, if mapped.
    pub fn canonical_name(&self, localized: &str) -> Option<&str> {
        self.locale.get(&localized.to_uppercase()).map(String::as_str)
    }

    pub fn has_locale_entries(&self) -> bool {
        !self.locale.is_empty()
    }

    pub fn has_functions(&self) -> bool {
        !self.functions.is_empty()
    }

    /// Sorted registered names, for the formula summary.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for FormulaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormulaRegistry")
            .field("functions", &self.names())
            .field("locale", &self.locale)
            .finish()
    }
}
