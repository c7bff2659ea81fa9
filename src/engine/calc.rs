//! Calculation engine adapter.
//!
//! Delegates numeric evaluation to `xlformula_engine`. The engine resolves
//! plain variable names, not spreadsheet addresses, so each formula is
//! rewritten before parsing: cell references (ranges expanded to argument
//! lists) become encoded variable names the resolver closure decodes back
//! into workbook lookups, localized function names are translated to their
//! canonical spelling, and calls to registered custom functions are folded
//! into their numeric results. Evaluation runs in dependency order from a
//! petgraph topological sort and writes results back into the workbook in
//! place; whole-workbook evaluation is an intentional mutation, not a
//! query.

use crate::addr;
use crate::analysis::graph::FormulaGraph;
use crate::analysis::resolver;
use crate::engine::registry::FormulaRegistry;
use crate::model::{CellValue, Workbook};
use petgraph::algo::toposort;
use std::collections::HashSet;
use xlformula_engine::{calculate, parse_formula, types};

/// Placeholder variable for references into sheets that do not exist; the
/// resolver maps it to a value error.
const MISSING_REF: &str = "XREF_MISSING";

/// Engine failure, split so the orchestrator can classify circularity
/// without sniffing message text.
#[derive(Debug)]
pub enum EngineError {
    Circular(String),
    Formula { address: String, message: String },
}

/// Evaluate every formula cell in the workbook, in dependency order.
///
/// Side effect: computed values are written into the cells (formulas are
/// kept). Fails with `EngineError::Circular` when the dependency graph has
/// no topological order, or `EngineError::Formula` on the first cell whose
/// formula the engine rejects.
pub fn evaluate_workbook(
    workbook: &mut Workbook,
    registry: &FormulaRegistry,
) -> Result<(), EngineError> {
    let graph = FormulaGraph::build(workbook);

    let order = toposort(graph.graph(), None).map_err(|cycle| {
        EngineError::Circular(format!(
            "Circular dependency detected in formulas involving {}",
            graph.graph()[cycle.node_id()]
        ))
    })?;

    let formula_nodes: HashSet<&str> =
        graph.formula_nodes().iter().map(String::as_str).collect();

    // Edges point from a formula to the cells it reads, so the sort lists
    // dependents first; evaluate in reverse to see dependencies resolved.
    for idx in order.into_iter().rev() {
        let node = graph.graph()[idx].clone();
        if formula_nodes.contains(node.as_str()) {
            evaluate_node(workbook, registry, &node)?;
        }
    }
    Ok(())
}

fn evaluate_node(
    workbook: &mut Workbook,
    registry: &FormulaRegistry,
    node: &str,
) -> Result<(), EngineError> {
    let Some((sheet_name, row, col)) = addr::split_node(node) else {
        return Ok(());
    };
    let sheet_name = sheet_name.to_string();
    let Some(formula) = workbook
        .sheet(&sheet_name)
        .and_then(|s| s.cell(row, col))
        .and_then(|c| c.formula.clone())
    else {
        return Ok(());
    };

    let rewritten =
        rewrite_formula(&formula, &sheet_name, workbook, registry).map_err(|message| {
            EngineError::Formula {
                address: node.to_string(),
                message: format!("formula '{}': {}", formula, message),
            }
        })?;

    // Registered calls were folded during rewriting, so any name reaching
    // the parse-time hook is a genuine unknown function.
    let custom = |_: String, _: Vec<f32>| -> types::Value { types::Value::Error(types::Error::Value) };
    let parsed = parse_formula::parse_string_to_formula(&rewritten, Some(&custom));

    let result = {
        let wb: &Workbook = workbook;
        let reference = |var: String| -> types::Value { resolve_variable(wb, &var) };
        calculate::calculate_formula(parsed, Some(&reference))
    };

    let value = match result {
        types::Value::Number(n) => CellValue::Number(round_result(f64::from(n))),
        types::Value::Text(s) => CellValue::Text(s),
        types::Value::Boolean(b) => CellValue::Bool(matches!(b, types::Boolean::True)),
        types::Value::Error(e) => {
            return Err(EngineError::Formula {
                address: node.to_string(),
                message: format!("formula '{}' returned error: {:?}", formula, e),
            });
        }
        other => {
            return Err(EngineError::Formula {
                address: node.to_string(),
                message: format!("formula '{}' returned unexpected type: {:?}", formula, other),
            });
        }
    };

    if let Some(sheet) = workbook.sheet_mut(&sheet_name) {
        sheet.set_value(row, col, value);
    }
    Ok(())
}

/// Rewrite cell references into encoded engine variables, translate
/// localized function names, and fold registered custom calls. Kept
/// string-literal-safe by the resolver's span scan.
fn rewrite_formula(
    formula: &str,
    current_sheet: &str,
    workbook: &Workbook,
    registry: &FormulaRegistry,
) -> Result<String, String> {
    let mut out = String::with_capacity(formula.len());
    let mut pos = 0;

    for span in resolver::scan_references(formula) {
        out.push_str(&formula[pos..span.start]);
        let sheet = span.sheet.as_deref().unwrap_or(current_sheet);
        match sheet_index(workbook, sheet) {
            Some(si) => {
                let vars: Vec<String> = span
                    .cells()
                    .iter()
                    .map(|&(r, c)| encode_variable(si, r, c))
                    .collect();
                out.push_str(&vars.join(","));
            }
            None => out.push_str(MISSING_REF),
        }
        pos = span.end;
    }
    out.push_str(&formula[pos..]);

    let out = if registry.has_locale_entries() {
        translate_locale(&out, registry)
    } else {
        out
    };
    let out = if registry.has_functions() {
        apply_custom_calls(&out, workbook, registry)?
    } else {
        out
    };
    Ok(if out.starts_with('=') {
        out
    } else {
        format!("={}", out)
    })
}

/// Substitute calls to registered functions with their computed results.
///
/// The engine invokes its custom-function hook at parse time, before the
/// variable resolver runs, so argument values cannot flow through it.
/// Registered calls are folded here instead: their arguments reference
/// cells that sort earlier in the dependency order and already hold final
/// values, so each call is computed and spliced into the text as a
/// parenthesized number. Inner calls are folded before outer ones, which
/// makes nesting work.
fn apply_custom_calls(
    text: &str,
    workbook: &Workbook,
    registry: &FormulaRegistry,
) -> Result<String, String> {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if c == b'"' {
            let end = string_literal_end(bytes, i);
            out.push_str(&text[i..end]);
            i = end;
        } else if c.is_ascii_alphabetic() || c == b'_' {
            let start = i;
            while matches!(
                bytes.get(i),
                Some(&ch) if ch.is_ascii_alphanumeric() || matches!(ch, b'_' | b'.')
            ) {
                i += 1;
            }
            let token = &text[start..i];
            let mut ahead = i;
            while matches!(bytes.get(ahead), Some(ch) if ch.is_ascii_whitespace()) {
                ahead += 1;
            }
            let function = if bytes.get(ahead) == Some(&b'(') {
                registry.lookup(token)
            } else {
                None
            };
            match function {
                Some(function) => {
                    let close = closing_paren(bytes, ahead)
                        .ok_or_else(|| format!("unbalanced parentheses in call to {}", token))?;
                    let inner = apply_custom_calls(&text[ahead + 1..close], workbook, registry)?;
                    let args = split_arguments(&inner)
                        .into_iter()
                        .map(|arg| evaluate_argument(arg, workbook))
                        .collect::<Result<Vec<f64>, String>>()?;
                    let value = round_result(function(&args));
                    out.push_str(&format!("({})", value));
                    i = close + 1;
                }
                None => out.push_str(token),
            }
        } else {
            let len = text[i..].chars().next().map_or(1, char::len_utf8);
            out.push_str(&text[i..i + len]);
            i += len;
        }
    }
    Ok(out)
}

/// Evaluate one argument expression to a number through the engine, with
/// the same variable resolver full formulas use.
fn evaluate_argument(arg: &str, workbook: &Workbook) -> Result<f64, String> {
    let arg = arg.trim();
    let unknown =
        |_: String, _: Vec<f32>| -> types::Value { types::Value::Error(types::Error::Value) };
    let parsed = parse_formula::parse_string_to_formula(&format!("={}", arg), Some(&unknown));
    let reference = |var: String| -> types::Value { resolve_variable(workbook, &var) };
    match calculate::calculate_formula(parsed, Some(&reference)) {
        types::Value::Number(n) => Ok(f64::from(n)),
        types::Value::Boolean(b) => Ok(if matches!(b, types::Boolean::True) {
            1.0
        } else {
            0.0
        }),
        other => Err(format!("argument '{}' is not numeric: {:?}", arg, other)),
    }
}

/// Index just past the double-quoted literal starting at `start`; `""` is
/// an embedded quote.
fn string_literal_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == b'"' {
            if bytes.get(i + 1) == Some(&b'"') {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// Matching `)` for the `(` at `open`, skipping string literals.
fn closing_paren(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i = string_literal_end(bytes, i);
                continue;
            }
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Split an argument list at top-level commas. An all-whitespace list has
/// no arguments.
fn split_arguments(inner: &str) -> Vec<&str> {
    if inner.trim().is_empty() {
        return Vec::new();
    }
    let bytes = inner.as_bytes();
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut segment = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i = string_literal_end(bytes, i);
                continue;
            }
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                args.push(&inner[segment..i]);
                segment = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    args.push(&inner[segment..]);
    args
}

/// Replace localized function names (identifier followed by `(`) with their
/// canonical spelling, leaving string literals untouched.
fn translate_locale(text: &str, registry: &FormulaRegistry) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if c == b'"' {
            let end = string_literal_end(bytes, i);
            out.push_str(&text[i..end]);
            i = end;
        } else if c.is_ascii_alphabetic() || c == b'_' {
            let start = i;
            while matches!(
                bytes.get(i),
                Some(&ch) if ch.is_ascii_alphanumeric() || matches!(ch, b'_' | b'.')
            ) {
                i += 1;
            }
            let token = &text[start..i];
            let mut ahead = i;
            while matches!(bytes.get(ahead), Some(ch) if ch.is_ascii_whitespace()) {
                ahead += 1;
            }
            match registry.canonical_name(token) {
                Some(canonical) if bytes.get(ahead) == Some(&b'(') => out.push_str(canonical),
                _ => out.push_str(token),
            }
        } else {
            let len = text[i..].chars().next().map_or(1, char::len_utf8);
            out.push_str(&text[i..i + len]);
            i += len;
        }
    }
    out
}

fn sheet_index(workbook: &Workbook, name: &str) -> Option<usize> {
    workbook
        .sheets()
        .iter()
        .position(|s| s.name().eq_ignore_ascii_case(name))
}

fn encode_variable(sheet: usize, row: u32, col: u32) -> String {
    format!("X{}_{}_{}", sheet, row, col)
}

fn decode_variable(var: &str) -> Option<(usize, u32, u32)> {
    let rest = var.strip_prefix('X')?;
    let mut parts = rest.split('_');
    let sheet = parts.next()?.parse().ok()?;
    let row = parts.next()?.parse().ok()?;
    let col = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((sheet, row, col))
}

fn resolve_variable(workbook: &Workbook, var: &str) -> types::Value {
    let Some((si, row, col)) = decode_variable(var) else {
        return types::Value::Error(types::Error::Value);
    };
    let Some(sheet) = workbook.sheets().get(si) else {
        return types::Value::Error(types::Error::Value);
    };
    match sheet.cell(row, col).map(|c| &c.value) {
        // Empty and absent cells read as zero, like a spreadsheet.
        None | Some(CellValue::Empty) => types::Value::Number(0.0),
        Some(CellValue::Number(n)) => types::Value::Number(*n as f32),
        Some(CellValue::Text(s)) => types::Value::Text(s.clone()),
        Some(CellValue::Bool(b)) => types::Value::Boolean(if *b {
            types::Boolean::True
        } else {
            types::Boolean::False
        }),
    }
}

/// Trim f32 precision artifacts from engine results.
fn round_result(n: f64) -> f64 {
    (n * 1e6).round() / 1e6
}
