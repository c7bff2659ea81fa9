//! Dependency graph construction over formula cells.
//!
//! Nodes are normalized `Sheet!A1` identifiers. Every cell currently holding
//! a formula becomes a formula node; referenced plain-value cells appear as
//! leaf nodes with no outgoing edges. The graph is rebuilt from live
//! workbook state on every analysis query, never cached across cell
//! writes.

use crate::addr;
use crate::analysis::resolver;
use crate::model::Workbook;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// Directed dependency graph: an edge `a → b` means formula cell `a` reads
/// cell `b`.
#[derive(Debug)]
pub struct FormulaGraph {
    graph: DiGraph<String, ()>,
    indices: HashMap<String, NodeIndex>,
    formula_nodes: Vec<String>,
}

impl FormulaGraph {
    /// Build the graph for the workbook's current contents. Sheets are
    /// walked in workbook order and cells in row-major order, so node and
    /// edge insertion order is deterministic per call.
    pub fn build(workbook: &Workbook) -> Self {
        let mut graph = DiGraph::new();
        let mut indices: HashMap<String, NodeIndex> = HashMap::new();
        let mut formula_nodes = Vec::new();

        // Formula nodes first, in traversal order.
        for sheet in workbook.sheets() {
            for (&(row, col), cell) in sheet.iter() {
                if cell.formula.is_some() {
                    let node = addr::format_node(sheet.name(), row, col);
                    let idx = graph.add_node(node.clone());
                    indices.insert(node.clone(), idx);
                    formula_nodes.push(node);
                }
            }
        }

        // Edges; referenced non-formula cells become leaves on demand.
        for sheet in workbook.sheets() {
            let sheet_name = sheet.name().to_string();
            for (&(row, col), cell) in sheet.iter() {
                let Some(formula) = &cell.formula else {
                    continue;
                };
                let source = addr::format_node(&sheet_name, row, col);
                let source_idx = indices[&source];
                for target in resolver::extract_references(formula, &sheet_name) {
                    let target = canonicalize(workbook, &target);
                    let target_idx = *indices
                        .entry(target.clone())
                        .or_insert_with(|| graph.add_node(target));
                    graph.add_edge(source_idx, target_idx, ());
                }
            }
        }

        Self {
            graph,
            indices,
            formula_nodes,
        }
    }

    /// Nodes that hold a formula, in build order.
    pub fn formula_nodes(&self) -> &[String] {
        &self.formula_nodes
    }

    pub fn contains(&self, node: &str) -> bool {
        self.indices.contains_key(node)
    }

    /// Direct dependencies of a node, in edge insertion order.
    pub fn dependencies_of(&self, node: &str) -> Vec<&str> {
        let Some(&idx) = self.indices.get(node) else {
            return Vec::new();
        };
        self.graph
            .neighbors(idx)
            .map(|n| self.graph[n].as_str())
            .collect()
    }

    pub(crate) fn graph(&self) -> &DiGraph<String, ()> {
        &self.graph
    }

    pub(crate) fn index_of(&self, node: &str) -> Option<NodeIndex> {
        self.indices.get(node).copied()
    }
}

/// Rewrite a reference's sheet component to the workbook's stored casing.
/// References to unknown sheets are kept as written (the resolver does not
/// validate existence).
fn canonicalize(workbook: &Workbook, node: &str) -> String {
    let Some((sheet, row, col)) = addr::split_node(node) else {
        return node.to_string();
    };
    match workbook.canonical_sheet_name(sheet) {
        Some(canonical) if canonical != sheet => addr::format_node(canonical, row, col),
        _ => node.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CellValue, Workbook};

    fn workbook() -> Workbook {
        let mut wb = Workbook::new();
        let sheet = wb.add_sheet("Sheet1").unwrap();
        sheet.set_value(1, 0, CellValue::Number(10.0)); // A2
        sheet.set_value(1, 1, CellValue::Number(2.0)); // B2
        sheet.set_formula(1, 2, "A2*B2"); // C2
        sheet.set_formula(2, 2, "SUM(C2:C2)"); // C3
        wb
    }

    #[test]
    fn test_formula_nodes_only() {
        let graph = FormulaGraph::build(&workbook());
        assert_eq!(graph.formula_nodes(), &["Sheet1!C2", "Sheet1!C3"]);
    }

    #[test]
    fn test_value_targets_are_leaves() {
        let graph = FormulaGraph::build(&workbook());
        let mut deps = graph.dependencies_of("Sheet1!C2");
        deps.sort_unstable();
        assert_eq!(deps, vec!["Sheet1!A2", "Sheet1!B2"]);
        assert!(graph.dependencies_of("Sheet1!A2").is_empty());
    }

    #[test]
    fn test_sheet_name_canonicalized() {
        let mut wb = workbook();
        wb.sheet_mut("Sheet1").unwrap().set_formula(5, 0, "sheet1!A2+1");
        let graph = FormulaGraph::build(&wb);
        assert_eq!(graph.dependencies_of("Sheet1!A6"), vec!["Sheet1!A2"]);
    }

    #[test]
    fn test_unknown_sheet_kept_as_leaf() {
        let mut wb = workbook();
        wb.sheet_mut("Sheet1").unwrap().set_formula(6, 0, "Elsewhere!B1");
        let graph = FormulaGraph::build(&wb);
        assert_eq!(graph.dependencies_of("Sheet1!A7"), vec!["Elsewhere!B1"]);
    }

    #[test]
    fn test_rebuild_reflects_live_state() {
        let mut wb = workbook();
        let before = FormulaGraph::build(&wb);
        assert_eq!(before.formula_nodes().len(), 2);

        wb.sheet_mut("Sheet1").unwrap().clear_cell(2, 2);
        let after = FormulaGraph::build(&wb);
        assert_eq!(after.formula_nodes(), &["Sheet1!C2"]);
    }
}
