//! Circular reference enumeration.
//!
//! Depth-first search with white/gray/black coloring and an explicit path
//! stack. Hitting a gray node records the sub-path from that node's first
//! occurrence through the current node, closed on both ends. Each re-entry
//! event yields one cycle record; cycles sharing nodes but entered from
//! different roots are reported separately rather than deduplicated to a
//! minimal basis.

use crate::analysis::graph::FormulaGraph;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

/// One cycle: an ordered node path whose first and last entries are equal.
/// A self-referencing cell yields `[node, node]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircularReference {
    pub path: Vec<String>,
}

impl CircularReference {
    /// True when `node` participates in this cycle.
    pub fn involves(&self, node: &str) -> bool {
        self.path.iter().any(|n| n == node)
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Enumerate cycles in DFS discovery order of their entry node.
pub fn find_cycles(graph: &FormulaGraph) -> Vec<CircularReference> {
    let g = graph.graph();
    let mut colors = vec![Color::White; g.node_count()];
    let mut path: Vec<NodeIndex> = Vec::new();
    let mut cycles = Vec::new();

    // Roots in build order: formula nodes first, leaves can't open a cycle.
    for node in graph.formula_nodes() {
        let Some(idx) = graph.index_of(node) else {
            continue;
        };
        if colors[idx.index()] == Color::White {
            visit(g, idx, &mut colors, &mut path, &mut cycles);
        }
    }
    cycles
}

fn visit(
    g: &DiGraph<String, ()>,
    node: NodeIndex,
    colors: &mut [Color],
    path: &mut Vec<NodeIndex>,
    cycles: &mut Vec<CircularReference>,
) {
    colors[node.index()] = Color::Gray;
    path.push(node);

    for next in g.neighbors(node) {
        match colors[next.index()] {
            Color::Gray => {
                // Re-entry: close the loop from the first occurrence.
                if let Some(entry) = path.iter().position(|&n| n == next) {
                    let mut nodes: Vec<String> =
                        path[entry..].iter().map(|&n| g[n].clone()).collect();
                    nodes.push(g[next].clone());
                    cycles.push(CircularReference { path: nodes });
                }
            }
            Color::White => visit(g, next, colors, path, cycles),
            Color::Black => {}
        }
    }

    path.pop();
    colors[node.index()] = Color::Black;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::graph::FormulaGraph;
    use crate::model::{CellValue, Workbook};

    fn cycles_of(wb: &Workbook) -> Vec<CircularReference> {
        find_cycles(&FormulaGraph::build(wb))
    }

    #[test]
    fn test_acyclic_graph_has_no_cycles() {
        let mut wb = Workbook::new();
        let sheet = wb.add_sheet("Sheet1").unwrap();
        sheet.set_value(0, 0, CellValue::Number(1.0));
        sheet.set_formula(1, 0, "A1*2");
        sheet.set_formula(2, 0, "A2*2");
        assert!(cycles_of(&wb).is_empty());
    }

    #[test]
    fn test_self_reference_single_node_cycle() {
        let mut wb = Workbook::new();
        wb.add_sheet("Sheet1").unwrap().set_formula(0, 0, "A1");
        let cycles = cycles_of(&wb);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].path, vec!["Sheet1!A1", "Sheet1!A1"]);
    }

    #[test]
    fn test_two_node_cycle_closed_on_both_ends() {
        let mut wb = Workbook::new();
        let sheet = wb.add_sheet("Sheet1").unwrap();
        sheet.set_formula(1, 3, "D3"); // D2
        sheet.set_formula(2, 3, "D2"); // D3
        let cycles = cycles_of(&wb);
        assert_eq!(cycles.len(), 1);
        let path = &cycles[0].path;
        assert_eq!(path.first(), path.last());
        assert!(path.contains(&"Sheet1!D2".to_string()));
        assert!(path.contains(&"Sheet1!D3".to_string()));
    }

    #[test]
    fn test_disjoint_cycles_reported_once_each() {
        let mut wb = Workbook::new();
        let sheet = wb.add_sheet("Sheet1").unwrap();
        sheet.set_formula(0, 0, "B1");
        sheet.set_formula(0, 1, "A1");
        sheet.set_formula(5, 0, "A6"); // self-loop far away
        let cycles = cycles_of(&wb);
        assert_eq!(cycles.len(), 2);
    }

    #[test]
    fn test_diamond_without_cycle() {
        // Two paths into the same dependency must not report a cycle.
        let mut wb = Workbook::new();
        let sheet = wb.add_sheet("Sheet1").unwrap();
        sheet.set_value(0, 0, CellValue::Number(1.0)); // A1
        sheet.set_formula(0, 1, "A1"); // B1
        sheet.set_formula(0, 2, "A1"); // C1
        sheet.set_formula(0, 3, "B1+C1"); // D1
        assert!(cycles_of(&wb).is_empty());
    }
}
