//! Dependency graph construction and traversal

use formkit_common::{FieldDependency, ValueDependency};
use formkit_expr::ExpressionEvaluator;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// One field in the graph
#[derive(Debug, Clone, Default, Serialize)]
pub struct DependencyNode {
    /// Field keyword
    pub field: String,
    /// Fields whose values feed this one's rules
    pub depends_on: BTreeSet<String>,
    /// Fields whose rules read this one
    pub affects: BTreeSet<String>,
    /// Field-level rules targeting this field
    pub field_rules: Vec<FieldDependency>,
    /// Value-level rules targeting this field
    pub value_rules: Vec<ValueDependency>,
}

impl DependencyNode {
    fn new(field: &str) -> Self {
        Self {
            field: field.to_string(),
            ..Default::default()
        }
    }

    /// Whether any rule targets this field
    pub fn has_rules(&self) -> bool {
        !self.field_rules.is_empty() || !self.value_rules.is_empty()
    }
}

/// Immutable dependency graph
///
/// Nodes are kept in a `BTreeMap`, so every traversal (and therefore the
/// order fields inside a cycle are visited in) is lexicographic by keyword.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, DependencyNode>,
    evaluation_order: Vec<String>,
    cycles: Vec<Vec<String>>,
}

impl DependencyGraph {
    /// Build from a rule set
    ///
    /// Fields referenced by a gating expression become edges into the
    /// rule's target as well, so changing them triggers a recompute.
    pub fn build(
        field_rules: &[FieldDependency],
        value_rules: &[ValueDependency],
        evaluator: &ExpressionEvaluator,
    ) -> Self {
        let mut nodes: BTreeMap<String, DependencyNode> = BTreeMap::new();

        fn link(nodes: &mut BTreeMap<String, DependencyNode>, from: &str, to: &str) {
            nodes
                .entry(from.to_string())
                .or_insert_with(|| DependencyNode::new(from))
                .affects
                .insert(to.to_string());
            nodes
                .entry(to.to_string())
                .or_insert_with(|| DependencyNode::new(to))
                .depends_on
                .insert(from.to_string());
        }

        for rule in field_rules {
            link(&mut nodes, &rule.changed_keyword, &rule.actioned_keyword);
            if let Some(gate) = rule.gate() {
                for referenced in evaluator.get_dependencies(gate) {
                    if referenced != rule.actioned_keyword {
                        link(&mut nodes, &referenced, &rule.actioned_keyword);
                    }
                }
            }
            if let Some(node) = nodes.get_mut(&rule.actioned_keyword) {
                node.field_rules.push(rule.clone());
            }
        }

        for rule in value_rules {
            link(&mut nodes, &rule.changed_keyword, &rule.actioned_keyword);
            if let Some(gate) = rule.expression.as_deref().filter(|e| !e.trim().is_empty()) {
                for referenced in evaluator.get_dependencies(gate) {
                    if referenced != rule.actioned_keyword {
                        link(&mut nodes, &referenced, &rule.actioned_keyword);
                    }
                }
            }
            if let Some(node) = nodes.get_mut(&rule.actioned_keyword) {
                node.value_rules.push(rule.clone());
            }
        }

        let edges: BTreeMap<String, BTreeSet<String>> = nodes
            .iter()
            .map(|(name, node)| (name.clone(), node.depends_on.clone()))
            .collect();
        let (evaluation_order, cycles) = topological_order(&edges);

        Self {
            nodes,
            evaluation_order,
            cycles,
        }
    }

    /// Node for `field`
    pub fn node(&self, field: &str) -> Option<&DependencyNode> {
        self.nodes.get(field)
    }

    /// All nodes, by keyword
    pub fn nodes(&self) -> impl Iterator<Item = &DependencyNode> {
        self.nodes.values()
    }

    /// Dependencies before dependents; cyclic fields included
    pub fn evaluation_order(&self) -> &[String] {
        &self.evaluation_order
    }

    /// Closed cycle paths (first == last)
    pub fn cycles(&self) -> &[Vec<String>] {
        &self.cycles
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Transitive closure over `affects`, DFS pre-order
    pub fn affected_fields(&self, field: &str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        self.collect_affected(field, &mut seen, &mut out);
        out
    }

    fn collect_affected(&self, field: &str, seen: &mut BTreeSet<String>, out: &mut Vec<String>) {
        let Some(node) = self.nodes.get(field) else {
            return;
        };
        for next in &node.affects {
            if seen.insert(next.clone()) {
                out.push(next.clone());
                self.collect_affected(next, seen, out);
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Grey,
    Black,
}

struct Walk<'a> {
    edges: &'a BTreeMap<String, BTreeSet<String>>,
    marks: HashMap<&'a str, Mark>,
    path: Vec<&'a str>,
    order: Vec<String>,
    cycles: Vec<Vec<String>>,
}

impl<'a> Walk<'a> {
    fn visit(&mut self, node: &'a str) {
        match self.marks.get(node) {
            Some(Mark::Black) => return,
            Some(Mark::Grey) => {
                // back edge
                if let Some(start) = self.path.iter().position(|n| *n == node) {
                    let mut cycle: Vec<String> =
                        self.path[start..].iter().map(|n| n.to_string()).collect();
                    cycle.push(node.to_string());
                    self.cycles.push(cycle);
                }
                return;
            }
            None => {}
        }

        self.marks.insert(node, Mark::Grey);
        self.path.push(node);
        let edges = self.edges;
        if let Some(deps) = edges.get(node) {
            for dep in deps {
                self.visit(dep.as_str());
            }
        }
        self.path.pop();
        self.marks.insert(node, Mark::Black);
        self.order.push(node.to_string());
    }
}

/// Three-colour DFS over `node -> depends_on` edges
///
/// Returns an order where every field follows the fields it depends on
/// (except across a cycle) and every cycle found as a closed path.
/// Cycles never abort the walk; their members still appear in the order.
pub fn topological_order(
    edges: &BTreeMap<String, BTreeSet<String>>,
) -> (Vec<String>, Vec<Vec<String>>) {
    let mut walk = Walk {
        edges,
        marks: HashMap::new(),
        path: Vec::new(),
        order: Vec::new(),
        cycles: Vec::new(),
    };
    for node in edges.keys() {
        walk.visit(node.as_str());
    }
    (walk.order, walk.cycles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use formkit_common::DependencyAction;

    fn rule(from: &str, to: &str) -> FieldDependency {
        FieldDependency::on_value(from, "Y", DependencyAction::Show, to)
    }

    #[test]
    fn test_build_links_both_directions() {
        let graph = DependencyGraph::build(
            &[rule("A", "B"), rule("B", "C")],
            &[],
            &ExpressionEvaluator::new(),
        );
        assert_eq!(graph.len(), 3);
        let b = graph.node("B").unwrap();
        assert!(b.depends_on.contains("A"));
        assert!(b.affects.contains("C"));
        assert_eq!(b.field_rules.len(), 1);
        assert!(!graph.node("A").unwrap().has_rules());
        assert_eq!(graph.evaluation_order(), ["A", "B", "C"]);
        assert!(graph.cycles().is_empty());
    }

    #[test]
    fn test_gate_references_become_edges() {
        let gated = FieldDependency::on_expression(
            "PLAN",
            "@PLAN == 'X' and @AGE > 60",
            DependencyAction::Hide,
            "RIDER",
        );
        let graph = DependencyGraph::build(&[gated], &[], &ExpressionEvaluator::new());
        assert!(graph.node("AGE").unwrap().affects.contains("RIDER"));
        assert_eq!(graph.affected_fields("AGE"), vec!["RIDER"]);
    }

    #[test]
    fn test_affected_fields_preorder() {
        let graph = DependencyGraph::build(
            &[rule("A", "C"), rule("A", "B"), rule("B", "D"), rule("C", "D")],
            &[],
            &ExpressionEvaluator::new(),
        );
        assert_eq!(graph.affected_fields("A"), vec!["B", "D", "C"]);
        assert!(graph.affected_fields("UNKNOWN").is_empty());
    }

    #[test]
    fn test_cycles_are_closed_paths() {
        let graph = DependencyGraph::build(
            &[rule("A", "B"), rule("B", "C"), rule("C", "A")],
            &[],
            &ExpressionEvaluator::new(),
        );
        assert_eq!(graph.cycles().len(), 1);
        let cycle = &graph.cycles()[0];
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 4);
        // every member still gets an order slot
        assert_eq!(graph.evaluation_order().len(), 3);
        // reachability terminates
        assert_eq!(graph.affected_fields("A"), vec!["B", "C", "A"]);
    }

    #[test]
    fn test_topological_order_with_external_refs() {
        let mut edges = BTreeMap::new();
        edges.insert("TOTAL".to_string(), BTreeSet::from(["SUM".to_string()]));
        edges.insert("SUM".to_string(), BTreeSet::from(["PREMIUM".to_string()]));
        let (order, cycles) = topological_order(&edges);
        assert_eq!(order, vec!["PREMIUM", "SUM", "TOTAL"]);
        assert!(cycles.is_empty());
    }
}
