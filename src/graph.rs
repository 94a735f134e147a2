//! Class and interface relation graph.
//!
//! Direct edges accumulate during traversal; `finalize` computes the
//! transitive closures once and caches them as ordered lists. Keys are
//! qualified names throughout: the graph is a set of name-keyed tables,
//! not a web of node pointers. Closure order is derived from arrival order,
//! so the same input always yields the same output.

use std::collections::{HashMap, HashSet, VecDeque};

/// Relation graph over qualified names, built from parsed class records and
/// frozen by `finalize`.
#[derive(Default)]
pub struct ClassGraph {
    superclass_of: HashMap<String, String>,
    direct_subclasses: HashMap<String, Vec<String>>,
    direct_superinterfaces: HashMap<String, Vec<String>>,
    direct_subinterfaces: HashMap<String, Vec<String>>,
    direct_implementors: HashMap<String, Vec<String>>,
    annotated_classes: HashMap<String, Vec<String>>,

    // Node lists in arrival order; the companion sets are for dedup only.
    class_nodes: Vec<String>,
    class_node_set: HashSet<String>,
    interface_nodes: Vec<String>,
    interface_node_set: HashSet<String>,
    recorded_names: Vec<String>,

    // Cached closures, valid after finalize.
    subclasses: HashMap<String, Vec<String>>,
    superclasses: HashMap<String, Vec<String>>,
    subinterfaces: HashMap<String, Vec<String>>,
    superinterfaces: HashMap<String, Vec<String>>,
    implementors: HashMap<String, Vec<String>>,
}

impl ClassGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards all edges and cached closures ahead of a fresh scan.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Records a parsed class: its superclass edge, declared interfaces and
    /// class-level annotations.
    pub fn add_class(
        &mut self,
        name: &str,
        superclass: &str,
        interfaces: &[String],
        annotations: &[String],
    ) {
        self.superclass_of
            .insert(name.to_string(), superclass.to_string());
        self.direct_subclasses
            .entry(superclass.to_string())
            .or_default()
            .push(name.to_string());
        self.note_class_node(name);
        self.note_class_node(superclass);

        for iface in interfaces {
            self.direct_implementors
                .entry(iface.clone())
                .or_default()
                .push(name.to_string());
            self.note_interface_node(iface);
        }
        for annotation in annotations {
            self.annotated_classes
                .entry(annotation.clone())
                .or_default()
                .push(name.to_string());
        }
        self.recorded_names.push(name.to_string());
    }

    /// Records a parsed interface and the interfaces it extends.
    pub fn add_interface(&mut self, name: &str, super_interfaces: &[String]) {
        self.note_interface_node(name);
        for sup in super_interfaces {
            self.direct_superinterfaces
                .entry(name.to_string())
                .or_default()
                .push(sup.clone());
            self.direct_subinterfaces
                .entry(sup.clone())
                .or_default()
                .push(name.to_string());
            self.note_interface_node(sup);
        }
        self.recorded_names.push(name.to_string());
    }

    fn note_class_node(&mut self, name: &str) {
        if self.class_node_set.insert(name.to_string()) {
            self.class_nodes.push(name.to_string());
        }
    }

    fn note_interface_node(&mut self, name: &str) {
        if self.interface_node_set.insert(name.to_string()) {
            self.interface_nodes.push(name.to_string());
        }
    }

    /// Computes and caches every closure. Called once after traversal; the
    /// graph is read-only afterwards until the next reset.
    pub fn finalize(&mut self) {
        self.subclasses.clear();
        self.superclasses.clear();
        self.subinterfaces.clear();
        self.superinterfaces.clear();
        self.implementors.clear();

        for node in &self.class_nodes {
            self.subclasses
                .insert(node.clone(), reachable(node, &self.direct_subclasses));
            self.superclasses
                .insert(node.clone(), super_chain(node, &self.superclass_of));
        }
        for node in &self.interface_nodes {
            self.subinterfaces
                .insert(node.clone(), reachable(node, &self.direct_subinterfaces));
            self.superinterfaces
                .insert(node.clone(), reachable(node, &self.direct_superinterfaces));
        }

        // A class implements i iff it, or an ancestor, directly declares i
        // or any subinterface of i; every descendant inherits that.
        for node in &self.interface_nodes {
            let mut seen: HashSet<&str> = HashSet::new();
            let mut out: Vec<String> = Vec::new();
            let subinterfaces = &self.subinterfaces[node];
            for iface in std::iter::once(node).chain(subinterfaces.iter()) {
                let Some(direct) = self.direct_implementors.get(iface) else {
                    continue;
                };
                for class in direct {
                    if seen.insert(class) {
                        out.push(class.clone());
                    }
                    for sub in &self.subclasses[class] {
                        if seen.insert(sub) {
                            out.push(sub.clone());
                        }
                    }
                }
            }
            self.implementors.insert(node.clone(), out);
        }
    }

    pub fn subclasses_of(&self, name: &str) -> &[String] {
        cached(&self.subclasses, name)
    }

    pub fn superclasses_of(&self, name: &str) -> &[String] {
        cached(&self.superclasses, name)
    }

    pub fn subinterfaces_of(&self, name: &str) -> &[String] {
        cached(&self.subinterfaces, name)
    }

    pub fn superinterfaces_of(&self, name: &str) -> &[String] {
        cached(&self.superinterfaces, name)
    }

    pub fn implementors_of(&self, name: &str) -> &[String] {
        cached(&self.implementors, name)
    }

    /// Direct annotation lookup; deliberately not transitive over
    /// inheritance.
    pub fn classes_with_annotation(&self, annotation: &str) -> &[String] {
        cached(&self.annotated_classes, annotation)
    }

    /// All class and interface names recorded this scan, in arrival order.
    /// Names that only ever appeared as someone's superclass are not
    /// included.
    pub fn all_class_names(&self) -> &[String] {
        &self.recorded_names
    }
}

fn cached<'a>(table: &'a HashMap<String, Vec<String>>, key: &str) -> &'a [String] {
    table.get(key).map(Vec::as_slice).unwrap_or(&[])
}

/// Breadth-first reachability over a direct-edge table, excluding the start
/// node itself. Adjacency lists are in arrival order, so the result is
/// deterministic for identical input.
fn reachable(start: &str, edges: &HashMap<String, Vec<String>>) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(start.to_string());
    let mut queue: VecDeque<String> = edges
        .get(start)
        .map(|next| next.iter().cloned().collect())
        .unwrap_or_default();
    while let Some(node) = queue.pop_front() {
        if !seen.insert(node.clone()) {
            continue;
        }
        if let Some(next) = edges.get(&node) {
            queue.extend(next.iter().cloned());
        }
        out.push(node);
    }
    out
}

/// Walks the single-parent superclass chain, excluding the start.
fn super_chain(start: &str, parent_of: &HashMap<String, String>) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    seen.insert(start);
    let mut current = start;
    while let Some(parent) = parent_of.get(current) {
        if !seen.insert(parent) {
            break;
        }
        out.push(parent.clone());
        current = parent;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[String]) -> Vec<&str> {
        v.iter().map(String::as_str).collect()
    }

    fn linear_hierarchy() -> ClassGraph {
        let mut g = ClassGraph::new();
        g.add_class("w.C", "w.B", &[], &[]);
        g.add_class("w.B", "w.A", &[], &[]);
        g.add_class("w.A", "java.lang.Object", &[], &[]);
        g.finalize();
        g
    }

    #[test]
    fn subclass_closure_is_transitive_and_excludes_self() {
        let g = linear_hierarchy();
        let subs = g.subclasses_of("w.A");
        assert!(subs.contains(&"w.B".to_string()));
        assert!(subs.contains(&"w.C".to_string()));
        assert_eq!(subs.len(), 2);
        assert!(!g.subclasses_of("w.C").contains(&"w.C".to_string()));
        assert_eq!(
            names(g.superclasses_of("w.C")),
            vec!["w.B", "w.A", "java.lang.Object"]
        );
    }

    #[test]
    fn subclass_and_superclass_closures_are_inverse() {
        let g = linear_hierarchy();
        for a in ["w.A", "w.B", "w.C", "java.lang.Object"] {
            for b in g.subclasses_of(a) {
                assert!(
                    g.superclasses_of(b).contains(&a.to_string()),
                    "{b} in subclasses_of({a}) but inverse missing"
                );
            }
        }
    }

    #[test]
    fn transitive_implementors() {
        // K extends J extends I; X implements K; Y extends X; Z implements I.
        let mut g = ClassGraph::new();
        g.add_interface("w.I", &[]);
        g.add_interface("w.J", &["w.I".to_string()]);
        g.add_interface("w.K", &["w.J".to_string()]);
        g.add_class("w.X", "java.lang.Object", &["w.K".to_string()], &[]);
        g.add_class("w.Y", "w.X", &[], &[]);
        g.add_class("w.Z", "java.lang.Object", &["w.I".to_string()], &[]);
        g.finalize();

        let impl_i = g.implementors_of("w.I");
        for expected in ["w.X", "w.Y", "w.Z"] {
            assert!(impl_i.contains(&expected.to_string()), "missing {expected}");
        }
        let impl_k = g.implementors_of("w.K");
        assert!(impl_k.contains(&"w.X".to_string()));
        assert!(impl_k.contains(&"w.Y".to_string()));
        assert!(!impl_k.contains(&"w.Z".to_string()));
        // Interfaces never appear as implementors.
        assert!(!impl_i.contains(&"w.J".to_string()));

        assert_eq!(names(g.subinterfaces_of("w.I")), vec!["w.J", "w.K"]);
        assert_eq!(names(g.superinterfaces_of("w.K")), vec!["w.J", "w.I"]);
        assert!(!g.subinterfaces_of("w.I").contains(&"w.I".to_string()));
    }

    #[test]
    fn annotation_index_is_direct_only() {
        let mut g = ClassGraph::new();
        g.add_class("w.A", "java.lang.Object", &[], &["w.Anno".to_string()]);
        g.add_class("w.B", "w.A", &[], &[]);
        g.finalize();
        assert_eq!(names(g.classes_with_annotation("w.Anno")), vec!["w.A"]);
    }

    #[test]
    fn recorded_names_track_parsed_records_only() {
        let mut g = ClassGraph::new();
        g.add_class("w.A", "java.lang.Object", &[], &[]);
        g.add_interface("w.I", &[]);
        g.finalize();
        assert_eq!(names(g.all_class_names()), vec!["w.A", "w.I"]);
    }

    #[test]
    fn reset_clears_everything() {
        let mut g = linear_hierarchy();
        g.reset();
        g.finalize();
        assert!(g.subclasses_of("w.A").is_empty());
        assert!(g.all_class_names().is_empty());
    }
}
