use dp_core::{AttributeMap, DotEdge, GraphData};
use rustc_hash::FxHashMap;

/// Accumulates the parse result. Nodes and edges are only ever added or have
/// their attributes overwritten.
pub(crate) struct GraphBuilder {
    graph: GraphData,
    edge_index_by_key: FxHashMap<(String, String), usize>,
}

impl GraphBuilder {
    pub(crate) fn new(directed: bool, strict: bool, id: Option<String>) -> Self {
        let mut graph = GraphData::empty(directed, strict);
        graph.id = id;
        Self {
            graph,
            edge_index_by_key: FxHashMap::default(),
        }
    }

    pub(crate) fn node_count(&self) -> usize {
        self.graph.nodes.len()
    }

    pub(crate) fn edge_count(&self) -> usize {
        self.graph.edges.len()
    }

    pub(crate) fn finish(self) -> GraphData {
        self.graph
    }

    /// Creates `id` with a copy of `defaults` unless it already exists.
    /// Returns whether the node was created.
    pub(crate) fn ensure_node(&mut self, id: &str, defaults: &AttributeMap) -> bool {
        if self.graph.nodes.contains_key(id) {
            return false;
        }
        self.graph.nodes.insert(id.to_string(), defaults.clone());
        true
    }

    /// Create-or-merge: overlays `attrs` onto the node's stored map.
    pub(crate) fn add_node(&mut self, id: &str, attrs: &AttributeMap) {
        self.graph
            .nodes
            .entry(id.to_string())
            .or_default()
            .merge(attrs);
    }

    pub(crate) fn merge_graph_attributes(&mut self, attrs: &AttributeMap) {
        self.graph.graph_attributes.merge(attrs);
    }

    /// Records one syntactic edge occurrence under its canonical key.
    ///
    /// Strict graphs keep only the latest occurrence per key; other graphs
    /// append in parse order.
    pub(crate) fn add_edge_occurrence(&mut self, from: &str, to: &str, attrs: AttributeMap) {
        let index = match self.canonical_index(from, to) {
            Some(index) => index,
            None => {
                let index = self.graph.edges.len();
                self.graph.edges.push(DotEdge {
                    from: from.to_string(),
                    to: to.to_string(),
                    occurrences: Vec::new(),
                });
                self.edge_index_by_key
                    .insert((from.to_string(), to.to_string()), index);
                index
            }
        };

        let occurrences = &mut self.graph.edges[index].occurrences;
        if self.graph.strict {
            occurrences.clear();
        }
        occurrences.push(attrs);
    }

    /// Undirected graphs reuse whichever orientation was inserted first.
    fn canonical_index(&self, from: &str, to: &str) -> Option<usize> {
        let forward = (from.to_string(), to.to_string());
        if let Some(index) = self.edge_index_by_key.get(&forward) {
            return Some(*index);
        }
        if self.graph.directed {
            return None;
        }
        let (from, to) = forward;
        self.edge_index_by_key.get(&(to, from)).copied()
    }
}
