#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub col: usize,
    pub byte: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// Maps byte offsets into a source text to 1-based line/column positions.
#[derive(Debug, Clone)]
pub struct LineIndex<'src> {
    source: &'src str,
    line_starts: Vec<usize>,
}

impl<'src> LineIndex<'src> {
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .char_indices()
                .filter(|(_, ch)| *ch == '\n')
                .map(|(idx, _)| idx + 1),
        );
        Self {
            source,
            line_starts,
        }
    }

    #[must_use]
    pub fn position(&self, byte: usize) -> Position {
        let byte = byte.min(self.source.len());
        let line_idx = self
            .line_starts
            .partition_point(|start| *start <= byte)
            .saturating_sub(1);
        let line_start = self.line_starts[line_idx];
        let col = self
            .source
            .get(line_start..byte)
            .map_or(byte - line_start, |prefix| prefix.chars().count());
        Position {
            line: line_idx + 1,
            col: col + 1,
            byte,
        }
    }

    #[must_use]
    pub fn span(&self, start: usize, end: usize) -> Span {
        Span::new(self.position(start), self.position(end))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DotErrorCode {
    Lex,
    #[default]
    Parse,
    Semantic,
}

impl DotErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lex => "dot/error/lex",
            Self::Parse => "dot/error/parse",
            Self::Semantic => "dot/error/semantic",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Error, PartialEq, Eq)]
pub enum DotError {
    /// Malformed token: unterminated quoted string or comment, or a character
    /// no token rule accepts.
    #[error("{message}")]
    Lex { message: String, span: Span },
    /// Token sequence that does not match the grammar.
    #[error("{message}")]
    Parse {
        message: String,
        span: Span,
        expected: Vec<String>,
    },
    /// Well-formed input that breaks a language rule, e.g. `->` in an
    /// undirected graph.
    #[error("{message}")]
    Semantic { message: String, span: Span },
}

impl DotError {
    #[must_use]
    pub fn lex(message: impl Into<String>, span: Span) -> Self {
        Self::Lex {
            message: message.into(),
            span,
        }
    }

    #[must_use]
    pub fn parse(message: impl Into<String>, span: Span, expected: Vec<String>) -> Self {
        Self::Parse {
            message: message.into(),
            span,
            expected,
        }
    }

    #[must_use]
    pub fn semantic(message: impl Into<String>, span: Span) -> Self {
        Self::Semantic {
            message: message.into(),
            span,
        }
    }

    #[must_use]
    pub fn code(&self) -> DotErrorCode {
        match self {
            Self::Lex { .. } => DotErrorCode::Lex,
            Self::Parse { .. } => DotErrorCode::Parse,
            Self::Semantic { .. } => DotErrorCode::Semantic,
        }
    }

    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Lex { span, .. } | Self::Parse { span, .. } | Self::Semantic { span, .. } => {
                *span
            }
        }
    }
}

/// String-keyed attribute map with unique keys.
///
/// Ordered by key so serialized output is stable across runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct AttributeMap(BTreeMap<String, String>);

impl AttributeMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay-wins merge: every key of `overlay` is inserted, replacing any
    /// existing value.
    pub fn merge(&mut self, overlay: &AttributeMap) {
        for (key, value) in &overlay.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AttributeMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// One canonical edge key together with every stored occurrence.
///
/// `from`/`to` is the orientation under which the key was first inserted.
/// Strict graphs hold exactly one occurrence per key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DotEdge {
    pub from: String,
    pub to: String,
    pub occurrences: Vec<AttributeMap>,
}

impl DotEdge {
    /// Whether this key stands for the pair `(from, to)` in a graph with the
    /// given directedness.
    #[must_use]
    pub fn connects(&self, from: &str, to: &str, directed: bool) -> bool {
        (self.from == from && self.to == to) || (!directed && self.from == to && self.to == from)
    }

    #[must_use]
    pub fn last(&self) -> Option<&AttributeMap> {
        self.occurrences.last()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GraphData {
    pub id: Option<String>,
    pub directed: bool,
    pub strict: bool,
    pub nodes: BTreeMap<String, AttributeMap>,
    pub edges: Vec<DotEdge>,
    pub graph_attributes: AttributeMap,
}

impl GraphData {
    #[must_use]
    pub fn empty(directed: bool, strict: bool) -> Self {
        Self {
            id: None,
            directed,
            strict,
            nodes: BTreeMap::new(),
            edges: Vec::new(),
            graph_attributes: AttributeMap::new(),
        }
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&AttributeMap> {
        self.nodes.get(id)
    }

    /// Looks up the edge key for `(from, to)`; undirected graphs match either
    /// orientation.
    #[must_use]
    pub fn edge(&self, from: &str, to: &str) -> Option<&DotEdge> {
        self.edges
            .iter()
            .find(|edge| edge.connects(from, to, self.directed))
    }

    /// Number of distinct canonical edge keys.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of stored edge occurrences across all keys.
    #[must_use]
    pub fn edge_occurrence_count(&self) -> usize {
        self.edges.iter().map(|edge| edge.occurrences.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_lets_overlay_win() {
        let mut base: AttributeMap = [("color", "red"), ("shape", "box")].into_iter().collect();
        let overlay: AttributeMap = [("color", "blue"), ("style", "bold")].into_iter().collect();
        base.merge(&overlay);

        assert_eq!(base.get("color"), Some("blue"));
        assert_eq!(base.get("shape"), Some("box"));
        assert_eq!(base.get("style"), Some("bold"));
        assert_eq!(base.len(), 3);
    }

    #[test]
    fn undirected_edge_lookup_matches_both_orientations() {
        let mut graph = GraphData::empty(false, false);
        graph.edges.push(DotEdge {
            from: "a".to_string(),
            to: "b".to_string(),
            occurrences: vec![AttributeMap::new(), AttributeMap::new()],
        });

        assert!(graph.edge("a", "b").is_some());
        assert!(graph.edge("b", "a").is_some());
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edge_occurrence_count(), 2);

        graph.directed = true;
        assert!(graph.edge("b", "a").is_none());
    }

    #[test]
    fn line_index_counts_lines_and_chars() {
        let source = "graph {\n  é -- b\n}";
        let index = LineIndex::new(source);

        assert_eq!(index.position(0), Position { line: 1, col: 1, byte: 0 });
        let b_offset = source.find('b').expect("b present");
        let pos = index.position(b_offset);
        assert_eq!(pos.line, 2);
        // 'é' is two bytes but one column.
        assert_eq!(pos.col, 8);
        assert_eq!(index.position(source.len()).line, 3);
    }

    #[test]
    fn error_codes_and_spans() {
        let at = Position { line: 2, col: 5, byte: 12 };
        let span = Span::new(at, at);
        let err = DotError::semantic("edge operator mismatch", span);
        assert_eq!(err.code(), DotErrorCode::Semantic);
        assert_eq!(err.code().as_str(), "dot/error/semantic");
        assert_eq!(err.span(), span);
        assert_eq!(err.to_string(), "edge operator mismatch");

        let err = DotError::parse("expected '}'", span, vec!["'}'".to_string()]);
        assert_eq!(err.code().as_str(), "dot/error/parse");
    }

    #[test]
    fn graph_data_serializes_attribute_maps_as_objects() {
        let mut graph = GraphData::empty(true, false);
        graph
            .nodes
            .insert("a".to_string(), [("color", "red")].into_iter().collect());
        let value = serde_json::to_value(&graph).expect("serialize graph");
        assert_eq!(value["nodes"]["a"]["color"], "red");
        assert_eq!(value["directed"], true);
    }
}
