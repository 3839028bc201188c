#![forbid(unsafe_code)]

//! Parser for the DOT graph-description language.
//!
//! [`parse`] turns DOT source text into a [`GraphData`] value: nodes and
//! edges with their attribute maps, graph-level attributes, and the
//! `directed`/`strict` flags fixed by the header. Parsing is all-or-nothing;
//! any lexical, grammatical or semantic problem yields a single [`DotError`].

mod graph_builder;
mod lexer;
mod parser;

use dp_core::{DotError, GraphData};
use serde_json::{Value, json};

pub use lexer::{Keyword, Operator, SpannedToken, Token, tokenize};

/// Parse a complete DOT document.
pub fn parse(input: &str) -> Result<GraphData, DotError> {
    let tokens = tokenize(input)?;
    parser::DotParser::new(tokens).parse_graph()
}

/// JSON summary of a parsed graph for tooling.
#[must_use]
pub fn parse_summary(graph: &GraphData) -> Value {
    json!({
        "id": graph.id,
        "directed": graph.directed,
        "strict": graph.strict,
        "node_count": graph.nodes.len(),
        "edge_count": graph.edge_count(),
        "edge_occurrence_count": graph.edge_occurrence_count(),
        "graph_attribute_count": graph.graph_attributes.len(),
    })
}
