//! Recursive-descent DOT grammar:
//!
//! ```text
//! graph      := ["strict"] ("graph" | "digraph") [ID] "{" stmt_list "}"
//! stmt_list  := { stmt [";"] }
//! stmt       := attr_stmt | edge_stmt | node_stmt | subgraph | ID "=" ID
//! edge_stmt  := endpoint edge_op endpoint { edge_op endpoint } [attr_list]
//! endpoint   := node_id | subgraph
//! subgraph   := ["subgraph" [ID]] "{" stmt_list "}"
//! ```

use dp_core::{AttributeMap, DotError, GraphData, Span};
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::graph_builder::GraphBuilder;
use crate::lexer::{Keyword, Operator, SpannedToken, Token};

/// Attribute defaults visible to the statements of one brace block.
///
/// Each block parses with its own clone, so `node [...]`/`edge [...]` inside a
/// subgraph never reach the parent or later siblings.
#[derive(Debug, Clone, Default)]
struct Scope {
    node_defaults: AttributeMap,
    edge_defaults: AttributeMap,
}

/// Node ids in first-mention order, without duplicates.
#[derive(Debug, Default)]
struct NodeSet {
    order: Vec<String>,
    seen: FxHashSet<String>,
}

impl NodeSet {
    fn single(id: String) -> Self {
        let mut set = Self::default();
        set.insert(id);
        set
    }

    fn insert(&mut self, id: String) {
        if self.seen.insert(id.clone()) {
            self.order.push(id);
        }
    }

    fn extend(&mut self, other: NodeSet) {
        for id in other.order {
            self.insert(id);
        }
    }

    fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

pub(crate) struct DotParser {
    tokens: Vec<SpannedToken>,
    cursor: usize,
    directed: bool,
}

impl DotParser {
    /// `tokens` must end with [`Token::Eof`], as produced by `tokenize`.
    pub(crate) fn new(tokens: Vec<SpannedToken>) -> Self {
        Self {
            tokens,
            cursor: 0,
            directed: false,
        }
    }

    pub(crate) fn parse_graph(mut self) -> Result<GraphData, DotError> {
        let strict = self.eat_keyword(Keyword::Strict);
        self.directed = match self.peek() {
            Token::Keyword(Keyword::Graph) => false,
            Token::Keyword(Keyword::Digraph) => true,
            _ => return Err(self.unexpected(&["`graph`", "`digraph`"])),
        };
        self.advance();

        let id = self.take_id();
        self.expect_op(Operator::LBrace)?;

        let mut builder = GraphBuilder::new(self.directed, strict, id);
        let mut scope = Scope::default();
        self.parse_stmt_list(&mut builder, &mut scope)?;
        self.expect_op(Operator::RBrace)?;
        if *self.peek() != Token::Eof {
            return Err(self.unexpected(&["end of input"]));
        }

        debug!(
            directed = self.directed,
            strict,
            nodes = builder.node_count(),
            edges = builder.edge_count(),
            "parsed DOT graph"
        );
        Ok(builder.finish())
    }

    /// Parses statements up to (not including) the closing `}` and returns
    /// every node id the block mentioned, nested blocks included.
    fn parse_stmt_list(
        &mut self,
        builder: &mut GraphBuilder,
        scope: &mut Scope,
    ) -> Result<NodeSet, DotError> {
        let mut touched = NodeSet::default();
        while !matches!(self.peek(), Token::Op(Operator::RBrace) | Token::Eof) {
            self.parse_stmt(builder, scope, &mut touched)?;
            self.eat_op(Operator::Semicolon);
        }
        Ok(touched)
    }

    fn parse_stmt(
        &mut self,
        builder: &mut GraphBuilder,
        scope: &mut Scope,
        touched: &mut NodeSet,
    ) -> Result<(), DotError> {
        match self.peek() {
            Token::Keyword(Keyword::Graph) => {
                self.advance();
                let attrs = self.parse_attr_list()?;
                builder.merge_graph_attributes(&attrs);
            }
            Token::Keyword(Keyword::Node) => {
                self.advance();
                let attrs = self.parse_attr_list()?;
                scope.node_defaults.merge(&attrs);
            }
            Token::Keyword(Keyword::Edge) => {
                self.advance();
                let attrs = self.parse_attr_list()?;
                scope.edge_defaults.merge(&attrs);
            }
            Token::Keyword(Keyword::Subgraph) | Token::Op(Operator::LBrace) => {
                let nodes = self.parse_subgraph(builder, scope)?;
                if self.at_edge_op() {
                    self.parse_edge_chain(builder, scope, nodes, touched)?;
                } else {
                    touched.extend(nodes);
                }
            }
            token if token.id_text().is_some() => {
                let id = self.take_id().unwrap_or_default();
                if self.eat_op(Operator::Equals) {
                    self.expect_id("assignment value")?;
                    return Ok(());
                }
                self.skip_port()?;
                builder.ensure_node(&id, &scope.node_defaults);
                if self.at_edge_op() {
                    self.parse_edge_chain(builder, scope, NodeSet::single(id), touched)?;
                } else {
                    let attrs = self.parse_attr_list()?;
                    if !attrs.is_empty() {
                        builder.add_node(&id, &attrs);
                    }
                    touched.insert(id);
                }
            }
            _ => {
                return Err(self.unexpected(&[
                    "identifier",
                    "`graph`",
                    "`node`",
                    "`edge`",
                    "`subgraph`",
                    "`{`",
                    "`}`",
                ]));
            }
        }
        Ok(())
    }

    /// Expands `first (op endpoint)+ [attr_list]` into one occurrence per pair
    /// of the cartesian product of each adjacent endpoint pair.
    fn parse_edge_chain(
        &mut self,
        builder: &mut GraphBuilder,
        scope: &Scope,
        first: NodeSet,
        touched: &mut NodeSet,
    ) -> Result<(), DotError> {
        // Endpoints parse with cloned scopes, so this equals the defaults in
        // force when the statement began.
        let mut edge_attrs = scope.edge_defaults.clone();

        let mut endpoints = vec![first];
        while self.eat_edge_op()? {
            let endpoint = self.parse_endpoint(builder, scope)?;
            endpoints.push(endpoint);
        }

        // Edges created inside subgraph endpoints are already final; the
        // trailing list only reaches the edges of this chain.
        let trailing = self.parse_attr_list()?;
        edge_attrs.merge(&trailing);

        for pair in endpoints.windows(2) {
            for from in pair[0].iter() {
                for to in pair[1].iter() {
                    builder.add_edge_occurrence(from, to, edge_attrs.clone());
                }
            }
        }

        for endpoint in endpoints {
            touched.extend(endpoint);
        }
        Ok(())
    }

    fn parse_endpoint(
        &mut self,
        builder: &mut GraphBuilder,
        scope: &Scope,
    ) -> Result<NodeSet, DotError> {
        if matches!(
            self.peek(),
            Token::Keyword(Keyword::Subgraph) | Token::Op(Operator::LBrace)
        ) {
            return self.parse_subgraph(builder, scope);
        }

        let id = self.expect_id("node identifier or subgraph")?;
        self.skip_port()?;
        builder.ensure_node(&id, &scope.node_defaults);
        Ok(NodeSet::single(id))
    }

    fn parse_subgraph(
        &mut self,
        builder: &mut GraphBuilder,
        scope: &Scope,
    ) -> Result<NodeSet, DotError> {
        let name = if self.eat_keyword(Keyword::Subgraph) {
            self.take_id()
        } else {
            None
        };
        self.expect_op(Operator::LBrace)?;
        trace!(subgraph = name.as_deref().unwrap_or("<anonymous>"), "entering subgraph");

        let mut inner = scope.clone();
        let nodes = self.parse_stmt_list(builder, &mut inner)?;
        self.expect_op(Operator::RBrace)?;
        Ok(nodes)
    }

    /// Zero or more `[ ... ]` groups, concatenated left to right. Separators
    /// between `key=value` pairs are optional.
    fn parse_attr_list(&mut self) -> Result<AttributeMap, DotError> {
        let mut attrs = AttributeMap::new();
        while self.eat_op(Operator::LBracket) {
            while !self.eat_op(Operator::RBracket) {
                let key = self.expect_id("attribute name")?;
                self.expect_op(Operator::Equals)?;
                let value = self.expect_id("attribute value")?;
                attrs.insert(key, value);
                if !self.eat_op(Operator::Comma) {
                    self.eat_op(Operator::Semicolon);
                }
            }
        }
        Ok(attrs)
    }

    /// Consumes an optional `:port[:compass]` suffix.
    fn skip_port(&mut self) -> Result<(), DotError> {
        if self.eat_op(Operator::Colon) {
            self.expect_id("port")?;
            if self.eat_op(Operator::Colon) {
                self.expect_id("compass point")?;
            }
        }
        Ok(())
    }

    fn at_edge_op(&self) -> bool {
        matches!(
            self.peek(),
            Token::Op(Operator::UndirectedEdge | Operator::DirectedEdge)
        )
    }

    /// Consumes an edge operator if present, rejecting one that does not
    /// match the graph's directedness.
    fn eat_edge_op(&mut self) -> Result<bool, DotError> {
        let op = match self.peek() {
            Token::Op(op @ (Operator::UndirectedEdge | Operator::DirectedEdge)) => *op,
            _ => return Ok(false),
        };
        let expected = if self.directed {
            Operator::DirectedEdge
        } else {
            Operator::UndirectedEdge
        };
        if op != expected {
            let kind = if self.directed { "digraph" } else { "graph" };
            return Err(DotError::semantic(
                format!(
                    "edge operator `{}` is not allowed in a {kind}; use `{}`",
                    op.as_str(),
                    expected.as_str()
                ),
                self.peek_span(),
            ));
        }
        self.advance();
        Ok(true)
    }

    fn peek(&self) -> &Token {
        &self.current().token
    }

    fn peek_span(&self) -> Span {
        self.current().span
    }

    fn current(&self) -> &SpannedToken {
        // The trailing Eof is never advanced past.
        &self.tokens[self.cursor.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        if self.cursor + 1 < self.tokens.len() {
            self.cursor += 1;
        }
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if *self.peek() == Token::Keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_op(&mut self, op: Operator) -> bool {
        if *self.peek() == Token::Op(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: Operator) -> Result<(), DotError> {
        if self.eat_op(op) {
            return Ok(());
        }
        let expected = format!("`{}`", op.as_str());
        Err(self.unexpected(&[expected.as_str()]))
    }

    fn take_id(&mut self) -> Option<String> {
        let text = self.peek().id_text()?.to_string();
        self.advance();
        Some(text)
    }

    fn expect_id(&mut self, what: &str) -> Result<String, DotError> {
        self.take_id().ok_or_else(|| self.unexpected(&[what]))
    }

    fn unexpected(&self, expected: &[&str]) -> DotError {
        let found = self.peek().describe();
        let message = match expected {
            [only] => format!("expected {only}, found {found}"),
            _ => format!("expected one of {}, found {found}", expected.join(", ")),
        };
        DotError::parse(
            message,
            self.peek_span(),
            expected.iter().map(|item| (*item).to_string()).collect(),
        )
    }
}
