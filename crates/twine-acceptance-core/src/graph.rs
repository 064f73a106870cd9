//! Statement model for catalog pages and ingestion fixtures.
//!
//! Catalog pages arrive as N-Triples, fixtures are N-Quads; both are parsed
//! with Sophia into a small owned statement model that the counter can match
//! against without keeping the parser's borrowed terms alive.

use std::collections::BTreeSet;
use std::io::{BufReader, Cursor};

use serde::Serialize;
use sophia::api::prelude::*;

use crate::error::{HarnessError, Result};
use crate::vocab::Vocabulary;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Node {
    Iri(String),
    Blank(String),
    Literal(String),
}

impl Node {
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Node::Iri(iri) => Some(iri),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub subject: Node,
    pub predicate: String,
    pub object: Node,
    pub graph: Option<Node>,
}

fn node_from_term<T: Term>(term: T) -> Option<Node> {
    if let Some(iri) = term.iri() {
        return Some(Node::Iri(iri.as_str().to_string()));
    }
    if let Some(bnode) = term.bnode_id() {
        return Some(Node::Blank(bnode.as_str().to_string()));
    }
    term.lexical_form().map(|lex| Node::Literal(lex.to_string()))
}

/// Parse an N-Triples document. The error is the parser's message.
pub fn parse_ntriples(bytes: &[u8]) -> std::result::Result<Vec<Statement>, String> {
    let reader = BufReader::new(Cursor::new(bytes));
    let mut out: Vec<Statement> = Vec::new();
    let mut parser = sophia::turtle::parser::nt::parse_bufread(reader);
    parser
        .for_each_triple(|t| {
            let (Some(subject), Some(Node::Iri(predicate)), Some(object)) = (
                node_from_term(t.s()),
                node_from_term(t.p()),
                node_from_term(t.o()),
            ) else {
                return;
            };
            out.push(Statement {
                subject,
                predicate,
                object,
                graph: None,
            });
        })
        .map_err(|e| e.to_string())?;
    Ok(out)
}

/// Parse an N-Quads document. The error is the parser's message.
pub fn parse_nquads(bytes: &[u8]) -> std::result::Result<Vec<Statement>, String> {
    let reader = BufReader::new(Cursor::new(bytes));
    let mut out: Vec<Statement> = Vec::new();
    let mut parser = sophia::turtle::parser::nq::parse_bufread(reader);
    parser
        .for_each_quad(|q| {
            let (Some(subject), Some(Node::Iri(predicate)), Some(object)) = (
                node_from_term(q.s()),
                node_from_term(q.p()),
                node_from_term(q.o()),
            ) else {
                return;
            };
            out.push(Statement {
                subject,
                predicate,
                object,
                graph: q.g().and_then(node_from_term),
            });
        })
        .map_err(|e| e.to_string())?;
    Ok(out)
}

/// Per-type counts of `(?, type, T)` statements, in vocabulary order.
///
/// Every matching statement counts once, so a subject declaring two relevant
/// types contributes two.
pub fn type_tally(statements: &[Statement], vocab: &Vocabulary) -> Vec<u64> {
    let mut tally = vec![0u64; vocab.relevant_types().len()];
    for stmt in statements {
        if stmt.predicate != vocab.type_predicate() {
            continue;
        }
        let Some(object) = stmt.object.as_iri() else {
            continue;
        };
        if let Some(slot) = vocab.relevant_types().iter().position(|t| t == object) {
            tally[slot] += 1;
        }
    }
    tally
}

/// One page of a catalog traversal.
#[derive(Debug, Clone)]
pub struct CatalogPage {
    pub offset: u64,
    pub limit: u64,
    pub statements: Vec<Statement>,
}

impl CatalogPage {
    pub fn relevant_count(&self, vocab: &Vocabulary) -> u64 {
        type_tally(&self.statements, vocab).iter().sum()
    }

    /// Number of next-page statements. Only presence matters for paging.
    pub fn next_links(&self, vocab: &Vocabulary) -> usize {
        self.statements
            .iter()
            .filter(|s| s.predicate == vocab.next_predicate())
            .count()
    }

    pub fn has_next(&self, vocab: &Vocabulary) -> bool {
        self.statements
            .iter()
            .any(|s| s.predicate == vocab.next_predicate())
    }
}

/// What a local fixture declares, before it is sent to Twine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixtureSummary {
    pub statements: usize,
    pub graphs: usize,
    pub subjects: usize,
    /// Relevant-type statements, matched exactly as the counter matches them.
    pub relevant: u64,
    pub per_type: Vec<(String, u64)>,
}

impl FixtureSummary {
    pub fn from_nquads(bytes: &[u8], vocab: &Vocabulary) -> Result<Self> {
        let statements = parse_nquads(bytes)
            .map_err(|e| HarnessError::InvalidInput(format!("fixture is not valid N-Quads: {e}")))?;

        let graphs: BTreeSet<&Node> = statements.iter().filter_map(|s| s.graph.as_ref()).collect();
        let subjects: BTreeSet<&Node> = statements.iter().map(|s| &s.subject).collect();
        let tally = type_tally(&statements, vocab);

        Ok(Self {
            statements: statements.len(),
            graphs: graphs.len(),
            subjects: subjects.len(),
            relevant: tally.iter().sum(),
            per_type: vocab
                .relevant_types()
                .iter()
                .cloned()
                .zip(tally)
                .collect(),
        })
    }
}

pub fn inspect_fixture(bytes: &[u8], vocab: &Vocabulary) -> Result<FixtureSummary> {
    FixtureSummary::from_nquads(bytes, vocab)
}
