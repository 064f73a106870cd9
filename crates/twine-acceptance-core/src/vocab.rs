//! Fixed vocabulary used when classifying catalog statements.

pub const RDF_TYPE_IRI: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// Predicate whose presence on a page means another page follows.
pub const XHTML_NEXT_IRI: &str = "http://www.w3.org/1999/xhtml/vocab#next";

pub const FRBR_WORK_IRI: &str = "http://purl.org/vocab/frbr/core#Work";
pub const FOAF_PERSON_IRI: &str = "http://xmlns.com/foaf/0.1/Person";
pub const WORK_PLAY_IRI: &str = "http://shakespeare.acropolis.org.uk/ontologies/work#Play";
pub const WORK_SONNET_IRI: &str = "http://shakespeare.acropolis.org.uk/ontologies/work#Sonnet";
pub const WORK_POEM_IRI: &str = "http://shakespeare.acropolis.org.uk/ontologies/work#Poem";

pub const RELEVANT_TYPE_IRIS: [&str; 5] = [
    FRBR_WORK_IRI,
    FOAF_PERSON_IRI,
    WORK_PLAY_IRI,
    WORK_SONNET_IRI,
    WORK_POEM_IRI,
];

/// Immutable classification vocabulary handed to the counter.
///
/// The relevant type set is closed: it is never extended from what a catalog
/// happens to contain. Order is preserved so per-type breakdowns are stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    relevant_types: Vec<String>,
    type_predicate: String,
    next_predicate: String,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::with_types(RELEVANT_TYPE_IRIS)
    }
}

impl Vocabulary {
    /// Same predicates as the default, different relevant types.
    pub fn with_types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut relevant_types: Vec<String> = Vec::new();
        for ty in types {
            let ty = ty.into();
            if !relevant_types.contains(&ty) {
                relevant_types.push(ty);
            }
        }
        Self {
            relevant_types,
            type_predicate: RDF_TYPE_IRI.to_string(),
            next_predicate: XHTML_NEXT_IRI.to_string(),
        }
    }

    pub fn with_next_predicate(mut self, iri: impl Into<String>) -> Self {
        self.next_predicate = iri.into();
        self
    }

    pub fn relevant_types(&self) -> &[String] {
        &self.relevant_types
    }

    pub fn type_predicate(&self) -> &str {
        &self.type_predicate
    }

    pub fn next_predicate(&self) -> &str {
        &self.next_predicate
    }

    pub fn is_relevant(&self, type_iri: &str) -> bool {
        self.relevant_types.iter().any(|t| t == type_iri)
    }
}
