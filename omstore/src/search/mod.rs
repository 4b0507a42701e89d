// Fluent query builder compiling to the search backend's query syntax

mod circle;
mod clause;
mod predicate;

pub use circle::{Circle, DistanceUnit};
pub use clause::Where;
pub use predicate::{escape_tag, escape_text, Bound, Leaf, NumericRange, Predicate, TextMatch, MATCH_ALL};

use crate::error::{OmError, Result};
use crate::index;
use crate::schema::Schema;

/// How a new predicate joins the tree built so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Combinator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// Sort key of a search, by storage alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortBy {
    pub field: String,
    pub order: SortOrder,
}

/// A compiled search as handed to the transport
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub index_name: String,
    pub query: String,
    pub offset: usize,
    pub limit: usize,
    pub sort_by: Option<SortBy>,
}

/// Builds a predicate tree against a schema.
///
/// Predicates combine strictly left to right: each `and`/`or` wraps the whole
/// tree built so far, so `a or b and c` means `(a or b) and c`. Use the
/// `*_group` methods to nest a sub-search instead.
///
/// ```ignore
/// let query = Search::new(&schema)
///     .r#where("year")?.gte(1990)?
///     .and("genres")?.contains("metal")?
///     .or_group(|s| s.r#where("artist")?.eq("Mushroomhead"))?
///     .compile();
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct Search<'a> {
    schema: &'a Schema,
    root: Option<Predicate>,
    sort_by: Option<SortBy>,
}

impl<'a> Search<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Search {
            schema,
            root: None,
            sort_by: None,
        }
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    pub fn root(&self) -> Option<&Predicate> {
        self.root.as_ref()
    }

    pub fn sort(&self) -> Option<&SortBy> {
        self.sort_by.as_ref()
    }

    /// Start a comparison on `field`, joined with AND.
    pub fn r#where(self, field: &str) -> Result<Where<'a>> {
        self.clause(field, Combinator::And)
    }

    /// Start a comparison on `field`, joined with AND.
    pub fn and(self, field: &str) -> Result<Where<'a>> {
        self.clause(field, Combinator::And)
    }

    /// Start a comparison on `field`, joined with OR.
    pub fn or(self, field: &str) -> Result<Where<'a>> {
        self.clause(field, Combinator::Or)
    }

    /// Build a nested search and join it with AND.
    pub fn where_group<F>(self, build: F) -> Result<Self>
    where
        F: FnOnce(Search<'a>) -> Result<Search<'a>>,
    {
        self.group(Combinator::And, build)
    }

    /// Build a nested search and join it with AND.
    pub fn and_group<F>(self, build: F) -> Result<Self>
    where
        F: FnOnce(Search<'a>) -> Result<Search<'a>>,
    {
        self.group(Combinator::And, build)
    }

    /// Build a nested search and join it with OR.
    pub fn or_group<F>(self, build: F) -> Result<Self>
    where
        F: FnOnce(Search<'a>) -> Result<Search<'a>>,
    {
        self.group(Combinator::Or, build)
    }

    pub fn sort_by(mut self, field: &str, order: SortOrder) -> Result<Self> {
        let definition = self.schema.resolve(field)?;
        if !index::is_searchable(definition) || !definition.field_type().supports_sorting() {
            return Err(OmError::InvalidOperation {
                field: field.to_string(),
                field_type: definition.field_type().to_string(),
                operation: "sort_by".into(),
            });
        }
        if !definition.is_sortable() {
            log::warn!(
                "Sorting '{}' by '{field}', which is not marked sortable in the schema",
                self.schema.entity_name()
            );
        }
        self.sort_by = Some(SortBy {
            field: definition.storage_name(field).to_string(),
            order,
        });
        Ok(self)
    }

    pub fn sort_ascending(self, field: &str) -> Result<Self> {
        self.sort_by(field, SortOrder::Ascending)
    }

    pub fn sort_descending(self, field: &str) -> Result<Self> {
        self.sort_by(field, SortOrder::Descending)
    }

    /// Render the query string; an empty search matches everything.
    pub fn compile(&self) -> String {
        let query = match &self.root {
            Some(root) => root.render(),
            None => MATCH_ALL.to_string(),
        };
        log::debug!("Compiled search on '{}': {query}", self.schema.index_name());
        query
    }

    /// Request for one page of results.
    pub fn request(&self, offset: usize, limit: usize) -> SearchRequest {
        SearchRequest {
            index_name: self.schema.index_name().to_string(),
            query: self.compile(),
            offset,
            limit,
            sort_by: self.sort_by.clone(),
        }
    }

    fn clause(self, field: &str, combinator: Combinator) -> Result<Where<'a>> {
        let definition = self.schema.resolve(field)?;
        if !index::is_searchable(definition) {
            return Err(OmError::UnsupportedFieldType {
                field: field.to_string(),
                field_type: definition.field_type().to_string(),
            });
        }
        Ok(Where::new(self, field, definition, combinator))
    }

    fn group<F>(self, combinator: Combinator, build: F) -> Result<Self>
    where
        F: FnOnce(Search<'a>) -> Result<Search<'a>>,
    {
        let nested = build(Search::new(self.schema))?;
        let node = nested.root.ok_or(OmError::EmptySubSearch)?;
        Ok(self.attach(combinator, node))
    }

    /// Join `node` onto the tree: it becomes the root if there is none,
    /// otherwise the right child of a new root.
    pub(crate) fn attach(mut self, combinator: Combinator, node: Predicate) -> Self {
        self.root = Some(match self.root.take() {
            None => node,
            Some(root) => match combinator {
                Combinator::And => root.and(node),
                Combinator::Or => root.or(node),
            },
        });
        self
    }
}
