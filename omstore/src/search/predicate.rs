// Immutable predicate tree and its rendering to query syntax

use super::circle::Circle;
use crate::schema::DataStructure;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Query that matches every document in the index
pub const MATCH_ALL: &str = "*";

/// One end of a numeric range
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Inclusive(f64),
    Exclusive(f64),
    Unbounded,
}

/// Numeric interval, rendered as `[lower upper]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange {
    pub lower: Bound,
    pub upper: Bound,
}

impl NumericRange {
    pub fn exactly(value: f64) -> Self {
        Self::between(value, value)
    }

    pub fn between(lower: f64, upper: f64) -> Self {
        NumericRange {
            lower: Bound::Inclusive(lower),
            upper: Bound::Inclusive(upper),
        }
    }

    pub fn greater_than(value: f64) -> Self {
        NumericRange {
            lower: Bound::Exclusive(value),
            upper: Bound::Unbounded,
        }
    }

    pub fn at_least(value: f64) -> Self {
        NumericRange {
            lower: Bound::Inclusive(value),
            upper: Bound::Unbounded,
        }
    }

    pub fn less_than(value: f64) -> Self {
        NumericRange {
            lower: Bound::Unbounded,
            upper: Bound::Exclusive(value),
        }
    }

    pub fn at_most(value: f64) -> Self {
        NumericRange {
            lower: Bound::Unbounded,
            upper: Bound::Inclusive(value),
        }
    }
}

impl fmt::Display for NumericRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lower = match self.lower {
            Bound::Inclusive(n) => n.to_string(),
            Bound::Exclusive(n) => format!("({n}"),
            Bound::Unbounded => "-inf".to_string(),
        };
        let upper = match self.upper {
            Bound::Inclusive(n) => n.to_string(),
            Bound::Exclusive(n) => format!("({n}"),
            Bound::Unbounded => "+inf".to_string(),
        };
        write!(f, "[{lower} {upper}]")
    }
}

/// How a full-text leaf matches its input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMatch {
    /// All words, stemmed
    Words,
    /// The exact phrase
    Phrase,
}

/// A single-field comparison. Field names are storage aliases.
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    /// Number and date fields (dates as epoch milliseconds)
    Numeric { field: String, range: NumericRange },
    /// Boolean tags; the spelling of the tag depends on the encoding
    Boolean {
        field: String,
        value: bool,
        encoding: DataStructure,
    },
    /// Tag membership: any of `values`, optionally as prefixes
    Tag {
        field: String,
        values: Vec<String>,
        prefix: bool,
    },
    Text {
        field: String,
        text: String,
        mode: TextMatch,
    },
    Geo { field: String, circle: Circle },
}

impl Leaf {
    pub fn field(&self) -> &str {
        match self {
            Leaf::Numeric { field, .. }
            | Leaf::Boolean { field, .. }
            | Leaf::Tag { field, .. }
            | Leaf::Text { field, .. }
            | Leaf::Geo { field, .. } => field,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Leaf::Numeric { field, range } => format!("@{field}:{range}"),
            Leaf::Boolean {
                field,
                value,
                encoding,
            } => {
                let tag = match (encoding, value) {
                    (DataStructure::Hash, true) => "1",
                    (DataStructure::Hash, false) => "0",
                    (DataStructure::Json, true) => "true",
                    (DataStructure::Json, false) => "false",
                };
                format!("@{field}:{{{tag}}}")
            }
            Leaf::Tag {
                field,
                values,
                prefix,
            } => {
                let suffix = if *prefix { "*" } else { "" };
                let tags: Vec<String> = values
                    .iter()
                    .map(|value| format!("{}{suffix}", escape_tag(value)))
                    .collect();
                format!("@{field}:{{{}}}", tags.join(" | "))
            }
            Leaf::Text { field, text, mode } => match mode {
                TextMatch::Words => format!("@{field}:({})", escape_text(text)),
                TextMatch::Phrase => format!("@{field}:\"{}\"", escape_text(text)),
            },
            Leaf::Geo { field, circle } => format!("@{field}:{circle}"),
        }
    }
}

/// A node of the boolean predicate tree.
///
/// Nodes never change after construction; combining produces a new node
/// that owns both operands.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Leaf { leaf: Leaf, negated: bool },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    pub fn leaf(leaf: Leaf) -> Self {
        Predicate::Leaf {
            leaf,
            negated: false,
        }
    }

    pub fn negated(leaf: Leaf) -> Self {
        Predicate::Leaf {
            leaf,
            negated: true,
        }
    }

    pub fn and(self, right: Predicate) -> Self {
        Predicate::And(Box::new(self), Box::new(right))
    }

    pub fn or(self, right: Predicate) -> Self {
        Predicate::Or(Box::new(self), Box::new(right))
    }

    /// Render to query syntax. Combinators are always parenthesized so the
    /// tree shape survives the backend's own precedence rules.
    pub fn render(&self) -> String {
        match self {
            Predicate::Leaf { leaf, negated } => {
                if *negated {
                    format!("-{}", leaf.render())
                } else {
                    leaf.render()
                }
            }
            Predicate::And(left, right) => format!("({} {})", left.render(), right.render()),
            Predicate::Or(left, right) => format!("({} | {})", left.render(), right.render()),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn tag_escape_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"[,.?<>{}\[\]"':;!@#$%^&*()\-+=~|/\\ ]"#).expect("tag escape pattern is valid")
    })
}

fn text_escape_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"[,.?<>{}\[\]"':;!@#$%^&*()\-+=~|/\\]"#).expect("text escape pattern is valid")
    })
}

/// Escape punctuation and spaces inside a tag value.
pub fn escape_tag(value: &str) -> String {
    tag_escape_pattern().replace_all(value, r"\$0").into_owned()
}

/// Escape punctuation inside full-text input; spaces still separate words.
pub fn escape_text(value: &str) -> String {
    text_escape_pattern().replace_all(value, r"\$0").into_owned()
}
