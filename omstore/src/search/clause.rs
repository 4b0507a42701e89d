use super::circle::Circle;
use super::predicate::{Leaf, NumericRange, Predicate, TextMatch};
use super::{Combinator, Search};
use crate::entity::{coerce, EntityValue};
use crate::error::{OmError, Result};
use crate::schema::{FieldDefinition, FieldType};

/// Leaf builder returned by `where`, `and` and `or`.
///
/// Owns the search being built; every comparison consumes the clause and
/// hands the search back with the finished leaf attached. Which comparisons
/// are available depends on the field type:
///
/// | type | comparisons |
/// |---|---|
/// | number | `eq` `gt` `gte` `lt` `lte` `between` |
/// | date | the number comparisons, plus `on` `after` `before` `on_or_after` `on_or_before` |
/// | boolean | `eq` `is_true` `is_false` |
/// | string | `eq` `prefix` `one_of` |
/// | text | `matches` `match_exact` |
/// | string-array | `contains` `contains_one_of` |
/// | point | `in_radius` |
#[must_use = "a clause does nothing until a comparison is applied"]
pub struct Where<'a> {
    search: Search<'a>,
    field: String,
    definition: &'a FieldDefinition,
    combinator: Combinator,
    negated: bool,
}

impl<'a> Where<'a> {
    pub(super) fn new(
        search: Search<'a>,
        field: &str,
        definition: &'a FieldDefinition,
        combinator: Combinator,
    ) -> Self {
        Where {
            search,
            field: field.to_string(),
            definition,
            combinator,
            negated: false,
        }
    }

    /// Negate the comparison that follows.
    pub fn not(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    pub fn eq(self, value: impl Into<EntityValue>) -> Result<Search<'a>> {
        let value = value.into();
        let leaf = match self.definition.field_type() {
            FieldType::Number | FieldType::Date => Leaf::Numeric {
                field: self.alias(),
                range: NumericRange::exactly(self.numeric_operand(value)?),
            },
            FieldType::Boolean => {
                let EntityValue::Boolean(value) = self.operand(value)? else {
                    return Err(self.invalid("eq"));
                };
                Leaf::Boolean {
                    field: self.alias(),
                    value,
                    encoding: self.search.schema().data_structure(),
                }
            }
            FieldType::String => Leaf::Tag {
                field: self.alias(),
                values: vec![self.string_operand(value)?],
                prefix: false,
            },
            FieldType::Text | FieldType::StringArray | FieldType::Point | FieldType::OpaqueObject => {
                return Err(self.invalid("eq"))
            }
        };
        Ok(self.finish(leaf))
    }

    pub fn gt(self, value: impl Into<EntityValue>) -> Result<Search<'a>> {
        self.range("gt", value.into(), NumericRange::greater_than)
    }

    pub fn gte(self, value: impl Into<EntityValue>) -> Result<Search<'a>> {
        self.range("gte", value.into(), NumericRange::at_least)
    }

    pub fn lt(self, value: impl Into<EntityValue>) -> Result<Search<'a>> {
        self.range("lt", value.into(), NumericRange::less_than)
    }

    pub fn lte(self, value: impl Into<EntityValue>) -> Result<Search<'a>> {
        self.range("lte", value.into(), NumericRange::at_most)
    }

    pub fn between(
        self,
        lower: impl Into<EntityValue>,
        upper: impl Into<EntityValue>,
    ) -> Result<Search<'a>> {
        self.require_numeric("between")?;
        let lower = self.numeric_operand(lower.into())?;
        let upper = self.numeric_operand(upper.into())?;
        let leaf = Leaf::Numeric {
            field: self.alias(),
            range: NumericRange::between(lower, upper),
        };
        Ok(self.finish(leaf))
    }

    pub fn on(self, date: impl Into<EntityValue>) -> Result<Search<'a>> {
        self.require_date("on")?;
        self.eq(date)
    }

    pub fn after(self, date: impl Into<EntityValue>) -> Result<Search<'a>> {
        self.require_date("after")?;
        self.gt(date)
    }

    pub fn on_or_after(self, date: impl Into<EntityValue>) -> Result<Search<'a>> {
        self.require_date("on_or_after")?;
        self.gte(date)
    }

    pub fn before(self, date: impl Into<EntityValue>) -> Result<Search<'a>> {
        self.require_date("before")?;
        self.lt(date)
    }

    pub fn on_or_before(self, date: impl Into<EntityValue>) -> Result<Search<'a>> {
        self.require_date("on_or_before")?;
        self.lte(date)
    }

    pub fn is_true(self) -> Result<Search<'a>> {
        self.require(FieldType::Boolean, "is_true")?;
        self.eq(true)
    }

    pub fn is_false(self) -> Result<Search<'a>> {
        self.require(FieldType::Boolean, "is_false")?;
        self.eq(false)
    }

    /// Tag values starting with `prefix`.
    pub fn prefix(self, prefix: impl Into<EntityValue>) -> Result<Search<'a>> {
        self.require(FieldType::String, "prefix")?;
        let leaf = Leaf::Tag {
            field: self.alias(),
            values: vec![self.string_operand(prefix.into())?],
            prefix: true,
        };
        Ok(self.finish(leaf))
    }

    /// Tag equal to any of `values`.
    pub fn one_of<I, S>(self, values: I) -> Result<Search<'a>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.require(FieldType::String, "one_of")?;
        self.tags(values)
    }

    /// Full-text match of all words in `text`.
    pub fn matches(self, text: &str) -> Result<Search<'a>> {
        self.text("matches", text, TextMatch::Words)
    }

    /// Full-text match of `text` as an exact phrase.
    pub fn match_exact(self, text: &str) -> Result<Search<'a>> {
        self.text("match_exact", text, TextMatch::Phrase)
    }

    /// Array holding `value`.
    pub fn contains(self, value: &str) -> Result<Search<'a>> {
        self.require(FieldType::StringArray, "contains")?;
        self.tags([value])
    }

    /// Array holding at least one of `values`.
    pub fn contains_one_of<I, S>(self, values: I) -> Result<Search<'a>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.require(FieldType::StringArray, "contains_one_of")?;
        self.tags(values)
    }

    /// Point within `circle`.
    pub fn in_radius(self, circle: Circle) -> Result<Search<'a>> {
        self.require(FieldType::Point, "in_radius")?;
        if !circle.is_valid() {
            return Err(OmError::TypeMismatch {
                field: self.field.clone(),
                field_type: self.definition.field_type().to_string(),
                value: format!("circle {circle}"),
            });
        }
        let leaf = Leaf::Geo {
            field: self.alias(),
            circle,
        };
        Ok(self.finish(leaf))
    }

    fn range(
        self,
        operation: &str,
        value: EntityValue,
        make: fn(f64) -> NumericRange,
    ) -> Result<Search<'a>> {
        self.require_numeric(operation)?;
        let bound = self.numeric_operand(value)?;
        let leaf = Leaf::Numeric {
            field: self.alias(),
            range: make(bound),
        };
        Ok(self.finish(leaf))
    }

    fn text(self, operation: &str, text: &str, mode: TextMatch) -> Result<Search<'a>> {
        self.require(FieldType::Text, operation)?;
        if text.trim().is_empty() {
            return Err(self.mismatch(&EntityValue::String(text.to_string())));
        }
        let leaf = Leaf::Text {
            field: self.alias(),
            text: text.to_string(),
            mode,
        };
        Ok(self.finish(leaf))
    }

    fn tags<I, S>(self, values: I) -> Result<Search<'a>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(OmError::TypeMismatch {
                field: self.field.clone(),
                field_type: self.definition.field_type().to_string(),
                value: "an empty list".into(),
            });
        }
        if let Some(blank) = values.iter().find(|value| value.trim().is_empty()) {
            return Err(self.mismatch(&EntityValue::String(blank.clone())));
        }
        let leaf = Leaf::Tag {
            field: self.alias(),
            values,
            prefix: false,
        };
        Ok(self.finish(leaf))
    }

    /// Coerce a comparison operand exactly like a written value.
    fn operand(&self, value: EntityValue) -> Result<EntityValue> {
        coerce(&self.field, self.definition, value)
    }

    /// Query value of a number or date operand; dates compare as epoch milliseconds.
    fn numeric_operand(&self, value: EntityValue) -> Result<f64> {
        match self.operand(value)? {
            EntityValue::Number(n) => Ok(n),
            EntityValue::Date(date) => Ok(date.timestamp_millis() as f64),
            other => Err(self.mismatch(&other)),
        }
    }

    /// Non-blank tag operand; an empty tag is not valid query syntax.
    fn string_operand(&self, value: EntityValue) -> Result<String> {
        match self.operand(value)? {
            EntityValue::String(s) if !s.trim().is_empty() => Ok(s),
            other => Err(self.mismatch(&other)),
        }
    }

    fn mismatch(&self, value: &EntityValue) -> OmError {
        OmError::TypeMismatch {
            field: self.field.clone(),
            field_type: self.definition.field_type().to_string(),
            value: value.describe(),
        }
    }

    fn require(&self, field_type: FieldType, operation: &str) -> Result<()> {
        if self.definition.field_type() == field_type {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn require_numeric(&self, operation: &str) -> Result<()> {
        match self.definition.field_type() {
            FieldType::Number | FieldType::Date => Ok(()),
            FieldType::String
            | FieldType::Text
            | FieldType::Boolean
            | FieldType::Point
            | FieldType::StringArray
            | FieldType::OpaqueObject => Err(self.invalid(operation)),
        }
    }

    fn require_date(&self, operation: &str) -> Result<()> {
        self.require(FieldType::Date, operation)
    }

    fn invalid(&self, operation: &str) -> OmError {
        OmError::InvalidOperation {
            field: self.field.clone(),
            field_type: self.definition.field_type().to_string(),
            operation: operation.to_string(),
        }
    }

    fn alias(&self) -> String {
        self.definition.storage_name(&self.field).to_string()
    }

    fn finish(self, leaf: Leaf) -> Search<'a> {
        let node = if self.negated {
            Predicate::negated(leaf)
        } else {
            Predicate::leaf(leaf)
        };
        self.search.attach(self.combinator, node)
    }
}
