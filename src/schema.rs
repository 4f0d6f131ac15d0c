use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::Values;

/// Describes the fields a table accepts: a mapping from field name to the
/// maximum allowed value length in bytes.
///
/// A schema is supplied when the table is created and never altered
/// afterwards. Records may omit schema fields but must not carry fields the
/// schema does not declare.
///
/// ```
/// use tabledb::Schema;
///
/// let mut schema = Schema::new();
/// schema.field("name", 64).field("city", 32);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    fields: BTreeMap<String, usize>,
}

#[derive(Error, Debug)]
pub(crate) enum SchemaViolation {
    #[error("{field} is not a schema field")]
    UnknownField { field: String },
    #[error("{field} has a value of length {len} exceeding the allowed maximum {max}")]
    ValueTooLong {
        field: String,
        len: usize,
        max: usize,
    },
}

impl Schema {
    /// Creates an empty schema.
    #[inline]
    pub fn new() -> Self {
        Default::default()
    }

    /// Declares a field with the given maximum value length.
    ///
    /// Re-declaring a field replaces its maximum.
    #[inline]
    pub fn field(&mut self, name: impl Into<String>, max_len: usize) -> &mut Self {
        self.fields.insert(name.into(), max_len);
        self
    }

    /// Checks a candidate record against the schema.
    ///
    /// Either the whole record is acceptable or the first offending field is
    /// reported; nothing is committed by this call.
    pub(crate) fn validate(&self, values: &Values) -> Result<(), SchemaViolation> {
        for (field, value) in values {
            let Some(&max) = self.fields.get(field) else {
                return Err(SchemaViolation::UnknownField {
                    field: field.clone(),
                });
            };
            if value.len() > max {
                return Err(SchemaViolation::ValueTooLong {
                    field: field.clone(),
                    len: value.len(),
                    max,
                });
            }
        }
        Ok(())
    }

    /// The declared fields in name order.
    #[inline]
    pub(crate) fn fields(&self) -> impl Iterator<Item = (&str, usize)> {
        self.fields.iter().map(|(name, &max)| (name.as_str(), max))
    }
}

#[cfg(test)]
mod tests {
    use super::{Schema, SchemaViolation};
    use crate::record::Values;

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema.field("name", 8).field("city", 4);
        schema
    }

    #[test]
    fn test_accepts_subset_of_fields() {
        let values = Values::from([("name".into(), "alice".into())]);
        assert!(schema().validate(&values).is_ok());
        assert!(schema().validate(&Values::new()).is_ok());
    }

    #[test]
    fn test_rejects_unknown_field() {
        let values = Values::from([("age".into(), "30".into())]);
        assert!(matches!(
            schema().validate(&values),
            Err(SchemaViolation::UnknownField { field }) if field == "age"
        ));
    }

    #[test]
    fn test_rejects_over_long_value() {
        let values = Values::from([("city".into(), "gotham".into())]);
        assert!(matches!(
            schema().validate(&values),
            Err(SchemaViolation::ValueTooLong { len: 6, max: 4, .. })
        ));
    }
}
