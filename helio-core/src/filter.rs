//! Filter expressions for collection queries and subscriptions

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Filter operator for field comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    /// Equal to
    Eq,
    /// Not equal to
    Ne,
    /// Field value is one of a list of values
    In,
    /// String field contains substring, or array field contains value
    Contains,
}

/// A single field comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterExpr {
    /// Field to filter on (top-level document field)
    pub field: String,
    /// Operator to apply
    pub operator: FilterOperator,
    /// Value to compare against
    pub value: Value,
}

impl FilterExpr {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Create an equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::Eq, value.into())
    }

    /// Create an inequality filter.
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::Ne, value.into())
    }

    /// Create a contains filter.
    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::Contains, value.into())
    }

    /// Create a membership filter.
    pub fn one_of(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(field, FilterOperator::In, Value::Array(values))
    }

    /// Evaluate against a JSON document. Missing fields never match,
    /// except under `Ne`.
    pub fn matches(&self, document: &Value) -> bool {
        let field = document.get(&self.field);
        match self.operator {
            FilterOperator::Eq => field == Some(&self.value),
            FilterOperator::Ne => field != Some(&self.value),
            FilterOperator::In => match (&self.value, field) {
                (Value::Array(options), Some(v)) => options.contains(v),
                _ => false,
            },
            FilterOperator::Contains => match (field, &self.value) {
                (Some(Value::String(haystack)), Value::String(needle)) => {
                    haystack.contains(needle.as_str())
                }
                (Some(Value::Array(items)), needle) => items.contains(needle),
                _ => false,
            },
        }
    }
}

/// Conjunction of field comparisons. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub clauses: Vec<FilterExpr>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn where_eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and(FilterExpr::eq(field, value))
    }

    pub fn and(mut self, clause: FilterExpr) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn matches(&self, document: &Value) -> bool {
        self.clauses.iter().all(|clause| clause.matches(document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_eq_and_conjunction() {
        let doc = json!({"projectId": "p1", "type": "permit"});
        assert!(Filter::where_eq("projectId", "p1").matches(&doc));
        assert!(Filter::where_eq("projectId", "p1")
            .and(FilterExpr::eq("type", "permit"))
            .matches(&doc));
        assert!(!Filter::where_eq("projectId", "p1")
            .and(FilterExpr::eq("type", "contract"))
            .matches(&doc));
    }

    #[test]
    fn test_missing_field_only_matches_ne() {
        let doc = json!({"a": 1});
        assert!(!FilterExpr::eq("b", 1).matches(&doc));
        assert!(FilterExpr::ne("b", 1).matches(&doc));
        assert!(!FilterExpr::one_of("b", vec![json!(1)]).matches(&doc));
    }

    #[test]
    fn test_contains_on_strings_and_arrays() {
        let doc = json!({"email": "ana@example.com", "tags": ["solar", "roof"]});
        assert!(FilterExpr::contains("email", "@example").matches(&doc));
        assert!(FilterExpr::contains("tags", "roof").matches(&doc));
        assert!(!FilterExpr::contains("tags", "ground").matches(&doc));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(Filter::all().matches(&json!({})));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// **Property: eq and ne are complements**
            ///
            /// For any document and value, exactly one of `eq` and `ne` on the
            /// same field matches.
            #[test]
            fn prop_eq_ne_complement(
                fields in prop::collection::btree_map("[a-c]", 0i64..4, 0..3),
                key in "[a-c]",
                value in 0i64..4,
            ) {
                let doc = serde_json::to_value(&fields).unwrap();
                let eq = FilterExpr::eq(key.clone(), value).matches(&doc);
                let ne = FilterExpr::ne(key, value).matches(&doc);
                prop_assert!(eq != ne);
            }

            /// **Property: a conjunction matches iff every clause matches**
            #[test]
            fn prop_conjunction_is_all(
                fields in prop::collection::btree_map("[a-c]", 0i64..3, 0..3),
                clauses in prop::collection::vec(("[a-c]", 0i64..3), 0..4),
            ) {
                let doc = serde_json::to_value(&fields).unwrap();
                let exprs: Vec<FilterExpr> = clauses
                    .iter()
                    .map(|(k, v)| FilterExpr::eq(k.clone(), *v))
                    .collect();
                let expected = exprs.iter().all(|e| e.matches(&doc));
                let filter = exprs.into_iter().fold(Filter::all(), Filter::and);
                prop_assert_eq!(filter.matches(&doc), expected);
            }
        }
    }
}
