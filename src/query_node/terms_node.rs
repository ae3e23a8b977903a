// Copyright 2021-Present Datadog, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde_json::{Map, Value as JsonValue};
use tracing::warn;

use crate::json_hash::canonical_hash;
use crate::query_node::QueryNode;

/// A `terms` leaf query.
///
/// The body holds the queried field plus auxiliary parameters (`boost`,
/// `_name`, ...). Two terms clauses on the same field with structurally equal
/// auxiliary parameters can be merged into one clause with concatenated
/// values; the merge key captures exactly that.
#[derive(Debug, Clone, PartialEq)]
pub struct TermsNode {
    body: Map<String, JsonValue>,
    field: Option<String>,
    boost: Option<JsonValue>,
    parameters_hash: Option<u64>,
}

/// Groups terms clauses that are safe to merge. The field is kept alongside
/// the parameter hash so a hash collision cannot merge clauses on different
/// fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct MergeKey {
    field: String,
    parameters_hash: u64,
}

impl TermsNode {
    pub(crate) fn new(body: Map<String, JsonValue>) -> TermsNode {
        let boost = body.get("boost").cloned();
        let field_keys: Vec<&String> = body
            .keys()
            .filter(|key| key.as_str() != "boost" && !key.starts_with('_'))
            .collect();
        if field_keys.len() != 1 {
            warn!(body = ?body, "cannot identify the field of a terms query");
            return TermsNode {
                body,
                field: None,
                boost,
                parameters_hash: None,
            };
        }
        let field = field_keys[0].clone();
        match body.get(&field) {
            // terms lookup by document reference, never merged
            Some(JsonValue::Object(_)) => TermsNode {
                body,
                field: None,
                boost,
                parameters_hash: None,
            },
            Some(JsonValue::Array(_)) => {
                let mut parameters = body.clone();
                parameters.remove(&field);
                let parameters_hash = canonical_hash(&JsonValue::Object(parameters));
                TermsNode {
                    body,
                    field: Some(field),
                    boost,
                    parameters_hash: Some(parameters_hash),
                }
            }
            // a bare scalar value renders fine but has nothing to concatenate
            _ => TermsNode {
                body,
                field: Some(field),
                boost,
                parameters_hash: None,
            },
        }
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn boost(&self) -> Option<&JsonValue> {
        self.boost.as_ref()
    }

    pub fn is_mergeable(&self) -> bool {
        self.parameters_hash.is_some()
    }

    pub(crate) fn merge_key(&self) -> Option<MergeKey> {
        let field = self.field.clone()?;
        let parameters_hash = self.parameters_hash?;
        Some(MergeKey {
            field,
            parameters_hash,
        })
    }

    /// Decomposes a mergeable node into its field, values array and remaining
    /// parameters. `None` for non-mergeable nodes.
    pub(crate) fn into_merge_parts(
        mut self,
    ) -> Option<(String, Vec<JsonValue>, Map<String, JsonValue>)> {
        self.parameters_hash?;
        let field = self.field?;
        match self.body.remove(&field) {
            Some(JsonValue::Array(values)) => Some((field, values, self.body)),
            _ => None,
        }
    }

    pub(crate) fn render(&self) -> JsonValue {
        let mut query = Map::new();
        query.insert("terms".to_string(), JsonValue::Object(self.body.clone()));
        JsonValue::Object(query)
    }
}

impl From<TermsNode> for QueryNode {
    fn from(terms_node: TermsNode) -> QueryNode {
        QueryNode::Terms(terms_node)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::TermsNode;

    fn terms_node(body: serde_json::Value) -> TermsNode {
        let serde_json::Value::Object(body) = body else {
            panic!("terms body fixtures must be objects");
        };
        TermsNode::new(body)
    }

    #[test]
    fn test_terms_simple() {
        let node = terms_node(json!({"user.id": ["hello", "happy"]}));
        assert_eq!(node.field(), Some("user.id"));
        assert!(node.is_mergeable());
        assert_eq!(
            node.render(),
            json!({"terms": {"user.id": ["hello", "happy"]}})
        );
    }

    #[test]
    fn test_terms_boost_is_not_a_field() {
        let node = terms_node(json!({"user.id": ["hello"], "boost": 2}));
        assert_eq!(node.field(), Some("user.id"));
        assert_eq!(node.boost(), Some(&json!(2)));
        assert!(node.is_mergeable());
    }

    #[test]
    fn test_terms_ambiguous_field_degrades() {
        let node = terms_node(json!({"field_a": ["x"], "field_b": ["y"]}));
        assert_eq!(node.field(), None);
        assert!(!node.is_mergeable());
        assert_eq!(
            node.render(),
            json!({"terms": {"field_a": ["x"], "field_b": ["y"]}})
        );
    }

    #[test]
    fn test_terms_no_field_degrades() {
        let node = terms_node(json!({"_name": "only_meta"}));
        assert_eq!(node.field(), None);
        assert!(!node.is_mergeable());
    }

    #[test]
    fn test_terms_lookup_is_not_mergeable() {
        let node = terms_node(json!({"_id": {"index": "a", "type": "b", "id": 1}}));
        assert_eq!(node.field(), None);
        assert!(!node.is_mergeable());
        assert_eq!(
            node.render(),
            json!({"terms": {"_id": {"index": "a", "type": "b", "id": 1}}})
        );
    }

    #[test]
    fn test_terms_scalar_value_is_not_mergeable() {
        let node = terms_node(json!({"field": "single-value"}));
        assert_eq!(node.field(), Some("field"));
        assert!(!node.is_mergeable());
        assert_eq!(node.render(), json!({"terms": {"field": "single-value"}}));
    }

    #[test]
    fn test_merge_key_depends_on_parameters() {
        let plain = terms_node(json!({"field": ["A"]}));
        let same_field = terms_node(json!({"field": ["B"]}));
        let named = terms_node(json!({"field": ["A"], "_name": "field_a"}));
        let boosted = terms_node(json!({"field": ["A"], "boost": 2}));
        let other_field = terms_node(json!({"other": ["A"]}));

        assert_eq!(plain.merge_key(), same_field.merge_key());
        assert_ne!(plain.merge_key(), named.merge_key());
        assert_ne!(plain.merge_key(), boosted.merge_key());
        assert_ne!(plain.merge_key(), other_field.merge_key());
    }

    #[test]
    fn test_merge_key_shared_parameters() {
        let left = terms_node(json!({"field": ["A"], "_name": "n", "boost": 1.5}));
        let right = terms_node(json!({"field": ["B", "C"], "_name": "n", "boost": 1.5}));
        assert_eq!(left.merge_key(), right.merge_key());
    }

    #[test]
    fn test_into_merge_parts() {
        let node = terms_node(json!({"field": ["A", "B"], "_name": "n"}));
        let (field, values, parameters) = node.into_merge_parts().unwrap();
        assert_eq!(field, "field");
        assert_eq!(values, vec![json!("A"), json!("B")]);
        assert_eq!(serde_json::Value::Object(parameters), json!({"_name": "n"}));
    }
}
