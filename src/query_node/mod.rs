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

mod bool_node;
mod terms_node;

pub use bool_node::BoolNode;
use serde_json::{Map, Value as JsonValue};
pub(crate) use terms_node::MergeKey;
pub use terms_node::TermsNode;

/// Tree representation of a query document, with one variant per query shape
/// the optimizer understands.
///
/// Everything else stays a `Generic` node and is rendered back verbatim. A
/// `bool` query carrying a truthy `_name` is also kept `Generic`: its matched
/// queries are reported under that name, so decomposing it would change the
/// response.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    Generic(JsonValue),
    Bool(BoolNode),
    Terms(TermsNode),
}

impl QueryNode {
    /// Builds a node tree from a query document.
    ///
    /// Parsing never fails: malformed `bool` or `terms` bodies degrade to a
    /// `Generic` node that renders the document unchanged.
    pub fn parse(query: JsonValue) -> QueryNode {
        match query {
            JsonValue::Null => QueryNode::Generic(JsonValue::Object(Map::new())),
            JsonValue::Object(obj) => Self::parse_object(obj),
            other => QueryNode::Generic(other),
        }
    }

    fn parse_object(mut obj: Map<String, JsonValue>) -> QueryNode {
        if let Some(bool_value) = obj.remove("bool") {
            return match bool_value {
                JsonValue::Object(body) if !is_named(&body) => {
                    QueryNode::Bool(BoolNode::from_body(body))
                }
                named_or_malformed => {
                    obj.insert("bool".to_string(), named_or_malformed);
                    QueryNode::Generic(JsonValue::Object(obj))
                }
            };
        }
        if let Some(terms_value) = obj.remove("terms") {
            return match terms_value {
                JsonValue::Object(body) => QueryNode::Terms(TermsNode::new(body)),
                malformed => {
                    obj.insert("terms".to_string(), malformed);
                    QueryNode::Generic(JsonValue::Object(obj))
                }
            };
        }
        QueryNode::Generic(JsonValue::Object(obj))
    }

    /// Renders the node back into a query document.
    ///
    /// Rendering a freshly parsed tree reproduces the input document, except
    /// that a clause given as a bare object is rendered as a one-element
    /// array.
    pub fn render(&self) -> JsonValue {
        match self {
            QueryNode::Generic(fragment) => fragment.clone(),
            QueryNode::Bool(bool_node) => bool_node.render(),
            QueryNode::Terms(terms_node) => terms_node.render(),
        }
    }
}

fn is_named(bool_body: &Map<String, JsonValue>) -> bool {
    bool_body.get("_name").is_some_and(is_truthy)
}

// `_name: ""` and `_name: null` count as unset, like in the clients that
// emit the field.
fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(bool_val) => *bool_val,
        JsonValue::Number(num) => num.as_f64().is_some_and(|num_val| num_val != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(arr) => !arr.is_empty(),
        JsonValue::Object(obj) => !obj.is_empty(),
    }
}

pub(crate) fn parse_clause_list(clauses: Option<JsonValue>) -> Vec<QueryNode> {
    match clauses {
        None => Vec::new(),
        Some(JsonValue::Array(items)) => items.into_iter().map(QueryNode::parse).collect(),
        // a single clause may be given as a bare value instead of a
        // one-element array
        Some(single_clause) => vec![QueryNode::parse(single_clause)],
    }
}
