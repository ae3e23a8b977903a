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

use crate::query_node::{QueryNode, parse_clause_list};

/// A `bool` composite query: four ordered clause lists.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct BoolNode {
    pub filter: Vec<QueryNode>,
    pub must: Vec<QueryNode>,
    pub must_not: Vec<QueryNode>,
    pub should: Vec<QueryNode>,
}

impl BoolNode {
    pub(crate) fn from_body(mut body: Map<String, JsonValue>) -> BoolNode {
        BoolNode {
            filter: parse_clause_list(body.remove("filter")),
            must: parse_clause_list(body.remove("must")),
            must_not: parse_clause_list(body.remove("must_not")),
            should: parse_clause_list(body.remove("should")),
        }
    }

    /// Total number of clauses, all lists included. An emptied nested bool
    /// (`total_len() == 0`) is the only clause the optimizer may drop.
    pub fn total_len(&self) -> usize {
        self.filter.len() + self.must.len() + self.must_not.len() + self.should.len()
    }

    pub(crate) fn render(&self) -> JsonValue {
        let mut body = Map::new();
        for (clauses, name) in [
            (&self.filter, "filter"),
            (&self.must, "must"),
            (&self.must_not, "must_not"),
            (&self.should, "should"),
        ] {
            if !clauses.is_empty() {
                let rendered_clauses = clauses.iter().map(QueryNode::render).collect();
                body.insert(name.to_string(), JsonValue::Array(rendered_clauses));
            }
        }
        let mut query = Map::new();
        query.insert("bool".to_string(), JsonValue::Object(body));
        JsonValue::Object(query)
    }
}

impl From<BoolNode> for QueryNode {
    fn from(bool_node: BoolNode) -> QueryNode {
        QueryNode::Bool(bool_node)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::BoolNode;
    use crate::query_node::QueryNode;

    #[test]
    fn test_render_omits_empty_clause_lists() {
        let bool_node = BoolNode {
            must: vec![QueryNode::parse(json!({"exists": {"field": "f"}}))],
            ..Default::default()
        };
        assert_eq!(
            bool_node.render(),
            json!({"bool": {"must": [{"exists": {"field": "f"}}]}})
        );
    }

    #[test]
    fn test_render_empty_bool() {
        assert_eq!(BoolNode::default().render(), json!({"bool": {}}));
    }

    #[test]
    fn test_total_len() {
        let clause = || QueryNode::parse(json!({"exists": {"field": "f"}}));
        let bool_node = BoolNode {
            filter: vec![clause(), clause()],
            must_not: vec![clause()],
            ..Default::default()
        };
        assert_eq!(bool_node.total_len(), 3);
        assert_eq!(BoolNode::default().total_len(), 0);
    }
}
