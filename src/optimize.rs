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

use std::collections::HashMap;
use std::mem;

use serde_json::{Map, Value as JsonValue};

use crate::query_node::{BoolNode, MergeKey, QueryNode, TermsNode};

/// Each pass only flattens one nesting level, and nesting depth is unbounded,
/// so the driver iterates to a fixed point. A pass never increases depth or
/// clause count, so the cap is a safety bound, not the expected exit path.
const MAX_PASSES: usize = 100;

/// Rewrites a query document into a structurally smaller, semantically
/// equivalent one.
///
/// Nested `bool` groups are hoisted into their parent where the combination
/// of clause kinds allows it, and compatible `terms` clauses are merged.
/// Query types the optimizer does not understand are passed through
/// unchanged. This function never fails: malformed input comes back as it
/// went in.
pub fn optimize(query: JsonValue) -> JsonValue {
    let mut node = QueryNode::parse(query);
    let mut rendered = node.render();

    for _ in 0..MAX_PASSES {
        let optimized = optimize_pass(node);
        let optimized_rendered = optimized.render();
        if optimized_rendered == rendered {
            return rendered;
        }
        node = optimized;
        rendered = optimized_rendered;
    }
    rendered
}

/// Applies one rewrite step to a node tree: flattens one level of nested
/// `bool` groups and merges compatible `terms` clauses, then recurses into
/// the children.
pub fn optimize_pass(node: QueryNode) -> QueryNode {
    match node {
        QueryNode::Bool(bool_node) => QueryNode::Bool(optimize_bool(bool_node)),
        other => other,
    }
}

fn optimize_bool(mut node: BoolNode) -> BoolNode {
    // In a filter context neither `filter` nor `must` contributes to the
    // score, so both hoist into the parent's `filter`.
    let mut new_filter = Vec::with_capacity(node.filter.len());
    for child in node.filter {
        let QueryNode::Bool(mut child_bool) = child else {
            new_filter.push(child);
            continue;
        };
        new_filter.append(&mut child_bool.filter);
        new_filter.append(&mut child_bool.must);
        if child_bool.total_len() > 0 {
            new_filter.push(QueryNode::Bool(child_bool));
        }
    }
    node.filter = new_filter;

    // A negation nested one level under `must` remains a negation at the
    // parent level.
    let mut new_must = Vec::with_capacity(node.must.len());
    for child in node.must {
        let QueryNode::Bool(mut child_bool) = child else {
            new_must.push(child);
            continue;
        };
        new_must.append(&mut child_bool.must);
        node.must_not.append(&mut child_bool.must_not);
        if child_bool.total_len() > 0 {
            new_must.push(QueryNode::Bool(child_bool));
        }
    }
    node.must = new_must;

    // `must_not` and `should` children are never hoisted: negation and
    // disjunction do not distribute across nesting levels.

    // Concatenating values keeps "any of the union" semantics under negation
    // and disjunction. Under `must`/`filter` an array-valued terms clause
    // already means "matches any of", so merging there would be unsound.
    node.must_not = merge_mergeable_terms(node.must_not);
    node.should = merge_mergeable_terms(node.should);

    for clauses in [
        &mut node.filter,
        &mut node.must,
        &mut node.must_not,
        &mut node.should,
    ] {
        *clauses = mem::take(clauses).into_iter().map(optimize_pass).collect();
    }
    node
}

/// Rewrites one clause list: mergeable terms clauses are grouped by merge key
/// and each group collapses into a single clause. All other children keep
/// their relative order; merged groups follow them in first-encounter order.
fn merge_mergeable_terms(clauses: Vec<QueryNode>) -> Vec<QueryNode> {
    let mut rewrite = Vec::with_capacity(clauses.len());
    let mut groups: HashMap<MergeKey, Vec<TermsNode>> = HashMap::new();
    let mut group_order: Vec<MergeKey> = Vec::new();

    for child in clauses {
        let QueryNode::Terms(terms_node) = child else {
            rewrite.push(child);
            continue;
        };
        let Some(merge_key) = terms_node.merge_key() else {
            rewrite.push(QueryNode::Terms(terms_node));
            continue;
        };
        let group = groups.entry(merge_key.clone()).or_default();
        if group.is_empty() {
            group_order.push(merge_key);
        }
        group.push(terms_node);
    }

    for merge_key in group_order {
        let Some(group) = groups.remove(&merge_key) else {
            continue;
        };
        rewrite.extend(merge_terms(group).map(QueryNode::Terms));
    }
    rewrite
}

/// Collapses a group of terms clauses sharing a merge key into one clause.
///
/// Values are concatenated in encounter order; the first clause's auxiliary
/// parameters (`boost`, `_name`, ...) carry over. The merged body goes back
/// through the `TermsNode` constructor so its own merge key is recomputed.
fn merge_terms(group: Vec<TermsNode>) -> Option<TermsNode> {
    if group.len() == 1 {
        return group.into_iter().next();
    }
    let mut merged_values: Vec<JsonValue> = Vec::new();
    let mut template: Option<(String, Map<String, JsonValue>)> = None;
    for terms_node in group {
        let (field, mut values, parameters) = terms_node.into_merge_parts()?;
        merged_values.append(&mut values);
        template.get_or_insert((field, parameters));
    }
    let (field, mut body) = template?;
    body.insert(field, JsonValue::Array(merged_values));
    Some(TermsNode::new(body))
}
