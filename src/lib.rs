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

//! Structural optimizer for Elasticsearch-style query documents.
//!
//! Query builders tend to produce deeply nested `bool` queries: every layer of
//! the building pipeline wraps the previous one into its own `bool.filter` or
//! `bool.must`. This crate rewrites such a document into a semantically
//! equivalent but flatter one before it is sent to the search backend, by
//! hoisting redundant nested `bool` groups and merging compatible `terms`
//! clauses. Query types other than `bool` and `terms` are passed through
//! untouched.
//!
//! See the query DSL documentation here:
//! <https://www.elastic.co/guide/en/elasticsearch/reference/current/query-dsl.html>

mod json_hash;
mod optimize;
pub mod query_node;

pub use optimize::{optimize, optimize_pass};
pub use query_node::{BoolNode, QueryNode, TermsNode};
