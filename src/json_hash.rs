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

use std::hash::{Hash, Hasher};

use serde_json::Value as JsonValue;
use siphasher::sip::SipHasher;

/// Hashes a JSON value structurally.
///
/// Object keys are visited in sorted order, so two objects differing only in
/// key order hash identically. We do not use the standard library
/// DefaultHasher to make sure we get the same hash values across builds.
pub(crate) fn canonical_hash(json_val: &JsonValue) -> u64 {
    let mut hasher = SipHasher::new();
    hash_json_val(json_val, &mut hasher);
    hasher.finish()
}

/// This is a bit overkill but this function has the merit of
/// ensuring that the data that is sent to the hasher is unique
/// to the value, so we do not lose injectivity there.
fn hash_json_val<H: Hasher>(json_val: &JsonValue, hasher: &mut H) {
    match json_val {
        JsonValue::Null => {
            hasher.write_u8(0u8);
        }
        JsonValue::Bool(bool_val) => {
            hasher.write_u8(1u8);
            bool_val.hash(hasher);
        }
        JsonValue::Number(num) => {
            hasher.write_u8(2u8);
            num.hash(hasher);
        }
        JsonValue::String(s) => {
            hasher.write_u8(3u8);
            hasher.write_u64(s.len() as u64);
            hasher.write(s.as_bytes());
        }
        JsonValue::Array(arr) => {
            hasher.write_u8(4u8);
            hasher.write_u64(arr.len() as u64);
            for el in arr {
                hash_json_val(el, hasher);
            }
        }
        JsonValue::Object(obj) => {
            hasher.write_u8(5u8);
            hasher.write_u64(obj.len() as u64);
            let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
            keys.sort_unstable();
            for key in keys {
                hasher.write_u64(key.len() as u64);
                hasher.write(key.as_bytes());
                hash_json_val(&obj[key], hasher);
            }
        }
    }
}
