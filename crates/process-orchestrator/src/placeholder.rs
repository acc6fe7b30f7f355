/*
 *  Copyright 2026 Process Orchestrator Contributors
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Placeholder substitution.
//!
//! Expands every `${key}` occurrence in a `TaskDefinition.command` against
//! the JSON object decoded from `ProcessRecord.input_data`. Unknown keys
//! are left as the literal `${key}` token rather than erroring — callers
//! rely on this to pass through tokens a downstream shell or tool is
//! meant to expand.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::PlaceholderError;

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

/// Substitutes every `${key}` in `command` with the string form of
/// `input_data[key]`, where `input_data` is a JSON-encoded object.
pub fn substitute(command: &str, input_data: &str) -> Result<String, PlaceholderError> {
    let value: Value = serde_json::from_str(input_data)?;
    let object = value.as_object();

    let result = PLACEHOLDER_RE.replace_all(command, |caps: &regex::Captures| {
        let key = &caps[1];
        match object.and_then(|obj| obj.get(key)) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => caps[0].to_string(),
        }
    });
    Ok(result.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_string_key() {
        let out = substitute("echo ${name}", r#"{"name": "world"}"#).unwrap();
        assert_eq!(out, "echo world");
    }

    #[test]
    fn leaves_unknown_key_literal() {
        let out = substitute("echo ${missing}", r#"{"name": "world"}"#).unwrap();
        assert_eq!(out, "echo ${missing}");
    }

    #[test]
    fn substitutes_non_string_value_via_display() {
        let out = substitute("retry ${count}", r#"{"count": 3}"#).unwrap();
        assert_eq!(out, "retry 3");
    }

    #[test]
    fn errors_on_malformed_json() {
        assert!(substitute("echo ${x}", "not json").is_err());
    }

    #[test]
    fn substitutes_multiple_occurrences() {
        let out = substitute(
            "cp ${src} ${dst}",
            r#"{"src": "/a", "dst": "/b"}"#,
        )
        .unwrap();
        assert_eq!(out, "cp /a /b");
    }
}
