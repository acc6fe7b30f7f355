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

//! Loads the Process-Type Registry's contents for this binary.
//!
//! The registry is populated at startup from a code-level declaration;
//! this CLI's code-level declaration is "parse this TOML file once, at
//! startup, and register every type it names" — the registration call
//! itself still happens exactly once in `main`, there is no runtime
//! mutation API beyond it (see
//! `process_orchestrator::registry::ProcessTypeRegistry`).

use anyhow::{Context, Result};
use process_orchestrator::{ProcessType, TaskDefinition};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct ProcessTypesFile {
    #[serde(default, rename = "process_type")]
    process_types: Vec<ProcessTypeDecl>,
}

#[derive(Debug, Deserialize)]
struct ProcessTypeDecl {
    name: String,
    description: String,
    #[serde(default, rename = "task")]
    tasks: Vec<TaskDecl>,
}

#[derive(Debug, Deserialize)]
struct TaskDecl {
    name: String,
    command: String,
    #[serde(default)]
    working_directory: Option<String>,
    #[serde(default = "default_timeout_minutes")]
    timeout_minutes: i64,
    #[serde(default = "default_max_retries")]
    max_retries: i32,
}

fn default_timeout_minutes() -> i64 {
    TaskDefinition::DEFAULT_TIMEOUT_MINUTES
}

fn default_max_retries() -> i32 {
    TaskDefinition::DEFAULT_MAX_RETRIES
}

/// Default search location, mirroring `process-orchestrator.toml`'s
/// current-directory-first convention.
pub fn default_path() -> PathBuf {
    PathBuf::from("./process-types.toml")
}

/// Parses `path` (if it exists) into a list of [`ProcessType`]s ready for
/// registration. Returns an empty list, not an error, when `path` is
/// absent — a fresh deployment may register types some other way before
/// its first `start`.
pub fn load(path: &Path) -> Result<Vec<ProcessType>> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read process type declarations at {path:?}"))?;
    let parsed: ProcessTypesFile = toml::from_str(&content)
        .with_context(|| format!("failed to parse process type declarations at {path:?}"))?;

    Ok(parsed
        .process_types
        .into_iter()
        .map(|decl| {
            let tasks = decl
                .tasks
                .into_iter()
                .map(|t| TaskDefinition {
                    name: t.name,
                    command: t.command,
                    working_directory: t.working_directory,
                    timeout_minutes: t.timeout_minutes,
                    max_retries: t.max_retries,
                })
                .collect();
            ProcessType::new(decl.name, decl.description, tasks)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_no_types() {
        let types = load(Path::new("/nonexistent/process-types.toml")).unwrap();
        assert!(types.is_empty());
    }

    #[test]
    fn parses_a_declared_type_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("process-types.toml");
        std::fs::write(
            &path,
            r#"
            [[process_type]]
            name = "backup"
            description = "nightly backup"

            [[process_type.task]]
            name = "dump"
            command = "pg_dump mydb"
            "#,
        )
        .unwrap();

        let types = load(&path).unwrap();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].name, "backup");
        assert_eq!(types[0].tasks.len(), 1);
        assert_eq!(types[0].tasks[0].timeout_minutes, TaskDefinition::DEFAULT_TIMEOUT_MINUTES);
        assert_eq!(types[0].tasks[0].max_retries, TaskDefinition::DEFAULT_MAX_RETRIES);
    }
}
