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

//! `ProcessType`: an in-memory, immutable-after-registration
//! template. Unlike `ProcessRecord`/`TaskInstance`/`ScheduledWorkUnit` this
//! is never persisted — it is declared in code at startup and shared by
//! reference (see `crate::registry`).

use serde::{Deserialize, Serialize};

/// One step of a [`ProcessType`]'s pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub name: String,
    pub command: String,
    pub working_directory: Option<String>,
    pub timeout_minutes: i64,
    pub max_retries: i32,
}

impl TaskDefinition {
    pub const DEFAULT_TIMEOUT_MINUTES: i64 = 60;
    pub const DEFAULT_MAX_RETRIES: i32 = 3;

    /// Convenience constructor using the spec's defaults
    /// (`timeoutMinutes` = 60, `maxRetries` = 3).
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            working_directory: None,
            timeout_minutes: Self::DEFAULT_TIMEOUT_MINUTES,
            max_retries: Self::DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_working_directory(mut self, dir: impl Into<String>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn with_timeout_minutes(mut self, minutes: i64) -> Self {
        self.timeout_minutes = minutes;
        self
    }

    pub fn with_max_retries(mut self, retries: i32) -> Self {
        self.max_retries = retries;
        self
    }
}

/// A named, ordered pipeline template. Registered once at startup via
/// [`crate::registry::ProcessTypeRegistry::register`] and never mutated
/// afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessType {
    pub name: String,
    pub description: String,
    pub tasks: Vec<TaskDefinition>,
}

impl ProcessType {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        tasks: Vec<TaskDefinition>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            tasks,
        }
    }
}
