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

//! `TaskInstance`: a durable, per-run snapshot of one
//! [`crate::models::TaskDefinition`] step belonging to a [`crate::models::ProcessRecord`].
//! Unlike the template it is cloned from, a `TaskInstance` carries its own
//! retry count and captured output, and is created once per run, in order,
//! as the state machine advances `current_task_index`.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::database::schema::task_instances;
use crate::database::universal_types::UniversalTimestamp;
use crate::models::TaskStatus;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = task_instances)]
pub struct TaskInstance {
    pub id: String,
    pub process_record_id: String,
    /// Position of this task within its process's pipeline, 0-based.
    pub task_index: i64,
    pub name: String,
    pub command: String,
    pub working_directory: Option<String>,
    pub timeout_minutes: i64,
    pub max_retries: i32,
    pub retry_count: i32,
    pub status: TaskStatus,
    pub started_at: Option<UniversalTimestamp>,
    pub completed_at: Option<UniversalTimestamp>,
    pub exit_code: Option<i32>,
    /// Captured combined stdout/stderr, truncated if it exceeds the
    /// executor's output cap.
    pub output: Option<String>,
    pub error_message: Option<String>,
    pub created_at: UniversalTimestamp,
    pub updated_at: UniversalTimestamp,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = task_instances)]
pub struct NewTaskInstance {
    pub id: String,
    pub process_record_id: String,
    pub task_index: i64,
    pub name: String,
    pub command: String,
    pub working_directory: Option<String>,
    pub timeout_minutes: i64,
    pub max_retries: i32,
    pub retry_count: i32,
    pub status: TaskStatus,
    pub created_at: UniversalTimestamp,
    pub updated_at: UniversalTimestamp,
}

impl NewTaskInstance {
    /// Builds the durable instance for one pipeline step, copying the
    /// immutable fields from its `TaskDefinition` template.
    pub fn from_definition(
        id: impl Into<String>,
        process_record_id: impl Into<String>,
        task_index: i64,
        def: &crate::models::TaskDefinition,
    ) -> Self {
        let now = UniversalTimestamp::now();
        Self {
            id: id.into(),
            process_record_id: process_record_id.into(),
            task_index,
            name: def.name.clone(),
            command: def.command.clone(),
            working_directory: def.working_directory.clone(),
            timeout_minutes: def.timeout_minutes,
            max_retries: def.max_retries,
            retry_count: 0,
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}
