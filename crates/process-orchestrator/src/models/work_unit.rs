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

//! `ScheduledWorkUnit`: the durable queue row that coordinates work
//! across the fleet. Composite-keyed on
//! `(task_name, task_instance)`; every write that changes ownership or
//! status is guarded by the `version` column (see `crate::dal::work_queue`).

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::database::schema::scheduled_work_units;
use crate::database::universal_types::UniversalTimestamp;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = scheduled_work_units)]
pub struct ScheduledWorkUnit {
    /// Fixed constant shared by every row (`models::QUEUE_TASK_NAME`).
    pub task_name: String,
    /// Identifies a specific unit of work, conventionally
    /// `"{process_record_id}:{attempt_id}"`.
    pub task_instance: String,
    /// Opaque JSON-encoded [`ProcessRunState`].
    pub payload: Vec<u8>,
    pub execution_time: UniversalTimestamp,
    pub picked: bool,
    pub picked_by: Option<String>,
    pub last_success: Option<UniversalTimestamp>,
    pub last_failure: Option<UniversalTimestamp>,
    pub consecutive_failures: i32,
    pub last_heartbeat: Option<UniversalTimestamp>,
    pub version: i64,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = scheduled_work_units)]
pub struct NewScheduledWorkUnit {
    pub task_name: String,
    pub task_instance: String,
    pub payload: Vec<u8>,
    pub execution_time: UniversalTimestamp,
    pub picked: bool,
    pub consecutive_failures: i32,
    pub version: i64,
}

impl NewScheduledWorkUnit {
    /// A fresh row always starts unpicked at `version = 0`.
    pub fn new(task_instance: impl Into<String>, payload: Vec<u8>, execution_time: UniversalTimestamp) -> Self {
        Self {
            task_name: crate::models::QUEUE_TASK_NAME.to_string(),
            task_instance: task_instance.into(),
            payload,
            execution_time,
            picked: false,
            consecutive_failures: 0,
            version: 0,
        }
    }
}

/// The decoded contents of [`ScheduledWorkUnit::payload`].
///
/// Carries enough of the run's identity for the state machine to resume
/// work without a prior read of `ProcessRecord` — the record is still
/// re-read on claim as the source of truth; this snapshot
/// exists so a claimed unit is self-describing in logs and in the
/// (currently unused) cross-node handoff path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRunState {
    pub process_record_id: String,
    pub process_type_name: String,
    pub current_task_index: i64,
    pub total_tasks: i64,
    /// Snapshot of `ProcessRecord.input_data` at enqueue time.
    pub input_data: String,
    /// Free-form context describing why this unit was enqueued
    /// (e.g. `"manual"`, `"cron:0 */5 * * *"`, `"retry:2"`).
    pub invocation_context: String,
}

impl ProcessRunState {
    pub fn encode(&self) -> Result<Vec<u8>, crate::error::PlaceholderError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, crate::error::PlaceholderError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
