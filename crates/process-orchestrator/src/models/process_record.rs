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

//! `ProcessRecord`: a user-declared pipeline instance plus the
//! engine-managed status block that tracks its current run. The two
//! halves are kept in one flat row but are conceptually distinct:
//! external callers may only ever touch the user-owned fields
//! (`process_type`, `input_data`, `schedule`); every other field here is
//! written exclusively by the state machine (`crate::state_machine`) or
//! the orchestrator service.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::database::schema::process_records;
use crate::database::universal_types::UniversalTimestamp;
use crate::models::ProcessStatus;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = process_records)]
pub struct ProcessRecord {
    /// User-chosen identifier, unique across all process records.
    pub id: String,
    /// Name of the registered `ProcessType` this record runs.
    pub process_type: String,
    /// Opaque JSON object supplying placeholder values (`crate::placeholder`).
    pub input_data: String,
    /// Cron expression, or `None` for a manual-only record.
    pub schedule: Option<String>,

    // --- engine-managed fields ---
    pub current_status: ProcessStatus,
    pub current_task_index: i64,
    pub total_tasks: i64,
    pub started_when: Option<UniversalTimestamp>,
    pub completed_when: Option<UniversalTimestamp>,
    pub failed_when: Option<UniversalTimestamp>,
    pub stopped_when: Option<UniversalTimestamp>,
    pub last_error_message: Option<String>,
    /// Serialized `TriggeredBy` of the most recent run.
    pub triggered_by: Option<String>,

    pub created_at: UniversalTimestamp,
    pub updated_at: UniversalTimestamp,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = process_records)]
pub struct NewProcessRecord {
    pub id: String,
    pub process_type: String,
    pub input_data: String,
    pub schedule: Option<String>,
    pub current_status: ProcessStatus,
    pub current_task_index: i64,
    pub total_tasks: i64,
    pub created_at: UniversalTimestamp,
    pub updated_at: UniversalTimestamp,
}

impl NewProcessRecord {
    pub fn new(
        id: impl Into<String>,
        process_type: impl Into<String>,
        input_data: impl Into<String>,
        schedule: Option<String>,
    ) -> Self {
        let now = UniversalTimestamp::now();
        Self {
            id: id.into(),
            process_type: process_type.into(),
            input_data: input_data.into(),
            schedule,
            current_status: ProcessStatus::Pending,
            current_task_index: 0,
            total_tasks: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
