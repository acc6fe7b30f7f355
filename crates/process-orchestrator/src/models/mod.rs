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

//! The durable data model: four entities, one of them (`ProcessType`)
//! in-memory only.

pub mod process_record;
pub mod process_type;
pub mod task_instance;
pub mod work_unit;

pub use process_record::{NewProcessRecord, ProcessRecord};
pub use process_type::{ProcessType, TaskDefinition};
pub use task_instance::{NewTaskInstance, TaskInstance};
pub use work_unit::{NewScheduledWorkUnit, ProcessRunState, ScheduledWorkUnit};

use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql};
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Text;
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed task name shared by every `ScheduledWorkUnit` the core enqueues.
pub const QUEUE_TASK_NAME: &str = "process-orchestrator-task";

/// Engine-managed run status of a [`ProcessRecord`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
pub enum ProcessStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Stopped,
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessStatus::Pending => "PENDING",
            ProcessStatus::InProgress => "IN_PROGRESS",
            ProcessStatus::Completed => "COMPLETED",
            ProcessStatus::Failed => "FAILED",
            ProcessStatus::Stopped => "STOPPED",
        };
        f.write_str(s)
    }
}

impl FromStr for ProcessStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ProcessStatus::Pending),
            "IN_PROGRESS" => Ok(ProcessStatus::InProgress),
            "COMPLETED" => Ok(ProcessStatus::Completed),
            "FAILED" => Ok(ProcessStatus::Failed),
            "STOPPED" => Ok(ProcessStatus::Stopped),
            other => Err(format!("unknown process status {other:?}")),
        }
    }
}

impl<DB> ToSql<Text, DB> for ProcessStatus
where
    DB: Backend,
    String: ToSql<Text, DB>,
{
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, DB>) -> serialize::Result {
        self.to_string().to_sql(out)
    }
}

impl<DB> FromSql<Text, DB> for ProcessStatus
where
    DB: Backend,
    String: FromSql<Text, DB>,
{
    fn from_sql(bytes: DB::RawValue<'_>) -> deserialize::Result<Self> {
        let s = String::from_sql(bytes)?;
        s.parse().map_err(Into::into)
    }
}

/// Per-task execution status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TaskStatus::Pending),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "COMPLETED" => Ok(TaskStatus::Completed),
            "FAILED" => Ok(TaskStatus::Failed),
            other => Err(format!("unknown task status {other:?}")),
        }
    }
}

impl<DB> ToSql<Text, DB> for TaskStatus
where
    DB: Backend,
    String: ToSql<Text, DB>,
{
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, DB>) -> serialize::Result {
        self.to_string().to_sql(out)
    }
}

impl<DB> FromSql<Text, DB> for TaskStatus
where
    DB: Backend,
    String: FromSql<Text, DB>,
{
    fn from_sql(bytes: DB::RawValue<'_>) -> deserialize::Result<Self> {
        let s = String::from_sql(bytes)?;
        s.parse().map_err(Into::into)
    }
}

/// Provenance of a run: what caused it to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggeredBy {
    Manual,
    Scheduled,
    Api,
}

impl fmt::Display for TriggeredBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TriggeredBy::Manual => "MANUAL",
            TriggeredBy::Scheduled => "SCHEDULED",
            TriggeredBy::Api => "API",
        };
        f.write_str(s)
    }
}

impl FromStr for TriggeredBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MANUAL" => Ok(TriggeredBy::Manual),
            "SCHEDULED" => Ok(TriggeredBy::Scheduled),
            "API" => Ok(TriggeredBy::Api),
            other => Err(format!("unknown triggered_by {other:?}")),
        }
    }
}
