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

//! `ProcessRecord` data access.

use diesel::prelude::*;

use crate::database::schema::process_records::dsl::*;
use crate::database::universal_types::UniversalTimestamp;
use crate::database::Database;
use crate::dispatch_conn;
use crate::error::StoreError;
use crate::models::{NewProcessRecord, ProcessRecord, ProcessStatus};

#[derive(Clone)]
pub struct ProcessRecordDAL<'a> {
    database: &'a Database,
}

impl<'a> ProcessRecordDAL<'a> {
    pub fn new(database: &'a Database) -> Self {
        Self { database }
    }

    pub async fn create(&self, record: NewProcessRecord) -> Result<ProcessRecord, StoreError> {
        Ok(dispatch_conn!(self.database, conn, {
            diesel::insert_into(process_records)
                .values(&record)
                .execute(conn)?;
            process_records.filter(id.eq(&record.id)).first(conn)
        })?)
    }

    pub async fn find_by_id(&self, record_id: &str) -> Result<ProcessRecord, StoreError> {
        let record_id = record_id.to_string();
        Ok(dispatch_conn!(self.database, conn, {
            process_records
                .filter(id.eq(&record_id))
                .first(conn)
                .optional()?
                .ok_or(diesel::result::Error::NotFound)
        })?)
    }

    pub async fn find_all(&self) -> Result<Vec<ProcessRecord>, StoreError> {
        Ok(dispatch_conn!(
            self.database,
            conn,
            process_records.order(created_at.asc()).load(conn)
        )?)
    }

    pub async fn find_by_status(
        &self,
        status: ProcessStatus,
    ) -> Result<Vec<ProcessRecord>, StoreError> {
        Ok(dispatch_conn!(self.database, conn, {
            process_records
                .filter(current_status.eq(status))
                .order(created_at.asc())
                .load(conn)
        })?)
    }

    /// `findScheduled` — every record with a non-null `schedule`.
    pub async fn find_scheduled(&self) -> Result<Vec<ProcessRecord>, StoreError> {
        Ok(dispatch_conn!(self.database, conn, {
            process_records
                .filter(schedule.is_not_null())
                .order(created_at.asc())
                .load(conn)
        })?)
    }

    pub async fn count_by_status(&self, status: ProcessStatus) -> Result<i64, StoreError> {
        Ok(dispatch_conn!(self.database, conn, {
            process_records
                .filter(current_status.eq(status))
                .count()
                .get_result(conn)
        })?)
    }

    pub async fn exists(&self, record_id: &str) -> Result<bool, StoreError> {
        let record_id = record_id.to_string();
        let count: i64 = dispatch_conn!(self.database, conn, {
            process_records
                .filter(id.eq(&record_id))
                .count()
                .get_result(conn)
        })?;
        Ok(count > 0)
    }

    pub async fn delete(&self, record_id: &str) -> Result<(), StoreError> {
        let record_id = record_id.to_string();
        dispatch_conn!(self.database, conn, {
            diesel::delete(process_records.filter(id.eq(&record_id))).execute(conn)
        })?;
        Ok(())
    }

    /// Marks the record `IN_PROGRESS` and stamps `started_when`.
    pub async fn mark_started(
        &self,
        record_id: &str,
        now: UniversalTimestamp,
        total: i64,
    ) -> Result<(), StoreError> {
        let record_id = record_id.to_string();
        dispatch_conn!(self.database, conn, {
            diesel::update(process_records.filter(id.eq(&record_id)))
                .set((
                    current_status.eq(ProcessStatus::InProgress),
                    started_when.eq(Some(now)),
                    total_tasks.eq(total),
                    updated_at.eq(now),
                ))
                .execute(conn)
        })?;
        Ok(())
    }

    /// Advances `current_task_index`. Guarded on the record not already
    /// being `STOPPED`: a task that was in flight when `stop` landed must
    /// not resurrect the record's progress past that terminal state.
    /// Returns `false` (zero rows touched) when that guard fired, so the
    /// caller knows not to enqueue a next unit either.
    pub async fn advance_task_index(
        &self,
        record_id: &str,
        new_index: i64,
        now: UniversalTimestamp,
    ) -> Result<bool, StoreError> {
        let record_id = record_id.to_string();
        let rows_updated: usize = dispatch_conn!(self.database, conn, {
            diesel::update(
                process_records
                    .filter(id.eq(&record_id))
                    .filter(current_status.ne(ProcessStatus::Stopped)),
            )
            .set((current_task_index.eq(new_index), updated_at.eq(now)))
            .execute(conn)
        })?;
        Ok(rows_updated > 0)
    }

    /// Guarded the same way as [`Self::advance_task_index`]: a task
    /// finishing after a `stop` must not overwrite `STOPPED`.
    pub async fn mark_completed(
        &self,
        record_id: &str,
        now: UniversalTimestamp,
    ) -> Result<(), StoreError> {
        let record_id = record_id.to_string();
        dispatch_conn!(self.database, conn, {
            diesel::update(
                process_records
                    .filter(id.eq(&record_id))
                    .filter(current_status.ne(ProcessStatus::Stopped)),
            )
            .set((
                current_status.eq(ProcessStatus::Completed),
                completed_when.eq(Some(now)),
                updated_at.eq(now),
            ))
            .execute(conn)
        })?;
        Ok(())
    }

    /// Guarded the same way as [`Self::advance_task_index`]: a task
    /// finishing after a `stop` must not overwrite `STOPPED`.
    pub async fn mark_failed(
        &self,
        record_id: &str,
        error_message: &str,
        now: UniversalTimestamp,
    ) -> Result<(), StoreError> {
        let record_id = record_id.to_string();
        let error_message = error_message.to_string();
        dispatch_conn!(self.database, conn, {
            diesel::update(
                process_records
                    .filter(id.eq(&record_id))
                    .filter(current_status.ne(ProcessStatus::Stopped)),
            )
            .set((
                current_status.eq(ProcessStatus::Failed),
                failed_when.eq(Some(now)),
                last_error_message.eq(Some(error_message)),
                updated_at.eq(now),
            ))
            .execute(conn)
        })?;
        Ok(())
    }

    /// Marks the record `STOPPED`; the state machine honors this the
    /// next time the claimed unit runs.
    pub async fn mark_stopped(
        &self,
        record_id: &str,
        now: UniversalTimestamp,
    ) -> Result<(), StoreError> {
        let record_id = record_id.to_string();
        dispatch_conn!(self.database, conn, {
            diesel::update(process_records.filter(id.eq(&record_id)))
                .set((
                    current_status.eq(ProcessStatus::Stopped),
                    stopped_when.eq(Some(now)),
                    updated_at.eq(now),
                ))
                .execute(conn)
        })?;
        Ok(())
    }

    /// Resets a record to `PENDING`/task-index 0 ahead of a fresh run
    /// (`restart`).
    pub async fn reset_for_restart(
        &self,
        record_id: &str,
        now: UniversalTimestamp,
    ) -> Result<(), StoreError> {
        let record_id = record_id.to_string();
        dispatch_conn!(self.database, conn, {
            diesel::update(process_records.filter(id.eq(&record_id)))
                .set((
                    current_status.eq(ProcessStatus::Pending),
                    current_task_index.eq(0_i64),
                    started_when.eq(None::<UniversalTimestamp>),
                    completed_when.eq(None::<UniversalTimestamp>),
                    failed_when.eq(None::<UniversalTimestamp>),
                    stopped_when.eq(None::<UniversalTimestamp>),
                    last_error_message.eq(None::<String>),
                    updated_at.eq(now),
                ))
                .execute(conn)
        })?;
        Ok(())
    }

    pub async fn set_triggered_by(
        &self,
        record_id: &str,
        triggered: crate::models::TriggeredBy,
        now: UniversalTimestamp,
    ) -> Result<(), StoreError> {
        let record_id = record_id.to_string();
        let triggered = triggered.to_string();
        dispatch_conn!(self.database, conn, {
            diesel::update(process_records.filter(id.eq(&record_id)))
                .set((triggered_by.eq(Some(triggered)), updated_at.eq(now)))
                .execute(conn)
        })?;
        Ok(())
    }
}
