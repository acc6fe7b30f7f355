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

//! `TaskInstance` data access.

use diesel::prelude::*;

use crate::database::schema::task_instances::dsl::*;
use crate::database::universal_types::UniversalTimestamp;
use crate::database::Database;
use crate::dispatch_conn;
use crate::error::StoreError;
use crate::models::{NewTaskInstance, TaskInstance, TaskStatus};

#[derive(Clone)]
pub struct TaskInstanceDAL<'a> {
    database: &'a Database,
}

impl<'a> TaskInstanceDAL<'a> {
    pub fn new(database: &'a Database) -> Self {
        Self { database }
    }

    pub async fn create(&self, instance: NewTaskInstance) -> Result<TaskInstance, StoreError> {
        Ok(dispatch_conn!(self.database, conn, {
            diesel::insert_into(task_instances)
                .values(&instance)
                .execute(conn)?;
            task_instances.filter(id.eq(&instance.id)).first(conn)
        })?)
    }

    pub async fn find_by_id(&self, instance_id: &str) -> Result<TaskInstance, StoreError> {
        let instance_id = instance_id.to_string();
        Ok(dispatch_conn!(self.database, conn, {
            task_instances
                .filter(id.eq(&instance_id))
                .first(conn)
                .optional()?
                .ok_or(diesel::result::Error::NotFound)
        })?)
    }

    /// `findByProcessRecordId` — ordered by `taskIndex` ascending per
    /// Backs `Orchestrator::get_process_tasks`.
    pub async fn find_by_process_record_id(
        &self,
        record_id: &str,
    ) -> Result<Vec<TaskInstance>, StoreError> {
        let record_id = record_id.to_string();
        Ok(dispatch_conn!(self.database, conn, {
            task_instances
                .filter(process_record_id.eq(&record_id))
                .order(task_index.asc())
                .load(conn)
        })?)
    }

    pub async fn find_by_process_record_id_and_index(
        &self,
        record_id: &str,
        index: i64,
    ) -> Result<Option<TaskInstance>, StoreError> {
        let record_id = record_id.to_string();
        Ok(dispatch_conn!(self.database, conn, {
            task_instances
                .filter(process_record_id.eq(&record_id))
                .filter(task_index.eq(index))
                .first(conn)
                .optional()
        })?)
    }

    pub async fn mark_started(
        &self,
        instance_id: &str,
        command_rendered: &str,
        now: UniversalTimestamp,
    ) -> Result<(), StoreError> {
        let instance_id = instance_id.to_string();
        let command_rendered = command_rendered.to_string();
        dispatch_conn!(self.database, conn, {
            diesel::update(task_instances.filter(id.eq(&instance_id)))
                .set((
                    status.eq(TaskStatus::InProgress),
                    command.eq(command_rendered),
                    started_at.eq(Some(now)),
                    updated_at.eq(now),
                ))
                .execute(conn)
        })?;
        Ok(())
    }

    pub async fn mark_completed(
        &self,
        instance_id: &str,
        code: i32,
        captured_output: &str,
        now: UniversalTimestamp,
    ) -> Result<(), StoreError> {
        let instance_id = instance_id.to_string();
        let captured_output = captured_output.to_string();
        dispatch_conn!(self.database, conn, {
            diesel::update(task_instances.filter(id.eq(&instance_id)))
                .set((
                    status.eq(TaskStatus::Completed),
                    exit_code.eq(Some(code)),
                    output.eq(Some(captured_output)),
                    completed_at.eq(Some(now)),
                    updated_at.eq(now),
                ))
                .execute(conn)
        })?;
        Ok(())
    }

    pub async fn mark_failed(
        &self,
        instance_id: &str,
        error_message_text: &str,
        now: UniversalTimestamp,
    ) -> Result<(), StoreError> {
        let instance_id = instance_id.to_string();
        let error_message_text = error_message_text.to_string();
        dispatch_conn!(self.database, conn, {
            diesel::update(task_instances.filter(id.eq(&instance_id)))
                .set((
                    status.eq(TaskStatus::Failed),
                    error_message.eq(Some(error_message_text)),
                    completed_at.eq(Some(now)),
                    updated_at.eq(now),
                ))
                .execute(conn)
        })?;
        Ok(())
    }

    pub async fn increment_retry_count(
        &self,
        instance_id: &str,
        now: UniversalTimestamp,
    ) -> Result<(), StoreError> {
        let instance_id = instance_id.to_string();
        dispatch_conn!(self.database, conn, {
            diesel::update(task_instances.filter(id.eq(&instance_id)))
                .set((retry_count.eq(retry_count + 1), updated_at.eq(now)))
                .execute(conn)
        })?;
        Ok(())
    }
}
