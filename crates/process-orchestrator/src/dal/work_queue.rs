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

//! Scheduled Work Queue data access.
//!
//! The coordination primitive that lets multiple workers, possibly on
//! different nodes, share pending work without double-executing it.
//! Every write that changes ownership (`claim_due`, `heartbeat`,
//! `complete`, `reclaim_dead`) is conditioned on the row's current
//! `version`; a zero-row update means another writer won the race, and
//! the caller is expected to treat that unit as already handled rather
//! than retry blindly (the at-most-one guarantee comes
//! from this, not from any row-level lock).

use diesel::prelude::*;

use crate::database::schema::scheduled_work_units::dsl::*;
use crate::database::universal_types::UniversalTimestamp;
use crate::database::Database;
use crate::dispatch_conn;
use crate::error::StoreError;
use crate::models::{NewScheduledWorkUnit, ScheduledWorkUnit};

#[derive(Clone)]
pub struct WorkQueueDAL<'a> {
    database: &'a Database,
}

impl<'a> WorkQueueDAL<'a> {
    pub fn new(database: &'a Database) -> Self {
        Self { database }
    }

    /// `enqueue` — inserts a fresh row, `picked=false`, `version=0`. A
    /// retry re-enqueue of the *same* `task_instance` key is an upsert:
    /// replace the payload/executionTime and reset ownership so a
    /// previous claimant can't resurrect a completed attempt.
    pub async fn enqueue(&self, unit: NewScheduledWorkUnit) -> Result<(), StoreError> {
        dispatch_conn!(self.database, conn, {
            diesel::insert_into(scheduled_work_units)
                .values(&unit)
                .execute(conn)
        })?;
        Ok(())
    }

    /// Re-enqueues the same logical unit (same `task_instance` key) at a
    /// new `execution_time`, clearing ownership — used both for the
    /// "immediate handoff" to the next task and for backoff retries
    /// Used by the state machine after a unit finishes or reschedules.
    pub async fn reschedule(
        &self,
        task_instance_key: &str,
        payload_bytes: Vec<u8>,
        new_execution_time: UniversalTimestamp,
    ) -> Result<(), StoreError> {
        let task_instance_key = task_instance_key.to_string();
        dispatch_conn!(self.database, conn, {
            diesel::update(
                scheduled_work_units
                    .filter(task_name.eq(crate::models::QUEUE_TASK_NAME))
                    .filter(task_instance.eq(&task_instance_key)),
            )
            .set((
                payload.eq(payload_bytes),
                execution_time.eq(new_execution_time),
                picked.eq(false),
                picked_by.eq(None::<String>),
                version.eq(version + 1),
            ))
            .execute(conn)
        })?;
        Ok(())
    }

    /// `claimDue` — atomically selects up to `limit` unpicked, due rows
    /// and marks them picked by `worker_id`. SQLite and Postgres both
    /// lack a portable "UPDATE ... ORDER BY ... LIMIT ... RETURNING" in
    /// Diesel's query builder, so this selects candidate keys first and
    /// then claims each with a version-conditioned UPDATE, discarding any
    /// that lost the race to a concurrent worker.
    pub async fn claim_due(
        &self,
        worker_id: &str,
        limit: i64,
        now: UniversalTimestamp,
    ) -> Result<Vec<ScheduledWorkUnit>, StoreError> {
        let worker_id = worker_id.to_string();
        let candidates: Vec<(String, i64)> = dispatch_conn!(self.database, conn, {
            scheduled_work_units
                .filter(picked.eq(false))
                .filter(execution_time.le(now))
                .order(execution_time.asc())
                .limit(limit)
                .select((task_instance, version))
                .load(conn)
        })?;

        let mut claimed = Vec::with_capacity(candidates.len());
        for (key, expected_version) in candidates {
            if let Some(unit) = self
                .try_claim_one(&key, expected_version, &worker_id, now)
                .await?
            {
                claimed.push(unit);
            }
        }
        Ok(claimed)
    }

    async fn try_claim_one(
        &self,
        key: &str,
        expected_version: i64,
        worker_id: &str,
        now: UniversalTimestamp,
    ) -> Result<Option<ScheduledWorkUnit>, StoreError> {
        let key = key.to_string();
        let worker_id = worker_id.to_string();
        let key_for_reread = key.clone();
        let rows_updated: usize = dispatch_conn!(self.database, conn, {
            diesel::update(
                scheduled_work_units
                    .filter(task_name.eq(crate::models::QUEUE_TASK_NAME))
                    .filter(task_instance.eq(&key))
                    .filter(version.eq(expected_version))
                    .filter(picked.eq(false)),
            )
            .set((
                picked.eq(true),
                picked_by.eq(Some(worker_id)),
                last_heartbeat.eq(Some(now)),
                version.eq(expected_version + 1),
            ))
            .execute(conn)
        })?;

        if rows_updated == 0 {
            return Ok(None);
        }

        let unit = dispatch_conn!(self.database, conn, {
            scheduled_work_units
                .filter(task_name.eq(crate::models::QUEUE_TASK_NAME))
                .filter(task_instance.eq(&key_for_reread))
                .first(conn)
                .optional()
        })?;
        Ok(unit)
    }

    /// `heartbeat` — refreshes `last_heartbeat`, conditioned on the unit
    /// still being owned by `worker_id`.
    pub async fn heartbeat(
        &self,
        key: &str,
        worker_id: &str,
        now: UniversalTimestamp,
    ) -> Result<bool, StoreError> {
        let key = key.to_string();
        let worker_id = worker_id.to_string();
        let rows_updated: usize = dispatch_conn!(self.database, conn, {
            diesel::update(
                scheduled_work_units
                    .filter(task_name.eq(crate::models::QUEUE_TASK_NAME))
                    .filter(task_instance.eq(&key))
                    .filter(picked_by.eq(Some(worker_id))),
            )
            .set(last_heartbeat.eq(Some(now)))
            .execute(conn)
        })?;
        Ok(rows_updated > 0)
    }

    /// Deletes the row outright on success, after first stamping
    /// `last_success` so any observer racing the delete still sees it.
    /// The authoritative success record thereafter is the
    /// `TaskInstance`/`ProcessRecord` rows the state machine already
    /// updated in the same logical step.
    pub async fn complete_success(&self, key: &str, now: UniversalTimestamp) -> Result<(), StoreError> {
        let key = key.to_string();
        let key2 = key.clone();
        dispatch_conn!(self.database, conn, {
            diesel::update(
                scheduled_work_units
                    .filter(task_name.eq(crate::models::QUEUE_TASK_NAME))
                    .filter(task_instance.eq(&key)),
            )
            .set(last_success.eq(Some(now)))
            .execute(conn)
        })?;
        dispatch_conn!(self.database, conn, {
            diesel::delete(
                scheduled_work_units
                    .filter(task_name.eq(crate::models::QUEUE_TASK_NAME))
                    .filter(task_instance.eq(&key2)),
            )
            .execute(conn)
        })?;
        Ok(())
    }

    /// `complete` on failure — clears ownership, stamps `last_failure`,
    /// increments `consecutive_failures`, and pushes `execution_time`
    /// forward by the caller-supplied backoff.
    pub async fn complete_failure(
        &self,
        key: &str,
        next_execution_time: UniversalTimestamp,
        now: UniversalTimestamp,
    ) -> Result<(), StoreError> {
        let key = key.to_string();
        dispatch_conn!(self.database, conn, {
            diesel::update(
                scheduled_work_units
                    .filter(task_name.eq(crate::models::QUEUE_TASK_NAME))
                    .filter(task_instance.eq(&key)),
            )
            .set((
                picked.eq(false),
                picked_by.eq(None::<String>),
                last_failure.eq(Some(now)),
                consecutive_failures.eq(consecutive_failures + 1),
                execution_time.eq(next_execution_time),
                version.eq(version + 1),
            ))
            .execute(conn)
        })?;
        Ok(())
    }

    /// `reclaimDead` — clears ownership of units whose heartbeat is older
    /// than `now - deadline`, presuming their worker has crashed.
    pub async fn reclaim_dead(
        &self,
        now: UniversalTimestamp,
        deadline: chrono::Duration,
    ) -> Result<usize, StoreError> {
        let cutoff = UniversalTimestamp::from(now.as_datetime() - deadline);
        let rows_updated: usize = dispatch_conn!(self.database, conn, {
            diesel::update(
                scheduled_work_units
                    .filter(picked.eq(true))
                    .filter(last_heartbeat.lt(cutoff)),
            )
            .set((
                picked.eq(false),
                picked_by.eq(None::<String>),
                version.eq(version + 1),
            ))
            .execute(conn)
        })?;
        Ok(rows_updated)
    }

    pub async fn find_by_key(&self, key: &str) -> Result<Option<ScheduledWorkUnit>, StoreError> {
        let key = key.to_string();
        Ok(dispatch_conn!(self.database, conn, {
            scheduled_work_units
                .filter(task_name.eq(crate::models::QUEUE_TASK_NAME))
                .filter(task_instance.eq(&key))
                .first(conn)
                .optional()
        })?)
    }

    /// True if any work unit exists for `process_record_id` — `task_instance`
    /// keys are conventionally `"{process_record_id}:{attempt_id}"`, so this
    /// is a prefix match. Used by the cron loop to avoid enqueueing a
    /// second run while one is still outstanding for the same record.
    pub async fn exists_for_process_record(&self, process_record_id: &str) -> Result<bool, StoreError> {
        let pattern = format!("{process_record_id}:%");
        let count: i64 = dispatch_conn!(self.database, conn, {
            scheduled_work_units
                .filter(task_name.eq(crate::models::QUEUE_TASK_NAME))
                .filter(task_instance.like(pattern))
                .count()
                .get_result(conn)
        })?;
        Ok(count > 0)
    }

    /// Deletes every outstanding row for `process_record_id` (prefix match
    /// on its `"{process_record_id}:{attempt_id}"` keys), used by `stop`
    /// so a stopped record has no work left to claim rather than relying
    /// solely on the state machine's `STOPPED` check at claim time.
    pub async fn delete_for_process_record(&self, process_record_id: &str) -> Result<usize, StoreError> {
        let pattern = format!("{process_record_id}:%");
        let rows_deleted: usize = dispatch_conn!(self.database, conn, {
            diesel::delete(
                scheduled_work_units
                    .filter(task_name.eq(crate::models::QUEUE_TASK_NAME))
                    .filter(task_instance.like(pattern)),
            )
            .execute(conn)
        })?;
        Ok(rows_deleted)
    }
}
