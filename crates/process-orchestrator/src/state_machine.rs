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

//! Pipeline State Machine.
//!
//! `run_unit` is the single algorithm every claimed [`ScheduledWorkUnit`]
//! is handed to. It is the only place that advances a `ProcessRecord`'s
//! `current_task_index`, creates `TaskInstance` rows, or decides whether
//! a failure is retried or terminal — every other module either feeds
//! this function inputs (the executor, the registry, the placeholder
//! substitution) or reacts to its output (the orchestrator's ack/enqueue
//! bookkeeping).

use chrono::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::dal::DAL;
use crate::database::universal_types::UniversalTimestamp;
use crate::error::OrchestratorError;
use crate::executor::{self, ExecutableTask};
use crate::models::{NewTaskInstance, ProcessRunState, ProcessStatus};
use crate::placeholder;
use crate::registry::ProcessTypeRegistry;

/// Bounded exponential backoff: `min(30s * 2^(n-1), 15min)` for the
/// `n`-th retry (`n >= 1`).
pub fn backoff(retry_count: i32) -> Duration {
    let n = retry_count.max(1) as i64;
    let seconds = 30i64.saturating_mul(1i64.checked_shl((n - 1) as u32).unwrap_or(i64::MAX));
    Duration::seconds(seconds.min(15 * 60))
}

/// What the caller (the orchestrator's worker loop) should do with the
/// claimed unit once [`run_unit`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// Terminal for this unit: delete it from the queue.
    Complete,
    /// Leave it queued; it has already been rescheduled (next task or
    /// retry) at a new `execution_time`.
    Rescheduled,
}

/// Runs one claimed work unit to its next decision point.
pub async fn run_unit(
    dal: &DAL,
    registry: &ProcessTypeRegistry,
    clock: &dyn Clock,
    unit_key: &str,
    payload: &[u8],
) -> Result<Ack, OrchestratorError> {
    let state = ProcessRunState::decode(payload)?;
    let now = UniversalTimestamp(clock.now());

    let record = dal.process_records().find_by_id(&state.process_record_id).await?;

    // Step 2: stop requests win unconditionally.
    if record.current_status == ProcessStatus::Stopped {
        info!(process_record_id = %record.id, "unit claimed for a stopped record; acking without work");
        return Ok(Ack::Complete);
    }

    let process_type = match registry.get_or_throw(&record.process_type) {
        Ok(pt) => pt,
        Err(_) => {
            let message = format!("process type {:?} is not registered", record.process_type);
            warn!(process_record_id = %record.id, %message, "unknown process type");
            dal.process_records()
                .mark_failed(&record.id, &message, now)
                .await?;
            return Ok(Ack::Complete);
        }
    };

    // Step 3: first task of a fresh run transitions PENDING -> IN_PROGRESS.
    if state.current_task_index == 0 && record.current_status == ProcessStatus::Pending {
        dal.process_records()
            .mark_started(&record.id, now, process_type.tasks.len() as i64)
            .await?;
    }

    let task_index = state.current_task_index;
    let definition = process_type.tasks.get(task_index as usize).ok_or_else(|| {
        OrchestratorError::InvalidState(record.id.clone(), record.current_status)
    })?;

    // Step 4: load or create the TaskInstance for this index.
    let existing = dal
        .task_instances()
        .find_by_process_record_id_and_index(&record.id, task_index)
        .await?;
    let instance = match existing {
        Some(instance) => instance,
        None => {
            let new_instance = NewTaskInstance::from_definition(
                Uuid::new_v4().to_string(),
                record.id.clone(),
                task_index,
                definition,
            );
            dal.task_instances().create(new_instance).await?
        }
    };

    // Placeholder substitution happens fresh on every attempt: inputData
    // is immutable for the life of the run, so this is deterministic.
    let rendered_command = match placeholder::substitute(&definition.command, &record.input_data) {
        Ok(cmd) => cmd,
        Err(e) => {
            let message = e.to_string();
            dal.task_instances()
                .mark_failed(&instance.id, &message, now)
                .await?;
            dal.process_records()
                .mark_failed(&record.id, &message, now)
                .await?;
            return Ok(Ack::Complete);
        }
    };

    dal.task_instances()
        .mark_started(&instance.id, &rendered_command, now)
        .await?;

    // Step 5: invoke the executor.
    let outcome = executor::execute(&ExecutableTask {
        command: rendered_command,
        working_directory: instance.working_directory.clone(),
        timeout_minutes: instance.timeout_minutes,
    })
    .await;

    let finish_now = UniversalTimestamp(clock.now());

    if outcome.success {
        // Step 6: executor success.
        dal.task_instances()
            .mark_completed(
                &instance.id,
                outcome.exit_code.unwrap_or(0),
                &outcome.output,
                finish_now,
            )
            .await?;

        if task_index + 1 < state.total_tasks {
            let advanced = dal
                .process_records()
                .advance_task_index(&record.id, task_index + 1, finish_now)
                .await?;
            if !advanced {
                // The record was stopped while this task was in flight;
                // its outcome is recorded above, but progress must not
                // resurrect it past STOPPED by enqueueing a next unit.
                info!(process_record_id = %record.id, "record stopped mid-task; not advancing");
                return Ok(Ack::Complete);
            }

            let next_state = ProcessRunState {
                process_record_id: record.id.clone(),
                process_type_name: record.process_type.clone(),
                current_task_index: task_index + 1,
                total_tasks: state.total_tasks,
                input_data: record.input_data.clone(),
                invocation_context: state.invocation_context.clone(),
            };
            dal.work_queue()
                .reschedule(unit_key, next_state.encode()?, finish_now)
                .await?;
            return Ok(Ack::Rescheduled);
        }

        dal.process_records()
            .mark_completed(&record.id, finish_now)
            .await?;
        return Ok(Ack::Complete);
    }

    // Step 7: executor failure.
    let error_message = outcome
        .error_message
        .unwrap_or_else(|| "task failed with no diagnostic message".to_string());

    if instance.retry_count < instance.max_retries {
        dal.task_instances()
            .increment_retry_count(&instance.id, finish_now)
            .await?;

        let retry_delay = backoff(instance.retry_count + 1);
        let next_execution = UniversalTimestamp(finish_now.as_datetime() + retry_delay);
        dal.work_queue()
            .reschedule(unit_key, payload.to_vec(), next_execution)
            .await?;
        warn!(
            process_record_id = %record.id,
            task = %instance.name,
            retry_count = instance.retry_count + 1,
            "task failed, scheduling retry"
        );
        return Ok(Ack::Rescheduled);
    }

    dal.task_instances()
        .mark_failed(&instance.id, &error_message, finish_now)
        .await?;
    dal.process_records()
        .mark_failed(&record.id, &error_message, finish_now)
        .await?;
    Ok(Ack::Complete)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially_then_caps() {
        assert_eq!(backoff(1), Duration::seconds(30));
        assert_eq!(backoff(2), Duration::seconds(60));
        assert_eq!(backoff(3), Duration::seconds(120));
        assert_eq!(backoff(10), Duration::seconds(15 * 60));
        assert_eq!(backoff(100), Duration::seconds(15 * 60));
    }
}
