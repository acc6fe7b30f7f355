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

//! Orchestrator Service.
//!
//! `Orchestrator` is the public entry point: the CRUD/lifecycle
//! operations, the read queries, and the background machinery (cron
//! loop + worker pool) that actually drives pipelines to completion. The
//! worker pool loop is a semaphore-gated poll loop.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::clock::{Clock, CronSchedule, SystemClock};
use crate::config::SchedulingConfig;
use crate::dal::DAL;
use crate::database::universal_types::UniversalTimestamp;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::models::{
    NewProcessRecord, ProcessRecord, ProcessStatus, ProcessRunState, ProcessType,
    NewScheduledWorkUnit, TaskInstance, TriggeredBy,
};
use crate::registry::ProcessTypeRegistry;
use crate::state_machine::{self, Ack};

/// Aggregate counts for `statistics()`.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct Statistics {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub failed: i64,
    pub stopped: i64,
    pub scheduled: i64,
}

/// The public orchestrator service. Cloning is cheap; every clone
/// shares the same DAL, registry, and shutdown flag.
#[derive(Clone)]
pub struct Orchestrator {
    dal: Arc<DAL>,
    registry: Arc<ProcessTypeRegistry>,
    clock: Arc<dyn Clock>,
    config: SchedulingConfig,
    worker_id: String,
    shutting_down: Arc<AtomicBool>,
}

impl Orchestrator {
    pub fn new(dal: DAL, registry: ProcessTypeRegistry, config: SchedulingConfig) -> Self {
        Self {
            dal: Arc::new(dal),
            registry: Arc::new(registry),
            clock: Arc::new(SystemClock),
            config,
            worker_id: format!("worker-{}", Uuid::new_v4()),
            shutting_down: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Swaps in a test [`Clock`] (e.g. `ManualClock`). Must be called
    /// before `serve`/`start` so the cron loop and state machine agree on
    /// "now".
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn registry(&self) -> &ProcessTypeRegistry {
        &self.registry
    }

    // ---- lifecycle operations ----

    pub async fn create_process_record(
        &self,
        id: &str,
        process_type: &str,
        input_data: &str,
        schedule: Option<String>,
    ) -> OrchestratorResult<ProcessRecord> {
        if let Some(expr) = &schedule {
            CronSchedule::parse(expr)?;
        }
        if self.dal.process_records().exists(id).await? {
            return Err(OrchestratorError::DuplicateId(id.to_string()));
        }
        let record = NewProcessRecord::new(id, process_type, input_data, schedule);
        Ok(self.dal.process_records().create(record).await?)
    }

    /// `start` — enqueues a work unit for task index 0, `triggeredBy`
    /// defaulting to `MANUAL` (the cron loop calls [`Self::schedule_run`]
    /// directly for `SCHEDULED` runs).
    pub async fn start(&self, id: &str) -> OrchestratorResult<String> {
        self.start_with_trigger(id, TriggeredBy::Manual).await
    }

    async fn start_with_trigger(
        &self,
        id: &str,
        triggered_by: TriggeredBy,
    ) -> OrchestratorResult<String> {
        let record = self
            .dal
            .process_records()
            .find_by_id(id)
            .await
            .map_err(|_| OrchestratorError::NotFound(id.to_string()))?;

        if record.current_status == ProcessStatus::InProgress {
            return Err(OrchestratorError::InvalidState(
                id.to_string(),
                record.current_status,
            ));
        }

        // The record's `current_status` only flips to IN_PROGRESS once a
        // worker claims task index 0, so a freshly-enqueued-but-unclaimed
        // run still reads PENDING here. Guard on the queue directly too,
        // or two back-to-back `start` calls both pass the status check
        // and both enqueue a unit for the same record.
        if self.dal.work_queue().exists_for_process_record(id).await? {
            return Err(OrchestratorError::InvalidState(
                id.to_string(),
                record.current_status,
            ));
        }

        let process_type = self.registry.get_or_throw(&record.process_type)?;
        let now = UniversalTimestamp(self.clock.now());

        self.dal
            .process_records()
            .set_triggered_by(id, triggered_by, now)
            .await?;

        // A process type with no tasks completes immediately, with no
        // TaskInstances created.
        if process_type.tasks.is_empty() {
            self.dal.process_records().mark_started(id, now, 0).await?;
            self.dal.process_records().mark_completed(id, now).await?;
            return Ok(id.to_string());
        }

        let attempt_id = Uuid::new_v4().to_string();
        let unit_key = format!("{id}:{attempt_id}");
        let state = ProcessRunState {
            process_record_id: id.to_string(),
            process_type_name: record.process_type.clone(),
            current_task_index: 0,
            total_tasks: process_type.tasks.len() as i64,
            input_data: record.input_data.clone(),
            invocation_context: match triggered_by {
                TriggeredBy::Manual => "manual".to_string(),
                TriggeredBy::Scheduled => "cron".to_string(),
                TriggeredBy::Api => "api".to_string(),
            },
        };
        let unit = NewScheduledWorkUnit::new(unit_key.clone(), state.encode()?, now);
        self.dal.work_queue().enqueue(unit).await?;
        Ok(unit_key)
    }

    /// Marks a process record `STOPPED`; a unit already claimed for it
    /// is acked as a no-op the next time the state machine sees it.
    pub async fn stop(&self, id: &str) -> OrchestratorResult<()> {
        let record = self
            .dal
            .process_records()
            .find_by_id(id)
            .await
            .map_err(|_| OrchestratorError::NotFound(id.to_string()))?;

        if record.current_status != ProcessStatus::InProgress
            && record.current_status != ProcessStatus::Pending
        {
            return Err(OrchestratorError::InvalidState(
                id.to_string(),
                record.current_status,
            ));
        }

        let now = UniversalTimestamp(self.clock.now());
        self.dal.process_records().mark_stopped(id, now).await?;
        self.remove_outstanding_units(id).await?;
        Ok(())
    }

    /// `restart` — atomic stop (best effort) + start with a fresh
    /// task index and TaskInstance set.
    pub async fn restart(&self, id: &str) -> OrchestratorResult<String> {
        let record = self
            .dal
            .process_records()
            .find_by_id(id)
            .await
            .map_err(|_| OrchestratorError::NotFound(id.to_string()))?;

        let now = UniversalTimestamp(self.clock.now());
        if record.current_status == ProcessStatus::InProgress {
            self.remove_outstanding_units(id).await?;
        }
        self.dal.process_records().reset_for_restart(id, now).await?;
        self.start(id).await
    }

    pub async fn delete_process_record(&self, id: &str) -> OrchestratorResult<()> {
        let record = self
            .dal
            .process_records()
            .find_by_id(id)
            .await
            .map_err(|_| OrchestratorError::NotFound(id.to_string()))?;

        if record.current_status == ProcessStatus::InProgress {
            return Err(OrchestratorError::InvalidState(
                id.to_string(),
                record.current_status,
            ));
        }

        self.dal.process_records().delete(id).await?;
        Ok(())
    }

    pub async fn get_process_state(&self, id: &str) -> OrchestratorResult<ProcessRecord> {
        self.dal
            .process_records()
            .find_by_id(id)
            .await
            .map_err(|_| OrchestratorError::NotFound(id.to_string()))
    }

    pub async fn get_process_tasks(&self, id: &str) -> OrchestratorResult<Vec<TaskInstance>> {
        Ok(self.dal.task_instances().find_by_process_record_id(id).await?)
    }

    // ---- read queries ----

    pub async fn list_all(&self) -> OrchestratorResult<Vec<ProcessRecord>> {
        Ok(self.dal.process_records().find_all().await?)
    }

    pub async fn list_by_status(
        &self,
        status: ProcessStatus,
    ) -> OrchestratorResult<Vec<ProcessRecord>> {
        Ok(self.dal.process_records().find_by_status(status).await?)
    }

    pub async fn statistics(&self) -> OrchestratorResult<Statistics> {
        let records = self.dal.process_records().find_all().await?;
        let mut stats = Statistics {
            total: records.len() as i64,
            ..Default::default()
        };
        for record in &records {
            match record.current_status {
                ProcessStatus::Pending => stats.pending += 1,
                ProcessStatus::InProgress => stats.in_progress += 1,
                ProcessStatus::Completed => stats.completed += 1,
                ProcessStatus::Failed => stats.failed += 1,
                ProcessStatus::Stopped => stats.stopped += 1,
            }
            if record.schedule.is_some() {
                stats.scheduled += 1;
            }
        }
        Ok(stats)
    }

    pub async fn get_task_details(&self, task_id: &str) -> OrchestratorResult<TaskInstance> {
        self.dal
            .task_instances()
            .find_by_id(task_id)
            .await
            .map_err(|_| OrchestratorError::NotFound(task_id.to_string()))
    }

    pub fn register_process_type(&self, process_type: ProcessType) {
        self.registry.register(process_type);
    }

    async fn remove_outstanding_units(&self, record_id: &str) -> OrchestratorResult<()> {
        self.dal.work_queue().delete_for_process_record(record_id).await?;
        Ok(())
    }

    // ---- background machinery ----

    /// Runs the cron scheduling loop and worker pool until
    /// [`Self::shutdown`] is called. Intended to be spawned once by the
    /// binary entry point (`serve`).
    pub async fn serve(&self) -> OrchestratorResult<()> {
        let cron_tick = StdDuration::from_secs(self.config.cron_tick_secs);
        let poll_interval = StdDuration::from_secs_f64(self.config.poll_interval_ms as f64 / 1000.0);
        let heartbeat_deadline = chrono::Duration::seconds(self.config.heartbeat_deadline_secs as i64);
        let semaphore = Arc::new(Semaphore::new(self.config.workers));

        let cron_handle = self.clone().spawn_cron_loop(cron_tick);
        let reclaim_handle = self.clone().spawn_reclaim_loop(poll_interval, heartbeat_deadline);

        while !self.shutting_down.load(Ordering::SeqCst) {
            let now = UniversalTimestamp(self.clock.now());
            let units = self
                .dal
                .work_queue()
                .claim_due(&self.worker_id, self.config.workers as i64, now)
                .await?;

            for unit in units {
                let permit = semaphore.clone().acquire_owned().await.expect("semaphore closed");
                let this = self.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    this.run_claimed_unit(unit).await;
                });
            }

            tokio::time::sleep(poll_interval).await;
        }

        cron_handle.abort();
        reclaim_handle.abort();
        Ok(())
    }

    async fn run_claimed_unit(&self, unit: crate::models::ScheduledWorkUnit) {
        let key = unit.task_instance.clone();
        let heartbeat_interval =
            StdDuration::from_secs((self.config.heartbeat_deadline_secs / 3).max(1));
        let stop_heartbeat = Arc::new(AtomicBool::new(false));

        let heartbeat_handle: JoinHandle<()> = {
            let this = self.clone();
            let key = key.clone();
            let stop_heartbeat = stop_heartbeat.clone();
            tokio::spawn(async move {
                while !stop_heartbeat.load(Ordering::SeqCst) {
                    tokio::time::sleep(heartbeat_interval).await;
                    if stop_heartbeat.load(Ordering::SeqCst) {
                        break;
                    }
                    let now = UniversalTimestamp(this.clock.now());
                    if let Err(e) = this.dal.work_queue().heartbeat(&key, &this.worker_id, now).await
                    {
                        warn!(%key, error = %e, "heartbeat update failed");
                    }
                }
            })
        };

        let result = state_machine::run_unit(
            &self.dal,
            &self.registry,
            self.clock.as_ref(),
            &key,
            &unit.payload,
        )
        .await;

        stop_heartbeat.store(true, Ordering::SeqCst);
        heartbeat_handle.abort();

        let now = UniversalTimestamp(self.clock.now());
        match result {
            Ok(Ack::Complete) => {
                if let Err(e) = self.dal.work_queue().complete_success(&key, now).await {
                    error!(%key, error = %e, "failed to ack completed work unit");
                }
            }
            Ok(Ack::Rescheduled) => {
                // Already rescheduled by the state machine; nothing further to ack.
            }
            Err(e) => {
                error!(%key, error = %e, "state machine run failed");
                let retry_delay = state_machine::backoff(unit.consecutive_failures + 1);
                let next = UniversalTimestamp(now.as_datetime() + retry_delay);
                if let Err(e) = self.dal.work_queue().complete_failure(&key, next, now).await {
                    error!(%key, error = %e, "failed to record work unit failure");
                }
            }
        }
    }

    fn spawn_cron_loop(self, tick: StdDuration) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if self.shutting_down.load(Ordering::SeqCst) {
                    break;
                }
                if let Err(e) = self.run_cron_tick().await {
                    error!(error = %e, "cron tick failed");
                }
                tokio::time::sleep(tick).await;
            }
        })
    }

    /// One scan of the cron loop.
    async fn run_cron_tick(&self) -> OrchestratorResult<()> {
        let now = self.clock.now();
        let horizon = chrono::Duration::seconds(self.config.cron_horizon_secs as i64);
        let scheduled = self.dal.process_records().find_scheduled().await?;

        let mut last_runs: HashMap<String, chrono::DateTime<chrono::Utc>> = HashMap::new();

        for record in scheduled {
            if !matches!(
                record.current_status,
                ProcessStatus::Pending
                    | ProcessStatus::Completed
                    | ProcessStatus::Failed
                    | ProcessStatus::Stopped
            ) {
                continue;
            }
            let Some(expr) = &record.schedule else { continue };
            let schedule = match CronSchedule::parse(expr) {
                Ok(s) => s,
                Err(e) => {
                    warn!(record_id = %record.id, error = %e, "record has an invalid cron schedule");
                    continue;
                }
            };

            let last_run = last_runs
                .get(&record.id)
                .copied()
                .or_else(|| record.completed_when.map(|t| t.as_datetime()))
                .or_else(|| record.failed_when.map(|t| t.as_datetime()))
                .or_else(|| record.stopped_when.map(|t| t.as_datetime()))
                .unwrap_or_else(|| record.created_at.as_datetime());

            let next = match schedule.next(last_run) {
                Ok(n) => n,
                Err(_) => continue,
            };

            if next <= now + horizon
                && !self.dal.work_queue().exists_for_process_record(&record.id).await?
            {
                // One record's failure (e.g. its type was never registered)
                // must not starve every other scheduled record in this tick.
                if let Err(e) = self
                    .start_with_trigger(&record.id, TriggeredBy::Scheduled)
                    .await
                {
                    warn!(record_id = %record.id, error = %e, "scheduled start failed");
                    continue;
                }
                last_runs.insert(record.id.clone(), next);
            }
        }
        Ok(())
    }

    fn spawn_reclaim_loop(self, interval: StdDuration, deadline: chrono::Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if self.shutting_down.load(Ordering::SeqCst) {
                    break;
                }
                let now = UniversalTimestamp(self.clock.now());
                match self.dal.work_queue().reclaim_dead(now, deadline).await {
                    Ok(count) if count > 0 => {
                        info!(count, "reclaimed work units from presumed-dead workers")
                    }
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "reclaim_dead scan failed"),
                }
                tokio::time::sleep(interval).await;
            }
        })
    }

    /// Graceful shutdown: stop claiming new work and wait up to
    /// `drain_window` for in-flight tasks. Unfinished units are left
    /// for `reclaim_dead` to re-lease on the next startup.
    pub async fn shutdown(&self, drain_window: StdDuration) {
        self.shutting_down.store(true, Ordering::SeqCst);
        tokio::time::sleep(drain_window).await;
    }
}
