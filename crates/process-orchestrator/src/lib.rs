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

//! A durable, database-backed orchestrator for linear command pipelines.
//!
//! A *process type* declares an ordered list of external commands; a
//! *process record* is one user-owned instance of a process type, started
//! manually or fired by its cron schedule, and driven to completion one
//! task at a time by a lease-protected work queue shared across workers
//! and, if the store is shared, across nodes.
//!
//! The modules here are layered bottom-up:
//! - [`clock`] — wall clock abstraction and cron stepping.
//! - [`executor`] — subprocess launch, timeout, output capture.
//! - [`placeholder`] — `${var}` expansion against a record's input data.
//! - [`database`] and [`dal`] — the durable store, dispatched over Postgres
//!   or SQLite behind one schema.
//! - [`dal::work_queue`] (via [`dal`]) — the lease-based scheduled work
//!   queue.
//! - [`state_machine`] — advances one claimed work unit through the
//!   pipeline state machine.
//! - [`orchestrator`] — the public service: operations, cron loop, worker
//!   pool.
//! - [`registry`] — the in-memory process-type catalog.
//! - [`config`] — layered configuration.
//! - [`error`] — the error taxonomy shared by every layer.

pub mod clock;
pub mod config;
pub mod dal;
pub mod database;
pub mod error;
pub mod executor;
pub mod models;
pub mod orchestrator;
pub mod placeholder;
pub mod registry;
pub mod state_machine;

pub use clock::{Clock, CronSchedule, ManualClock, SystemClock};
pub use dal::DAL;
pub use database::Database;
pub use error::{OrchestratorError, OrchestratorResult};
pub use models::{ProcessRecord, ProcessStatus, ProcessType, TaskDefinition, TaskInstance, TriggeredBy};
pub use orchestrator::{Orchestrator, Statistics};
pub use registry::ProcessTypeRegistry;
