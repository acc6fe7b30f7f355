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

//! Error taxonomy for the orchestrator core.
//!
//! Every layer (store, executor, scheduling, public service) has its own
//! typed error enum so that callers can match on the failure kind rather
//! than parsing strings. `OrchestratorError` is the surface returned by
//! the public API and aggregates the lower layers.

use thiserror::Error;

/// Errors raised by the durable store and work queue.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to acquire a pooled database connection: {0}")]
    Pool(String),

    #[error("database query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("background interaction with the connection pool failed: {0}")]
    Interact(String),

    #[error("failed to run embedded migrations: {0}")]
    Migration(String),

    #[error("failed to (de)serialize stored JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("record not found")]
    NotFound,
}

impl StoreError {
    pub fn pool<E: std::fmt::Display>(e: E) -> Self {
        StoreError::Pool(e.to_string())
    }

    pub fn interact<E: std::fmt::Display>(e: E) -> Self {
        StoreError::Interact(e.to_string())
    }
}

/// Errors raised by the task executor.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("task timed out after {minutes} minutes")]
    Timeout { minutes: i64 },

    #[error("task failed with exit code {code}\nOutput: {output}")]
    NonZeroExit { code: i32, output: String },

    #[error("failed to launch subprocess: {0}")]
    Launch(String),
}

/// Errors raised when expanding `${var}` placeholders.
#[derive(Error, Debug)]
pub enum PlaceholderError {
    #[error("inputData is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Errors raised when parsing or stepping a cron expression.
#[derive(Error, Debug)]
pub enum CronError {
    #[error("invalid cron expression {expr:?}: {source}")]
    Invalid {
        expr: String,
        source: croner::errors::CronError,
    },

    #[error("cron expression {0:?} has no future occurrence")]
    NoUpcomingOccurrence(String),
}

/// Top-level error returned by the public `Orchestrator` API.
///
/// Only terminal failures are reported here; every variant maps 1:1 to
/// one of the user-facing error kinds the API can produce.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("process record {0:?} not found")]
    NotFound(String),

    #[error("process record {0:?} is in state {1:?} and cannot accept this operation")]
    InvalidState(String, crate::models::ProcessStatus),

    #[error("process type {0:?} is not registered")]
    UnknownProcessType(String),

    #[error("placeholder substitution failed: {0}")]
    PlaceholderMalformed(#[from] PlaceholderError),

    #[error("cron configuration is invalid: {0}")]
    Cron(#[from] CronError),

    #[error("durable store failure: {0}")]
    Store(#[from] StoreError),

    #[error("a process record with id {0:?} already exists")]
    DuplicateId(String),
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
