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

//! Data Access Layer.
//!
//! One [`DAL`] wraps a single [`Database`] connection pool; each entity
//! gets its own `XxxDAL` view (`dal.process_records()`, `dal.task_instances()`,
//! `dal.work_queue()`) so call sites read as `dal.work_queue().claim_due(...)`
//! rather than a single struct accreting every query method. Every query
//! goes through `crate::dispatch_conn!`, so one set of Diesel statements
//! serves both the Postgres and SQLite pool variants.

pub mod process_record;
pub mod task_instance;
pub mod work_queue;

use crate::database::Database;

pub use process_record::ProcessRecordDAL;
pub use task_instance::TaskInstanceDAL;
pub use work_queue::WorkQueueDAL;

/// Entry point for all durable-store operations.
#[derive(Clone)]
pub struct DAL {
    database: Database,
}

impl DAL {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn process_records(&self) -> ProcessRecordDAL<'_> {
        ProcessRecordDAL::new(&self.database)
    }

    pub fn task_instances(&self) -> TaskInstanceDAL<'_> {
        TaskInstanceDAL::new(&self.database)
    }

    pub fn work_queue(&self) -> WorkQueueDAL<'_> {
        WorkQueueDAL::new(&self.database)
    }

    pub fn database(&self) -> &Database {
        &self.database
    }
}
