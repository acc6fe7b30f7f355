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

//! Diesel schema definitions, shared between the Postgres and SQLite
//! backends. Every column uses a type that both backends natively
//! support (`Text`, `BigInt`, `Integer`, `Bool`, `Binary`), so the same
//! `table!` definitions and model structs serve both — see
//! `database::universal_types` for how identifiers and timestamps are
//! kept as `Text` across the boundary.

diesel::table! {
    process_records (id) {
        id -> Text,
        process_type -> Text,
        input_data -> Text,
        schedule -> Nullable<Text>,
        current_status -> Text,
        current_task_index -> BigInt,
        total_tasks -> BigInt,
        started_when -> Nullable<Text>,
        completed_when -> Nullable<Text>,
        failed_when -> Nullable<Text>,
        stopped_when -> Nullable<Text>,
        last_error_message -> Nullable<Text>,
        triggered_by -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    task_instances (id) {
        id -> Text,
        process_record_id -> Text,
        task_index -> BigInt,
        name -> Text,
        command -> Text,
        working_directory -> Nullable<Text>,
        timeout_minutes -> BigInt,
        max_retries -> Integer,
        retry_count -> Integer,
        status -> Text,
        started_at -> Nullable<Text>,
        completed_at -> Nullable<Text>,
        exit_code -> Nullable<Integer>,
        output -> Nullable<Text>,
        error_message -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    scheduled_work_units (task_name, task_instance) {
        task_name -> Text,
        task_instance -> Text,
        payload -> Binary,
        execution_time -> Text,
        picked -> Bool,
        picked_by -> Nullable<Text>,
        last_success -> Nullable<Text>,
        last_failure -> Nullable<Text>,
        consecutive_failures -> Integer,
        last_heartbeat -> Nullable<Text>,
        version -> BigInt,
    }
}

diesel::joinable!(task_instances -> process_records (process_record_id));
diesel::allow_tables_to_appear_in_same_query!(process_records, task_instances);
