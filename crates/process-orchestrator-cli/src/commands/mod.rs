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

//! One module per subcommand, each a thin wrapper translating CLI
//! arguments into a single `process_orchestrator::Orchestrator` call and
//! rendering the result.

pub mod create;
pub mod delete;
pub mod list;
pub mod restart;
pub mod serve;
pub mod show;
pub mod start;
pub mod stats;
pub mod stop;
pub mod tasks;

use process_orchestrator::ProcessStatus;

/// Parses a `--status` CLI argument into a [`ProcessStatus`], matching
/// a `ProcessStatus` name case-insensitively.
pub fn parse_status(raw: &str) -> anyhow::Result<ProcessStatus> {
    raw.to_uppercase()
        .parse::<ProcessStatus>()
        .map_err(|e| anyhow::anyhow!(e))
}
