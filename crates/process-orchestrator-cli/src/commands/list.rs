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

use anyhow::Result;
use process_orchestrator::Orchestrator;

use crate::commands::parse_status;

pub async fn run(orchestrator: &Orchestrator, status: Option<&str>, json: bool) -> Result<()> {
    let records = match status {
        Some(raw) => orchestrator.list_by_status(parse_status(raw)?).await?,
        None => orchestrator.list_all().await?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("no process records");
        return Ok(());
    }

    println!("{:<20} {:<16} {:<12} {:<6} {}", "id", "type", "status", "task", "schedule");
    for record in &records {
        println!(
            "{:<20} {:<16} {:<12} {:<6} {}",
            record.id,
            record.process_type,
            record.current_status,
            format!("{}/{}", record.current_task_index, record.total_tasks),
            record.schedule.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}
