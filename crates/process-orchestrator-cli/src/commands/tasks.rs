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

pub async fn run(orchestrator: &Orchestrator, id: &str, json: bool) -> Result<()> {
    let tasks = orchestrator.get_process_tasks(id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }

    if tasks.is_empty() {
        println!("no task instances for {id:?}");
        return Ok(());
    }

    println!("{:<4} {:<20} {:<12} {:<5} {:<9} {}", "idx", "name", "status", "retry", "exit", "command");
    for task in &tasks {
        println!(
            "{:<4} {:<20} {:<12} {:<5} {:<9} {}",
            task.task_index,
            task.name,
            task.status,
            format!("{}/{}", task.retry_count, task.max_retries),
            task.exit_code.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string()),
            task.command,
        );
    }
    Ok(())
}
