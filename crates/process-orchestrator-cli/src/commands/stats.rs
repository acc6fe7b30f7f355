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

pub async fn run(orchestrator: &Orchestrator, json: bool) -> Result<()> {
    let stats = orchestrator.statistics().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("total:       {}", stats.total);
    println!("pending:     {}", stats.pending);
    println!("in_progress: {}", stats.in_progress);
    println!("completed:   {}", stats.completed);
    println!("failed:      {}", stats.failed);
    println!("stopped:     {}", stats.stopped);
    println!("scheduled:   {}", stats.scheduled);
    Ok(())
}
