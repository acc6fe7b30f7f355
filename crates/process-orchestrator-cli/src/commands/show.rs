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
    let state = orchestrator.get_process_state(id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    println!("id:            {}", state.id);
    println!("type:          {}", state.process_type);
    println!("status:        {}", state.current_status);
    println!("task:          {}/{}", state.current_task_index, state.total_tasks);
    println!("schedule:      {}", state.schedule.as_deref().unwrap_or("-"));
    println!("triggered_by:  {}", state.triggered_by.as_deref().unwrap_or("-"));
    println!("started_when:  {}", format_ts(state.started_when));
    println!("completed_when:{}", format_ts(state.completed_when));
    println!("failed_when:   {}", format_ts(state.failed_when));
    println!("stopped_when:  {}", format_ts(state.stopped_when));
    if let Some(message) = &state.last_error_message {
        println!("last_error:    {message}");
    }
    Ok(())
}

fn format_ts(ts: Option<process_orchestrator::database::universal_types::UniversalTimestamp>) -> String {
    ts.map(|t| t.to_string()).unwrap_or_else(|| "-".to_string())
}
