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

pub async fn run(
    orchestrator: &Orchestrator,
    id: &str,
    process_type: &str,
    input: &str,
    schedule: Option<String>,
) -> Result<()> {
    serde_json::from_str::<serde_json::Value>(input)
        .map_err(|e| anyhow::anyhow!("--input is not valid JSON: {e}"))?;

    let record = orchestrator
        .create_process_record(id, process_type, input, schedule)
        .await?;
    println!("created process record {:?} (type {:?})", record.id, record.process_type);
    Ok(())
}
