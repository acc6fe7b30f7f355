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
use std::time::Duration;
use tracing::info;

/// Runs the worker pool and cron loop (`Orchestrator::serve`) until a
/// Ctrl-C or SIGTERM is received, then drains in-flight tasks for up to
/// `drain_seconds` before returning.
pub async fn run(orchestrator: Orchestrator, drain_seconds: u64) -> Result<()> {
    let serving = orchestrator.clone();
    let serve_handle = tokio::spawn(async move {
        if let Err(e) = serving.serve().await {
            tracing::error!(error = %e, "orchestrator serve loop exited with an error");
        }
    });

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, draining in-flight tasks");
    orchestrator
        .shutdown(Duration::from_secs(drain_seconds))
        .await;
    serve_handle.abort();
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
