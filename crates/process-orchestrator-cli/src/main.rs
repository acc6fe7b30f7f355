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

// Enforce exactly one database backend is selected
#[cfg(all(feature = "postgres", feature = "sqlite"))]
compile_error!("Cannot enable both 'postgres' and 'sqlite' features simultaneously");

#[cfg(not(any(feature = "postgres", feature = "sqlite")))]
compile_error!("Must enable exactly one database backend: either 'postgres' or 'sqlite'");

mod cli;
mod commands;
mod logging;
mod process_types;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use process_orchestrator::config::ConfigLoader;
use process_orchestrator::{Database, Orchestrator, ProcessTypeRegistry, DAL};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(&cli);

    let config = ConfigLoader::new().load(cli.config.as_deref())?;
    let database = Database::connect(&config.database)?;
    let dal = DAL::new(database);

    let registry = ProcessTypeRegistry::new();
    for process_type in process_types::load(&process_types::default_path())? {
        registry.register(process_type);
    }

    let orchestrator = Orchestrator::new(dal, registry, config.orchestrator);

    match cli.command {
        Commands::Create {
            id,
            process_type,
            input,
            schedule,
        } => commands::create::run(&orchestrator, &id, &process_type, &input, schedule).await?,
        Commands::Start { id } => commands::start::run(&orchestrator, &id).await?,
        Commands::Stop { id } => commands::stop::run(&orchestrator, &id).await?,
        Commands::Restart { id } => commands::restart::run(&orchestrator, &id).await?,
        Commands::Delete { id } => commands::delete::run(&orchestrator, &id).await?,
        Commands::Show { id, json } => commands::show::run(&orchestrator, &id, json).await?,
        Commands::Tasks { id, json } => commands::tasks::run(&orchestrator, &id, json).await?,
        Commands::List { status, json } => {
            commands::list::run(&orchestrator, status.as_deref(), json).await?
        }
        Commands::Stats { json } => commands::stats::run(&orchestrator, json).await?,
        Commands::Serve { drain_seconds } => commands::serve::run(orchestrator, drain_seconds).await?,
    }

    Ok(())
}
