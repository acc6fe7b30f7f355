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

//! Process-Type Registry.
//!
//! A process-safe map from name to [`ProcessType`], populated once at
//! startup from a code-level declaration and read by every worker
//! thereafter. There is no mutation API beyond `register`: the registry
//! is effectively read-only once the orchestrator is serving traffic.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::OrchestratorError;
use crate::models::ProcessType;

#[derive(Debug, Default)]
pub struct ProcessTypeRegistry {
    types: RwLock<HashMap<String, ProcessType>>,
}

impl ProcessTypeRegistry {
    pub fn new() -> Self {
        Self {
            types: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `process_type` under its own name, overwriting any prior
    /// registration of the same name. Intended for bootstrap only.
    pub fn register(&self, process_type: ProcessType) {
        let mut types = self.types.write().expect("registry lock poisoned");
        types.insert(process_type.name.clone(), process_type);
    }

    pub fn get(&self, name: &str) -> Option<ProcessType> {
        let types = self.types.read().expect("registry lock poisoned");
        types.get(name).cloned()
    }

    /// Fails with a typed error rather than panicking when `name`
    /// isn't registered.
    pub fn get_or_throw(&self, name: &str) -> Result<ProcessType, OrchestratorError> {
        self.get(name)
            .ok_or_else(|| OrchestratorError::UnknownProcessType(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        let types = self.types.read().expect("registry lock poisoned");
        types.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskDefinition;

    fn sample() -> ProcessType {
        ProcessType::new(
            "backup",
            "nightly backup",
            vec![TaskDefinition::new("dump", "pg_dump mydb")],
        )
    }

    #[test]
    fn registered_type_is_retrievable() {
        let registry = ProcessTypeRegistry::new();
        registry.register(sample());
        assert!(registry.get("backup").is_some());
    }

    #[test]
    fn unregistered_type_errors() {
        let registry = ProcessTypeRegistry::new();
        assert!(matches!(
            registry.get_or_throw("missing"),
            Err(OrchestratorError::UnknownProcessType(_))
        ));
    }
}
