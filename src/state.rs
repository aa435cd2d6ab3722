//! Application state wiring.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::graph::OxigraphEngine;
use crate::service::ValidatorService;
use crate::store::{MemorySchemaStore, MemoryTemplateStore, SchemaStore, TemplateStore};
use crate::validator::{
    JsonSchemaManager, PlainJsonValidator, ResourceManager, SemanticValidator,
    ShaclTemplateManager, Validator,
};

/// Shared state handed to every request handler.
pub struct AppState {
    config: Arc<ServerConfig>,
    service: ValidatorService,
}

impl AppState {
    /// Wire the in-memory stores, the graph engine and both validation
    /// strategies into a ready-to-serve state.
    pub fn new(config: ServerConfig) -> Self {
        let schemas: Arc<dyn SchemaStore> = Arc::new(MemorySchemaStore::new());
        let templates: Arc<dyn TemplateStore> = Arc::new(MemoryTemplateStore::new());
        let engine = Arc::new(OxigraphEngine::new());

        let validators: Vec<Arc<dyn Validator>> = vec![
            Arc::new(PlainJsonValidator::new(Arc::clone(&schemas))),
            Arc::new(SemanticValidator::new(Arc::clone(&templates), engine)),
        ];
        let managers: Vec<Arc<dyn ResourceManager>> = vec![
            Arc::new(JsonSchemaManager::new(schemas)),
            Arc::new(ShaclTemplateManager::new(templates)),
        ];

        Self {
            config: Arc::new(config),
            service: ValidatorService::new(validators, managers),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn service(&self) -> &ValidatorService {
        &self.service
    }
}
