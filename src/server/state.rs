//! Application state for the HTTP server

use crate::config::{Config, QualityConfig};
use crate::core::registry::{RetentionPolicy, TaskRegistry};
use crate::services::Services;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Shared state handed to every route handler (cheap to clone).
///
/// The registry is the only state background tasks mutate; config and the
/// base quality are read-only.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<TaskRegistry>,
    pub services: Services,
    pub config: Arc<Config>,
    pub base_quality: QualityConfig,
    /// Bounds how many downloads run at once.
    pub workers: Arc<Semaphore>,
}

impl AppState {
    pub fn new(services: Services, config: Config) -> Self {
        let registry = TaskRegistry::new(RetentionPolicy {
            ttl: Some(config.task_ttl()),
            max_tasks: Some(config.max_tasks),
        });
        Self {
            registry: Arc::new(registry),
            services,
            base_quality: QualityConfig::from_config(&config),
            workers: Arc::new(Semaphore::new(config.max_concurrent_tasks.max(1))),
            config: Arc::new(config),
        }
    }
}
