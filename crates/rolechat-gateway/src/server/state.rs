//! Gateway state
//!
//! Shared dependencies of every socket task.

use crate::connection::ConnectionManager;
use rolechat_cache::ConnectionRegistry;
use rolechat_common::RealtimeConfig;
use rolechat_service::ServiceContext;
use std::sync::Arc;

/// Gateway application state
#[derive(Clone)]
pub struct GatewayState {
    service_context: Arc<ServiceContext>,
    connection_manager: Arc<ConnectionManager>,
    /// Cross-instance connection counts; without it only local
    /// connections decide when a user goes offline
    registry: Option<ConnectionRegistry>,
    realtime: RealtimeConfig,
}

impl GatewayState {
    pub fn new(
        service_context: ServiceContext,
        connection_manager: Arc<ConnectionManager>,
        realtime: RealtimeConfig,
    ) -> Self {
        Self {
            service_context: Arc::new(service_context),
            connection_manager,
            registry: None,
            realtime,
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: ConnectionRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    pub fn connection_manager(&self) -> &ConnectionManager {
        &self.connection_manager
    }

    pub fn connection_manager_shared(&self) -> &Arc<ConnectionManager> {
        &self.connection_manager
    }

    pub fn registry(&self) -> Option<&ConnectionRegistry> {
        self.registry.as_ref()
    }

    pub fn realtime(&self) -> &RealtimeConfig {
        &self.realtime
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("connection_manager", &self.connection_manager)
            .field("registry", &self.registry.is_some())
            .field("realtime", &self.realtime)
            .finish_non_exhaustive()
    }
}
