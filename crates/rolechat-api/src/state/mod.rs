//! Application state
//!
//! Holds the service context shared by every handler, plus the connection
//! pools the readiness probe checks.

use std::sync::Arc;

use rolechat_cache::RedisPool;
use rolechat_common::JwtService;
use rolechat_db::PgPool;
use rolechat_service::ServiceContext;

/// Pools behind the service context, kept for health probes
#[derive(Clone, Debug)]
pub struct Infra {
    pub pool: PgPool,
    pub redis: RedisPool,
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    service_context: Arc<ServiceContext>,
    infra: Option<Infra>,
}

impl AppState {
    pub fn new(service_context: ServiceContext, infra: Infra) -> Self {
        Self {
            service_context: Arc::new(service_context),
            infra: Some(infra),
        }
    }

    /// State without backing pools; readiness always reports unavailable
    pub fn detached(service_context: ServiceContext) -> Self {
        Self {
            service_context: Arc::new(service_context),
            infra: None,
        }
    }

    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    pub fn infra(&self) -> Option<&Infra> {
        self.infra.as_ref()
    }

    pub fn jwt_service(&self) -> &JwtService {
        self.service_context.jwt_service()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service_context", &"ServiceContext")
            .field("infra", &self.infra.is_some())
            .finish()
    }
}
