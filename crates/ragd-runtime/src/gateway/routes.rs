use axum::Router;

use ragd_core::error::{RagdError, Result};

use super::server::GatewayState;

/// Builds the routes of one provider.
pub type RouteBuilder = fn() -> Router<GatewayState>;

/// Static descriptor of a group of routes.
#[derive(Clone, Copy)]
pub struct RouteProvider {
    /// Unique provider name, used in logs.
    pub name: &'static str,
    /// Builder for the provider's routes.
    pub build: RouteBuilder,
}

impl RouteProvider {
    pub const fn new(name: &'static str, build: RouteBuilder) -> Self {
        Self { name, build }
    }
}

impl std::fmt::Debug for RouteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteProvider")
            .field("name", &self.name)
            .finish()
    }
}

/// Ordered set of route providers assembled at startup.
#[derive(Debug, Clone, Default)]
pub struct RouteRegistry {
    providers: Vec<RouteProvider>,
}

impl RouteRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from a static provider list.
    pub fn from_providers(providers: &[RouteProvider]) -> Result<Self> {
        let mut registry = Self::new();
        for provider in providers {
            registry.register(*provider)?;
        }
        Ok(registry)
    }

    /// Register a provider. Names must be unique.
    pub fn register(&mut self, provider: RouteProvider) -> Result<()> {
        if self.providers.iter().any(|p| p.name == provider.name) {
            return Err(RagdError::Gateway(format!(
                "Route provider '{}' registered twice",
                provider.name
            )));
        }
        self.providers.push(provider);
        Ok(())
    }

    /// Get all provider names in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name).collect()
    }

    /// Merge every provider's routes into one router.
    pub fn mount(&self) -> Router<GatewayState> {
        self.providers
            .iter()
            .fold(Router::new(), |router, provider| {
                tracing::debug!(provider = provider.name, "Mounting routes");
                router.merge((provider.build)())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;

    fn ping_routes() -> Router<GatewayState> {
        Router::new().route("/ping", get(|| async { "pong" }))
    }

    fn echo_routes() -> Router<GatewayState> {
        Router::new().route("/echo", get(|| async { "echo" }))
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = RouteRegistry::new();
        registry
            .register(RouteProvider::new("ping", ping_routes))
            .unwrap();
        let err = registry
            .register(RouteProvider::new("ping", echo_routes))
            .unwrap_err();
        assert!(matches!(err, RagdError::Gateway(_)));
        assert_eq!(registry.names(), vec!["ping"]);
    }

    #[test]
    fn test_from_providers_keeps_order() {
        let registry = RouteRegistry::from_providers(&[
            RouteProvider::new("ping", ping_routes),
            RouteProvider::new("echo", echo_routes),
        ])
        .unwrap();

        assert_eq!(registry.names(), vec!["ping", "echo"]);
    }
}
