// Copyright 2025 Anapaya Systems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-connection provider binding.
//!
//! A connection binds a provider once at establishment and holds it pinned
//! for its whole lifetime; dropping the binding releases the pin. Binding
//! never fails observably: if the requested provider cannot be resolved or
//! pinned, the connection proceeds with the builtin provider.

use crate::{
    pm::{
        lifetime::ProviderPin,
        provider::ProviderName,
        registry::{PathManagerRegistry, ResolveError},
    },
    types::{AddressFamily, CallerPrivilege, ConnectionId, EndpointCandidate},
};

/// Pre-establishment state of one multipath connection.
///
/// Created by the connection subsystem before `bind`; carries the optional
/// administrator-set provider override.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    id: ConnectionId,
    override_name: Option<ProviderName>,
}

impl ConnectionContext {
    /// Creates a context for the connection `id` with no override.
    pub fn new(id: ConnectionId) -> Self {
        Self {
            id,
            override_name: None,
        }
    }

    /// The connection's identity.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The provider override recorded for this connection, if any.
    pub fn override_name(&self) -> Option<&ProviderName> {
        self.override_name.as_ref()
    }

    pub(crate) fn set_override(&mut self, name: ProviderName) {
        self.override_name = Some(name);
    }
}

/// The provider bound to one established connection.
///
/// Sole access path to the provider's endpoint selection. Dropping the
/// binding releases the pinned provider exactly once.
#[derive(Debug)]
pub struct PathManagerBinding {
    conn: ConnectionId,
    pin: ProviderPin,
}

impl PathManagerBinding {
    fn new(conn: ConnectionId, pin: ProviderPin) -> Self {
        Self { conn, pin }
    }

    /// The connection this binding belongs to.
    pub fn connection(&self) -> ConnectionId {
        self.conn
    }

    /// Name of the bound provider.
    pub fn provider_name(&self) -> &ProviderName {
        self.pin.provider().name()
    }

    /// Returns true if the connection runs on the builtin provider.
    pub fn is_builtin(&self) -> bool {
        self.pin.provider().is_builtin()
    }

    /// Asks the bound provider for an additional subflow endpoint.
    pub fn select_endpoint(&self, family: AddressFamily) -> Option<EndpointCandidate> {
        self.pin.select_endpoint(self.conn, family)
    }

    /// Rebinds the connection to the builtin provider, releasing the
    /// previously bound one.
    pub fn fall_back_to_builtin(&mut self, registry: &PathManagerRegistry) {
        if self.is_builtin() {
            return;
        }
        tracing::debug!(
            conn = %self.conn,
            from = %self.provider_name(),
            "Falling back to builtin path manager"
        );
        self.pin = registry.builtin_pin();
    }
}

impl PathManagerRegistry {
    /// Binds a provider to the connection described by `ctx`.
    ///
    /// An administrator-set override is resolved with autoload; otherwise the
    /// current default is used. If the resolved provider is being removed
    /// concurrently and can no longer be pinned, or the override does not
    /// resolve at all, the connection falls back to the builtin provider.
    /// Binding therefore always yields a usable provider.
    pub async fn bind(&self, ctx: &ConnectionContext) -> PathManagerBinding {
        let resolved = match ctx.override_name() {
            // The override was recorded by an administrator; autoload on
            // their behalf.
            Some(name) => self
                .resolve(Some(name.as_str()), true, CallerPrivilege::Admin)
                .await
                .ok(),
            None => Some(self.default_provider()),
        };

        let pin = match resolved.and_then(|provider| ProviderPin::try_new(&provider)) {
            Some(pin) => pin,
            None => {
                tracing::debug!(conn = %ctx.id(), "Binding fell back to builtin path manager");
                self.builtin_pin()
            }
        };

        tracing::debug!(conn = %ctx.id(), provider = %pin.provider().name(), "Bound path manager");
        PathManagerBinding::new(ctx.id(), pin)
    }

    /// Records a provider override on a not-yet-established connection.
    ///
    /// Requires the administrative capability. The name must resolve (with
    /// autoload) at record time; the provider is pinned later, at bind time.
    pub async fn set_override(
        &self,
        ctx: &mut ConnectionContext,
        name: &str,
        privilege: CallerPrivilege,
    ) -> Result<(), ResolveError> {
        if !privilege.is_admin() {
            tracing::warn!(conn = %ctx.id(), name = %name, "Unprivileged path manager override rejected");
            return Err(ResolveError::PermissionDenied);
        }

        let provider = self.resolve(Some(name), true, privilege).await?;
        ctx.set_override(provider.name().clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;
    use crate::pm::provider::{BUILTIN_PROVIDER_NAME, EndpointSelector, PathManagerProvider};

    /// Selector returning a fixed candidate.
    struct StaticSelector(Option<EndpointCandidate>);

    impl EndpointSelector for StaticSelector {
        fn select_endpoint(
            &self,
            _conn: ConnectionId,
            _family: AddressFamily,
        ) -> Option<EndpointCandidate> {
            self.0
        }
    }

    fn provider(name: &str) -> PathManagerProvider {
        PathManagerProvider::new(name, StaticSelector(None)).unwrap()
    }

    fn candidate() -> EndpointCandidate {
        EndpointCandidate {
            address: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
            low_priority: true,
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_bind_uses_default_without_override() {
        let registry = PathManagerRegistry::new();
        registry.register(provider("fullmesh")).unwrap();
        registry.set_default("fullmesh").await.unwrap();

        let binding = registry.bind(&ConnectionContext::new(ConnectionId(1))).await;
        assert_eq!(binding.provider_name(), "fullmesh");
        assert_eq!(binding.connection(), ConnectionId(1));
    }

    #[test_log::test(tokio::test)]
    async fn test_bind_honors_override() {
        let registry = PathManagerRegistry::new();
        registry.register(provider("fullmesh")).unwrap();
        registry.register(provider("ndiffports")).unwrap();
        registry.set_default("fullmesh").await.unwrap();

        let mut ctx = ConnectionContext::new(ConnectionId(2));
        registry
            .set_override(&mut ctx, "ndiffports", CallerPrivilege::Admin)
            .await
            .unwrap();

        let binding = registry.bind(&ctx).await;
        assert_eq!(binding.provider_name(), "ndiffports");
    }

    #[test_log::test(tokio::test)]
    async fn test_set_override_requires_admin() {
        let registry = PathManagerRegistry::new();
        let mut ctx = ConnectionContext::new(ConnectionId(3));

        // Unregistered name and unprivileged caller: the capability check
        // comes first.
        let err = registry
            .set_override(&mut ctx, "anything", CallerPrivilege::User)
            .await
            .unwrap_err();
        assert_eq!(err, ResolveError::PermissionDenied);
        assert!(ctx.override_name().is_none());

        // The connection still binds, using the default.
        let binding = registry.bind(&ctx).await;
        assert!(binding.is_builtin());
    }

    #[test_log::test(tokio::test)]
    async fn test_set_override_unknown_is_not_found() {
        let registry = PathManagerRegistry::new();
        let mut ctx = ConnectionContext::new(ConnectionId(4));

        let err = registry
            .set_override(&mut ctx, "missing", CallerPrivilege::Admin)
            .await
            .unwrap_err();
        assert_eq!(err, ResolveError::NotFound("missing".to_string()));
        assert!(ctx.override_name().is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_bind_falls_back_when_override_vanished() {
        let registry = PathManagerRegistry::new();
        registry.register(provider("ephemeral")).unwrap();

        let mut ctx = ConnectionContext::new(ConnectionId(5));
        registry
            .set_override(&mut ctx, "ephemeral", CallerPrivilege::Admin)
            .await
            .unwrap();
        registry.unregister("ephemeral").await.unwrap();

        let binding = registry.bind(&ctx).await;
        assert!(binding.is_builtin());
    }

    #[test_log::test(tokio::test)]
    async fn test_bind_falls_back_when_default_is_tearing_down() {
        let registry = PathManagerRegistry::new();
        registry.register(provider("doomed")).unwrap();
        registry.set_default("doomed").await.unwrap();

        // Simulate the teardown race: the provider is still the published
        // default but its pin gate is already closed.
        let doomed = registry.lookup("doomed").unwrap();
        doomed.lifetime().begin_teardown();

        let binding = registry.bind(&ConnectionContext::new(ConnectionId(6))).await;
        assert!(binding.is_builtin());
    }

    #[test_log::test(tokio::test)]
    async fn test_binding_drop_releases_pin() {
        let registry = PathManagerRegistry::new();
        registry.register(provider("counted")).unwrap();
        registry.set_default("counted").await.unwrap();
        let counted = registry.lookup("counted").unwrap();

        let binding = registry.bind(&ConnectionContext::new(ConnectionId(7))).await;
        assert_eq!(counted.active_bindings(), 1);
        drop(binding);
        assert_eq!(counted.active_bindings(), 0);
    }

    #[test_log::test(tokio::test)]
    async fn test_fall_back_to_builtin_releases_previous_provider() {
        let registry = PathManagerRegistry::new();
        registry.register(provider("replaced")).unwrap();
        registry.set_default("replaced").await.unwrap();
        let replaced = registry.lookup("replaced").unwrap();

        let mut binding = registry.bind(&ConnectionContext::new(ConnectionId(8))).await;
        assert_eq!(replaced.active_bindings(), 1);

        binding.fall_back_to_builtin(&registry);
        assert_eq!(replaced.active_bindings(), 0);
        assert!(binding.is_builtin());
        assert_eq!(binding.provider_name(), BUILTIN_PROVIDER_NAME);
    }

    #[test_log::test(tokio::test)]
    async fn test_select_endpoint_delegates_to_provider() {
        let registry = PathManagerRegistry::new();
        registry
            .register(PathManagerProvider::new("static", StaticSelector(Some(candidate()))).unwrap())
            .unwrap();
        registry.set_default("static").await.unwrap();

        let binding = registry.bind(&ConnectionContext::new(ConnectionId(9))).await;
        assert_eq!(binding.select_endpoint(AddressFamily::Ipv4), Some(candidate()));
        assert_eq!(binding.select_endpoint(AddressFamily::Ipv6), Some(candidate()));
    }
}
