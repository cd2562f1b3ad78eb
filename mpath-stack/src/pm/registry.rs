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

//! Process-wide registry of path-manager providers.
//!
//! Connection establishment looks providers up on every bind, while
//! registration and default changes are rare administrative events. The
//! registry therefore keeps the provider list behind an `ArcSwap`: readers
//! load a consistent snapshot without blocking, writers clone the list,
//! mutate the copy and publish it atomically while serialized on a mutex.
//!
//! Removal is two-phase. The provider disappears from the published list and
//! its pin gate closes, then the removing caller waits until every
//! connection still pinning the provider has released it. Only after that
//! wait returns may the provider's backing resources be reclaimed.
//!
//! The first list entry is the current default provider. The builtin
//! provider registers at construction and is never removed, so the list is
//! never empty and a default always exists.

use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use serde::Deserialize;

use crate::{
    pm::{
        lifetime::ProviderPin,
        loader::{NoopLoader, ProviderLoader},
        provider::{PathManagerProvider, ProviderName},
    },
    types::CallerPrivilege,
};

/// Errors reported by [PathManagerRegistry::register].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegisterError {
    /// A provider with the same name is already registered.
    #[error("path manager `{0}` is already registered")]
    AlreadyExists(ProviderName),
}

/// Errors reported by [PathManagerRegistry::unregister].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnregisterError {
    /// No provider with this name is registered.
    #[error("path manager `{0}` is not registered")]
    NotRegistered(String),
    /// The builtin provider cannot be unregistered.
    #[error("the builtin path manager cannot be unregistered")]
    Builtin,
}

/// Errors reported by name resolution and the operations built on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The name does not resolve, even after an autoload attempt.
    #[error("path manager `{0}` is not available")]
    NotFound(String),
    /// The operation requires the administrative capability.
    #[error("administrative capability required")]
    PermissionDenied,
}

/// Startup configuration of the path-manager registry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathManagerConfig {
    /// Provider to promote to default at startup. If it is absent and cannot
    /// be loaded, the builtin provider stays default.
    #[serde(default)]
    pub default_provider: Option<String>,
}

struct RegistryInner {
    /// Published provider list; the first entry is the current default.
    providers: ArcSwap<Vec<Arc<PathManagerProvider>>>,
    /// Serializes writers. Held across mutation and publish, never across
    /// the drain wait of a removal.
    write_lock: Mutex<()>,
    builtin: Arc<PathManagerProvider>,
    loader: Arc<dyn ProviderLoader>,
}

/// Registry of path-manager providers, selectable per connection.
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct PathManagerRegistry {
    inner: Arc<RegistryInner>,
}

impl PathManagerRegistry {
    /// Creates a registry without on-demand loading. The builtin provider is
    /// registered and is the initial default.
    pub fn new() -> Self {
        Self::with_loader(Arc::new(NoopLoader))
    }

    /// Returns a builder for a registry with a loader and startup default.
    pub fn builder() -> PathManagerRegistryBuilder {
        PathManagerRegistryBuilder::new()
    }

    fn with_loader(loader: Arc<dyn ProviderLoader>) -> Self {
        let builtin = Arc::new(PathManagerProvider::new_builtin());
        Self {
            inner: Arc::new(RegistryInner {
                providers: ArcSwap::from_pointee(vec![builtin.clone()]),
                write_lock: Mutex::new(()),
                builtin,
                loader,
            }),
        }
    }

    /// Registers a provider under its name.
    ///
    /// The provider is appended to the list; it does not become default
    /// unless promoted via [PathManagerRegistry::set_default].
    pub fn register(&self, provider: PathManagerProvider) -> Result<(), RegisterError> {
        self.register_arc(Arc::new(provider))
    }

    fn register_arc(&self, provider: Arc<PathManagerProvider>) -> Result<(), RegisterError> {
        let _guard = self.inner.write_lock.lock().unwrap();
        let current = self.inner.providers.load_full();
        if current.iter().any(|p| p.name() == provider.name()) {
            tracing::warn!(name = %provider.name(), "Path manager already registered");
            return Err(RegisterError::AlreadyExists(provider.name().clone()));
        }

        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend(current.iter().cloned());
        next.push(provider.clone());
        self.inner.providers.store(Arc::new(next));

        tracing::info!(name = %provider.name(), "Registered path manager");
        Ok(())
    }

    /// Unregisters the provider named `name` and waits until no connection
    /// references it anymore.
    ///
    /// New lookups miss the provider as soon as the removal is published;
    /// connections that already pinned it keep it alive until they unbind.
    /// When this returns, the provider's backing resources may be reclaimed.
    pub async fn unregister(&self, name: &str) -> Result<(), UnregisterError> {
        let provider = {
            let _guard = self.inner.write_lock.lock().unwrap();
            let current = self.inner.providers.load_full();
            let Some(pos) = current.iter().position(|p| p.name() == name) else {
                return Err(UnregisterError::NotRegistered(name.to_string()));
            };
            if current[pos].is_builtin() {
                return Err(UnregisterError::Builtin);
            }

            let mut next = current.as_ref().clone();
            let provider = next.remove(pos);
            self.inner.providers.store(Arc::new(next));
            // Close the pin gate only after the removal is published: a bind
            // racing us either misses the provider in the new list or loses
            // its pin attempt and falls back.
            provider.lifetime().begin_teardown();
            provider
        };

        tracing::info!(
            name = %provider.name(),
            active_bindings = provider.active_bindings(),
            "Unregistering path manager"
        );
        provider.lifetime().wait_drained().await;
        tracing::info!(name = %provider.name(), "Path manager drained");
        Ok(())
    }

    /// Looks up a provider by name in the current snapshot.
    pub fn lookup(&self, name: &str) -> Option<Arc<PathManagerProvider>> {
        self.inner
            .providers
            .load()
            .iter()
            .find(|p| p.name() == name)
            .cloned()
    }

    /// The current default provider (front of the list).
    pub fn default_provider(&self) -> Arc<PathManagerProvider> {
        self.inner
            .providers
            .load()
            .first()
            .cloned()
            // The list always contains at least the builtin provider.
            .unwrap_or_else(|| self.inner.builtin.clone())
    }

    /// Name of the current default provider.
    pub fn default_provider_name(&self) -> ProviderName {
        self.default_provider().name().clone()
    }

    /// Names of all registered providers, default first.
    pub fn provider_names(&self) -> Vec<ProviderName> {
        self.inner
            .providers
            .load()
            .iter()
            .map(|p| p.name().clone())
            .collect()
    }

    /// Promotes the provider named `name` to default, loading it on demand
    /// if necessary.
    ///
    /// The promoted entry moves to the front of the list; the relative order
    /// of the remaining entries is preserved.
    pub async fn set_default(&self, name: &str) -> Result<(), ResolveError> {
        let provider = match self
            .resolve(Some(name), true, CallerPrivilege::Admin)
            .await
        {
            Ok(provider) => provider,
            Err(err) => {
                tracing::info!(name = %name, "Path manager is not available");
                return Err(err);
            }
        };

        let _guard = self.inner.write_lock.lock().unwrap();
        let current = self.inner.providers.load_full();
        let Some(pos) = current.iter().position(|p| p.name() == provider.name()) else {
            // Unregistered between the resolve and taking the writer lock.
            return Err(ResolveError::NotFound(name.to_string()));
        };
        if pos == 0 {
            return Ok(());
        }

        let mut next = current.as_ref().clone();
        let promoted = next.remove(pos);
        next.insert(0, promoted);
        self.inner.providers.store(Arc::new(next));

        tracing::info!(name = %name, "Set default path manager");
        Ok(())
    }

    /// Resolves a provider by name, or the current default if no name is
    /// given.
    ///
    /// A missing name is autoloaded iff `allow_autoload` is set and the
    /// caller is privileged. Loading may itself register a provider, which
    /// is a write, so the loader runs outside any read section and the
    /// lookup is retried once afterwards.
    pub async fn resolve(
        &self,
        name: Option<&str>,
        allow_autoload: bool,
        privilege: CallerPrivilege,
    ) -> Result<Arc<PathManagerProvider>, ResolveError> {
        let Some(name) = name else {
            return Ok(self.default_provider());
        };

        if let Some(provider) = self.lookup(name) {
            return Ok(provider);
        }

        if allow_autoload && privilege.is_admin() {
            tracing::debug!(name = %name, "Requesting on-demand load of path manager");
            self.inner.loader.load(self, name).await;
            if let Some(provider) = self.lookup(name) {
                return Ok(provider);
            }
        }

        Err(ResolveError::NotFound(name.to_string()))
    }

    /// Pins the builtin provider. Cannot fail; the builtin never tears down.
    pub(crate) fn builtin_pin(&self) -> ProviderPin {
        ProviderPin::new_builtin(&self.inner.builtin)
    }
}

impl Default for PathManagerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a [PathManagerRegistry].
///
/// # Example
///
/// ```
/// use mpath_stack::pm::registry::PathManagerRegistry;
///
/// async fn setup_registry() {
///     let registry = PathManagerRegistry::builder()
///         .with_default_provider("fullmesh")
///         .build()
///         .await;
/// }
/// ```
pub struct PathManagerRegistryBuilder {
    loader: Arc<dyn ProviderLoader>,
    default_provider: Option<String>,
}

impl PathManagerRegistryBuilder {
    /// Creates a builder without on-demand loading or a configured default.
    pub fn new() -> Self {
        Self {
            loader: Arc::new(NoopLoader),
            default_provider: None,
        }
    }

    /// Creates a builder from a startup configuration.
    pub fn from_config(config: PathManagerConfig) -> Self {
        let mut builder = Self::new();
        builder.default_provider = config.default_provider;
        builder
    }

    /// Sets the loader invoked for on-demand provider loading.
    pub fn with_loader(mut self, loader: impl ProviderLoader + 'static) -> Self {
        self.loader = Arc::new(loader);
        self
    }

    /// Sets the provider to promote to default at startup.
    pub fn with_default_provider(mut self, name: impl Into<String>) -> Self {
        self.default_provider = Some(name.into());
        self
    }

    /// Builds the registry and applies the configured default once.
    ///
    /// If the configured default is absent and cannot be loaded, the builtin
    /// provider stays at the front; this is logged, not an error.
    pub async fn build(self) -> PathManagerRegistry {
        let registry = PathManagerRegistry::with_loader(self.loader);
        if let Some(name) = self.default_provider {
            // Best effort; set_default logs an unavailable provider.
            let _ = registry.set_default(&name).await;
        }
        registry
    }
}

impl Default for PathManagerRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
