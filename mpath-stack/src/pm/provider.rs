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

//! Path-manager providers.
//!
//! A provider pairs a unique name with an endpoint-selection implementation.
//! Providers are immutable once registered; only their lifetime is subject to
//! the registry's concurrency discipline.

use std::{fmt, sync::Arc};

use crate::{
    pm::lifetime::ProviderLifetime,
    types::{AddressFamily, ConnectionId, EndpointCandidate},
};

/// Maximum length of a provider name in bytes.
pub const PROVIDER_NAME_MAX: usize = 16;

/// Name of the builtin provider that is always registered.
pub const BUILTIN_PROVIDER_NAME: &str = "default";

/// Endpoint selection for additional subflows of a multipath connection.
///
/// Implementations decide which local endpoint, if any, a connection should
/// open its next subflow from. Returning `None` proposes no additional
/// endpoint.
pub trait EndpointSelector: Send + Sync + 'static {
    /// Proposes a local endpoint for an additional subflow of `conn` in the
    /// given address family.
    fn select_endpoint(
        &self,
        conn: ConnectionId,
        family: AddressFamily,
    ) -> Option<EndpointCandidate>;
}

/// Validation errors for provider names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidProviderName {
    /// The name is empty.
    #[error("path manager name must not be empty")]
    Empty,
    /// The name exceeds [PROVIDER_NAME_MAX] bytes.
    #[error("path manager name exceeds {PROVIDER_NAME_MAX} bytes")]
    TooLong,
}

/// Unique, bounded name of a path-manager provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderName(Arc<str>);

impl ProviderName {
    /// Validates and wraps a provider name.
    pub fn new<S: AsRef<str>>(name: S) -> Result<Self, InvalidProviderName> {
        let name = name.as_ref();
        if name.is_empty() {
            return Err(InvalidProviderName::Empty);
        }
        if name.len() > PROVIDER_NAME_MAX {
            return Err(InvalidProviderName::TooLong);
        }
        Ok(ProviderName(Arc::from(name)))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProviderName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ProviderName {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for ProviderName {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// A registered path-manager provider.
///
/// Pairs a [ProviderName] with an [EndpointSelector] and the lifetime state
/// gating its removal. The selector is reachable only through a pinned
/// reference, so a provider that completed teardown can no longer be driven.
pub struct PathManagerProvider {
    name: ProviderName,
    selector: Arc<dyn EndpointSelector>,
    builtin: bool,
    lifetime: ProviderLifetime,
}

impl fmt::Debug for PathManagerProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathManagerProvider")
            .field("name", &self.name)
            .field("builtin", &self.builtin)
            .field("active_bindings", &self.active_bindings())
            .finish()
    }
}

impl PathManagerProvider {
    /// Creates a provider from a name and a selector implementation.
    pub fn new<S: EndpointSelector>(
        name: &str,
        selector: S,
    ) -> Result<Self, InvalidProviderName> {
        Ok(Self {
            name: ProviderName::new(name)?,
            selector: Arc::new(selector),
            builtin: false,
            lifetime: ProviderLifetime::new(),
        })
    }

    /// Creates the builtin provider. It proposes no additional endpoints and
    /// is never removed from the registry.
    pub(crate) fn new_builtin() -> Self {
        Self {
            // The builtin name is a valid constant.
            name: ProviderName(Arc::from(BUILTIN_PROVIDER_NAME)),
            selector: Arc::new(NoExtraEndpoints),
            builtin: true,
            lifetime: ProviderLifetime::new(),
        }
    }

    /// The provider's registered name.
    pub fn name(&self) -> &ProviderName {
        &self.name
    }

    /// Returns true for the builtin provider.
    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    /// Number of connections currently bound to this provider.
    pub fn active_bindings(&self) -> usize {
        self.lifetime.active()
    }

    pub(crate) fn lifetime(&self) -> &ProviderLifetime {
        &self.lifetime
    }

    pub(crate) fn selector(&self) -> &dyn EndpointSelector {
        self.selector.as_ref()
    }
}

/// Selector of the builtin provider: never proposes additional endpoints.
struct NoExtraEndpoints;

impl EndpointSelector for NoExtraEndpoints {
    fn select_endpoint(
        &self,
        _conn: ConnectionId,
        _family: AddressFamily,
    ) -> Option<EndpointCandidate> {
        None
    }
}
