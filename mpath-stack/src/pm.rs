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

//! Path-manager provider registry and per-connection binding.
//!
//! A path manager decides which additional endpoints a multipath connection
//! opens subflows from. Implementations register as providers under a unique
//! name; connections pick one at establishment, either the process-wide
//! default or an administrator-set override, and hold it pinned until
//! teardown.
//!
//! ## Lifecycle
//!
//! Providers move through `Registered -> PendingRemoval -> Reclaimed`.
//! [registry::PathManagerRegistry::unregister] publishes the removal for new
//! lookups, then waits until every connection still pinning the provider has
//! unbound. Only when it returns may the provider's backing resources be
//! released.
//!
//! ## Fallback
//!
//! The builtin provider (registered first, never removable) backs every
//! failure path: a connection whose requested provider is gone or mid-removal
//! is bound to the builtin instead, so binding never fails.

pub mod binding;
pub mod lifetime;
pub mod loader;
pub mod provider;
pub mod registry;

pub use binding::{ConnectionContext, PathManagerBinding};
pub use lifetime::ProviderPin;
pub use loader::{NoopLoader, ProviderLoader};
pub use provider::{
    BUILTIN_PROVIDER_NAME, EndpointSelector, InvalidProviderName, PROVIDER_NAME_MAX,
    PathManagerProvider, ProviderName,
};
pub use registry::{
    PathManagerConfig, PathManagerRegistry, PathManagerRegistryBuilder, RegisterError,
    ResolveError, UnregisterError,
};
