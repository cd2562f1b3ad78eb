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

//! On-demand provider loading.

use async_trait::async_trait;

use crate::pm::registry::PathManagerRegistry;

/// Hook bringing an unregistered provider into the process on demand.
///
/// The resolver invokes the loader outside any read section when a privileged
/// caller asks for a provider that is not registered. Implementations are
/// expected to register the named provider with `registry` as a side effect;
/// the resolver retries the lookup once afterwards. A load that cannot
/// produce the provider simply leaves the registry untouched.
#[async_trait]
pub trait ProviderLoader: Send + Sync {
    /// Attempts to load and register the provider known under `name`.
    async fn load(&self, registry: &PathManagerRegistry, name: &str);
}

/// Loader used when on-demand loading is unsupported.
///
/// Resolution of unregistered names reports not-found.
pub struct NoopLoader;

#[async_trait]
impl ProviderLoader for NoopLoader {
    async fn load(&self, _registry: &PathManagerRegistry, _name: &str) {}
}
