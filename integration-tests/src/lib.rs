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

//! Shared fixtures for the multipath-stack integration tests.

use std::net::{IpAddr, Ipv4Addr};

use mpath_stack::{
    pm::{EndpointSelector, PathManagerProvider, PathManagerRegistry},
    types::{AddressFamily, ConnectionId, EndpointCandidate},
};

/// Selector answering every request with the same candidate.
pub struct StaticSelector(pub Option<EndpointCandidate>);

impl EndpointSelector for StaticSelector {
    fn select_endpoint(
        &self,
        _conn: ConnectionId,
        _family: AddressFamily,
    ) -> Option<EndpointCandidate> {
        self.0
    }
}

/// A distinct per-`seed` endpoint candidate.
pub fn test_candidate(seed: u8) -> EndpointCandidate {
    EndpointCandidate {
        address: IpAddr::V4(Ipv4Addr::new(10, 0, 0, seed)),
        low_priority: false,
    }
}

/// A provider named `name` with a static test selector.
pub fn test_provider(name: &str, seed: u8) -> PathManagerProvider {
    PathManagerProvider::new(name, StaticSelector(Some(test_candidate(seed)))).unwrap()
}

/// A registry pre-populated with one test provider per name, builtin default.
pub fn registry_with(names: &[&str]) -> PathManagerRegistry {
    let registry = PathManagerRegistry::new();
    for (idx, name) in names.iter().enumerate() {
        registry
            .register(test_provider(name, idx as u8 + 1))
            .unwrap();
    }
    registry
}
