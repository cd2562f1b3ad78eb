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

//! # The multipath endhost stack.
//!
//! Building blocks for multipath transport endpoints. The crate's core is the
//! [pm] module: a process-wide registry of interchangeable path-manager
//! providers with safe concurrent lifecycle management. Connection
//! establishment is a lock-free read; registration, removal and default
//! changes are serialized administrative writes that never block readers.
//!
//! ## Basic usage
//!
//! ```
//! use mpath_stack::{
//!     pm::{ConnectionContext, PathManagerRegistry},
//!     types::{AddressFamily, ConnectionId},
//! };
//!
//! # async fn bind_example() {
//! let registry = PathManagerRegistry::builder()
//!     .with_default_provider("fullmesh")
//!     .build()
//!     .await;
//!
//! // Per connection: bind at establishment, select endpoints while
//! // established, drop the binding at teardown.
//! let ctx = ConnectionContext::new(ConnectionId(7));
//! let binding = registry.bind(&ctx).await;
//! let _candidate = binding.select_endpoint(AddressFamily::Ipv4);
//! # }
//! ```
//!
//! ## Registering a provider
//!
//! ```
//! use mpath_stack::{
//!     pm::{EndpointSelector, PathManagerProvider, PathManagerRegistry},
//!     types::{AddressFamily, ConnectionId, EndpointCandidate},
//! };
//!
//! struct SingleHomed;
//!
//! impl EndpointSelector for SingleHomed {
//!     fn select_endpoint(
//!         &self,
//!         _conn: ConnectionId,
//!         _family: AddressFamily,
//!     ) -> Option<EndpointCandidate> {
//!         // No additional endpoints on a single-homed host.
//!         None
//!     }
//! }
//!
//! # async fn register_example() {
//! let registry = PathManagerRegistry::new();
//! registry
//!     .register(PathManagerProvider::new("singlehomed", SingleHomed).unwrap())
//!     .unwrap();
//! registry.set_default("singlehomed").await.unwrap();
//! # }
//! ```

pub mod pm;
pub mod types;
