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

//! Shared types of the multipath stack.

use std::{fmt, net::IpAddr};

/// Identity of one multipath connection.
///
/// Assigned by the connection subsystem; opaque to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Address family a subflow endpoint is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    /// IPv4.
    Ipv4,
    /// IPv6.
    Ipv6,
}

/// A local endpoint candidate proposed by a path manager for an additional
/// subflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointCandidate {
    /// The candidate local address.
    pub address: IpAddr,
    /// Subflows over this endpoint should only carry traffic when no
    /// regular-priority subflow is usable.
    pub low_priority: bool,
}

/// Administrative capability of a caller.
///
/// The actual permission check happens outside this crate; callers pass in
/// its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerPrivilege {
    /// The caller holds the administrative capability.
    Admin,
    /// The caller is unprivileged.
    User,
}

impl CallerPrivilege {
    /// Returns true if the caller holds the administrative capability.
    pub fn is_admin(self) -> bool {
        matches!(self, CallerPrivilege::Admin)
    }
}
