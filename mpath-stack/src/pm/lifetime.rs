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

//! Provider lifetime management.
//!
//! Every provider carries a pin count of the connections referencing it.
//! Removal closes a gate against new pins, then waits for the count to drain
//! to zero before the provider's backing resources may be reclaimed.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use tokio::sync::Notify;

use crate::{
    pm::provider::PathManagerProvider,
    types::{AddressFamily, ConnectionId, EndpointCandidate},
};

/// Lifetime state embedded in every provider.
pub(crate) struct ProviderLifetime {
    /// Live pins held by connections.
    pins: AtomicUsize,
    /// Once set, no new pin may be acquired.
    removing: AtomicBool,
    /// Signalled whenever the pin count drops to zero.
    drained: Notify,
}

impl ProviderLifetime {
    pub(crate) fn new() -> Self {
        Self {
            pins: AtomicUsize::new(0),
            removing: AtomicBool::new(false),
            drained: Notify::new(),
        }
    }

    /// Acquires a pin unless teardown has begun.
    ///
    /// The increment is published before the gate is checked, so a teardown
    /// that starts concurrently either observes the pin and waits for it, or
    /// closes the gate first and this acquisition backs out.
    pub(crate) fn try_acquire(&self) -> bool {
        self.pins.fetch_add(1, Ordering::SeqCst);
        if self.removing.load(Ordering::SeqCst) {
            self.release();
            return false;
        }
        true
    }

    /// Acquires a pin without consulting the gate.
    ///
    /// Only valid for providers whose gate never closes (the builtin).
    pub(crate) fn acquire(&self) {
        self.pins.fetch_add(1, Ordering::SeqCst);
    }

    /// Releases one pin, waking the teardown waiter on the last release.
    pub(crate) fn release(&self) {
        if self.pins.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }

    /// Closes the gate: subsequent [ProviderLifetime::try_acquire] calls fail.
    pub(crate) fn begin_teardown(&self) {
        self.removing.store(true, Ordering::SeqCst);
    }

    /// Current pin count.
    pub(crate) fn active(&self) -> usize {
        self.pins.load(Ordering::SeqCst)
    }

    /// Waits until the pin count reaches zero.
    ///
    /// The notification future is registered before the count is re-checked,
    /// so a release between check and await still wakes the waiter.
    pub(crate) async fn wait_drained(&self) {
        loop {
            let drained = self.drained.notified();
            if self.pins.load(Ordering::SeqCst) == 0 {
                return;
            }
            drained.await;
        }
    }
}

/// A pinned reference to a provider.
///
/// Holding a pin keeps the provider's backing resources alive; a pending
/// removal waits for all pins to drop. The pin releases itself exactly once,
/// on drop.
pub struct ProviderPin {
    provider: Arc<PathManagerProvider>,
}

impl fmt::Debug for ProviderPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProviderPin").field(self.provider.name()).finish()
    }
}

impl ProviderPin {
    /// Attempts to pin `provider`; fails if it is tearing down.
    pub(crate) fn try_new(provider: &Arc<PathManagerProvider>) -> Option<Self> {
        if !provider.lifetime().try_acquire() {
            return None;
        }
        Some(Self {
            provider: provider.clone(),
        })
    }

    /// Pins the builtin provider. The builtin never tears down, so this
    /// cannot fail.
    pub(crate) fn new_builtin(provider: &Arc<PathManagerProvider>) -> Self {
        debug_assert!(provider.is_builtin());
        provider.lifetime().acquire();
        Self {
            provider: provider.clone(),
        }
    }

    /// The pinned provider.
    pub fn provider(&self) -> &PathManagerProvider {
        &self.provider
    }

    /// Runs the pinned provider's endpoint selection.
    pub fn select_endpoint(
        &self,
        conn: ConnectionId,
        family: AddressFamily,
    ) -> Option<EndpointCandidate> {
        self.provider.selector().select_endpoint(conn, family)
    }
}

impl Drop for ProviderPin {
    fn drop(&mut self) {
        self.provider.lifetime().release();
    }
}
