//! Process-wide map from transport kind to its active channel.
//!
//! Each slot is written at most once, after the transport's worker reported
//! readiness, and read lock-free by the router on every log call.

use std::sync::{Arc, OnceLock};

use crate::{channel::Channel, transport::TransportKind};

/// Fixed set of channel slots, one per [`TransportKind`].
#[derive(Debug)]
pub struct Registry {
    slots: [OnceLock<Arc<Channel>>; TransportKind::COUNT],
}

impl Registry {
    pub const fn new() -> Self {
        Self {
            slots: [const { OnceLock::new() }; TransportKind::COUNT],
        }
    }

    /// Make `channel` visible to the router.
    ///
    /// Returns the channel back if the slot is already taken.
    pub fn register(&self, kind: TransportKind, channel: Arc<Channel>) -> Result<(), Arc<Channel>> {
        self.slots[kind.index()].set(channel)
    }

    pub fn get(&self, kind: TransportKind) -> Option<&Arc<Channel>> {
        self.slots[kind.index()].get()
    }

    pub fn is_active(&self, kind: TransportKind) -> bool {
        self.get(kind).is_some()
    }

    /// Active channels in [`TransportKind::ALL`] order.
    pub fn active(&self) -> impl Iterator<Item = (TransportKind, &Arc<Channel>)> {
        TransportKind::ALL
            .into_iter()
            .filter_map(|kind| self.get(kind).map(|channel| (kind, channel)))
    }

    /// Drop counter of the channel registered for `kind`.
    pub fn dropped(&self, kind: TransportKind) -> Option<u64> {
        self.get(kind).map(|channel| channel.dropped())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_REGISTRY: Registry = Registry::new();

/// The registry consulted by the globally installed router.
pub fn global() -> &'static Registry {
    &GLOBAL_REGISTRY
}
