//! Single-flight dispatch cache for generated proxy classes
//!
//! Memoizes generated class handles per (base class, interceptor-chain
//! signature). A lookup miss installs a pending slot and generates outside
//! the map lock; concurrent requests for the same key wait on the in-flight
//! generation instead of duplicating it, while requests for different keys
//! proceed independently. A failed generation is published to every waiter
//! and the key is evicted, so a later attempt may retry — no permanent
//! poisoning. Published class handles are immutable and shared freely.

use std::any::TypeId;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;

use veneer_core::{ClassDef, ClassId};

use crate::error::ProxyError;

/// Structural cache key: base class plus ordered interceptor type identities
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyKey {
    base: ClassId,
    chain: Vec<TypeId>,
}

impl ProxyKey {
    pub fn new(base: ClassId, chain: Vec<TypeId>) -> Self {
        ProxyKey { base, chain }
    }
}

struct InFlight {
    done: Mutex<Option<Result<Arc<ClassDef>, ProxyError>>>,
    cvar: Condvar,
}

impl InFlight {
    fn new() -> Self {
        InFlight {
            done: Mutex::new(None),
            cvar: Condvar::new(),
        }
    }
}

enum Slot {
    Ready(Arc<ClassDef>),
    Pending(Arc<InFlight>),
}

enum Role {
    Hit(Arc<ClassDef>),
    Waiter(Arc<InFlight>),
    Leader(Arc<InFlight>),
}

/// Thread-safe, single-flight memoization of generated proxy classes
#[derive(Default)]
pub struct DispatchCache {
    slots: Mutex<FxHashMap<ProxyKey, Slot>>,
}

impl DispatchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots, pending included. Useful for asserting that failed
    /// preconditions never touch the cache.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A ready entry, if one is published.
    pub fn get(&self, key: &ProxyKey) -> Option<Arc<ClassDef>> {
        match self.slots.lock().get(key) {
            Some(Slot::Ready(class)) => Some(Arc::clone(class)),
            _ => None,
        }
    }

    /// Look up `key`, generating at most once process-wide per key.
    ///
    /// Exactly one caller (the leader) runs `generate`; everyone else
    /// blocks until the leader publishes. On success the handle is stored
    /// and returned to all; on failure the error reaches all waiters and
    /// the key is evicted.
    pub fn get_or_generate<F>(&self, key: ProxyKey, generate: F) -> Result<Arc<ClassDef>, ProxyError>
    where
        F: FnOnce() -> Result<Arc<ClassDef>, ProxyError>,
    {
        let role = {
            let mut slots = self.slots.lock();
            match slots.get(&key) {
                Some(Slot::Ready(class)) => Role::Hit(Arc::clone(class)),
                Some(Slot::Pending(flight)) => Role::Waiter(Arc::clone(flight)),
                None => {
                    let flight = Arc::new(InFlight::new());
                    slots.insert(key.clone(), Slot::Pending(Arc::clone(&flight)));
                    Role::Leader(flight)
                }
            }
        };

        match role {
            Role::Hit(class) => Ok(class),
            Role::Waiter(flight) => {
                let mut done = flight.done.lock();
                loop {
                    if let Some(result) = done.clone() {
                        return result;
                    }
                    flight.cvar.wait(&mut done);
                }
            }
            Role::Leader(flight) => {
                let result = generate();
                {
                    let mut slots = self.slots.lock();
                    match &result {
                        Ok(class) => {
                            slots.insert(key, Slot::Ready(Arc::clone(class)));
                        }
                        Err(_) => {
                            slots.remove(&key);
                        }
                    }
                }
                *flight.done.lock() = Some(result.clone());
                flight.cvar.notify_all();
                result
            }
        }
    }
}
