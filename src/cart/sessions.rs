use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::Cart;

#[derive(Debug)]
pub struct CartSession {
    cart: Cart,
    touched_at: Instant,
}

impl CartSession {
    fn new() -> Self {
        Self {
            cart: Cart::new(),
            touched_at: Instant::now(),
        }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Mutable access; refreshes the idle timer.
    pub fn cart_mut(&mut self) -> &mut Cart {
        self.touched_at = Instant::now();
        &mut self.cart
    }

    pub fn idle_for(&self) -> Duration {
        self.touched_at.elapsed()
    }
}

/// One cart per browsing session, keyed by an opaque session id.
///
/// Each session sits behind its own async mutex: a checkout holds the lock
/// across its store round-trips so the cart cannot change underneath it.
#[derive(Clone, Default)]
pub struct CartSessions {
    carts: Arc<DashMap<Uuid, Arc<Mutex<CartSession>>>>,
}

impl CartSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.carts.insert(id, Arc::new(Mutex::new(CartSession::new())));
        id
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<Mutex<CartSession>>> {
        self.carts.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Locks the session, or `None` when it is unknown or was evicted while
    /// waiting for the lock.
    pub async fn lock(&self, id: Uuid) -> Option<OwnedMutexGuard<CartSession>> {
        let session = self.get(id)?;
        self.lock_registered(id, session).await
    }

    async fn lock_registered(
        &self,
        id: Uuid,
        session: Arc<Mutex<CartSession>>,
    ) -> Option<OwnedMutexGuard<CartSession>> {
        let guard = Arc::clone(&session).lock_owned().await;
        // Eviction skips locked sessions, so this stays true while `guard` lives.
        let registered = self
            .carts
            .get(&id)
            .is_some_and(|entry| Arc::ptr_eq(entry.value(), &session));
        registered.then_some(guard)
    }

    pub fn close(&self, id: Uuid) -> bool {
        self.carts.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.carts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.carts.is_empty()
    }

    /// Drops sessions idle for at least `ttl`. Sessions locked right now are
    /// in use and always kept. Returns how many were dropped.
    pub fn evict_idle(&self, ttl: Duration) -> usize {
        let before = self.carts.len();
        self.carts.retain(|_, session| match session.try_lock() {
            Ok(guard) => guard.idle_for() < ttl,
            Err(_) => true,
        });
        before.saturating_sub(self.carts.len())
    }
}
