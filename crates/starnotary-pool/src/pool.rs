//! The validation pool: open challenges, their expiry timers, and the
//! authorizations they turn into.
//!
//! Per address the pool moves through
//! `absent -> pending -> authorized -> absent`, or `pending -> absent` when
//! the window runs out. Every transition happens under one lock, including
//! the one made by an expiry timer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use starnotary_core::{Clock, WalletAddress};

use crate::config::PoolConfig;
use crate::error::{PoolError, Result};
use crate::request::{challenge_message, ValidationRequest, ValidationStatus, Verification};
use crate::verifier::{BitcoinVerifier, MessageVerifier};

/// An open challenge.
struct Pending {
    request_time_stamp: i64,
    message: String,
    deadline: Instant,
    /// Identifies the timer that owns this entry.
    ticket: u64,
    timer: JoinHandle<()>,
}

impl Pending {
    fn request(&self, address: &WalletAddress, now: Instant) -> ValidationRequest {
        ValidationRequest {
            wallet_address: address.clone(),
            request_time_stamp: self.request_time_stamp,
            message: self.message.clone(),
            validation_window: seconds_left(self.deadline, now),
        }
    }
}

#[derive(Default)]
struct PoolState {
    pending: HashMap<WalletAddress, Pending>,
    authorized: HashMap<WalletAddress, ValidationStatus>,
    next_ticket: u64,
}

/// Issues challenges and tracks which addresses have answered them.
///
/// Must be used from within a Tokio runtime: every new challenge spawns a
/// timer task that removes it when its window elapses.
pub struct ValidationPool<V: MessageVerifier = BitcoinVerifier> {
    state: Arc<Mutex<PoolState>>,
    config: PoolConfig,
    clock: Arc<dyn Clock>,
    verifier: V,
}

impl ValidationPool<BitcoinVerifier> {
    /// Create a pool that checks Bitcoin message signatures.
    pub fn new(config: PoolConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_verifier(config, clock, BitcoinVerifier)
    }
}

impl<V: MessageVerifier> ValidationPool<V> {
    /// Create a pool with a custom signature check.
    pub fn with_verifier(config: PoolConfig, clock: Arc<dyn Clock>, verifier: V) -> Self {
        Self {
            state: Arc::new(Mutex::new(PoolState::default())),
            config,
            clock,
            verifier,
        }
    }

    /// Get the pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Open a challenge for `address`, or return the one already open.
    ///
    /// Re-requesting keeps the original message, timestamp and deadline;
    /// only the remaining window is recomputed. A challenge whose deadline
    /// has passed is replaced even if its timer has not fired yet.
    pub fn request_challenge(&self, address: &WalletAddress) -> Result<ValidationRequest> {
        let mut state = self.lock()?;
        let now = Instant::now();

        if let Some(pending) = state.pending.get(address) {
            if now < pending.deadline {
                let request = pending.request(address, now);
                debug!(%address, window = request.validation_window, "reusing open challenge");
                return Ok(request);
            }
            if let Some(stale) = state.pending.remove(address) {
                stale.timer.abort();
                debug!(%address, ticket = stale.ticket, "replacing expired challenge");
            }
        }

        let request_time_stamp = self.clock.now();
        let deadline = now + self.config.validation_window;
        let ticket = state.next_ticket;
        state.next_ticket += 1;

        let timer = spawn_expiry(
            Arc::downgrade(&self.state),
            address.clone(),
            ticket,
            deadline,
        );
        let pending = Pending {
            request_time_stamp,
            message: challenge_message(address, request_time_stamp),
            deadline,
            ticket,
            timer,
        };
        let request = pending.request(address, now);
        state.pending.insert(address.clone(), pending);

        debug!(%address, ticket, "issued challenge");
        Ok(request)
    }

    /// Check `signature` against the open challenge for `address`.
    ///
    /// A challenge whose deadline has passed is expired even if its timer
    /// has not fired yet. A signature that does not match leaves the
    /// challenge open; one that cannot be parsed is an error and also
    /// leaves it open.
    pub fn verify_signature(&self, address: &WalletAddress, signature: &str) -> Result<Verification> {
        let mut state = self.lock()?;
        let now = Instant::now();

        let Some(pending) = state.pending.remove(address) else {
            debug!(%address, "no open challenge");
            return Ok(Verification::Expired);
        };

        if now >= pending.deadline {
            pending.timer.abort();
            debug!(%address, "challenge expired before verification");
            return Ok(Verification::Expired);
        }

        match self.verifier.verify(address, &pending.message, signature) {
            Ok(true) => {}
            Ok(false) => {
                debug!(%address, "signature does not match challenge");
                state.pending.insert(address.clone(), pending);
                return Ok(Verification::Invalid);
            }
            Err(e) => {
                state.pending.insert(address.clone(), pending);
                return Err(PoolError::Malformed(e));
            }
        }

        pending.timer.abort();
        let status = ValidationStatus::authorized(pending.request(address, now));
        state.authorized.insert(address.clone(), status.clone());

        info!(%address, "address authorized to register a star");
        Ok(Verification::Authorized(status))
    }

    /// Whether `address` holds an unused authorization.
    pub fn is_authorized(&self, address: &WalletAddress) -> Result<bool> {
        Ok(self.lock()?.authorized.contains_key(address))
    }

    /// Use up the authorization of `address`. Returns whether there was one.
    pub fn consume_authorization(&self, address: &WalletAddress) -> Result<bool> {
        Ok(self.take_authorization(address)?.is_some())
    }

    /// Remove and return the authorization of `address`.
    pub fn take_authorization(&self, address: &WalletAddress) -> Result<Option<ValidationStatus>> {
        let taken = self.lock()?.authorized.remove(address);
        if taken.is_some() {
            debug!(%address, "authorization consumed");
        }
        Ok(taken)
    }

    /// Put back an authorization taken by [`take_authorization`].
    ///
    /// An authorization granted in the meantime is kept instead.
    ///
    /// [`take_authorization`]: ValidationPool::take_authorization
    pub fn restore_authorization(&self, status: ValidationStatus) -> Result<()> {
        let mut state = self.lock()?;
        let address = status.address().clone();
        debug!(%address, "authorization restored");
        state.authorized.entry(address).or_insert(status);
        Ok(())
    }

    /// Whether `address` has an open challenge.
    pub fn is_pending(&self, address: &WalletAddress) -> Result<bool> {
        Ok(self.lock()?.pending.contains_key(address))
    }

    /// Number of open challenges.
    pub fn pending_count(&self) -> Result<usize> {
        Ok(self.lock()?.pending.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, PoolState>> {
        self.state.lock().map_err(|_| PoolError::LockPoisoned)
    }
}

impl<V: MessageVerifier> Drop for ValidationPool<V> {
    fn drop(&mut self) {
        if let Ok(state) = self.state.lock() {
            for pending in state.pending.values() {
                pending.timer.abort();
            }
        }
    }
}

/// Spawn the timer that closes a challenge at `deadline`.
///
/// The timer only removes the entry it was created for: if the address has
/// since been verified and challenged again, the ticket no longer matches.
fn spawn_expiry(
    state: Weak<Mutex<PoolState>>,
    address: WalletAddress,
    ticket: u64,
    deadline: Instant,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep_until(deadline).await;

        let Some(state) = state.upgrade() else {
            return;
        };
        let Ok(mut state) = state.lock() else {
            return;
        };
        if state.pending.get(&address).map(|p| p.ticket) == Some(ticket) {
            state.pending.remove(&address);
            debug!(%address, ticket, "challenge expired");
        }
    })
}

/// Whole seconds from `now` to `deadline`, rounded up.
fn seconds_left(deadline: Instant, now: Instant) -> u64 {
    let left = deadline.saturating_duration_since(now);
    left.as_secs() + u64::from(left.subsec_nanos() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use starnotary_core::{CoreError, ManualClock};
    use starnotary_testkit::TestWallet;

    const T0: i64 = 1_541_605_128;

    fn pool() -> (ValidationPool, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(T0));
        (ValidationPool::new(PoolConfig::default(), clock.clone()), clock)
    }

    async fn sleep_secs(secs: u64) {
        tokio::time::sleep(Duration::from_secs(secs)).await;
        // Let any timer that fired on the way run to completion.
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_challenge() {
        let (pool, _) = pool();
        let wallet = TestWallet::from_seed(1);

        let request = pool.request_challenge(wallet.address()).unwrap();
        assert_eq!(&request.wallet_address, wallet.address());
        assert_eq!(request.request_time_stamp, T0);
        assert_eq!(request.message, format!("{}:{}:starRegistry", wallet.address(), T0));
        assert_eq!(request.validation_window, 300);
        assert!(pool.is_pending(wallet.address()).unwrap());
        assert_eq!(pool.pending_count().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rerequest_keeps_deadline() {
        let (pool, clock) = pool();
        let wallet = TestWallet::from_seed(1);
        let first = pool.request_challenge(wallet.address()).unwrap();

        sleep_secs(100).await;
        clock.advance(100);
        let second = pool.request_challenge(wallet.address()).unwrap();

        assert_eq!(second.message, first.message);
        assert_eq!(second.request_time_stamp, first.request_time_stamp);
        assert_eq!(second.validation_window, 200);
        assert_eq!(pool.pending_count().unwrap(), 1);

        // The original deadline still governs.
        sleep_secs(201).await;
        assert!(!pool.is_pending(wallet.address()).unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_challenge_expires_without_traffic() {
        let (pool, _) = pool();
        let wallet = TestWallet::from_seed(1);
        let request = pool.request_challenge(wallet.address()).unwrap();

        sleep_secs(299).await;
        assert!(pool.is_pending(wallet.address()).unwrap());

        sleep_secs(2).await;
        assert!(!pool.is_pending(wallet.address()).unwrap());
        assert_eq!(pool.pending_count().unwrap(), 0);

        let signature = wallet.sign(&request.message);
        assert_eq!(
            pool.verify_signature(wallet.address(), &signature).unwrap(),
            Verification::Expired
        );
        assert!(!pool.is_authorized(wallet.address()).unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_wins_at_deadline() {
        let (pool, _) = pool();
        let wallet = TestWallet::from_seed(1);
        let request = pool.request_challenge(wallet.address()).unwrap();
        let signature = wallet.sign(&request.message);

        tokio::time::advance(Duration::from_secs(300)).await;

        assert_eq!(
            pool.verify_signature(wallet.address(), &signature).unwrap(),
            Verification::Expired
        );
        assert!(!pool.is_pending(wallet.address()).unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rerequest_at_deadline_opens_fresh_challenge() {
        let (pool, clock) = pool();
        let wallet = TestWallet::from_seed(1);
        let first = pool.request_challenge(wallet.address()).unwrap();

        tokio::time::advance(Duration::from_secs(300)).await;
        clock.advance(300);
        let second = pool.request_challenge(wallet.address()).unwrap();

        assert_eq!(second.request_time_stamp, T0 + 300);
        assert_ne!(second.message, first.message);
        assert_eq!(second.validation_window, 300);
        assert_eq!(pool.pending_count().unwrap(), 1);

        // The fresh challenge is usable.
        assert!(matches!(
            pool.verify_signature(wallet.address(), &wallet.sign(&second.message))
                .unwrap(),
            Verification::Authorized(_)
        ));

        // The first challenge's timer must not have taken anything with it.
        sleep_secs(1).await;
        assert!(pool.is_authorized(wallet.address()).unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_verify_unknown_address_is_expired() {
        let (pool, _) = pool();
        let wallet = TestWallet::from_seed(1);
        let signature = wallet.sign("anything");
        assert_eq!(
            pool.verify_signature(wallet.address(), &signature).unwrap(),
            Verification::Expired
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_verification() {
        let (pool, _) = pool();
        let wallet = TestWallet::from_seed(1);
        let request = pool.request_challenge(wallet.address()).unwrap();

        sleep_secs(7).await;
        let result = pool
            .verify_signature(wallet.address(), &wallet.sign(&request.message))
            .unwrap();

        let Verification::Authorized(status) = result else {
            panic!("expected authorization, got {:?}", result);
        };
        assert!(status.register_star);
        assert_eq!(status.address(), wallet.address());
        assert_eq!(status.status.request_time_stamp, T0);
        assert_eq!(status.status.message, request.message);
        assert_eq!(status.status.validation_window, 293);
        assert!(status.status.message_signature);

        assert!(!pool.is_pending(wallet.address()).unwrap());
        assert!(pool.is_authorized(wallet.address()).unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_verification_cancels_expiry() {
        let (pool, _) = pool();
        let wallet = TestWallet::from_seed(1);
        let request = pool.request_challenge(wallet.address()).unwrap();
        pool.verify_signature(wallet.address(), &wallet.sign(&request.message))
            .unwrap();

        sleep_secs(600).await;
        assert!(pool.is_authorized(wallet.address()).unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timer_does_not_remove_new_challenge() {
        let (pool, clock) = pool();
        let wallet = TestWallet::from_seed(1);

        let first = pool.request_challenge(wallet.address()).unwrap();
        pool.verify_signature(wallet.address(), &wallet.sign(&first.message))
            .unwrap();
        assert!(pool.consume_authorization(wallet.address()).unwrap());

        sleep_secs(100).await;
        clock.advance(100);
        let second = pool.request_challenge(wallet.address()).unwrap();
        assert_ne!(second.message, first.message);

        // Past the first challenge's deadline, before the second's.
        sleep_secs(250).await;
        assert!(pool.is_pending(wallet.address()).unwrap());

        sleep_secs(100).await;
        assert!(!pool.is_pending(wallet.address()).unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_signature_keeps_challenge_open() {
        let (pool, _) = pool();
        let wallet = TestWallet::from_seed(1);
        let impostor = TestWallet::from_seed(2);
        let request = pool.request_challenge(wallet.address()).unwrap();

        assert_eq!(
            pool.verify_signature(wallet.address(), &impostor.sign(&request.message))
                .unwrap(),
            Verification::Invalid
        );
        assert!(pool.is_pending(wallet.address()).unwrap());
        assert!(!pool.is_authorized(wallet.address()).unwrap());

        assert!(matches!(
            pool.verify_signature(wallet.address(), &wallet.sign(&request.message))
                .unwrap(),
            Verification::Authorized(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_signature_is_an_error() {
        let (pool, _) = pool();
        let wallet = TestWallet::from_seed(1);
        pool.request_challenge(wallet.address()).unwrap();

        assert!(matches!(
            pool.verify_signature(wallet.address(), "0xnothex"),
            Err(PoolError::Malformed(CoreError::MalformedSignature(_)))
        ));
        assert!(pool.is_pending(wallet.address()).unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_authorization_is_one_shot() {
        let (pool, _) = pool();
        let wallet = TestWallet::from_seed(1);
        let request = pool.request_challenge(wallet.address()).unwrap();
        pool.verify_signature(wallet.address(), &wallet.sign(&request.message))
            .unwrap();

        assert!(pool.consume_authorization(wallet.address()).unwrap());
        assert!(!pool.consume_authorization(wallet.address()).unwrap());
        assert!(!pool.is_authorized(wallet.address()).unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_take_and_restore() {
        let (pool, _) = pool();
        let wallet = TestWallet::from_seed(1);
        let request = pool.request_challenge(wallet.address()).unwrap();
        pool.verify_signature(wallet.address(), &wallet.sign(&request.message))
            .unwrap();

        let status = pool.take_authorization(wallet.address()).unwrap().unwrap();
        assert!(!pool.is_authorized(wallet.address()).unwrap());
        assert_eq!(pool.take_authorization(wallet.address()).unwrap(), None);

        pool.restore_authorization(status.clone()).unwrap();
        assert!(pool.is_authorized(wallet.address()).unwrap());
        assert_eq!(pool.take_authorization(wallet.address()).unwrap(), Some(status));
    }

    #[tokio::test(start_paused = true)]
    async fn test_addresses_are_independent() {
        let (pool, _) = pool();
        let alice = TestWallet::from_seed(1);
        let bob = TestWallet::from_seed(2);

        let request = pool.request_challenge(alice.address()).unwrap();
        sleep_secs(200).await;
        pool.request_challenge(bob.address()).unwrap();
        pool.verify_signature(alice.address(), &alice.sign(&request.message))
            .unwrap();

        sleep_secs(150).await;
        assert!(pool.is_authorized(alice.address()).unwrap());
        assert!(pool.is_pending(bob.address()).unwrap());
        assert!(!pool.is_authorized(bob.address()).unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_window_and_verifier() {
        struct AcceptAll;
        impl MessageVerifier for AcceptAll {
            fn verify(&self, _: &WalletAddress, _: &str, _: &str) -> std::result::Result<bool, CoreError> {
                Ok(true)
            }
        }

        let config = PoolConfig {
            validation_window: Duration::from_secs(10),
        };
        let pool = ValidationPool::with_verifier(config, Arc::new(ManualClock::new(T0)), AcceptAll);
        let address = WalletAddress::new("any");

        assert_eq!(pool.request_challenge(&address).unwrap().validation_window, 10);
        assert!(matches!(
            pool.verify_signature(&address, "whatever").unwrap(),
            Verification::Authorized(_)
        ));
    }

    #[test]
    fn test_seconds_left_rounds_up() {
        let now = Instant::now();
        assert_eq!(seconds_left(now + Duration::from_millis(1500), now), 2);
        assert_eq!(seconds_left(now + Duration::from_secs(3), now), 3);
        assert_eq!(seconds_left(now, now + Duration::from_secs(1)), 0);
    }
}
