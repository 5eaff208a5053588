//! Integration tests for the session manager, driven through its handles.
//!
//! Timing tests run on a paused clock (`start_paused = true`): sleeping
//! advances virtual time instantly, so lockouts and expiry are exact.

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::future::join_all;
use tollgate_hash::{HashError, HashStrategy, HashStrength};
use tollgate_session::{
    AddressPolicy, AddressState, ManagerConfig, ManagerRegistry, SessionError, SessionHandle,
    SessionManager, TokenSource,
};
use tollgate_types::{JsonCodec, SessionId};

// =========================================================================
// Helpers
// =========================================================================

fn config(max_attempts: u32, lockout: Duration) -> ManagerConfig {
    ManagerConfig {
        max_login_attempts: max_attempts,
        lockout_duration: lockout,
        ..ManagerConfig::default()
    }
}

fn spawn(config: ManagerConfig) -> (SessionManager, SessionHandle) {
    let manager = SessionManager::spawn(config, &ManagerRegistry::new()).unwrap();
    let handle = manager.handle();
    (manager, handle)
}

async fn logged_in(sessions: &SessionHandle, username: &str) -> SessionId {
    let id = sessions
        .create_session(username, Some("user"), "10.0.0.1")
        .await
        .expect("create should succeed");
    sessions.login(&id).await.expect("login should succeed");
    id
}

/// Replays fixed tokens, then numbered fallbacks.
struct Scripted(VecDeque<&'static str>, u32);

impl TokenSource for Scripted {
    fn next_token(&mut self) -> String {
        match self.0.pop_front() {
            Some(token) => token.to_string(),
            None => {
                self.1 += 1;
                format!("token-{}", self.1)
            }
        }
    }
}

// =========================================================================
// Lifecycle
// =========================================================================

#[tokio::test]
async fn test_create_session_starts_inactive_with_known_address() {
    let (_manager, sessions) = spawn(ManagerConfig::default());

    let id = sessions
        .create_session("alice", Some("admin"), "10.0.0.1")
        .await
        .unwrap();
    let info = sessions.session(&id).await.unwrap();

    assert_eq!(info.username, "alice");
    assert_eq!(info.role.as_deref(), Some("admin"));
    assert!(!info.alive);
    assert!(!info.locked);
    assert_eq!(info.attempts, 0);
    assert_eq!(info.addresses.get("10.0.0.1"), Some(&AddressState::Allowed));
    assert_eq!(info.expires_in, None);
}

#[tokio::test]
async fn test_create_session_same_username_returns_duplicate() {
    let (_manager, sessions) = spawn(ManagerConfig::default());
    sessions.create_session("alice", None, "10.0.0.1").await.unwrap();

    let result = sessions.create_session("alice", None, "10.0.0.2").await;

    assert!(matches!(result, Err(SessionError::DuplicateSession(ref u)) if u == "alice"));
    assert_eq!(sessions.len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_create_session_after_remove_succeeds() {
    let (_manager, sessions) = spawn(ManagerConfig::default());
    let id = sessions.create_session("alice", None, "10.0.0.1").await.unwrap();

    let removed = sessions.remove_session(&id).await.unwrap();
    assert_eq!(removed.username, "alice");

    assert!(sessions.create_session("alice", None, "10.0.0.1").await.is_ok());
    assert!(matches!(
        sessions.session(&id).await,
        Err(SessionError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_login_twice_returns_already_alive() {
    let (_manager, sessions) = spawn(ManagerConfig::default());
    let id = logged_in(&sessions, "alice").await;

    assert!(matches!(
        sessions.login(&id).await,
        Err(SessionError::AlreadyAlive(_))
    ));
}

#[tokio::test]
async fn test_logout_without_login_returns_not_alive() {
    let (_manager, sessions) = spawn(ManagerConfig::default());
    let id = sessions.create_session("alice", None, "10.0.0.1").await.unwrap();

    assert!(matches!(
        sessions.logout(&id).await,
        Err(SessionError::NotAlive(_))
    ));
}

#[tokio::test]
async fn test_verify_follows_login_and_logout() {
    let (_manager, sessions) = spawn(ManagerConfig::default());
    let id = sessions.create_session("alice", None, "10.0.0.1").await.unwrap();

    assert!(matches!(
        sessions.verify(&id).await,
        Err(SessionError::Inactive(_))
    ));

    sessions.login(&id).await.unwrap();
    assert!(sessions.verify(&id).await.is_ok());

    sessions.logout(&id).await.unwrap();
    assert!(matches!(
        sessions.verify(&id).await,
        Err(SessionError::Inactive(_))
    ));
}

#[tokio::test]
async fn test_operations_on_unknown_id_return_not_found() {
    let (_manager, sessions) = spawn(ManagerConfig::default());
    let ghost = SessionId::new("ghost");

    assert!(matches!(sessions.login(&ghost).await, Err(SessionError::NotFound(_))));
    assert!(matches!(sessions.verify(&ghost).await, Err(SessionError::NotFound(_))));
    assert!(matches!(
        sessions.record_failed_attempt(&ghost).await,
        Err(SessionError::NotFound(_))
    ));
    assert!(matches!(
        sessions.check_role(&["admin"], &ghost).await,
        Err(SessionError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_username_and_role_lookups() {
    let (_manager, sessions) = spawn(ManagerConfig::default());
    let id = sessions.create_session("alice", None, "10.0.0.1").await.unwrap();

    assert_eq!(sessions.username(&id).await.unwrap(), "alice");
    assert_eq!(sessions.role(&id).await.unwrap(), None);
}

// =========================================================================
// Attempts and lockout
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_lockout_after_max_attempts_then_unlocks_after_duration() {
    let (_manager, sessions) = spawn(config(3, Duration::from_secs(30)));
    let id = logged_in(&sessions, "alice").await;

    assert_eq!(sessions.record_failed_attempt(&id).await.unwrap(), 1);
    assert_eq!(sessions.record_failed_attempt(&id).await.unwrap(), 2);
    let third = sessions.record_failed_attempt(&id).await;

    assert!(matches!(
        third,
        Err(SessionError::LockoutTriggered { duration, .. }) if duration == Duration::from_secs(30)
    ));
    assert!(matches!(sessions.verify(&id).await, Err(SessionError::Locked(_))));

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert!(matches!(sessions.verify(&id).await, Err(SessionError::Locked(_))));

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(sessions.verify(&id).await.is_ok(), "lock should clear after 30s");

    let info = sessions.session(&id).await.unwrap();
    assert!(!info.locked);
    assert_eq!(info.attempts, 0);
}

#[tokio::test(start_paused = true)]
async fn test_record_failed_attempt_while_locked_returns_locked_and_counts() {
    let (_manager, sessions) = spawn(config(1, Duration::from_secs(60)));
    let id = logged_in(&sessions, "alice").await;

    assert!(matches!(
        sessions.record_failed_attempt(&id).await,
        Err(SessionError::LockoutTriggered { .. })
    ));
    assert!(matches!(
        sessions.record_failed_attempt(&id).await,
        Err(SessionError::Locked(_))
    ));
    assert_eq!(sessions.session(&id).await.unwrap().attempts, 2);
}

#[tokio::test(start_paused = true)]
async fn test_login_while_locked_returns_locked() {
    let (_manager, sessions) = spawn(config(1, Duration::from_secs(60)));
    let id = sessions.create_session("alice", None, "10.0.0.1").await.unwrap();
    let _ = sessions.record_failed_attempt(&id).await;

    assert!(matches!(sessions.login(&id).await, Err(SessionError::Locked(_))));
}

#[tokio::test(start_paused = true)]
async fn test_login_resets_failed_attempts() {
    let (_manager, sessions) = spawn(config(3, Duration::from_secs(60)));
    let id = sessions.create_session("alice", None, "10.0.0.1").await.unwrap();
    sessions.record_failed_attempt(&id).await.unwrap();
    sessions.record_failed_attempt(&id).await.unwrap();

    sessions.login(&id).await.unwrap();

    assert_eq!(sessions.session(&id).await.unwrap().attempts, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_final_attempts_lock_exactly_once() {
    let (_manager, sessions) = spawn(config(3, Duration::from_secs(300)));
    let id = logged_in(&sessions, "alice").await;
    sessions.record_failed_attempt(&id).await.unwrap();

    // Three callers race to deliver the attempt that crosses the limit.
    let results = join_all((0..3).map(|_| {
        let sessions = sessions.clone();
        let id = id.clone();
        tokio::spawn(async move { sessions.record_failed_attempt(&id).await })
    }))
    .await;

    let results: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();
    let lockouts = results
        .iter()
        .filter(|r| matches!(r, Err(SessionError::LockoutTriggered { .. })))
        .count();

    assert_eq!(lockouts, 1, "exactly one call should trigger the lockout: {results:?}");
    assert_eq!(sessions.session(&id).await.unwrap().attempts, 4);
}

#[tokio::test]
async fn test_concurrent_attempts_are_all_counted() {
    let (_manager, sessions) = spawn(config(3, Duration::from_secs(300)));
    let id = sessions.create_session("alice", None, "10.0.0.1").await.unwrap();

    let results = join_all((0..5).map(|_| sessions.record_failed_attempt(&id))).await;

    let ok = results.iter().filter(|r| r.is_ok()).count();
    let triggered = results
        .iter()
        .filter(|r| matches!(r, Err(SessionError::LockoutTriggered { .. })))
        .count();
    let locked = results
        .iter()
        .filter(|r| matches!(r, Err(SessionError::Locked(_))))
        .count();

    assert_eq!((ok, triggered, locked), (2, 1, 2));
    assert_eq!(sessions.session(&id).await.unwrap().attempts, 5);
}

#[tokio::test(start_paused = true)]
async fn test_unlock_after_session_removed_is_harmless() {
    let (_manager, sessions) = spawn(config(1, Duration::from_secs(10)));
    let old = sessions.create_session("alice", None, "10.0.0.1").await.unwrap();
    let _ = sessions.record_failed_attempt(&old).await;
    sessions.remove_session(&old).await.unwrap();

    let new = logged_in(&sessions, "alice").await;
    tokio::time::sleep(Duration::from_secs(11)).await;

    assert!(sessions.verify(&new).await.is_ok());
    assert_eq!(sessions.len().await.unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_lockout_duration_change_applies_to_next_lockout_only() {
    let (_manager, sessions) = spawn(config(1, Duration::from_secs(10)));
    let first = logged_in(&sessions, "alice").await;
    let _ = sessions.record_failed_attempt(&first).await;

    sessions.set_lockout_duration(Duration::from_secs(100)).await.unwrap();
    let second = logged_in(&sessions, "bob").await;
    let result = sessions.record_failed_attempt(&second).await;
    assert!(matches!(
        result,
        Err(SessionError::LockoutTriggered { duration, .. }) if duration == Duration::from_secs(100)
    ));

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert!(sessions.verify(&first).await.is_ok(), "running timer keeps its 10s");
    assert!(matches!(sessions.verify(&second).await, Err(SessionError::Locked(_))));
}

// =========================================================================
// Roles
// =========================================================================

#[tokio::test]
async fn test_check_role_empty_set_always_succeeds() {
    let (_manager, sessions) = spawn(ManagerConfig::default());
    let id = sessions.create_session("alice", None, "10.0.0.1").await.unwrap();

    assert!(sessions.check_role(&[], &id).await.is_ok());
    // No lookup happens, so even an unknown id passes.
    assert!(sessions.check_role(&[], &SessionId::new("ghost")).await.is_ok());
}

#[tokio::test]
async fn test_check_role_member_passes_non_member_fails() {
    let (_manager, sessions) = spawn(ManagerConfig::default());
    let id = sessions
        .create_session("alice", Some("editor"), "10.0.0.1")
        .await
        .unwrap();

    assert!(sessions.check_role(&["admin", "editor"], &id).await.is_ok());
    assert!(matches!(
        sessions.check_role(&["admin"], &id).await,
        Err(SessionError::RoleMismatch { actual: Some(ref a), .. }) if a == "editor"
    ));
}

// =========================================================================
// Address provenance
// =========================================================================

#[tokio::test]
async fn test_verify_with_address_strict_rejects_unknown() {
    let (_manager, sessions) = spawn(ManagerConfig::default());
    let id = sessions
        .create_session("alice", None, "10.0.0.1")
        .await
        .unwrap();
    sessions.login(&id).await.unwrap();

    assert!(sessions.verify_with_address(&id, "10.0.0.1").await.is_ok());
    assert!(matches!(
        sessions.verify_with_address(&id, "10.0.0.2").await,
        Err(SessionError::UnknownAddress { ref address, .. }) if address == "10.0.0.2"
    ));
}

#[tokio::test]
async fn test_verify_with_address_permissive_registers_unknown() {
    let (_manager, sessions) = spawn(ManagerConfig {
        address_policy: AddressPolicy::Permissive,
        ..ManagerConfig::default()
    });
    let id = logged_in(&sessions, "alice").await;

    assert!(sessions.verify_with_address(&id, "10.0.0.2").await.is_ok());

    let info = sessions.session(&id).await.unwrap();
    assert_eq!(info.addresses.get("10.0.0.2"), Some(&AddressState::Allowed));
}

#[tokio::test]
async fn test_block_address_rejects_until_allowed_again() {
    let (_manager, sessions) = spawn(ManagerConfig {
        address_policy: AddressPolicy::Permissive,
        ..ManagerConfig::default()
    });
    let id = logged_in(&sessions, "alice").await;

    sessions.block_address(&id, "10.0.0.1").await.unwrap();
    assert!(matches!(
        sessions.verify_with_address(&id, "10.0.0.1").await,
        Err(SessionError::BlockedAddress { .. })
    ));
    // Plain verify doesn't look at addresses.
    assert!(sessions.verify(&id).await.is_ok());

    sessions.allow_address(&id, "10.0.0.1").await.unwrap();
    assert!(sessions.verify_with_address(&id, "10.0.0.1").await.is_ok());
}

#[tokio::test]
async fn test_address_policy_switch_applies_immediately() {
    let (_manager, sessions) = spawn(ManagerConfig::default());
    let id = logged_in(&sessions, "alice").await;

    sessions.set_address_policy(AddressPolicy::Permissive).await.unwrap();

    assert!(sessions.verify_with_address(&id, "10.0.0.9").await.is_ok());
}

// =========================================================================
// Expiry
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_expired_session_returns_expired_and_frees_username() {
    let (_manager, sessions) = spawn(ManagerConfig {
        session_lifetime: Some(Duration::from_secs(10)),
        sweep_interval: ManagerConfig::MAX_SWEEP_INTERVAL,
        ..ManagerConfig::default()
    });
    let id = logged_in(&sessions, "alice").await;

    tokio::time::sleep(Duration::from_secs(11)).await;

    assert!(matches!(sessions.verify(&id).await, Err(SessionError::Expired(_))));
    assert!(matches!(sessions.verify(&id).await, Err(SessionError::NotFound(_))));
    assert!(sessions.create_session("alice", None, "10.0.0.1").await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_sweep_removes_expired_sessions() {
    let (_manager, sessions) = spawn(ManagerConfig {
        session_lifetime: Some(Duration::from_secs(5)),
        sweep_interval: Duration::from_secs(1),
        ..ManagerConfig::default()
    });
    sessions.create_session("alice", None, "10.0.0.1").await.unwrap();
    sessions.create_session("bob", None, "10.0.0.1").await.unwrap();

    tokio::time::sleep(Duration::from_secs(7)).await;

    assert!(sessions.is_empty().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_lifetime_change_is_not_retroactive() {
    let (_manager, sessions) = spawn(ManagerConfig::default());
    let alice = logged_in(&sessions, "alice").await;

    sessions
        .set_session_lifetime(Some(Duration::from_secs(5)))
        .await
        .unwrap();
    let bob = logged_in(&sessions, "bob").await;

    tokio::time::sleep(Duration::from_secs(6)).await;

    assert!(sessions.verify(&alice).await.is_ok());
    assert!(matches!(sessions.verify(&bob).await, Err(SessionError::Expired(_))));
}

// =========================================================================
// Configuration
// =========================================================================

#[tokio::test]
async fn test_set_hash_strength_out_of_range_clamps_and_reports() {
    let (_manager, sessions) = spawn(ManagerConfig::default());

    let result = sessions.set_hash_strength(40).await;

    assert!(matches!(result, Err(SessionError::InvalidConfiguration(_))));
    assert_eq!(sessions.config().await.unwrap().hash_strength, HashStrength::MAX);
}

#[tokio::test]
async fn test_set_max_attempts_zero_clamps_to_one() {
    let (_manager, sessions) = spawn(ManagerConfig::default());

    assert!(matches!(
        sessions.set_max_attempts(0).await,
        Err(SessionError::InvalidConfiguration(_))
    ));
    assert_eq!(sessions.config().await.unwrap().max_login_attempts, 1);

    assert!(sessions.set_max_attempts(7).await.is_ok());
    assert_eq!(sessions.config().await.unwrap().max_login_attempts, 7);
}

#[tokio::test]
async fn test_set_hash_strategy_unknown_name_leaves_config_unchanged() {
    let (_manager, sessions) = spawn(ManagerConfig::default());

    let result = sessions.set_hash_strategy("md5").await;

    assert!(matches!(
        result,
        Err(SessionError::Hash(HashError::UnsupportedStrategy(ref name))) if name == "md5"
    ));
    assert_eq!(sessions.config().await.unwrap().hash_strategy, HashStrategy::Bcrypt);

    sessions.set_hash_strategy("SHA512").await.unwrap();
    assert_eq!(sessions.config().await.unwrap().hash_strategy, HashStrategy::Sha512);
}

#[tokio::test]
async fn test_spawn_clamps_invalid_config() {
    let (_manager, sessions) = spawn(config(0, Duration::ZERO));

    let applied = sessions.config().await.unwrap();

    assert_eq!(applied.max_login_attempts, 1);
    assert_eq!(applied.lockout_duration, ManagerConfig::MIN_LOCKOUT);
}

// =========================================================================
// Credentials
// =========================================================================

#[tokio::test]
async fn test_hash_and_check_password_use_configured_strategy() {
    let (_manager, sessions) = spawn(ManagerConfig::default());
    sessions.set_hash_strategy("sha256").await.unwrap();
    sessions.set_hash_strength(4).await.unwrap();

    let digest = sessions.hash_password("s3cret").await.unwrap();

    assert!(sessions.check_password("s3cret", &digest).await.is_ok());
    assert!(matches!(
        sessions.check_password("guess", &digest).await,
        Err(SessionError::Hash(HashError::PasswordMismatch))
    ));
}

#[tokio::test]
async fn test_bcrypt_password_round_trip() {
    let (_manager, sessions) = spawn(ManagerConfig {
        hash_strength: HashStrength::MIN,
        ..ManagerConfig::default()
    });

    let digest = sessions.hash_password("s3cret").await.unwrap();

    assert!(sessions.check_password("s3cret", &digest).await.is_ok());
}

// =========================================================================
// Identifiers
// =========================================================================

#[tokio::test]
async fn test_managers_in_one_registry_get_distinct_ids() {
    let registry = ManagerRegistry::new();
    let a = SessionManager::spawn(ManagerConfig::default(), &registry).unwrap();
    let b = SessionManager::spawn(ManagerConfig::default(), &registry).unwrap();

    assert_ne!(a.id(), b.id());
    assert_eq!(registry.len(), 2);
    assert!(registry.contains(a.id()) && registry.contains(b.id()));
}

#[tokio::test]
async fn test_session_id_collision_is_retried() {
    let source = Scripted(["dup", "dup", "next"].into_iter().collect(), 0);
    let manager =
        SessionManager::spawn_with_source(ManagerConfig::default(), &ManagerRegistry::new(), source)
            .unwrap();
    let sessions = manager.handle();

    let alice = sessions.create_session("alice", None, "a").await.unwrap();
    let bob = sessions.create_session("bob", None, "b").await.unwrap();

    assert_eq!(alice.as_str(), "dup");
    assert_eq!(bob.as_str(), "next");
}

#[tokio::test]
async fn test_exhausted_token_source_fails_create_and_keeps_serving() {
    struct Constant;
    impl TokenSource for Constant {
        fn next_token(&mut self) -> String {
            "fixed".to_string()
        }
    }
    let registry = ManagerRegistry::new();
    let manager =
        SessionManager::spawn_with_source(ManagerConfig::default(), &registry, Constant).unwrap();
    let sessions = manager.handle();
    sessions.create_session("alice", None, "a").await.unwrap();

    let second = tokio::time::timeout(
        Duration::from_secs(5),
        sessions.create_session("bob", None, "b"),
    )
    .await
    .expect("create must not hang");

    assert!(matches!(
        second,
        Err(SessionError::IdExhausted { attempts: tollgate_session::MAX_TOKEN_ATTEMPTS })
    ));
    assert_eq!(sessions.len().await.unwrap(), 1);
    manager.shutdown().await;
}

#[tokio::test]
async fn test_registry_exhaustion_fails_spawn() {
    struct Constant;
    impl TokenSource for Constant {
        fn next_token(&mut self) -> String {
            "only-one".to_string()
        }
    }
    let registry = ManagerRegistry::with_source(Constant);
    let _first = SessionManager::spawn(ManagerConfig::default(), &registry).unwrap();

    let second = SessionManager::spawn(ManagerConfig::default(), &registry);

    assert!(matches!(second, Err(SessionError::IdExhausted { .. })));
}

#[tokio::test]
async fn test_session_ids_are_long_random_hex() {
    let (_manager, sessions) = spawn(ManagerConfig::default());

    let id = sessions.create_session("alice", None, "a").await.unwrap();

    assert_eq!(id.as_str().len(), tollgate_session::SESSION_TOKEN_BYTES * 2);
    assert!(!format!("{id}").contains(id.as_str()), "display must not leak the token");
}

// =========================================================================
// Snapshot / restore
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_snapshot_restore_preserves_sessions_and_rearms_lockout() {
    let (manager, sessions) = spawn(config(2, Duration::from_secs(60)));
    let alice = logged_in(&sessions, "alice").await;
    let bob = logged_in(&sessions, "bob").await;
    let _ = sessions.record_failed_attempt(&bob).await;
    let _ = sessions.record_failed_attempt(&bob).await;
    let original_id = manager.id().clone();

    let bytes = sessions.snapshot(&JsonCodec).await.unwrap();
    manager.shutdown().await;

    let restored = SessionManager::restore(&bytes, &JsonCodec, &ManagerRegistry::new()).unwrap();
    let sessions = restored.handle();

    assert_eq!(restored.id(), &original_id);
    assert_eq!(sessions.config().await.unwrap().max_login_attempts, 2);
    assert!(sessions.verify(&alice).await.is_ok());
    assert!(matches!(sessions.verify(&bob).await, Err(SessionError::Locked(_))));

    // The restored lockout runs for the full configured duration.
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(sessions.verify(&bob).await.is_ok());
}

#[tokio::test]
async fn test_restore_into_registry_holding_id_draws_fresh_id() {
    let registry = ManagerRegistry::new();
    let manager = SessionManager::spawn(ManagerConfig::default(), &registry).unwrap();
    manager
        .handle()
        .create_session("alice", None, "a")
        .await
        .unwrap();

    let bytes = manager.handle().snapshot(&JsonCodec).await.unwrap();
    let restored = SessionManager::restore(&bytes, &JsonCodec, &registry).unwrap();

    assert_ne!(restored.id(), manager.id());
    assert_eq!(restored.handle().len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_restore_garbage_returns_codec_error() {
    let result = SessionManager::restore(b"not json", &JsonCodec, &ManagerRegistry::new());
    assert!(matches!(result, Err(SessionError::Codec(_))));
}

// =========================================================================
// Shutdown
// =========================================================================

#[tokio::test]
async fn test_handle_after_shutdown_returns_manager_closed() {
    let (manager, sessions) = spawn(ManagerConfig::default());
    let id = manager.id().clone();

    manager.shutdown().await;

    assert!(matches!(
        sessions.len().await,
        Err(SessionError::ManagerClosed(ref m)) if m == &id
    ));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_with_pending_lockout_completes() {
    let (manager, sessions) = spawn(config(1, Duration::from_secs(3600)));
    let id = logged_in(&sessions, "alice").await;
    let _ = sessions.record_failed_attempt(&id).await;

    // Returns without waiting out the hour-long timer.
    manager.shutdown().await;

    assert!(matches!(
        sessions.verify(&id).await,
        Err(SessionError::ManagerClosed(_))
    ));
}
