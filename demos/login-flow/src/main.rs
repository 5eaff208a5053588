use std::collections::HashMap;
use std::time::Duration;

use tollgate::prelude::*;

// ---------------------------------------------------------------------------
// A toy user store
// ---------------------------------------------------------------------------

struct User {
    digest: Digest,
    role: &'static str,
}

async fn register(
    users: &mut HashMap<&'static str, User>,
    sessions: &SessionHandle,
    name: &'static str,
    password: &str,
    role: &'static str,
) -> Result<(), TollgateError> {
    let digest = sessions.hash_password(password).await?;
    users.insert(name, User { digest, role });
    Ok(())
}

/// Checks a password for an existing session, the way a login form
/// handler would.
async fn attempt(
    users: &HashMap<&'static str, User>,
    sessions: &SessionHandle,
    id: &SessionId,
    name: &str,
    password: &str,
) -> Result<(), TollgateError> {
    let Some(user) = users.get(name) else {
        return failed(sessions, id, name, "unknown user").await;
    };

    match sessions.check_password(password, &user.digest).await {
        Ok(()) => {
            sessions.login(id).await?;
            tracing::info!(user = name, "logged in");
            Ok(())
        }
        Err(SessionError::Hash(_)) => failed(sessions, id, name, "wrong password").await,
        Err(e) => Err(e.into()),
    }
}

/// Counts a failed attempt. Hitting the limit is an outcome to report,
/// not an error.
async fn failed(
    sessions: &SessionHandle,
    id: &SessionId,
    name: &str,
    reason: &str,
) -> Result<(), TollgateError> {
    match sessions.record_failed_attempt(id).await {
        Ok(attempts) => tracing::info!(user = name, attempts, reason, "login failed"),
        Err(SessionError::LockoutTriggered { duration, .. }) => {
            let wait_secs = duration.as_secs();
            tracing::warn!(user = name, reason, wait_secs, "too many attempts");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), TollgateError> {
    init_logging(LogTarget::Console)?;

    let registry = ManagerRegistry::new();
    let config = ManagerConfig {
        max_login_attempts: 3,
        lockout_duration: Duration::from_secs(2),
        hash_strength: HashStrength::MIN,
        ..ManagerConfig::default()
    };
    let manager = SessionManager::spawn(config, &registry)?;
    let sessions = manager.handle();

    let mut users = HashMap::new();
    register(&mut users, &sessions, "alice", "correct horse", "admin").await?;
    register(&mut users, &sessions, "bob", "battery staple", "user").await?;

    // -- Three wrong passwords lock alice out ------------------------------

    let alice = sessions
        .create_session("alice", Some(users["alice"].role), "10.0.0.1")
        .await?;
    for guess in ["hunter2", "letmein", "password"] {
        attempt(&users, &sessions, &alice, "alice", guess).await?;
    }
    if let Err(e) = sessions.login(&alice).await {
        tracing::info!(error = %e, "login refused while locked");
    }

    tokio::time::sleep(Duration::from_secs(3)).await;
    attempt(&users, &sessions, &alice, "alice", "correct horse").await?;

    // -- Bob gets in first time --------------------------------------------

    let bob = sessions
        .create_session("bob", Some(users["bob"].role), "10.0.0.7")
        .await?;
    attempt(&users, &sessions, &bob, "bob", "battery staple").await?;

    // -- Someone guessing usernames gets locked out too --------------------

    let stranger = sessions.create_session("mallory", None, "198.51.100.4").await?;
    for _ in 0..3 {
        attempt(&users, &sessions, &stranger, "mallory", "anything").await?;
    }

    // -- Guarded routes ----------------------------------------------------

    let admin_only = Guard::restricted(sessions.clone(), ["admin"]).bind_address(true);
    let members = Guard::redirect(sessions.clone(), "/login");
    tracing::info!(cookie = %admin_only.cookie_name(), "guards ready");

    for (who, id, address) in [
        ("alice", &alice, "10.0.0.1"),
        ("bob", &bob, "10.0.0.7"),
        ("alice elsewhere", &alice, "203.0.113.5"),
    ] {
        let admin = admin_only.check(Some(id.as_str()), Some(address)).await;
        let member = members.check(Some(id.as_str()), Some(address)).await;
        tracing::info!(who, admin = admin.status(), member = member.status(), "route checks");
    }

    // -- Persist and bring back --------------------------------------------

    let bytes = sessions.snapshot(&JsonCodec).await?;
    manager.shutdown().await;

    let restored = SessionManager::restore(&bytes, &JsonCodec, &registry)?;
    let sessions = restored.handle();
    tracing::info!(
        manager = %restored.id(),
        sessions = sessions.len().await?,
        "restored from snapshot"
    );
    sessions.verify(&bob).await?;

    restored.shutdown().await;
    Ok(())
}
