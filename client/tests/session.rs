use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use client::session::{SessionManager, SessionStatus};
use client::storage::StorageBackend;
use client::{AUTH_TOKEN_KEY, AUTH_USER_KEY};
use payloads::responses::UserProfile;
use payloads::{Role, requests};
use test_helpers::{TestApp, spawn_app};

fn manager_for(app: &TestApp) -> SessionManager {
    let storage: Arc<dyn StorageBackend> = Arc::new(app.storage.clone());
    SessionManager::new(app.client.clone(), storage)
}

/// After any completed transition, the token and the identity are either
/// both present or both absent.
fn assert_atomic_pair(session: &SessionManager) {
    let snapshot = session.snapshot();
    assert_eq!(
        snapshot.token.is_some(),
        snapshot.identity.is_some(),
        "token and identity out of step: {snapshot:?}"
    );
}

#[tokio::test]
async fn login_and_logout_keep_token_and_identity_paired()
-> anyhow::Result<()> {
    let app = spawn_app().await;
    app.seed_alice().await?;

    let session = manager_for(&app);
    session.bootstrap().await;
    assert_eq!(session.snapshot().status, SessionStatus::Unauthenticated);
    assert_atomic_pair(&session);

    let profile = session.login(&app.alice_credentials()).await?;
    assert_eq!(profile.username, "alice");
    assert_eq!(session.snapshot().status, SessionStatus::Authenticated);
    assert!(session.is_authenticated());
    assert!(session.is_student());
    assert!(!session.is_admin());
    assert_atomic_pair(&session);
    assert!(app.storage.get(AUTH_TOKEN_KEY).is_some());
    assert!(app.storage.get(AUTH_USER_KEY).is_some());

    session.logout().await;
    assert_eq!(session.snapshot().status, SessionStatus::Unauthenticated);
    assert!(!session.is_authenticated());
    assert_atomic_pair(&session);
    assert_eq!(app.storage.get(AUTH_TOKEN_KEY), None);
    assert_eq!(app.storage.get(AUTH_USER_KEY), None);
    Ok(())
}

#[tokio::test]
async fn failed_login_leaves_prior_state_untouched() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.seed_alice().await?;

    let session = manager_for(&app);
    session.bootstrap().await;
    let before = session.snapshot();

    let result = session
        .login(&requests::LoginCredentials {
            email: "alice@example.com".into(),
            password: "wrong".into(),
        })
        .await;

    assert!(result.is_err());
    assert_eq!(session.snapshot(), before);
    assert_atomic_pair(&session);
    Ok(())
}

#[tokio::test]
async fn register_establishes_a_session() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let session = manager_for(&app);
    session.bootstrap().await;

    let profile = session
        .register(&requests::CreateAccount {
            username: "bob".into(),
            email: "bob@example.com".into(),
            password: "hunter22-hunter22".into(),
            role: Role::Teacher,
        })
        .await?;

    assert_eq!(profile.role, Role::Teacher);
    assert!(session.is_teacher());
    assert_eq!(session.snapshot().status, SessionStatus::Authenticated);
    assert_atomic_pair(&session);

    // the backend knows the session too
    let me = app.client.current_user().await?;
    assert_eq!(me.username, "bob");
    Ok(())
}

#[tokio::test]
async fn bootstrap_replays_cached_identity_then_reconciles()
-> anyhow::Result<()> {
    let app = spawn_app().await;
    app.seed_alice().await?;

    // establish and persist a session, as a previous page load would have
    let first = manager_for(&app);
    first.bootstrap().await;
    let confirmed = first.login(&app.alice_credentials()).await?;

    // overwrite the persisted identity with a stale copy
    let mut stale = confirmed.clone();
    stale.username = "alice_cached".into();
    stale.last_login = None;
    app.storage
        .set(AUTH_USER_KEY, &serde_json::to_string(&stale)?);

    // fresh manager over the same storage, as after a reload
    let session = manager_for(&app);
    let phases = Rc::new(RefCell::new(Vec::new()));
    let seen = phases.clone();
    let observer = session.clone();
    session.subscribe(move || {
        let snapshot = observer.snapshot();
        seen.borrow_mut().push((
            snapshot.status,
            snapshot.identity.map(|identity| identity.username),
        ));
    });
    session.bootstrap().await;

    // the stale identity was visible while the server was being asked
    assert!(
        phases
            .borrow()
            .contains(&(SessionStatus::Verifying, Some("alice_cached".into()))),
        "phases: {:?}",
        phases.borrow()
    );

    // and the server's answer replaced it
    let identity = session.snapshot().identity.expect("identity after verify");
    assert_eq!(session.snapshot().status, SessionStatus::Authenticated);
    assert_eq!(identity.username, "alice");
    assert!(identity.last_login.is_some());
    assert_atomic_pair(&session);

    // including the persisted copy
    let persisted: UserProfile =
        serde_json::from_str(&app.storage.get(AUTH_USER_KEY).unwrap())?;
    assert_eq!(persisted.username, "alice");
    Ok(())
}

#[tokio::test]
async fn rejected_verification_logs_the_session_out() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.seed_alice().await?;

    let first = manager_for(&app);
    first.bootstrap().await;
    first.login(&app.alice_credentials()).await?;

    // every outstanding token expires server-side
    app.api.revoke_tokens();

    let session = manager_for(&app);
    let phases = Rc::new(RefCell::new(Vec::new()));
    let seen = phases.clone();
    let observer = session.clone();
    session.subscribe(move || {
        seen.borrow_mut().push(observer.snapshot().status);
    });
    session.bootstrap().await;

    // the fail-closed path is observable before the final state
    assert!(phases.borrow().contains(&SessionStatus::Failed));

    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Unauthenticated);
    assert_eq!(snapshot.token, None);
    assert_eq!(snapshot.identity, None);
    assert_eq!(app.storage.get(AUTH_TOKEN_KEY), None);
    assert_eq!(app.storage.get(AUTH_USER_KEY), None);
    Ok(())
}

#[tokio::test]
async fn logout_is_idempotent() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let session = manager_for(&app);
    session.bootstrap().await;
    let before = session.snapshot();

    session.logout().await;
    assert_eq!(session.snapshot(), before);

    session.logout().await;
    assert_eq!(session.snapshot(), before);
    Ok(())
}

#[tokio::test]
async fn update_identity_merges_locally() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.seed_alice().await?;

    let session = manager_for(&app);
    session.bootstrap().await;
    session.login(&app.alice_credentials()).await?;
    let token_before = session.snapshot().token;

    session.update_identity(&requests::UpdateProfile {
        username: Some("alice_renamed".into()),
        email: None,
    });

    let identity = session.snapshot().identity.unwrap();
    assert_eq!(identity.username, "alice_renamed");
    assert_eq!(identity.email, "alice@example.com");
    assert_eq!(session.snapshot().token, token_before);

    // the merge is persisted for the next reload
    let persisted: UserProfile =
        serde_json::from_str(&app.storage.get(AUTH_USER_KEY).unwrap())?;
    assert_eq!(persisted.username, "alice_renamed");
    Ok(())
}

#[tokio::test]
async fn update_identity_without_a_session_is_a_noop() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let session = manager_for(&app);
    session.bootstrap().await;

    session.update_identity(&requests::UpdateProfile {
        username: Some("ghost".into()),
        email: None,
    });

    assert_eq!(session.snapshot().identity, None);
    assert_eq!(app.storage.get(AUTH_USER_KEY), None);
    Ok(())
}
