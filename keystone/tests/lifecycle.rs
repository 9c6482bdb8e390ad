use chrono::Duration;
use keystone::{ClientMetadata, Keystone, KeystoneBuilder, KeystoneConfig, Role, UserId};
use keystone_core::error::{AuthenticationError, Error, IdentityError};
use serde_json::json;

const TEST_HS256_SECRET: &str = "this_is_a_test_secret_key_for_hs256_jwt_tokens_not_for_prod";

fn keystone() -> Keystone {
    KeystoneBuilder::new()
        .with_jwt_secret(TEST_HS256_SECRET)
        .with_issuer("keystone-test")
        .build()
        .unwrap()
}

fn google_payload() -> serde_json::Value {
    json!({
        "id": "42",
        "email": "a@b.com",
        "name": "A",
        "picture": "https://example.com/a.png",
        "verified_email": true
    })
}

#[test]
fn test_login_creates_session() {
    let keystone = keystone();

    let login = keystone.login("google", &google_payload(), None).unwrap();

    assert_eq!(login.user_id, UserId::new("google_42"));
    assert_eq!(login.roles.len(), 1);
    assert!(login.roles.contains(&Role::new("user")));
    assert_eq!(login.permissions.names(), vec!["create_own", "read"]);
    assert_eq!(login.expires_in, 24 * 60 * 60);
    assert_ne!(login.access_token, login.refresh_token);

    let session = keystone.session(&login.session_id).unwrap();
    assert_eq!(session.user_id, login.user_id);
    assert_eq!(session.identity.email.as_deref(), Some("a@b.com"));
    assert_eq!(session.access_token, login.access_token);
    assert!(session.session_id.is_valid());
}

#[test]
fn test_login_response_serializes() {
    let keystone = keystone();
    let login = keystone.login("google", &google_payload(), None).unwrap();

    let value = serde_json::to_value(&login).unwrap();
    assert_eq!(value["user_id"], "google_42");
    assert_eq!(value["roles"], json!(["user"]));
    assert_eq!(value["permissions"], json!(["create_own", "read"]));
}

#[test]
fn test_login_then_authenticate() {
    let keystone = keystone();
    let client = ClientMetadata::new(
        Some("test-agent".to_string()),
        Some("127.0.0.1".to_string()),
    );
    let login = keystone
        .login("google", &google_payload(), Some(client.clone()))
        .unwrap();

    let context = keystone.authenticate(Some(&login.access_token)).unwrap();
    assert_eq!(context.user_id(), &login.user_id);
    assert_eq!(context.session.session_id, login.session_id);
    assert_eq!(context.session.client, Some(client));
    assert_eq!(context.claims.iss.as_deref(), Some("keystone-test"));
}

#[test]
fn test_login_rejects_bad_payloads() {
    let keystone = keystone();

    assert!(matches!(
        keystone.login("yahoo", &google_payload(), None),
        Err(Error::Identity(IdentityError::UnsupportedProvider(_)))
    ));
    assert!(matches!(
        keystone.login("google", &json!({"email": "a@b.com"}), None),
        Err(Error::Identity(IdentityError::MalformedPayload(_)))
    ));
    assert!(keystone.store().is_empty());
}

#[test]
fn test_token_issued_for_login_round_trips() {
    let keystone = keystone();
    let login = keystone
        .login("github", &json!({"id": 7, "login": "octo"}), None)
        .unwrap();

    let claims = keystone.codec().verify(&login.access_token).unwrap();
    assert_eq!(claims.sub, "github_7");
    assert!(claims.roles.unwrap().contains(&Role::new("user")));
}

#[test]
fn test_refresh_issues_new_access_token() {
    let keystone = keystone();
    let login = keystone.login("google", &google_payload(), None).unwrap();

    let refreshed = keystone.refresh(&login.refresh_token).unwrap();
    assert_ne!(refreshed.access_token, login.access_token);
    assert!(refreshed.refresh_token.is_none());

    // Only the current access token resolves to the session
    assert!(keystone.authenticate(Some(&refreshed.access_token)).is_ok());
    assert!(matches!(
        keystone.authenticate(Some(&login.access_token)),
        Err(Error::Authentication(AuthenticationError::SessionNotFound))
    ));

    // Without rotation the refresh token keeps working
    assert!(keystone.refresh(&login.refresh_token).is_ok());
}

#[test]
fn test_refresh_rotation() {
    let keystone = KeystoneBuilder::new()
        .with_jwt_secret(TEST_HS256_SECRET)
        .with_refresh_rotation(true)
        .build()
        .unwrap();
    let login = keystone.login("google", &google_payload(), None).unwrap();

    let refreshed = keystone.refresh(&login.refresh_token).unwrap();
    let rotated = refreshed.refresh_token.unwrap();
    assert_ne!(rotated, login.refresh_token);

    assert!(matches!(
        keystone.refresh(&login.refresh_token),
        Err(Error::Authentication(AuthenticationError::RefreshTokenNotFound))
    ));
    assert!(keystone.refresh(&rotated).is_ok());
}

#[test]
fn test_refresh_rejects_access_token() {
    let keystone = keystone();
    let login = keystone.login("google", &google_payload(), None).unwrap();

    assert!(matches!(
        keystone.refresh(&login.access_token),
        Err(Error::Authentication(AuthenticationError::TokenMalformed(_)))
    ));
}

#[test]
fn test_refresh_from_other_instance_is_rejected() {
    let issuer = keystone();
    let other = KeystoneBuilder::new().build().unwrap();
    let login = issuer.login("google", &google_payload(), None).unwrap();

    assert!(matches!(
        other.refresh(&login.refresh_token),
        Err(Error::Authentication(
            AuthenticationError::TokenInvalidSignature
        ))
    ));
}

#[tokio::test]
async fn test_refresh_after_expiry() {
    let keystone = Keystone::new(
        KeystoneConfig::default()
            .with_jwt_secret(TEST_HS256_SECRET)
            .with_refresh_ttl(Duration::seconds(1)),
    )
    .unwrap();
    let login = keystone.login("google", &google_payload(), None).unwrap();

    // Wait for expiration
    tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;

    assert!(matches!(
        keystone.refresh(&login.refresh_token),
        Err(Error::Authentication(AuthenticationError::TokenExpired))
    ));
    assert_eq!(keystone.cleanup_expired_sessions(), 1);
    assert!(keystone.session(&login.session_id).is_none());
}

#[tokio::test]
async fn test_access_token_expiry() {
    let keystone = Keystone::new(
        KeystoneConfig::default()
            .with_jwt_secret(TEST_HS256_SECRET)
            .with_access_ttl(Duration::seconds(1)),
    )
    .unwrap();
    let login = keystone.login("google", &google_payload(), None).unwrap();
    assert!(keystone.authenticate(Some(&login.access_token)).is_ok());

    tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;

    assert!(matches!(
        keystone.authenticate(Some(&login.access_token)),
        Err(Error::Authentication(AuthenticationError::TokenExpired))
    ));
    let refreshed = keystone.refresh(&login.refresh_token).unwrap();
    assert!(keystone.authenticate(Some(&refreshed.access_token)).is_ok());
}

#[test]
fn test_logout() {
    let keystone = keystone();
    let login = keystone.login("google", &google_payload(), None).unwrap();

    keystone.logout(&login.session_id).unwrap();

    assert!(matches!(
        keystone.authenticate(Some(&login.access_token)),
        Err(Error::Authentication(AuthenticationError::SessionNotFound))
    ));
    assert!(matches!(
        keystone.refresh(&login.refresh_token),
        Err(Error::Authentication(AuthenticationError::RefreshTokenNotFound))
    ));
    assert!(matches!(
        keystone.logout(&login.session_id),
        Err(Error::Authentication(AuthenticationError::SessionNotFound))
    ));
}

#[test]
fn test_logout_all() {
    let keystone = keystone();
    let first = keystone.login("google", &google_payload(), None).unwrap();
    let second = keystone.login("google", &google_payload(), None).unwrap();
    let other = keystone
        .login("okta", &json!({"sub": "00u1", "email": "c@d.com"}), None)
        .unwrap();

    assert_eq!(keystone.logout_all(&first.user_id), 2);
    assert_eq!(keystone.logout_all(&first.user_id), 0);

    for login in [&first, &second] {
        assert!(keystone.authenticate(Some(&login.access_token)).is_err());
        assert!(keystone.refresh(&login.refresh_token).is_err());
    }
    assert!(keystone.authenticate(Some(&other.access_token)).is_ok());
}

#[test]
fn test_session_lookups() {
    let keystone = keystone();
    let user_id = UserId::new("google_42");
    assert!(keystone.session_by_user_id(&user_id).is_none());

    let first = keystone.login("google", &google_payload(), None).unwrap();
    let second = keystone.login("google", &google_payload(), None).unwrap();

    let any = keystone.session_by_user_id(&user_id).unwrap();
    assert!(any.session_id == first.session_id || any.session_id == second.session_id);

    let ids: Vec<_> = keystone
        .sessions_for_user(&user_id)
        .into_iter()
        .map(|session| session.session_id)
        .collect();
    assert_eq!(ids, vec![first.session_id, second.session_id]);
}

#[test]
fn test_login_with_unusual_emails() {
    let keystone = keystone();

    let guest = keystone
        .login(
            "microsoft",
            &json!({
                "id": "ms-guest",
                "userPrincipalName": "alice_gmail.com#EXT#@contoso.onmicrosoft.com",
                "displayName": "Alice"
            }),
            None,
        )
        .unwrap();
    let session = keystone.session(&guest.session_id).unwrap();
    assert_eq!(
        session.identity.email.as_deref(),
        Some("alice_gmail.com#ext#@contoso.onmicrosoft.com")
    );

    let apostrophe = keystone
        .login(
            "okta",
            &json!({"sub": "00u9", "email": "o'brien@example.com", "name": "Pat"}),
            None,
        )
        .unwrap();
    assert_eq!(apostrophe.user_id.as_str(), "okta_00u9");

    // An unusable email does not block a login that has a display name
    let login = keystone
        .login(
            "google",
            &json!({"id": "7", "email": "not an email", "name": "Sam"}),
            None,
        )
        .unwrap();
    let session = keystone.session(&login.session_id).unwrap();
    assert_eq!(session.identity.email, None);
    assert_eq!(session.identity.display_name.as_deref(), Some("Sam"));
}
