use keystone::{Keystone, KeystoneBuilder, Permission, Role, RoleCatalog, UserId, bearer_token};
use keystone_core::error::{AuthenticationError, AuthorizationError, ConfigurationError, Error};
use serde_json::json;

fn keystone() -> Keystone {
    KeystoneBuilder::new().build().unwrap()
}

fn microsoft_payload() -> serde_json::Value {
    json!({
        "id": "ms-1",
        "userPrincipalName": "Someone@Contoso.com",
        "displayName": "Someone"
    })
}

#[test]
fn test_default_user_permissions() {
    let keystone = keystone();
    let login = keystone.login("microsoft", &microsoft_payload(), None).unwrap();
    let context = keystone.authenticate(Some(&login.access_token)).unwrap();

    assert_eq!(
        context.session.identity.email.as_deref(),
        Some("someone@contoso.com")
    );
    assert!(keystone.authorize(&context, &[], &["read".into()]).is_ok());
    assert!(keystone.authorize(&context, &["user".into()], &[]).is_ok());
    assert!(matches!(
        keystone.authorize(&context, &[], &["delete_any".into()]),
        Err(Error::Authorization(
            AuthorizationError::InsufficientPermission { .. }
        ))
    ));
}

#[test]
fn test_admin_wildcard_passes_any_permission() {
    let keystone = keystone();
    let user_id = UserId::new("microsoft_ms-1");
    keystone.assign_role(&user_id, &Role::new("admin")).unwrap();

    let login = keystone.login("microsoft", &microsoft_payload(), None).unwrap();
    assert!(login.permissions.is_all());
    assert_eq!(login.permissions.names(), vec!["*"]);

    let context = keystone.authenticate(Some(&login.access_token)).unwrap();
    for permission in ["read", "delete_any", "launch_missiles"] {
        assert!(
            keystone
                .authorize(&context, &[], &[Permission::new(permission)])
                .is_ok()
        );
    }
    // The default role was replaced by the explicit assignment
    assert!(matches!(
        keystone.authorize(&context, &["user".into()], &[]),
        Err(Error::Authorization(AuthorizationError::InsufficientRole { .. }))
    ));
}

#[test]
fn test_role_changes_apply_to_new_sessions() {
    let keystone = keystone();
    let user_id = UserId::new("microsoft_ms-1");

    let before = keystone.login("microsoft", &microsoft_payload(), None).unwrap();
    keystone.assign_role(&user_id, &Role::new("moderator")).unwrap();
    let after = keystone.login("microsoft", &microsoft_payload(), None).unwrap();

    let before = keystone.authenticate(Some(&before.access_token)).unwrap();
    let after = keystone.authenticate(Some(&after.access_token)).unwrap();
    let required = [Permission::new("update_any")];

    assert!(keystone.authorize(&before, &[], &required).is_err());
    assert!(keystone.authorize(&after, &[], &required).is_ok());

    assert!(keystone.remove_role(&user_id, &Role::new("moderator")));
    assert!(!keystone.remove_role(&user_id, &Role::new("moderator")));
    assert_eq!(
        keystone.get_roles(&user_id).into_iter().collect::<Vec<_>>(),
        vec![Role::new("user")]
    );
}

#[test]
fn test_assign_unknown_role() {
    let keystone = keystone();

    assert!(matches!(
        keystone.assign_role(&UserId::new("google_1"), &Role::new("superuser")),
        Err(Error::Configuration(ConfigurationError::UnknownRole(_)))
    ));
}

#[test]
fn test_custom_role_catalog() {
    let keystone = KeystoneBuilder::new()
        .with_role_catalog(
            RoleCatalog::empty()
                .with_role("user", ["read"])
                .with_role("auditor", ["read", "audit"]),
        )
        .build()
        .unwrap();
    let user_id = UserId::new("okta_00u1");
    keystone.assign_role(&user_id, &Role::new("auditor")).unwrap();

    let login = keystone
        .login("okta", &json!({"sub": "00u1", "preferred_username": "pat"}), None)
        .unwrap();
    assert_eq!(login.permissions.names(), vec!["audit", "read"]);
}

#[test]
fn test_authenticate_from_header() {
    let keystone = keystone();
    let login = keystone.login("microsoft", &microsoft_payload(), None).unwrap();
    let header = format!("Bearer {}", login.access_token);

    assert!(keystone.authenticate(bearer_token(&header)).is_ok());
    assert!(matches!(
        keystone.authenticate(bearer_token("Basic dXNlcjpwYXNz")),
        Err(Error::Authentication(AuthenticationError::MissingToken))
    ));
}

#[test]
fn test_authenticate_rejects_tampered_token() {
    let keystone = keystone();
    let login = keystone.login("microsoft", &microsoft_payload(), None).unwrap();

    let forged = login.refresh_token.split('.').nth(1).unwrap().to_string();
    let mut parts: Vec<&str> = login.access_token.split('.').collect();
    parts[1] = &forged;
    let tampered = parts.join(".");

    assert!(matches!(
        keystone.authenticate(Some(&tampered)),
        Err(Error::Authentication(
            AuthenticationError::TokenInvalidSignature
        ))
    ));
    assert!(matches!(
        keystone.authenticate(Some("not-a-token")),
        Err(Error::Authentication(AuthenticationError::TokenMalformed(_)))
    ));
}

#[test]
fn test_error_status_codes() {
    let keystone = keystone();

    let unauthenticated = keystone.authenticate(None).unwrap_err();
    assert_eq!(unauthenticated.status_code(), 401);

    let login = keystone.login("microsoft", &microsoft_payload(), None).unwrap();
    let context = keystone.authenticate(Some(&login.access_token)).unwrap();
    let forbidden = keystone
        .authorize(&context, &["admin".into()], &[])
        .unwrap_err();
    assert_eq!(forbidden.status_code(), 403);
    assert_eq!(
        forbidden.to_string(),
        "Authorization error: Insufficient role: requires one of [admin]"
    );
}
