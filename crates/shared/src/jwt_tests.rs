//! Unit tests for JWT functionality.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::{Claims, PrincipalKind};
use crate::jwt::{JwtConfig, JwtError, JwtService};

fn create_test_service() -> JwtService {
    JwtService::new(JwtConfig {
        secret: "test-secret-key-for-testing".to_string(),
        access_token_expires_minutes: 15,
    })
}

#[test]
fn test_claims_new_sets_correct_fields() {
    let agent_id = Uuid::new_v4();
    let expires_at = Utc::now() + Duration::hours(1);

    let claims = Claims::new(agent_id, PrincipalKind::Agent, expires_at);

    assert_eq!(claims.subject(), agent_id);
    assert!(claims.is(PrincipalKind::Agent));
    assert!(!claims.is(PrincipalKind::Service));
    assert!(claims.iat <= Utc::now().timestamp());
    assert_eq!(claims.exp, expires_at.timestamp());
}

#[test]
fn test_generate_and_validate_roundtrip() {
    let service = create_test_service();
    let user_id = Uuid::new_v4();

    let token = service
        .generate_access_token(user_id, PrincipalKind::User)
        .unwrap();
    let claims = service.validate_token(&token).unwrap();

    assert_eq!(claims.subject(), user_id);
    assert_eq!(claims.kind, PrincipalKind::User);
}

#[test]
fn test_invalid_token() {
    let service = create_test_service();
    let result = service.validate_token("invalid.token.here");
    assert!(matches!(result, Err(JwtError::DecodingError(_))));
}

#[test]
fn test_token_signed_with_other_secret_rejected() {
    let issuer = JwtService::new(JwtConfig {
        secret: "another-secret".to_string(),
        access_token_expires_minutes: 15,
    });
    let token = issuer
        .generate_access_token(Uuid::new_v4(), PrincipalKind::Service)
        .unwrap();

    assert!(create_test_service().validate_token(&token).is_err());
}

#[test]
fn test_expired_token() {
    let service = JwtService::new(JwtConfig {
        secret: "test-secret-key-for-testing".to_string(),
        access_token_expires_minutes: -10,
    });
    let token = service
        .generate_access_token(Uuid::new_v4(), PrincipalKind::Agent)
        .unwrap();

    assert!(matches!(service.validate_token(&token), Err(JwtError::Expired)));
}

#[test]
fn test_principal_kind_serializes_lowercase() {
    assert_eq!(
        serde_json::to_string(&PrincipalKind::Service).unwrap(),
        "\"service\""
    );
}
