use super::*;
use jsonwebtoken::{EncodingKey, Header, encode};
use std::env;

fn set_env_vars() {
    unsafe {
        env::set_var("SERVER_PORT", "8080");
        env::set_var("SERVER_BODY_LIMIT", "10");
        env::set_var("SERVER_TIMEOUT", "30");
        env::set_var("DATABASE_URL", "postgres://localhost:5432/db");
        env::set_var("AUTH_JWT_SECRET", "supersecretjwtsecretforunittesting123");
        env::set_var("STRIPE_SECRET_KEY", "sk_test_unit");
        env::set_var("STRIPE_WEBHOOK_SECRET", "whsec_unit");
        env::set_var(
            "STRIPE_CHECKOUT_SUCCESS_URL",
            "https://app.example.com/payment/success",
        );
        env::set_var(
            "STRIPE_CHECKOUT_CANCEL_URL",
            "https://app.example.com/payment/cancel",
        );
    }
}

#[test]
fn test_validate_access_token_success() {
    set_env_vars();
    let secret = "supersecretjwtsecretforunittesting123";
    let my_claims = AccessTokenClaims {
        sub: "123e4567-e89b-12d3-a456-426614174000".to_string(),
        role: "user".to_string(),
        email: Some("test@example.com".to_string()),
        exp: 9999999999, // far future
    };

    let token = encode(
        &Header::default(),
        &my_claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap();

    let claims = validate_access_token(&token).expect("Valid token should pass");
    assert_eq!(claims.sub, my_claims.sub);
    assert_eq!(claims.role, my_claims.role);
    assert_eq!(claims.email, my_claims.email);
}

#[test]
fn test_validate_access_token_expired() {
    set_env_vars();
    let secret = "supersecretjwtsecretforunittesting123";
    let my_claims = AccessTokenClaims {
        sub: "123e4567-e89b-12d3-a456-426614174000".to_string(),
        role: "user".to_string(),
        email: Some("test@example.com".to_string()),
        exp: 1, // past
    };

    let token = encode(
        &Header::default(),
        &my_claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap();

    let result = validate_access_token(&token);
    assert!(result.is_err());
}

#[test]
fn test_validate_access_token_invalid_signature() {
    set_env_vars();
    let secret = "wrongsecret";
    let my_claims = AccessTokenClaims {
        sub: "123e4567-e89b-12d3-a456-426614174000".to_string(),
        role: "admin".to_string(),
        email: Some("test@example.com".to_string()),
        exp: 9999999999,
    };

    let token = encode(
        &Header::default(),
        &my_claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap();

    let result = validate_access_token(&token);
    assert!(result.is_err());
}
