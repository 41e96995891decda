use anyhow::Result;

use super::config_model::{Auth, Database, DotEnvyConfig, Server, Stripe};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let server = Server {
        port: std::env::var("SERVER_PORT")
            .expect("SERVER_PORT is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .expect("SERVER_BODY_LIMIT is invalid")
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .expect("SERVER_TIMEOUT is invalid")
            .parse()?,
    };

    let database = Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let auth = Auth {
        jwt_secret: std::env::var("AUTH_JWT_SECRET").expect("AUTH_JWT_SECRET is invalid"),
    };

    let stripe = Stripe {
        secret_key: std::env::var("STRIPE_SECRET_KEY").expect("STRIPE_SECRET_KEY is invalid"),
        webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET")
            .expect("STRIPE_WEBHOOK_SECRET is invalid"),
        success_url: std::env::var("STRIPE_CHECKOUT_SUCCESS_URL")
            .expect("STRIPE_CHECKOUT_SUCCESS_URL is invalid"),
        cancel_url: std::env::var("STRIPE_CHECKOUT_CANCEL_URL")
            .expect("STRIPE_CHECKOUT_CANCEL_URL is invalid"),
    };

    Ok(DotEnvyConfig {
        server,
        database,
        auth,
        stripe,
    })
}
