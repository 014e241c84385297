use std::process::ExitCode;

use dotenvy::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use identity_store::{DataStoreConfig, IdentityStore, NewOAuthAccount, SignupData, User};

const DEMO_PROVIDER: &str = "demo";

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "{}=debug,identity_store=debug",
                    env!("CARGO_CRATE_NAME")
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(email), Some(password)) = (args.next(), args.next()) else {
        eprintln!("usage: demo-identity <email> <password>");
        return ExitCode::from(2);
    };

    let config = match DataStoreConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid data store configuration");
            return ExitCode::FAILURE;
        }
    };

    // Nothing works without the database, so stop here if it is unreachable
    let identity = match IdentityStore::connect(&config).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to the identity database");
            return ExitCode::FAILURE;
        }
    };

    match run(&identity, email, password).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Demo failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(
    identity: &IdentityStore,
    email: String,
    password: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let user = find_or_create_user(identity, email, &password).await?;

    match identity
        .users()
        .verify_credentials(&user.email, &password)
        .await?
    {
        Some(_) => tracing::info!(user_id = %user.id, "Credentials verified"),
        None => tracing::warn!(user_id = %user.id, "Credentials rejected"),
    }

    let provider_account_id = format!("demo-{}", user.id);
    let account = match identity
        .oauth_accounts()
        .get_account_by_provider(DEMO_PROVIDER, &provider_account_id)
        .await?
    {
        Some(account) => account,
        None => {
            let mut new = NewOAuthAccount::new(&user.id, DEMO_PROVIDER, provider_account_id);
            new.token_type = Some("Bearer".to_string());
            identity.oauth_accounts().create_account(new).await?
        }
    };
    tracing::info!(
        account_id = %account.id,
        provider = %account.provider,
        "Demo account linked"
    );

    Ok(())
}

async fn find_or_create_user(
    identity: &IdentityStore,
    email: String,
    password: &str,
) -> Result<User, Box<dyn std::error::Error>> {
    if let Some(user) = identity.users().get_user_by_email(&email).await? {
        tracing::info!(user_id = %user.id, created_at = %user.created_at, "User already exists");
        return Ok(user);
    }

    let mut signup = SignupData::new(email, password);
    signup.confirm_password = Some(password.to_string());
    let user = identity.users().create_user(signup).await?;
    tracing::info!(user_id = %user.id, "User created");
    Ok(user)
}
