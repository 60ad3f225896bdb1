//! Login command.
//!
//! # Usage
//!
//! ```bash
//! export AIQ_TOKEN=$(AIQ_PASSWORD=... aiq-cli login -u admin)
//! ```

use secrecy::SecretString;

use aiq_admin::api::BotApi;

use super::{CliError, client};

/// Exchange credentials for a token and print it on stdout.
pub async fn login(username: &str) -> Result<(), CliError> {
    let password = std::env::var("AIQ_PASSWORD")
        .map(SecretString::from)
        .map_err(|_| CliError::MissingEnvVar("AIQ_PASSWORD"))?;

    let success = client()?.login(username, &password).await?;
    tracing::info!(
        "Logged in as {} ({})",
        success.admin.display_name(),
        success.admin.role
    );

    #[allow(clippy::print_stdout)]
    {
        println!("{}", success.token.expose_secret());
    }
    Ok(())
}
