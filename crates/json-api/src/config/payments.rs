//! Payment Provider Config

use clap::Args;

/// Payment provider settings.
#[derive(Debug, Args)]
pub struct PaymentsConfig {
    /// Secret key used to sign order integrity hashes. When absent the
    /// hash endpoint answers every request with a configuration error.
    #[arg(long, env = "BOLD_SECRET_KEY", hide_env_values = true)]
    pub bold_secret_key: Option<String>,
}
