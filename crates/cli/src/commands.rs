//! CLI commands

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::Path;
use std::sync::Arc;
use talent_core::SessionConfig;
use talent_session::{
    CredentialStore, FileStore, GuardDecision, HttpAuthApi, LoginCredentials, LogoutOutcome,
    NavigationRequest, SessionContainer, SessionManager,
};
use tracing::{info, warn};

use crate::config::SESSION_FILE;

#[derive(Subcommand)]
pub enum Commands {
    /// Email a one-time password
    OtpRequest {
        /// Account email address
        #[arg(long)]
        email: String,
    },

    /// Sign in with an emailed one-time password
    OtpVerify {
        /// Account email address
        #[arg(long)]
        email: String,

        /// One-time password from the email
        #[arg(long)]
        otp: String,
    },

    /// Sign in with email and password
    Login {
        /// Account email address
        #[arg(long)]
        email: String,

        /// Account password
        #[arg(long, env = "TALENT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out and forget the local session
    Logout,

    /// Show the local session
    Status,

    /// Check whether the session may navigate to a route
    Check {
        /// Route to navigate to
        target: String,

        /// Role the route requires; repeat to accept any of several
        #[arg(long = "role")]
        roles: Vec<String>,
    },
}

/// Wire a session manager over the file store in `data_dir`
fn open_session(config: &SessionConfig, data_dir: &Path) -> Result<SessionManager> {
    let path = data_dir.join(SESSION_FILE);
    let backend = FileStore::open(&path)
        .with_context(|| format!("Failed to open session store at {}", path.display()))?;
    let store = CredentialStore::from_config(Arc::new(backend), config)?;
    let container = Arc::new(SessionContainer::new(store.clone()));
    let api = HttpAuthApi::from_config(&config.api, store)?;
    Ok(SessionManager::new(container, Arc::new(api)))
}

impl Commands {
    pub async fn execute(self, config: SessionConfig, data_dir: &Path) -> Result<()> {
        let manager = open_session(&config, data_dir)?;

        match self {
            Self::OtpRequest { email } => {
                manager.request_otp(&email).await?;
                println!("One-time password sent to {email}");
            }
            Self::OtpVerify { email, otp } => {
                let user = manager.verify_otp(&email, &otp).await?;
                println!("Signed in as {}", user.display_name().unwrap_or(&email));
            }
            Self::Login { email, password } => {
                let user = manager
                    .login(&LoginCredentials {
                        email: email.clone(),
                        password,
                    })
                    .await?;
                println!("Signed in as {}", user.display_name().unwrap_or(&email));
            }
            Self::Logout => match manager.logout().await? {
                LogoutOutcome::Notified | LogoutOutcome::Skipped => println!("Signed out"),
                LogoutOutcome::BackendFailed(reason) => {
                    warn!(%reason, "Server did not acknowledge logout");
                    println!("Signed out locally (server unreachable)");
                }
            },
            Self::Status => print_status(&manager)?,
            Self::Check { target, roles } => {
                let guard = manager.guard(config.routes);
                let decision = guard.evaluate(&NavigationRequest::new(&target).requiring(roles));
                info!(route = %target, ?decision, "Route checked");
                match decision {
                    GuardDecision::Allowed => println!("allowed"),
                    GuardDecision::Denied { redirect, return_to } => {
                        anyhow::bail!("denied: sign in at {redirect} (then return to {return_to})")
                    }
                    GuardDecision::Forbidden { redirect } => {
                        anyhow::bail!("forbidden: redirect to {redirect}")
                    }
                }
            }
        }

        Ok(())
    }
}

fn print_status(manager: &SessionManager) -> Result<()> {
    let state = manager.container().snapshot();
    let Some(user) = state.user.filter(|_| state.is_authenticated) else {
        println!("Not signed in");
        return Ok(());
    };

    println!(
        "Signed in as {} (roles: {})",
        user.display_name().unwrap_or("unknown user"),
        state.roles
    );
    println!("{}", serde_json::to_string_pretty(&user)?);
    Ok(())
}
