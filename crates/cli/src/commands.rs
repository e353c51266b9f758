//! CLI commands

use anyhow::{Result, bail};
use clap::{Subcommand, ValueEnum};
use jobdm_http::client::auth_check::AuthStatus;
use jobdm_http::types::{Gender, RegisterRequest, RegistrationType, UpdateProfileRequest};
use jobdm_http::{FileTokenStore, JobdmClient, JobdmClientBuilder};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config;

const LOGIN_HINT: &str = "Run `jobdm login` to start a new session.";

#[derive(Subcommand)]
pub enum Commands {
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "JOBDM_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create a new account; a one-time code is emailed for verification
    Register {
        #[arg(long)]
        full_name: String,

        #[arg(long)]
        email: String,

        #[arg(long, env = "JOBDM_PASSWORD", hide_env_values = true)]
        password: String,

        /// Account type
        #[arg(long = "type", value_enum)]
        account_type: AccountType,

        #[arg(long)]
        contact_no: Option<String>,

        #[arg(long, value_enum)]
        gender: Option<GenderArg>,
    },

    /// Verify the emailed one-time code and log in
    VerifyOtp {
        #[arg(long)]
        email: String,

        #[arg(long)]
        otp: String,
    },

    /// Send a new one-time code
    ResendOtp {
        #[arg(long)]
        email: String,
    },

    /// Check whether the stored session is still accepted
    Whoami,

    /// Show the current profile
    Profile,

    /// Show profile completion
    ProfileCompletion,

    /// Update profile fields; omitted fields are left unchanged
    UpdateProfile {
        #[arg(long)]
        full_name: Option<String>,

        #[arg(long)]
        contact_no: Option<String>,

        #[arg(long, value_enum)]
        gender: Option<GenderArg>,

        #[arg(long)]
        linkedin_url: Option<String>,

        #[arg(long)]
        resume_url: Option<String>,
    },

    /// End the session and remove stored tokens
    Logout,

    /// Generate a default client configuration file
    InitConfig {
        /// Output file path (defaults to <data-dir>/config.json)
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum AccountType {
    Hr,
    Employee,
    Company,
}

impl From<AccountType> for RegistrationType {
    fn from(value: AccountType) -> Self {
        match value {
            AccountType::Hr => Self::Hr,
            AccountType::Employee => Self::Employee,
            AccountType::Company => Self::Company,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum GenderArg {
    Male,
    Female,
    Other,
}

impl From<GenderArg> for Gender {
    fn from(value: GenderArg) -> Self {
        match value {
            GenderArg::Male => Self::Male,
            GenderArg::Female => Self::Female,
            GenderArg::Other => Self::Other,
        }
    }
}

/// Settings shared by every command
pub struct Context {
    pub data_dir: PathBuf,
    pub config_path: Option<PathBuf>,
    pub api_url: Option<String>,
}

impl Context {
    /// Open a client whose tokens persist in the data directory
    fn session(&self) -> Result<Session> {
        let client_config = config::load_client_config(
            &self.data_dir,
            self.config_path.as_deref(),
            self.api_url.as_deref(),
        )?;
        let client = JobdmClientBuilder::from_config(&client_config)
            .token_store(Arc::new(FileTokenStore::in_dir(&self.data_dir)))
            .build()?;
        info!(api_url = %client.base_url(), "Using backend");

        let listener = spawn_session_listener(&client);
        Ok(Session { client, listener })
    }
}

/// A client plus the task reporting its session events
struct Session {
    client: JobdmClient,
    listener: JoinHandle<()>,
}

impl Session {
    /// Drop the client and wait until pending notices are printed
    async fn finish(self) {
        drop(self.client);
        let _ = self.listener.await;
    }
}

/// Print the expiry notice when the client gives up on the session
///
/// The task ends once every handle to `client` is dropped.
fn spawn_session_listener(client: &JobdmClient) -> JoinHandle<()> {
    let mut events = client.session_events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(notice) = event.notice() {
                        info!(?event, "Session ended by the client");
                        eprintln!("{notice}");
                        eprintln!("{LOGIN_HINT}");
                    }
                }
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    })
}

impl Commands {
    pub async fn execute(self, context: Context) -> Result<()> {
        if let Self::InitConfig { output, force } = self {
            return init_config(&context, output, force);
        }

        let session = context.session()?;
        let result = self.run(&session.client).await;
        session.finish().await;
        result
    }

    async fn run(self, client: &JobdmClient) -> Result<()> {
        match self {
            Self::Login { email, password } => {
                let response = client.login(email, password).await?;
                println!(
                    "Logged in as {} <{}>",
                    response.user.full_name, response.user.email
                );
            }
            Self::Register {
                full_name,
                email,
                password,
                account_type,
                contact_no,
                gender,
            } => {
                let user = client
                    .register(RegisterRequest {
                        full_name,
                        email,
                        password,
                        user_type: account_type.into(),
                        contact_no,
                        gender: gender.map(Into::into),
                    })
                    .await?;
                println!(
                    "Registered {}. Check your inbox for the verification code.",
                    user.email
                );
            }
            Self::VerifyOtp { email, otp } => {
                let response = client.verify_otp(email, otp).await?;
                println!("Email verified. Logged in as {}", response.user.email);
            }
            Self::ResendOtp { email } => {
                client.resend_otp(email.as_str()).await?;
                println!("A new code was sent to {email}");
            }
            Self::Whoami => match client.check_auth().await {
                AuthStatus::Authenticated(user) => {
                    println!("{} <{}> ({:?})", user.full_name, user.email, user.user_type);
                }
                AuthStatus::Unauthenticated { error } => {
                    if let Some(error) = error {
                        eprintln!("{error}");
                    }
                    bail!("not logged in");
                }
            },
            Self::Profile => print_json(&client.profile().await?)?,
            Self::ProfileCompletion => print_json(&client.profile_completion().await?)?,
            Self::UpdateProfile {
                full_name,
                contact_no,
                gender,
                linkedin_url,
                resume_url,
            } => {
                let update = UpdateProfileRequest {
                    full_name,
                    contact_no,
                    gender: gender.map(Into::into),
                    linked_in_url: linkedin_url,
                    resume_url,
                    ..UpdateProfileRequest::default()
                };
                if update.is_empty() {
                    bail!("nothing to update; pass at least one field");
                }
                print_json(&client.update_profile(&update).await?)?;
            }
            Self::Logout => {
                client.logout().await;
                println!("Logged out");
            }
            Self::InitConfig { .. } => bail!("init-config does not use a session"),
        }
        Ok(())
    }
}

fn init_config(context: &Context, output: Option<PathBuf>, force: bool) -> Result<()> {
    let config_path = output.unwrap_or_else(|| context.data_dir.join(config::CONFIG_FILE_NAME));
    if config_path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite",
            config_path.display()
        );
    }

    // Create parent directory if it doesn't exist
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    config::generate_default_config(&config_path)?;
    println!("Generated configuration at: {}", config_path.display());
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
