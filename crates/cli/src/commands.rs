//! CLI commands

use anyhow::{Context, Result, anyhow, bail};
use clap::Subcommand;
use portal_core::{FileStorage, PortalConfig, token, validate_email, validate_password};
use portal_http::{ApiClient, ClientError, Profile, RegisterRequest};
use portal_session::{Identity, SessionError, SessionManager, SessionStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Subcommand)]
pub enum Commands {
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and log in
    Register {
        #[arg(long)]
        email: String,

        #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,

        /// Display name
        #[arg(long)]
        name: String,

        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        date_of_birth: Option<String>,
    },

    /// Log in with a Google ID token
    GoogleLogin {
        #[arg(long, env = "PORTAL_GOOGLE_ID_TOKEN", hide_env_values = true)]
        id_token: String,
    },

    /// Revoke the session and forget it locally
    Logout,

    /// Show the current user as reported by the API
    Whoami,

    /// Print a valid access token, refreshing it if needed
    Token,

    /// Refresh the access token now
    Refresh,

    /// Show the stored session without contacting the API
    Status,
}

/// Everything a command needs
pub struct Runtime {
    pub config: PortalConfig,
    pub state_file: PathBuf,
}

impl Runtime {
    fn manager(&self) -> Result<SessionManager> {
        let mut builder = ApiClient::builder()
            .base_url(&self.config.api.base_url)
            .timeout(self.config.api.timeout());
        if let Some(agent) = &self.config.api.user_agent {
            builder = builder.user_agent(agent);
        }
        let client = builder.build().context("Failed to create API client")?;

        let store = SessionStore::new(Arc::new(FileStorage::new(&self.state_file)));
        Ok(SessionManager::new(
            store,
            Arc::new(client),
            &self.config.session,
        ))
    }
}

impl Commands {
    pub async fn execute(self, runtime: &Runtime) -> Result<()> {
        // Input checks happen before any network traffic
        self.validate()?;

        let manager = runtime.manager()?;
        match self {
            Self::Login { email, password } => {
                let identity = manager.login(&email, &password).await?;
                print_identity("Logged in", &identity);
            }
            Self::Register {
                email,
                password,
                name,
                date_of_birth,
            } => {
                let request = RegisterRequest {
                    email,
                    password,
                    name,
                    date_of_birth,
                };
                let identity = manager.register(&request).await?;
                print_identity("Registered", &identity);
            }
            Self::GoogleLogin { id_token } => {
                let identity = manager.google_login(&id_token).await?;
                print_identity("Logged in", &identity);
            }
            Self::Logout => {
                manager.logout().await;
                println!("Logged out");
            }
            Self::Whoami => {
                let identity = manager.fetch_current_user().await?;
                println!("{}", serde_json::to_string_pretty(&identity.user)?);
            }
            Self::Token => {
                let token = manager
                    .ensure_valid_token()
                    .await
                    .ok_or_else(|| anyhow!("Not logged in"))?;
                println!("{token}");
            }
            Self::Refresh => {
                if manager.refresh_token().is_none() {
                    bail!("Not logged in");
                }
                if !manager.refresh_access_token().await {
                    bail!("Session expired, please log in again");
                }
                info!("Access token refreshed");
                println!("Session refreshed");
            }
            Self::Status => print_status(&manager, runtime),
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::Login { email, .. } => validate_email(email).into_result().map_err(|e| anyhow!(e)),
            Self::Register {
                email, password, ..
            } => {
                validate_email(email).into_result().map_err(|e| anyhow!(e))?;
                validate_password(password)
                    .into_result()
                    .map_err(|e| anyhow!(e))
            }
            Self::GoogleLogin { id_token } if id_token.trim().is_empty() => {
                bail!("Google ID token is required")
            }
            _ => Ok(()),
        }
    }
}

fn print_identity(action: &str, identity: &Identity) {
    let user = &identity.user;
    println!("{action} as {} ({})", user.email, user.role);
    if !identity.permissions.is_empty() {
        println!("Permissions: {}", identity.permissions.join(", "));
    }
}

fn print_status(manager: &SessionManager, runtime: &Runtime) {
    for line in status_lines(manager, runtime) {
        println!("{line}");
    }
}

fn status_lines(manager: &SessionManager, runtime: &Runtime) -> Vec<String> {
    let mut lines = vec![format!("State file: {}", runtime.state_file.display())];

    let access_token = manager.access_token();
    lines.push(match access_token.as_deref() {
        None => "Access token: none".to_string(),
        Some(t) if token::is_expired(Some(t)) => "Access token: expired".to_string(),
        Some(t) => match token::expires_at(t) {
            Some(at) => format!("Access token: valid until {}", at.to_rfc3339()),
            None => "Access token: valid".to_string(),
        },
    });

    if let Some(subject) = access_token
        .as_deref()
        .and_then(token::decode_claims)
        .and_then(|claims| claims.subject().map(str::to_string))
    {
        lines.push(format!("Subject: {subject}"));
    }

    let has_refresh = manager.refresh_token().is_some();
    lines.push(format!(
        "Refresh token: {}",
        if has_refresh { "stored" } else { "none" }
    ));

    lines.push(match manager.user() {
        Some(Profile { email, role, .. }) => format!("User: {email} ({role})"),
        None => "User: none".to_string(),
    });
    lines
}

/// Extra guidance for failures where the API could not be reached
pub fn failure_hint(err: &anyhow::Error, base_url: &str) -> Option<String> {
    let client_error = match err.downcast_ref::<SessionError>() {
        Some(SessionError::Api(e)) => e,
        _ => err.downcast_ref::<ClientError>()?,
    };
    client_error
        .is_transport()
        .then(|| format!("Could not reach the API at {base_url}; check api.base_url or PORTAL_API__BASE_URL"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login(email: &str) -> Commands {
        Commands::Login {
            email: email.to_string(),
            password: "whatever".to_string(),
        }
    }

    fn register(password: &str) -> Commands {
        Commands::Register {
            email: "ada@example.com".to_string(),
            password: password.to_string(),
            name: "Ada".to_string(),
            date_of_birth: None,
        }
    }

    #[test]
    fn test_login_checks_email_only() {
        assert!(login("ada@example.com").validate().is_ok());
        let err = login("not-an-email").validate().unwrap_err();
        assert_eq!(err.to_string(), "Please enter a valid email address");
    }

    #[test]
    fn test_register_checks_password_policy() {
        assert!(register("Valid1Pass!").validate().is_ok());
        let err = register("short1!").validate().unwrap_err();
        assert!(err.to_string().contains("at least 8 characters"));
    }

    #[test]
    fn test_empty_google_token_rejected() {
        let command = Commands::GoogleLogin {
            id_token: "  ".to_string(),
        };
        assert!(command.validate().is_err());
        assert!(Commands::Status.validate().is_ok());
    }

    #[test]
    fn test_transport_failures_get_a_hint() {
        let unreachable = anyhow::Error::from(SessionError::Api(ClientError::Connection {
            url: "http://localhost:8000/auth/login".to_string(),
            message: "connection refused".to_string(),
        }));
        let hint = failure_hint(&unreachable, "http://localhost:8000").unwrap();
        assert!(hint.contains("http://localhost:8000"));

        let rejected = anyhow::Error::from(SessionError::Api(ClientError::AuthenticationFailed(
            "Invalid credentials".to_string(),
        )));
        assert_eq!(failure_hint(&rejected, "http://localhost:8000"), None);
        assert_eq!(failure_hint(&anyhow!("Not logged in"), "http://localhost:8000"), None);
    }

    #[test]
    fn test_status_reports_token_subject() {
        use portal_core::Storage;

        let dir = tempfile::tempdir().unwrap();
        let runtime = Runtime {
            config: PortalConfig::default(),
            state_file: dir.path().join("session.json"),
        };

        // {"sub":"42","exp":4102444800} expires in 2100
        let token = "eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiI0MiIsImV4cCI6NDEwMjQ0NDgwMH0.sig";
        FileStorage::new(&runtime.state_file)
            .set_item("portal.access_token", token)
            .unwrap();

        let lines = status_lines(&runtime.manager().unwrap(), &runtime);
        assert!(lines.iter().any(|l| l.starts_with("Access token: valid until 2100")));
        assert!(lines.contains(&"Subject: 42".to_string()));
        assert!(lines.contains(&"Refresh token: none".to_string()));
        assert!(lines.contains(&"User: none".to_string()));
    }

    #[tokio::test]
    async fn test_token_without_session_fails_offline() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Runtime {
            config: PortalConfig::default(),
            state_file: dir.path().join("session.json"),
        };

        let err = Commands::Token.execute(&runtime).await.unwrap_err();
        assert_eq!(err.to_string(), "Not logged in");
    }
}
