//! Sign-in and sign-up: local validation and user-facing failure messages.

use crate::api::ApiClient;
use crate::core::User;
use crate::{tdlog, tdlog_warn, Error, Result};

/// Longest password the service can hash.
pub const MAX_PASSWORD_LENGTH: usize = 72;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    Login,
    Signup,
}

/// Reject passwords the service would silently truncate, and mismatched
/// sign-up confirmations, before any request is made.
pub fn validate_password(action: AuthAction, password: &str, confirm: Option<&str>) -> Result<()> {
    if password.chars().count() > MAX_PASSWORD_LENGTH {
        let message = match action {
            AuthAction::Signup => format!(
                "Password must be {} characters or less.",
                MAX_PASSWORD_LENGTH
            ),
            AuthAction::Login => format!(
                "Password is too long. Please use {} characters or less.",
                MAX_PASSWORD_LENGTH
            ),
        };
        return Err(Error::Validation(message));
    }
    if action == AuthAction::Signup {
        if let Some(confirm) = confirm {
            if confirm != password {
                return Err(Error::Validation("Passwords do not match.".to_string()));
            }
        }
    }
    Ok(())
}

/// Map an auth failure to the fixed message shown to the user.
pub fn describe_failure(err: &Error) -> String {
    match err {
        Error::Validation(message) => message.clone(),
        Error::Api { status, .. } => status_message(*status),
        Error::Http(e) => match e.status() {
            Some(status) => status_message(status.as_u16()),
            None if e.is_connect() || e.is_timeout() || e.is_request() => {
                "Network error. Please check your connection and ensure the backend server is running."
                    .to_string()
            }
            None => "An unexpected error occurred.".to_string(),
        },
        _ => "An unexpected error occurred.".to_string(),
    }
}

fn status_message(status: u16) -> String {
    match status {
        409 => "Failed to create account. Email may already be in use.".to_string(),
        401 => "Failed to sign in. Please check your credentials.".to_string(),
        422 => "Invalid input. Please check your details.".to_string(),
        other => format!("Server error ({}). Please try again later.", other),
    }
}

/// Validate and sign in, returning the access token.
pub async fn login(client: &ApiClient, email: &str, password: &str) -> Result<String> {
    validate_password(AuthAction::Login, password, None)?;
    tdlog!("Signing in as {}", email);
    client.login(email, password).await.inspect_err(|e| {
        tdlog_warn!("Login failed for {}: {}", email, e);
    })
}

/// Validate, create the account, then sign in as it.
pub async fn signup(
    client: &ApiClient,
    email: &str,
    password: &str,
    confirm: &str,
) -> Result<(User, String)> {
    validate_password(AuthAction::Signup, password, Some(confirm))?;
    tdlog!("Creating account {}", email);
    let user = client.signup(email, password).await.inspect_err(|e| {
        tdlog_warn!("Signup failed for {}: {}", email, e);
    })?;
    let token = login(client, email, password).await?;
    Ok((user, token))
}
