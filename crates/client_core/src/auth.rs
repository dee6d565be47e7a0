use std::sync::Arc;

use shared::protocol::{
    EnableTwoFactorRequest, LoginRequest, LoginResponse, RegisterRequest, TokenResponse,
    TwoFactorLoginRequest, TwoFactorSetupResponse,
};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use crate::{error::ApiClientError, session::SessionStore, transport::ApiTransport};

/// Where the login flow currently stands. The pending challenge token is
/// deliberately not part of this public state; it stays inside the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    Anonymous,
    AwaitingCredentials,
    AwaitingSecondFactor,
    Authenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialsOutcome {
    Authenticated,
    SecondFactorRequired,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("login flow is not awaiting credentials")]
    NotAwaitingCredentials,
    #[error("no second-factor challenge is pending")]
    NoPendingChallenge,
    #[error("login response carried neither a token nor a second-factor challenge")]
    UnexpectedLoginResponse,
    #[error(transparent)]
    Api(#[from] ApiClientError),
}

impl AuthError {
    /// The backend's message verbatim where one exists, for UI surfaces
    /// that must not reset already-entered form fields.
    pub fn message(&self) -> String {
        match self {
            AuthError::Api(err) => err.message(),
            other => other.to_string(),
        }
    }
}

/// Short-lived challenge state between the password step and the
/// one-time-code step. Never persisted; destroyed on success or reset.
/// Failed verifications leave it untouched so the user can retry with the
/// same challenge until the server expires it.
#[derive(Debug, Clone)]
struct PendingTwoFactorChallenge {
    temp_token: String,
}

struct AuthFlowState {
    stage: AuthStage,
    pending: Option<PendingTwoFactorChallenge>,
}

/// Orchestrates the two-step login: credentials first, then an optional
/// one-time code gated by a temporary token. A permanent session token is
/// only handed to the [`SessionStore`] once the full challenge succeeds.
pub struct AuthFlow {
    transport: Arc<ApiTransport>,
    session: Arc<SessionStore>,
    state: Mutex<AuthFlowState>,
    stage: watch::Sender<AuthStage>,
}

impl AuthFlow {
    pub fn new(transport: Arc<ApiTransport>, session: Arc<SessionStore>) -> Arc<Self> {
        let initial = if session.is_authenticated() {
            AuthStage::Authenticated
        } else {
            AuthStage::Anonymous
        };
        let (stage, _) = watch::channel(initial);
        Arc::new(Self {
            transport,
            session,
            state: Mutex::new(AuthFlowState {
                stage: initial,
                pending: None,
            }),
            stage,
        })
    }

    pub fn stage(&self) -> AuthStage {
        *self.stage.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthStage> {
        self.stage.subscribe()
    }

    fn transition(&self, state: &mut AuthFlowState, stage: AuthStage) {
        state.stage = stage;
        self.stage.send_replace(stage);
    }

    /// Enters the credentials step. Restarting from a pending second-factor
    /// challenge discards that challenge.
    pub async fn begin_login(&self) {
        let mut state = self.state.lock().await;
        if state.pending.take().is_some() {
            info!("auth: discarding pending second-factor challenge on login restart");
        }
        self.transition(&mut state, AuthStage::AwaitingCredentials);
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<(), AuthError> {
        self.transport
            .post_json_unit(
                "/api/register",
                &RegisterRequest {
                    email: email.to_string(),
                    password: password.to_string(),
                },
            )
            .await?;
        Ok(())
    }

    /// Sends the password step. Either authenticates directly or parks the
    /// flow behind the second factor. On failure the flow stays in
    /// `AwaitingCredentials` and the backend's message is surfaced verbatim.
    pub async fn submit_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<CredentialsOutcome, AuthError> {
        {
            let state = self.state.lock().await;
            if !matches!(
                state.stage,
                AuthStage::Anonymous | AuthStage::AwaitingCredentials
            ) {
                return Err(AuthError::NotAwaitingCredentials);
            }
        }

        let response: LoginResponse = self
            .transport
            .post_json(
                "/api/login",
                &LoginRequest {
                    email: email.to_string(),
                    password: password.to_string(),
                },
            )
            .await
            .map_err(|err| {
                warn!("auth: login failed: {err}");
                err
            })?;

        let mut state = self.state.lock().await;
        match response {
            LoginResponse::Token { token } => {
                state.pending = None;
                self.session.set_session(token).await;
                self.transition(&mut state, AuthStage::Authenticated);
                info!("auth: authenticated without second factor");
                Ok(CredentialsOutcome::Authenticated)
            }
            LoginResponse::TwoFactorChallenge {
                two_factor_required: true,
                temp_token,
            } => {
                state.pending = Some(PendingTwoFactorChallenge { temp_token });
                self.transition(&mut state, AuthStage::AwaitingSecondFactor);
                info!("auth: second factor required");
                Ok(CredentialsOutcome::SecondFactorRequired)
            }
            LoginResponse::TwoFactorChallenge {
                two_factor_required: false,
                ..
            } => {
                self.transition(&mut state, AuthStage::AwaitingCredentials);
                Err(AuthError::UnexpectedLoginResponse)
            }
        }
    }

    /// Sends the one-time code for the pending challenge. Only the
    /// permanent token from a successful verification reaches the session
    /// store; a failed attempt keeps the same challenge token in place.
    pub async fn verify_second_factor(&self, code: &str) -> Result<(), AuthError> {
        let temp_token = {
            let state = self.state.lock().await;
            if state.stage != AuthStage::AwaitingSecondFactor {
                return Err(AuthError::NoPendingChallenge);
            }
            state
                .pending
                .as_ref()
                .map(|pending| pending.temp_token.clone())
                .ok_or(AuthError::NoPendingChallenge)?
        };

        let response: TokenResponse = self
            .transport
            .post_json(
                "/api/2fa/login",
                &TwoFactorLoginRequest {
                    temp_token,
                    code: code.to_string(),
                },
            )
            .await
            .map_err(|err| {
                warn!("auth: second-factor verification failed: {err}");
                err
            })?;

        let mut state = self.state.lock().await;
        state.pending = None;
        self.session.set_session(response.token).await;
        self.transition(&mut state, AuthStage::Authenticated);
        info!("auth: authenticated via second factor");
        Ok(())
    }

    /// Valid from any state. Clears the session (notifying its
    /// subscribers) and destroys any pending challenge.
    pub async fn logout(&self) {
        let mut state = self.state.lock().await;
        state.pending = None;
        self.session.clear().await;
        self.transition(&mut state, AuthStage::Anonymous);
        info!("auth: logged out");
    }

    // Second-factor management for an already authenticated session. The
    // transport attaches the bearer token; an expired session surfaces as
    // the server's 401.

    pub async fn setup_two_factor(&self) -> Result<TwoFactorSetupResponse, AuthError> {
        let response = self
            .transport
            .post_json("/api/2fa/setup", &serde_json::json!({}))
            .await?;
        Ok(response)
    }

    pub async fn enable_two_factor(&self, secret: &str, code: &str) -> Result<(), AuthError> {
        self.transport
            .post_json_unit(
                "/api/2fa/enable",
                &EnableTwoFactorRequest {
                    secret: secret.to_string(),
                    code: code.to_string(),
                },
            )
            .await?;
        Ok(())
    }

    pub async fn disable_two_factor(&self) -> Result<(), AuthError> {
        self.transport
            .post_json_unit("/api/2fa/disable", &serde_json::json!({}))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/auth_tests.rs"]
mod tests;
