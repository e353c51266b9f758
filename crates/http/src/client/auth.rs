//! Authentication API client methods

use super::session::SessionEvent;
use super::{ClientError, JobdmClient, endpoints};
use crate::types::{
    ApiResponse, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, ResendOtpRequest,
    TokenPair, User, UserEnvelope, VerifyOtpRequest, VerifyOtpResponse,
};
use reqwest::Method;

impl JobdmClient {
    /// Log in with email and password and store the issued tokens
    pub async fn login(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<LoginResponse, ClientError> {
        let req = self
            .request(Method::POST, endpoints::auth::LOGIN)
            .json(&LoginRequest {
                email: email.into(),
                password: password.into(),
            });
        let response: LoginResponse = self.execute(req).await?;

        self.start_session(&response.tokens);
        info!(user_id = %response.user.id, "Logged in");
        Ok(response)
    }

    /// Register a new account; tokens are issued after OTP verification
    pub async fn register(&self, request: RegisterRequest) -> Result<User, ClientError> {
        let req = self
            .request(Method::POST, endpoints::auth::REGISTER)
            .json(&request);
        let response: RegisterResponse = self.execute(req).await?;
        Ok(response.user)
    }

    /// Verify the emailed one-time code and store the issued tokens
    pub async fn verify_otp(
        &self,
        email: impl Into<String>,
        otp: impl Into<String>,
    ) -> Result<VerifyOtpResponse, ClientError> {
        let req = self
            .request(Method::POST, endpoints::auth::VERIFY_OTP)
            .json(&VerifyOtpRequest {
                email: email.into(),
                otp: otp.into(),
            });
        let response: VerifyOtpResponse = self.execute(req).await?;

        self.start_session(&response.tokens);
        info!(user_id = %response.user.id, "Email verified, logged in");
        Ok(response)
    }

    /// Ask the backend to send a new one-time code
    pub async fn resend_otp(&self, email: impl Into<String>) -> Result<(), ClientError> {
        let req = self
            .request(Method::POST, endpoints::auth::RESEND_OTP)
            .json(&ResendOtpRequest {
                email: email.into(),
            });
        let response = self.send(req).await?;
        let envelope: ApiResponse<serde_json::Value> = response.json().await?;

        if envelope.success {
            Ok(())
        } else {
            Err(ClientError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| "Failed to resend code".to_string()),
            ))
        }
    }

    /// End the session
    ///
    /// The backend call is best-effort: its failure is logged and ignored,
    /// and local tokens are removed regardless.
    pub async fn logout(&self) {
        if self.tokens().has_access_token() {
            let req = self.request(Method::POST, endpoints::auth::LOGOUT);
            if let Err(err) = self.send_without_refresh(req).await {
                warn!(error = %err, "Logout request failed, clearing local session anyway");
            }
        }

        self.tokens().remove_tokens();
        self.auth_check().invalidate().await;
        self.emit(SessionEvent::LoggedOut);
        info!("Logged out");
    }

    /// Fetch the user the current access token belongs to
    pub async fn current_user(&self) -> Result<User, ClientError> {
        let req = self.request(Method::GET, endpoints::auth::CURRENT_USER);
        let envelope: UserEnvelope = self.execute(req).await?;
        Ok(envelope.user)
    }

    fn start_session(&self, tokens: &TokenPair) {
        self.tokens()
            .set_tokens(&tokens.access_token, &tokens.refresh_token);
        self.emit(SessionEvent::LoggedIn);
    }
}
