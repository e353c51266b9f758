//! User profile client methods

use super::{ClientError, JobdmClient, endpoints};
use crate::types::{ProfileCompletionResponse, UpdateProfileRequest, User, UserEnvelope};
use reqwest::Method;

impl JobdmClient {
    /// Get the current user's profile
    pub async fn profile(&self) -> Result<User, ClientError> {
        let request = self.request(Method::GET, endpoints::users::PROFILE);
        let envelope: UserEnvelope = self.execute(request).await?;
        Ok(envelope.user)
    }

    /// Update the current user's profile
    pub async fn update_profile(&self, update: &UpdateProfileRequest) -> Result<User, ClientError> {
        let request = self
            .request(Method::PUT, endpoints::users::PROFILE)
            .json(update);
        let envelope: UserEnvelope = self.execute(request).await?;
        Ok(envelope.user)
    }

    /// Get the profile completion percentage and breakdown
    pub async fn profile_completion(&self) -> Result<ProfileCompletionResponse, ClientError> {
        let request = self.request(Method::GET, endpoints::users::PROFILE_COMPLETION);
        self.execute(request).await
    }
}
