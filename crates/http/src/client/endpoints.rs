//! Backend route paths

macro_rules! route {
    ($path:literal) => {
        concat!("/api", $path)
    };
}

/// Authentication routes
pub mod auth {
    pub const REGISTER: &str = route!("/auth/register");
    pub const LOGIN: &str = route!("/auth/login");
    pub const LOGOUT: &str = route!("/auth/logout");
    pub const REFRESH: &str = route!("/auth/refresh");
    pub const VERIFY_OTP: &str = route!("/auth/verify-otp");
    pub const RESEND_OTP: &str = route!("/auth/resend-otp");
    pub const CHECK_EXISTING: &str = route!("/auth/check-existing");
    pub const FORGOT_PASSWORD: &str = route!("/auth/forgot-password");
    pub const RESET_PASSWORD: &str = route!("/auth/reset-password");
    pub const VERIFY_EMAIL: &str = route!("/auth/verify-email");
    pub const RESEND_VERIFICATION: &str = route!("/auth/resend-verification");
    pub const CHANGE_PASSWORD: &str = route!("/auth/change-password");
    pub const CURRENT_USER: &str = route!("/auth/me");
}

/// User profile routes
pub mod users {
    pub const PROFILE: &str = route!("/users/profile");
    pub const PROFILE_COMPLETION: &str = route!("/users/profile-completion");
    pub const SMTP_CREDENTIALS: &str = route!("/users/smtp-credentials");
    pub const TEST_SMTP: &str = route!("/users/test-smtp");
    pub const STATS: &str = route!("/users/stats");
    pub const CHANGE_PASSWORD: &str = route!("/users/change-password");
    pub const ADD_COINS: &str = route!("/users/add-coins");
    pub const FILTER: &str = route!("/users/filter");
    pub const DELETE_ACCOUNT: &str = route!("/users/delete-account");
}

/// Outbound email routes
pub mod emails {
    pub const TEST_SMTP: &str = route!("/emails/test-smtp");
    pub const SEND_TEST: &str = route!("/emails/send-test");
    pub const LOGS: &str = route!("/emails/logs");
    pub const STATS: &str = route!("/emails/stats");
}

/// Routes whose 401 means "bad credentials" rather than "session expired"
#[derive(Debug, Clone)]
pub struct PublicEndpoints {
    paths: Vec<String>,
}

impl PublicEndpoints {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether a request path targets one of the public routes
    ///
    /// Matches by suffix so a base URL mounted under a path prefix still
    /// matches.
    pub fn matches(&self, path: &str) -> bool {
        let path = path.trim_end_matches('/');
        self.paths.iter().any(|endpoint| path.ends_with(endpoint.as_str()))
    }
}

impl Default for PublicEndpoints {
    fn default() -> Self {
        Self::new([
            auth::LOGIN,
            auth::REGISTER,
            auth::CHECK_EXISTING,
            auth::FORGOT_PASSWORD,
            auth::RESET_PASSWORD,
            auth::VERIFY_EMAIL,
            auth::REFRESH,
        ])
    }
}
