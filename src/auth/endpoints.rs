//! Identity provider endpoints and the compiled-in app registration

/// B2C user flow / custom policy driving the login pages
pub const POLICY: &str = "B2C_1A_RPSignUpSignInNewRoomV3.1";
/// Public client id of the vendor's mobile app
pub const CLIENT_ID: &str = "6ce007c6-0628-419e-88f4-bee2e6418eec";
/// Custom-scheme redirect the mobile app registers
pub const REDIRECT_URI: &str = "com.b2c.remehaapp://login-callback";
pub const SCOPE: &str =
    "openid https://bdrb2cprod.onmicrosoft.com/iotdevice/user_impersonation offline_access";
/// Cookie carrying the CSRF token on the identity domain
pub const CSRF_COOKIE: &str = "x-ms-cpim-csrf";
pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const CSRF_HEADER: &str = "x-csrf-token";

/// URLs of the four identity endpoints under one tenant base
#[derive(Debug, Clone)]
pub struct IdentityEndpoints {
    base: String,
}

impl IdentityEndpoints {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn authorize_url(&self) -> String {
        format!("{}/oauth2/v2.0/authorize", self.base)
    }

    pub fn self_asserted_url(&self) -> String {
        format!("{}/{}/SelfAsserted", self.base, POLICY)
    }

    pub fn confirmed_url(&self) -> String {
        format!(
            "{}/{}/api/CombinedSigninAndSignup/confirmed",
            self.base, POLICY
        )
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.base)
    }
}
