// Token authentication against the backend's JWT endpoints.
//
// Login and register both return an access/refresh pair that is stored
// in the client's shared `Session`.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::session::TokenPair;
use crate::types::{AuthResponse, LoginRequest, RegisterRequest, UserProfile};

const LOGIN_PATH: &str = "auth/token/";
const REGISTER_PATH: &str = "auth/register/";
const ME_PATH: &str = "auth/me/";

impl ApiClient {
    /// Exchange email + password for a token pair and store it.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<AuthResponse, Error> {
        let body = LoginRequest {
            email: email.to_owned(),
            password: password.expose_secret().to_owned(),
        };

        let resp: AuthResponse = self
            .post(LOGIN_PATH, &body)
            .await
            .map_err(rejected_credentials)?;

        self.session()
            .set(TokenPair::new(resp.access.clone(), Some(resp.refresh.clone())));
        debug!(email, "login successful");
        Ok(resp)
    }

    /// Create an account; the backend logs the new user in directly.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, Error> {
        let resp: AuthResponse = self.post(REGISTER_PATH, request).await?;
        self.session()
            .set(TokenPair::new(resp.access.clone(), Some(resp.refresh.clone())));
        debug!(email = %request.email, "registration successful");
        Ok(resp)
    }

    /// Profile of the authenticated user.
    pub async fn current_user(&self) -> Result<UserProfile, Error> {
        if !self.session().is_authenticated() {
            return Err(Error::SessionExpired);
        }
        self.get(ME_PATH).await
    }

    /// Forget the tokens. The backend keeps no server-side session.
    pub fn logout(&self) {
        self.session().clear();
        debug!("session cleared");
    }
}

fn rejected_credentials(err: Error) -> Error {
    match err {
        Error::Api {
            status: 400 | 401,
            message,
            ..
        } => Error::Authentication {
            message: if message.is_empty() {
                "invalid email or password".into()
            } else {
                message
            },
        },
        other => other,
    }
}
