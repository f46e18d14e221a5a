//! Identity endpoint client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{decode_response, ApiClient};
use crate::{
    config::Credentials,
    error::{ApiError, ApiResult},
    session::{Authenticator, IssuedToken},
};

#[derive(Serialize)]
struct AuthRequest<'a> {
    company: &'a str,
    login: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct AuthResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    require2fa: bool,
}

/// [`Authenticator`] backed by `POST /admin/auth`.
pub struct HttpAuthenticator {
    api: ApiClient,
}

impl HttpAuthenticator {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Authenticator for HttpAuthenticator {
    async fn authenticate(&self, credentials: &Credentials) -> ApiResult<IssuedToken> {
        let url = self.api.url(&["admin", "auth"])?;
        debug!(company = %credentials.company(), login = %credentials.login(), "Requesting token");

        let response = self
            .api
            .http()
            .post(url)
            .json(&AuthRequest {
                company: credentials.company(),
                login: credentials.login(),
                password: credentials.password(),
            })
            .send()
            .await?;

        let body = match decode_response(response).await {
            Ok(body) => body,
            Err(ApiError::Unauthorized(message)) | Err(ApiError::Status { message, .. }) => {
                return Err(ApiError::AuthRejected(message))
            }
            Err(e) => return Err(e),
        };

        let parsed: AuthResponse =
            serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        if parsed.require2fa {
            return Err(ApiError::AuthRejected(
                "two-factor authentication is required for this account".to_string(),
            ));
        }

        match parsed.token.filter(|t| !t.is_empty()) {
            Some(token) => Ok(IssuedToken {
                token,
                refresh_token: parsed.refresh_token,
            }),
            None => Err(ApiError::Decode("auth response carries no token".to_string())),
        }
    }
}
