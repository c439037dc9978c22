use thiserror::Error;
use vigil_core::RemoteError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("session token expired; sign in again with `vigil sign-in --token <JWT>`")]
    TokenExpired,

    #[error("malformed session token: {0}")]
    MalformedToken(String),

    #[error("token store error: {0}")]
    TokenStore(String),
}

impl From<AuthError> for RemoteError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::MalformedToken(reason) => Self::Malformed(reason),
            AuthError::TokenExpired | AuthError::TokenStore(_) => {
                Self::Unavailable(error.to_string())
            }
        }
    }
}
