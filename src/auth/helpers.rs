use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// An `email:token` pair taken from a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub token: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CredentialsError {
    InvalidScheme,
    Malformed,
}

/// Extracts credentials from a Basic auth header.
/// Expects format: Basic base64(email:token)
fn extract_basic_credentials(header: &str) -> Option<Credentials> {
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    let (email, token) = credentials.split_once(':')?;
    if email.is_empty() || token.is_empty() {
        return None;
    }

    Some(Credentials {
        email: email.to_string(),
        token: token.to_string(),
    })
}

/// Extracts credentials from an Authorization header.
/// Returns None if no auth header is present.
/// Returns Err if the scheme is not Basic or the credentials do not decode.
pub fn extract_credentials(
    auth_header: Option<&str>,
) -> Result<Option<Credentials>, CredentialsError> {
    match auth_header {
        Some(header) if header.starts_with("Basic ") => extract_basic_credentials(header)
            .ok_or(CredentialsError::Malformed)
            .map(Some),
        Some(_) => Err(CredentialsError::InvalidScheme),
        None => Ok(None),
    }
}
