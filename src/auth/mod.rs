mod helpers;
mod middleware;
mod token;

pub use helpers::{Credentials, CredentialsError, extract_credentials};
pub use middleware::{AuthError, RequireUser};
pub use token::TokenGenerator;
