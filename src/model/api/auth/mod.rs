mod rights;
mod token;

pub use rights::Rights;
pub use token::{AuthToken, AUTH_TOKEN_COOKIE};
