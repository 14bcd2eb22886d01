//! Authentication: password hashing, access tokens and the bearer middleware.

pub mod middleware;
pub mod password;
pub mod token;

pub use middleware::{CurrentUser, require_auth};
pub use password::PasswordHasher;
pub use token::TokenService;
