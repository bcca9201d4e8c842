//! Authentication for the camlink HTTP API.
//!
//! Provides JWT token management, password hashing, and the request
//! extractor that resolves a bearer token to a user.

pub mod claims;
pub mod extract;
pub mod jwt;
pub mod password;

pub use claims::Claims;
pub use extract::AuthUser;
pub use jwt::JwtManager;
