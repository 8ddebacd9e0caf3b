//! Credential hashing and session tokens

mod jwt;
mod password;

pub use jwt::{Claims, JwtService};
pub use password::{hash_password, verify_password, PasswordService};
