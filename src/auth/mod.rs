pub mod password;
pub mod token;

pub use password::{hash_password_with_cost, verify_password};
pub use token::{AccessToken, TokenService};
