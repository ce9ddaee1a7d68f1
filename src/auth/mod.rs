/// Authentication module
///
/// Handles JWT token issuance/validation, password hashing,
/// and refresh token rotation.

mod claims;
mod jwt;
mod password;
mod refresh_token;

pub use claims::Claims;
pub use jwt::issue_access_token;
pub use jwt::validate_access_token;
pub use password::hash_password;
pub use password::verify_password;
pub use refresh_token::consume_refresh_token;
pub use refresh_token::delete_expired_tokens;
pub use refresh_token::generate_refresh_token;
pub use refresh_token::save_refresh_token;
