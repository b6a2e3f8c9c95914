mod password;
mod tokens;

pub use password::{compute_password_hash, validate_credentials, Credentials};
pub use tokens::{decode_access_token, issue_token_pair, Claims, TokenPair};

#[cfg(test)]
pub(crate) use tokens::tests::test_settings;
