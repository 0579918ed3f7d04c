use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Credentials shared by every device session of one run
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub enable_secret: String,
}

impl Credentials {
    pub fn new(username: String, password: String, enable_secret: String) -> anyhow::Result<Self> {
        if username.is_empty() {
            anyhow::bail!("A username is required");
        }
        if password.is_empty() {
            anyhow::bail!("A password is required");
        }
        Ok(Self {
            username,
            password,
            enable_secret,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("enable_secret", &"<redacted>")
            .finish()
    }
}
