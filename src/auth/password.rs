use bcrypt::{hash, verify};

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(bcrypt::BcryptError),
    #[error("Password verification failed: {0}")]
    VerificationFailed(bcrypt::BcryptError),
}

#[derive(Debug, Clone, Copy)]
pub struct PasswordManager {
    cost: u32,
}

impl Default for PasswordManager {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordManager {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        hash(password, self.cost).map_err(PasswordError::HashingFailed)
    }

    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        verify(password, hash).map_err(PasswordError::VerificationFailed)
    }
}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// At least 8 characters, with upper case, lower case and a digit.
pub fn is_strong_password(password: &str) -> bool {
    if password.chars().count() < 8 {
        return false;
    }
    let (mut upper, mut lower, mut digit) = (false, false, false);
    for c in password.chars() {
        upper |= c.is_uppercase();
        lower |= c.is_lowercase();
        digit |= c.is_ascii_digit();
        if upper && lower && digit {
            return true;
        }
    }
    upper && lower && digit
}
