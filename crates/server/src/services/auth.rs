//! Registration and credential verification.

use thiserror::Error;

use freshline_core::{Email, EmailError};

use crate::models::{NewUser, RegisterUser, User};
use crate::storage::{Storage, StorageError};

/// Minimum accepted password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Errors produced by registration and login.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    InvalidEmail(#[from] EmailError),

    #[error("password must be at least {MIN_PASSWORD_LENGTH} characters")]
    WeakPassword,

    #[error("an account with this email already exists")]
    UserAlreadyExists,

    /// One message for both unknown email and wrong password, so login
    /// failures don't reveal which accounts exist.
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Authentication flows over a borrowed storage handle.
pub struct AuthService<'a> {
    storage: &'a dyn Storage,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub fn new(storage: &'a dyn Storage) -> Self {
        Self { storage }
    }

    /// Validate a registration payload and create the account.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEmail` or `WeakPassword` on bad input, and
    /// `UserAlreadyExists` if the email is taken.
    pub async fn register(&self, payload: RegisterUser) -> Result<User, AuthError> {
        let email = Email::parse(&payload.email)?;
        if payload.password.len() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword);
        }

        let new = NewUser {
            email,
            password: payload.password,
            first_name: payload.first_name,
            last_name: payload.last_name,
            business_name: payload.business_name,
            phone: payload.phone,
            address: payload.address,
            city: payload.city,
            state: payload.state,
            pincode: payload.pincode,
        };

        match self.storage.create_user(new).await {
            Ok(user) => Ok(user),
            Err(StorageError::Conflict(_)) => Err(AuthError::UserAlreadyExists),
            Err(other) => Err(other.into()),
        }
    }

    /// Verify credentials and return the account.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` for an unknown email, a wrong password,
    /// or a deactivated account; callers cannot tell the cases apart.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let Ok(email) = Email::parse(email) else {
            return Err(AuthError::InvalidCredentials);
        };

        let Some(user) = self.storage.user_by_email(&email).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        if !user.is_active || !self.storage.verify_password(password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }
}
