use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Referenced product id is absent from the catalogue.
    #[error("Product {product_id} not found")]
    ProductNotFound { product_id: i64 },

    /// Caller-visible input problem; no state was mutated.
    #[error("{message}")]
    Validation { message: String },

    /// Registration rejected because the username is already taken.
    #[error("Username '{username}' already exists")]
    UsernameTaken { username: String },

    /// Uniform login failure: the message never distinguishes an unknown
    /// username from a wrong password.
    #[error("Incorrect username or password")]
    AuthFailed,

    /// Checkout was attempted without an authenticated session.
    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),

    #[error("Password hashing error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
}

impl Error {
    /// Shorthand for an [`Error::Validation`] with an owned message.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
