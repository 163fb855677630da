use thiserror::Error;

/// Errors surfaced by provisioning operations and the user repository.
#[derive(Error, Debug)]
pub enum AdminError {
    #[error("a user with email {0} already exists")]
    DuplicateEmail(String),

    #[error("no user found for {0}")]
    NotFound(String),

    #[error("password too short: need at least {min} characters, got {actual}")]
    PasswordTooShort { min: usize, actual: usize },

    #[error("the two passwords entered do not match")]
    PasswordMismatch,

    #[error("password length must be at least 1")]
    InvalidPasswordLength,

    #[error("invalid email: `{0}`")]
    InvalidEmail(String),

    #[error("cannot reach the database: {0}")]
    ConnectionFailure(#[source] sqlx::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("console I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl From<argon2::password_hash::Error> for AdminError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AdminError::Hash(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AdminError>;
