use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::{rngs::OsRng, RngCore};
use tracing::error;

use crate::config::HashConfig;
use crate::error::{AdminError, Result};

pub const DEFAULT_PASSWORD_LENGTH: usize = 16;
pub const MIN_PASSWORD_LENGTH: usize = 8;

const CHARSET: &[u8; 70] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*";

/// Random password drawn from the OS CSPRNG, one byte per character.
///
/// Characters are picked with `byte % 70`. Since 256 is not a multiple of 70
/// the first 46 characters of the charset come up with probability 4/256 and
/// the last 24 with 3/256, so the output is not uniform over the charset.
pub fn generate_password(length: usize) -> Result<String> {
    if length == 0 {
        return Err(AdminError::InvalidPasswordLength);
    }
    let mut bytes = vec![0u8; length];
    OsRng.fill_bytes(&mut bytes);
    Ok(bytes
        .iter()
        .map(|b| CHARSET[usize::from(*b) % CHARSET.len()] as char)
        .collect())
}

/// Salted Argon2id hashing with a configurable work factor.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl CredentialHasher {
    pub fn new(config: &HashConfig) -> Result<Self> {
        let params = Params::new(
            config.memory_kib.unwrap_or(Params::DEFAULT_M_COST),
            config.iterations.unwrap_or(Params::DEFAULT_T_COST),
            config.parallelism.unwrap_or(Params::DEFAULT_P_COST),
            None,
        )
        .map_err(|e| AdminError::Config(format!("argon2 parameters: {e}")))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn hash(&self, plain: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                AdminError::from(e)
            })?
            .to_string();
        Ok(hash)
    }

    /// Parameters come from the stored hash, not from this hasher's configuration.
    pub fn verify(&self, plain: &str, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            AdminError::from(e)
        })?;
        Ok(self
            .argon2
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    }
}

#[cfg(test)]
pub(crate) fn cheap_hasher() -> CredentialHasher {
    CredentialHasher::new(&HashConfig {
        memory_kib: Some(256),
        iterations: Some(1),
        parallelism: Some(1),
    })
    .expect("valid test params")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_password_has_requested_length_and_charset() {
        for len in [1, 7, 8, 16, 64, 300] {
            let pw = generate_password(len).expect("generate");
            assert_eq!(pw.chars().count(), len);
            assert!(pw.bytes().all(|b| CHARSET.contains(&b)), "unexpected char in {pw}");
        }
    }

    #[test]
    fn zero_length_is_rejected() {
        assert!(matches!(
            generate_password(0),
            Err(AdminError::InvalidPasswordLength)
        ));
    }

    #[test]
    fn generated_passwords_differ() {
        let a = generate_password(DEFAULT_PASSWORD_LENGTH).unwrap();
        let b = generate_password(DEFAULT_PASSWORD_LENGTH).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn hash_and_verify_roundtrip() {
        let hasher = cheap_hasher();
        let password = "Secur3P@ssw0rd!";
        let hash = hasher.hash(password).expect("hashing should succeed");
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hasher = cheap_hasher();
        let hash = hasher.hash("correct-horse-battery-staple").unwrap();
        assert!(!hasher.verify("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_accepts_hash_made_with_other_work_factor() {
        let strong = CredentialHasher::new(&HashConfig {
            memory_kib: Some(512),
            iterations: Some(2),
            parallelism: Some(1),
        })
        .unwrap();
        let hash = strong.hash("rotate-me-please").unwrap();
        assert!(cheap_hasher().verify("rotate-me-please", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let hasher = cheap_hasher();
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = cheap_hasher().verify("anything", "not-a-valid-hash").unwrap_err();
        assert!(matches!(err, AdminError::Hash(_)));
    }

    #[test]
    fn invalid_params_are_a_config_error() {
        let err = CredentialHasher::new(&HashConfig {
            memory_kib: Some(1),
            iterations: Some(1),
            parallelism: Some(1),
        })
        .err()
        .expect("too little memory");
        assert!(matches!(err, AdminError::Config(_)));
    }
}
