//! Password hashing, verification, and complexity rules
//!
//! Current records are Argon2id with an independently generated salt
//! persisted alongside the PHC hash string. Records written before salting
//! was introduced hold an unsalted SHA-256 hex digest and no salt; they are
//! verified through the legacy path and re-hashed on the next successful
//! login.

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use sha2::{Digest, Sha256};

use crate::config::PasswordConfig;
use crate::error::{AuthError, AuthResult};

/// A freshly produced hash and the salt that went into it
#[derive(Debug, Clone)]
pub struct HashedPassword {
    pub hash: String,
    pub salt: String,
}

/// Identity details a password must not contain
#[derive(Debug, Clone, Copy)]
pub struct ComplexityContext<'a> {
    pub email: &'a str,
    pub name: &'a str,
}

/// Outcome of a complexity check; never an error
#[derive(Debug, Clone)]
pub struct ComplexityReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Password service
#[derive(Clone)]
pub struct PasswordService {
    config: PasswordConfig,
}

impl PasswordService {
    pub fn new(config: PasswordConfig) -> Self {
        Self { config }
    }

    fn hasher(&self) -> AuthResult<Argon2<'static>> {
        let params = Params::new(
            self.config.memory_cost,
            self.config.time_cost,
            self.config.parallelism,
            None,
        )
        .map_err(|e| AuthError::Hash(e.to_string()))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash a password under the configured cost with a fresh random salt
    pub fn hash_with_salt(&self, password: &str) -> AuthResult<HashedPassword> {
        let salt = SaltString::generate(&mut rand::thread_rng());
        let hash = self
            .hasher()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Hash(e.to_string()))?
            .to_string();

        Ok(HashedPassword {
            hash,
            salt: salt.to_string(),
        })
    }

    /// Verify a password against a salted record. The salt column must agree
    /// with the salt embedded in the PHC string; a mismatch means the record
    /// is corrupt and verification fails closed.
    pub fn verify_with_salt(&self, password: &str, hash: &str, salt: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };

        match parsed.salt {
            Some(embedded) if embedded.as_str() == salt => {}
            _ => return false,
        }

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Verify a password against a pre-salting record: an unsalted SHA-256
    /// hex digest, compared in constant time
    pub fn verify_legacy(&self, password: &str, hash: &str) -> bool {
        let digest = hex::encode(Sha256::digest(password.as_bytes()));

        let a = digest.as_bytes();
        let b = hash.as_bytes();
        if a.len() != b.len() {
            return false;
        }
        a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }

    /// True when the stored hash should be re-produced under the current
    /// configuration: it is not Argon2id, or its cost parameters fall below
    /// the configured minimums
    pub fn needs_rehash(&self, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return true;
        };
        if parsed.algorithm != argon2::ARGON2ID_IDENT {
            return true;
        }
        let Ok(params) = Params::try_from(&parsed) else {
            return true;
        };

        params.m_cost() < self.config.memory_cost || params.t_cost() < self.config.time_cost
    }

    /// Check a proposed password against the complexity rules. Returns every
    /// violation as a human-readable message; never errors.
    pub fn validate_complexity(&self, password: &str, ctx: ComplexityContext) -> ComplexityReport {
        let mut errors = Vec::new();

        if password.len() < self.config.min_length {
            errors.push(format!(
                "Password must be at least {} characters long",
                self.config.min_length
            ));
        }

        let mut has_upper = false;
        let mut has_lower = false;
        let mut has_digit = false;
        let mut has_special = false;

        for c in password.chars() {
            if c.is_ascii_uppercase() {
                has_upper = true;
            } else if c.is_ascii_lowercase() {
                has_lower = true;
            } else if c.is_ascii_digit() {
                has_digit = true;
            } else if !c.is_alphanumeric() {
                has_special = true;
            }
        }

        if !has_upper {
            errors.push("Password must contain at least one uppercase letter".to_string());
        }
        if !has_lower {
            errors.push("Password must contain at least one lowercase letter".to_string());
        }
        if !has_digit {
            errors.push("Password must contain at least one digit".to_string());
        }
        if !has_special {
            errors.push("Password must contain at least one special character".to_string());
        }

        let lowered = password.to_lowercase();

        // Very short fragments ("a@…", "Jo") would reject almost everything.
        let local_part = ctx.email.split('@').next().unwrap_or("").to_lowercase();
        if local_part.len() >= 3 && lowered.contains(&local_part) {
            errors.push("Password must not contain your email address".to_string());
        }

        let name = ctx.name.trim().to_lowercase();
        if name.len() >= 3 && lowered.contains(&name) {
            errors.push("Password must not contain your name".to_string());
        }

        ComplexityReport {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Low costs keep the suite fast; verification reads params from the
    // hash itself so correctness is unaffected.
    fn test_config() -> PasswordConfig {
        PasswordConfig {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
            min_length: 8,
        }
    }

    fn service() -> PasswordService {
        PasswordService::new(test_config())
    }

    fn ctx<'a>() -> ComplexityContext<'a> {
        ComplexityContext {
            email: "casey@example.com",
            name: "Casey Brook",
        }
    }

    #[test]
    fn test_hash_and_verify_round_trip() {
        let svc = service();
        let hashed = svc.hash_with_salt("Correct horse 1!").unwrap();

        assert!(hashed.hash.starts_with("$argon2id$"));
        assert!(svc.verify_with_salt("Correct horse 1!", &hashed.hash, &hashed.salt));
        assert!(!svc.verify_with_salt("wrong password", &hashed.hash, &hashed.salt));
    }

    #[test]
    fn test_salt_column_mismatch_fails_closed() {
        let svc = service();
        let hashed = svc.hash_with_salt("Correct horse 1!").unwrap();
        let other = svc.hash_with_salt("Correct horse 1!").unwrap();

        assert!(!svc.verify_with_salt("Correct horse 1!", &hashed.hash, &other.salt));
    }

    #[test]
    fn test_legacy_digest_verification() {
        let svc = service();
        let legacy = hex::encode(Sha256::digest(b"OldSecret9?"));

        assert!(svc.verify_legacy("OldSecret9?", &legacy));
        assert!(!svc.verify_legacy("NotTheSame", &legacy));
        assert!(!svc.verify_legacy("OldSecret9?", "not-a-digest"));
    }

    #[test]
    fn test_needs_rehash() {
        let svc = service();
        let fresh = svc.hash_with_salt("Correct horse 1!").unwrap();
        assert!(!svc.needs_rehash(&fresh.hash));

        // A legacy digest is never good enough.
        let legacy = hex::encode(Sha256::digest(b"whatever"));
        assert!(svc.needs_rehash(&legacy));

        // A hash produced below a raised floor must be re-done.
        let stricter = PasswordService::new(PasswordConfig {
            memory_cost: 2048,
            ..test_config()
        });
        assert!(stricter.needs_rehash(&fresh.hash));
    }

    #[test]
    fn test_complexity_accepts_strong_password() {
        let report = service().validate_complexity("Str0ng&Sound", ctx());
        assert!(report.is_valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_complexity_collects_all_violations() {
        let report = service().validate_complexity("short", ctx());
        assert!(!report.is_valid);
        // length, uppercase, digit, special
        assert_eq!(report.errors.len(), 4);
    }

    #[test]
    fn test_complexity_rejects_identity_fragments() {
        let svc = service();

        let report = svc.validate_complexity("xxCASEY123!zz", ctx());
        assert!(
            report
                .errors
                .iter()
                .any(|e| e.contains("email address"))
        );

        let report = svc.validate_complexity("casey brook#1X", ctx());
        assert!(report.errors.iter().any(|e| e.contains("your name")));
    }
}
