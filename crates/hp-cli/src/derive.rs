//! Reference Hashpass derivation
//!
//! `SHA-256("{domain}/{universal_password}")`, re-hashed over its own
//! digest [`ROUNDS`] more times, base64 encoded (standard alphabet) and
//! cut to [`PASSWORD_LENGTH`] characters.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};

use hp_core::error::CollaboratorError;
use hp_core::traits::Deriver;

/// Extra hashing rounds after the first
pub const ROUNDS: u32 = 1 << 16;

/// Length of a derived password
pub const PASSWORD_LENGTH: usize = 16;

/// Compute a Hashpass password synchronously
pub fn hashpass(domain: &str, universal_password: &str) -> String {
    let mut digest = Sha256::digest(format!("{}/{}", domain, universal_password).as_bytes());
    for _ in 0..ROUNDS {
        digest = Sha256::digest(digest);
    }

    let mut encoded = general_purpose::STANDARD.encode(digest);
    encoded.truncate(PASSWORD_LENGTH);
    encoded
}

/// [`Deriver`] running [`hashpass`] on the blocking pool
#[derive(Debug, Clone, Copy, Default)]
pub struct HashpassDeriver;

#[async_trait]
impl Deriver for HashpassDeriver {
    async fn derive(
        &self,
        domain: &str,
        universal_password: &str,
    ) -> Result<String, CollaboratorError> {
        let domain = domain.to_owned();
        let universal_password = universal_password.to_owned();

        tokio::task::spawn_blocking(move || hashpass(&domain, &universal_password))
            .await
            .map_err(|e| CollaboratorError::new(format!("derivation worker failed: {}", e)))
    }
}
