//! Process-wide service context and host-bound credential sealing.
//!
//! [`ServiceContext`] is initialized once at startup with the loaded
//! configuration and a [`HostKey`] derived from the machine's hostname. It is
//! immutable afterwards and lives for the rest of the process.
//!
//! Sealed values are base64 of `nonce || AES-256-GCM ciphertext`; they only
//! open on the host that sealed them.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, OsRng, rand_core::RngCore},
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use sha2::{Digest, Sha256};
use std::sync::OnceLock;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::VaultConfig;
use crate::error::{VaultError, VaultResult};
use crate::password::DatabasePassword;

const KEY_SALT: &[u8] = b"dumpvault-host-key-v1";
const NONCE_LEN: usize = 12;

/// 256-bit key derived from stable host identity. Zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct HostKey([u8; 32]);

impl HostKey {
    /// Derive the key for the current host.
    pub fn for_current_host() -> Self {
        let host = hostname::get()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Hostname unavailable, deriving key from fallback identity");
                "localhost".to_string()
            });
        Self::derive(&host)
    }

    /// Deterministic derivation: `SHA-256(identity || salt)`.
    pub fn derive(identity: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(identity.as_bytes());
        hasher.update(KEY_SALT);
        let digest = hasher.finalize();
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Self(key)
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(&self.0.into())
    }

    /// Encrypt `plaintext` under a fresh random nonce.
    pub fn seal(&self, plaintext: &str) -> VaultResult<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher()
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| VaultError::Secret {
                reason: "encryption failed".to_string(),
            })?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(&combined))
    }

    /// Decrypt a value produced by [`seal`](Self::seal).
    pub fn open(&self, sealed: &str) -> VaultResult<DatabasePassword> {
        let failed = |reason: &str| VaultError::Secret {
            reason: reason.to_string(),
        };

        let combined = BASE64
            .decode(sealed.trim())
            .map_err(|_| failed("sealed value is not valid base64"))?;
        if combined.len() <= NONCE_LEN {
            return Err(failed("sealed value is too short"));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
        let plaintext = self
            .cipher()
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| failed("sealed value was produced on another host or is corrupted"))?;

        String::from_utf8(plaintext)
            .map(DatabasePassword::new)
            .map_err(|_| failed("sealed value is not UTF-8"))
    }
}

impl std::fmt::Debug for HostKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HostKey([REDACTED])")
    }
}

/// Configuration and key shared by every operation in the process.
#[derive(Debug)]
pub struct ServiceContext {
    config: VaultConfig,
    key: HostKey,
}

static CONTEXT: OnceLock<ServiceContext> = OnceLock::new();

impl ServiceContext {
    pub fn new(config: VaultConfig, key: HostKey) -> Self {
        Self { config, key }
    }

    /// Install the process-wide context. The first call wins; later calls
    /// return the already installed context unchanged.
    pub fn init(config: VaultConfig) -> &'static ServiceContext {
        CONTEXT.get_or_init(|| {
            tracing::debug!("Initializing service context");
            ServiceContext::new(config, HostKey::for_current_host())
        })
    }

    /// The installed context, if [`init`](Self::init) has run.
    pub fn get() -> Option<&'static ServiceContext> {
        CONTEXT.get()
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn key(&self) -> &HostKey {
        &self.key
    }

    /// Database password in clear, unsealing it if it is stored sealed.
    pub fn database_password(&self) -> VaultResult<Option<DatabasePassword>> {
        self.config.database.resolve_password(&self.key)
    }
}
