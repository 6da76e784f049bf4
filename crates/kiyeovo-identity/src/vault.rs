//! Vault creation, at-rest sealing, and unlock (spec §3, §4.1).

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use thiserror::Error;
use tokio::sync::Mutex;
use zeroize::Zeroizing;

use kiyeovo_crypto::{aesgcm, ed25519, recovery, rsa as krsa, scrypt};
use kiyeovo_db::queries::{identity as identity_queries, login_attempts};
use kiyeovo_types::identity::{Identity, IdentityEnvelope};
use kiyeovo_types::PeerId;

use crate::policy::{self, PolicyError};

/// Tunables for the vault's key derivation and unlock flow. Values outside
/// `scrypt_log_n` are safe to change between runs; `scrypt_log_n` must stay
/// fixed for the life of a vault — it is not stored alongside the envelope
/// (spec §3 does not list it as a persisted field).
#[derive(Debug, Clone, Copy)]
pub struct UnlockConfig {
    /// scrypt cost parameter, expressed as log2(N).
    pub scrypt_log_n: u8,
    /// Wall-clock budget for the blocking scrypt + AEAD worker.
    pub worker_timeout: Duration,
    /// Failed attempts before a cooldown is imposed.
    pub max_failed_attempts: u32,
    /// Cooldown duration once `max_failed_attempts` is crossed.
    pub cooldown: Duration,
}

impl Default for UnlockConfig {
    fn default() -> Self {
        Self {
            scrypt_log_n: 15,
            worker_timeout: Duration::from_secs(10),
            max_failed_attempts: 5,
            cooldown: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("weak password: {0}")]
    WeakPassword(#[from] PolicyError),

    #[error("no identity has been created yet")]
    NotFound,

    #[error("an identity already exists for this install")]
    AlreadyExists,

    #[error("too many failed attempts, retry after {retry_after_secs}s")]
    Cooldown { retry_after_secs: u64 },

    #[error("wrong password or recovery phrase")]
    WrongSecret,

    #[error("identity is corrupt: {0}")]
    Corrupt(String),

    #[error("unlock operation timed out")]
    Timeout,

    #[error(transparent)]
    Crypto(#[from] kiyeovo_crypto::CryptoError),

    #[error(transparent)]
    Db(#[from] kiyeovo_db::DbError),
}

impl From<IdentityError> for kiyeovo_errors::KiyeovoError {
    fn from(err: IdentityError) -> Self {
        use kiyeovo_errors::KiyeovoError;
        match err {
            IdentityError::WrongSecret => KiyeovoError::CryptoAuthFailed,
            IdentityError::Timeout => KiyeovoError::CryptoTimeout,
            IdentityError::Corrupt(msg) => KiyeovoError::CorruptIdentity(msg),
            IdentityError::Cooldown { retry_after_secs } => {
                KiyeovoError::RateLimited { retry_after_secs }
            }
            other => KiyeovoError::ProtocolViolation(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, IdentityError>;

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// The identity vault: owns the database connection used for the envelope
/// rows and the login-attempt cooldown counter.
pub struct Vault {
    conn: Arc<Mutex<rusqlite::Connection>>,
    config: UnlockConfig,
}

impl Vault {
    pub fn new(conn: Arc<Mutex<rusqlite::Connection>>, config: UnlockConfig) -> Self {
        Self { conn, config }
    }

    /// Create a brand-new identity, validate `password` against policy,
    /// and persist both the password-derived and recovery-phrase-derived
    /// envelopes. Returns the plaintext identity (to hold in memory for the
    /// current session) and the recovery phrase (shown to the user exactly
    /// once — it is not retrievable again).
    pub async fn create(&self, password: &str) -> Result<(Identity, String)> {
        policy::validate(password)?;

        {
            let conn = self.conn.lock().await;
            match identity_queries::load_password_envelope(&conn) {
                Ok(_) => return Err(IdentityError::AlreadyExists),
                Err(kiyeovo_db::DbError::NotFound(_)) => {}
                Err(other) => return Err(IdentityError::Db(other)),
            }
        }

        let identity = generate_identity();
        let mnemonic = recovery::generate_phrase()?;

        let password_envelope = seal_with_password(&identity, password, self.config.scrypt_log_n)?;
        let recovery_envelope = seal_with_recovery(&identity, &mnemonic)?;

        let conn = self.conn.lock().await;
        identity_queries::upsert_password_envelope(&conn, &password_envelope)?;
        identity_queries::upsert_recovery_envelope(&conn, &recovery_envelope)?;
        drop(conn);

        Ok((identity, mnemonic.to_string()))
    }

    /// Unlock with the user's password, subject to the failed-attempt
    /// cooldown (spec §4.1, §6 `checkLoginCooldown`/`recordFailedLoginAttempt`).
    pub async fn unlock_with_password(&self, password: &str) -> Result<Identity> {
        self.check_cooldown().await?;

        let envelope = {
            let conn = self.conn.lock().await;
            identity_queries::load_password_envelope(&conn).map_err(|e| match e {
                kiyeovo_db::DbError::NotFound(_) => IdentityError::NotFound,
                other => IdentityError::Db(other),
            })?
        };

        let password = Zeroizing::new(password.to_owned());
        let log_n = self.config.scrypt_log_n;
        let outcome = run_with_timeout(self.config.worker_timeout, move || {
            open_with_password(&envelope, &password, log_n)
        })
        .await;

        self.finish_unlock(outcome).await
    }

    /// Unlock with a BIP-39 recovery phrase instead of the password.
    pub async fn unlock_with_recovery_phrase(&self, phrase: &str) -> Result<Identity> {
        self.check_cooldown().await?;

        let envelope = {
            let conn = self.conn.lock().await;
            identity_queries::load_recovery_envelope(&conn).map_err(|e| match e {
                kiyeovo_db::DbError::NotFound(_) => IdentityError::NotFound,
                other => IdentityError::Db(other),
            })?
        };

        let phrase = phrase.to_owned();
        let outcome = run_with_timeout(self.config.worker_timeout, move || {
            open_with_recovery_phrase(&envelope, &phrase)
        })
        .await;

        self.finish_unlock(outcome).await
    }

    async fn check_cooldown(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        let state = login_attempts::get(&conn)?;
        let now = now_secs();
        if state.cooldown_until > now {
            return Err(IdentityError::Cooldown {
                retry_after_secs: state.cooldown_until - now,
            });
        }
        Ok(())
    }

    async fn finish_unlock(&self, outcome: Result<Identity>) -> Result<Identity> {
        let conn = self.conn.lock().await;
        match outcome {
            Ok(identity) => {
                login_attempts::clear(&conn)?;
                Ok(identity)
            }
            Err(IdentityError::WrongSecret) => {
                let now = now_secs();
                let failed_count = login_attempts::record_failed_attempt(&conn, now)?;
                if failed_count >= self.config.max_failed_attempts {
                    login_attempts::set_cooldown(&conn, now + self.config.cooldown.as_secs())?;
                }
                Err(IdentityError::WrongSecret)
            }
            Err(other) => Err(other),
        }
    }
}

/// Run a CPU-bound closure on a blocking worker with a wall-clock budget.
/// A timeout or a cancelled/panicked task both surface as
/// [`IdentityError::Timeout`] — the blocking task's local buffers are
/// `Zeroizing`, so an abandoned future still scrubs its secret material.
async fn run_with_timeout<F>(budget: Duration, f: F) -> Result<Identity>
where
    F: FnOnce() -> Result<Identity> + Send + 'static,
{
    match tokio::time::timeout(budget, tokio::task::spawn_blocking(f)).await {
        Ok(Ok(result)) => result,
        Ok(Err(_join_error)) => Err(IdentityError::Timeout),
        Err(_elapsed) => Err(IdentityError::Timeout),
    }
}

/// Generate a fresh identity: two ed25519 keypairs (transport and
/// application signing) and two RSA-3072 keypairs (offline sealing and
/// notification), with `id` derived from the transport key. Exposed
/// publicly so integration tests can build realistic peers without going
/// through a full [`Vault`].
pub fn generate_identity() -> Identity {
    let libp2p_kp = ed25519::KeyPair::generate();
    let sign_kp = ed25519::KeyPair::generate();
    let offline_rsa = krsa::RsaKeyPair::generate().expect("RSA-3072 keygen");
    let notif_rsa = krsa::RsaKeyPair::generate().expect("RSA-3072 keygen");

    let id = ed25519::derive_peer_id(&libp2p_kp.verifying_key);

    Identity {
        id,
        libp2p_priv: libp2p_kp.signing_key.to_bytes(),
        sign_priv: sign_kp.signing_key.to_bytes(),
        sign_pub: sign_kp.verifying_key.to_bytes(),
        offline_rsa_priv: encode_rsa_private(&offline_rsa.private_key),
        offline_rsa_pub: encode_rsa_public(&offline_rsa.public_key),
        notif_rsa_priv: encode_rsa_private(&notif_rsa.private_key),
        notif_rsa_pub: encode_rsa_public(&notif_rsa.public_key),
    }
}

fn encode_rsa_private(key: &rsa::RsaPrivateKey) -> Vec<u8> {
    key.to_pkcs8_der()
        .expect("RSA private key DER encoding")
        .as_bytes()
        .to_vec()
}

fn encode_rsa_public(key: &rsa::RsaPublicKey) -> Vec<u8> {
    key.to_public_key_der()
        .expect("RSA public key DER encoding")
        .as_bytes()
        .to_vec()
}

/// Reconstruct an RSA private key from the DER bytes stored on an
/// [`Identity`]. Used by higher components (offline sealing) that need the
/// typed key rather than raw bytes.
pub fn decode_rsa_private(bytes: &[u8]) -> Result<rsa::RsaPrivateKey> {
    rsa::RsaPrivateKey::from_pkcs8_der(bytes)
        .map_err(|e| IdentityError::Corrupt(format!("RSA private key: {e}")))
}

/// Reconstruct an RSA public key from DER bytes stored on an [`Identity`].
pub fn decode_rsa_public(bytes: &[u8]) -> Result<rsa::RsaPublicKey> {
    rsa::RsaPublicKey::from_public_key_der(bytes)
        .map_err(|e| IdentityError::Corrupt(format!("RSA public key: {e}")))
}

fn seal_with_password(identity: &Identity, password: &str, log_n: u8) -> Result<IdentityEnvelope> {
    let salt = scrypt::generate_salt();
    let key = scrypt::derive_key(password.as_bytes(), &salt, log_n)?;
    seal(identity, &key, salt)
}

fn seal_with_recovery(identity: &Identity, mnemonic: &bip39::Mnemonic) -> Result<IdentityEnvelope> {
    let key = recovery::seed_to_password_bytes(mnemonic);
    // The recovery copy has no scrypt salt of its own — its key already
    // carries the BIP-39 phrase's full entropy. A zero salt is stored only
    // so the envelope's column is non-null; it plays no cryptographic role.
    seal(identity, &key, [0u8; 32])
}

fn seal(identity: &Identity, key: &[u8; 32], salt: [u8; 32]) -> Result<IdentityEnvelope> {
    let plaintext = serde_json::to_vec(identity)
        .map_err(|e| IdentityError::Corrupt(format!("serialize identity: {e}")))?;
    let nonce = aesgcm::generate_nonce();
    let ciphertext = aesgcm::encrypt(key, &nonce, &plaintext, &identity.id)?;

    Ok(IdentityEnvelope {
        peer_id: identity.id,
        salt,
        nonce,
        ciphertext,
        created_at: now_secs(),
    })
}

fn open_with_password(envelope: &IdentityEnvelope, password: &str, log_n: u8) -> Result<Identity> {
    let key = scrypt::derive_key(password.as_bytes(), &envelope.salt, log_n)?;
    open(envelope, &key)
}

fn open_with_recovery_phrase(envelope: &IdentityEnvelope, phrase: &str) -> Result<Identity> {
    let mnemonic = recovery::parse_phrase(phrase).map_err(|_| IdentityError::WrongSecret)?;
    let key = recovery::seed_to_password_bytes(&mnemonic);
    open(envelope, &key)
}

fn open(envelope: &IdentityEnvelope, key: &[u8; 32]) -> Result<Identity> {
    let plaintext = Zeroizing::new(
        aesgcm::decrypt(key, &envelope.nonce, &envelope.ciphertext, &envelope.peer_id)
            .map_err(|_| IdentityError::WrongSecret)?,
    );

    let identity: Identity = serde_json::from_slice(&plaintext)
        .map_err(|e| IdentityError::Corrupt(format!("deserialize identity: {e}")))?;

    verify_peer_id(&identity)?;
    Ok(identity)
}

/// Sign a message with the identity's application-level signing key.
pub fn sign(identity: &Identity, message: &[u8]) -> ed25519::Signature {
    ed25519::SigningKey::from_bytes(&identity.sign_priv).sign(message)
}

/// Verify a signature against a peer's application-level signing public key.
pub fn verify(
    sign_pub: &[u8; 32],
    message: &[u8],
    signature: &ed25519::Signature,
) -> Result<()> {
    let key = ed25519::VerifyingKey::from_bytes(sign_pub)?;
    key.verify(message, signature)?;
    Ok(())
}

/// Re-derive `id` from `libp2p_priv` and check it matches the stored value.
/// A mismatch means the envelope was tampered with or corrupted in a way
/// the AEAD tag alone would not catch (e.g. a bit-identical swap between
/// two envelopes with the same key).
fn verify_peer_id(identity: &Identity) -> Result<()> {
    let kp = ed25519::KeyPair::from_bytes(&identity.libp2p_priv);
    let derived: PeerId = ed25519::derive_peer_id(&kp.verifying_key);
    if derived != identity.id {
        return Err(IdentityError::Corrupt(
            "derived peer id does not match stored id".into(),
        ));
    }
    Ok(())
}
