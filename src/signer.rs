//! The signing capability the vault turns into encryption keys.
//!
//! Key derivation only works if a signer returns byte-identical signatures
//! for byte-identical messages. [`LocalKeySigner`] guarantees that (Ed25519
//! is deterministic). [`CommandSigner`] cannot check it; it is up to the
//! wallet behind the command.

use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};

use ed25519_dalek::{SigningKey, Signer as _};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::SignerError;

/// Length of an Ed25519 seed.
pub const SEED_LEN: usize = 32;

/// Opaque signer output, used only as key material.
pub struct Signature(Zeroizing<Vec<u8>>);

impl Signature {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Signature {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Signature").field(&"[REDACTED]").finish()
    }
}

/// Something that signs messages on the user's behalf.
///
/// May block for as long as the user takes to approve. A decline must come
/// back as [`SignerError::Declined`] and is never retried.
pub trait Signer {
    fn sign(&self, message: &str) -> Result<Signature, SignerError>;
}

impl<S: Signer + ?Sized> Signer for &S {
    fn sign(&self, message: &str) -> Result<Signature, SignerError> {
        (**self).sign(message)
    }
}

impl<S: Signer + ?Sized> Signer for Box<S> {
    fn sign(&self, message: &str) -> Result<Signature, SignerError> {
        (**self).sign(message)
    }
}

/// Deterministic Ed25519 signer holding its seed in memory.
pub struct LocalKeySigner {
    key: SigningKey,
}

impl LocalKeySigner {
    pub fn from_seed(seed: &[u8; SEED_LEN]) -> Self {
        Self {
            key: SigningKey::from_bytes(seed),
        }
    }

    /// Parse a 64 character hex seed, with or without `0x`.
    pub fn from_hex(seed_hex: &str) -> Result<Self, SignerError> {
        let seed_hex = seed_hex.trim();
        let seed_hex = seed_hex.strip_prefix("0x").unwrap_or(seed_hex);

        let mut seed = Zeroizing::new([0u8; SEED_LEN]);
        hex::decode_to_slice(seed_hex, seed.as_mut_slice()).map_err(|_| {
            SignerError::Unavailable("signer key must be 64 hex characters".to_string())
        })?;

        Ok(Self::from_seed(&seed))
    }

    /// Hex public key. Used as the owner id in the ledger.
    pub fn identity(&self) -> String {
        hex::encode(self.key.verifying_key().to_bytes())
    }
}

impl Signer for LocalKeySigner {
    fn sign(&self, message: &str) -> Result<Signature, SignerError> {
        let signature = self.key.sign(message.as_bytes());
        Ok(Signature::from(signature.to_bytes().to_vec()))
    }
}

/// Delegates signing to an external wallet program.
///
/// The message is written to the program's stdin and the signature is read
/// from its stdout, surrounding whitespace trimmed. The textual signature
/// bytes themselves are the key material, the way browser wallets hand back
/// `0x...` strings.
#[derive(Debug, Clone)]
pub struct CommandSigner {
    program: String,
    args: Vec<String>,
}

impl CommandSigner {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a command line on whitespace. No shell quoting.
    pub fn parse(command_line: &str) -> Result<Self, SignerError> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| SignerError::Unavailable("empty signer command".to_string()))?;
        Ok(Self::new(program, parts.collect()))
    }
}

impl Signer for CommandSigner {
    fn sign(&self, message: &str) -> Result<Signature, SignerError> {
        debug!(program = %self.program, "requesting signature from external signer");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| SignerError::Unavailable(format!("{}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            // a signer may refuse without reading the message
            if let Err(e) = stdin.write_all(message.as_bytes()) {
                if e.kind() != ErrorKind::BrokenPipe {
                    return Err(SignerError::Unavailable(e.to_string()));
                }
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| SignerError::Unavailable(e.to_string()))?;

        if !output.status.success() {
            return Err(SignerError::Declined);
        }

        let stdout = Zeroizing::new(output.stdout);
        let signature = stdout.trim_ascii();
        if signature.is_empty() {
            return Err(SignerError::Unavailable(
                "signer returned no signature".to_string(),
            ));
        }

        Ok(Signature::from(signature.to_vec()))
    }
}
