use crate::crypto::FileDigest;

/// The text the signer is asked to sign for a given file.
///
/// Depends on nothing but the digest, so the decrypting side rebuilds the
/// exact same string without it ever being stored next to the ciphertext.
/// Changing a single byte here makes every existing container undecryptable.
pub fn encryption_message(digest: &FileDigest) -> String {
    format!(
        "BlockVault Encryption\nFile Hash: {digest}\n\nSign this message to encrypt/decrypt your file."
    )
}
