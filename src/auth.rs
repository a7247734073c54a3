use anyhow::{Result, bail};
use blockvault::{Signature, Signer, SignerError};
use std::io::{self, BufRead, IsTerminal, Write};
use zeroize::Zeroizing;

/// Reads the hex seed of the local signing key.
pub fn read_signer_key() -> Result<Zeroizing<String>> {
    //  Environment Variable
    //  BLOCKVAULT_SIGNER_KEY="9d61..." blockvault encrypt report.pdf
    if let Ok(key) = std::env::var("BLOCKVAULT_SIGNER_KEY") {
        if !key.is_empty() {
            return Ok(Zeroizing::new(key));
        }
    }

    //  stdin (Pipeline)
    //  pass show wallet/seed | blockvault decrypt <cid>
    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().lock().read_line(&mut buf)?;
        let key = Zeroizing::new(buf.trim().to_string());

        if !key.is_empty() {
            return Ok(key);
        }
    }

    //  Interactive (TTY)
    if io::stdin().is_terminal() {
        let key = Zeroizing::new(rpassword::prompt_password("Signer key (hex): ")?);
        if !key.is_empty() {
            return Ok(key);
        }
    }

    bail!("No signer key provided")
}

/// Shows the message and waits for the user's go-ahead before signing,
/// like a wallet's confirmation dialog.
///
/// Only asks when stdin is a terminal; scripted runs have already chosen
/// their key or signer command explicitly.
pub struct ConfirmingSigner<S> {
    inner: S,
}

impl<S: Signer> ConfirmingSigner<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: Signer> Signer for ConfirmingSigner<S> {
    fn sign(&self, message: &str) -> Result<Signature, SignerError> {
        if io::stdin().is_terminal() && !confirm(message)? {
            return Err(SignerError::Declined);
        }
        self.inner.sign(message)
    }
}

fn confirm(message: &str) -> Result<bool, SignerError> {
    let unavailable = |e: io::Error| SignerError::Unavailable(e.to_string());

    let mut stderr = io::stderr().lock();
    writeln!(stderr, "\nSignature request:\n").map_err(unavailable)?;
    for line in message.lines() {
        writeln!(stderr, "    {line}").map_err(unavailable)?;
    }
    write!(stderr, "\nSign this message? [y/N] ").map_err(unavailable)?;
    stderr.flush().map_err(unavailable)?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer).map_err(unavailable)?;

    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "Yes"))
}
