use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::{TempDir, tempdir};

// RFC 8032 test vector 1
const KEY: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";
const PUBLIC_KEY: &str = "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";
const OTHER_KEY: &str = "4ccd089b28ff96da9db6c346ec114e0f5b8a319f35aba624da8cf6ed4fb8a6fb";

const HELLO_HASH: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

fn bin(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("blockvault"));
    cmd.current_dir(dir)
        .env_remove("BLOCKVAULT_SIGNER_CMD")
        .env_remove("BLOCKVAULT_SIGNER_KEY")
        .env_remove("BLOCKVAULT_MAX_SIZE")
        .arg("--store")
        .arg(dir.join("objects"))
        .arg("--ledger")
        .arg(dir.join("ledger.json"));
    cmd
}

fn field(stdout: &str, label: &str) -> String {
    stdout
        .lines()
        .find_map(|l| l.strip_prefix(label))
        .unwrap_or_else(|| panic!("no '{label}' in output:\n{stdout}"))
        .trim()
        .to_string()
}

/// Encrypts `name` with `contents` using KEY; returns (content id, file hash).
fn encrypt(dir: &TempDir, name: &str, contents: &[u8]) -> (String, String) {
    let file = dir.path().join(name);
    fs::write(&file, contents).unwrap();

    let output = bin(dir.path())
        .env("BLOCKVAULT_SIGNER_KEY", KEY)
        .arg("encrypt")
        .arg(&file)
        .arg("--yes")
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout).unwrap();
    (field(&stdout, "content id:"), field(&stdout, "file hash:"))
}

#[test]
fn encrypt_then_decrypt_roundtrip() {
    let dir = tempdir().unwrap();
    let (cid, hash) = encrypt(&dir, "notes.txt", b"hello");
    assert_eq!(hash, HELLO_HASH);

    // only the container reached the store
    let stored = fs::read(dir.path().join("objects").join(&cid)).unwrap();
    assert_eq!(stored.len(), 28 + 5 + 16);

    let out = dir.path().join("restored.txt");
    bin(dir.path())
        .env("BLOCKVAULT_SIGNER_KEY", KEY)
        .arg("decrypt")
        .arg(&cid)
        .arg("--hash")
        .arg(&hash)
        .arg("-o")
        .arg(&out)
        .arg("--yes")
        .assert()
        .success()
        .stdout(predicate::str::contains("application/octet-stream"));

    assert_eq!(fs::read(out).unwrap(), b"hello");
}

#[test]
fn decrypt_by_content_id_repairs_name() {
    let dir = tempdir().unwrap();
    let png = b"\x89PNG\r\n\x1a\n-image-data-".to_vec();
    let (cid, _) = encrypt(&dir, "diagram.bin", &png);

    bin(dir.path())
        .env("BLOCKVAULT_SIGNER_KEY", KEY)
        .arg("decrypt")
        .arg(&cid)
        .arg("--yes")
        .assert()
        .success()
        .stdout(predicate::str::contains("diagram.png"))
        .stdout(predicate::str::contains("image/png"));

    assert_eq!(fs::read(dir.path().join("diagram.png")).unwrap(), png);
}

#[test]
fn key_from_stdin_works() {
    let dir = tempdir().unwrap();
    let (cid, hash) = encrypt(&dir, "a.txt", b"piped");

    bin(dir.path())
        .arg("decrypt")
        .arg(&cid)
        .arg("--hash")
        .arg(&hash)
        .arg("-o")
        .arg(dir.path().join("out"))
        .write_stdin(format!("{KEY}\n"))
        .assert()
        .success();

    assert_eq!(fs::read(dir.path().join("out")).unwrap(), b"piped");
}

#[test]
fn wrong_signer_key_fails() {
    let dir = tempdir().unwrap();
    let (cid, hash) = encrypt(&dir, "secret.txt", b"top secret");
    let out = dir.path().join("restored.txt");

    bin(dir.path())
        .env("BLOCKVAULT_SIGNER_KEY", OTHER_KEY)
        .arg("decrypt")
        .arg(&cid)
        .arg("--hash")
        .arg(&hash)
        .arg("-o")
        .arg(&out)
        .arg("--yes")
        .assert()
        .failure()
        .stderr(predicate::str::contains("wrong signer or corrupted data"));

    assert!(!out.exists());
}

#[test]
fn wrong_hash_fails() {
    let dir = tempdir().unwrap();
    let (cid, _) = encrypt(&dir, "secret.txt", b"top secret");

    bin(dir.path())
        .env("BLOCKVAULT_SIGNER_KEY", KEY)
        .arg("decrypt")
        .arg(&cid)
        .arg("--hash")
        .arg(HELLO_HASH)
        .arg("--yes")
        .assert()
        .failure()
        .stderr(predicate::str::contains("wrong signer or corrupted data"));
}

#[test]
fn malformed_hash_is_rejected() {
    let dir = tempdir().unwrap();

    bin(dir.path())
        .arg("message")
        .arg("not-a-hash")
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected 64 hex characters"));
}

#[cfg(unix)]
#[test]
fn declining_external_signer_aborts() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("a.txt");
    fs::write(&file, b"data").unwrap();

    bin(dir.path())
        .arg("encrypt")
        .arg(&file)
        .arg("--signer-cmd")
        .arg("false")
        .assert()
        .failure()
        .stderr(predicate::str::contains("rejected"));

    assert!(!dir.path().join("objects").exists());
}

#[test]
fn missing_external_signer_is_unavailable() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("a.txt");
    fs::write(&file, b"data").unwrap();

    bin(dir.path())
        .arg("encrypt")
        .arg(&file)
        .arg("--signer-cmd")
        .arg("blockvault-test-no-such-wallet")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no signer available"));
}

#[test]
fn oversized_file_is_rejected() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("big.bin");
    fs::write(&file, b"12345").unwrap();

    bin(dir.path())
        .env("BLOCKVAULT_SIGNER_KEY", KEY)
        .arg("--max-size")
        .arg("4")
        .arg("encrypt")
        .arg(&file)
        .arg("--yes")
        .assert()
        .failure()
        .stderr(predicate::str::contains("limit is 4 bytes"));
}

#[test]
fn size_limit_is_checked_before_signer_key() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("big.bin");
    fs::write(&file, b"12345").unwrap();

    // no key anywhere: reaching the signer would fail differently
    bin(dir.path())
        .arg("--max-size")
        .arg("4")
        .arg("encrypt")
        .arg(&file)
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("limit is 4 bytes"))
        .stderr(predicate::str::contains("No signer key provided").not());
}

#[test]
fn unknown_content_is_not_found() {
    let dir = tempdir().unwrap();

    bin(dir.path())
        .env("BLOCKVAULT_SIGNER_KEY", KEY)
        .arg("decrypt")
        .arg("a".repeat(64))
        .arg("--hash")
        .arg(HELLO_HASH)
        .arg("--yes")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn decrypt_does_not_overwrite_without_force() {
    let dir = tempdir().unwrap();
    let (cid, hash) = encrypt(&dir, "a.txt", b"new contents");
    let out = dir.path().join("existing.txt");
    fs::write(&out, b"keep me").unwrap();

    bin(dir.path())
        .env("BLOCKVAULT_SIGNER_KEY", KEY)
        .arg("decrypt")
        .arg(&cid)
        .arg("--hash")
        .arg(&hash)
        .arg("-o")
        .arg(&out)
        .arg("--yes")
        .assert()
        .failure();
    assert_eq!(fs::read(&out).unwrap(), b"keep me");

    bin(dir.path())
        .env("BLOCKVAULT_SIGNER_KEY", KEY)
        .arg("decrypt")
        .arg(&cid)
        .arg("--hash")
        .arg(&hash)
        .arg("-o")
        .arg(&out)
        .arg("--force")
        .arg("--yes")
        .assert()
        .success();
    assert_eq!(fs::read(&out).unwrap(), b"new contents");
}

#[test]
fn files_and_info_show_ledger() {
    let dir = tempdir().unwrap();
    let (cid, hash) = encrypt(&dir, "report.pdf", b"%PDF-1.7 report");

    bin(dir.path())
        .arg("files")
        .arg("--owner")
        .arg(PUBLIC_KEY)
        .assert()
        .success()
        .stdout(predicate::str::contains("report.pdf"))
        .stdout(predicate::str::contains(cid.as_str()));

    bin(dir.path())
        .arg("files")
        .arg("--owner")
        .arg("someone-else")
        .assert()
        .success()
        .stdout(predicate::str::contains("No files recorded."));

    bin(dir.path())
        .arg("info")
        .arg(&hash)
        .assert()
        .success()
        .stdout(predicate::str::contains("size:       15 bytes"))
        .stdout(predicate::str::contains(PUBLIC_KEY));
}

#[test]
fn no_ledger_flag_skips_recording() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("a.txt");
    fs::write(&file, b"data").unwrap();

    bin(dir.path())
        .env("BLOCKVAULT_SIGNER_KEY", KEY)
        .arg("encrypt")
        .arg(&file)
        .arg("--no-ledger")
        .arg("--yes")
        .assert()
        .success();

    assert!(!dir.path().join("ledger.json").exists());
}

#[test]
fn hash_message_and_sniff_commands() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("photo.dat");
    fs::write(&file, b"hello").unwrap();

    bin(dir.path())
        .arg("hash")
        .arg(&file)
        .assert()
        .success()
        .stdout(format!("{HELLO_HASH}\n"));

    bin(dir.path())
        .arg("message")
        .arg(HELLO_HASH)
        .assert()
        .success()
        .stdout(format!(
            "BlockVault Encryption\nFile Hash: {HELLO_HASH}\n\nSign this message to encrypt/decrypt your file.\n"
        ));

    fs::write(&file, [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]).unwrap();
    bin(dir.path())
        .arg("sniff")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("JPEG (image/jpeg)"))
        .stdout(predicate::str::contains("suggested name: photo.jpg"));
}

#[test]
fn identity_prints_public_key() {
    let dir = tempdir().unwrap();

    bin(dir.path())
        .env("BLOCKVAULT_SIGNER_KEY", KEY)
        .arg("identity")
        .assert()
        .success()
        .stdout(format!("{PUBLIC_KEY}\n"));
}
