//! Integration tests for the vultitool CLI.
//!
//! These tests exercise the binary end-to-end using `assert_cmd`.
//! Interactive prompts are hard to automate, so every test that needs a
//! passphrase supplies it through an environment variable.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;
use vultitool::crypto::KdfParams;
use vultitool::vault::{seal, seal_plain, DecryptedVault, KeyShare};
use zeroize::Zeroizing;

/// Helper: get a Command pointing at the vultitool binary.
fn vultitool(dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("vultitool").expect("binary should exist");
    cmd.current_dir(dir.path())
        .env_remove("VULTITOOL_PASSPHRASE")
        .env_remove("VULTITOOL_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn sample_vault(name: &str) -> DecryptedVault {
    DecryptedVault {
        name: name.into(),
        public_key_ecdsa: "03ac0f1ffb9e2d7c1b8a6e4f3d2c1b0a9f8e7d6c5b4a39281706f5e4d3c2b1a0f9".into(),
        public_key_eddsa: "d3a1f0e2c4b6a8d0f2e4c6b8a0d2f4e6c8b0a2d4f6e8c0b2a4d6f8e0c2b4a6d8".into(),
        hex_chain_code: "5c3e1a9f7d5b3e1c9a7f5d3b1e9c7a5f3d1b9e7c5a3f1d9b7e5c3a1f9d7b5e3c".into(),
        local_party_id: "MacBook-Pro-A1B".into(),
        reshare_prefix: String::new(),
        lib_type_id: 0,
        signers: vec![
            "MacBook-Pro-A1B".into(),
            "iPhone-5C9".into(),
            "Pixel-7D2".into(),
        ],
        created_at: chrono::DateTime::from_timestamp(1_700_000_000, 0),
        key_shares: vec![KeyShare {
            public_key: "03ac0f1ffb9e2d7c1b8a6e4f3d2c1b0a9f8e7d6c5b4a39281706f5e4d3c2b1a0f9"
                .into(),
            keyshare: Zeroizing::new("c2hhcmUtbWF0ZXJpYWwtb25l".into()),
        }],
    }
}

/// Write an encrypted vault into `dir` and return its file name.
fn write_sealed(dir: &TempDir, file: &str, passphrase: &str, params: &KdfParams) -> String {
    let text = seal(&sample_vault(file), passphrase.as_bytes(), params).unwrap();
    dir.child(file).write_str(&text).unwrap();
    file.to_string()
}

fn fast_params() -> KdfParams {
    KdfParams::pbkdf2(vec![0x42; 16], 1_000)
}

// ---------------------------------------------------------------------------
// Usage
// ---------------------------------------------------------------------------

#[test]
fn no_args_prints_usage_and_exits_2() {
    let tmp = TempDir::new().unwrap();
    vultitool(&tmp)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_lists_subcommands() {
    let tmp = TempDir::new().unwrap();
    vultitool(&tmp)
        .arg("help")
        .assert()
        .success()
        .stdout(predicate::str::contains("decrypt"))
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("version"));
}

#[test]
fn version_subcommand_shows_version() {
    let tmp = TempDir::new().unwrap();
    vultitool(&tmp)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "vultitool {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn unknown_flag_exits_2() {
    let tmp = TempDir::new().unwrap();
    vultitool(&tmp)
        .args(["decrypt", "--no-such-flag", "a.vult"])
        .assert()
        .code(2);
}

#[test]
fn unknown_format_exits_2() {
    let tmp = TempDir::new().unwrap();
    let file = write_sealed(&tmp, "a.vult", "pw", &fast_params());
    vultitool(&tmp)
        .args(["decrypt", &file, "--format", "yaml"])
        .env("VULTITOOL_PASSPHRASE", "pw")
        .assert()
        .code(2);
}

#[test]
fn unset_passphrase_variable_exits_2() {
    let tmp = TempDir::new().unwrap();
    let file = write_sealed(&tmp, "a.vult", "pw", &fast_params());
    vultitool(&tmp)
        .args(["decrypt", &file, "--passphrase-env", "VULTITOOL_TEST_UNSET_PW"])
        .env_remove("VULTITOOL_TEST_UNSET_PW")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("VULTITOOL_TEST_UNSET_PW"));
}

// ---------------------------------------------------------------------------
// decrypt
// ---------------------------------------------------------------------------

#[test]
fn scenario_correct_passphrase_exports_json() {
    let tmp = TempDir::new().unwrap();
    let params = KdfParams::pbkdf2(vec![1, 2, 3, 4, 5, 6, 7, 8], 100_000);
    let file = write_sealed(&tmp, "share.vult", "correct-horse", &params);

    let assert = vultitool(&tmp)
        .args(["decrypt", &file, "--passphrase-env", "VAULT_PW"])
        .env("VAULT_PW", "correct-horse")
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["format"], "vultitool/decrypted-vault/v1");
    assert_eq!(value["name"], "share.vult");
    assert_eq!(value["threshold"], 2);
    assert_eq!(value["key_shares"][0]["keyshare"], "c2hhcmUtbWF0ZXJpYWwtb25l");
}

#[test]
fn scenario_wrong_passphrase_exits_1() {
    let tmp = TempDir::new().unwrap();
    let params = KdfParams::pbkdf2(vec![1, 2, 3, 4, 5, 6, 7, 8], 100_000);
    let file = write_sealed(&tmp, "share.vult", "correct-horse", &params);

    vultitool(&tmp)
        .args(["decrypt", &file, "--passphrase-env", "VAULT_PW"])
        .env("VAULT_PW", "wrong-horse")
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Decryption failed"));
}

#[test]
fn default_passphrase_variable_is_used() {
    let tmp = TempDir::new().unwrap();
    let file = write_sealed(&tmp, "a.vult", "pw", &fast_params());
    vultitool(&tmp)
        .args(["decrypt", &file, "--format", "toml"])
        .env("VULTITOOL_PASSPHRASE", "pw")
        .assert()
        .success()
        .stdout(predicate::str::contains("lib_type = \"GG20\""));
}

#[test]
fn config_file_sets_format_and_variable() {
    let tmp = TempDir::new().unwrap();
    let file = write_sealed(&tmp, "a.vult", "pw", &fast_params());
    tmp.child("vultitool.toml")
        .write_str("output_format = \"toml\"\npassphrase_env = \"MY_VAULT_PW\"\n")
        .unwrap();

    vultitool(&tmp)
        .args(["decrypt", &file])
        .env("MY_VAULT_PW", "pw")
        .assert()
        .success()
        .stdout(predicate::str::contains("format = \"vultitool/decrypted-vault/v1\""));
}

#[test]
fn missing_explicit_config_fails() {
    let tmp = TempDir::new().unwrap();
    let file = write_sealed(&tmp, "a.vult", "pw", &fast_params());
    vultitool(&tmp)
        .args(["--config", "absent.toml", "decrypt", &file])
        .env("VULTITOOL_PASSPHRASE", "pw")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Config file error"));
}

#[test]
fn output_file_is_written_and_never_overwritten() {
    let tmp = TempDir::new().unwrap();
    let file = write_sealed(&tmp, "a.vult", "pw", &fast_params());

    vultitool(&tmp)
        .args(["decrypt", &file, "-o", "a.json"])
        .env("VULTITOOL_PASSPHRASE", "pw")
        .assert()
        .success()
        .stdout(predicate::str::contains("Decrypted"));
    tmp.child("a.json")
        .assert(predicate::str::contains("\"local_party_id\": \"MacBook-Pro-A1B\""));

    tmp.child("b.json").write_str("keep me").unwrap();
    vultitool(&tmp)
        .args(["decrypt", &file, "-o", "b.json"])
        .env("VULTITOOL_PASSPHRASE", "pw")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("refusing to overwrite"));
    tmp.child("b.json").assert("keep me");
}

#[test]
fn missing_input_file_fails() {
    let tmp = TempDir::new().unwrap();
    vultitool(&tmp)
        .args(["decrypt", "nope.vult"])
        .env("VULTITOOL_PASSPHRASE", "pw")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn garbage_input_is_a_format_error() {
    let tmp = TempDir::new().unwrap();
    tmp.child("bad.vult").write_str("thisis!! notvault").unwrap();
    vultitool(&tmp)
        .args(["decrypt", "bad.vult"])
        .env("VULTITOOL_PASSPHRASE", "pw")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not valid base64"));
}

#[test]
fn several_files_require_output_dir() {
    let tmp = TempDir::new().unwrap();
    let a = write_sealed(&tmp, "a.vult", "pw", &fast_params());
    let b = write_sealed(&tmp, "b.vult", "pw", &fast_params());
    vultitool(&tmp)
        .args(["decrypt", &a, &b])
        .env("VULTITOOL_PASSPHRASE", "pw")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--output-dir"));
}

#[test]
fn batch_decrypts_every_file_into_output_dir() {
    let tmp = TempDir::new().unwrap();
    let a = write_sealed(&tmp, "a.vult", "pw", &fast_params());
    let b = write_sealed(&tmp, "b.vult", "pw", &fast_params());

    vultitool(&tmp)
        .args(["decrypt", &a, &b, "--output-dir", "out"])
        .env("VULTITOOL_PASSPHRASE", "pw")
        .assert()
        .success();

    tmp.child("out/a.json")
        .assert(predicate::str::contains("\"name\": \"a.vult\""));
    tmp.child("out/b.json")
        .assert(predicate::str::contains("\"name\": \"b.vult\""));
}

#[test]
fn batch_reports_failures_but_finishes_the_rest() {
    let tmp = TempDir::new().unwrap();
    let good = write_sealed(&tmp, "good.vult", "pw", &fast_params());
    let other = write_sealed(&tmp, "other.vult", "different", &fast_params());

    vultitool(&tmp)
        .args(["decrypt", &good, &other, "--output-dir", "out"])
        .env("VULTITOOL_PASSPHRASE", "pw")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("other.vult"))
        .stderr(predicate::str::contains("1 of 2 vault files failed"));

    tmp.child("out/good.json").assert(predicate::path::exists());
    tmp.child("out/other.json").assert(predicate::path::missing());
}

// ---------------------------------------------------------------------------
// inspect / validate
// ---------------------------------------------------------------------------

#[test]
fn inspect_encrypted_shows_envelope_only() {
    let tmp = TempDir::new().unwrap();
    let file = write_sealed(&tmp, "a.vult", "pw", &fast_params());

    let assert = vultitool(&tmp)
        .args(["inspect", &file, "--json"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(value["version"], 1);
    assert_eq!(value["encrypted"], true);
    assert_eq!(value["kdf"]["algorithm"], "PBKDF2-HMAC-SHA256");
    assert_eq!(value["kdf"]["iterations"], 1000);
    assert!(value.get("vault").is_none());
}

#[test]
fn inspect_plaintext_hides_keyshares_unless_asked() {
    let tmp = TempDir::new().unwrap();
    tmp.child("plain.vult")
        .write_str(&seal_plain(&sample_vault("Plain vault")))
        .unwrap();

    vultitool(&tmp)
        .args(["inspect", "plain.vult"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Plain vault"))
        .stdout(predicate::str::contains("c2hhcmUtbWF0ZXJpYWwtb25l").not());

    vultitool(&tmp)
        .args(["inspect", "plain.vult", "--json", "--show-keyshares"])
        .assert()
        .success()
        .stdout(predicate::str::contains("c2hhcmUtbWF0ZXJpYWwtb25l"));
}

#[test]
fn validate_accepts_consistent_vault() {
    let tmp = TempDir::new().unwrap();
    let file = write_sealed(&tmp, "a.vult", "pw", &fast_params());
    vultitool(&tmp)
        .args(["validate", &file, "--strict"])
        .env("VULTITOOL_PASSPHRASE", "pw")
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));
}

#[test]
fn validate_reports_every_issue() {
    let tmp = TempDir::new().unwrap();
    let mut vault = sample_vault("broken");
    vault.local_party_id = "stranger".into();
    vault.key_shares[0].public_key = "unrelated".into();
    tmp.child("broken.vult")
        .write_str(&seal_plain(&vault))
        .unwrap();

    vultitool(&tmp)
        .args(["validate", "broken.vult", "--strict"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not one of the signers"))
        .stderr(predicate::str::contains("matches neither vault public key"));
}
