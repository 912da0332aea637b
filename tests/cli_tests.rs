//! CLI integration tests

use assert_cmd::Command;
use predicates::prelude::*;

fn murmur_bin() -> Command {
    Command::cargo_bin("murmur").expect("binary builds")
}

#[test]
fn help_lists_subcommands() {
    murmur_bin()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("devices"))
        .stdout(predicate::str::contains("record"))
        .stdout(predicate::str::contains("file"))
        .stdout(predicate::str::contains("download"));
}

#[test]
fn version_output() {
    murmur_bin()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("murmur"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn record_help_shows_device_and_save_flags() {
    murmur_bin()
        .args(["record", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--input"))
        .stdout(predicate::str::contains("--output"))
        .stdout(predicate::str::contains("--save-to-documents"))
        .stdout(predicate::str::contains("--model"));
}

#[test]
fn no_subcommand_is_a_usage_error() {
    murmur_bin()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn file_with_missing_path_fails_fast() {
    let home = tempfile::tempdir().unwrap();
    murmur_bin()
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .args(["file", "/no/such/audio.wav"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn file_with_unknown_model_fails_before_any_upload() {
    let home = tempfile::tempdir().unwrap();
    let wav = home.path().join("clip.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&wav, spec).unwrap();
    for _ in 0..1600 {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();

    // Points at a dead endpoint: the model check must fail before any
    // network traffic, so no connection error appears
    murmur_bin()
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env("MURMUR_API_URL", "http://127.0.0.1:9/v1")
        .args(["file", wav.to_str().unwrap(), "-m", "no-such-model"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown model"));
}

#[test]
fn download_with_malformed_url_fails_fast() {
    let home = tempfile::tempdir().unwrap();
    murmur_bin()
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .args(["download", "not a url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid URL"));
}
