//! CLI integration tests
//!
//! Tests the command-line interface end-to-end.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Get path to the fernbox binary
fn fernbox_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_fernbox"))
}

/// Get path to testdata directory
fn testdata_path(filename: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("testdata");
    path.push(filename);
    path
}

fn run_fernbox(args: &[&str]) -> Output {
    Command::new(fernbox_bin())
        .args(args)
        .env_remove("FERNBOX_KEY_FILE")
        .env_remove("FERNBOX_OUTPUT_DIR")
        .env_remove("FERNBOX_LOG")
        .output()
        .expect("failed to run fernbox")
}

/// Run fernbox with `stdin` piped in
fn run_fernbox_with_stdin(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(fernbox_bin())
        .args(args)
        .env_remove("FERNBOX_KEY_FILE")
        .env_remove("FERNBOX_OUTPUT_DIR")
        .env_remove("FERNBOX_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn fernbox");

    {
        let pipe = child.stdin.as_mut().expect("failed to open stdin");
        // Ignore BrokenPipe errors - the command may exit before reading stdin
        // if it encounters an error (e.g., file not found)
        let _ = pipe.write_all(stdin.as_bytes());
    }

    child.wait_with_output().expect("failed to wait for fernbox")
}

fn assert_success(output: &Output, what: &str) {
    assert!(
        output.status.success(),
        "{} failed: {}",
        what,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn write_key(dir: &Path) -> PathBuf {
    let key_path = dir.join("key.txt");
    let output = run_fernbox(&["keygen", "-o", path_str(&key_path)]);
    assert_success(&output, "keygen");
    key_path
}

#[test]
fn test_decrypt_known_ciphertext() {
    let temp_dir = TempDir::new().unwrap();
    let key = testdata_path("key.txt");

    let output = run_fernbox(&[
        "--key-file",
        path_str(&key),
        "--output-dir",
        path_str(temp_dir.path()),
        "file",
        "decrypt",
        "-i",
        path_str(&testdata_path("hello.txt.enc")),
    ]);
    assert_success(&output, "decrypt");

    let decrypted = fs::read(temp_dir.path().join("hello.txt")).unwrap();
    let expected = fs::read(testdata_path("hello.txt")).unwrap();
    assert_eq!(decrypted, expected);
}

#[test]
fn test_decrypt_known_base64_token_file() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("out.txt");

    let output = run_fernbox(&[
        "--key-file",
        path_str(&testdata_path("key.txt")),
        "file",
        "decrypt",
        "-i",
        path_str(&testdata_path("hello-token.txt")),
        "-o",
        path_str(&out),
    ]);
    assert_success(&output, "decrypt");
    assert_eq!(fs::read(&out).unwrap(), fs::read(testdata_path("hello.txt")).unwrap());
}

#[test]
fn test_text_decrypt_known_token() {
    let token = fs::read_to_string(testdata_path("hello-token.txt")).unwrap();
    let output = run_fernbox(&[
        "--key-file",
        path_str(&testdata_path("key.txt")),
        "text",
        "decrypt",
        &token,
    ]);
    assert_success(&output, "text decrypt");
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "Hello, world!\n\n"
    );
}

#[test]
fn test_keygen_prints_key() {
    let output = run_fernbox(&["keygen"]);
    assert_success(&output, "keygen");
    let stdout = String::from_utf8(output.stdout).unwrap();
    let key = stdout.trim_end();
    assert_eq!(key.len(), 44);
    assert!(key.ends_with('='));
}

#[test]
fn test_text_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let key_path = write_key(temp_dir.path());

    let output = run_fernbox(&["--key-file", path_str(&key_path), "text", "encrypt", "hello world"]);
    assert_success(&output, "text encrypt");
    let token = String::from_utf8(output.stdout).unwrap().trim_end().to_string();
    assert!(token.starts_with("gAAAAA"));

    let output = run_fernbox(&["--key-file", path_str(&key_path), "text", "decrypt", &token]);
    assert_success(&output, "text decrypt");
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "hello world\n");

    let other_key = temp_dir.path().join("other.txt");
    assert_success(&run_fernbox(&["keygen", "-o", path_str(&other_key)]), "keygen");
    let output = run_fernbox(&["--key-file", path_str(&other_key), "text", "decrypt", &token]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("invalid token or wrong key"));
}

#[test]
fn test_text_save() {
    let temp_dir = TempDir::new().unwrap();
    let key_path = write_key(temp_dir.path());

    let output = run_fernbox(&[
        "--key-file",
        path_str(&key_path),
        "--output-dir",
        path_str(temp_dir.path()),
        "text",
        "encrypt",
        "saved",
        "--save",
    ]);
    assert_success(&output, "text encrypt --save");
    let saved = fs::read_to_string(temp_dir.path().join("encrypted.txt")).unwrap();
    assert_eq!(format!("{saved}\n"), String::from_utf8(output.stdout).unwrap());
}

#[test]
fn test_text_decrypt_save() {
    let temp_dir = TempDir::new().unwrap();
    let token = fs::read_to_string(testdata_path("hello-token.txt")).unwrap();

    let output = run_fernbox(&[
        "--key-file",
        path_str(&testdata_path("key.txt")),
        "--output-dir",
        path_str(temp_dir.path()),
        "text",
        "decrypt",
        &token,
        "--save",
    ]);
    assert_success(&output, "text decrypt --save");
    assert_eq!(
        fs::read(temp_dir.path().join("decrypted.txt")).unwrap(),
        fs::read(testdata_path("hello.txt")).unwrap()
    );
}

#[test]
fn test_decrypt_plaintext_file_is_invalid_token() {
    let temp_dir = TempDir::new().unwrap();
    let plain = temp_dir.path().join("notes.txt.enc");
    fs::write(&plain, "hello world\n").unwrap();

    let output = run_fernbox(&[
        "--key-file",
        path_str(&testdata_path("key.txt")),
        "--output-dir",
        path_str(temp_dir.path()),
        "file",
        "decrypt",
        "-i",
        path_str(&plain),
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Error: invalid token or wrong key"));
    assert!(!temp_dir.path().join("notes.txt").exists());
}

#[test]
fn test_unpadded_key_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let key = fs::read_to_string(testdata_path("key.txt")).unwrap();
    let key_path = temp_dir.path().join("unpadded.txt");
    fs::write(&key_path, key.trim().trim_end_matches('=')).unwrap();

    let output = run_fernbox(&["--key-file", path_str(&key_path), "text", "encrypt", "x"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("key is not valid base64url"));
}

#[test]
fn test_file_roundtrip_with_key_from_stdin() {
    let temp_dir = TempDir::new().unwrap();
    let key_path = write_key(temp_dir.path());
    let key = fs::read_to_string(&key_path).unwrap();

    let out_dir = temp_dir.path().join("out");
    fs::create_dir(&out_dir).unwrap();
    let report = temp_dir.path().join("report.pdf");
    fs::write(&report, b"%PDF-1.7 pretend").unwrap();

    let output = run_fernbox_with_stdin(
        &[
            "--key-stdin",
            "--output-dir",
            path_str(&out_dir),
            "file",
            "encrypt",
            "-i",
            path_str(&report),
        ],
        &format!("{key}\n"),
    );
    assert_success(&output, "encrypt");
    let encrypted = out_dir.join("report.pdf.enc");
    assert!(encrypted.exists());

    let output = run_fernbox_with_stdin(
        &[
            "--key-stdin",
            "--output-dir",
            path_str(&out_dir),
            "file",
            "decrypt",
            "-i",
            path_str(&encrypted),
        ],
        &key,
    );
    assert_success(&output, "decrypt");
    assert_eq!(fs::read(out_dir.join("report.pdf")).unwrap(), b"%PDF-1.7 pretend");
}

#[test]
fn test_decrypt_without_enc_suffix_uses_fallback_name() {
    let temp_dir = TempDir::new().unwrap();
    let key_path = write_key(temp_dir.path());
    let plain = temp_dir.path().join("data.txt");
    fs::write(&plain, b"payload").unwrap();
    let renamed = temp_dir.path().join("data.bin");

    let output = run_fernbox(&[
        "--key-file",
        path_str(&key_path),
        "file",
        "encrypt",
        "-i",
        path_str(&plain),
        "-o",
        path_str(&renamed),
    ]);
    assert_success(&output, "encrypt");

    let output = run_fernbox(&[
        "--key-file",
        path_str(&key_path),
        "--output-dir",
        path_str(temp_dir.path()),
        "file",
        "decrypt",
        "-i",
        path_str(&renamed),
    ]);
    assert_success(&output, "decrypt");
    assert_eq!(fs::read(temp_dir.path().join("decrypted.bin")).unwrap(), b"payload");
}

#[test]
fn test_missing_key_fails() {
    let output = run_fernbox(&["text", "encrypt", "hello"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("no key is set"));
}

#[test]
fn test_invalid_key_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let key_path = temp_dir.path().join("key.txt");
    fs::write(&key_path, "V0VfY2xlYXJfdGhpcy1pcy1hLWtleQ==").unwrap();

    let output = run_fernbox(&["--key-file", path_str(&key_path), "text", "encrypt", "x"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("key must decode to 32 bytes"));
}

#[test]
fn test_empty_text_fails() {
    let output = run_fernbox(&[
        "--key-file",
        path_str(&testdata_path("key.txt")),
        "text",
        "encrypt",
        "   ",
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("please enter text first"));
}

#[test]
fn test_decrypt_nonexistent_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let nonexistent = temp_dir.path().join("nonexistent.enc");

    let output = run_fernbox(&[
        "--key-file",
        path_str(&testdata_path("key.txt")),
        "--output-dir",
        path_str(temp_dir.path()),
        "file",
        "decrypt",
        "-i",
        path_str(&nonexistent),
    ]);

    assert!(!output.status.success());
    assert!(!temp_dir.path().join("nonexistent").exists());
}

#[test]
fn test_wrong_key_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let key_path = write_key(temp_dir.path());

    let output = run_fernbox(&[
        "--key-file",
        path_str(&key_path),
        "--output-dir",
        path_str(temp_dir.path()),
        "file",
        "decrypt",
        "-i",
        path_str(&testdata_path("hello.txt.enc")),
    ]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("invalid token or wrong key"));
    assert!(!temp_dir.path().join("hello.txt").exists());
}

#[test]
fn test_refuses_overwrite_without_force() {
    let temp_dir = TempDir::new().unwrap();
    let key_path = write_key(temp_dir.path());

    let output = run_fernbox(&["keygen", "-o", path_str(&key_path)]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("already exists"));

    let before = fs::read(&key_path).unwrap();
    let output = run_fernbox(&["--force", "keygen", "-o", path_str(&key_path)]);
    assert_success(&output, "keygen --force");
    assert_ne!(fs::read(&key_path).unwrap(), before);
}

#[test]
fn test_shell_session() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_fernbox_with_stdin(
        &["--output-dir", path_str(temp_dir.path()), "shell"],
        "text encrypt hi\nkey generate\nkey export\nkey clear\nkey show\nquit\n",
    );
    assert_success(&output, "shell");

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Error: no key is set"));
    assert!(stdout.contains("New key generated."));
    assert!(stdout.contains("Key cleared from session."));
    assert!(stdout.contains("No key set."));

    let exported = fs::read_to_string(temp_dir.path().join("key.txt")).unwrap();
    assert!(stdout.contains(&exported));
}
