//! End-to-end tests running the built `countersign` binary.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};
use tempfile::TempDir;

const PASSWORD_VAR: &str = "COUNTERSIGN_TEST_PASSWORD";
const PASSWORD: &str = "correct horse battery staple";

struct Workspace {
    dir: TempDir,
}

struct Run {
    code: i32,
    stdout: String,
    stderr: String,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        // Cheap Argon2 so the tests stay fast.
        std::fs::write(
            dir.path().join("countersign.toml"),
            "[kdf]\nmemory_kib = 1024\niterations = 1\nparallelism = 1\n",
        )
        .unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn command(&self) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_countersign"));
        command
            .env("COUNTERSIGN_CONFIG", self.path("countersign.toml"))
            .env("COUNTERSIGN_KEY_DIR", self.path("keys"))
            .env("COUNTERSIGN_AUDIT_JOURNAL", self.path("audit.csa"))
            .env(PASSWORD_VAR, PASSWORD)
            .env_remove("RUST_LOG");
        command
    }

    fn run(&self, args: &[&str]) -> Run {
        let output = self
            .command()
            .args(args)
            .output()
            .expect("Failed to execute CLI");
        Run {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8(output.stdout).unwrap(),
            stderr: String::from_utf8(output.stderr).unwrap(),
        }
    }

    fn write_json(&self, name: &str, value: &Value) -> String {
        let path = self.path(name);
        std::fs::write(&path, serde_json::to_vec(value).unwrap()).unwrap();
        path.to_string_lossy().to_string()
    }

    fn provision(&self, user: &str) {
        let run = self.run(&["provision", user, "--password-env", PASSWORD_VAR]);
        assert_eq!(run.code, 0, "provision failed: {}", run.stderr);
    }

    fn sign(&self, user: &str, payload: &str) -> String {
        let run = self.run(&["sign", user, payload, "--password-env", PASSWORD_VAR]);
        assert_eq!(run.code, 0, "sign failed: {}", run.stderr);
        run.stdout.trim().to_string()
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

fn purchase(timestamp: i64) -> Value {
    json!({
        "productId": "sku-123",
        "amount": 19.99,
        "quantity": 1,
        "timestamp": timestamp
    })
}

#[test]
fn canonicalize_sorts_keys() {
    let ws = Workspace::new();
    let input = ws.write_json(
        "payload.json",
        &json!({"timestamp": 1700000000000_i64, "amount": 199.98, "productId": "sku-123"}),
    );
    let run = ws.run(&["canonicalize", &input]);
    assert_eq!(run.code, 0, "{}", run.stderr);
    assert_eq!(
        run.stdout.trim_end(),
        r#"{"amount":199.98,"productId":"sku-123","timestamp":1700000000000}"#
    );
}

#[test]
fn provision_then_show_public_key() {
    let ws = Workspace::new();
    let run = ws.run(&["provision", "alice", "--password-env", PASSWORD_VAR]);
    assert_eq!(run.code, 0, "{}", run.stderr);
    let provisioned: Value = serde_json::from_str(&run.stdout).unwrap();
    assert_eq!(provisioned["algorithm"], "ES256");
    assert_eq!(provisioned["publicKey"]["kty"], "EC");
    assert!(provisioned["publicKey"].get("d").is_none());

    let run = ws.run(&["public-key", "alice"]);
    assert_eq!(run.code, 0, "{}", run.stderr);
    let jwk: Value = serde_json::from_str(&run.stdout).unwrap();
    assert_eq!(jwk, provisioned["publicKey"]);

    let again = ws.run(&["provision", "alice", "--password-env", PASSWORD_VAR]);
    assert_eq!(again.code, 1);
    assert!(again.stderr.contains("already exist"));
}

#[test]
fn provision_reads_secret_from_stdin() {
    let ws = Workspace::new();
    let mut child = ws
        .command()
        .args(["provision", "bob", "--password-stdin"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(format!("{PASSWORD}\n").as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    // The same secret unlocks the key through the env var route.
    let payload = ws.write_json("p.json", &purchase(now_ms()));
    ws.sign("bob", &payload);
}

#[test]
fn missing_secret_is_an_error() {
    let ws = Workspace::new();
    let run = ws.run(&["provision", "carol"]);
    assert_eq!(run.code, 1);
    assert!(run.stderr.contains("--password-env"));
}

#[test]
fn sign_and_verify() {
    let ws = Workspace::new();
    ws.provision("alice");
    let payload = ws.write_json("payload.json", &purchase(now_ms()));
    let signature = ws.sign("alice", &payload);

    let jwk = ws.run(&["public-key", "alice"]).stdout;
    std::fs::write(ws.path("alice.jwk"), jwk).unwrap();
    let jwk_path = ws.path("alice.jwk").to_string_lossy().to_string();

    let run = ws.run(&["verify", "--public-key", &jwk_path, "--signature", &signature, &payload]);
    assert_eq!(run.code, 0, "{}", run.stderr);
    assert_eq!(run.stdout.trim(), "valid");

    let mut tampered = purchase(now_ms());
    tampered["amount"] = json!(0.01);
    let tampered = ws.write_json("tampered.json", &tampered);
    let run = ws.run(&["verify", "--public-key", &jwk_path, "--signature", &signature, &tampered]);
    assert_eq!(run.code, 1);
    assert_eq!(run.stdout.trim(), "invalid");
}

#[test]
fn wrong_password_is_a_decryption_error() {
    let ws = Workspace::new();
    ws.provision("alice");
    let payload = ws.write_json("payload.json", &purchase(now_ms()));
    let output = ws
        .command()
        .env(PASSWORD_VAR, "not the password")
        .args(["sign", "alice", &payload, "--password-env", PASSWORD_VAR])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("DecryptionError"));
}

#[test]
fn authorize_fresh_and_stale_payloads() {
    let ws = Workspace::new();
    ws.provision("alice");

    let fresh = ws.write_json("fresh.json", &purchase(now_ms()));
    let signature = ws.sign("alice", &fresh);
    let run = ws.run(&[
        "authorize",
        "alice",
        "--signature",
        &signature,
        &fresh,
        "--client-ip",
        "198.51.100.4",
    ]);
    assert_eq!(run.code, 0, "{}", run.stderr);
    let outcome: Value = serde_json::from_str(&run.stdout).unwrap();
    assert_eq!(outcome["authorized"], true);
    assert_eq!(outcome["payload"]["productId"], "sku-123");
    assert_eq!(outcome["receipt"]["purchaseId"], 1);

    let stale = ws.write_json("stale.json", &purchase(now_ms() - 10_000));
    let signature = ws.sign("alice", &stale);
    let run = ws.run(&["authorize", "alice", "--signature", &signature, &stale]);
    assert_eq!(run.code, 2);
    let outcome: Value = serde_json::from_str(&run.stdout).unwrap();
    assert_eq!(outcome, json!({"authorized": false, "reason": "ExpiredError"}));
}

#[test]
fn authorize_unknown_user() {
    let ws = Workspace::new();
    ws.provision("alice");
    let payload = ws.write_json("payload.json", &purchase(now_ms()));
    let signature = ws.sign("alice", &payload);

    let run = ws.run(&["authorize", "mallory", "--signature", &signature, &payload]);
    assert_eq!(run.code, 2);
    let outcome: Value = serde_json::from_str(&run.stdout).unwrap();
    assert_eq!(outcome["reason"], "NoKeyError");
}

#[test]
fn audit_lists_and_verifies_the_journal() {
    let ws = Workspace::new();
    ws.provision("alice");
    let payload = ws.write_json("payload.json", &purchase(now_ms()));
    let signature = ws.sign("alice", &payload);
    let run = ws.run(&["authorize", "alice", "--signature", &signature, &payload]);
    assert_eq!(run.code, 0, "{}", run.stderr);

    let run = ws.run(&["audit", "--json", "--user", "alice"]);
    assert_eq!(run.code, 0, "{}", run.stderr);
    let actions: Vec<String> = run
        .stdout
        .lines()
        .map(|line| {
            let record: Value = serde_json::from_str(line).unwrap();
            record["entry"]["action"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(
        actions,
        vec![
            "KEYS_PROVISIONED",
            "PAYLOAD_SIGNED",
            "PURCHASE_RECEIVED",
            "PURCHASE_TIMESTAMP_CHECKED",
            "PURCHASE_KEY_LOADED",
            "PURCHASE_SIGNATURE_VERIFIED",
            "PURCHASE_SUCCESS",
        ]
    );

    let run = ws.run(&["audit", "--action", "PURCHASE_SUCCESS"]);
    assert_eq!(run.code, 0, "{}", run.stderr);
    assert!(run.stdout.contains("ACTION"));
    assert_eq!(run.stdout.matches("PURCHASE_SUCCESS").count(), 1);

    let run = ws.run(&["audit", "--verify-chain"]);
    assert_eq!(run.code, 0, "{}", run.stderr);
    assert!(run.stdout.contains("chain intact: 7 records"));
}

#[test]
fn tampered_journal_fails_chain_check() {
    let ws = Workspace::new();
    ws.provision("alice");
    ws.provision("bob");

    let path = ws.path("audit.csa");
    let mut bytes = std::fs::read(&path).unwrap();
    let needle = b"alice";
    let pos = bytes
        .windows(needle.len())
        .position(|w| w == needle)
        .unwrap();
    bytes[pos..pos + needle.len()].copy_from_slice(b"alicf");
    std::fs::write(&path, bytes).unwrap();

    let run = ws.run(&["audit", "--verify-chain"]);
    assert_eq!(run.code, 1);
    assert!(run.stderr.contains("broken at record 0"));
}
