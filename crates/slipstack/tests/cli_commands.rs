#![cfg(all(unix, feature = "cli"))]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const REFERENCE_WIRE: [u8; 8] = [0xC0, 0x01, 0xDB, 0xDC, 0x02, 0xDB, 0xDD, 0xC0];

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/slipcli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn slipstack() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_slipstack"));
    cmd.arg("--log-level").arg("error");
    cmd
}

fn run_with_stdin(args: &[&str], stdin: &[u8]) -> Output {
    let mut child = slipstack()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("slipstack should start");
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(stdin)
        .expect("stdin should accept input");
    child.wait_with_output().expect("slipstack should finish")
}

fn wait_for_path(path: &Path, timeout: Duration) {
    let start = Instant::now();
    while !path.exists() {
        if start.elapsed() >= timeout {
            panic!("{} did not appear", path.display());
        }
        thread::sleep(Duration::from_millis(25));
    }
}

fn wait_with_timeout(mut child: Child, timeout: Duration) -> Output {
    let start = Instant::now();
    loop {
        if child.try_wait().expect("child status").is_some() {
            return child.wait_with_output().expect("child output");
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            let output = child.wait_with_output().expect("child output");
            panic!(
                "command timed out; stderr: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }
        thread::sleep(Duration::from_millis(25));
    }
}

#[test]
fn encode_writes_reference_frame() {
    let output = run_with_stdin(&["encode"], &[0x01, 0xC0, 0x02, 0xDB]);
    assert!(output.status.success());
    assert_eq!(output.stdout, REFERENCE_WIRE);
}

#[test]
fn encode_data_flag_skips_stdin() {
    let output = slipstack()
        .args(["encode", "--data", "hi"])
        .stdin(Stdio::null())
        .output()
        .expect("encode should run");
    assert!(output.status.success());
    assert_eq!(output.stdout, [0xC0, b'h', b'i', 0xC0]);
}

#[test]
fn decode_prints_packets_as_json() {
    let mut wire = REFERENCE_WIRE.to_vec();
    wire.extend_from_slice(&[0xC0, 0xC0, b'o', b'k', 0xC0]);

    let output = run_with_stdin(&["--format", "json", "decode"], &wire);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);

    let first: serde_json::Value = serde_json::from_str(lines[0]).expect("json line");
    assert_eq!(first["event"], "packet");
    assert_eq!(first["index"], 1);
    assert_eq!(first["size"], 4);
    assert_eq!(first["hex"], "01 c0 02 db");

    let second: serde_json::Value = serde_json::from_str(lines[1]).expect("json line");
    assert_eq!(second["payload"], "ok");
}

#[test]
fn decode_raw_roundtrips_encode() {
    let encoded = run_with_stdin(&["encode"], b"payload with \xC0 and \xDB");
    assert!(encoded.status.success());

    let decoded = run_with_stdin(&["--format", "raw", "decode"], &encoded.stdout);
    assert!(decoded.status.success());
    assert_eq!(decoded.stdout, b"payload with \xC0 and \xDB");
}

#[test]
fn decode_reports_protocol_errors_with_exit_60() {
    let wire = [0xC0, 0x01, 0xDB, 0x41, 0x02, 0xC0];
    let output = run_with_stdin(&["--format", "raw", "decode"], &wire);

    assert_eq!(output.status.code(), Some(60));
    assert_eq!(output.stdout, [0x01, 0x02], "drop policy keeps the frame");

    let output = run_with_stdin(
        &["--format", "raw", "decode", "--escape-policy", "pass-through"],
        &wire,
    );
    assert_eq!(output.stdout, [0x01, 0x41, 0x02]);
}

#[test]
fn send_and_listen_over_fifo() {
    let dir = unique_temp_dir("fifo");
    let fifo = dir.join("packet_pipe");
    let fifo_arg = fifo.to_str().expect("utf-8 path");

    let listener = slipstack()
        .args(["--format", "json", "listen", fifo_arg, "--count", "2"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("listen should start");
    wait_for_path(&fifo, Duration::from_secs(5));

    let sent = slipstack()
        .args(["--format", "json", "send", fifo_arg, "--hex", "01 c0 02 db"])
        .output()
        .expect("send should run");
    assert!(sent.status.success());
    let sent_json: serde_json::Value =
        serde_json::from_slice(&sent.stdout).expect("send prints json");
    assert_eq!(sent_json["transport"], "fifo");
    assert_eq!(sent_json["wire_size"], 8);

    let sent = slipstack()
        .args(["send", fifo_arg, "--data", "second"])
        .output()
        .expect("send should run");
    assert!(sent.status.success());

    let output = wait_with_timeout(listener, Duration::from_secs(10));
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let packets: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert_eq!(packets.len(), 2);
    assert_eq!(packets[0]["hex"], "01 c0 02 db");
    assert_eq!(packets[0]["source"], "fifo");
    assert_eq!(packets[1]["payload"], "second");

    assert!(!fifo.exists(), "listener removes the fifo it created");
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn send_and_listen_over_unix_socket() {
    let dir = unique_temp_dir("uds");
    let sock = dir.join("stack.sock");
    let sock_arg = sock.to_str().expect("utf-8 path");

    let listener = slipstack()
        .args(["--format", "pretty", "listen", sock_arg, "--unix", "--count", "1"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("listen should start");
    wait_for_path(&sock, Duration::from_secs(5));

    let sent = slipstack()
        .args(["--format", "json", "send", sock_arg, "--unix", "--data", "hello"])
        .output()
        .expect("send should run");
    assert!(sent.status.success());

    let output = wait_with_timeout(listener, Duration::from_secs(10));
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("packet #1 size=5 source=unix"));
    assert!(stdout.contains("payload=hello"));

    let _ = std::fs::remove_dir_all(&dir);
}

fn interrupt(child: &Child) {
    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .expect("kill should run");
    assert!(status.success());
}

#[test]
fn ctrl_c_stops_idle_fifo_listener_and_removes_fifo() {
    let dir = unique_temp_dir("sigint-fifo");
    let fifo = dir.join("packet_pipe");

    let listener = slipstack()
        .args(["listen", fifo.to_str().expect("utf-8 path")])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("listen should start");
    wait_for_path(&fifo, Duration::from_secs(5));
    thread::sleep(Duration::from_millis(200));

    interrupt(&listener);
    let output = wait_with_timeout(listener, Duration::from_secs(5));

    assert_eq!(output.status.code(), Some(130));
    assert!(!fifo.exists(), "fifo should be removed after Ctrl-C");
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn ctrl_c_stops_idle_socket_listener() {
    let dir = unique_temp_dir("sigint-uds");
    let sock = dir.join("stack.sock");

    let listener = slipstack()
        .args(["listen", sock.to_str().expect("utf-8 path"), "--unix"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("listen should start");
    wait_for_path(&sock, Duration::from_secs(5));
    thread::sleep(Duration::from_millis(200));

    interrupt(&listener);
    let output = wait_with_timeout(listener, Duration::from_secs(5));

    assert_eq!(output.status.code(), Some(130));
    assert!(output.stdout.is_empty());
    assert!(!sock.exists(), "socket file should be removed after Ctrl-C");
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn send_to_missing_socket_fails() {
    let dir = unique_temp_dir("missing");
    let sock = dir.join("absent.sock");

    let output = slipstack()
        .args(["send", sock.to_str().expect("utf-8 path"), "--unix", "--data", "x"])
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("connect failed"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_prints_package_version() {
    let output = slipstack()
        .arg("version")
        .output()
        .expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("slipstack {}", env!("CARGO_PKG_VERSION")));

    let output = slipstack()
        .args(["version", "--extended"])
        .output()
        .expect("version should run");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("max_handlers=10"));
}
