use std::io::Write;
use std::process::{Command, Output, Stdio};

use tempfile::NamedTempFile;

fn asm_file(src: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(src.as_bytes()).expect("write assembly");
    file
}

/// run the interpreter binary on `src`, feeding `stdin` to the guest
fn run_binary(src: &str, stdin: &str) -> Output {
    let file = asm_file(src);
    let mut child = Command::new(env!("CARGO_BIN_EXE_riscv-interp"))
        .arg(file.path())
        .arg("--mem-mib")
        .arg("4")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn interpreter");
    child
        .stdin
        .take()
        .expect("stdin handle")
        .write_all(stdin.as_bytes())
        .expect("feed stdin");
    child.wait_with_output().expect("wait for interpreter")
}

#[test]
fn return_value_becomes_exit_code() {
    let out = run_binary("main: li a0, 5\n li a1, 7\n add a0, a0, a1\n ret", "");
    assert_eq!(out.status.code(), Some(12));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Program exited with 12"), "stderr: {stderr}");
}

#[test]
fn program_output_goes_to_stdout() {
    let src = ".data\nx: .word 42\n.text\nmain:\n la a0, x\n lw a0, 0(a0)\n call putint\n li a0, 0\n ret";
    let out = run_binary(src, "");
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "42\n");
}

#[test]
fn guest_reads_from_stdin() {
    let src = "main:\n call getint\n add a0, a0, a0\n call putint\n li a0, 0\n ret";
    let out = run_binary(src, "21\n");
    assert_eq!(String::from_utf8_lossy(&out.stdout), "42\n");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Input integer for getint:"), "stderr: {stderr}");
}

#[test]
fn memory_beyond_the_address_space_is_rejected() {
    let file = asm_file("main: ret");
    let out = Command::new(env!("CARGO_BIN_EXE_riscv-interp"))
        .arg(file.path())
        .arg("--mem-mib")
        .arg("3072")
        .output()
        .expect("run interpreter");
    assert_eq!(out.status.code(), Some(2));
    assert!(out.stdout.is_empty());
}

#[test]
fn faults_fail_the_process() {
    let out = run_binary("main:\n call missingFunc\n ret", "");
    assert_eq!(out.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("[Runtime Error] Function missingFunc not found"));
}
