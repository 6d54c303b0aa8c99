use dsh::Config;
use dsh::command::EXIT_NOT_FOUND;
use dsh::parser::{ParsingError, parse_line};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

fn dsh(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_dsh"));
    cmd.current_dir(dir).env("HOME", dir);
    cmd
}

fn run_c(dir: &Path, line: &str) -> Output {
    dsh(dir).args(["-c", line]).output().unwrap()
}

fn status_for(line: &str) -> i32 {
    let dir = TempDir::new().unwrap();
    run_c(dir.path(), line).status.code().unwrap()
}

macro_rules! status_test {
    ($name:ident, $line:expr, $status:expr) => {
        #[test]
        fn $name() {
            assert_eq!(status_for($line), $status, "line: {}", $line);
        }
    };
}

// ── Exit status of the last stage ──

status_test!(status_true, "true", 0);
status_test!(status_false, "false", 1);
status_test!(status_false_then_true, "false | true", 0);
status_test!(status_true_then_false, "true | false", 1);
status_test!(status_explicit_code, r#"sh -c "exit 7""#, 7);
status_test!(status_not_found, "definitely_not_a_real_cmd123", EXIT_NOT_FOUND);
status_test!(status_not_found_last, "echo hi | definitely_not_a_real_cmd123", EXIT_NOT_FOUND);
status_test!(status_killed, r#"sh -c "kill -9 $$""#, 137);
status_test!(status_empty_segments_skipped, "true | | false |", 1);

// ── Parse errors ──

status_test!(status_redirect_without_command, "< in.txt", 2);
status_test!(status_missing_output_file, "echo hi >", 2);
status_test!(status_two_inputs, "cat < a < b", 2);

// ── Builtins ──

status_test!(status_exit, "exit", 0);
status_test!(status_cd_too_many, "cd / /tmp", 1);

#[test]
fn output_flows_through_pipeline() {
    let dir = TempDir::new().unwrap();
    let out = run_c(dir.path(), r#"printf "c\na\nb\n" | sort | head -n 2"#);
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "a\nb\n");
}

#[test]
fn append_keeps_previous_content() {
    let dir = TempDir::new().unwrap();
    run_c(dir.path(), "echo one > log.txt");
    run_c(dir.path(), "echo two | cat >> log.txt");
    assert_eq!(
        fs::read_to_string(dir.path().join("log.txt")).unwrap(),
        "one\ntwo\n"
    );
}

#[test]
fn too_many_commands_launches_nothing() {
    let dir = TempDir::new().unwrap();
    let line = (0..9)
        .map(|i| format!("touch f{i}"))
        .collect::<Vec<_>>()
        .join(" | ");

    let out = run_c(dir.path(), &line);

    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("piping limited to 8 commands"));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn empty_line_warns() {
    let dir = TempDir::new().unwrap();
    let out = run_c(dir.path(), "   ");
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("warning: no commands provided"));
}

#[test]
fn not_found_is_reported() {
    let dir = TempDir::new().unwrap();
    let out = run_c(dir.path(), "definitely_not_a_real_cmd123 arg");
    assert_eq!(
        String::from_utf8_lossy(&out.stderr),
        "definitely_not_a_real_cmd123: command not found\n"
    );
}

#[test]
fn config_limits_apply() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("dsh.toml");
    fs::write(&config, "[limits]\nmax_commands = 2\n").unwrap();

    let out = dsh(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["-c", "true | true | true"])
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("piping limited to 2 commands"));
}

#[test]
fn bad_config_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("dsh.toml");
    fs::write(&config, "[limits]\nmax_args = 0\n").unwrap();

    let out = dsh(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["-c", "true"])
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("max_args"));
}

#[test]
fn session_reads_lines_until_exit() {
    let dir = TempDir::new().unwrap();
    let mut child = dsh(dir.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"echo first > a.txt\nexit\necho never > b.txt\n")
        .unwrap();
    let out = child.wait_with_output().unwrap();

    assert!(out.status.success());
    assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "first\n");
    assert!(!dir.path().join("b.txt").exists());
}

#[test]
fn session_ends_at_end_of_input() {
    let dir = TempDir::new().unwrap();
    let mut child = dsh(dir.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    child.stdin.take().unwrap().write_all(b"false\n").unwrap();
    assert!(child.wait().unwrap().success());
}

#[test]
fn library_parse_errors_are_typed() {
    let config = Config::default();
    let err = parse_line("cat <", &config.limits).unwrap_err();
    assert!(matches!(err, ParsingError::MissingInputFile));

    let pipeline = parse_line(r#"grep "a | b" < in.txt | wc -l"#, &config.limits)
        .unwrap()
        .unwrap();
    assert_eq!(pipeline.len(), 2);
    assert_eq!(pipeline.commands()[0].args(), &["a | b".to_string()]);
}
