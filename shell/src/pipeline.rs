//! N-stage pipeline launcher.
//!
//! Every stage is started left to right with its standard input connected to the
//! previous stage's output pipe. The parent keeps exactly one pipe end at a time: the
//! read end produced by the stage it just started, which is moved into the next stage
//! and closed in the parent as soon as that stage has been spawned. Pipe ends are
//! created close-on-exec, so a child never holds descriptors that belong to another
//! stage and readers always observe end-of-stream.

use crate::command::{EXIT_FAILURE, ExitCode, ParsedCommand, Pipeline};
use crate::env::Environment;
use crate::external::{self, LaunchError};
use std::io::Write;
use std::process::{Child, ChildStdout, Stdio};

enum Stage<'a> {
    Running(&'a ParsedCommand, Child),
    Failed(ExitCode),
}

/// Run every stage of `pipeline` and wait for all of them.
///
/// The returned status is the status of the last stage. A stage that cannot be started
/// is reported and recorded with its own status while the remaining stages still run,
/// reading end-of-file in place of its output. Only a [`LaunchError::Spawn`] stops
/// further stages from being created; the children started before it are still waited
/// for before the error is returned.
pub fn run(
    pipeline: &Pipeline,
    env: &Environment,
    stderr: &mut dyn Write,
) -> Result<ExitCode, LaunchError> {
    let commands = pipeline.commands();
    let last = commands.len() - 1;
    let mut stages: Vec<Stage> = Vec::with_capacity(commands.len());
    let mut previous: Option<ChildStdout> = None;
    let mut aborted: Option<LaunchError> = None;

    for (i, cmd) in commands.iter().enumerate() {
        match start_stage(cmd, i, last, previous.take(), env) {
            Ok(mut child) => {
                if i < last {
                    previous = child.stdout.take();
                }
                stages.push(Stage::Running(cmd, child));
            }
            Err(e) if e.is_fatal() => {
                external::report(stderr, cmd, &e);
                aborted = Some(e);
                break;
            }
            Err(e) => {
                external::report(stderr, cmd, &e);
                stages.push(Stage::Failed(e.status()));
            }
        }
    }
    drop(previous);

    let mut status = EXIT_FAILURE;
    for stage in stages.iter_mut() {
        status = match stage {
            Stage::Running(cmd, child) => external::wait(*cmd, child),
            Stage::Failed(code) => *code,
        };
    }

    match aborted {
        Some(e) => Err(e),
        None => Ok(status),
    }
}

fn start_stage(
    cmd: &ParsedCommand,
    i: usize,
    last: usize,
    previous: Option<ChildStdout>,
    env: &Environment,
) -> Result<Child, LaunchError> {
    if i > 0 && cmd.input_file.is_some() {
        log::warn!("{}: input redirection ignored inside a pipeline", cmd.program());
    }
    if i < last && cmd.output_file.is_some() {
        log::warn!("{}: output redirection ignored inside a pipeline", cmd.program());
    }

    let stdin = if i == 0 {
        match &cmd.input_file {
            Some(path) => Stdio::from(external::open_input(env, path)?),
            None => Stdio::inherit(),
        }
    } else {
        previous.map(Stdio::from).unwrap_or_else(Stdio::null)
    };

    let stdout = if i < last {
        Stdio::piped()
    } else {
        match &cmd.output_file {
            Some(path) => Stdio::from(external::open_output(env, path, cmd.append)?),
            None => Stdio::inherit(),
        }
    };

    external::spawn(cmd, env, stdin, stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;
    use crate::parser::parse_line;
    use crate::test_support::env_in;
    use std::fs;
    use tempfile::TempDir;

    fn run_line(line: &str, env: &Environment) -> (ExitCode, String) {
        let pipeline = parse_line(line, &Limits::default()).unwrap().unwrap();
        let mut stderr = Vec::new();
        let code = run(&pipeline, env, &mut stderr).unwrap();
        (code, String::from_utf8(stderr).unwrap())
    }

    #[test]
    fn status_is_last_stage() {
        let dir = TempDir::new().unwrap();
        let env = env_in(dir.path());

        assert_eq!(run_line("false | true", &env).0, 0);
        assert_eq!(run_line("true | false", &env).0, 1);
    }

    #[test]
    fn data_flows_through_stages() {
        let dir = TempDir::new().unwrap();
        let env = env_in(dir.path());

        let (code, stderr) = run_line(r#"printf "b\na\nb\n" | sort | uniq > out.txt"#, &env);
        assert_eq!(code, 0, "stderr: {stderr}");
        assert_eq!(fs::read_to_string(dir.path().join("out.txt")).unwrap(), "a\nb\n");
    }

    #[test]
    fn ends_honor_redirections() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("in.txt"), "one\ntwo\nthree\n").unwrap();
        let env = env_in(dir.path());

        let (code, _) = run_line("cat < in.txt | grep t | wc -l >> count.txt", &env);
        assert_eq!(code, 0);
        let (code, _) = run_line("cat < in.txt | grep o | wc -l >> count.txt", &env);
        assert_eq!(code, 0);

        let content = fs::read_to_string(dir.path().join("count.txt")).unwrap();
        let counts: Vec<&str> = content.split_whitespace().collect();
        assert_eq!(counts, vec!["2", "2"]);
    }

    #[test]
    fn intermediate_output_redirection_is_ignored() {
        let dir = TempDir::new().unwrap();
        let env = env_in(dir.path());

        let (code, _) = run_line("echo hi > lost.txt | cat > kept.txt", &env);
        assert_eq!(code, 0);
        assert!(!dir.path().join("lost.txt").exists());
        assert_eq!(fs::read_to_string(dir.path().join("kept.txt")).unwrap(), "hi\n");
    }

    #[test]
    fn missing_stage_does_not_stop_the_rest() {
        let dir = TempDir::new().unwrap();
        let env = env_in(dir.path());

        let (code, stderr) = run_line("definitely_not_a_real_cmd123 | wc -c > out.txt", &env);
        assert_eq!(code, 0);
        assert_eq!(stderr, "definitely_not_a_real_cmd123: command not found\n");
        assert_eq!(fs::read_to_string(dir.path().join("out.txt")).unwrap().trim(), "0");

        let (code, _) = run_line("echo hi | definitely_not_a_real_cmd123", &env);
        assert_eq!(code, crate::command::EXIT_NOT_FOUND);
    }

    #[test]
    fn large_output_does_not_hang() {
        let dir = TempDir::new().unwrap();
        let env = env_in(dir.path());

        let (code, _) = run_line("seq 1 200000 | tail -n 1 > out.txt", &env);
        assert_eq!(code, 0);
        assert_eq!(fs::read_to_string(dir.path().join("out.txt")).unwrap(), "200000\n");
    }

    #[test]
    fn reader_exiting_early_does_not_hang() {
        let dir = TempDir::new().unwrap();
        let env = env_in(dir.path());

        let (code, _) = run_line("yes | head -n 3 > out.txt", &env);
        assert_eq!(code, 0);
        assert_eq!(fs::read_to_string(dir.path().join("out.txt")).unwrap(), "y\ny\ny\n");
    }
}
