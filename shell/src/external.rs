use crate::command::{
    EXIT_FAILURE, EXIT_NOT_EXECUTABLE, EXIT_NOT_FOUND, ExitCode, ParsedCommand,
};
use crate::env::Environment;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

/// Why a program could not be started.
///
/// Everything except [`LaunchError::Spawn`] is local to one command: it is reported,
/// recorded as that command's status, and the rest of the line carries on.
#[derive(Debug)]
pub enum LaunchError {
    NotFound,
    PermissionDenied,
    /// A redirection target could not be opened.
    Redirect { path: PathBuf, source: io::Error },
    /// The program image could not be replaced for another reason.
    Exec(io::Error),
    /// The system refused to create the process or its pipes.
    Spawn(io::Error),
}

impl LaunchError {
    /// Status recorded for the command that failed to start.
    pub fn status(&self) -> ExitCode {
        match self {
            LaunchError::NotFound => EXIT_NOT_FOUND,
            LaunchError::PermissionDenied => EXIT_NOT_EXECUTABLE,
            LaunchError::Redirect { .. } | LaunchError::Exec(_) | LaunchError::Spawn(_) => {
                EXIT_FAILURE
            }
        }
    }

    /// `true` when no further process should be started for this line.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LaunchError::Spawn(_))
    }

    fn from_spawn(e: io::Error) -> Self {
        match e.kind() {
            ErrorKind::NotFound => LaunchError::NotFound,
            ErrorKind::PermissionDenied => LaunchError::PermissionDenied,
            ErrorKind::WouldBlock | ErrorKind::OutOfMemory => LaunchError::Spawn(e),
            _ => LaunchError::Exec(e),
        }
    }
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchError::NotFound => write!(f, "command not found"),
            LaunchError::PermissionDenied => write!(f, "permission denied"),
            LaunchError::Redirect { path, source } => {
                write!(f, "{}: {}", path.display(), source)
            }
            LaunchError::Exec(e) => write!(f, "exec failed: {e}"),
            LaunchError::Spawn(e) => write!(f, "can't create process: {e}"),
        }
    }
}

impl std::error::Error for LaunchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LaunchError::Redirect { source, .. } => Some(source),
            LaunchError::Exec(e) | LaunchError::Spawn(e) => Some(e),
            _ => None,
        }
    }
}

/// Open an input redirection target read-only.
pub fn open_input(env: &Environment, path: &Path) -> Result<File, LaunchError> {
    let resolved = env.resolve(path);
    File::open(&resolved).map_err(|source| LaunchError::Redirect {
        path: path.to_path_buf(),
        source,
    })
}

/// Open an output redirection target write-only, creating it with mode 0644.
///
/// The file is truncated unless `append` is set.
pub fn open_output(env: &Environment, path: &Path, append: bool) -> Result<File, LaunchError> {
    let mut options = OpenOptions::new();
    options.create(true);
    if append {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    options
        .open(env.resolve(path))
        .map_err(|source| LaunchError::Redirect {
            path: path.to_path_buf(),
            source,
        })
}

/// Locate the executable for `program` as seen from the session.
///
/// A bare name is searched in the session's `PATH`; any other relative path is
/// anchored at the session's working directory.
pub fn resolve_program(env: &Environment, program: &str) -> Option<PathBuf> {
    let path = Path::new(program);
    let anchored = if path.components().nth(1).is_some() {
        env.resolve(path)
    } else {
        path.to_path_buf()
    };
    let search_paths = env.get_var("PATH").unwrap_or_default();
    find_command_path(&search_paths, &anchored).map(Cow::into_owned)
}

/// Start `cmd` with the given standard streams.
///
/// The program is looked up first so that a missing program is reported without
/// creating a process.
pub fn spawn(
    cmd: &ParsedCommand,
    env: &Environment,
    stdin: Stdio,
    stdout: Stdio,
) -> Result<Child, LaunchError> {
    let executable = resolve_program(env, cmd.program()).ok_or(LaunchError::NotFound)?;
    log::debug!("resolved {} to {}", cmd.program(), executable.display());

    let mut process = Command::new(&executable);
    process
        .args(cmd.args())
        .stdin(stdin)
        .stdout(stdout)
        .env_clear()
        .envs(&env.vars)
        .current_dir(&env.current_dir);
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        process.arg0(cmd.program());
    }

    let child = process.spawn().map_err(LaunchError::from_spawn)?;
    log::debug!("started {} as pid {}", cmd.program(), child.id());
    Ok(child)
}

/// Run a single command with its own redirections and wait for it.
///
/// Launch failures that only concern this command are written to `stderr` and turned
/// into a status; only [`LaunchError::Spawn`] is returned as an error.
pub fn launch(
    cmd: &ParsedCommand,
    env: &Environment,
    stderr: &mut dyn Write,
) -> Result<ExitCode, LaunchError> {
    match start(cmd, env) {
        Ok(mut child) => Ok(wait(cmd, &mut child)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            report(stderr, cmd, &e);
            Ok(e.status())
        }
    }
}

fn start(cmd: &ParsedCommand, env: &Environment) -> Result<Child, LaunchError> {
    let stdin = match &cmd.input_file {
        Some(path) => Stdio::from(open_input(env, path)?),
        None => Stdio::inherit(),
    };
    let stdout = match &cmd.output_file {
        Some(path) => Stdio::from(open_output(env, path, cmd.append)?),
        None => Stdio::inherit(),
    };
    spawn(cmd, env, stdin, stdout)
}

/// Block until `child` exits and convert its status.
pub fn wait(cmd: &ParsedCommand, child: &mut Child) -> ExitCode {
    match child.wait() {
        Ok(status) => {
            let code = exit_code(status);
            log::debug!("pid {} ({}) exited with {}", child.id(), cmd.program(), code);
            code
        }
        Err(e) => {
            log::error!("can't wait for pid {} ({}): {}", child.id(), cmd.program(), e);
            EXIT_FAILURE
        }
    }
}

/// Write the diagnostic for a failed launch.
pub fn report(stderr: &mut dyn Write, cmd: &ParsedCommand, e: &LaunchError) {
    let _ = writeln!(stderr, "{}: {}", cmd.program(), e);
}

pub fn exit_code(exit_status: ExitStatus) -> ExitCode {
    match exit_status.code() {
        Some(x) => x,
        None => terminated_by_signal(exit_status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it exists.
/// - Relative with multiple components (e.g., `bin/sh`): returns it if it exists.
/// - `./foo` on Unix or any `./`-prefixed path on other platforms: returns it if it exists.
/// - Single path component (no separators): search each directory in `search_paths` (PATH)
///   and return the first existing match.
/// - Empty path: returns `None`.
///
/// Returns either a borrowed reference to the provided `path` or an owned `PathBuf`
/// when the result is discovered via PATH lookup.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let search_in_current_dir = cfg!(not(unix)) || path.starts_with("./");
    if search_in_current_dir && path.exists() {
        return Some(Cow::Borrowed(path));
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, None) => None,
        (Some(x), None) => find_in_path(search_paths, x.as_os_str()).map(Cow::Owned),
        _ => find_by_path(path).map(Cow::Borrowed),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(cmd))
        .find(|path| path.is_file())
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}
