use crate::command::ExitCode;
use std::collections::HashMap;
use std::env as stdenv;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Shell-session state shared by the builtin dispatcher and the process launcher.
///
/// The environment contains:
/// - `vars`: environment variables handed to every spawned program.
/// - `current_dir`: the working directory for command execution and redirection targets.
/// - `last_status`: exit status of the most recently completed command or pipeline.
/// - `should_exit`: set by the `exit` builtin; the loop driver stops when it sees it.
#[derive(Debug, Clone)]
pub struct Environment {
    pub vars: HashMap<OsString, OsString>,
    pub current_dir: PathBuf,
    pub last_status: ExitCode,
    pub should_exit: bool,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    pub fn new() -> Self {
        let vars = stdenv::vars_os().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars,
            current_dir,
            last_status: 0,
            should_exit: false,
        }
    }

    /// Get the value of an environment variable.
    ///
    /// Looks up the key in `self.vars` first, falling back to the process environment.
    pub fn get_var(&self, key: &str) -> Option<OsString> {
        self.vars
            .get(OsStr::new(key))
            .cloned()
            .or_else(|| stdenv::var_os(key))
    }

    /// Resolve `path` against the session's working directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.current_dir.join(path)
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::env::Environment;
    use std::collections::HashMap;
    use std::env as stdenv;
    use std::ffi::OsString;
    use std::path::{Path, PathBuf};

    #[test]
    fn test_env_get_var() {
        let mut vars = HashMap::new();
        vars.insert(OsString::from("KEY"), OsString::from("VALUE"));
        let env = Environment {
            vars,
            current_dir: stdenv::current_dir().unwrap(),
            last_status: 0,
            should_exit: false,
        };

        assert_eq!(env.get_var("KEY"), Some(OsString::from("VALUE")));
        assert_eq!(env.get_var("SOME_RANDOM_ENV_VAR_12345"), None);
    }

    #[test]
    fn test_env_reads_from_process_env() {
        let env = Environment::new();
        assert!(env.vars.contains_key(&OsString::from("PATH")));
        assert_eq!(env.vars.len(), stdenv::vars_os().count());
        assert_eq!(env.last_status, 0);
        assert!(!env.should_exit);
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let env = Environment {
            vars: HashMap::new(),
            current_dir: PathBuf::from("/work"),
            last_status: 0,
            should_exit: false,
        };

        assert_eq!(env.resolve(Path::new("out.txt")), PathBuf::from("/work/out.txt"));
        assert_eq!(env.resolve(Path::new("/tmp/in.txt")), PathBuf::from("/tmp/in.txt"));
    }
}
