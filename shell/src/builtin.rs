use crate::command::{EXIT_FAILURE, ExitCode};
use crate::env::Environment;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd" or "exit".
    fn name() -> &'static str;

    /// Executes the command, writing normal output to `stdout`.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    /// An `Err` is reported by the dispatcher and recorded as status 1.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

/// Entry point shared by every builtin: argument vector without the name, output
/// stream, error stream, session.
pub(crate) type Builtin =
    fn(&[&str], &mut dyn Write, &mut dyn Write, &mut Environment) -> Result<ExitCode>;

/// Look up a builtin by exact name.
pub(crate) fn match_builtin(name: &str) -> Option<Builtin> {
    let table: [(&str, Builtin); 4] = [
        (Exit::name(), run::<Exit>),
        (Cd::name(), run::<Cd>),
        (Dragon::name(), run::<Dragon>),
        (Rc::name(), run::<Rc>),
    ];
    table
        .into_iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(_, run)| run)
}

fn run<T: BuiltinCommand>(
    args: &[&str],
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
    env: &mut Environment,
) -> Result<ExitCode> {
    match T::from_args(&[T::name()], args) {
        Ok(cmd) => match cmd.execute(stdout, env) {
            Ok(code) => Ok(code),
            Err(e) => {
                writeln!(stderr, "{e:#}")?;
                Ok(EXIT_FAILURE)
            }
        },
        Err(EarlyExit { output, status }) => match status {
            Ok(()) => {
                write!(stdout, "{output}")?;
                Ok(0)
            }
            Err(()) => {
                writeln!(stderr, "{}: {}", T::name(), output.trim_end())?;
                Ok(EXIT_FAILURE)
            }
        },
    }
}

#[derive(FromArgs)]
/// Exit the shell.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        env.should_exit = true;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// Without a target the directory is left unchanged.
pub struct Cd {
    #[argh(positional, greedy)]
    /// directory to switch to; absolute or relative to the current directory.
    pub targets: Vec<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let target = match self.targets.as_slice() {
            [] => return Ok(0),
            [target] => PathBuf::from(target),
            _ => anyhow::bail!("cd: too many arguments"),
        };

        let new_dir = env.resolve(&target);
        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("cd: can't canonicalize {}", new_dir.display()))?;

        env::set_current_dir(&canonical)
            .with_context(|| format!("cd: can't chdir to {}", canonical.display()))?;
        log::debug!("working directory is now {}", canonical.display());
        env.current_dir = canonical;
        Ok(0)
    }
}

const DRAGON: &str = r"
                   __====-_  _-====__
             _--^^^#####//      \\#####^^^--_
          _-^##########// (    ) \\##########^-_
         -############//  |\^^/|  \\############-
       _/############//   (@::@)   \\############\_
      /#############((     \\//     ))#############\
     -###############\\    (oo)    //###############-
    -#################\\  / VV \  //#################-
   -###################\\/      \//###################-
  _#/|##########/\######(   /\   )######/\##########|\#_
  |/ |#/\#/\#/\/  \#/\##\  |  |  /##/\#/  \/\#/\#/\#| \|
  `  |/  V  V  `   V  \#\| |  | |/#/  V   '  V  V  \|  '
     `   `  `      `   / | |  | | \   '      '  '   '
                      (  | |  | |  )
                     __\ | |  | | /__
                    (vvv(VVV)(VVV)vvv)
";

#[derive(FromArgs)]
/// Print the shell's dragon.
pub struct Dragon {}

impl BuiltinCommand for Dragon {
    fn name() -> &'static str {
        "dragon"
    }

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        stdout.write_all(DRAGON.trim_start_matches('\n').as_bytes())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print the exit status of the last command.
pub struct Rc {}

impl BuiltinCommand for Rc {
    fn name() -> &'static str {
        "rc"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        writeln!(stdout, "{}", env.last_status)?;
        Ok(env.last_status)
    }
}
