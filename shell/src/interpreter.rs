use crate::builtin::{self, Builtin};
use crate::command::{EXIT_FAILURE, EXIT_PARSE_ERROR, ExitCode, ParsedCommand, Pipeline};
use crate::config::Config;
use crate::env::Environment;
use crate::external;
use crate::parser;
use crate::pipeline;
use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, Write};

/// A minimal shell that runs pipelines of external programs and a few builtins.
///
/// The interpreter owns the session state ([`Environment`]): working directory,
/// variables passed to children and the status of the last command.
///
/// Example
/// ```
/// use dsh::Interpreter;
/// let mut sh = Interpreter::default();
/// let code = sh.execute_line("true | false").unwrap();
/// assert_eq!(code, Some(1));
/// assert_eq!(sh.env().last_status, 1);
/// ```
pub struct Interpreter {
    env: Environment,
    config: Config,
}

impl Interpreter {
    /// Create an interpreter for the current process environment.
    pub fn new(config: Config) -> Self {
        Self::with_environment(config, Environment::new())
    }

    pub fn with_environment(config: Config, env: Environment) -> Self {
        Self { env, config }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run a single command invocation by name with arguments, without parsing.
    pub fn run(&mut self, name: &str, args: &[&str]) -> Result<ExitCode> {
        if name.is_empty() {
            anyhow::bail!("empty command name");
        }
        let argv = std::iter::once(name)
            .chain(args.iter().copied())
            .map(str::to_string)
            .collect();
        let pipeline = ParsedCommand::new(argv)
            .and_then(|cmd| Pipeline::new(vec![cmd]))
            .ok_or_else(|| anyhow::anyhow!("empty command"))?;
        self.execute(&pipeline, &mut io::stdout(), &mut io::stderr())
    }

    /// Parse and execute one input line.
    ///
    /// Returns `Ok(None)` when the line holds no commands, in which case the last
    /// status is left as it was. Parse errors are returned as [`parser::ParsingError`]
    /// and record status 2.
    pub fn execute_line(&mut self, line: &str) -> Result<Option<ExitCode>> {
        self.execute_line_with_output(line, &mut io::stdout(), &mut io::stderr())
    }

    /// Like [`Interpreter::execute_line`], with builtin output and diagnostics sent to
    /// the given streams. External programs still inherit the process streams.
    pub fn execute_line_with_output(
        &mut self,
        line: &str,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> Result<Option<ExitCode>> {
        let pipeline = match parser::parse_line(line, &self.config.limits) {
            Ok(Some(pipeline)) => pipeline,
            Ok(None) => return Ok(None),
            Err(e) => {
                self.env.last_status = EXIT_PARSE_ERROR;
                return Err(e.into());
            }
        };
        log::debug!("parsed {} stage(s): {:?}", pipeline.len(), pipeline);
        self.execute(&pipeline, stdout, stderr).map(Some)
    }

    fn execute(
        &mut self,
        pipeline: &Pipeline,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> Result<ExitCode> {
        let result = match pipeline.single() {
            Some(cmd) => match builtin::match_builtin(cmd.program()) {
                Some(builtin) => self.run_builtin(builtin, cmd, stdout, stderr),
                None => external::launch(cmd, &self.env, stderr).map_err(Into::into),
            },
            None => pipeline::run(pipeline, &self.env, stderr).map_err(Into::into),
        };
        self.env.last_status = match &result {
            Ok(code) => *code,
            Err(_) => EXIT_FAILURE,
        };
        result
    }

    /// Builtins honor an output redirection; an input redirection is only checked.
    fn run_builtin(
        &mut self,
        builtin: Builtin,
        cmd: &ParsedCommand,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> Result<ExitCode> {
        if let Some(path) = &cmd.input_file {
            if let Err(e) = external::open_input(&self.env, path) {
                external::report(stderr, cmd, &e);
                return Ok(e.status());
            }
        }

        let args: Vec<&str> = cmd.args().iter().map(String::as_str).collect();
        let code = match &cmd.output_file {
            Some(path) => match external::open_output(&self.env, path, cmd.append) {
                Ok(mut file) => builtin(&args, &mut file, stderr, &mut self.env)?,
                Err(e) => {
                    external::report(stderr, cmd, &e);
                    e.status()
                }
            },
            None => builtin(&args, stdout, stderr, &mut self.env)?,
        };
        stdout.flush()?;
        Ok(code)
    }

    /// Execute `line` and write any failure to stderr.
    ///
    /// Returns the last exit status afterwards.
    pub fn handle_line(&mut self, line: &str) -> ExitCode {
        let mut stderr = io::stderr();
        match self.execute_line(line) {
            Ok(Some(_)) => {}
            Ok(None) => {
                let _ = writeln!(stderr, "warning: no commands provided");
            }
            Err(e) => {
                let _ = writeln!(stderr, "error: {e:#}");
            }
        }
        self.env.last_status
    }

    /// Read-Eval-Print Loop.
    ///
    /// Stops on end of input or the `exit` builtin.
    pub fn repl(&mut self) -> Result<()> {
        let mut rl = DefaultEditor::new()?;

        while !self.env.should_exit {
            match rl.readline(&self.config.settings.prompt) {
                Ok(line) => {
                    if line.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line.as_str())?;
                    self.handle_line(&line);
                }
                Err(err) => {
                    if !keep_prompting(err)? {
                        break;
                    }
                }
            }
        }

        Ok(())
    }
}

/// Decide what the loop does after a failed read: `Ok(true)` shows a fresh prompt.
///
/// Ctrl-C only discards the line being edited; end of input ends the session.
fn keep_prompting(err: ReadlineError) -> Result<bool> {
    match err {
        ReadlineError::Interrupted => {
            log::debug!("line discarded");
            Ok(true)
        }
        ReadlineError::Eof => {
            println!();
            Ok(false)
        }
        err => Err(err.into()),
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the embedded default configuration.
    fn default() -> Self {
        Self::new(Config::default())
    }
}
