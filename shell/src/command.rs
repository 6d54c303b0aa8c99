use std::path::PathBuf;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Status recorded when the program of a command cannot be found.
pub const EXIT_NOT_FOUND: ExitCode = 127;

/// Status recorded when the program exists but cannot be executed.
pub const EXIT_NOT_EXECUTABLE: ExitCode = 126;

/// Status recorded for any other launch failure (bad redirection target, exec error).
pub const EXIT_FAILURE: ExitCode = 1;

/// Status recorded when a line cannot be parsed.
pub const EXIT_PARSE_ERROR: ExitCode = 2;

/// One stage of a pipeline, already tokenized and stripped of redirection operators.
///
/// `arguments[0]` is always the program name, so the vector can be handed to the
/// operating system as-is. Filenames are owned by the command and released when the
/// command is dropped at the end of the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    arguments: Vec<String>,
    /// Target of `<`, if any.
    pub input_file: Option<PathBuf>,
    /// Target of `>` or `>>`, if any.
    pub output_file: Option<PathBuf>,
    /// `true` only when the output operator was `>>`.
    pub append: bool,
}

impl ParsedCommand {
    /// Build a command without redirections.
    ///
    /// Returns `None` for an empty argument vector: such a command does not exist.
    pub fn new(arguments: Vec<String>) -> Option<Self> {
        if arguments.is_empty() {
            return None;
        }
        Some(Self {
            arguments,
            input_file: None,
            output_file: None,
            append: false,
        })
    }

    /// The executable name or path.
    pub fn program(&self) -> &str {
        &self.arguments[0]
    }

    /// Full argument vector, program included.
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Arguments that follow the program name.
    pub fn args(&self) -> &[String] {
        &self.arguments[1..]
    }
}

/// Ordered, non-empty sequence of commands connected by `|`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    commands: Vec<ParsedCommand>,
}

impl Pipeline {
    /// Returns `None` when `commands` is empty.
    pub fn new(commands: Vec<ParsedCommand>) -> Option<Self> {
        if commands.is_empty() {
            None
        } else {
            Some(Self { commands })
        }
    }

    pub fn commands(&self) -> &[ParsedCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// `true` when the pipeline holds no commands; a constructed pipeline never does.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// The only command of a single-stage pipeline.
    pub fn single(&self) -> Option<&ParsedCommand> {
        match self.commands.as_slice() {
            [command] => Some(command),
            _ => None,
        }
    }
}
