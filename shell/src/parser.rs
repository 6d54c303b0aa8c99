use crate::command::{ParsedCommand, Pipeline};
use crate::config::Limits;
use crate::lexer::{self, LexingError, Token};
use std::fmt;
use std::path::PathBuf;

const PIPE: char = '|';
const INPUT_REDIRECT: &str = "<";
const OUTPUT_REDIRECT: &str = ">";
const APPEND_REDIRECT: &str = ">>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    Lexing(LexingError),
    MissingInputFile,
    MissingOutputFile { operator: &'static str },
    MultipleInputRedirection,
    MultipleOutputRedirection,
    /// Only redirections were given, no program.
    MissingCommand,
    CommandTooLong { limit: usize },
    TooManyCommands { limit: usize },
}

impl fmt::Display for ParsingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsingError::Lexing(e) => write!(f, "{e}"),
            ParsingError::MissingInputFile => {
                write!(f, "redirect: missing input file for redirection")
            }
            ParsingError::MissingOutputFile { operator } => {
                write!(f, "redirect: missing output file for redirection '{operator}'")
            }
            ParsingError::MultipleInputRedirection => {
                write!(f, "redirect: multiple input redirection operators")
            }
            ParsingError::MultipleOutputRedirection => {
                write!(f, "redirect: multiple output redirection operators")
            }
            ParsingError::MissingCommand => write!(f, "redirect: no command to redirect"),
            ParsingError::CommandTooLong { limit } => {
                write!(f, "command longer than {limit} characters")
            }
            ParsingError::TooManyCommands { limit } => {
                write!(f, "piping limited to {limit} commands")
            }
        }
    }
}

impl std::error::Error for ParsingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParsingError::Lexing(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LexingError> for ParsingError {
    fn from(e: LexingError) -> Self {
        ParsingError::Lexing(e)
    }
}

/// Operator a bare token stands for, if any.
fn operator(token: &Token) -> Option<&'static str> {
    if token.quoted {
        return None;
    }
    match token.text.as_str() {
        INPUT_REDIRECT => Some(INPUT_REDIRECT),
        OUTPUT_REDIRECT => Some(OUTPUT_REDIRECT),
        APPEND_REDIRECT => Some(APPEND_REDIRECT),
        _ => None,
    }
}

/// Remove `<`, `>` and `>>` together with their filename operands.
///
/// Surviving arguments keep their relative order. Each target may be set once;
/// a second operator of the same direction is an error rather than an overwrite.
pub fn extract_redirections(tokens: Vec<Token>) -> Result<ParsedCommand, ParsingError> {
    let mut arguments = Vec::with_capacity(tokens.len());
    let mut input_file: Option<PathBuf> = None;
    let mut output_file: Option<PathBuf> = None;
    let mut append = false;

    let mut tokens = tokens.into_iter().peekable();
    while let Some(token) = tokens.next() {
        let Some(op) = operator(&token) else {
            arguments.push(token.text);
            continue;
        };

        let target = tokens.next_if(|next| operator(next).is_none());
        if op == INPUT_REDIRECT {
            let target = target.ok_or(ParsingError::MissingInputFile)?;
            if input_file.is_some() {
                return Err(ParsingError::MultipleInputRedirection);
            }
            input_file = Some(PathBuf::from(target.text));
        } else {
            let target = target.ok_or(ParsingError::MissingOutputFile { operator: op })?;
            if output_file.is_some() {
                return Err(ParsingError::MultipleOutputRedirection);
            }
            output_file = Some(PathBuf::from(target.text));
            append = op == APPEND_REDIRECT;
        }
    }

    let mut command = ParsedCommand::new(arguments).ok_or(ParsingError::MissingCommand)?;
    command.input_file = input_file;
    command.output_file = output_file;
    command.append = append;
    Ok(command)
}

/// Split `line` on `|`, ignoring pipes inside a double-quoted span.
fn split_segments(line: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut in_quote = false;
    let mut start = 0;
    for (i, ch) in line.char_indices() {
        match ch {
            '"' => in_quote = !in_quote,
            PIPE if !in_quote => {
                segments.push(&line[start..i]);
                start = i + ch.len_utf8();
            }
            _ => {}
        }
    }
    segments.push(&line[start..]);
    segments
}

/// Parse one segment into a command, or `None` if it holds no tokens at all.
pub fn parse_command(segment: &str, limits: &Limits) -> Result<Option<ParsedCommand>, ParsingError> {
    if segment.chars().count() > limits.max_command_len {
        return Err(ParsingError::CommandTooLong {
            limit: limits.max_command_len,
        });
    }
    let tokens = lexer::split_into_tokens(segment, limits.max_token_len, limits.max_args)?;
    if tokens.is_empty() {
        return Ok(None);
    }
    extract_redirections(tokens).map(Some)
}

/// Parse a full input line into a pipeline.
///
/// Returns `Ok(None)` when the line holds no commands (blank, whitespace or pipes only).
/// The stage limit is checked before a segment is parsed, so an over-long line fails
/// with [`ParsingError::TooManyCommands`] whatever its extra segments contain. Any
/// failing segment aborts the whole line; commands built so far are dropped.
pub fn parse_line(line: &str, limits: &Limits) -> Result<Option<Pipeline>, ParsingError> {
    let mut commands = Vec::new();
    for segment in split_segments(line) {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        if commands.len() >= limits.max_commands {
            return Err(ParsingError::TooManyCommands {
                limit: limits.max_commands,
            });
        }
        if let Some(command) = parse_command(segment, limits)? {
            commands.push(command);
        }
    }
    Ok(Pipeline::new(commands))
}
