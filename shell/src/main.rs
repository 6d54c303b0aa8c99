use argh::FromArgs;
use dsh::{Config, Interpreter, logging};
use log::LevelFilter;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(FromArgs)]
/// A small shell that runs pipelines of external programs.
struct Args {
    /// configuration file merged over the built-in defaults
    /// (default: ~/.config/dsh/config.toml when present)
    #[argh(option)]
    config: Option<PathBuf>,

    /// run a single line and exit with its status
    #[argh(option, short = 'c')]
    command: Option<String>,

    /// log verbosity: off, error, warn, info, debug or trace
    #[argh(option)]
    log_level: Option<LevelFilter>,
}

fn main() -> ExitCode {
    let args: Args = argh::from_env();

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("dsh: {e:#}");
            return ExitCode::from(2);
        }
    };
    logging::init(args.log_level.unwrap_or_else(|| config.settings.level_filter()));

    let mut sh = Interpreter::new(config);
    match args.command {
        Some(line) => {
            let status = sh.handle_line(&line);
            ExitCode::from(u8::try_from(status).unwrap_or(1))
        }
        None => match sh.repl() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("dsh: {e:#}");
                ExitCode::FAILURE
            }
        },
    }
}
