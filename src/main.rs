mod error;
mod format;
mod parser;
mod scheduler;
mod screen;
mod serialiser;
mod session;
mod srt;

use crate::error::SubpromptError;
use crate::parser::Parser;
use crate::scheduler::{Scheduler, StartPosition};
use crate::screen::{Screen, Terminal};
use crate::session::Session;

use std::io::{self, Read};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    match run() {
        Ok(()) => (),
        Err(err) => {
            eprintln!("An error occurred: {}", err);
            for cause in err.chain().skip(1) {
                eprintln!("    {}", cause);
            }
            std::process::exit(1);
        }
    }
}

#[derive(ClapParser)]
#[command(about = "Play SRT subtitles as a timed teleprompter in the terminal")]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "The file to read from. If not supplied, the subtitles will be read from standard input.",
        default_value = "-"
    )]
    input: String,
    #[arg(
        short,
        long,
        value_name = "HH:MM:SS",
        help = "Start playback at this point of the subtitle timeline.",
        default_value = "00:00:00"
    )]
    start: String,
    #[arg(
        short,
        long,
        value_name = "SECONDS",
        help = "Length of the countdown shown before playback starts.",
        default_value_t = 5
    )]
    countdown: u32,
    #[arg(
        short,
        long,
        help = "Print the parsed subtitles and the start position instead of playing them."
    )]
    list: bool,
    #[arg(short, long, help = "Log every playback transition to standard error.")]
    verbose: bool,
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let start = parser::parse_start_time(&cli.start)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the playback runtime")?;
    runtime.block_on(play(cli, start))
}

fn init_logging(verbose: bool) {
    let default = default_log_filter(verbose);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(io::stderr)
        .init();
}

fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "subprompt=debug"
    } else {
        "subprompt=info"
    }
}

async fn play(cli: Cli, start: Duration) -> Result<()> {
    if cli.list {
        let data = read_input(&cli.input)?;
        let cues = Parser::new()
            .parse(&data)
            .context(format!("Failed to parse SRT file: '{}'", cli.input))?;
        let position = StartPosition::locate(&cues, start)?;
        return serialiser::write_listing(io::stdout().lock(), &cues, &position);
    }

    let mut screen = Terminal::new(io::stdout())?;

    let data = read_input(&cli.input).map_err(|err| report(&mut screen, err))?;

    screen.render("Processing subtitles...")?;
    let cues = Parser::new()
        .parse(&data)
        .map_err(|err| report(&mut screen, err))
        .context(format!("Failed to parse SRT file: '{}'", cli.input))?;
    let position = StartPosition::locate(&cues, start).map_err(|err| report(&mut screen, err))?;
    info!(
        cues = cues.len(),
        index = position.index,
        lead_in_ms = position.lead_in_ms,
        "subtitles processed"
    );
    screen.render("Subtitles processed!")?;

    let mut session = Session::new();
    session.load(Scheduler::new(cues, position, cli.countdown), screen);

    let interrupted = tokio::select! {
        result = session.wait() => {
            result?;
            false
        }
        _ = tokio::signal::ctrl_c() => true,
    };
    if interrupted && session.is_playing() {
        info!("interrupted, stopping playback");
        session.stop().await?;
    }
    Ok(())
}

fn read_input(path: &str) -> Result<String, SubpromptError> {
    if path == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|source| SubpromptError::FileRead {
                path: "<stdin>".to_string(),
                source,
            })?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(path).map_err(|source| SubpromptError::FileRead {
            path: path.to_string(),
            source,
        })
    }
}

/// Shows a short version of `err` on the screen before it is returned.
fn report<S: Screen>(screen: &mut S, err: SubpromptError) -> anyhow::Error {
    if let Err(render_err) = screen.render(err.user_message()) {
        warn!(error = %render_err, "failed to show error on screen");
    }
    err.into()
}
