//! fernbox CLI - key-based text and file encryption
//!
//! Each invocation is its own session: the key is read from the source named
//! on the command line, used, and wiped when the process exits.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::io;
use std::path::PathBuf;
use std::process;
use tracing::debug;

use fernbox::config::Config;
use fernbox::error::{ErrorCategory, ErrorKind, FernboxError, Result};
use fernbox::file_ops;
use fernbox::key_source::{FileKeySource, KeySource, ReaderKeySource, TerminalKeySource};
use fernbox::logging;
use fernbox::session::Session;
use fernbox::shell::Shell;
use fernbox::workflow::{self, Mode, Request};

#[derive(Parser)]
#[command(name = "fernbox")]
#[command(version)]
#[command(about = "Key-based text and file encryption.", long_about = None)]
struct Cli {
    /// Read the key from FILE, e.g. an exported key.txt
    #[arg(long, global = true, value_name = "FILE", env = "FERNBOX_KEY_FILE")]
    key_file: Option<PathBuf>,

    /// Read the key from stdin
    #[arg(long, global = true)]
    key_stdin: bool,

    /// Paste the key at a terminal prompt (input is not echoed)
    #[arg(long, global = true)]
    key_paste: bool,

    /// Directory output files are written to
    #[arg(
        long,
        global = true,
        value_name = "DIR",
        env = "FERNBOX_OUTPUT_DIR",
        default_value = "."
    )]
    output_dir: PathBuf,

    /// Overwrite existing output files
    #[arg(long, global = true)]
    force: bool,

    /// Log more to stderr (-v for info, -vv for debug); FERNBOX_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new random key
    #[command(alias = "k")]
    Keygen {
        /// Write the key to FILE instead of printing it
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Encrypt or decrypt short text
    #[command(alias = "t")]
    Text {
        #[arg(value_enum)]
        mode: ModeArg,

        /// Text to encrypt, or token to decrypt
        text: String,

        /// Also save the result as encrypted.txt / decrypted.txt
        #[arg(long)]
        save: bool,
    },

    /// Encrypt or decrypt a file
    #[command(alias = "f")]
    File {
        #[arg(value_enum)]
        mode: ModeArg,

        /// Path to the file to encrypt or decrypt
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to write to (default: conventional name in the output dir)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Start an interactive session that keeps a key between commands
    Shell,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Encrypt,
    Decrypt,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Encrypt => Mode::Encrypt,
            ModeArg::Decrypt => Mode::Decrypt,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli) {
        debug!(kind = ?e.kind, error = ?e, "command failed");
        eprintln!("Error: {}", e.user_message());
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::new(cli.output_dir.clone(), cli.force);

    match cli.command {
        Commands::Keygen { ref output } => {
            let mut session = Session::new();
            session.generate();
            match output {
                Some(path) => {
                    file_ops::export_key(&session, path, config.overwrite)?;
                    eprintln!("key written to {}", path.display());
                }
                None => {
                    let key = session.require_current()?;
                    println!("{}", key.to_base64().as_str());
                }
            }
        }
        Commands::Text { mode, ref text, save } => {
            let session = load_session(&cli)?;
            let artifact = workflow::run(
                &session,
                Request::Text {
                    mode: mode.into(),
                    text: text.clone(),
                },
            )?;
            println!("{}", artifact.as_text().unwrap_or_default());
            if save {
                let path = file_ops::save_artifact(&artifact, &config)?;
                eprintln!("saved to {}", path.display());
            }
        }
        Commands::File {
            mode,
            ref input,
            ref output,
        } => {
            let session = load_session(&cli)?;
            let written = match Mode::from(mode) {
                Mode::Encrypt => file_ops::encrypt_file(&session, input, output.as_deref(), &config)?,
                Mode::Decrypt => file_ops::decrypt_file(&session, input, output.as_deref(), &config)?,
            };
            eprintln!("wrote {}", written.display());
        }
        Commands::Shell => {
            if cli.key_stdin {
                return Err(FernboxError::new(
                    ErrorCategory::User,
                    ErrorKind::KeyUnavailable,
                    "--key-stdin cannot be combined with shell, which reads commands from stdin",
                ));
            }
            let session = load_session(&cli)?;
            Shell::with_session(session, &config, io::stdout().lock()).run(io::stdin().lock())?;
        }
    }
    Ok(())
}

/// Build the session for this invocation from the key options.
///
/// Without any key option the session stays empty and keyed operations fail
/// with `MissingKey`.
fn load_session(cli: &Cli) -> Result<Session> {
    let mut session = Session::new();
    if let Some(mut source) = key_source(cli) {
        session.load(&mut *source)?;
    }
    Ok(session)
}

fn key_source(cli: &Cli) -> Option<Box<dyn KeySource>> {
    let source: Box<dyn KeySource> = if cli.key_paste {
        Box::new(TerminalKeySource::new())
    } else if cli.key_stdin {
        Box::new(ReaderKeySource::new(Box::new(io::stdin())))
    } else {
        Box::new(FileKeySource::new(cli.key_file.as_ref()?))
    };
    Some(source)
}
