//! Interactive session
//!
//! Reads one command per line and keeps a single session key across
//! commands. Failures are reported and the loop carries on; only I/O errors
//! on the shell's own streams end it.

use std::io::{self, BufRead, Write};
use std::path::Path;

use tracing::debug;
use zeroize::Zeroizing;

use crate::config::Config;
use crate::error::{ErrorCategory, ErrorKind, FernboxError, Result};
use crate::file_ops;
use crate::key_source::{ConstantKeySource, FileKeySource};
use crate::session::Session;
use crate::workflow::{self, Artifact, Mode, Request};

const HELP: &str = "\
commands:
  key generate           generate a new random key
  key paste <KEY>        use a pasted base64 key
  key load <FILE>        use the key stored in FILE
  key show               print the current key
  key export [FILE]      write the current key (default: key.txt)
  key clear              forget the current key
  text encrypt <TEXT>    encrypt TEXT and print the token
  text decrypt <TOKEN>   decrypt TOKEN and print the text
  text encrypt|decrypt --save <TEXT>
                         also save the result as encrypted.txt/decrypted.txt
  file encrypt <FILE>    write FILE.enc to the output directory
  file decrypt <FILE>    write the decrypted file to the output directory
  help                   show this help
  quit                   end the session (the key is discarded)";

pub struct Shell<'a, W: Write> {
    session: Session,
    config: &'a Config,
    out: W,
}

enum Flow {
    Continue,
    Quit,
}

impl<'a, W: Write> Shell<'a, W> {
    pub fn new(config: &'a Config, out: W) -> Self {
        Self::with_session(Session::new(), config, out)
    }

    /// Start from an existing session, e.g. one whose key came from the
    /// command line.
    pub fn with_session(session: Session, config: &'a Config, out: W) -> Self {
        Self {
            session,
            config,
            out,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Process commands until `quit` or end of input.
    pub fn run<R: BufRead>(&mut self, input: R) -> Result<()> {
        self.print("fernbox session; type `help` for commands")?;
        for line in input.lines() {
            // Lines may carry a pasted key.
            let line = Zeroizing::new(line.map_err(|e| {
                FernboxError::with_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    "failed to read command",
                    e,
                )
            })?);
            match self.execute(&line) {
                Ok(Flow::Quit) => break,
                Ok(Flow::Continue) => {}
                Err(e) => {
                    debug!(kind = ?e.kind, error = %e, "command failed");
                    self.print(&format!("Error: {}", e.user_message()))?;
                }
            }
        }
        self.session.clear_current();
        Ok(())
    }

    fn execute(&mut self, line: &str) -> Result<Flow> {
        let (command, rest) = split_word(line);
        match command {
            "" => {}
            "help" => self.print(HELP)?,
            "quit" | "exit" => return Ok(Flow::Quit),
            "key" => self.key_command(rest)?,
            "text" => {
                let (mode, text) = split_word(rest);
                let mode = parse_mode(mode)?;
                self.text_command(mode, text)?;
            }
            "file" => {
                let (mode, path) = split_word(rest);
                let mode = parse_mode(mode)?;
                self.file_command(mode, path.trim())?;
            }
            other => {
                return Err(FernboxError::new(
                    ErrorCategory::User,
                    ErrorKind::MalformedInput,
                    format!("unknown command `{other}`; type `help`"),
                ));
            }
        }
        Ok(Flow::Continue)
    }

    fn key_command(&mut self, rest: &str) -> Result<()> {
        let (action, arg) = split_word(rest);
        let arg = arg.trim();
        match action {
            "generate" => {
                let exported = self.session.generate().to_base64();
                self.print("New key generated.")?;
                self.print(&exported)?;
            }
            "paste" => {
                let mut source = ConstantKeySource::new(arg.as_bytes().to_vec());
                self.session.load(&mut source)?;
                self.print("Key loaded from pasted text.")?;
            }
            "load" => {
                if arg.is_empty() {
                    return Err(FernboxError::empty_input("choose a key file first"));
                }
                self.session.load(&mut FileKeySource::new(arg))?;
                self.print("Key loaded from file.")?;
            }
            "show" => match self.session.current().map(|key| key.to_base64()) {
                Some(exported) => self.print(&exported)?,
                None => self.print("No key set.")?,
            },
            "export" => {
                let path = if arg.is_empty() {
                    self.config.output_path(workflow::KEY_FILE_NAME)
                } else {
                    Path::new(arg).to_path_buf()
                };
                file_ops::export_key(&self.session, &path, self.config.overwrite)?;
                self.print(&format!("Key written to {}.", path.display()))?;
            }
            "clear" => {
                self.session.clear_current();
                self.print("Key cleared from session.")?;
            }
            other => {
                return Err(FernboxError::new(
                    ErrorCategory::User,
                    ErrorKind::MalformedInput,
                    format!("unknown key action `{other}`; type `help`"),
                ));
            }
        }
        Ok(())
    }

    fn text_command(&mut self, mode: Mode, text: &str) -> Result<()> {
        let (save, text) = match split_word(text) {
            ("--save", rest) => (true, rest),
            _ => (false, text),
        };
        let artifact = workflow::run(
            &self.session,
            Request::Text {
                mode,
                text: text.to_string(),
            },
        )?;
        self.print(artifact.as_text().unwrap_or_default())?;
        if save {
            let written = file_ops::save_artifact(&artifact, self.config)?;
            self.print(&format!("Saved to {}.", written.display()))?;
        }
        Ok(())
    }

    fn file_command(&mut self, mode: Mode, path: &str) -> Result<()> {
        // An empty path is handed to the workflow as "no upload" so the
        // missing-key check still comes first.
        let upload = if path.is_empty() || self.session.current().is_none() {
            None
        } else {
            Some(file_ops::read_upload(Path::new(path))?)
        };
        let artifact: Artifact = workflow::run(&self.session, Request::File { mode, upload })?;
        let written = file_ops::save_artifact(&artifact, self.config)?;
        let done = match mode {
            Mode::Encrypt => "File encrypted",
            Mode::Decrypt => "File decrypted",
        };
        self.print(&format!("{done}: {}", written.display()))
    }

    fn print(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{line}").map_err(write_error)
    }
}

fn write_error(e: io::Error) -> FernboxError {
    FernboxError::with_source(
        ErrorCategory::Internal,
        ErrorKind::Io,
        "failed to write output",
        e,
    )
}

fn parse_mode(word: &str) -> Result<Mode> {
    match word {
        "encrypt" | "e" => Ok(Mode::Encrypt),
        "decrypt" | "d" => Ok(Mode::Decrypt),
        other => Err(FernboxError::new(
            ErrorCategory::User,
            ErrorKind::MalformedInput,
            format!("expected `encrypt` or `decrypt`, got `{other}`"),
        )),
    }
}

/// Split off the first whitespace-delimited word; the remainder keeps its
/// inner spacing.
fn split_word(line: &str) -> (&str, &str) {
    let line = line.trim_start();
    match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (line.trim_end(), ""),
    }
}
