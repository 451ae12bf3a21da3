//! File encryption/decryption operations
//!
//! This module connects the workflow to the filesystem: it reads uploads,
//! runs them through `workflow::run`, and writes the resulting artifacts.

use crate::config::Config;
use crate::error::{ErrorCategory, ErrorKind, FernboxError, Result};
use crate::session::Session;
use crate::workflow::{self, Artifact, Mode, Request, Upload};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Read a file into an `Upload` named after its final path component
pub fn read_upload(path: &Path) -> Result<Upload> {
    let contents = fs::read(path).map_err(|e| read_error(path, e))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Upload::new(name, contents))
}

/// Encrypt a file with the session key
///
/// The artifact is written to `output_path` if given, otherwise to
/// `<output dir>/<name>.enc`. Returns the path written.
pub fn encrypt_file(
    session: &Session,
    input_path: &Path,
    output_path: Option<&Path>,
    config: &Config,
) -> Result<PathBuf> {
    process_file(session, Mode::Encrypt, input_path, output_path, config)
}

/// Decrypt a file with the session key
///
/// The artifact is written to `output_path` if given, otherwise to the output
/// dir under the name with `.enc` stripped (or `decrypted.bin`).
pub fn decrypt_file(
    session: &Session,
    input_path: &Path,
    output_path: Option<&Path>,
    config: &Config,
) -> Result<PathBuf> {
    process_file(session, Mode::Decrypt, input_path, output_path, config)
}

fn process_file(
    session: &Session,
    mode: Mode,
    input_path: &Path,
    output_path: Option<&Path>,
    config: &Config,
) -> Result<PathBuf> {
    // Fail on a missing key before touching the input.
    session.require_current()?;
    let upload = read_upload(input_path)?;
    let artifact = workflow::run(
        session,
        Request::File {
            mode,
            upload: Some(upload),
        },
    )
    .map_err(|e| e.with_context(format!("failed to {} {}", mode, input_path.display())))?;

    let target = match output_path {
        Some(path) => path.to_path_buf(),
        None => config.output_path(&artifact.file_name),
    };
    write_file_secure(&target, &artifact.contents, config.overwrite)?;
    info!(path = %target.display(), "wrote {} output", mode);
    Ok(target)
}

/// Save an artifact into the configured output directory
pub fn save_artifact(artifact: &Artifact, config: &Config) -> Result<PathBuf> {
    let target = config.output_path(&artifact.file_name);
    write_file_secure(&target, &artifact.contents, config.overwrite)?;
    Ok(target)
}

/// Export the session key as a key file
///
/// Writes exactly the base64 key, with no trailing newline.
pub fn export_key(session: &Session, path: &Path, overwrite: bool) -> Result<()> {
    let key = session.require_current()?;
    let artifact = workflow::key_artifact(key);
    write_file_secure(path, &artifact.contents, overwrite)?;
    info!(path = %path.display(), "exported key");
    Ok(())
}

/// Write a file atomically with secure permissions (0o600 on Unix)
///
/// Contents go to a tempfile next to `path` which is synced and then renamed
/// into place, so readers never observe a partial file. Unless `overwrite`
/// is set an existing file is left alone and an error returned.
pub fn write_file_secure(path: &Path, contents: &[u8], overwrite: bool) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    if !overwrite && path.exists() {
        return Err(FernboxError::new(
            ErrorCategory::User,
            ErrorKind::Io,
            format!("{} already exists; use --force to overwrite", path.display()),
        ));
    }

    let mut temp_file = tempfile::Builder::new()
        .prefix(".fernbox-tmp")
        .tempfile_in(dir)
        .map_err(|e| {
            io_error(
                ErrorCategory::User,
                format!("failed to create tempfile in {}", dir.display()),
                e,
            )
        })?;

    temp_file
        .write_all(contents)
        .map_err(|e| io_error(ErrorCategory::Internal, "failed to write to tempfile", e))?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file
        .flush()
        .map_err(|e| io_error(ErrorCategory::Internal, "failed to flush tempfile", e))?;
    temp_file.as_file().sync_all().map_err(|e| {
        io_error(
            ErrorCategory::Internal,
            "failed to sync file prior to rename",
            e,
        )
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| {
                io_error(
                    ErrorCategory::Internal,
                    "failed to set tempfile permissions",
                    e,
                )
            })?;
    }

    let persisted = if overwrite {
        temp_file.persist(path)
    } else {
        temp_file.persist_noclobber(path)
    };
    persisted.map_err(|e| {
        io_error(
            ErrorCategory::Internal,
            format!("failed to rename to target file {}", path.display()),
            e.error,
        )
    })?;
    Ok(())
}

fn io_error(category: ErrorCategory, msg: impl Into<String>, err: io::Error) -> FernboxError {
    FernboxError::with_source(category, ErrorKind::Io, msg, err)
}

fn read_error(path: &Path, err: io::Error) -> FernboxError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    io_error(category, format!("failed to read from {}", path.display()), err)
}
