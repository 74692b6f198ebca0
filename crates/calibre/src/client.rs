//! The calibredb wrapper itself.
//!
//! [`CalibreClient`] owns the resolved executable and library paths plus the
//! serialized [`CommandRunner`], and composes the command builder, runner,
//! and output classifier per operation. It holds no other state; every call
//! is one command, one execution, one typed result.

use crate::cmdline::{self, CommandLine};
use crate::consts;
use crate::error::{ErrorKind, Result};
use crate::models::{AutomergePolicy, Book};
use crate::outcome::{self, AddOutcome};
use crate::runner::{CommandRunner, Execution};
use std::path::{Path, PathBuf};

/// Calibre content-server credentials, attached to every invocation.
#[derive(Debug, Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

/// Wrapper around one calibredb executable and one library.
///
/// Safe to share across threads; all invocations serialize on an internal
/// lock because calibredb rejects any concurrent access to its storage.
#[derive(Debug)]
pub struct CalibreClient {
    calibredb: PathBuf,
    library: PathBuf,
    credentials: Option<Credentials>,
    runner: CommandRunner,
}

impl CalibreClient {
    /// Build a client for the given executable and library paths.
    ///
    /// Paths are resolved to absolute form once, here; they are not checked
    /// for existence until [`check`](Self::check) or the first invocation.
    pub fn new(calibredb: impl AsRef<Path>, library: impl AsRef<Path>) -> Self {
        Self {
            calibredb: absolute(calibredb),
            library: absolute(library),
            credentials: None,
            runner: CommandRunner::new(),
        }
    }

    /// Attach content-server credentials. Ignored unless both parts are
    /// non-empty, mirroring calibredb's own all-or-nothing flag pair.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        let (username, password) = (username.into(), password.into());
        if !username.is_empty() && !password.is_empty() {
            self.credentials = Some(Credentials { username, password });
        }
        self
    }

    /// Verify the executable resolves and the library holds a `metadata.db`.
    ///
    /// Decoupled from construction so a client can be built from config
    /// before its environment is ready.
    pub fn check(&self) -> Result<()> {
        if which::which(&self.calibredb).is_err() {
            exn::bail!(ErrorKind::ExecutableNotFound(self.calibredb.clone()));
        }
        if !self.library.join("metadata.db").exists() {
            exn::bail!(ErrorKind::LibraryNotFound(self.library.clone()));
        }
        Ok(())
    }

    /// Report the calibredb version, if it can be parsed.
    ///
    /// A version string that doesn't match the expected shape is logged and
    /// reported as `None`, never an error.
    pub fn version(&self) -> Result<Option<String>> {
        let mut cmd = CommandLine::new(&self.calibredb);
        cmd.arg("--version");
        let execution = self.runner.run(&cmd)?;
        match consts::CALIBRE_VERSION.captures(&execution.stdout).and_then(|caps| caps.get(1)) {
            Some(version) => Ok(Some(version.as_str().to_string())),
            None => {
                tracing::error!(stdout = %execution.stdout, "failed to parse calibredb version");
                Ok(None)
            },
        }
    }

    /// Fetch a single book by id, or `None` when it does not exist.
    pub fn book(&self, id: u64) -> Result<Option<Book>> {
        validate_id(id)?;
        let mut cmd = self.base();
        cmd.arg("list")
            .arg("--for-machine")
            .arg("--fields=all")
            .arg(format!("--search=id:{id}"))
            .arg("--limit=1");
        let execution = self.runner.run(&cmd)?;
        let mut books = decode_books(&cmd, &execution)?;
        // The list subcommand always returns an array; with the id filter it
        // should hold exactly one element, but we check just in case.
        match books.len() {
            1 => Ok(books.pop()),
            _ => Ok(None),
        }
    }

    /// List up to `limit` books. `limit` must be greater than zero.
    pub fn books(&self, limit: u64) -> Result<Vec<Book>> {
        if limit == 0 {
            exn::bail!(ErrorKind::InvalidInput { what: "limit", value: limit.to_string() });
        }
        let mut cmd = self.base();
        cmd.arg("list").arg("--for-machine").arg("--fields=all").arg(format!("--limit={limit}"));
        let execution = self.runner.run(&cmd)?;
        decode_books(&cmd, &execution)
    }

    /// Add a book file, with optional metadata, to the library.
    ///
    /// Returns the ids of the added or merged records. An add can merge into
    /// several existing books at once, so more than one id is possible.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::AlreadyExists`] when calibredb refuses the duplicate
    /// under the active automerge policy; the caller may retry with
    /// [`AutomergePolicy::Overwrite`].
    pub fn add_book(
        &self,
        path: impl AsRef<Path>,
        book: Option<&Book>,
        automerge: AutomergePolicy,
    ) -> Result<Vec<u64>> {
        let path = path.as_ref();
        if !path.exists() {
            exn::bail!(ErrorKind::FileNotFound(path.to_path_buf()));
        }
        let mut cmd = self.base();
        cmd.arg("add").arg(path.display().to_string());
        self.run_add(cmd, book, automerge)
    }

    /// Add an empty book (no formats) to the library.
    pub fn add_empty(&self, book: Option<&Book>, automerge: AutomergePolicy) -> Result<Vec<u64>> {
        let mut cmd = self.base();
        cmd.arg("add").arg("--empty");
        self.run_add(cmd, book, automerge)
    }

    /// Remove books by id.
    ///
    /// calibredb succeeds silently when some ids do not exist; that
    /// behaviour is preserved here, not treated as an error.
    pub fn remove(&self, ids: &[u64], permanent: bool) -> Result<()> {
        if ids.is_empty() {
            exn::bail!(ErrorKind::InvalidInput { what: "ids", value: "empty list".to_string() });
        }
        let joined = ids.iter().map(u64::to_string).collect::<Vec<_>>().join(",");
        let mut cmd = self.base();
        cmd.arg("remove").arg(joined);
        if permanent {
            cmd.switch("permanent");
        }
        self.runner.run(&cmd)?;
        Ok(())
    }

    /// Add a format file to an existing book.
    ///
    /// With `replace` unset an existing format of the same type is kept;
    /// `as_data_file` stores the file as extra data instead of a format.
    pub fn add_format(&self, id: u64, file: impl AsRef<Path>, replace: bool, as_data_file: bool) -> Result<()> {
        validate_id(id)?;
        let file = file.as_ref();
        if !file.exists() {
            exn::bail!(ErrorKind::FileNotFound(file.to_path_buf()));
        }
        let mut cmd = self.base();
        cmd.arg("add_format");
        if !replace {
            cmd.switch("dont-replace");
        }
        if as_data_file {
            cmd.switch("as-extra-data-file");
        }
        cmd.arg(id.to_string()).arg(file.display().to_string());
        self.runner.run(&cmd)?;
        Ok(())
    }

    /// Remove a format (e.g. `EPUB`) from an existing book.
    pub fn remove_format(&self, id: u64, format: &str) -> Result<()> {
        validate_id(id)?;
        let mut cmd = self.base();
        cmd.arg("remove_format").arg(id.to_string()).arg(format.trim().to_uppercase());
        self.runner.run(&cmd)?;
        Ok(())
    }

    /// Return a book's metadata as an OPF document.
    pub fn show_metadata(&self, id: u64) -> Result<String> {
        validate_id(id)?;
        let mut cmd = self.base();
        cmd.arg("show_metadata").arg("--as-opf").arg(id.to_string());
        let execution = self.runner.run(&cmd)?;
        Ok(execution.stdout)
    }

    /// Update a book's metadata from a record or an OPF file.
    ///
    /// Exactly one metadata source must be supplied. Returns `Ok(None)` when
    /// the target book does not exist (a sentinel, not an error), and
    /// `Ok(Some(id))` after the update runs.
    ///
    /// calibredb's set_metadata output gives no way to confirm the change
    /// was applied, so success is reported optimistically.
    pub fn set_metadata(&self, id: u64, book: Option<&Book>, opf: Option<&Path>) -> Result<Option<u64>> {
        validate_id(id)?;
        if book.is_some() == opf.is_some() {
            exn::bail!(ErrorKind::InvalidInput {
                what: "metadata source",
                value: "exactly one of record or OPF file required".to_string(),
            });
        }
        if self.book(id)?.is_none() {
            return Ok(None);
        }

        let mut cmd = self.base();
        cmd.arg("set_metadata").arg(id.to_string());
        if let Some(opf) = opf {
            if !opf.exists() {
                exn::bail!(ErrorKind::FileNotFound(opf.to_path_buf()));
            }
            cmd.arg(opf.display().to_string());
        } else {
            cmdline::append_update_flags(&mut cmd, book);
        }
        self.runner.run(&cmd)?;
        Ok(Some(id))
    }

    /// The shared prefix of every library-addressing command.
    fn base(&self) -> CommandLine {
        let mut cmd = CommandLine::new(&self.calibredb);
        cmd.flag("with-library", self.library.display().to_string());
        if let Some(credentials) = &self.credentials {
            cmd.flag("username", &credentials.username);
            cmd.flag("password", &credentials.password);
        }
        cmd
    }

    /// Shared tail of the add operations: policy flag, metadata flags,
    /// execution, classification.
    fn run_add(&self, mut cmd: CommandLine, book: Option<&Book>, automerge: AutomergePolicy) -> Result<Vec<u64>> {
        cmd.arg(format!("--automerge={automerge}"));
        cmdline::append_add_flags(&mut cmd, book);
        let execution = self.runner.run(&cmd)?;

        match outcome::classify(&execution.stdout, &execution.stderr) {
            Some(AddOutcome::Conflict(existing)) => {
                tracing::info!(books = %existing, "books already exist, ignoring");
                exn::bail!(ErrorKind::AlreadyExists(format!(
                    "Book {existing} already exists. Include automerge=overwrite to overwrite."
                )));
            },
            Some(AddOutcome::Added(ids)) | Some(AddOutcome::Merged(ids)) if !ids.is_empty() => Ok(ids),
            // A structural match with no ids means calibredb reported a
            // success it cannot have had. Treat it like unparsable output.
            Some(AddOutcome::Added(_)) | Some(AddOutcome::Merged(_)) | None => {
                tracing::error!(
                    command = %cmd,
                    stdout = %execution.stdout,
                    stderr = %execution.stderr,
                    "could not interpret calibredb add output",
                );
                exn::bail!(ErrorKind::UnexpectedOutput);
            },
        }
    }
}

fn validate_id(id: u64) -> Result<()> {
    // Ids start at 1; zero is the "unset" marker on Book.
    if id == 0 {
        exn::bail!(ErrorKind::InvalidInput { what: "id", value: id.to_string() });
    }
    Ok(())
}

fn decode_books(cmd: &CommandLine, execution: &Execution) -> Result<Vec<Book>> {
    match serde_json::from_str(&execution.stdout) {
        Ok(books) => Ok(books),
        Err(err) => {
            tracing::error!(
                command = %cmd,
                stdout = %execution.stdout,
                stderr = %execution.stderr,
                error = %err,
                "could not decode calibredb list output",
            );
            exn::bail!(ErrorKind::UnexpectedOutput);
        },
    }
}

fn absolute(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
