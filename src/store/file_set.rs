//! Registry file set and the atomic swap.
//!
//! Three sibling files live in the registry directory:
//!
//! - `productregistry`: last committed registry
//! - `productregistry.bak`: previous committed registry
//! - `productregistry.new`: scratch file for a pending write
//!
//! A commit streams the whole registry into the scratch file and syncs it.
//! The previous current is then linked (or copied) to a staging name and
//! renamed over the backup, and scratch is renamed over current. Current is
//! replaced by that single rename and never goes missing: readers that opened
//! it before the rename keep reading the old inode, later readers see the new
//! file.

use crate::error::{RegistryError, Result};
use crate::store::xml::TagWriter;
use crate::types::AccessMode;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

pub const CURRENT_FILE: &str = "productregistry";
pub const BACKUP_FILE: &str = "productregistry.bak";
pub const SCRATCH_FILE: &str = "productregistry.new";
/// Staging name the backup is prepared under before it replaces `.bak`.
pub const BACKUP_STAGING_FILE: &str = "productregistry.bak.new";

/// Default registry directory on an installed system.
pub const DEFAULT_REGISTRY_DIR: &str = "/var/sadm/install";

/// Default permissions for committed registry files (rw-r--r--).
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Paths of the three registry files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryFiles {
    base_dir: PathBuf,
    dir: PathBuf,
    current: PathBuf,
    backup: PathBuf,
    scratch: PathBuf,
    file_mode: u32,
}

impl RegistryFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            base_dir: dir.clone(),
            current: dir.join(CURRENT_FILE),
            backup: dir.join(BACKUP_FILE),
            scratch: dir.join(SCRATCH_FILE),
            file_mode: DEFAULT_FILE_MODE,
            dir,
        }
    }

    /// Registry directory `dir` as seen under the image mounted at `root`.
    pub fn with_alternate_root(root: &Path, dir: &Path) -> Self {
        let mut files = Self::new(dir);
        files.set_alternate_root(Some(root));
        files
    }

    /// Place the file set under `root` (or back at its configured directory
    /// for `None`).
    pub fn set_alternate_root(&mut self, root: Option<&Path>) {
        let dir = match root {
            Some(root) => reroot(root, &self.base_dir),
            None => self.base_dir.clone(),
        };
        self.current = dir.join(CURRENT_FILE);
        self.backup = dir.join(BACKUP_FILE);
        self.scratch = dir.join(SCRATCH_FILE);
        self.dir = dir;
    }

    pub fn with_file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn current(&self) -> &Path {
        &self.current
    }

    pub fn backup(&self) -> &Path {
        &self.backup
    }

    pub fn scratch(&self) -> &Path {
        &self.scratch
    }

    pub fn backup_staging(&self) -> PathBuf {
        self.dir.join(BACKUP_STAGING_FILE)
    }
}

/// Join `path` below `root`, treating `path` as relative to `/`.
pub fn reroot(root: &Path, path: &Path) -> PathBuf {
    let relative = path.strip_prefix("/").unwrap_or(path);
    root.join(relative)
}

type ScratchWriter = TagWriter<BufWriter<File>>;

/// One open/close cycle over the registry file set.
pub struct XmlFileIo {
    files: RegistryFiles,
    mode: AccessMode,
    writer: Option<ScratchWriter>,
}

impl XmlFileIo {
    /// Open the file set. A READ_WRITE open makes sure the registry directory exists.
    pub fn open(files: RegistryFiles, mode: AccessMode) -> Result<Self> {
        if mode.is_writable() {
            std::fs::create_dir_all(files.dir()).map_err(|e| RegistryError::io(files.dir(), e))?;
        }
        tracing::debug!(dir = %files.dir().display(), ?mode, "Opened registry file set");
        Ok(Self {
            files,
            mode,
            writer: None,
        })
    }

    pub fn files(&self) -> &RegistryFiles {
        &self.files
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Contents of the current file, `None` when it does not exist.
    /// Bytes that are not UTF-8 decode to U+FFFD.
    pub fn read_current(&self) -> Result<Option<String>> {
        let current = self.files.current();
        match std::fs::read(current) {
            Ok(bytes) => Ok(Some(decode_lossy(current, bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RegistryError::io(current, e)),
        }
    }

    /// Writer streaming into the scratch file; created on first use.
    pub fn writer(&mut self) -> Result<&mut ScratchWriter> {
        if !self.mode.is_writable() {
            return Err(RegistryError::ReadOnly(
                "registry file set opened for reading".to_string(),
            ));
        }
        if self.writer.is_none() {
            let file = create_scratch(self.files.scratch(), self.files.file_mode)?;
            self.writer = Some(TagWriter::new(BufWriter::new(file)));
        }
        match self.writer.as_mut() {
            Some(writer) => Ok(writer),
            None => Err(RegistryError::ReadOnly("scratch writer unavailable".to_string())),
        }
    }

    /// Finish the cycle. When something was written, flush and sync the scratch
    /// file and perform the atomic swap.
    pub fn close(mut self) -> Result<bool> {
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => return Ok(false),
        };

        let scratch = self.files.scratch().to_path_buf();
        let file = writer
            .into_inner()
            .into_inner()
            .map_err(|e| RegistryError::io(&scratch, e.into_error()))?;
        file.sync_all().map_err(|e| RegistryError::io(&scratch, e))?;
        drop(file);

        self.swap()?;
        Ok(true)
    }

    /// Drop any scratch output without touching current or backup.
    pub fn abandon(mut self) {
        if self.writer.take().is_some() {
            if let Err(e) = std::fs::remove_file(self.files.scratch()) {
                tracing::warn!(
                    "Failed to remove abandoned scratch file {}: {}",
                    self.files.scratch().display(),
                    e
                );
            }
        }
    }

    fn swap(&self) -> Result<()> {
        let current = self.files.current();
        let backup = self.files.backup();
        let scratch = self.files.scratch();

        if self.stage_backup()? {
            let staging = self.files.backup_staging();
            std::fs::rename(&staging, backup).map_err(|e| RegistryError::io(backup, e))?;
            // rename leaves both names when they already link the same inode.
            let _ = std::fs::remove_file(&staging);
        }

        std::fs::rename(scratch, current).map_err(|e| RegistryError::io(current, e))?;
        sync_dir(self.files.dir());
        tracing::info!(path = %current.display(), "Committed registry");
        Ok(())
    }

    /// Prepare the previous registry under the staging name while current
    /// stays in place. Returns false when there is nothing to back up.
    fn stage_backup(&self) -> Result<bool> {
        let current = self.files.current();
        let backup = self.files.backup();
        let staging = self.files.backup_staging();

        let source = match std::fs::symlink_metadata(current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                let target =
                    std::fs::canonicalize(current).map_err(|e| RegistryError::io(current, e))?;
                // A link into the backup already preserves the previous registry.
                if std::fs::canonicalize(backup).ok().as_deref() == Some(target.as_path()) {
                    return Ok(false);
                }
                target
            }
            Ok(_) => current.to_path_buf(),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(RegistryError::io(current, e)),
        };

        match std::fs::remove_file(&staging) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(RegistryError::io(&staging, e)),
        }
        if let Err(e) = std::fs::hard_link(&source, &staging) {
            tracing::debug!("Hard link for backup failed ({}); copying instead", e);
            std::fs::copy(&source, &staging).map_err(|e| RegistryError::io(&staging, e))?;
        }
        Ok(true)
    }
}

/// Decode file contents, replacing invalid UTF-8 sequences.
pub(crate) fn decode_lossy(path: &Path, bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                offset = e.utf8_error().valid_up_to(),
                "File is not valid UTF-8; replacing invalid bytes"
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}

fn create_scratch(path: &Path, mode: u32) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(mode);
        let file = options.open(path).map_err(|e| RegistryError::io(path, e))?;
        // The open mode is filtered by the umask.
        file.set_permissions(std::fs::Permissions::from_mode(mode))
            .map_err(|e| RegistryError::io(path, e))?;
        Ok(file)
    }
    #[cfg(not(unix))]
    {
        let _ = mode;
        options.open(path).map_err(|e| RegistryError::io(path, e))
    }
}

fn sync_dir(dir: &Path) {
    #[cfg(unix)]
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        tracing::debug!("Directory sync failed for {}: {}", dir.display(), e);
    }
    #[cfg(not(unix))]
    let _ = dir;
}
