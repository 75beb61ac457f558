//! Replacement provider abstraction.
//!
//! The emulator does not care where replacement content comes from. A
//! [`ReplacementProvider`] lists the archives it has content for and hands out
//! `(slot, content)` pairs for each. [`FsReplacementDir`] reads them from a plain
//! directory tree.

use crate::error::Result;
use crate::replacements::ReplacementContent;
use crate::utils::resolve_slot;
use camino::{Utf8Path, Utf8PathBuf};
use walkdir::WalkDir;

/// Source of replacement content for archives.
///
/// Implementations must be [`Send`] so an emulator can be moved across threads.
/// Methods take `&mut self` to allow stateful readers.
pub trait ReplacementProvider: Send {
    /// File names of the archives this provider has replacements for, such as
    /// `"voice.afs"`.
    fn list_archives(&mut self) -> Result<Vec<String>>;

    /// All replacements for the archive named `archive_name`.
    ///
    /// Archive names are matched case-insensitively. Slots are returned unchecked;
    /// range validation is up to the caller.
    fn read_replacements(&mut self, archive_name: &str)
        -> Result<Vec<(u64, ReplacementContent)>>;
}

/// Filesystem-backed replacement provider.
///
/// ```text
/// root/
///   voice.afs/            # Archive file name (case-insensitive)
///     00012.adx           # Replaces slot 12
///     3_intro.adx         # Replaces slot 3
///   bgm.pk16/
///     0.bin
/// ```
///
/// File names must start with the decimal slot index, followed by the end of the
/// name, a `.` or a `_`. Other files are skipped with a warning. Files are not read
/// here; they are opened on demand when the rebuilt archive is served.
pub struct FsReplacementDir {
    root: Utf8PathBuf,
}

impl FsReplacementDir {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn archive_dirs(&self) -> Result<Vec<(String, Utf8PathBuf)>> {
        if !self.root.as_std_path().is_dir() {
            return Ok(Vec::new());
        }

        let mut dirs = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let Some(path) = Utf8Path::from_path(entry.path()) else {
                tracing::warn!("Skipping non-UTF-8 path: {}", entry.path().display());
                continue;
            };
            let Some(name) = path.file_name() else {
                continue;
            };
            dirs.push((name.to_string(), path.to_path_buf()));
        }
        Ok(dirs)
    }
}

impl ReplacementProvider for FsReplacementDir {
    fn list_archives(&mut self) -> Result<Vec<String>> {
        Ok(self
            .archive_dirs()?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    fn read_replacements(
        &mut self,
        archive_name: &str,
    ) -> Result<Vec<(u64, ReplacementContent)>> {
        let mut results = Vec::new();

        for (name, dir) in self.archive_dirs()? {
            if !name.eq_ignore_ascii_case(archive_name) {
                continue;
            }

            for entry in WalkDir::new(&dir)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
            {
                let entry = entry.map_err(std::io::Error::from)?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let Some(path) = Utf8Path::from_path(entry.path()) else {
                    tracing::warn!("Skipping non-UTF-8 path: {}", entry.path().display());
                    continue;
                };
                let Some(slot) = path.file_name().and_then(resolve_slot) else {
                    tracing::warn!("Skipping replacement without slot index: {}", path);
                    continue;
                };
                results.push((slot, ReplacementContent::File(path.to_path_buf())));
            }
        }

        tracing::debug!(
            "Found {} replacements for {} under {}",
            results.len(),
            archive_name,
            self.root
        );
        Ok(results)
    }
}
