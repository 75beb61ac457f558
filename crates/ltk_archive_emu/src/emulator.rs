//! Emulator facade consumed by the I/O interception layer.
//!
//! The interception layer hands over the caller's handle and path for each file
//! the game opens. [`ArchiveEmulator::try_emulate`] answers with a rebuilt archive
//! when the file is a supported archive with registered replacements, or `None`
//! when the original should be served untouched.

use crate::cache::EmulatorCache;
use crate::config::EmulatorConfig;
use crate::error::Result;
use crate::formats::FormatKind;
use crate::provider::ReplacementProvider;
use crate::rebuild::{EmulatedArchive, RebuildOptions};
use crate::replacements::{ReplacementContent, ReplacementSet};
use crate::utils::file_stamp;
use camino::Utf8Path;
use ltk_vstream::probe;
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;
use xxhash_rust::xxh3::xxh3_64;

/// Serves rebuilt archives for files that have replacements.
pub struct ArchiveEmulator {
    config: EmulatorConfig,
    providers: Vec<Box<dyn ReplacementProvider>>,
    /// Replacement sets keyed by lowercase archive file name.
    replacements: HashMap<String, ReplacementSet>,
    cache: EmulatorCache,
}

impl ArchiveEmulator {
    pub fn new(config: EmulatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            providers: Vec::new(),
            replacements: HashMap::new(),
            cache: EmulatorCache::new(),
        })
    }

    /// Add a provider. Providers added later win when they replace the same slot.
    pub fn with_provider(mut self, provider: impl ReplacementProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    pub fn cache(&self) -> &EmulatorCache {
        &self.cache
    }

    /// Registered replacements for `archive_name`.
    pub fn replacements(&self, archive_name: &str) -> Option<&ReplacementSet> {
        self.replacements.get(&archive_name.to_ascii_lowercase())
    }

    /// Register one replacement.
    ///
    /// The slot is checked against the format implied by the archive's extension
    /// (or the widest supported format when the extension is unknown). A rejected
    /// slot leaves every earlier registration in place.
    pub fn register(
        &mut self,
        archive_name: &str,
        slot: u64,
        content: ReplacementContent,
    ) -> Result<Option<ReplacementContent>> {
        let key = archive_name.to_ascii_lowercase();
        match self.replacements.get_mut(&key) {
            Some(set) => set.insert(slot, content),
            None => {
                let mut set = empty_set_for(&key);
                let previous = set.insert(slot, content)?;
                self.replacements.insert(key, set);
                Ok(previous)
            }
        }
    }

    /// Reload replacements from every provider, in order.
    ///
    /// Replaces all registrations, including those made with
    /// [`register`](Self::register). On error the previous registrations are kept.
    /// Returns the number of archives with replacements.
    pub fn refresh(&mut self) -> Result<usize> {
        let mut replacements: HashMap<String, ReplacementSet> = HashMap::new();

        for provider in &mut self.providers {
            for archive_name in provider.list_archives()? {
                let key = archive_name.to_ascii_lowercase();
                let set = replacements
                    .entry(key.clone())
                    .or_insert_with(|| empty_set_for(&key));
                for (slot, content) in provider.read_replacements(&archive_name)? {
                    set.insert(slot, content)?;
                }
            }
        }
        replacements.retain(|_, set| !set.is_empty());

        tracing::info!(
            "Loaded replacements for {} archives from {} providers",
            replacements.len(),
            self.providers.len()
        );
        self.replacements = replacements;
        Ok(self.replacements.len())
    }

    /// Rebuild (or fetch from cache) the archive at `path`.
    ///
    /// `handle` is the caller's open handle to the original. It is only probed and
    /// is left at the position it was found. Returns `Ok(None)` when there are no
    /// replacements for this file name, or the file is not an enabled format.
    pub fn try_emulate<R: Read + Seek>(
        &self,
        handle: &mut R,
        path: &Utf8Path,
    ) -> Result<Option<Arc<EmulatedArchive>>> {
        let Some(file_name) = path.file_name() else {
            return Ok(None);
        };
        let Some(set) = self.replacements(file_name).filter(|set| !set.is_empty()) else {
            return Ok(None);
        };
        let Some(kind) = FormatKind::detect(handle)? else {
            tracing::debug!("No supported format for {}", path);
            return Ok(None);
        };
        if !self.config.is_enabled(kind) {
            tracing::debug!("{} emulation disabled, serving {} untouched", kind, path);
            return Ok(None);
        }

        let options = RebuildOptions {
            alignment: self.config.alignment_for(kind),
            merge_regions: self.config.merge_regions,
        };
        let original_len = probe(handle, |r| r.seek(SeekFrom::End(0)))?;
        let fingerprint = build_fingerprint(set, kind, options, original_len, path);

        let archive = self.cache.get_or_build(path, fingerprint, || {
            kind.rebuild(handle, path, set, options)
        })?;
        Ok(Some(archive))
    }
}

fn empty_set_for(archive_name: &str) -> ReplacementSet {
    match FormatKind::from_file_name(archive_name) {
        Some(kind) => kind.replacement_set(),
        None => {
            let widest = FormatKind::ALL
                .iter()
                .map(|kind| kind.max_slot_index())
                .fold(0, u32::max);
            ReplacementSet::new(widest)
        }
    }
}

fn build_fingerprint(
    set: &ReplacementSet,
    kind: FormatKind,
    options: RebuildOptions,
    original_len: u64,
    original_path: &Utf8Path,
) -> u64 {
    let mut buf = Vec::with_capacity(64 + kind.name().len());
    buf.extend_from_slice(&set.fingerprint().to_le_bytes());
    buf.extend_from_slice(kind.name().as_bytes());
    buf.extend_from_slice(&options.alignment.to_le_bytes());
    buf.push(options.merge_regions as u8);
    buf.extend_from_slice(&original_len.to_le_bytes());
    // The original may be rewritten in place at the same size.
    buf.extend_from_slice(&file_stamp(original_path));
    xxh3_64(&buf)
}
