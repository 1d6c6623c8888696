//! Versioned on-disk store of card previews
//!
//! The cache maps a card's name to its cropped, uncropped and thumbnail
//! previews. It is an optimization only: a missing, outdated or corrupt file
//! simply yields an empty cache.
//!
//! File layout, all integers little endian:
//!
//! ```text
//! [8]  format marker
//! u64  entry count
//! per entry:
//!   u64 + bytes  card name (UTF-8)
//!   u64          source last-write time, nanoseconds since the Unix epoch
//!   u64          source content hash
//!   u64          fingerprint of the preparation parameters
//!   u8           flags (bit 0: bad aspect ratio)
//!   3 x (u64 + bytes)  PNG cropped, uncropped, thumbnail
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::constants::PREVIEW_CACHE_MAGIC;
use crate::pipeline::{Image, PreparedCard};
use crate::types::{CoreError, Result};

const FLAG_BAD_ASPECT_RATIO: u8 = 1;

/// Previews of one card
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewEntry {
    /// Modification time of the source when the previews were made
    pub last_write_time: SystemTime,
    /// Content hash of the decoded source
    pub source_hash: u64,
    /// Fingerprint of the parameters the card was prepared with
    pub params_hash: u64,
    pub bad_aspect_ratio: bool,
    pub cropped: Image,
    pub uncropped: Image,
    pub thumbnail: Image,
}

impl PreviewEntry {
    /// Shrink a freshly prepared card down to preview size
    pub fn from_prepared(
        prepared: &PreparedCard,
        last_write_time: SystemTime,
        source_hash: u64,
        params_hash: u64,
        preview_width: u32,
    ) -> Self {
        Self {
            last_write_time,
            source_hash,
            params_hash,
            bad_aspect_ratio: prepared.bad_aspect_ratio,
            cropped: prepared.cropped.thumbnail(preview_width),
            uncropped: prepared.uncropped.thumbnail(preview_width),
            thumbnail: prepared.thumbnail.clone(),
        }
    }
}

/// How a cached entry relates to the current source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
    Missing,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviewCache {
    entries: BTreeMap<PathBuf, PreviewEntry>,
}

impl PreviewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &Path) -> Option<&PreviewEntry> {
        self.entries.get(name)
    }

    pub fn insert(&mut self, name: impl Into<PathBuf>, entry: PreviewEntry) {
        self.entries.insert(name.into(), entry);
    }

    pub fn remove(&mut self, name: &Path) -> Option<PreviewEntry> {
        self.entries.remove(name)
    }

    /// Drop entries whose card is no longer part of the project
    pub fn retain_cards<'a>(&mut self, names: impl IntoIterator<Item = &'a Path>) {
        let keep: std::collections::HashSet<&Path> = names.into_iter().collect();
        self.entries.retain(|name, _| keep.contains(name.as_path()));
    }

    /// An entry is fresh when both the source time and the parameters match
    pub fn freshness(&self, name: &Path, last_write_time: SystemTime, params_hash: u64) -> Freshness {
        match self.entries.get(name) {
            None => Freshness::Missing,
            Some(entry)
                if entry.last_write_time == last_write_time && entry.params_hash == params_hash =>
            {
                Freshness::Fresh
            }
            Some(_) => Freshness::Stale,
        }
    }

    pub fn is_fresh(&self, name: &Path, last_write_time: SystemTime, params_hash: u64) -> bool {
        self.freshness(name, last_write_time, params_hash) == Freshness::Fresh
    }

    /// Accept a stale entry whose source content and parameters did not change.
    ///
    /// Returns `true` when the entry was kept and its time refreshed.
    pub fn revalidate(
        &mut self,
        name: &Path,
        last_write_time: SystemTime,
        source_hash: u64,
        params_hash: u64,
    ) -> bool {
        match self.entries.get_mut(name) {
            Some(entry) if entry.source_hash == source_hash && entry.params_hash == params_hash => {
                entry.last_write_time = last_write_time;
                true
            }
            _ => false,
        }
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.extend_from_slice(&PREVIEW_CACHE_MAGIC);
        write_u64(&mut out, self.entries.len() as u64);
        for (name, entry) in &self.entries {
            write_bytes(&mut out, name.to_string_lossy().as_bytes());
            write_u64(&mut out, nanos_since_epoch(entry.last_write_time));
            write_u64(&mut out, entry.source_hash);
            write_u64(&mut out, entry.params_hash);
            out.push(if entry.bad_aspect_ratio { FLAG_BAD_ASPECT_RATIO } else { 0 });
            for image in [&entry.cropped, &entry.uncropped, &entry.thumbnail] {
                write_bytes(&mut out, &image.encode_png()?);
            }
        }
        Ok(out)
    }

    /// Parse a cache file, a wrong format marker is an error
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader { bytes };
        let magic = reader.take(PREVIEW_CACHE_MAGIC.len())?;
        if magic != PREVIEW_CACHE_MAGIC {
            return Err(CoreError::CacheFormat(format!(
                "format marker {:?} does not match {:?}",
                String::from_utf8_lossy(magic),
                String::from_utf8_lossy(&PREVIEW_CACHE_MAGIC)
            )));
        }

        let count = reader.u64()?;
        let mut entries = BTreeMap::new();
        for _ in 0..count {
            let name = String::from_utf8(reader.bytes()?.to_vec())
                .map_err(|err| CoreError::CacheFormat(err.to_string()))?;
            let last_write_time = UNIX_EPOCH + Duration::from_nanos(reader.u64()?);
            let source_hash = reader.u64()?;
            let params_hash = reader.u64()?;
            let flags = reader.take(1)?[0];
            let cropped = Image::decode(reader.bytes()?)?;
            let uncropped = Image::decode(reader.bytes()?)?;
            let thumbnail = Image::decode(reader.bytes()?)?;
            entries.insert(
                PathBuf::from(name),
                PreviewEntry {
                    last_write_time,
                    source_hash,
                    params_hash,
                    bad_aspect_ratio: flags & FLAG_BAD_ASPECT_RATIO != 0,
                    cropped,
                    uncropped,
                    thumbnail,
                },
            );
        }
        Ok(Self { entries })
    }

    /// Load the cache, falling back to an empty one.
    ///
    /// An unreadable or outdated file is deleted so it gets rebuilt from
    /// scratch on the next save.
    pub fn load(path: &Path) -> Self {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                log::debug!("No preview cache at {}: {}", path.display(), err);
                return Self::new();
            }
        };
        match Self::from_bytes(&bytes) {
            Ok(cache) => {
                log::debug!("Loaded {} previews from {}", cache.len(), path.display());
                cache
            }
            Err(err) => {
                log::info!("Discarding preview cache {}: {}", path.display(), err);
                if let Err(err) = std::fs::remove_file(path) {
                    log::warn!("Failed to remove {}: {}", path.display(), err);
                }
                Self::new()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    /// Load the cache without blocking the async runtime
    pub async fn load_async(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_owned();
        let cache = tokio::task::spawn_blocking(move || Self::load(&path)).await?;
        Ok(cache)
    }

    /// Save the cache without blocking the async runtime
    pub async fn save_async(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_owned();
        let cache = self.clone();
        let bytes = tokio::task::spawn_blocking(move || cache.to_bytes()).await??;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }
}

fn nanos_since_epoch(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_nanos() as u64)
        .unwrap_or(0)
}

fn write_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_u64(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.bytes.len() < len {
            return Err(CoreError::CacheFormat("unexpected end of file".to_string()));
        }
        let (head, tail) = self.bytes.split_at(len);
        self.bytes = tail;
        Ok(head)
    }

    fn u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    fn bytes(&mut self) -> Result<&'a [u8]> {
        let len = usize::try_from(self.u64()?)
            .map_err(|_| CoreError::CacheFormat("length out of range".to_string()))?;
        self.take(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::PixelSize;

    fn entry(seconds: u64) -> PreviewEntry {
        PreviewEntry {
            last_write_time: UNIX_EPOCH + Duration::from_secs(seconds),
            source_hash: 42,
            params_hash: 9,
            bad_aspect_ratio: true,
            cropped: Image::filled(PixelSize::new(3, 4), [1, 2, 3, 255]),
            uncropped: Image::filled(PixelSize::new(5, 6), [4, 5, 6, 255]),
            thumbnail: Image::filled(PixelSize::new(1, 2), [7, 8, 9, 255]),
        }
    }

    #[test]
    fn test_bytes_roundtrip() {
        let mut cache = PreviewCache::new();
        cache.insert("a.png", entry(10));
        cache.insert("sub/b.png", entry(20));
        let parsed = PreviewCache::from_bytes(&cache.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, cache);
    }

    #[test]
    fn test_wrong_marker_is_rejected() {
        let mut bytes = PreviewCache::new().to_bytes().unwrap();
        bytes[7] ^= 0xff;
        assert!(matches!(
            PreviewCache::from_bytes(&bytes),
            Err(CoreError::CacheFormat(_))
        ));
    }

    #[test]
    fn test_truncated_file_is_rejected() {
        let mut cache = PreviewCache::new();
        cache.insert("a.png", entry(10));
        let bytes = cache.to_bytes().unwrap();
        assert!(PreviewCache::from_bytes(&bytes[..bytes.len() - 3]).is_err());
    }

    #[test]
    fn test_freshness() {
        let mut cache = PreviewCache::new();
        let name = Path::new("a.png");
        let time = UNIX_EPOCH + Duration::from_secs(10);
        assert_eq!(cache.freshness(name, time, 9), Freshness::Missing);

        cache.insert(name, entry(10));
        assert!(cache.is_fresh(name, time, 9));

        let later = time + Duration::from_secs(5);
        assert_eq!(cache.freshness(name, later, 9), Freshness::Stale);
        assert!(!cache.revalidate(name, later, 7, 9));
        assert!(cache.revalidate(name, later, 42, 9));
        assert!(cache.is_fresh(name, later, 9));
    }

    #[test]
    fn test_changed_parameters_are_stale() {
        let mut cache = PreviewCache::new();
        let name = Path::new("a.png");
        let time = UNIX_EPOCH + Duration::from_secs(10);
        cache.insert(name, entry(10));

        assert_eq!(cache.freshness(name, time, 10), Freshness::Stale);
        assert!(!cache.revalidate(name, time, 42, 10));
        assert!(!cache.is_fresh(name, time, 10));
    }
}
