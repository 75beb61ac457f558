//! File name and path helpers.

use camino::Utf8Path;
use std::io;
use std::time::UNIX_EPOCH;

/// Derive a slot index from a replacement file name.
///
/// The name must start with decimal digits, followed by the end of the name, a `.`
/// or a `_`:
///
/// - `00012.adx` -> 12
/// - `7_voice.adx` -> 7
/// - `3` -> 3
/// - `voice.adx`, `12abc.adx` -> `None`
///
/// The index is returned as `u64` so that a too-large index is reported as out of
/// range by the format rather than silently rejected here.
pub fn resolve_slot(file_name: &str) -> Option<u64> {
    let digits_end = file_name
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(file_name.len());
    if digits_end == 0 {
        return None;
    }

    match file_name[digits_end..].chars().next() {
        None | Some('.') | Some('_') => file_name[..digits_end].parse().ok(),
        Some(_) => None,
    }
}

/// Normalize a path for use as a cache key.
///
/// Game file systems are case-insensitive and the intercepted process may use
/// either separator.
pub fn normalize_path_key(path: &Utf8Path) -> String {
    path.as_str().replace('\\', "/").to_ascii_lowercase()
}

/// Size and modification time of a file, as bytes to feed a fingerprint.
///
/// Empty when the file cannot be inspected; the modification time is left out on
/// platforms that do not report it.
pub fn file_stamp(path: &Utf8Path) -> Vec<u8> {
    let mut stamp = Vec::with_capacity(24);
    if let Ok(metadata) = std::fs::metadata(path.as_std_path()) {
        stamp.extend_from_slice(&metadata.len().to_le_bytes());
        if let Ok(duration) = metadata
            .modified()
            .and_then(|modified| modified.duration_since(UNIX_EPOCH).map_err(io::Error::other))
        {
            stamp.extend_from_slice(&duration.as_nanos().to_le_bytes());
        }
    }
    stamp
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    #[test]
    fn test_resolve_slot_plain_index() {
        assert_eq!(resolve_slot("00012.adx"), Some(12));
        assert_eq!(resolve_slot("3"), Some(3));
        assert_eq!(resolve_slot("0.bin"), Some(0));
    }

    #[test]
    fn test_resolve_slot_with_suffix() {
        assert_eq!(resolve_slot("7_voice.adx"), Some(7));
        assert_eq!(resolve_slot("0042_bgm_loop.adx"), Some(42));
    }

    #[test]
    fn test_resolve_slot_rejects_names() {
        assert_eq!(resolve_slot("voice.adx"), None);
        assert_eq!(resolve_slot("12abc.adx"), None);
        assert_eq!(resolve_slot(""), None);
        assert_eq!(resolve_slot(".5"), None);
    }

    #[test]
    fn test_resolve_slot_keeps_large_values() {
        assert_eq!(resolve_slot("70000.adx"), Some(70000));
        assert_eq!(resolve_slot("99999999999999999999999.adx"), None);
    }

    #[test]
    fn test_normalize_path_key() {
        let path = Utf8PathBuf::from("C:\\Game\\DATA\\Sound.AFS");
        assert_eq!(normalize_path_key(&path), "c:/game/data/sound.afs");
    }

    #[test]
    fn test_file_stamp_tracks_modification_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("voice.afs")).unwrap();
        assert!(file_stamp(&path).is_empty());

        std::fs::write(&path, b"abcd").unwrap();
        let before = file_stamp(&path);
        assert_eq!(&before[..8], &4u64.to_le_bytes());

        let later = std::time::SystemTime::now() + std::time::Duration::from_secs(60);
        std::fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(later)
            .unwrap();
        assert_ne!(file_stamp(&path), before);
    }
}
