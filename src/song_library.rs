use std::fs;
use std::path::Path;

use crate::models::SongRecord;

pub const LYRICS_EXT: &str = "txt";
pub const AUDIO_EXT: &str = "wav";

/// Reconciles the lyrics and songs directories into one ordered song list.
///
/// Lyric-backed entries come first, in directory-enumeration order, followed
/// by entries that only have audio. Files with any other extension are
/// skipped outright. An unreadable directory contributes nothing — the list
/// is rebuilt from the filesystem on every refresh, so there is no state to
/// invalidate.
pub fn build_list(lyrics_dir: &Path, songs_dir: &Path) -> Vec<SongRecord> {
    let mut list = Vec::new();

    for name in file_names(lyrics_dir) {
        let Some(base) = strip_ext(&name, LYRICS_EXT) else {
            continue;
        };
        let has_audio = songs_dir.join(format!("{base}.{AUDIO_EXT}")).exists();
        list.push(SongRecord {
            name: base.to_string(),
            has_lyrics: true,
            has_audio,
        });
    }

    for name in file_names(songs_dir) {
        let Some(base) = strip_ext(&name, AUDIO_EXT) else {
            continue;
        };
        if !lyrics_dir.join(format!("{base}.{LYRICS_EXT}")).exists() {
            list.push(SongRecord::audio_only(base));
        }
    }

    list
}

fn file_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .flatten()
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect()
}

fn strip_ext<'a>(name: &'a str, ext: &str) -> Option<&'a str> {
    let base = name.strip_suffix(ext)?.strip_suffix('.')?;
    if base.is_empty() {
        return None;
    }
    Some(base)
}
