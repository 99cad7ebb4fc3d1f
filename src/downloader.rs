use std::fs;
use std::path::Path;
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::song_library::AUDIO_EXT;

#[cfg(target_os = "windows")]
pub const YTDLP_BIN: &str = "yt-dlp.exe";
#[cfg(not(target_os = "windows"))]
pub const YTDLP_BIN: &str = "yt-dlp";

/// The voice codec only accepts this shape: mono, 22050 Hz.
const FFMPEG_POSTPROCESS: &str = "ffmpeg: -bitexact -ac 1 -ab 352k -ar 22050";

/// How long to wait for the download tool before harvesting anyway.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);
/// Settle delay between process exit and the artifact scan, so the
/// post-processor has finished renaming its output.
const SETTLE_DELAY: Duration = Duration::from_millis(800);
const WAIT_SLICE: Duration = Duration::from_millis(200);

/// Characters stripped out of free-text search queries and file names.
static SEARCH_CLEANUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[%.\\/: ]").expect("search pattern is valid"));

/// Downloads a song by name or direct URL and files the resulting WAV into
/// the songs directory. Returns the stored base name, or `None` when no
/// audio artifact materialized.
///
/// Blocking: meant to run on a worker thread, not the event loop.
pub fn download_song(songs_dir: &Path, work_dir: &Path, request: &str) -> Result<Option<String>> {
    let (search, name) = if request.starts_with("https://") {
        (request.to_string(), clean_request(request))
    } else {
        let cleaned = clean_request(request);
        (format!("ytsearch: {cleaned}"), cleaned)
    };

    let mut child = Command::new(YTDLP_BIN)
        .current_dir(work_dir)
        .args(["-x", "--extract-audio", "--audio-format", AUDIO_EXT])
        .arg(&search)
        .args(["--ppa", FFMPEG_POSTPROCESS])
        .spawn()
        .context("failed to launch the download tool")?;

    let deadline = Instant::now() + DOWNLOAD_TIMEOUT;
    loop {
        match child.try_wait().context("download tool wait failed")? {
            Some(_) => break,
            None if Instant::now() >= deadline => break,
            None => thread::sleep(WAIT_SLICE),
        }
    }

    thread::sleep(SETTLE_DELAY);
    harvest(songs_dir, work_dir, &name)
}

fn clean_request(request: &str) -> String {
    SEARCH_CLEANUP.replace_all(request, " ").into_owned()
}

/// Scans the working directory for download artifacts: the finished WAV is
/// filed into the songs directory under the requested name, partial and
/// intermediate files are deleted.
pub fn harvest(songs_dir: &Path, work_dir: &Path, name: &str) -> Result<Option<String>> {
    let entries = fs::read_dir(work_dir).context("scan for downloaded audio")?;
    let mut stored = None;

    for entry in entries.flatten() {
        let file_name = entry.file_name().to_string_lossy().into_owned();

        if file_name.ends_with(".wav") {
            let clean = name.replace('\u{00A0}', " ");
            let dest = songs_dir.join(format!("{clean}.{AUDIO_EXT}"));
            fs::rename(entry.path(), &dest).context("file the downloaded song")?;
            stored = Some(clean);
        } else if file_name.ends_with(".webm") || file_name.ends_with(".webm.part") {
            let _ = fs::remove_file(entry.path());
        }
    }

    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn harvest_files_the_wav_and_sweeps_leftovers() {
        let songs = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();

        File::create(work.path().join("raw output.wav"))
            .unwrap()
            .write_all(b"RIFF")
            .unwrap();
        File::create(work.path().join("stream.webm")).unwrap();
        File::create(work.path().join("stream.webm.part")).unwrap();

        let stored = harvest(songs.path(), work.path(), "my song").unwrap();
        assert_eq!(stored.as_deref(), Some("my song"));
        assert!(songs.path().join("my song.wav").exists());
        assert!(!work.path().join("stream.webm").exists());
        assert!(!work.path().join("stream.webm.part").exists());
    }

    #[test]
    fn harvest_without_artifacts_reports_nothing() {
        let songs = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        File::create(work.path().join("unrelated.log")).unwrap();

        let stored = harvest(songs.path(), work.path(), "x").unwrap();
        assert!(stored.is_none());
        assert!(work.path().join("unrelated.log").exists());
    }

    #[test]
    fn harvest_normalizes_non_breaking_spaces() {
        let songs = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        File::create(work.path().join("out.wav")).unwrap();

        let stored = harvest(songs.path(), work.path(), "a\u{00A0}b").unwrap();
        assert_eq!(stored.as_deref(), Some("a b"));
        assert!(songs.path().join("a b.wav").exists());
    }

    #[test]
    fn queries_are_cleaned_of_hostile_characters() {
        assert_eq!(clean_request("artist: song.name"), "artist  song name");
        assert_eq!(clean_request("https://a.b/c"), "https   a b c");
    }
}
