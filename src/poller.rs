use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tauri::{AppHandle, Emitter, Manager};

use crate::error::AppError;
use crate::models::SongRecord;
use crate::song_library::AUDIO_EXT;

/// Name of the staged audio file the game reads as microphone input.
pub const VOICE_INPUT_FILE: &str = "voice_input.wav";

/// The rebinding trace a song-selection alias leaves in the persisted
/// config. Digits after it are the selected 1-based song index.
const RELAY_PATTERN: &str = "bind \"=\" \"";

/// Poll interval per configured machine-speed tier.
pub fn poll_interval_ms(tier: &str) -> u64 {
    match tier {
        "Potato" => 2000,
        "Slow" => 1000,
        "Average" => 500,
        "Fast" => 200,
        "Alien" => 200,
        _ => 500,
    }
}

/// Everything one polling pass needs, snapshotted at start time. The song
/// list is deliberately frozen: indices in the generated scripts refer to
/// the list as it was when they were written, and a refresh renumbers them.
pub struct PollerContext {
    pub trigger_path: PathBuf,
    pub songs_dir: PathBuf,
    pub game_path: PathBuf,
    pub songs: Vec<SongRecord>,
}

pub struct PollerHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Spawns the polling thread. Each tick drains the trigger-file mailbox at
/// most once; copy failures are logged and the loop keeps going.
pub fn start(app: AppHandle, ctx: PollerContext, interval: Duration) -> PollerHandle {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = Arc::clone(&stop);

    let thread = thread::spawn(move || loop {
        if stop_flag.load(Ordering::SeqCst) {
            break;
        }

        match tick(&ctx) {
            Ok(Some(name)) => {
                let _ = app.emit("song-staged", name.clone());
                app.state::<crate::logging::LogState>().add_log(
                    "INFO",
                    &format!("Staged \"{}\" into the game voice slot", name),
                    &app,
                );
            }
            Ok(None) => {}
            Err(e) => {
                app.state::<crate::logging::LogState>().add_log(
                    "ERROR",
                    &format!("Couldnt copy song to game folder: {}", e),
                    &app,
                );
            }
        }

        thread::sleep(interval);
    });

    PollerHandle {
        stop,
        thread: Some(thread),
    }
}

/// One polling pass. Returns the staged song name when a valid trigger was
/// consumed, `Ok(None)` when there was nothing to do (no file, no pattern,
/// index out of range — all silent by design), and an error only when the
/// audio copy itself failed.
pub fn tick(ctx: &PollerContext) -> Result<Option<String>, AppError> {
    let Some(index) = drain_trigger(&ctx.trigger_path) else {
        return Ok(None);
    };

    let Some(record) = index.checked_sub(1).and_then(|i| ctx.songs.get(i)) else {
        return Ok(None);
    };

    stage_song(&ctx.songs_dir, &ctx.game_path, &record.name)?;
    Ok(Some(record.name.clone()))
}

/// Consumes the trigger-file mailbox: reads it, deletes it, and extracts
/// the selected song index. The file is removed even when the content is
/// useless — the producer only ever writes it as a one-shot signal.
pub fn drain_trigger(trigger: &Path) -> Option<usize> {
    if !trigger.exists() {
        return None;
    }
    let content = fs::read_to_string(trigger).ok();
    let _ = fs::remove_file(trigger);
    parse_trigger_index(&content?)
}

/// Extracts the digits of `bind "=" "<digits>"` from the persisted config.
pub fn parse_trigger_index(content: &str) -> Option<usize> {
    let start = content.find(RELAY_PATTERN)? + RELAY_PATTERN.len();
    let rest = &content[start..];
    let end = rest.find('"')?;
    rest[..end].parse().ok()
}

/// Copies the song's audio into the game's voice-input slot, replacing any
/// previously staged file first.
pub fn stage_song(songs_dir: &Path, game_path: &Path, name: &str) -> Result<(), AppError> {
    let source = songs_dir.join(format!("{name}.{AUDIO_EXT}"));
    let dest = game_path.join(VOICE_INPUT_FILE);

    if dest.exists() {
        fs::remove_file(&dest).map_err(|e| AppError::file_access(&dest, e))?;
    }

    fs::copy(&source, &dest).map_err(|e| AppError::file_access(&source, e))?;
    Ok(())
}
