use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tauri::{AppHandle, Manager, State};
use tauri_plugin_shell::ShellExt;

use crate::account;
use crate::config::{ConfigEntry, ConfigStore};
use crate::downloader;
use crate::error::AppError;
use crate::logging::LogState;
use crate::lyrics::{self, LyricsCandidate, LyricsClient};
use crate::models::{AccountIdentity, SayMode, SongRecord};
use crate::poller::{self, PollerContext, PollerHandle, VOICE_INPUT_FILE};
use crate::script_gen;
use crate::song_library::{build_list, AUDIO_EXT, LYRICS_EXT};
use crate::updater::{self, ReleaseInfo, YtdlUpdate};

/// The local folders the app works out of, created at startup.
pub struct LibraryPaths {
    pub lyrics: PathBuf,
    pub songs: PathBuf,
    pub config: PathBuf,
    /// Where the download tool runs and drops its artifacts.
    pub work: PathBuf,
}

pub struct AppState {
    pub paths: LibraryPaths,
    pub store: Mutex<ConfigStore>,
    pub say_mode: Mutex<SayMode>,
    /// Single pending lyrics-save slot; a second fetch is refused while one
    /// is in flight.
    pub pending_lyrics: Mutex<Option<String>>,
    pub poller: Mutex<Option<PollerHandle>>,
    pub lyrics_client: LyricsClient,
    pub http: reqwest::Client,
}

fn log(app: &AppHandle, level: &str, message: &str) {
    app.state::<LogState>().add_log(level, message, app);
}

#[tauri::command]
pub fn refresh_song_list(state: State<'_, AppState>) -> Vec<SongRecord> {
    build_list(&state.paths.lyrics, &state.paths.songs)
}

#[derive(Serialize)]
pub struct ConfigSummary {
    pub name: String,
    pub full_name: String,
}

#[tauri::command]
pub fn get_configs(state: State<'_, AppState>) -> (Vec<ConfigSummary>, Option<String>) {
    let store = state.store.lock().unwrap_or_else(|e| e.into_inner());
    let list = store
        .entries()
        .iter()
        .map(|e| ConfigSummary {
            name: e.name.clone(),
            full_name: e.full_name.clone(),
        })
        .collect();
    (list, store.current().map(|e| e.name.clone()))
}

#[tauri::command]
pub fn choose_config_dir(
    dir: String,
    app: AppHandle,
    state: State<'_, AppState>,
) -> Result<(), String> {
    let entry = ConfigEntry::from_cfg_dir(Path::new(&dir))
        .ok_or("That is not valid source configuration folder.")?;
    let name = entry.full_name.clone();

    {
        let mut store = state.store.lock().map_err(|_| "Failed to lock config")?;
        store.add_entry(entry);
        if let Some(id) = store.account_id {
            store.set_account_id(id);
        }
        store.save().map_err(|e| e.to_string())?;
    }

    // The freshly added entry tells us where the platform install lives, so
    // the account can usually be resolved right away.
    let _ = resolve_account(&state);
    log(&app, "INFO", &format!("Configured game folder for {}", name));
    Ok(())
}

#[tauri::command]
pub fn choose_config(name: String, state: State<'_, AppState>) -> Result<(), String> {
    let mut store = state.store.lock().map_err(|_| "Failed to lock config")?;
    if !store.choose(&name) {
        return Err(format!("No configured game named {}", name));
    }
    store.save().map_err(|e| e.to_string())
}

#[tauri::command]
pub fn get_key_bindings(state: State<'_, AppState>) -> Result<Vec<(String, String)>, String> {
    let store = state.store.lock().map_err(|_| "Failed to lock config")?;
    let entry = store.current().ok_or_else(|| AppError::MissingConfiguration.to_string())?;
    Ok(entry.key_bindings.clone())
}

#[tauri::command]
pub fn set_key_bindings(
    bindings: Vec<(String, String)>,
    state: State<'_, AppState>,
) -> Result<(), String> {
    let mut store = state.store.lock().map_err(|_| "Failed to lock config")?;
    let entry = store
        .current_mut()
        .ok_or_else(|| AppError::MissingConfiguration.to_string())?;
    entry.key_bindings = bindings;
    store.save().map_err(|e| e.to_string())
}

#[derive(Serialize, Deserialize)]
pub struct Options {
    pub pc: String,
    pub always_download: bool,
}

#[tauri::command]
pub fn get_options(state: State<'_, AppState>) -> Result<Options, String> {
    let store = state.store.lock().map_err(|_| "Failed to lock config")?;
    let entry = store.current().ok_or_else(|| AppError::MissingConfiguration.to_string())?;
    Ok(Options {
        pc: entry.pc.clone(),
        always_download: entry.always_download,
    })
}

#[tauri::command]
pub fn set_options(options: Options, state: State<'_, AppState>) -> Result<(), String> {
    let mut store = state.store.lock().map_err(|_| "Failed to lock config")?;
    let entry = store
        .current_mut()
        .ok_or_else(|| AppError::MissingConfiguration.to_string())?;
    entry.pc = options.pc;
    entry.always_download = options.always_download;
    store.save().map_err(|e| e.to_string())
}

#[tauri::command]
pub fn set_say_mode(team_chat: bool, state: State<'_, AppState>) {
    let mode = if team_chat {
        SayMode::TeamChat
    } else {
        SayMode::PublicChat
    };
    *state.say_mode.lock().unwrap_or_else(|e| e.into_inner()) = mode;
}

/// Regenerates both scripts from the current library and starts the
/// trigger-file poller. Restarts the poller if it was already running.
#[tauri::command]
pub fn start_karaoke(app: AppHandle, state: State<'_, AppState>) -> Result<usize, String> {
    let songs = build_list(&state.paths.lyrics, &state.paths.songs);
    let say = *state.say_mode.lock().unwrap_or_else(|e| e.into_inner());

    let (ctx, interval) = {
        let store = state.store.lock().map_err(|_| "Failed to lock config")?;
        let entry = store.current().ok_or_else(|| AppError::MissingConfiguration.to_string())?;

        let (tracklist, master) = script_gen::generate(
            &songs,
            &entry.key_bindings,
            say,
            &entry.full_name,
            &state.paths.lyrics,
        );
        script_gen::write_scripts(&entry.path, &tracklist, &master).map_err(|e| e.to_string())?;

        let ctx = PollerContext {
            trigger_path: entry.trigger_path(),
            songs_dir: state.paths.songs.clone(),
            game_path: entry.game_path.clone(),
            songs: songs.clone(),
        };
        let interval = Duration::from_millis(poller::poll_interval_ms(&entry.pc));
        (ctx, interval)
    };

    let mut slot = state.poller.lock().map_err(|_| "Failed to lock poller")?;
    if let Some(old) = slot.take() {
        old.stop();
    }
    *slot = Some(poller::start(app.clone(), ctx, interval));

    log(
        &app,
        "INFO",
        &format!("Karaoke started with {} songs", songs.len()),
    );
    Ok(songs.len())
}

/// Stops the poller and removes any staged voice-input file.
#[tauri::command]
pub fn stop_karaoke(app: AppHandle, state: State<'_, AppState>) -> Result<(), String> {
    if let Some(handle) = state
        .poller
        .lock()
        .map_err(|_| "Failed to lock poller")?
        .take()
    {
        handle.stop();
    }

    let staged = {
        let store = state.store.lock().map_err(|_| "Failed to lock config")?;
        store.current().map(|e| e.game_path.join(VOICE_INPUT_FILE))
    };
    if let Some(staged) = staged {
        if staged.exists() {
            fs::remove_file(&staged).map_err(|e| format!("Couldnt remove staged song: {}", e))?;
        }
    }

    log(&app, "INFO", "Karaoke stopped");
    Ok(())
}

fn resolve_account(state: &State<'_, AppState>) -> Option<AccountIdentity> {
    let steam_root = {
        let store = state.store.lock().ok()?;
        crate::config::steam_root_of(&store.current()?.path)?
    };

    let identity = account::resolve(&account::login_state_path(&steam_root))?;

    let mut store = state.store.lock().ok()?;
    store.set_account_id(identity.numeric_id);
    let _ = store.save();
    Some(identity)
}

#[tauri::command]
pub fn update_account(
    app: AppHandle,
    state: State<'_, AppState>,
) -> Result<Option<AccountIdentity>, String> {
    let identity = resolve_account(&state);
    match &identity {
        Some(id) => log(&app, "INFO", &format!("Active account: {}", id.display_name)),
        None => log(&app, "WARN", "Couldn't resolve the active account"),
    }
    Ok(identity)
}

#[tauri::command]
pub async fn search_lyrics(
    query: String,
    state: State<'_, AppState>,
) -> Result<Vec<LyricsCandidate>, String> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(state.lyrics_client.search(&query).await)
}

/// Fetches the chosen candidate's lyrics text and saves it into the
/// library. Only one save may be in flight at a time.
#[tauri::command]
pub async fn save_lyrics(
    name: String,
    url: String,
    app: AppHandle,
    state: State<'_, AppState>,
) -> Result<String, String> {
    {
        let mut pending = state
            .pending_lyrics
            .lock()
            .map_err(|_| "Failed to lock pending slot")?;
        if pending.is_some() {
            return Err("Aborted. Another download in progress.".to_string());
        }
        *pending = Some(name.clone());
    }

    let fetched = state.lyrics_client.fetch_lyrics(&url).await;

    *state
        .pending_lyrics
        .lock()
        .unwrap_or_else(|e| e.into_inner()) = None;

    let text = fetched.map_err(|e| e.to_string())?;
    let path = lyrics::save_lyrics(&state.paths.lyrics, &name, &text).map_err(|e| e.to_string())?;

    log(&app, "INFO", &format!("Saved lyrics to {}", path.display()));
    Ok(lyrics::sanitize_file_name(&name))
}

/// Downloads a song by name or URL through the external download tool and
/// files the WAV into the library. Returns the stored name on success.
#[tauri::command]
pub async fn download_song(
    request: String,
    app: AppHandle,
    state: State<'_, AppState>,
) -> Result<Option<String>, String> {
    let songs_dir = state.paths.songs.clone();
    let work_dir = state.paths.work.clone();

    let stored = tauri::async_runtime::spawn_blocking(move || {
        downloader::download_song(&songs_dir, &work_dir, &request)
    })
    .await
    .map_err(|e| e.to_string())?
    .map_err(|e| e.to_string())?;

    match &stored {
        Some(name) => log(&app, "INFO", &format!("Song Downloaded: {}", name)),
        None => log(&app, "WARN", "Song Failed to download!"),
    }
    Ok(stored)
}

/// Removes a song's lyric and audio files from the library.
#[tauri::command]
pub fn delete_song(name: String, state: State<'_, AppState>) -> Result<(), String> {
    let lyric = state.paths.lyrics.join(format!("{name}.{LYRICS_EXT}"));
    if lyric.exists() && fs::remove_file(&lyric).is_err() {
        return Err("Permission error!".to_string());
    }

    let audio = state.paths.songs.join(format!("{name}.{AUDIO_EXT}"));
    if audio.exists() {
        let _ = fs::remove_file(&audio);
    }
    Ok(())
}

/// Copies externally chosen lyric text files into the library.
#[tauri::command]
pub fn add_lyrics_files(paths: Vec<String>, state: State<'_, AppState>) -> Result<(), String> {
    for path in paths {
        let source = PathBuf::from(&path);
        let Some(file_name) = source.file_name() else {
            continue;
        };
        let dest = state.paths.lyrics.join(file_name);
        fs::copy(&source, &dest).map_err(|e| e.to_string())?;
    }
    Ok(())
}

#[tauri::command]
pub async fn update_ytdl(app: AppHandle, state: State<'_, AppState>) -> Result<YtdlUpdate, String> {
    let outcome = updater::update_ytdl(&state.http, &state.paths.work).await;
    let message = match outcome {
        YtdlUpdate::Updated => "yt-dlp has been updated!",
        YtdlUpdate::UpToDate => "Skipping. Already up to date!",
        YtdlUpdate::Failed => "Update failed!",
    };
    log(&app, "INFO", message);
    Ok(outcome)
}

#[tauri::command]
pub async fn fetch_release_info(state: State<'_, AppState>) -> Result<ReleaseInfo, String> {
    updater::fetch_release_info(&state.http)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub fn get_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[tauri::command]
pub fn set_update_notification(enabled: bool, state: State<'_, AppState>) -> Result<(), String> {
    let mut store = state.store.lock().map_err(|_| "Failed to lock config")?;
    store.update_notification = enabled;
    store.save().map_err(|e| e.to_string())
}

#[tauri::command]
pub fn get_update_notification(state: State<'_, AppState>) -> Result<bool, String> {
    let store = state.store.lock().map_err(|_| "Failed to lock config")?;
    Ok(store.update_notification)
}

#[cfg(target_os = "windows")]
const UPDATER_BIN: &str = "karaoke-master-update.exe";
#[cfg(not(target_os = "windows"))]
const UPDATER_BIN: &str = "karaoke-master-update";

/// Hands control to the external updater executable and quits.
#[tauri::command]
pub async fn launch_updater(app: AppHandle, state: State<'_, AppState>) -> Result<(), String> {
    let updater = state.paths.work.join(UPDATER_BIN);
    if !updater.exists() {
        return Err(format!(
            "You don't have {}. Download the package from the releases page.",
            UPDATER_BIN
        ));
    }

    {
        let mut store = state.store.lock().map_err(|_| "Failed to lock config")?;
        store.update_notification = false;
        store.save().map_err(|e| e.to_string())?;
    }

    app.shell()
        .command(updater.to_string_lossy().to_string())
        .spawn()
        .map_err(|e| format!("Failed to launch updater: {}", e))?;

    app.exit(0);
    Ok(())
}
