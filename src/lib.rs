pub mod account;
pub mod commands;
pub mod config;
pub mod downloader;
pub mod error;
pub mod library_watcher;
pub mod logging;
pub mod lyrics;
pub mod models;
pub mod poller;
pub mod script_gen;
pub mod song_library;
pub mod updater;

use std::sync::Mutex;

use commands::{AppState, LibraryPaths};
use config::ConfigStore;
use logging::LogState;
use lyrics::LyricsClient;
use tauri::Manager;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_shell::init())
        .setup(|app| {
            let work = std::env::current_dir().expect("failed to get working directory");
            let paths = LibraryPaths {
                lyrics: work.join("lyrics"),
                songs: work.join("songs"),
                config: work.join("config"),
                work,
            };
            for dir in [&paths.lyrics, &paths.songs, &paths.config] {
                std::fs::create_dir_all(dir).expect("failed to create library directory");
            }

            let log_state = LogState::new();
            log_state.init_log_dir();
            app.manage(log_state);

            let store = ConfigStore::load(paths.config.join(config::SETTINGS_FILE));

            library_watcher::start_library_watcher(
                app.handle().clone(),
                paths.lyrics.clone(),
                paths.songs.clone(),
            );

            let http = reqwest::Client::builder()
                .user_agent(concat!("karaoke-master/", env!("CARGO_PKG_VERSION")))
                .build()
                .expect("http client construction cannot fail");

            app.manage(AppState {
                paths,
                store: Mutex::new(store),
                say_mode: Mutex::new(models::SayMode::default()),
                pending_lyrics: Mutex::new(None),
                poller: Mutex::new(None),
                lyrics_client: LyricsClient::new(),
                http,
            });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::refresh_song_list,
            commands::get_configs,
            commands::choose_config_dir,
            commands::choose_config,
            commands::get_key_bindings,
            commands::set_key_bindings,
            commands::get_options,
            commands::set_options,
            commands::set_say_mode,
            commands::start_karaoke,
            commands::stop_karaoke,
            commands::update_account,
            commands::search_lyrics,
            commands::save_lyrics,
            commands::download_song,
            commands::delete_song,
            commands::add_lyrics_files,
            commands::update_ytdl,
            commands::fetch_release_info,
            commands::get_app_version,
            commands::set_update_notification,
            commands::get_update_notification,
            commands::launch_updater,
            logging::get_logs,
            logging::log_from_frontend,
            logging::get_debug_mode,
            logging::set_debug_mode,
            logging::get_log_file_path
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
