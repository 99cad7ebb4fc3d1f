use std::path::PathBuf;
use std::sync::mpsc::channel;
use std::thread;
use std::time::{Duration, Instant};

use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use tauri::{AppHandle, Emitter, Manager};

/// Emitted whenever the lyrics or songs directory content settles after a
/// change, so the frontend can refresh the song table without the user
/// pressing refresh.
pub const LIBRARY_CHANGED_EVENT: &str = "song-library-changed";

const DEBOUNCE: Duration = Duration::from_secs(2);

/// Watches the library directories on a background thread. This is UI
/// convenience only — the trigger-file mailbox is drained by the scheduled
/// poller, never by a watch.
pub fn start_library_watcher(app: AppHandle, lyrics_dir: PathBuf, songs_dir: PathBuf) {
    thread::spawn(move || {
        let (tx, rx) = channel();

        let mut watcher = match RecommendedWatcher::new(tx, Config::default()) {
            Ok(w) => w,
            Err(e) => {
                eprintln!("failed to create library watcher: {}", e);
                return;
            }
        };

        for dir in [&lyrics_dir, &songs_dir] {
            if let Err(e) = watcher.watch(dir, RecursiveMode::NonRecursive) {
                eprintln!("[WATCHER] failed to watch {:?}: {}", dir, e);
            }
        }

        let mut last_emit = Instant::now().checked_sub(DEBOUNCE).unwrap_or_else(Instant::now);

        loop {
            match rx.recv() {
                Ok(Ok(event)) => {
                    // Partial downloads and editor temp files churn a lot;
                    // only finished library files matter.
                    let relevant = event.paths.iter().any(|p| {
                        let s = p.to_string_lossy();
                        !s.ends_with(".part") && !s.ends_with(".tmp")
                    });
                    if !relevant {
                        continue;
                    }

                    if last_emit.elapsed() >= DEBOUNCE {
                        last_emit = Instant::now();
                        let _ = app.emit(LIBRARY_CHANGED_EVENT, ());
                        app.state::<crate::logging::LogState>().add_log(
                            "DEBUG",
                            &format!("Library change detected: {:?}", event.kind),
                            &app,
                        );
                    }
                }
                Ok(Err(e)) => eprintln!("[WATCHER] watch error: {:?}", e),
                Err(e) => {
                    eprintln!("[WATCHER] channel closed: {:?}", e);
                    break;
                }
            }
        }
    });
}
