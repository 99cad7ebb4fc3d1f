use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const SETTINGS_FILE: &str = "settings.json";
pub const TRIGGER_FILE: &str = "lyrics_trigger.cfg";

/// Known mod directories: (dir name, game title, platform app id).
const GAME_DIRS: &[(&str, &str, u32)] = &[
    ("csgo", "Counter-Strike: Global Offensive", 730),
    ("cstrike", "Counter-Strike: Source", 240),
    ("tf", "Team Fortress 2", 440),
    ("hl2", "Half-Life 2", 220),
    ("valve", "Half-Life", 70),
    ("left4dead2", "Left 4 Dead 2", 550),
];

fn default_key_bindings() -> Vec<(String, String)> {
    vec![
        ("Voice".to_string(), "n".to_string()),
        ("Lyrics".to_string(), "m".to_string()),
    ]
}

/// One configured game: where its cfg folder lives, what it is called, and
/// the per-game knobs the settings dialogs edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub name: String,
    pub full_name: String,
    /// The cfg folder the generated scripts are written into.
    pub path: PathBuf,
    /// The folder the staged voice-input file goes to.
    pub game_path: PathBuf,
    pub app_id: Option<u32>,
    /// Full path of the trigger state file for titles that persist their
    /// config under the platform's per-user data tree.
    pub user_data_path: Option<PathBuf>,
    pub key_bindings: Vec<(String, String)>,
    /// Machine-speed tier label driving the poll interval.
    pub pc: String,
    pub always_download: bool,
}

impl ConfigEntry {
    /// Builds an entry from a user-chosen cfg folder, or `None` when the
    /// folder is neither named `cfg` nor contains a `config.cfg`.
    pub fn from_cfg_dir(dir: &Path) -> Option<Self> {
        if !is_valid_cfg_dir(dir) {
            return None;
        }

        let game_path = if dir.file_name().is_some_and(|n| n == "cfg") {
            dir.parent().unwrap_or(dir).to_path_buf()
        } else {
            dir.to_path_buf()
        };

        let mod_dir = game_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let known = GAME_DIRS.iter().find(|(d, _, _)| *d == mod_dir);
        let full_name = known
            .map(|(_, title, _)| (*title).to_string())
            .unwrap_or_else(|| mod_dir.clone());
        let app_id = known.map(|(_, _, id)| *id);

        Some(Self {
            name: mod_dir,
            full_name,
            path: dir.to_path_buf(),
            game_path,
            app_id,
            user_data_path: None,
            key_bindings: default_key_bindings(),
            pc: "Average".to_string(),
            always_download: false,
        })
    }

    /// Where the game drops the trigger state file after the persist
    /// command fires. The legacy title writes next to its game folder;
    /// everything else goes through the per-user data tree when known.
    pub fn trigger_path(&self) -> PathBuf {
        if self.full_name == "Half-Life" {
            return self.game_path.join(TRIGGER_FILE);
        }
        self.user_data_path
            .clone()
            .unwrap_or_else(|| self.path.join(TRIGGER_FILE))
    }

    /// Recomputes the per-user trigger location once the account id is
    /// known: `<steam root>/userdata/<account>/<app id>/local/cfg/`.
    pub fn refresh_user_data_path(&mut self, account_id: u32) {
        let (Some(root), Some(app_id)) = (steam_root_of(&self.path), self.app_id) else {
            return;
        };
        self.user_data_path = Some(
            root.join("userdata")
                .join(account_id.to_string())
                .join(app_id.to_string())
                .join("local")
                .join("cfg")
                .join(TRIGGER_FILE),
        );
    }

}

pub fn is_valid_cfg_dir(dir: &Path) -> bool {
    dir.file_name().is_some_and(|n| n == "cfg") || dir.join("config.cfg").exists()
}

/// Walks up to the platform install root: everything before the
/// `steamapps` path component.
pub fn steam_root_of(path: &Path) -> Option<PathBuf> {
    let mut root = PathBuf::new();
    for component in path.components() {
        if let Component::Normal(name) = component {
            if name == "steamapps" {
                return Some(root);
            }
        }
        root.push(component);
    }
    None
}

/// All configured games plus app-wide state, persisted as JSON under the
/// local `config/` folder. Loaded once at startup, saved after every edit.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigStore {
    entries: Vec<ConfigEntry>,
    current: Option<String>,
    pub account_id: Option<u32>,
    pub update_notification: bool,
    #[serde(skip)]
    settings_path: PathBuf,
}

impl ConfigStore {
    pub fn load(settings_path: PathBuf) -> Self {
        let mut store = fs::read_to_string(&settings_path)
            .ok()
            .and_then(|data| serde_json::from_str::<ConfigStore>(&data).ok())
            .unwrap_or_default();
        store.settings_path = settings_path;
        store
    }

    pub fn save(&self) -> Result<(), AppError> {
        if let Some(parent) = self.settings_path.parent() {
            fs::create_dir_all(parent).map_err(|e| AppError::file_access(parent, e))?;
        }
        let data = serde_json::to_string_pretty(self)
            .map_err(|_| AppError::Parse { what: "settings" })?;
        fs::write(&self.settings_path, data)
            .map_err(|e| AppError::file_access(&self.settings_path, e))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ConfigEntry] {
        &self.entries
    }

    /// Adds or replaces the entry for the same game and makes it current.
    pub fn add_entry(&mut self, entry: ConfigEntry) {
        self.current = Some(entry.name.clone());
        if let Some(existing) = self.entries.iter_mut().find(|e| e.name == entry.name) {
            *existing = entry;
        } else {
            self.entries.push(entry);
        }
    }

    pub fn choose(&mut self, name: &str) -> bool {
        if self.entries.iter().any(|e| e.name == name) {
            self.current = Some(name.to_string());
            true
        } else {
            false
        }
    }

    pub fn current(&self) -> Option<&ConfigEntry> {
        let name = self.current.as_deref()?;
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn current_mut(&mut self) -> Option<&mut ConfigEntry> {
        let name = self.current.clone()?;
        self.entries.iter_mut().find(|e| e.name == name)
    }

    /// Records the resolved account and refreshes every entry's per-user
    /// trigger location.
    pub fn set_account_id(&mut self, account_id: u32) {
        self.account_id = Some(account_id);
        for entry in &mut self.entries {
            entry.refresh_user_data_path(account_id);
        }
    }
}
