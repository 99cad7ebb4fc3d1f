use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SongRecord {
    pub name: String, // Base file name, no directory, no extension
    pub has_lyrics: bool,
    pub has_audio: bool,
}

impl SongRecord {
    pub fn audio_only(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            has_lyrics: false,
            has_audio: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AccountIdentity {
    pub display_name: String,
    /// Low 32 bits of the 64-bit platform id.
    pub numeric_id: u32,
}

/// Which chat command displays lyric lines in-game.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum SayMode {
    TeamChat,
    #[default]
    PublicChat,
}

impl SayMode {
    pub fn command(self) -> &'static str {
        match self {
            SayMode::TeamChat => "say_team",
            SayMode::PublicChat => "say",
        }
    }
}
