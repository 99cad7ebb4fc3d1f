use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::error::AppError;
use crate::models::{SayMode, SongRecord};
use crate::song_library::LYRICS_EXT;

/// File names the game executes from its cfg folder.
pub const TRACKLIST_FILE: &str = "lyrics_list.cfg";
pub const MASTER_FILE: &str = "lyricsmaster.cfg";

/// The single physical key every song-selection alias rebinds to re-arm
/// itself. The rebinding also leaves the `bind "=" "<index>"` trace in the
/// persisted config that the poller later reads back.
pub const RELAY_KEY: char = '=';

const BANNER: &str = "echo \"--------------------------------------------------------\"\n";

/// Emits both script artifacts for the given song list.
///
/// The tracklist is an `echo` listing of every song by 1-based index; the
/// master script is the alias chain that walks lyric lines and swaps the
/// shared `spamycs` dispatch alias forward on every press. Lyric files are
/// read from `lyrics_dir`; a song whose lyric file cannot be opened gets no
/// chain, only its selection alias.
pub fn generate(
    songs: &[SongRecord],
    bindings: &[(String, String)],
    say: SayMode,
    game_title: &str,
    lyrics_dir: &Path,
) -> (String, String) {
    (
        tracklist(songs),
        master(songs, bindings, say, game_title, lyrics_dir),
    )
}

pub fn tracklist(songs: &[SongRecord]) -> String {
    let mut out = String::from("exec lyricsmaster.cfg;\n");
    out.push_str(BANNER);
    for (idx, song) in songs.iter().enumerate() {
        let _ = writeln!(out, "echo \"song{}: {}\"", idx + 1, song.name);
    }
    out.push_str(BANNER);
    out
}

pub fn master(
    songs: &[SongRecord],
    bindings: &[(String, String)],
    say: SayMode,
    game_title: &str,
    lyrics_dir: &Path,
) -> String {
    let say = say.command();
    let write_cfg = persist_command(game_title);
    let mut out = preamble(bindings);

    for (idx, song) in songs.iter().enumerate() {
        let id = idx + 1;
        push_song_chain(&mut out, id, &song.name, lyrics_dir, say);
        push_song_selector(&mut out, id, &song.name, say, write_cfg);
    }
    out
}

/// The in-game persist-settings command; one legacy title uses another token.
pub fn persist_command(game_title: &str) -> &'static str {
    if game_title == "Half-Life" {
        "writecfg"
    } else {
        "host_writeconfig"
    }
}

/// Global preamble: the initial `spamycs` hint, the self-redefining
/// voice-capture toggle pair (the engine has no boolean state, so the
/// "button" is an alias that swaps its own definition), and the two key
/// binds handed over from the settings dialog.
fn preamble(bindings: &[(String, String)]) -> String {
    let mut voice_command = "";
    let mut lyrics_command = "";
    for (action, key) in bindings {
        if action == "Voice" {
            voice_command = key;
        } else if action == "Lyrics" {
            lyrics_command = key;
        }
    }

    format!(
        "alias spamycs say_team \"type exec lyrics_list.cfg in \
         the console to see list with available songs\"\nalias \
         karaoke_play karaoke_play_on\nalias karaoke_play_on \
         \"alias karaoke_play karaoke_play_off;\
         voice_inputfromfile 1;voice_loopback 1;+voicerecord\"\n\
         alias karaoke_play_off \"-voicerecord; \
         voice_inputfromfile 0; voice_loopback 0; alias \
         karaoke_play karaoke_play_on\";\
         bind {voice_command} \"karaoke_play\";bind {lyrics_command} spamycs\n"
    )
}

/// One alias per non-blank lyric line, each chaining `spamycs` to the next,
/// closed by the terminal alias after the last real line. Double quotes are
/// the script language's string delimiter, so they are stripped from lyric
/// text before embedding.
fn push_song_chain(out: &mut String, id: usize, name: &str, lyrics_dir: &Path, say: &str) {
    let path = lyrics_dir.join(format!("{name}.{LYRICS_EXT}"));
    let Ok(text) = fs::read_to_string(&path) else {
        return;
    };

    let mut j = 0usize;
    for raw in text.lines() {
        let line = raw.replace('"', "");
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let next = j + 1;
        let _ = writeln!(
            out,
            "alias song{id}lyrics{j} \"{say} ~ {line} ;alias spamycs song{id}lyrics{next}\""
        );
        j = next;
    }

    let _ = writeln!(out, "alias song{id}lyrics{j} {say} \"---THE END---\";");
}

/// Selecting a song rewinds the chain cursor to line 0, rebinds the relay
/// key to itself, points the announce alias at this song, and fires the
/// persist command tagged `lyrics_trigger` so the game writes the state file
/// the poller consumes.
fn push_song_selector(out: &mut String, id: usize, name: &str, say: &str, write_cfg: &str) {
    let _ = writeln!(
        out,
        "alias say_song{id} \"{say} Current Song: {name}\";\
         alias song{id} \"alias spamycs song{id}lyrics0;\
         bind {RELAY_KEY} {id}; alias lyrics_current say_song{id};\
         {write_cfg} lyrics_trigger;"
    );
}

/// Overwrites both script files in full; nothing is patched incrementally.
pub fn write_scripts(cfg_dir: &Path, tracklist: &str, master: &str) -> Result<(), AppError> {
    let list_path = cfg_dir.join(TRACKLIST_FILE);
    fs::write(&list_path, tracklist).map_err(|e| AppError::file_access(&list_path, e))?;
    let master_path = cfg_dir.join(MASTER_FILE);
    fs::write(&master_path, master).map_err(|e| AppError::file_access(&master_path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn bindings() -> Vec<(String, String)> {
        vec![
            ("Voice".to_string(), "n".to_string()),
            ("Lyrics".to_string(), "m".to_string()),
        ]
    }

    fn write_lyrics(dir: &TempDir, name: &str, text: &str) {
        let mut f = File::create(dir.path().join(format!("{name}.txt"))).unwrap();
        f.write_all(text.as_bytes()).unwrap();
    }

    fn songs(names: &[&str]) -> Vec<SongRecord> {
        names
            .iter()
            .map(|n| SongRecord {
                name: n.to_string(),
                has_lyrics: true,
                has_audio: true,
            })
            .collect()
    }

    #[test]
    fn tracklist_lists_every_song_by_one_based_index() {
        let text = tracklist(&songs(&["alpha", "beta"]));
        let expected = "exec lyricsmaster.cfg;\n\
             echo \"--------------------------------------------------------\"\n\
             echo \"song1: alpha\"\n\
             echo \"song2: beta\"\n\
             echo \"--------------------------------------------------------\"\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn master_preamble_binds_configured_keys() {
        let lyrics = TempDir::new().unwrap();
        let text = master(&[], &bindings(), SayMode::PublicChat, "Counter-Strike: Global Offensive", lyrics.path());
        assert!(text.contains("bind n \"karaoke_play\""));
        assert!(text.contains("bind m spamycs"));
        assert!(text.contains("alias karaoke_play karaoke_play_on"));
        assert!(text.contains(
            "alias karaoke_play_on \"alias karaoke_play karaoke_play_off;\
             voice_inputfromfile 1;voice_loopback 1;+voicerecord\""
        ));
        assert!(text.contains(
            "alias karaoke_play_off \"-voicerecord; voice_inputfromfile 0; \
             voice_loopback 0; alias karaoke_play karaoke_play_on\""
        ));
    }

    #[test]
    fn chain_walks_lines_and_ends_with_terminal_alias() {
        let lyrics = TempDir::new().unwrap();
        write_lyrics(&lyrics, "ballad", "first line\nsecond line\n");

        let text = master(
            &songs(&["ballad"]),
            &bindings(),
            SayMode::PublicChat,
            "Team Fortress 2",
            lyrics.path(),
        );

        assert!(text.contains(
            "alias song1lyrics0 \"say ~ first line ;alias spamycs song1lyrics1\"\n"
        ));
        assert!(text.contains(
            "alias song1lyrics1 \"say ~ second line ;alias spamycs song1lyrics2\"\n"
        ));
        assert!(text.contains("alias song1lyrics2 say \"---THE END---\";\n"));
    }

    #[test]
    fn blank_lines_do_not_consume_an_index() {
        let lyrics = TempDir::new().unwrap();
        write_lyrics(&lyrics, "gappy", "one\n\n   \n\ntwo\n");

        let text = master(
            &songs(&["gappy"]),
            &bindings(),
            SayMode::PublicChat,
            "x",
            lyrics.path(),
        );

        assert!(text.contains("alias song1lyrics0 \"say ~ one ;alias spamycs song1lyrics1\""));
        assert!(text.contains("alias song1lyrics1 \"say ~ two ;alias spamycs song1lyrics2\""));
        assert!(text.contains("alias song1lyrics2 say \"---THE END---\";"));
    }

    #[test]
    fn double_quotes_are_stripped_from_lyric_lines() {
        let lyrics = TempDir::new().unwrap();
        write_lyrics(&lyrics, "quoted", "she said \"hello\" twice\n");

        let text = master(
            &songs(&["quoted"]),
            &bindings(),
            SayMode::PublicChat,
            "x",
            lyrics.path(),
        );

        assert!(text.contains("say ~ she said hello twice ;"));
        // Every body between the alias delimiters carries no stray quote.
        let line = text
            .lines()
            .find(|l| l.starts_with("alias song1lyrics0"))
            .unwrap();
        let body = &line["alias song1lyrics0 \"".len()..line.len() - 1];
        assert!(!body.contains('"'));
    }

    #[test]
    fn team_chat_mode_uses_say_team() {
        let lyrics = TempDir::new().unwrap();
        write_lyrics(&lyrics, "anthem", "line\n");

        let text = master(
            &songs(&["anthem"]),
            &bindings(),
            SayMode::TeamChat,
            "x",
            lyrics.path(),
        );

        assert!(text.contains("alias song1lyrics0 \"say_team ~ line ;"));
        assert!(text.contains("alias song1lyrics1 say_team \"---THE END---\";"));
        assert!(text.contains("alias say_song1 \"say_team Current Song: anthem\";"));
    }

    #[test]
    fn selector_rewinds_rearms_and_persists() {
        let lyrics = TempDir::new().unwrap();
        write_lyrics(&lyrics, "anthem", "line\n");

        let text = master(
            &songs(&["anthem"]),
            &bindings(),
            SayMode::PublicChat,
            "Counter-Strike: Global Offensive",
            lyrics.path(),
        );

        let expected = "alias say_song1 \"say Current Song: anthem\";\
             alias song1 \"alias spamycs song1lyrics0;\
             bind = 1; alias lyrics_current say_song1;\
             host_writeconfig lyrics_trigger;\n";
        assert!(text.contains(expected));
    }

    #[test]
    fn legacy_title_uses_writecfg_token() {
        let lyrics = TempDir::new().unwrap();
        let text = master(
            &songs(&["old"]),
            &bindings(),
            SayMode::PublicChat,
            "Half-Life",
            lyrics.path(),
        );
        assert!(text.contains("writecfg lyrics_trigger;"));
        assert!(!text.contains("host_writeconfig"));
    }

    #[test]
    fn alias_counts_match_song_and_line_totals() {
        let lyrics = TempDir::new().unwrap();
        write_lyrics(&lyrics, "a", "1\n2\n3\n");
        write_lyrics(&lyrics, "b", "only\n");
        // "c" has no lyric file at all.

        let list = songs(&["a", "b", "c"]);
        let text = master(&list, &bindings(), SayMode::PublicChat, "x", lyrics.path());

        let selection_count = (1..=list.len())
            .filter(|i| text.contains(&format!("alias song{i} \"")))
            .count();
        assert_eq!(selection_count, 3);

        let line_alias_count = text
            .lines()
            .filter(|l| l.contains(";alias spamycs song"))
            .count();
        assert_eq!(line_alias_count, 4); // 3 + 1 non-blank lines in total

        let terminal_count = text.matches("---THE END---").count();
        assert_eq!(terminal_count, 2); // only songs whose lyric file opened
    }

    #[test]
    fn missing_lyric_file_still_gets_selection_alias() {
        let lyrics = TempDir::new().unwrap();
        let text = master(
            &songs(&["ghost"]),
            &bindings(),
            SayMode::PublicChat,
            "x",
            lyrics.path(),
        );
        assert!(text.contains("alias song1 \"alias spamycs song1lyrics0;"));
        assert!(!text.contains("song1lyrics0 \"say"));
        assert!(!text.contains("---THE END---"));
    }

    #[test]
    fn regeneration_is_byte_identical() {
        let lyrics = TempDir::new().unwrap();
        write_lyrics(&lyrics, "stable", "la la la\nla\n");
        let list = songs(&["stable"]);

        let first = generate(&list, &bindings(), SayMode::TeamChat, "Half-Life", lyrics.path());
        let second = generate(&list, &bindings(), SayMode::TeamChat, "Half-Life", lyrics.path());
        assert_eq!(first, second);
    }

    // Duplicate sanitized names are not deduplicated: both blocks are
    // emitted and the later aliases overwrite the earlier ones in-game.
    // Pinned here as known behavior, not fixed.
    #[test]
    fn duplicate_names_collide_last_writer_wins() {
        let lyrics = TempDir::new().unwrap();
        write_lyrics(&lyrics, "twin", "line\n");

        let list = songs(&["twin", "twin"]);
        let text = master(&list, &bindings(), SayMode::PublicChat, "x", lyrics.path());

        assert!(text.contains("alias song1 \""));
        assert!(text.contains("alias song2 \""));
        // Both chains read the same lyric file; the emitted text keeps both.
        assert_eq!(text.matches("---THE END---").count(), 2);
    }

    #[test]
    fn write_scripts_overwrites_in_full() {
        let cfg = TempDir::new().unwrap();
        write_scripts(cfg.path(), "long old tracklist content\n", "old master\n").unwrap();
        write_scripts(cfg.path(), "new\n", "m\n").unwrap();

        let list = std::fs::read_to_string(cfg.path().join(TRACKLIST_FILE)).unwrap();
        let master = std::fs::read_to_string(cfg.path().join(MASTER_FILE)).unwrap();
        assert_eq!(list, "new\n");
        assert_eq!(master, "m\n");
    }
}
