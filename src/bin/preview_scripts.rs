use std::env;
use std::path::Path;

use karaoke_master_lib::models::SayMode;
use karaoke_master_lib::script_gen;
use karaoke_master_lib::song_library::build_list;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        println!("Usage: preview_scripts <lyrics_dir> <songs_dir> [game_title] [--team]");
        return;
    }

    let lyrics_dir = Path::new(&args[1]);
    let songs_dir = Path::new(&args[2]);
    let game_title = args
        .iter()
        .skip(3)
        .find(|a| !a.starts_with("--"))
        .map(String::as_str)
        .unwrap_or("Counter-Strike: Global Offensive");
    let say = if args.iter().any(|a| a == "--team") {
        SayMode::TeamChat
    } else {
        SayMode::PublicChat
    };

    let songs = build_list(lyrics_dir, songs_dir);
    println!("Found {} songs", songs.len());

    let bindings = vec![
        ("Voice".to_string(), "n".to_string()),
        ("Lyrics".to_string(), "m".to_string()),
    ];

    let (tracklist, master) = script_gen::generate(&songs, &bindings, say, game_title, lyrics_dir);

    println!("--- {} ---", script_gen::TRACKLIST_FILE);
    print!("{}", tracklist);
    println!("--- {} ---", script_gen::MASTER_FILE);
    print!("{}", master);
}
