use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::AccountIdentity;

/// One login block: a quoted 64-bit id opening a brace block that carries
/// the account name and the most-recent flag, in that order.
static LOGIN_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)"(?P<id64>\d+)"\s+?\{\s+?"AccountName"\s+?"(?P<name>.+?)".+?"MostRecent"\s+"(?P<recent>\d)".+?\}"#,
    )
    .expect("login block pattern is valid")
});

/// Recovers the active account identity from the login-state file.
///
/// The first block flagged `MostRecent "1"` wins; later matches are ignored
/// even if also flagged. The 64-bit platform id is truncated to its low 32
/// bits, the game's internal account id space. An unreadable file or a blob
/// with no flagged block resolves to nothing — callers tolerate that.
pub fn resolve(login_state_path: &Path) -> Option<AccountIdentity> {
    let data = fs::read_to_string(login_state_path).ok()?;
    resolve_from_str(&data)
}

pub fn resolve_from_str(data: &str) -> Option<AccountIdentity> {
    for caps in LOGIN_BLOCK.captures_iter(data) {
        if &caps["recent"] != "1" {
            continue;
        }
        let id64: u64 = caps["id64"].parse().ok()?;
        return Some(AccountIdentity {
            display_name: caps["name"].to_string(),
            numeric_id: (id64 & 0xFFFF_FFFF) as u32,
        });
    }
    None
}

/// The login-state file lives beside the Steam install's config folder.
pub fn login_state_path(steam_root: &Path) -> PathBuf {
    steam_root.join("config").join("loginusers.vdf")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob() -> String {
        concat!(
            "\"users\"\n",
            "{\n",
            "\t\"76561197990605696\"\n",
            "\t{\n",
            "\t\t\"AccountName\"\t\t\"first_user\"\n",
            "\t\t\"PersonaName\"\t\t\"First\"\n",
            "\t\t\"RememberPassword\"\t\t\"1\"\n",
            "\t\t\"MostRecent\"\t\t\"0\"\n",
            "\t\t\"Timestamp\"\t\t\"1650000000\"\n",
            "\t}\n",
            "\t\"76561198012345678\"\n",
            "\t{\n",
            "\t\t\"AccountName\"\t\t\"second_user\"\n",
            "\t\t\"PersonaName\"\t\t\"Second\"\n",
            "\t\t\"RememberPassword\"\t\t\"1\"\n",
            "\t\t\"MostRecent\"\t\t\"1\"\n",
            "\t\t\"Timestamp\"\t\t\"1660000000\"\n",
            "\t}\n",
            "}\n",
        )
        .to_string()
    }

    #[test]
    fn picks_the_block_flagged_most_recent() {
        let identity = resolve_from_str(&blob()).unwrap();
        assert_eq!(identity.display_name, "second_user");
        // 76561198012345678 & 0xFFFFFFFF
        assert_eq!(identity.numeric_id, (76561198012345678u64 & 0xFFFF_FFFF) as u32);
    }

    #[test]
    fn first_flagged_block_wins_over_later_ones() {
        let mut data = blob();
        // Flag the first block too; scanning stops at the first match.
        data = data.replacen("\"MostRecent\"\t\t\"0\"", "\"MostRecent\"\t\t\"1\"", 1);
        let identity = resolve_from_str(&data).unwrap();
        assert_eq!(identity.display_name, "first_user");
    }

    #[test]
    fn no_flagged_block_resolves_to_nothing() {
        let data = blob().replace("\"MostRecent\"\t\t\"1\"", "\"MostRecent\"\t\t\"0\"");
        assert!(resolve_from_str(&data).is_none());
    }

    #[test]
    fn unreadable_file_resolves_to_nothing() {
        assert!(resolve(Path::new("/definitely/not/here/loginusers.vdf")).is_none());
    }

    #[test]
    fn id_is_masked_to_low_32_bits() {
        let data = concat!(
            "\"4294967297\"\n", // 2^32 + 1
            "{\n",
            "\t\"AccountName\"\t\"edge\"\n",
            "\t\"MostRecent\"\t\"1\"\n",
            "}\n",
        );
        let identity = resolve_from_str(data).unwrap();
        assert_eq!(identity.numeric_id, 1);
    }
}
