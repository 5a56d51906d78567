//! Project-wide constants.

use std::path::PathBuf;

pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
pub const HOMEPAGE: &str = env!("CARGO_PKG_HOMEPAGE");
pub const REPO: &str = env!("CARGO_PKG_REPOSITORY");

/// Default upper bound on a single connect call.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Pause between retries of a failed connect.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 200;

/// Journal entries shown by `gate history` when no limit is given.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// `~/.gate`, or the current directory if there is no home.
pub fn home_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".gate")
}

/// Default settings file: `~/.gate/gate.json`.
pub fn default_config_path() -> PathBuf {
    home_dir().join("gate.json")
}

/// Default journal database: `~/.gate/journal.db`.
pub fn default_journal_path() -> PathBuf {
    home_dir().join("journal.db")
}

/// Format a number with comma separators (e.g. 1,234,567).
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i).is_multiple_of(3) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consts_from_cargo_toml() {
        assert!(!AUTHOR.is_empty());
        assert!(REPO.contains("gate"));
        assert!(!HOMEPAGE.is_empty());
    }

    #[test]
    fn default_paths_live_under_home_dir() {
        assert!(default_config_path().starts_with(home_dir()));
        assert!(default_journal_path().ends_with("journal.db"));
    }

    #[test]
    fn format_number_small() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
    }

    #[test]
    fn format_number_thousands() {
        assert_eq!(format_number(1_000), "1,000");
        assert_eq!(format_number(123_456), "123,456");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }
}
