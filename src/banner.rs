//! Startup banner and session summary display.

use std::path::Path;
use std::time::Duration;

use crate::consts::{HOMEPAGE, REPO, format_number};
use crate::gateway::RouteStats;

/// Session configuration for display in the startup banner.
pub struct BannerInfo<'a> {
    pub config: &'a Path,
    pub connectors: &'a [&'a str],
    pub connect_timeout: Option<Duration>,
    pub max_attempts: u32,
    pub journal: &'a str,
}

pub fn banner_text(info: &BannerInfo) -> String {
    let timeout = match info.connect_timeout {
        Some(t) => format!("{}s", t.as_secs()),
        None => "none".to_string(),
    };
    format!(
        r#"
   ╔═══════════════════════════════════════╗
   ║               G A T E                 ║
   ║   one door, many connectors behind it ║
   ╚═══════════════════════════════════════╝

   version     {}
   home        {}
   repo        {}
   config      {}
   connectors  {}
   timeout     {}
   attempts    {}
   journal     {}
"#,
        env!("CARGO_PKG_VERSION"),
        HOMEPAGE,
        REPO,
        info.config.display(),
        info.connectors.join(", "),
        timeout,
        info.max_attempts,
        info.journal,
    )
}

/// Print the startup banner with session info.
pub fn print_banner(info: &BannerInfo) {
    println!("{}", banner_text(info));
}

pub fn summary_text(stats: RouteStats) -> String {
    format!(
        "session: {} routed ({} connected, {} failed)",
        format_number(stats.total),
        format_number(stats.connected),
        format_number(stats.failed),
    )
}

/// Print the session summary (route counts + farewell).
pub fn print_session_summary(stats: RouteStats) {
    if stats.total > 0 {
        println!("{}", summary_text(stats));
    }
    println!("goodbye.");
}
