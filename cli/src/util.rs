use std::{path::PathBuf, process::exit};

use kyotest_core::Config;

use crate::cmd::GlobalArgs;

pub fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|e| {
        eprintln!("Failed to get current dir: {}", e);
        exit(1);
    })
}

/// `-C <dir>` resolved against the current dir.
pub fn work_dir(global_args: &GlobalArgs) -> PathBuf {
    let cur = current_dir();
    match &global_args.work_dir {
        Some(dir) => cur.join(dir),
        None => cur,
    }
}

pub fn load_config(global_args: &GlobalArgs) -> anyhow::Result<(Config, PathBuf)> {
    let dir = work_dir(global_args);
    let cfg = Config::from_file_finding_in_ancestors(&dir)?;
    log::debug!("Loaded {:?}", cfg.source_config_file);
    Ok((cfg, dir))
}

/// Pads `s` to `width` columns, counting chars.
pub fn pad(s: &str, width: usize) -> String {
    let len = s.chars().count();
    format!("{}{}", s, " ".repeat(width.saturating_sub(len)))
}
