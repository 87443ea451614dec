use colored::Colorize as _;

use super::{GlobalArgs, SubcmdResult};
use crate::util;

#[derive(Debug, clap::Args)]
pub struct Args {}

pub fn exec(_: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let (cfg, _) = util::load_config(global_args)?;
    let default_lang = cfg.select_lang(None).ok();

    if cfg.lang.is_empty() {
        log::warn!("No language is configured; add [lang.<name>] tables to the config");
    }

    for (lang, profile) in cfg.lang.iter() {
        let mark = if Some(lang) == default_lang { " (default)" } else { "" };
        println!(
            "{}{} {}",
            lang.to_string().bold(),
            mark.green(),
            profile.pattern.as_str().dimmed()
        );
        if let Some(compile) = &profile.compile {
            println!("  compile: {}", compile);
        }
        println!("  run:     {}", profile.run);
    }
    Ok(0)
}
