use colored::Colorize as _;

use kyotest_core::{action, Config};

use super::{GlobalArgs, SubcmdResult};
use crate::util;

#[derive(Debug, clap::Args)]
pub struct Args {
    /// Show this problem and its cases instead of listing all problems.
    #[arg()] // positional argument
    pub problem_id: Option<String>,
}

pub fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let (cfg, _) = util::load_config(global_args)?;
    match &args.problem_id {
        Some(id) => show(&cfg, id)?,
        None => list(&cfg)?,
    }
    Ok(0)
}

fn list(cfg: &Config) -> anyhow::Result<()> {
    let problems = action::list_problems(cfg)?;
    if problems.is_empty() {
        println!("No problem in {}", cfg.vault_home().to_string_lossy());
        return Ok(());
    }

    let id_width = problems
        .iter()
        .map(|(meta, _)| meta.id.chars().count())
        .max()
        .unwrap_or(0)
        .max(2);
    println!(
        "{}  {}  {}",
        util::pad("ID", id_width).bold(),
        "CASES".bold(),
        "NAME".bold()
    );
    for (meta, num_cases) in problems {
        println!(
            "{}  {:>5}  {}",
            util::pad(&meta.id, id_width),
            num_cases,
            meta.name
        );
    }
    Ok(())
}

fn show(cfg: &Config, problem_id: &str) -> anyhow::Result<()> {
    let problem = action::show_problem(cfg, problem_id)?;
    let meta = &problem.meta;

    println!("{} {}", meta.id.bold(), meta.name);
    for (key, value) in [("url", &meta.url), ("judge", &meta.judge)] {
        if !value.is_empty() {
            println!("{}: {}", key.dimmed(), value);
        }
    }

    for case in &problem.cases {
        println!("\n{}", format!("Case {}", case.index).bright_yellow().bold());
        println!("{}", "[input]".cyan().bold());
        print!("{}", String::from_utf8_lossy(&case.input));
        println!("{}", "[expected]".cyan().bold());
        print!("{}", String::from_utf8_lossy(&case.expected));
    }
    Ok(())
}
