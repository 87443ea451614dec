use std::path::PathBuf;

use kyotest_core::action;

use super::{GlobalArgs, SubcmdResult};
use crate::util;

#[derive(Debug, clap::Args)]
pub struct Args {
    #[arg(short, long)]
    pub lang: Option<String>,

    #[arg(short = 'f', long = "file")]
    pub program_file: Option<PathBuf>,
}

pub async fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let (cfg, work_dir) = util::load_config(global_args)?;
    action::run_program(
        &cfg,
        &work_dir,
        args.lang.as_deref(),
        args.program_file.as_deref(),
    )
    .await
}
