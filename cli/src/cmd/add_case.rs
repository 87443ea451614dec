use std::path::PathBuf;

use kyotest_core::{action, print_success};

use super::{GlobalArgs, SubcmdResult};
use crate::util;

#[derive(Debug, clap::Args)]
pub struct Args {
    #[arg()] // positional argument
    pub problem_id: String,

    /// File with the input of the case.
    #[arg(short, long)]
    pub input: PathBuf,

    /// File with the expected output of the case.
    #[arg(short, long)]
    pub output: PathBuf,
}

pub fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let (cfg, work_dir) = util::load_config(global_args)?;
    let case = action::add_case(
        &cfg,
        &args.problem_id,
        work_dir.join(&args.input),
        work_dir.join(&args.output),
    )?;
    print_success!("Added case {} to '{}'", case.index, args.problem_id);
    Ok(0)
}
