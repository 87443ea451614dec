use kyotest_core::{action, print_success};
use std::path::PathBuf;

use super::{GlobalArgs, SubcmdResult};
use crate::util;

#[derive(Debug, clap::Args)]
pub struct Args {
    #[arg(default_value = "./")]
    dir: PathBuf,
}

pub fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let dir = util::work_dir(global_args).join(&args.dir);
    let config_file = action::init_repository(&dir)?;
    print_success!(
        "Successfully initialized kyotest directory. (config: {})",
        config_file.to_string_lossy()
    );
    Ok(0)
}
