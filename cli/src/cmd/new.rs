use kyotest_core::{action, model::ProblemMeta, print_success};

use super::{GlobalArgs, SubcmdResult};
use crate::util;

#[derive(Debug, clap::Args)]
pub struct Args {
    #[arg()] // positional argument
    pub problem_id: String,

    #[arg(long, default_value = "")]
    pub name: String,

    #[arg(long, default_value = "")]
    pub url: String,

    #[arg(long, default_value = "")]
    pub judge: String,
}

pub fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let (cfg, _) = util::load_config(global_args)?;
    let meta = ProblemMeta {
        id: args.problem_id.clone(),
        name: args.name.clone(),
        url: args.url.clone(),
        judge: args.judge.clone(),
    };
    let loc = action::new_problem(&cfg, &meta)?;
    print_success!(
        "Created problem '{}' at {}",
        meta.id,
        loc.dir().to_string_lossy()
    );
    Ok(0)
}
