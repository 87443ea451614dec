pub mod add_case;
pub mod init;
pub mod langs;
pub mod new;
pub mod run;
pub mod view;

use std::path::PathBuf;

#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct GlobalArgs {
    #[command(subcommand)]
    pub subcmd: Subcommand,

    /// Log more (-v: debug, -vv: trace). RUST_LOG overrides this.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Run as if started in <DIR>.
    #[arg(short = 'C', long = "dir", global = true)]
    pub work_dir: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    Init(init::Args),
    Langs(langs::Args),
    New(new::Args),
    AddCase(add_case::Args),

    #[command(alias("r"))]
    Run(run::Args),

    #[command(alias("t"))]
    Test(test::Args),

    #[command(alias("v"))]
    View(view::Args),
}

/// Exit code of the process on success.
pub type SubcmdResult = anyhow::Result<u8>;

impl GlobalArgs {
    pub async fn exec_subcmd(&self) -> SubcmdResult {
        use Subcommand::*;
        match &self.subcmd {
            AddCase(args) => add_case::exec(args, self),
            Init(args) => init::exec(args, self),
            Langs(args) => langs::exec(args, self),
            New(args) => new::exec(args, self),
            Run(args) => run::exec(args, self).await,
            Test(args) => test::exec(args, self).await,
            View(args) => view::exec(args, self),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser as _;

    use super::*;

    #[test]
    fn parse_test_subcommand() {
        let args = GlobalArgs::try_parse_from([
            "kyotest", "-vv", "-C", "work", "t", "abc001_a", "-l", "py", "-c", "2", "-t", "1500ms",
            "-j", "4", "--exact",
        ])
        .unwrap();
        assert_eq!(args.verbose, 2);
        assert_eq!(args.work_dir, Some(PathBuf::from("work")));

        let Subcommand::Test(t) = args.subcmd else {
            panic!("not a test subcommand")
        };
        assert_eq!(t.problem_id, "abc001_a");
        assert_eq!(t.lang.as_deref(), Some("py"));
        assert_eq!(t.case, Some(2));
        assert_eq!(t.time_limit, Some(std::time::Duration::from_millis(1500)));
        assert_eq!(t.parallel, Some(4));
        assert!(t.exact);
    }

    #[test]
    fn case_index_starts_from_one() {
        assert!(GlobalArgs::try_parse_from(["kyotest", "test", "x", "-c", "0"]).is_err());
    }
}
