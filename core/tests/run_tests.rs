#![cfg(unix)]

use std::path::Path;
use std::time::Duration;

use kyotest_core::{
    action::{self, TestArgs},
    model::{Problem, ProblemMeta, SampleCase},
    storage::ProblemStore,
    testing::{ProcessStatus, SessionOutcome, SessionReport, Verdict},
    Config,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const CONFIG: &str = r##"
[repository]
vault_home = "problems"

[test]
default_lang = "sh"
time_limit = "2s"
compile_time_limit = "5s"

[lang.sh]
pattern = "main.sh"
compile = "sh -n #{filePath}"
run = "sh #{filePath}"

[lang.c]
pattern = "main.c"
run = "#{fileDir}/no-such-binary"
"##;

const SUM: &str = "read a b\necho $((a + b))\n";

struct Fixture {
    dir: TempDir,
    cfg: Config,
}

impl Fixture {
    fn new(program: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        fsutil::write(dir.path().join(Config::FILENAME), CONFIG).unwrap();
        fsutil::write(dir.path().join("main.sh"), program).unwrap();

        let cfg = Config::from_file_finding_in_ancestors(dir.path()).unwrap();
        ProblemStore::new(cfg.vault_home())
            .save_problem(&Problem {
                meta: ProblemMeta {
                    id: "sum".to_owned(),
                    name: "A + B".to_owned(),
                    url: String::new(),
                    judge: String::new(),
                },
                cases: vec![
                    SampleCase::new(1, "1 2\n", "3\n"),
                    SampleCase::new(2, "10 20\n", "30\n"),
                    SampleCase::new(3, "5 5\n", "11\n"),
                ],
            })
            .unwrap();
        Self { dir, cfg }
    }

    fn work_dir(&self) -> &Path {
        self.dir.path()
    }

    async fn run(&self, args: TestArgs<'_>) -> anyhow::Result<(SessionReport, u8)> {
        action::run_tests(
            &self.cfg,
            self.work_dir(),
            TestArgs {
                problem_id: "sum",
                ..args
            },
        )
        .await
    }
}

fn verdicts(report: &SessionReport) -> Vec<(u32, Verdict)> {
    report
        .results()
        .iter()
        .map(|r| (r.case_index, r.verdict))
        .collect()
}

#[tokio::test]
async fn every_case_is_judged_in_order() {
    let fx = Fixture::new(SUM);
    let (report, code) = fx.run(TestArgs::default()).await.unwrap();

    assert_eq!(
        verdicts(&report),
        [(1, Verdict::AC), (2, Verdict::AC), (3, Verdict::WA)]
    );
    assert_eq!(code, 1);
    assert_eq!(report.results()[2].stdout, b"10\n");
    assert_eq!(report.results()[2].expected, b"11\n");
}

#[tokio::test]
async fn parallel_run_gives_the_same_verdicts() {
    let fx = Fixture::new(SUM);
    let (report, _) = fx
        .run(TestArgs {
            parallel: Some(3),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(
        verdicts(&report),
        [(1, Verdict::AC), (2, Verdict::AC), (3, Verdict::WA)]
    );
}

#[tokio::test]
async fn selected_case_only() {
    let fx = Fixture::new(SUM);
    let (report, code) = fx
        .run(TestArgs {
            case: Some(2),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(verdicts(&report), [(2, Verdict::AC)]);
    assert_eq!(code, 0);

    let err = fx
        .run(TestArgs {
            case: Some(4),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("Case 4 not found"), "{:#}", err);
}

#[tokio::test]
async fn syntax_error_is_compile_error() {
    let fx = Fixture::new("if then fi (\n");
    let (report, code) = fx.run(TestArgs::default()).await.unwrap();

    let SessionOutcome::CompileError(failure) = &report.outcome else {
        panic!("expected a compile error: {:?}", report.outcome)
    };
    assert!(matches!(failure.status, ProcessStatus::Exited(c) if c != 0));
    assert!(!failure.stderr.is_empty());
    assert!(report.results().is_empty());
    assert_eq!(code, 1);
}

#[tokio::test]
async fn slow_program_is_tle_and_crash_is_re() {
    let fx = Fixture::new(
        r#"read a b
if [ "$a" = 1 ]; then sleep 10; fi
if [ "$a" = 10 ]; then echo 30; exit 3; fi
echo 11
"#,
    );
    let (report, _) = fx
        .run(TestArgs {
            time_limit: Some(Duration::from_millis(300)),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(
        verdicts(&report),
        [(1, Verdict::TLE), (2, Verdict::RE), (3, Verdict::AC)]
    );
    assert_eq!(report.results()[1].exit_code, Some(3));
}

#[tokio::test]
async fn exact_mode_rejects_missing_newline() {
    let fx = Fixture::new("read a b\nprintf '%d' $((a + b))\n");
    let (lenient, _) = fx
        .run(TestArgs {
            case: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(verdicts(&lenient), [(1, Verdict::AC)]);

    let (exact, _) = fx
        .run(TestArgs {
            case: Some(1),
            exact: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(verdicts(&exact), [(1, Verdict::WA)]);
}

#[tokio::test]
async fn missing_run_command_is_setup_error() {
    let fx = Fixture::new(SUM);
    fsutil::write(fx.work_dir().join("main.c"), "int main(){}").unwrap();

    let err = fx
        .run(TestArgs {
            lang: Some("c"),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("not found"), "{:#}", err);
}

#[tokio::test]
async fn unknown_problem_and_language() {
    let fx = Fixture::new(SUM);

    let err = action::run_tests(
        &fx.cfg,
        fx.work_dir(),
        TestArgs {
            problem_id: "nope",
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(format!("{:#}", err).contains("nope"), "{:#}", err);

    let err = fx
        .run(TestArgs {
            lang: Some("java"),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(
        format!("{:#}", err).contains("Unknown language 'java'"),
        "{:#}",
        err
    );
}
