pub mod error {
    #[allow(unused_imports)]
    pub(crate) use anyhow::{anyhow, bail, ensure, Context as _};
    pub use anyhow::{Error, Result};
}
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use colored::Colorize;
use error::*;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::process::Command;

use crate::config::Config;
use crate::lang::{Lang, ResolvedCommands};
use crate::model::{Problem, ProblemMeta, SampleCase};
use crate::storage::{ProblemStore, ProblemVault};
use crate::style;
use crate::testing::{
    CompareMode, ExecutionResult, NoopObserver, ProcessOutput, ProcessStatus, RunConfiguration,
    SessionObserver, SessionReport, ShellProcessRunner, TestSession,
};

pub fn init_repository(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let config_file = dir.join(Config::FILENAME);
    ensure!(
        !config_file.exists(),
        "Already initialized: {:?} exists",
        config_file
    );

    fsutil::write_with_mkdir(&config_file, Config::example_toml())
        .context("Failed to init kyotest directory")?;
    let cfg = Config::from_toml_file(config_file.clone())?;
    fsutil::mkdir_all(cfg.vault_home())?;
    Ok(config_file)
}

pub fn problem_store(cfg: &Config) -> ProblemStore {
    ProblemStore::new(cfg.vault_home())
}

/// Every stored problem with its number of cases, sorted by ID.
pub fn list_problems(cfg: &Config) -> Result<Vec<(ProblemMeta, usize)>> {
    let store = problem_store(cfg);
    let ids = store.list_problem_ids().context("Failed to list problems")?;
    ids.iter()
        .map(|id| -> Result<_> {
            let problem = store
                .load_problem(id)
                .with_context(|| format!("Failed to load problem '{}'", id))?;
            Ok((problem.meta, problem.cases.len()))
        })
        .collect()
}

pub fn show_problem(cfg: &Config, problem_id: &str) -> Result<Problem> {
    problem_store(cfg)
        .load_problem(problem_id)
        .with_context(|| format!("Failed to load problem '{}'", problem_id))
}

pub fn new_problem(cfg: &Config, meta: &ProblemMeta) -> Result<ProblemVault> {
    problem_store(cfg)
        .create_problem(meta)
        .with_context(|| format!("Failed to create problem '{}'", meta.id))
}

/// Appends the contents of the two files as the next case of the problem.
pub fn add_case(
    cfg: &Config,
    problem_id: &str,
    input_file: impl AsRef<Path>,
    output_file: impl AsRef<Path>,
) -> Result<SampleCase> {
    let input = fsutil::read(input_file)?;
    let expected = fsutil::read(output_file)?;
    let index = problem_store(cfg)
        .add_case(problem_id, &input, &expected)
        .with_context(|| format!("Failed to add a case to '{}'", problem_id))?;
    Ok(SampleCase {
        index,
        input,
        expected,
    })
}

/// Program file and its expanded commands.
pub fn resolve_program(
    cfg: &Config,
    work_dir: &Path,
    lang: Lang,
    program_file: Option<&Path>,
) -> Result<(PathBuf, ResolvedCommands)> {
    let profile = cfg.lang.resolve(lang)?;
    let program_file = match program_file {
        Some(file) => {
            let file = work_dir.join(file);
            ensure!(file.is_file(), "No such file: {:?}", file);
            file
        }
        None => cfg.lang.find_source_file(lang, work_dir)?,
    };
    let commands = profile
        .resolve_commands(&program_file)
        .with_context(|| format!("Invalid command template of [lang.{}]", lang))?;
    Ok((program_file, commands))
}

#[derive(Debug, Clone, Default)]
pub struct TestArgs<'a> {
    pub problem_id: &'a str,
    pub lang: Option<&'a str>,
    pub case: Option<u32>,
    pub program_file: Option<&'a Path>,
    pub time_limit: Option<Duration>,
    pub parallel: Option<usize>,
    pub exact: bool,
    /// Shows spinners on stderr while running.
    pub progress: bool,
}

/// Returns the report and the process exit code derived from it.
pub async fn run_tests(
    cfg: &Config,
    work_dir: &Path,
    args: TestArgs<'_>,
) -> Result<(SessionReport, u8)> {
    let lang = cfg.select_lang(args.lang)?;
    let (program_file, commands) = resolve_program(cfg, work_dir, lang, args.program_file)?;
    let problem = self::show_problem(cfg, args.problem_id)?;

    log::info!(
        "Testing {:?} ({}) against '{}'",
        program_file,
        lang,
        problem.id()
    );

    let t = &cfg.test;
    let run_cfg = RunConfiguration {
        lang,
        compile: commands.compile.filter(|_| t.compile_before_run),
        run: commands.run,
        time_limit: args.time_limit.unwrap_or(t.time_limit),
        compile_time_limit: t.compile_time_limit,
        selected_case: args.case,
        parallel: args.parallel.unwrap_or(t.parallel),
        compare: if args.exact {
            CompareMode::Exact
        } else {
            t.compare
        },
        capture: t.capture_limits(),
    };

    let runner = ShellProcessRunner::new(work_dir).shell(&t.shell);
    let session = TestSession::new(Arc::new(runner), run_cfg);

    let report = if args.progress {
        let observer = ProgressObserver::new();
        let report = session.run(&problem, &observer).await;
        observer.clear();
        report
    } else {
        session.run(&problem, &NoopObserver).await
    }
    .with_context(|| format!("Failed to test '{}'", problem.id()))?;

    let exit_code = report.exit_code();
    Ok((report, exit_code))
}

/// Compiles if needed, then runs the program with the terminal as its stdio.
pub async fn run_program(
    cfg: &Config,
    work_dir: &Path,
    lang: Option<&str>,
    program_file: Option<&Path>,
) -> Result<u8> {
    let lang = cfg.select_lang(lang)?;
    let (program_file, commands) = resolve_program(cfg, work_dir, lang, program_file)?;
    let shell = &cfg.test.shell;

    if let Some(cmd) = commands.compile.filter(|_| cfg.test.compile_before_run) {
        log::info!("Compiling {:?}", program_file);
        log::info!("{}", cmd);
        match self::run_in_shell(shell, &cmd, work_dir).await? {
            ProcessStatus::Exited(0) => (),
            ProcessStatus::Exited(code) => bail!("Compile error: exitcode={}", code),
            _ => bail!("Failed to compile: process terminated by signal"),
        }
    }

    log::info!("Running: {}", commands.run);
    let code = match self::run_in_shell(shell, &commands.run, work_dir).await? {
        ProcessStatus::Exited(code) => code.clamp(0, 255),
        // as shells report it
        ProcessStatus::Signaled(sig) => 128 + sig,
        ProcessStatus::TimedOut => 1,
    };
    Ok(code as u8)
}

async fn run_in_shell(shell: &Path, cmd: &str, work_dir: &Path) -> Result<ProcessStatus> {
    let status = Command::new(shell)
        .args(["-c", cmd])
        .current_dir(work_dir)
        .kill_on_drop(true)
        .status()
        .await
        .with_context(|| format!("Failed to spawn '{} -c {}'", shell.to_string_lossy(), cmd))?;
    Ok(ProcessStatus::from(status))
}

/// Spinner per case, finished with the case line as results arrive.
struct ProgressObserver {
    container: MultiProgress,
    style: ProgressStyle,
    compile_bar: Mutex<Option<ProgressBar>>,
    case_bars: Mutex<HashMap<u32, ProgressBar>>,
}

impl ProgressObserver {
    const TICK_INTERVAL: Duration = Duration::from_millis(50);

    fn new() -> Self {
        let style = ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        Self {
            container: MultiProgress::new(),
            style,
            compile_bar: Mutex::new(None),
            case_bars: Mutex::new(HashMap::new()),
        }
    }

    fn spinner(&self, msg: String) -> ProgressBar {
        let bar = self
            .container
            .add(ProgressBar::new_spinner())
            .with_style(self.style.clone())
            .with_message(msg);
        bar.enable_steady_tick(Self::TICK_INTERVAL);
        bar
    }

    fn clear(&self) {
        self.container.clear().ok();
    }
}

impl SessionObserver for ProgressObserver {
    fn on_compile_start(&self, command: &str) {
        let bar = self.spinner(format!("Compiling: {}", command));
        if let Ok(mut slot) = self.compile_bar.lock() {
            *slot = Some(bar);
        }
    }

    fn on_compile_finish(&self, output: &ProcessOutput) {
        let Ok(mut slot) = self.compile_bar.lock() else { return };
        if let Some(bar) = slot.take() {
            let msg = if output.status.success() {
                format!("Compiled [{}ms]", output.elapsed.as_millis()).green()
            } else {
                format!("Compile failed [{}ms]", output.elapsed.as_millis()).bright_red()
            };
            bar.finish_with_message(msg.to_string());
        }
    }

    fn on_execute_start(&self, case_indices: &[u32]) {
        let Ok(mut bars) = self.case_bars.lock() else { return };
        for &index in case_indices {
            bars.insert(index, self.spinner(format!("Case {} ...", index)));
        }
    }

    fn on_case_finish(&self, res: &ExecutionResult) {
        let Ok(bars) = self.case_bars.lock() else { return };
        if let Some(bar) = bars.get(&res.case_index) {
            bar.finish_with_message(format!(
                "Case {} ... {}{} [{}ms]",
                res.case_index,
                style::judge_icon(res.verdict),
                " ".repeat(3 - res.verdict.to_string().len()),
                res.elapsed.as_millis(),
            ));
        }
    }
}
