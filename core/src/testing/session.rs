use std::{sync::Arc, time::Duration};

use tokio::{
    sync::Semaphore,
    task::{JoinError, JoinSet},
};

use super::{
    compare::CompareMode,
    executor::CaseExecutor,
    process::{CaptureLimits, ProcessError, ProcessOutput, ProcessRequest, ProcessRunner},
    result::{CompileFailure, ExecutionResult, SessionOutcome, SessionReport},
};
use crate::{
    lang::Lang,
    model::{Problem, SampleCase},
};

/// Everything a session needs besides the problem. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfiguration {
    pub lang: Lang,
    pub compile: Option<String>,
    pub run: String,
    pub time_limit: Duration,
    pub compile_time_limit: Duration,
    /// Runs only this case when set.
    pub selected_case: Option<u32>,
    /// Maximum number of cases executed at once.
    pub parallel: usize,
    pub compare: CompareMode,
    pub capture: CaptureLimits,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Case {index} not found in problem '{problem_id}' (it has {num_cases} cases)")]
    CaseNotFound {
        problem_id: String,
        index: u32,
        num_cases: usize,
    },

    #[error("Problem '{0}' has no sample cases")]
    NoCases(String),

    #[error(transparent)]
    Setup(#[from] ProcessError),

    #[error("Worker task failed: {0}")]
    Worker(#[from] JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum SessionState {
    Init,
    Compiling,
    Executing,
    Reporting,
    Done,
}

/// Progress hooks called from the task driving the session.
#[allow(unused_variables)]
pub trait SessionObserver: Sync {
    fn on_state_change(&self, state: SessionState) {}

    fn on_compile_start(&self, command: &str) {}

    fn on_compile_finish(&self, output: &ProcessOutput) {}

    fn on_execute_start(&self, case_indices: &[u32]) {}

    /// Called in completion order, which may differ from index order.
    fn on_case_finish(&self, result: &ExecutionResult) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

#[derive(Debug)]
pub struct TestSession<R> {
    runner: Arc<R>,
    cfg: Arc<RunConfiguration>,
}

fn enter(state: &mut SessionState, next: SessionState, observer: &dyn SessionObserver) {
    log::debug!("Session: {} -> {}", state, next);
    *state = next;
    observer.on_state_change(next);
}

impl<R> TestSession<R>
where
    R: ProcessRunner + 'static,
{
    pub fn new(runner: Arc<R>, cfg: RunConfiguration) -> Self {
        Self {
            runner,
            cfg: Arc::new(cfg),
        }
    }

    pub fn config(&self) -> &RunConfiguration {
        &self.cfg
    }

    pub async fn run(
        &self,
        problem: &Problem,
        observer: &dyn SessionObserver,
    ) -> Result<SessionReport, SessionError> {
        let mut state = SessionState::Init;
        let cases = self.select_cases(problem)?;

        let report = |outcome| SessionReport {
            problem_id: problem.id().to_owned(),
            lang: self.cfg.lang,
            outcome,
        };

        if let Some(command) = &self.cfg.compile {
            enter(&mut state, SessionState::Compiling, observer);
            if let Some(failure) = self.compile(command, observer).await? {
                enter(&mut state, SessionState::Reporting, observer);
                let report = report(SessionOutcome::CompileError(failure));
                enter(&mut state, SessionState::Done, observer);
                return Ok(report);
            }
        }

        enter(&mut state, SessionState::Executing, observer);
        observer.on_execute_start(&cases.iter().map(|c| c.index).collect::<Vec<_>>());
        let results = self.execute_all(cases, observer).await?;

        enter(&mut state, SessionState::Reporting, observer);
        let report = report(SessionOutcome::Tested(results));
        enter(&mut state, SessionState::Done, observer);
        Ok(report)
    }

    fn select_cases(&self, problem: &Problem) -> Result<Vec<SampleCase>, SessionError> {
        match self.cfg.selected_case {
            Some(index) => match problem.case(index) {
                Some(case) => Ok(vec![case.clone()]),
                None => Err(SessionError::CaseNotFound {
                    problem_id: problem.id().to_owned(),
                    index,
                    num_cases: problem.cases.len(),
                }),
            },
            None if problem.cases.is_empty() => Err(SessionError::NoCases(problem.id().to_owned())),
            None => Ok(problem.cases.clone()),
        }
    }

    /// Returns the failure if the compiler did not exit successfully.
    async fn compile(
        &self,
        command: &str,
        observer: &dyn SessionObserver,
    ) -> Result<Option<CompileFailure>, ProcessError> {
        log::info!("Compiling: {}", command);
        observer.on_compile_start(command);

        let req = ProcessRequest {
            command,
            stdin: &[],
            time_limit: self.cfg.compile_time_limit,
            capture: self.cfg.capture,
        };
        let output = self.runner.run(&req).await?;
        observer.on_compile_finish(&output);

        if output.status.success() {
            return Ok(None);
        }
        log::debug!("Compile failed: {:?}", output.status);
        Ok(Some(CompileFailure {
            command: command.to_owned(),
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
            elapsed: output.elapsed,
        }))
    }

    async fn execute_all(
        &self,
        cases: Vec<SampleCase>,
        observer: &dyn SessionObserver,
    ) -> Result<Vec<ExecutionResult>, SessionError> {
        log::info!("Running: {}", self.cfg.run);

        let executor = CaseExecutor::new(Arc::clone(&self.runner), Arc::clone(&self.cfg));
        let semaphore = Arc::new(Semaphore::new(self.cfg.parallel.max(1)));
        let mut slots: Vec<Option<ExecutionResult>> = vec![None; cases.len()];
        let mut tasks = JoinSet::new();

        for (slot, case) in cases.into_iter().enumerate() {
            let executor = executor.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                // The semaphore is never closed.
                let _permit = semaphore.acquire_owned().await.ok();
                (slot, executor.execute(&case).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (slot, res) = match joined {
                Ok(v) => v,
                Err(e) => {
                    tasks.shutdown().await;
                    return Err(e.into());
                }
            };
            match res {
                Ok(result) => {
                    observer.on_case_finish(&result);
                    slots[slot] = Some(result);
                }
                Err(e) => {
                    log::debug!("Aborting session: {}", e);
                    tasks.shutdown().await;
                    return Err(e.into());
                }
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }
}
