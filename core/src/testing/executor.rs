use std::sync::Arc;

use super::{
    compare::{compare, CompareMode},
    process::{ProcessError, ProcessOutput, ProcessRequest, ProcessRunner, ProcessStatus},
    result::{ExecutionResult, Verdict},
    session::RunConfiguration,
};
use crate::model::SampleCase;

/// Runs the configured run command against one sample case.
#[derive(Debug)]
pub struct CaseExecutor<R> {
    runner: Arc<R>,
    cfg: Arc<RunConfiguration>,
}

impl<R> Clone for CaseExecutor<R> {
    fn clone(&self) -> Self {
        Self {
            runner: Arc::clone(&self.runner),
            cfg: Arc::clone(&self.cfg),
        }
    }
}

impl<R: ProcessRunner> CaseExecutor<R> {
    pub fn new(runner: Arc<R>, cfg: Arc<RunConfiguration>) -> Self {
        Self { runner, cfg }
    }

    /// Fails only on setup errors; a misbehaving program is a verdict.
    pub async fn execute(&self, case: &SampleCase) -> Result<ExecutionResult, ProcessError> {
        let req = ProcessRequest {
            command: &self.cfg.run,
            stdin: &case.input,
            time_limit: self.cfg.time_limit,
            capture: self.cfg.capture,
        };
        let output = self.runner.run(&req).await?;
        let verdict = classify(&output, &case.expected, self.cfg.compare);

        log::debug!(
            "Case {}: {} ({:?}, {}ms)",
            case.index,
            verdict,
            output.status,
            output.elapsed.as_millis()
        );

        Ok(ExecutionResult {
            case_index: case.index,
            verdict,
            exit_code: output.status.exit_code(),
            signal: output.status.signal(),
            truncated: output.stdout_truncated || output.stderr_truncated,
            stdout: output.stdout,
            stderr: output.stderr,
            expected: case.expected.clone(),
            elapsed: output.elapsed,
        })
    }
}

/// Non-zero exit is a runtime error even if stdout matches. Truncated stdout is never accepted.
pub fn classify(output: &ProcessOutput, expected: &[u8], mode: CompareMode) -> Verdict {
    match output.status {
        ProcessStatus::TimedOut => Verdict::TLE,
        ProcessStatus::Signaled(_) => Verdict::RE,
        ProcessStatus::Exited(code) if code != 0 => Verdict::RE,
        ProcessStatus::Exited(_) if output.stdout_truncated => Verdict::WA,
        ProcessStatus::Exited(_) => {
            if compare(&output.stdout, expected, mode) {
                Verdict::AC
            } else {
                Verdict::WA
            }
        }
    }
}
