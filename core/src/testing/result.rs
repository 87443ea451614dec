use std::{collections::BTreeMap, time::Duration};

use super::process::ProcessStatus;
use crate::lang::Lang;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display, strum::EnumIter,
)]
pub enum Verdict {
    AC,
    WA,
    RE,
    TLE,
    CE,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        *self == Self::AC
    }

    pub fn long_name(&self) -> &'static str {
        match self {
            Self::AC => "Accepted",
            Self::WA => "Wrong Answer",
            Self::RE => "Runtime Error",
            Self::TLE => "Time Limit Exceeded",
            Self::CE => "Compile Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub case_index: u32,
    pub verdict: Verdict,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub expected: Vec<u8>,
    pub elapsed: Duration,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileFailure {
    pub command: String,
    pub status: ProcessStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    CompileError(CompileFailure),
    /// One result per executed case, in index order.
    Tested(Vec<ExecutionResult>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub problem_id: String,
    pub lang: Lang,
    pub outcome: SessionOutcome,
}

impl SessionReport {
    pub fn results(&self) -> &[ExecutionResult] {
        match &self.outcome {
            SessionOutcome::Tested(results) => results,
            SessionOutcome::CompileError(_) => &[],
        }
    }

    pub fn compile_failure(&self) -> Option<&CompileFailure> {
        match &self.outcome {
            SessionOutcome::CompileError(f) => Some(f),
            SessionOutcome::Tested(_) => None,
        }
    }

    pub fn is_all_accepted(&self) -> bool {
        match &self.outcome {
            SessionOutcome::CompileError(_) => false,
            SessionOutcome::Tested(results) => results.iter().all(|r| r.verdict.is_accepted()),
        }
    }

    /// 0 only if every executed case is accepted.
    pub fn exit_code(&self) -> u8 {
        if self.is_all_accepted() {
            0
        } else {
            1
        }
    }

    pub fn verdict_counts(&self) -> BTreeMap<Verdict, usize> {
        let mut counts = BTreeMap::new();
        match &self.outcome {
            SessionOutcome::CompileError(_) => {
                counts.insert(Verdict::CE, 1);
            }
            SessionOutcome::Tested(results) => {
                for r in results {
                    *counts.entry(r.verdict).or_default() += 1;
                }
            }
        }
        counts
    }
}

#[cfg(test)]
mod test {
    use maplit::btreemap;

    use super::*;

    fn result(case_index: u32, verdict: Verdict) -> ExecutionResult {
        ExecutionResult {
            case_index,
            verdict,
            stdout: Vec::new(),
            stderr: Vec::new(),
            expected: Vec::new(),
            elapsed: Duration::ZERO,
            exit_code: Some(0),
            signal: None,
            truncated: false,
        }
    }

    #[test]
    fn exit_code_and_counts() {
        let mut report = SessionReport {
            problem_id: "abc001_a".to_owned(),
            lang: Lang::Cpp,
            outcome: SessionOutcome::Tested(vec![result(1, Verdict::AC), result(2, Verdict::AC)]),
        };
        assert_eq!(report.exit_code(), 0);

        report.outcome = SessionOutcome::Tested(vec![
            result(1, Verdict::AC),
            result(2, Verdict::WA),
            result(3, Verdict::TLE),
            result(4, Verdict::WA),
        ]);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(
            report.verdict_counts(),
            btreemap! { Verdict::AC => 1, Verdict::WA => 2, Verdict::TLE => 1 }
        );
    }

    #[test]
    fn compile_error_has_no_case_results() {
        let report = SessionReport {
            problem_id: "x".to_owned(),
            lang: Lang::C,
            outcome: SessionOutcome::CompileError(CompileFailure {
                command: "cc main.c".to_owned(),
                status: ProcessStatus::Exited(1),
                stdout: Vec::new(),
                stderr: b"error".to_vec(),
                elapsed: Duration::ZERO,
            }),
        };
        assert!(report.results().is_empty());
        assert!(report.compile_failure().is_some());
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.verdict_counts(), btreemap! { Verdict::CE => 1 });
    }
}
