//! Human readable rendering of a [`SessionReport`].
//!
//! Every function returns the text instead of printing it; colors follow
//! [`colored::control`].

use std::fmt::Write as _;

use colored::{Color, Colorize};
use crossterm::terminal;

use crate::style::judge_icon;
use crate::testing::{
    CompileFailure, ExecutionResult, ProcessStatus, SessionOutcome, SessionReport, Verdict,
};

const BOLD_LINE: &str = "━";
const THIN_LINE: &str = "─";

pub fn terminal_width() -> usize {
    let (cols, _) = terminal::size().unwrap_or((80, 40));
    cols.max(20) as usize
}

/// `Case <i> ... <badge> [<ms>ms]`
pub fn render_case_line(res: &ExecutionResult) -> String {
    let mut s = format!(
        "Case {} ... {} [{}ms]",
        res.case_index,
        judge_icon(res.verdict),
        res.elapsed.as_millis()
    );
    if res.truncated {
        write!(s, " {}", "(output truncated)".bright_red()).ok();
    }
    s
}

pub fn render_summary(report: &SessionReport) -> String {
    let bar = "-".repeat(5);
    let counts = report.verdict_counts();
    let num_total = report.results().len();
    let num_passed = counts.get(&Verdict::AC).copied().unwrap_or(0);
    let num_failed = num_total - num_passed;

    let body = if report.compile_failure().is_some() {
        format!("{}", "Compile error; no test was run 🔧".bright_red())
    } else if num_failed == 0 {
        format!("{}", format!("All {} tests passed ✨", num_total).green())
    } else {
        let summary_msg = if num_passed > 0 {
            format!("{}/{} tests failed 💣", num_failed, num_total)
        } else {
            format!("All {} tests failed 💀", num_total)
        };

        let detail_msg = counts
            .iter()
            .filter(|(verdict, _)| !verdict.is_accepted())
            .map(|(&verdict, &cnt)| {
                format!(
                    "{}{}{}",
                    judge_icon(verdict),
                    "x".dimmed(),
                    cnt.to_string().bold().bright_white(),
                )
            })
            .collect::<Vec<String>>()
            .join(", ");

        format!("{} ({})", summary_msg.bright_red(), detail_msg)
    };

    format!("{} {} {}", bar, body, bar)
}

fn sub_title(out: &mut String, s: &str, cols: usize) {
    writeln!(
        out,
        "{}{}",
        s.cyan().bold(),
        THIN_LINE
            .repeat(cols.saturating_sub(s.len() + 1))
            .bright_black(),
    )
    .ok();
}

/// Trailing whitespace of each line and a missing final newline are made visible.
fn write_lines(out: &mut String, text: &[u8]) {
    let text = String::from_utf8_lossy(text);
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        writeln!(out, "{}", "<EMPTY>".magenta().dimmed()).ok();
        return;
    }

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim_end();
        out.push_str(trimmed);

        let num_trailing_whitespace = line.len() - trimmed.len();
        if num_trailing_whitespace > 0 {
            write!(
                out,
                "{}{}",
                " ".repeat(num_trailing_whitespace).on_red(),
                "(Trailing whitespace)".bright_red().bold()
            )
            .ok();
        }

        let is_last_line = i + 1 == lines.len();
        if is_last_line && !text.ends_with('\n') {
            write!(out, "{}", " Missing new line ".on_yellow().black().bold()).ok();
        }
        out.push('\n');
    }
}

/// Line-by-line comparison by position: `-` is expected, `+` is actual.
/// Empty when the lines differ only in trailing whitespace or line endings.
fn diff_lines(expected: &[u8], actual: &[u8]) -> String {
    let mut out = String::new();
    let expected = String::from_utf8_lossy(expected);
    let actual = String::from_utf8_lossy(actual);
    let expected: Vec<&str> = expected.lines().collect();
    let actual: Vec<&str> = actual.lines().collect();
    let width = expected.len().max(actual.len()).to_string().len();

    for i in 0..expected.len().max(actual.len()) {
        let (e, a) = (expected.get(i), actual.get(i));
        if e.map(|s| s.trim_end()) == a.map(|s| s.trim_end()) {
            continue;
        }
        let lineno = format!("{:>width$}", i + 1, width = width);
        if let Some(e) = e {
            writeln!(out, "{} {}", lineno.bright_black(), format!("- {}", e).red()).ok();
        }
        if let Some(a) = a {
            writeln!(out, "{} {}", lineno.bright_black(), format!("+ {}", a).green()).ok();
        }
    }
    out
}

fn describe_status(status: ProcessStatus) -> String {
    match status {
        ProcessStatus::Exited(code) => format!("exit code {}", code),
        ProcessStatus::Signaled(sig) => format!("killed by signal {}", sig),
        ProcessStatus::TimedOut => "time limit exceeded".to_owned(),
    }
}

pub fn render_case_detail(res: &ExecutionResult, cols: usize) -> String {
    let mut out = String::new();
    let bold_bar = BOLD_LINE.repeat(cols).blue().bold();

    writeln!(
        out,
        "\n{}: {} [{}ms]\n{}",
        format!("Case {}", res.case_index).color(Color::BrightYellow).bold(),
        judge_icon(res.verdict),
        res.elapsed.as_millis(),
        bold_bar,
    )
    .ok();

    sub_title(&mut out, "[expected]", cols);
    write_lines(&mut out, &res.expected);

    sub_title(&mut out, "[stdout]", cols);
    write_lines(&mut out, &res.stdout);

    if res.verdict == Verdict::WA {
        let diff = diff_lines(&res.expected, &res.stdout);
        if !diff.is_empty() {
            sub_title(&mut out, "[diff]", cols);
            out.push_str(&diff);
        }
    }

    if !res.stderr.is_empty() {
        sub_title(&mut out, "[stderr]", cols);
        out.push_str(&String::from_utf8_lossy(&res.stderr));
        if !res.stderr.ends_with(b"\n") {
            out.push('\n');
        }
    }

    let status = match (res.exit_code, res.signal) {
        (_, Some(sig)) => Some(describe_status(ProcessStatus::Signaled(sig))),
        (Some(0), None) => None,
        (Some(code), None) => Some(describe_status(ProcessStatus::Exited(code))),
        (None, None) => Some(describe_status(ProcessStatus::TimedOut)),
    };
    if let Some(status) = status {
        writeln!(out, "{} {}", "Status:".bold(), status.bright_red()).ok();
    }

    write!(out, "{}", bold_bar).ok();
    out
}

pub fn render_compile_failure(failure: &CompileFailure, cols: usize) -> String {
    let mut out = String::new();
    let bold_bar = BOLD_LINE.repeat(cols).blue().bold();

    writeln!(
        out,
        "\n{} {} [{}ms]\n{}",
        judge_icon(Verdict::CE),
        describe_status(failure.status).bright_red(),
        failure.elapsed.as_millis(),
        bold_bar,
    )
    .ok();
    writeln!(out, "{} {}", "$".bright_black(), failure.command).ok();

    for (title, text) in [("[stdout]", &failure.stdout), ("[stderr]", &failure.stderr)] {
        if text.is_empty() {
            continue;
        }
        sub_title(&mut out, title, cols);
        out.push_str(&String::from_utf8_lossy(text));
        if !text.ends_with(b"\n") {
            out.push('\n');
        }
    }

    write!(out, "{}", bold_bar).ok();
    out
}

/// Per-case lines, details of every rejected case, and the summary.
pub fn render_report(report: &SessionReport, cols: usize) -> String {
    let mut out = String::new();
    match &report.outcome {
        SessionOutcome::CompileError(failure) => {
            writeln!(out, "{}", render_compile_failure(failure, cols)).ok();
        }
        SessionOutcome::Tested(results) => {
            for res in results {
                writeln!(out, "{}", render_case_line(res)).ok();
            }
            for res in results.iter().filter(|r| !r.verdict.is_accepted()) {
                writeln!(out, "{}", render_case_detail(res, cols)).ok();
            }
        }
    }
    out.push_str(&render_summary(report));
    out
}
