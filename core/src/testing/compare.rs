use serde::Deserialize;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CompareMode {
    /// Ignores trailing whitespace of each line and trailing empty lines.
    #[default]
    Lenient,
    /// Byte-for-byte.
    Exact,
}

fn is_trailing_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\x0b' | b'\x0c')
}

fn trim_line_end(mut line: &[u8]) -> &[u8] {
    while let [rest @ .., last] = line {
        if !is_trailing_space(*last) {
            break;
        }
        line = rest;
    }
    line
}

/// Lines of `s` without trailing whitespace, with trailing empty lines dropped.
pub fn normalized_lines(s: &[u8]) -> Vec<&[u8]> {
    let mut lines: Vec<&[u8]> = s.split(|&b| b == b'\n').map(trim_line_end).collect();
    while lines.last().map_or(false, |l| l.is_empty()) {
        lines.pop();
    }
    lines
}

pub fn compare(actual: &[u8], expected: &[u8], mode: CompareMode) -> bool {
    match mode {
        CompareMode::Exact => actual == expected,
        CompareMode::Lenient => normalized_lines(actual) == normalized_lines(expected),
    }
}
