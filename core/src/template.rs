//! Command templates such as `g++ -o #{fileDir}/a.out #{filePath}`.
//!
//! `#{name}` is replaced by the value of the variable `name` and `##` is a literal `#`.
//! Templates are parsed when the config is loaded.

use std::{borrow::Borrow, collections::HashMap, ffi::OsStr, fmt, hash::Hash};

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("Undefined variable '{0}' at column {}", .1+1)]
    UndefinedVar(String, usize),

    #[error("Unclosed brace (found '#{{' at column {})", .0+1)]
    UnclosedBrace(usize),

    #[error("Empty variable name at column {}", .0+1)]
    EmptyVarName(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Var { name: String, pos: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct CommandTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl CommandTemplate {
    pub fn parse(fmt: &str) -> Result<Self, TemplateError> {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        enum State {
            Normal,
            HashMark,
            InsideBrace,
        }
        use State::*;

        let mut state = Normal;
        let mut pos_hash = 0;
        let mut segments = Vec::new();
        let mut lit = String::with_capacity(fmt.len());
        let mut var_name = String::with_capacity(32);

        for (i, c) in fmt.chars().enumerate() {
            match (c, state) {
                ('#', Normal) => {
                    state = HashMark;
                    pos_hash = i;
                }
                ('#', HashMark) => {
                    state = Normal;
                    lit.push('#');
                }
                ('{', HashMark) => {
                    state = InsideBrace;
                    var_name.clear();
                }
                ('}', InsideBrace) => {
                    state = Normal;
                    if var_name.is_empty() {
                        return Err(TemplateError::EmptyVarName(pos_hash));
                    }
                    if !lit.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut lit)));
                    }
                    segments.push(Segment::Var {
                        name: var_name.clone(),
                        pos: pos_hash,
                    });
                }
                (_, InsideBrace) => {
                    var_name.push(c);
                }
                (_, HashMark) => {
                    state = Normal;
                    lit.push('#');
                    lit.push(c);
                }
                (_, Normal) => {
                    lit.push(c);
                }
            }
        }

        match state {
            InsideBrace => return Err(TemplateError::UnclosedBrace(pos_hash)),
            HashMark => lit.push('#'),
            Normal => (),
        }
        if !lit.is_empty() {
            segments.push(Segment::Literal(lit));
        }

        Ok(Self {
            source: fmt.to_owned(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn var_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Var { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Fails on the first variable that is not in `known`.
    pub fn check_vars(&self, known: &[&str]) -> Result<(), TemplateError> {
        for seg in &self.segments {
            if let Segment::Var { name, pos } = seg {
                if !known.contains(&name.as_str()) {
                    return Err(TemplateError::UndefinedVar(name.clone(), *pos));
                }
            }
        }
        Ok(())
    }

    pub fn render<K, V>(&self, variables: &HashMap<K, V>) -> Result<String, TemplateError>
    where
        K: Borrow<str> + Hash + Eq,
        V: AsRef<OsStr>,
    {
        let mut res = String::with_capacity(self.source.len() * 3);
        for seg in &self.segments {
            match seg {
                Segment::Literal(s) => res += s,
                Segment::Var { name, pos } => {
                    let Some(value) = variables.get(name.as_str()) else {
                        return Err(TemplateError::UndefinedVar(name.clone(), *pos));
                    };
                    res += value.as_ref().to_string_lossy().as_ref();
                }
            }
        }
        Ok(res)
    }
}

impl TryFrom<String> for CommandTemplate {
    type Error = TemplateError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.source)
    }
}
