use std::{
    collections::{BTreeMap, HashMap},
    ffi::OsStr,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::Deserialize;
use serdable::GlobPattern;
use strum::IntoEnumIterator;

use crate::template::{CommandTemplate, TemplateError};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Lang {
    #[strum(to_string = "cpp", serialize = "c++", serialize = "cxx")]
    Cpp,
    #[strum(to_string = "c")]
    C,
    #[strum(to_string = "rust", serialize = "rs")]
    Rust,
    #[strum(to_string = "python", serialize = "py", serialize = "python3")]
    Python,
    #[strum(to_string = "go", serialize = "golang")]
    Go,
    #[strum(to_string = "java")]
    Java,
    #[strum(to_string = "sh", serialize = "shell", serialize = "bash")]
    Shell,
}

#[derive(Debug, thiserror::Error)]
pub enum LangError {
    #[error("Unknown language '{name}' (configured: {configured})")]
    UnknownLanguage { name: String, configured: String },

    #[error("No source file matching '{pattern}' for language '{lang}' in '{}'", .dir.to_string_lossy())]
    SourceNotFound {
        lang: Lang,
        pattern: GlobPattern,
        dir: PathBuf,
    },

    #[error("Invalid `{field}` command of [lang.{lang}]: {source}")]
    InvalidTemplate {
        lang: String,
        field: &'static str,
        #[source]
        source: TemplateError,
    },

    #[error(transparent)]
    Fs(#[from] fsutil::Error),
}

/// Variables available in `compile` and `run` templates.
pub const TEMPLATE_VARS: [&str; 5] = ["filePath", "fileName", "fileDir", "fileStem", "fileExt"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LangProfile {
    /// Glob for the file name of the solution source.
    pub pattern: GlobPattern,
    pub compile: Option<CommandTemplate>,
    pub run: CommandTemplate,
}

/// Compile/run commands of a [`LangProfile`] expanded for one program file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommands {
    pub compile: Option<String>,
    pub run: String,
}

impl LangProfile {
    pub fn resolve_commands(
        &self,
        program_file: impl AsRef<Path>,
    ) -> Result<ResolvedCommands, TemplateError> {
        let vars = make_template_vars(program_file.as_ref());
        Ok(ResolvedCommands {
            compile: self.compile.as_ref().map(|t| t.render(&vars)).transpose()?,
            run: self.run.render(&vars)?,
        })
    }
}

fn make_template_vars(filepath: &Path) -> HashMap<&'static str, &OsStr> {
    let mut m: HashMap<_, &OsStr> = HashMap::new();
    m.insert("filePath", filepath.as_os_str());
    m.insert(
        "fileName",
        filepath.file_name().unwrap_or(filepath.as_os_str()),
    );
    m.insert(
        "fileDir",
        match filepath.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.as_os_str(),
            _ => OsStr::new("."),
        },
    );
    m.insert(
        "fileStem",
        filepath
            .file_stem()
            .unwrap_or(OsStr::new("UNDEFINED_FILE_STEM")),
    );
    m.insert(
        "fileExt",
        filepath
            .extension()
            .unwrap_or(OsStr::new("UNDEFINED_FILE_EXTENSION")),
    );
    m
}

/// The `[lang.*]` tables of the config, keyed by language tag.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "BTreeMap<String, LangProfile>")]
pub struct LangTable {
    profiles: BTreeMap<Lang, LangProfile>,
}

impl TryFrom<BTreeMap<String, LangProfile>> for LangTable {
    type Error = LangError;

    fn try_from(raw: BTreeMap<String, LangProfile>) -> Result<Self, Self::Error> {
        let mut profiles = BTreeMap::new();
        for (name, profile) in raw {
            let lang = Lang::from_str(&name).map_err(|_| LangError::UnknownLanguage {
                name: name.clone(),
                configured: Lang::iter()
                    .map(|l| l.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;

            let check = |field, t: &CommandTemplate| {
                t.check_vars(&TEMPLATE_VARS)
                    .map_err(|source| LangError::InvalidTemplate {
                        lang: name.clone(),
                        field,
                        source,
                    })
            };
            if let Some(t) = &profile.compile {
                check("compile", t)?;
            }
            check("run", &profile.run)?;

            profiles.insert(lang, profile);
        }
        Ok(Self { profiles })
    }
}

impl FromIterator<(Lang, LangProfile)> for LangTable {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (Lang, LangProfile)>,
    {
        Self {
            profiles: iter.into_iter().collect(),
        }
    }
}

impl LangTable {
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Lang, &LangProfile)> {
        self.profiles.iter().map(|(&lang, p)| (lang, p))
    }

    fn configured_names(&self) -> String {
        self.profiles
            .keys()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Parses a user supplied language name, accepting only configured languages.
    pub fn parse_lang(&self, name: &str) -> Result<Lang, LangError> {
        match Lang::from_str(name.trim()) {
            Ok(lang) if self.profiles.contains_key(&lang) => Ok(lang),
            _ => Err(LangError::UnknownLanguage {
                name: name.to_owned(),
                configured: self.configured_names(),
            }),
        }
    }

    pub fn resolve(&self, lang: Lang) -> Result<&LangProfile, LangError> {
        self.profiles
            .get(&lang)
            .ok_or_else(|| LangError::UnknownLanguage {
                name: lang.to_string(),
                configured: self.configured_names(),
            })
    }

    /// The most recently modified file in `dir` whose name matches the profile glob.
    pub fn find_source_file(&self, lang: Lang, dir: impl AsRef<Path>) -> Result<PathBuf, LangError> {
        let profile = self.resolve(lang)?;
        let dir = dir.as_ref();
        match fsutil::find_most_recently_modified_file(dir, &profile.pattern) {
            Ok(path) => Ok(path),
            Err(fsutil::Error::NoEntryMatchedGlob(..)) => Err(LangError::SourceNotFound {
                lang,
                pattern: profile.pattern.clone(),
                dir: dir.to_owned(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}
