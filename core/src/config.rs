use std::path::{Path, PathBuf};
use std::result::Result as StdResult;
use std::time::Duration;

use anyhow::Context as _;
use rust_embed::RustEmbed;
use serde::Deserialize;

use crate::lang::{Lang, LangTable};
use crate::testing::{CaptureLimits, CompareMode, ShellProcessRunner};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub source_config_file: Option<PathBuf>,
    pub repository: RepoConfig,
    #[serde(default)]
    pub test: TestConfig,
    #[serde(default)]
    pub lang: LangTable,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepoConfig {
    pub vault_home: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    pub shell: PathBuf,
    pub default_lang: Option<String>,
    #[serde(with = "serdable::duration")]
    pub time_limit: Duration,
    #[serde(with = "serdable::duration")]
    pub compile_time_limit: Duration,
    pub compile_before_run: bool,
    pub parallel: usize,
    pub compare: CompareMode,
    pub stdout_capture_max_bytes: usize,
    pub stderr_capture_max_bytes: usize,
}

impl Default for TestConfig {
    fn default() -> Self {
        let capture = CaptureLimits::default();
        Self {
            shell: ShellProcessRunner::DEFAULT_SHELL.into(),
            default_lang: None,
            time_limit: Duration::from_secs(2),
            compile_time_limit: Duration::from_secs(30),
            compile_before_run: true,
            parallel: 1,
            compare: CompareMode::default(),
            stdout_capture_max_bytes: capture.stdout_max_bytes,
            stderr_capture_max_bytes: capture.stderr_max_bytes,
        }
    }
}

impl TestConfig {
    pub fn capture_limits(&self) -> CaptureLimits {
        CaptureLimits {
            stdout_max_bytes: self.stdout_capture_max_bytes,
            stderr_max_bytes: self.stderr_capture_max_bytes,
        }
    }
}

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Asset;

impl Config {
    pub const FILENAME: &str = "kyotest.toml";

    pub fn example_toml() -> String {
        Asset::get(Self::FILENAME)
            .map(|file| String::from_utf8_lossy(file.data.as_ref()).into_owned())
            .unwrap_or_default()
    }

    pub fn from_toml(s: &str) -> StdResult<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn from_toml_file(filepath: PathBuf) -> anyhow::Result<Self> {
        let toml = fsutil::read_to_string(&filepath).context("Cannot read a file")?;
        let mut cfg = Self::from_toml(&toml)
            .with_context(|| format!("Invalid config TOML: {:?}", filepath))?;
        cfg.source_config_file = Some(filepath);
        Ok(cfg)
    }

    /// Find config file ancestor dirs, including current dir.
    pub fn find_file_in_ancestors(cur_dir: impl AsRef<Path>) -> anyhow::Result<PathBuf> {
        let cur_dir = cur_dir.as_ref();
        cur_dir
            .ancestors()
            .map(|dir| dir.join(Self::FILENAME))
            .find(|path| path.is_file())
            .with_context(|| {
                format!(
                    "Not in a kyotest directory: Cannot find '{}' in {:?} or its ancestors",
                    Self::FILENAME,
                    cur_dir
                )
            })
    }

    pub fn from_file_finding_in_ancestors(cur_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config_filepath = Config::find_file_in_ancestors(cur_dir)?;
        Self::from_toml_file(config_filepath)
    }

    /// Directory containing the config file, if loaded from one.
    pub fn base_dir(&self) -> Option<&Path> {
        self.source_config_file.as_deref().and_then(Path::parent)
    }

    /// `repository.vault_home` resolved against [`Config::base_dir`].
    pub fn vault_home(&self) -> PathBuf {
        match self.base_dir() {
            Some(base) => base.join(&self.repository.vault_home),
            None => self.repository.vault_home.clone(),
        }
    }

    /// The language named on the command line, else `test.default_lang`.
    pub fn select_lang(&self, name: Option<&str>) -> anyhow::Result<Lang> {
        let name = name
            .or(self.test.default_lang.as_deref())
            .context("No language specified and `test.default_lang` is not set")?;
        Ok(self.lang.parse_lang(name)?)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn example_toml_should_be_parsable() {
        let toml = Config::example_toml();
        let cfg = Config::from_toml(&toml).unwrap();

        let Config {
            source_config_file,
            repository: repo,
            test,
            lang,
        } = cfg;

        assert_eq!(source_config_file, None);
        assert_eq!(repo.vault_home, Path::new("./problems"));

        assert_eq!(
            test,
            TestConfig {
                shell: PathBuf::from("/bin/sh"),
                default_lang: Some("cpp".to_owned()),
                time_limit: Duration::from_secs(2),
                compile_time_limit: Duration::from_secs(30),
                compile_before_run: true,
                parallel: 1,
                compare: CompareMode::Lenient,
                stdout_capture_max_bytes: 16 << 20,
                stderr_capture_max_bytes: 1 << 20,
            }
        );

        let langs: Vec<_> = lang.iter().map(|(l, _)| l).collect();
        assert_eq!(
            langs,
            [
                Lang::Cpp,
                Lang::C,
                Lang::Rust,
                Lang::Python,
                Lang::Go,
                Lang::Java,
                Lang::Shell
            ]
        );
        let cmds = lang
            .resolve(Lang::Shell)
            .unwrap()
            .resolve_commands("main.sh")
            .unwrap();
        assert_eq!(cmds.compile.as_deref(), Some("sh -n main.sh"));
        assert_eq!(cmds.run, "sh main.sh");
    }

    #[test]
    fn test_section_defaults() {
        let cfg = Config::from_toml(
            r#"
            [repository]
            vault_home = "v"

            [test]
            time_limit = 500
            "#,
        )
        .unwrap();
        assert_eq!(cfg.test.time_limit, Duration::from_millis(500));
        assert_eq!(cfg.test.shell, Path::new("/bin/sh"));
        assert_eq!(cfg.test.parallel, 1);
        assert!(cfg.lang.is_empty());
        assert!(cfg.select_lang(None).is_err());
    }

    #[test]
    fn find_config_in_ancestors() {
        let dir = tempfile::tempdir().unwrap();
        fsutil::write(dir.path().join(Config::FILENAME), Config::example_toml()).unwrap();
        let nested = dir.path().join("abc/def");
        fsutil::mkdir_all(&nested).unwrap();

        let cfg = Config::from_file_finding_in_ancestors(&nested).unwrap();
        assert_eq!(cfg.base_dir(), Some(dir.path()));
        assert_eq!(cfg.vault_home(), dir.path().join("./problems"));
        assert_eq!(cfg.select_lang(None).unwrap(), Lang::Cpp);
        assert_eq!(cfg.select_lang(Some("py")).unwrap(), Lang::Python);
    }

    #[test]
    fn no_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::find_file_in_ancestors(dir.path()).unwrap_err();
        assert!(err.to_string().contains(Config::FILENAME));
    }
}
