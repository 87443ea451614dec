use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

use super::error::{Result, StoreError};
use crate::model::{Problem, ProblemMeta, SampleCase};

/// Problem store rooted at `vault_home`.
///
/// ```text
/// <vault_home>/<problem-id>/problem.json
/// <vault_home>/<problem-id>/testcase/in1.txt
/// <vault_home>/<problem-id>/testcase/out1.txt
/// ```
#[derive(Debug, Clone)]
pub struct ProblemStore {
    home: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ProblemVault {
    dir: PathBuf,
}

impl ProblemVault {
    const TESTCASE_DIR_NAME: &str = "testcase";
    const PROBLEM_METADATA_FILENAME: &str = "problem.json";

    pub fn new(problem_vault_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: problem_vault_dir.into(),
        }
    }

    /// Returns tuple (input_filename, output_filename).
    ///
    /// ```
    /// use kyotest_core::storage::ProblemVault;
    ///
    /// let (infile, outfile) = ProblemVault::testcase_filename(3);
    /// assert_eq!(infile, "in3.txt");
    /// assert_eq!(outfile, "out3.txt");
    /// ```
    pub fn testcase_filename(index: u32) -> (String, String) {
        (format!("in{}.txt", index), format!("out{}.txt", index))
    }

    fn parse_testcase_filename(name: &str) -> Option<(bool, u32)> {
        let (is_input, rest) = if let Some(rest) = name.strip_prefix("in") {
            (true, rest)
        } else {
            (false, name.strip_prefix("out")?)
        };
        let index = rest.strip_suffix(".txt")?.parse().ok()?;
        Some((is_input, index))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn metadata_file(&self) -> PathBuf {
        self.dir.join(Self::PROBLEM_METADATA_FILENAME)
    }

    pub fn testcase_dir(&self) -> PathBuf {
        self.dir.join(Self::TESTCASE_DIR_NAME)
    }

    pub fn exists(&self) -> bool {
        self.metadata_file().is_file()
    }
}

fn is_valid_problem_id(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && !id.contains(|c| c == '/' || c == '\\')
        && !id.chars().any(char::is_control)
}

impl ProblemStore {
    pub fn new(vault_home_dir: impl Into<PathBuf>) -> Self {
        Self {
            home: vault_home_dir.into(),
        }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn resolve_problem_dir(&self, problem_id: &str) -> Result<ProblemVault> {
        if !is_valid_problem_id(problem_id) {
            return Err(StoreError::InvalidId(problem_id.to_owned()));
        }
        Ok(ProblemVault::new(self.home.join(problem_id)))
    }

    /// IDs of every problem that has metadata. A missing store is an empty store.
    pub fn list_problem_ids(&self) -> Result<BTreeSet<String>> {
        if !self.home.is_dir() {
            return Ok(BTreeSet::new());
        }
        let ids = fsutil::list_subdir_names(&self.home)?
            .into_iter()
            .filter(|id| is_valid_problem_id(id) && ProblemVault::new(self.home.join(id)).exists())
            .collect();
        Ok(ids)
    }

    pub fn load_problem_meta(&self, problem_id: &str) -> Result<(ProblemVault, ProblemMeta)> {
        let loc = self.resolve_problem_dir(problem_id)?;
        if !loc.exists() {
            return Err(StoreError::NotFound(problem_id.to_owned()));
        }
        let meta = fsutil::read_json_with_deserialize(loc.metadata_file())?;
        Ok((loc, meta))
    }

    pub fn load_problem(&self, problem_id: &str) -> Result<Problem> {
        let (loc, meta) = self.load_problem_meta(problem_id)?;
        let cases = Self::load_cases(problem_id, &loc)?;
        log::debug!(
            "Loaded problem '{}' with {} cases from {:?}",
            problem_id,
            cases.len(),
            loc.dir()
        );
        Ok(Problem { meta, cases })
    }

    fn load_cases(problem_id: &str, loc: &ProblemVault) -> Result<Vec<SampleCase>> {
        let dir = loc.testcase_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        // index => (has input, has output)
        let mut found: BTreeMap<u32, (bool, bool)> = BTreeMap::new();
        for entry in fsutil::read_dir(&dir)?.filter_map(std::io::Result::ok) {
            let name = entry.file_name();
            let Some((is_input, index)) =
                ProblemVault::parse_testcase_filename(&name.to_string_lossy())
            else {
                continue;
            };
            let slot = found.entry(index).or_default();
            if is_input {
                slot.0 = true;
            } else {
                slot.1 = true;
            }
        }

        let broken = |reason: String| StoreError::BrokenTestcases {
            id: problem_id.to_owned(),
            reason,
        };

        let mut cases = Vec::with_capacity(found.len());
        for (expected_index, (index, (has_in, has_out))) in (1..).zip(found) {
            if index != expected_index {
                return Err(broken(format!(
                    "case {} is missing (indices must be contiguous from 1)",
                    expected_index
                )));
            }
            let (infile, outfile) = ProblemVault::testcase_filename(index);
            match (has_in, has_out) {
                (true, true) => (),
                (false, _) => return Err(broken(format!("'{}' is missing", infile))),
                (_, false) => return Err(broken(format!("'{}' is missing", outfile))),
            }
            cases.push(SampleCase {
                index,
                input: fsutil::read(dir.join(&infile))?,
                expected: fsutil::read(dir.join(&outfile))?,
            });
        }
        Ok(cases)
    }

    pub fn create_problem(&self, meta: &ProblemMeta) -> Result<ProblemVault> {
        let loc = self.resolve_problem_dir(&meta.id)?;
        if loc.exists() {
            return Err(StoreError::AlreadyExists(meta.id.clone()));
        }
        fsutil::write_json_with_mkdir(loc.metadata_file(), meta)?;
        fsutil::mkdir_all(loc.testcase_dir())?;
        Ok(loc)
    }

    /// Writes metadata and every case, overwriting files with the same index.
    pub fn save_problem(&self, problem: &Problem) -> Result<ProblemVault> {
        let loc = self.resolve_problem_dir(problem.id())?;
        fsutil::write_json_with_mkdir(loc.metadata_file(), &problem.meta)?;

        let testcase_dir = loc.testcase_dir();
        fsutil::mkdir_all(&testcase_dir)?;
        for t in &problem.cases {
            let (infile, outfile) = ProblemVault::testcase_filename(t.index);
            fsutil::write(testcase_dir.join(infile), &t.input)?;
            fsutil::write(testcase_dir.join(outfile), &t.expected)?;
        }
        Ok(loc)
    }

    /// Appends a case after the last stored one and returns its index.
    pub fn add_case(
        &self,
        problem_id: &str,
        input: impl AsRef<[u8]>,
        expected: impl AsRef<[u8]>,
    ) -> Result<u32> {
        let (loc, _) = self.load_problem_meta(problem_id)?;
        let index = Self::load_cases(problem_id, &loc)?.len() as u32 + 1;

        let testcase_dir = loc.testcase_dir();
        let (infile, outfile) = ProblemVault::testcase_filename(index);
        fsutil::write_with_mkdir(testcase_dir.join(infile), input)?;
        fsutil::write_with_mkdir(testcase_dir.join(outfile), expected)?;
        Ok(index)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn meta(id: &str) -> ProblemMeta {
        ProblemMeta {
            id: id.to_owned(),
            name: "A - Welcome".to_owned(),
            url: "https://example.com/problems/abc001_a".to_owned(),
            judge: "AtCoder".to_owned(),
        }
    }

    #[test]
    fn save_then_load_problem() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProblemStore::new(dir.path());
        let problem = Problem {
            meta: meta("abc001_a"),
            cases: vec![
                SampleCase::new(1, "1 2\n", "3\n"),
                SampleCase::new(2, "5 5\n", "10\n"),
            ],
        };

        store.save_problem(&problem).unwrap();
        assert_eq!(store.load_problem("abc001_a").unwrap(), problem);
        assert!(dir.path().join("abc001_a/testcase/in2.txt").is_file());
    }

    #[test]
    fn missing_problem_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProblemStore::new(dir.path());
        assert!(matches!(
            store.load_problem("nope").unwrap_err(),
            StoreError::NotFound(id) if id == "nope"
        ));
        assert!(matches!(
            store.load_problem("../etc").unwrap_err(),
            StoreError::InvalidId(_)
        ));
    }

    #[test]
    fn list_problem_ids_ignores_dirs_without_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProblemStore::new(dir.path().join("vault"));
        assert!(store.list_problem_ids().unwrap().is_empty());

        store.create_problem(&meta("b")).unwrap();
        store.create_problem(&meta("a")).unwrap();
        fsutil::mkdir_all(dir.path().join("vault/junk")).unwrap();

        let ids: Vec<_> = store.list_problem_ids().unwrap().into_iter().collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn create_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProblemStore::new(dir.path());
        store.create_problem(&meta("x")).unwrap();
        assert!(matches!(
            store.create_problem(&meta("x")).unwrap_err(),
            StoreError::AlreadyExists(_)
        ));
    }

    #[test]
    fn add_case_appends_with_next_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProblemStore::new(dir.path());
        store.create_problem(&meta("x")).unwrap();

        assert_eq!(store.add_case("x", "1\n", "2\n").unwrap(), 1);
        assert_eq!(store.add_case("x", "3\n", "4\n").unwrap(), 2);

        let p = store.load_problem("x").unwrap();
        assert_eq!(p.cases.len(), 2);
        assert_eq!(p.case(2).unwrap().input, b"3\n");
    }

    #[test]
    fn gap_in_indices_is_broken() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProblemStore::new(dir.path());
        let loc = store.create_problem(&meta("x")).unwrap();
        let tdir = loc.testcase_dir();
        for i in [1, 3] {
            let (infile, outfile) = ProblemVault::testcase_filename(i);
            fsutil::write(tdir.join(infile), "").unwrap();
            fsutil::write(tdir.join(outfile), "").unwrap();
        }

        let err = store.load_problem("x").unwrap_err();
        assert!(matches!(err, StoreError::BrokenTestcases { .. }));
        assert!(err.to_string().contains("case 2 is missing"));
    }

    #[test]
    fn missing_output_file_is_broken() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProblemStore::new(dir.path());
        let loc = store.create_problem(&meta("x")).unwrap();
        fsutil::write(loc.testcase_dir().join("in1.txt"), "").unwrap();
        fsutil::write(loc.testcase_dir().join("memo.md"), "").unwrap();

        let err = store.load_problem("x").unwrap_err();
        assert!(err.to_string().contains("'out1.txt' is missing"));
    }
}
