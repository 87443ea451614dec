use serde::{Deserialize, Serialize};

/// Metadata persisted as `problem.json` in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemMeta {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub judge: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleCase {
    /// 1-based, contiguous within a problem.
    pub index: u32,
    pub input: Vec<u8>,
    pub expected: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub meta: ProblemMeta,
    pub cases: Vec<SampleCase>,
}

impl SampleCase {
    pub fn new(index: u32, input: impl Into<Vec<u8>>, expected: impl Into<Vec<u8>>) -> Self {
        Self {
            index,
            input: input.into(),
            expected: expected.into(),
        }
    }
}

impl Problem {
    pub fn id(&self) -> &str {
        &self.meta.id
    }

    pub fn case(&self, index: u32) -> Option<&SampleCase> {
        self.cases.iter().find(|c| c.index == index)
    }
}
