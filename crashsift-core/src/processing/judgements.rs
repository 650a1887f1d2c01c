//! Human judgement loader.
//!
//! The judgement file is a JSON array of objects carrying at least
//! `video_name` and, when the video has been reviewed, `human_judgement`
//! (`1` keep, `0` reject). Other fields are ignored.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::types::HumanJudgement;

#[derive(Debug, Deserialize)]
struct JudgementEntry {
    video_name: String,
    #[serde(default)]
    human_judgement: Option<Value>,
}

/// Mapping from video name to judgement. Absent names are `Unknown`.
#[derive(Debug, Clone, Default)]
pub struct JudgementIndex {
    labels: HashMap<String, HumanJudgement>,
}

impl JudgementIndex {
    #[must_use]
    pub fn get(&self, video_name: &str) -> HumanJudgement {
        self.labels.get(video_name).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Parses judgement JSON text.
    pub fn parse(text: &str) -> CoreResult<Self> {
        let entries: Vec<JudgementEntry> = serde_json::from_str(text)?;
        let mut labels = HashMap::with_capacity(entries.len());
        for entry in entries {
            let judgement = match &entry.human_judgement {
                None | Some(Value::Null) => HumanJudgement::Unknown,
                Some(value) => match value.as_i64() {
                    Some(label) if label == 0 || label == 1 => HumanJudgement::from_label(label),
                    _ => {
                        log::warn!(
                            "Unrecognised judgement {} for {}, treating as unknown",
                            value,
                            entry.video_name
                        );
                        HumanJudgement::Unknown
                    }
                },
            };
            labels.insert(entry.video_name, judgement);
        }
        Ok(Self { labels })
    }
}

impl FromIterator<(String, HumanJudgement)> for JudgementIndex {
    fn from_iter<I: IntoIterator<Item = (String, HumanJudgement)>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}

/// Loads the judgement file. A missing file is [`CoreError::DataNotFound`].
pub fn load_judgements(path: &Path) -> CoreResult<JudgementIndex> {
    if !path.is_file() {
        return Err(CoreError::not_found("judgement file", path));
    }
    let index = JudgementIndex::parse(&std::fs::read_to_string(path)?)?;
    let known = index.labels.values().filter(|j| j.is_known()).count();
    log::info!(
        "Loaded {} judgements ({} labeled) from {}",
        index.len(),
        known,
        path.display()
    );
    Ok(index)
}
