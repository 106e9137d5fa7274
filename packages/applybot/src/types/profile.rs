//! Applicant profile fed to the cover-letter generator.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub full_name: String,

    /// One-line professional headline
    #[serde(default)]
    pub role: String,

    #[serde(default)]
    pub summary: String,

    /// Skill groups, e.g. `"ml_nlp" -> "RAG, fine-tuning, embeddings"`
    #[serde(default)]
    pub skills: BTreeMap<String, String>,

    #[serde(default)]
    pub experience_highlights: Vec<String>,

    #[serde(default)]
    pub current_project: Option<String>,

    #[serde(default)]
    pub soft_skills: Option<String>,

    /// What kind of role the applicant is looking for
    #[serde(default)]
    pub seeking: Option<String>,

    #[serde(default)]
    pub contact: ContactInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub github: Option<String>,
}

impl ContactInfo {
    /// Signature block appended after the sign-off, one field per separator.
    pub fn signature_block(&self, full_name: &str) -> String {
        let mut line = vec![self.email.clone()];
        if let Some(phone) = &self.phone {
            line.push(phone.clone());
        }
        if let Some(linkedin) = &self.linkedin {
            line.push(format!("LinkedIn: {}", linkedin));
        }
        if let Some(github) = &self.github {
            line.push(format!("GitHub: {}", github));
        }
        let line: Vec<String> = line.into_iter().filter(|s| !s.is_empty()).collect();
        format!("{}\n{}", full_name, line.join(" | "))
    }
}

impl UserProfile {
    /// Load a profile from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}
