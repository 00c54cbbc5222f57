use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DuelError;

/// The problem shared by both sides of a duel.
///
/// `description` is an HTML fragment and is never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    #[serde(default)]
    pub slug: String,
    pub title: String,
    pub difficulty: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub link: String,
    pub description: String,
    #[serde(default)]
    pub opponent: Option<String>,
}

/// Languages the judge can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    Cpp,
    Java,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::Python,
        Language::JavaScript,
        Language::Cpp,
        Language::Java,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Cpp => "cpp",
            Language::Java => "java",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = DuelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Language::ALL
            .into_iter()
            .find(|lang| lang.as_str() == wanted)
            .ok_or_else(|| DuelError::InvalidInput(format!("unsupported language: {}", s.trim())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_parsing() {
        assert_eq!("python".parse::<Language>().unwrap(), Language::Python);
        assert_eq!(" JavaScript ".parse::<Language>().unwrap(), Language::JavaScript);
        assert_eq!("cpp".parse::<Language>().unwrap(), Language::Cpp);
        assert_eq!("java".parse::<Language>().unwrap(), Language::Java);
        assert!(matches!(
            "rust".parse::<Language>(),
            Err(DuelError::InvalidInput(_))
        ));
        assert!("".parse::<Language>().is_err());
    }

    #[test]
    fn test_problem_defaults() {
        let json = r#"{"title":"T","difficulty":"Hard","link":"l","description":"<p></p>"}"#;
        let problem: Problem = serde_json::from_str(json).unwrap();
        assert!(problem.slug.is_empty());
        assert!(problem.tags.is_empty());
        assert!(problem.opponent.is_none());
    }
}
