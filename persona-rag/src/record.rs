//! Typed schema for the personal record the knowledge base is built from.
//!
//! Every struct is `#[serde(default)]`, so a partially written JSON file still
//! deserializes into a complete record: missing lists become empty and
//! missing strings take their placeholder.

use serde::{Deserialize, Serialize};

/// The root record describing one individual.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct PersonalRecord {
    pub basic: BasicInfo,
    pub skills: Skills,
    pub experience: Vec<Experience>,
    pub projects: Vec<Project>,
    pub education: Vec<Education>,
    pub certifications: Vec<String>,
    pub interests: Vec<String>,
    pub career_goals: String,
}

/// Identity fields, shown in the assistant's system prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BasicInfo {
    pub name: String,
    pub title: String,
    pub email: String,
    pub location: String,
    pub summary: String,
}

impl Default for BasicInfo {
    fn default() -> Self {
        Self {
            name: "Your Name".to_string(),
            title: "Your Title".to_string(),
            email: "your.email@example.com".to_string(),
            location: "Your Location".to_string(),
            summary: "Your professional summary here".to_string(),
        }
    }
}

/// Skills grouped into five fixed categories.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Skills {
    pub programming_languages: Vec<String>,
    pub ml_frameworks: Vec<String>,
    pub cloud_platforms: Vec<String>,
    pub tools: Vec<String>,
    pub specialties: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Experience {
    pub title: String,
    pub company: String,
    pub duration: String,
    pub responsibilities: Vec<String>,
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Project {
    pub name: String,
    pub role: String,
    pub duration: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub impact: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Education {
    pub degree: String,
    pub school: String,
    pub year: String,
    pub focus: String,
    pub gpa: String,
    pub relevant_courses: Vec<String>,
}

/// The `{ name, title }` pair used to personalize prompts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub title: String,
}

impl PersonalRecord {
    /// Extract the summary identity from the basic section.
    pub fn identity(&self) -> Identity {
        Identity { name: self.basic.name.clone(), title: self.basic.title.clone() }
    }
}
