use lazy_static::lazy_static;
use regex::Regex;
use std::str::FromStr;
use thiserror::Error;

lazy_static! {
    static ref SEGMENT: Regex = Regex::new(r"^[A-Za-z0-9_.-]+$").unwrap();
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("repository must be <owner>/<name>, got {input:?}")]
pub struct ParseError {
    input: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RepoName {
    pub(crate) owner: String,
    pub(crate) name: String,
}

impl RepoName {
    pub(crate) fn variables(&self) -> serde_json::Value {
        serde_json::json!({
            "owner": self.owner,
            "name": self.name,
        })
    }
}

impl FromStr for RepoName {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let components: Vec<&str> = s.split('/').collect();
        match &components[..] {
            [owner, name] if SEGMENT.is_match(owner) && SEGMENT.is_match(name) => Ok(RepoName {
                owner: owner.to_string(),
                name: name.to_string(),
            }),
            _ => Err(ParseError {
                input: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for RepoName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
