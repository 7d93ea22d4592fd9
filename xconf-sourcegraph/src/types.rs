use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;

/// Fully-formed URL of one detail document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target(String);

impl Target {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Target {
    fn from(url: String) -> Self {
        Self(url)
    }
}

impl From<&str> for Target {
    fn from(url: &str) -> Self {
        Self(url.to_string())
    }
}

impl From<url::Url> for Target {
    fn from(url: url::Url) -> Self {
        Self(url.into())
    }
}

/// Rendered excerpt of one file at one commit, as served by
/// `/{repo}@{commit}/.tree/{file}/.sourcebox.json`.
///
/// Only the fields the page renders are named; everything else is kept in
/// `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sourcebox {
    #[serde(default, rename = "Repo")]
    pub repo: String,
    #[serde(default, rename = "CommitID")]
    pub commit_id: String,
    #[serde(default, rename = "File")]
    pub file: String,
    #[serde(default, rename = "StartLine")]
    pub start_line: Option<u32>,
    #[serde(default, rename = "EndLine")]
    pub end_line: Option<u32>,
    #[serde(default, rename = "HTML")]
    pub html: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One element of the `.units` listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoSourceUnit {
    #[serde(default, rename = "Repo")]
    pub repo: String,
    #[serde(default, rename = "CommitID")]
    pub commit_id: String,
    #[serde(default, rename = "UnitType")]
    pub unit_type: String,
    #[serde(default, rename = "Unit")]
    pub unit: String,
    /// Type-specific payload; decoded lazily by [`RepoSourceUnit::source_unit`].
    #[serde(default, rename = "Data")]
    pub data: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SourceUnit {
    #[serde(default, rename = "Name")]
    pub name: String,
    #[serde(default, rename = "Type")]
    pub kind: String,
    #[serde(default, rename = "Files")]
    pub files: Vec<String>,
}

impl RepoSourceUnit {
    pub fn source_unit(&self) -> Result<SourceUnit, serde_json::Error> {
        SourceUnit::deserialize(&self.data)
    }
}

/// Query parameters for the `.units` listing. Names match the API's
/// parameter names; an empty query is omitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitListOptions {
    pub query: String,
    pub unit_type: String,
    pub per_page: u32,
    pub page: Option<u32>,
}

impl UnitListOptions {
    pub fn dockerfiles(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            unit_type: "Dockerfile".to_string(),
            per_page: 4,
            page: None,
        }
    }

    pub fn to_query_pairs(&self) -> Vec<(&'static str, Cow<'_, str>)> {
        let mut params: Vec<(&'static str, Cow<'_, str>)> = Vec::with_capacity(4);
        if !self.query.is_empty() {
            params.push(("Query", Cow::Borrowed(self.query.as_str())));
        }
        if !self.unit_type.is_empty() {
            params.push(("UnitType", Cow::Borrowed(self.unit_type.as_str())));
        }
        if self.per_page > 0 {
            params.push(("PerPage", self.per_page.to_string().into()));
        }
        if let Some(page) = self.page {
            params.push(("Page", page.to_string().into()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sourcebox_keeps_unknown_fields() {
        let sb: Sourcebox = serde_json::from_value(json!({
            "Repo": "github.com/docker-library/node",
            "CommitID": "abc123",
            "File": "Dockerfile",
            "HTML": "<pre>FROM debian</pre>",
            "Lines": 12
        }))
        .unwrap();

        assert_eq!(sb.repo, "github.com/docker-library/node");
        assert_eq!(sb.commit_id, "abc123");
        assert_eq!(sb.start_line, None);
        assert_eq!(sb.extra.get("Lines"), Some(&json!(12)));
    }

    #[test]
    fn unit_data_decodes_files() {
        let unit: RepoSourceUnit = serde_json::from_value(json!({
            "Repo": "github.com/a/b",
            "CommitID": "c0ffee",
            "UnitType": "Dockerfile",
            "Unit": "Dockerfile",
            "Data": {"Name": "Dockerfile", "Type": "Dockerfile", "Files": ["docker/Dockerfile"]}
        }))
        .unwrap();

        let su = unit.source_unit().unwrap();
        assert_eq!(su.files, vec!["docker/Dockerfile".to_string()]);
    }

    #[test]
    fn empty_query_is_omitted() {
        let opts = UnitListOptions::dockerfiles("");
        let pairs = opts.to_query_pairs();
        let keys: Vec<_> = pairs.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["UnitType", "PerPage"]);
    }
}
