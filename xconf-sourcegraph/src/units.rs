//! The search step: resolve a text query to sourcebox URLs via the `.units`
//! listing.
use std::time::Instant;

use url::Url;
use xconf_http::{HttpClient, HttpError, RequestOpts};

use crate::error::QueryError;
use crate::types::{RepoSourceUnit, Target, UnitListOptions};

const DOCKERFILE_INSTRUCTIONS: &[&str] = &[
    "from",
    "maintainer",
    "run",
    "cmd",
    "expose",
    "env",
    "add",
    "copy",
    "entrypoint",
    "volume",
    "user",
    "workdir",
    "onbuild",
];

/// Rewrite a query that is exactly one Dockerfile instruction.
///
/// The units index searches JSON-encoded file text, where an instruction at
/// the start of a line reads `\nADD`; prefixing `n` matches that.
pub fn search_text(query: &str) -> String {
    let lower = query.to_ascii_lowercase();
    if DOCKERFILE_INSTRUCTIONS.contains(&lower.as_str()) {
        format!("n{query}")
    } else {
        query.to_string()
    }
}

/// `{site}/{repo}@{commit}/.tree/{file}`, rooted at the site (any base path is
/// dropped). Each path segment is percent-escaped, so `#`, `?` and `%` in file
/// names stay part of the path. `None` if `site` cannot carry a path.
pub fn tree_url(site: &Url, repo: &str, commit: &str, file: &str) -> Option<Url> {
    let mut url = site.clone();
    url.set_query(None);
    url.set_fragment(None);
    let rev = format!("{repo}@{commit}");
    url.path_segments_mut()
        .ok()?
        .clear()
        .extend(rev.split('/'))
        .push(".tree")
        .extend(file.split('/'));
    Some(url)
}

/// Client for the `.units` endpoint. `http` must be anchored at the API root
/// (`{site}/api/`).
#[derive(Clone, Debug)]
pub struct UnitsApi {
    http: HttpClient,
}

impl UnitsApi {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn list(&self, opts: &UnitListOptions) -> Result<Vec<RepoSourceUnit>, HttpError> {
        let started = Instant::now();
        tracing::info!(
            target: "sourcegraph.units",
            query = %opts.query,
            unit_type = %opts.unit_type,
            per_page = opts.per_page,
            "units.list.start"
        );

        let result = self
            .http
            .get_json::<Vec<RepoSourceUnit>>(
                ".units",
                RequestOpts {
                    query: Some(opts.to_query_pairs()),
                    ..Default::default()
                },
            )
            .await;

        match &result {
            Ok(units) => tracing::info!(
                target: "sourcegraph.units",
                query = %opts.query,
                count = units.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "units.list.success"
            ),
            Err(e) => tracing::warn!(
                target: "sourcegraph.units",
                query = %opts.query,
                error = %e,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "units.list.error"
            ),
        }
        result
    }

    /// Address of the sourcebox for the first file of `unit`.
    ///
    /// Resolved against the site root, so the `/api/` part of the base is
    /// dropped.
    pub fn sourcebox_url(&self, unit: &RepoSourceUnit) -> Result<Target, QueryError> {
        let su = unit.source_unit().map_err(|e| QueryError::Unit {
            repo: unit.repo.clone(),
            message: e.to_string(),
        })?;
        let file = su.files.first().ok_or_else(|| QueryError::Unit {
            repo: unit.repo.clone(),
            message: "unit lists no files".to_string(),
        })?;

        let mut url = tree_url(self.http.base(), &unit.repo, &unit.commit_id, file)
            .ok_or_else(|| QueryError::Url(format!("{} cannot carry a path", self.http.base())))?;
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(".sourcebox.json");
        }
        Ok(Target::from(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn api() -> UnitsApi {
        UnitsApi::new(HttpClient::new("https://sourcegraph.com/api/").unwrap())
    }

    fn unit(data: serde_json::Value) -> RepoSourceUnit {
        RepoSourceUnit {
            repo: "github.com/docker-library/node".into(),
            commit_id: "0a1b2c".into(),
            unit_type: "Dockerfile".into(),
            unit: "Dockerfile".into(),
            data,
        }
    }

    #[test]
    fn instruction_queries_get_prefixed() {
        assert_eq!(search_text("ADD"), "nADD");
        assert_eq!(search_text("onbuild"), "nonbuild");
        assert_eq!(search_text("Run"), "nRun");
    }

    #[test]
    fn other_queries_are_untouched() {
        assert_eq!(search_text("nodejs"), "nodejs");
        assert_eq!(search_text("RUN apt-get"), "RUN apt-get");
        assert_eq!(search_text(""), "");
    }

    #[test]
    fn sourcebox_url_is_resolved_against_site_root() {
        let target = api()
            .sourcebox_url(&unit(json!({"Files": ["0.10/Dockerfile"]})))
            .unwrap();
        assert_eq!(
            target.as_str(),
            "https://sourcegraph.com/github.com/docker-library/node@0a1b2c/.tree/0.10/Dockerfile/.sourcebox.json"
        );
    }

    #[test]
    fn reserved_characters_in_file_names_are_escaped() {
        let target = api()
            .sourcebox_url(&unit(json!({"Files": ["a#b/x?y/100%25/Dockerfile"]})))
            .unwrap();
        let url = Url::parse(target.as_str()).unwrap();

        assert_eq!(
            url.path(),
            "/github.com/docker-library/node@0a1b2c/.tree/a%23b/x%3Fy/100%2525/Dockerfile/.sourcebox.json"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn tree_url_drops_base_path_query_and_fragment() {
        let site = Url::parse("https://sourcegraph.com/api/?x=1#top").unwrap();
        let url = tree_url(&site, "github.com/a/b", "c1", "Dockerfile").unwrap();
        assert_eq!(url.as_str(), "https://sourcegraph.com/github.com/a/b@c1/.tree/Dockerfile");
    }

    #[test]
    fn unit_without_files_is_an_error() {
        let err = api().sourcebox_url(&unit(json!({"Files": []}))).unwrap_err();
        assert!(matches!(err, QueryError::Unit { .. }), "{err:?}");
    }

    #[test]
    fn undecodable_unit_data_is_an_error() {
        let err = api()
            .sourcebox_url(&unit(serde_json::Value::Null))
            .unwrap_err();
        assert!(err.to_string().contains("docker-library/node"), "{err}");
    }
}
