//! HTML for the search page and its PJAX results fragment.
use std::fmt::Write;

use url::{Url, form_urlencoded};
use xconf_sourcegraph::{Sourcebox, tree_url};

/// Example queries shown under the search box. An empty entry starts a new
/// row.
pub const POPULAR_QUERIES: &[&str] = &[
    "nodejs",
    "docpad",
    "mysql",
    "postgres",
    "wordpress",
    "ubuntu",
    "apt-get install",
    "add-apt-repository",
    "go get",
    "",
    "RUN",
    "ONBUILD",
    "ENV",
];

const VOTE_FOR: &[(&str, &str)] = &[
    ("Vagrantfile", "Vagrant"),
    (".travis.yml", "Travis CI"),
    ("docker-compose.yml", "Compose"),
    ("Procfile", "Procfile"),
];

const SCRIPT: &str = include_str!("../static/xconf.js");

/// Everything the page needs to know about where it is deployed.
#[derive(Debug, Clone)]
pub struct PageSettings {
    pub sourcegraph_url: Url,
    pub asset_url: Url,
    pub dev: bool,
}

impl PageSettings {
    /// `"."` in dev mode so unminified assets are served, `".min."` otherwise.
    pub fn asset_infix(&self) -> &'static str {
        if self.dev { "." } else { ".min." }
    }

    pub fn asset_url(&self, path: &str) -> String {
        match self.asset_url.join(path) {
            Ok(u) => u.into(),
            Err(_) => path.to_string(),
        }
    }

    fn sourcebox_link(&self, sb: &Sourcebox) -> String {
        match tree_url(&self.sourcegraph_url, &sb.repo, &sb.commit_id, &sb.file) {
            Some(u) => u.into(),
            None => self.sourcegraph_url.to_string(),
        }
    }
}

/// One rendered search: the trimmed query, the documents that arrived, and at
/// most one error flag.
#[derive(Debug, Default)]
pub struct SearchPage {
    pub query: String,
    pub results: Vec<Sourcebox>,
    pub timeout_error: bool,
    pub other_error: bool,
}

pub fn query_url(q: &str) -> String {
    let qs = form_urlencoded::Serializer::new(String::new())
        .append_pair("q", q)
        .finish();
    format!("/?{qs}")
}

/// Tweet-intent link asking for support of another config file type.
pub fn vote_link(vote_for: &str, label: &str, class: &str) -> String {
    let text = format!("I wish #xconf let me search & see examples of {vote_for} config files");
    let text: String = form_urlencoded::byte_serialize(text.as_bytes()).collect();
    let site: String = form_urlencoded::byte_serialize(b"http://xconf.io").collect();
    format!(
        r#"<a class="{}" target="_blank" href="https://twitter.com/intent/tweet?text={text}&amp;via=srcgraph&amp;url={site}">{}</a>"#,
        html_escape(class),
        html_escape(label),
    )
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// The fragment swapped in by PJAX requests.
pub fn render_results(page: &SearchPage, settings: &PageSettings) -> String {
    let mut html = String::from(r#"<div id="results-container">"#);

    if page.timeout_error {
        html.push_str(
            r#"<p class="alert alert-warning">The search timed out. Showing the results that arrived in time.</p>"#,
        );
    }
    if page.other_error {
        html.push_str(r#"<p class="alert alert-danger">Something went wrong while searching.</p>"#);
    }
    if !page.query.is_empty()
        && page.results.is_empty()
        && !page.timeout_error
        && !page.other_error
    {
        let _ = write!(
            html,
            r#"<p class="no-results">No Dockerfiles matched <code>{}</code>.</p>"#,
            html_escape(&page.query)
        );
    }

    html.push_str(r#"<ul id="results">"#);
    for sb in &page.results {
        let _ = write!(
            html,
            r#"<li class="result"><h4><a href="{}">{}</a> <small>{}</small></h4>{}</li>"#,
            html_escape(&settings.sourcebox_link(sb)),
            html_escape(&sb.repo),
            html_escape(&sb.file),
            sb.html,
        );
    }
    html.push_str("</ul></div>");
    html
}

pub fn render_home(page: &SearchPage, settings: &PageSettings) -> String {
    let infix = settings.asset_infix();
    let title = if page.query.is_empty() {
        "xconf: search Dockerfiles".to_string()
    } else {
        format!("{} · xconf", html_escape(&page.query))
    };

    let mut examples = String::new();
    for q in POPULAR_QUERIES {
        if q.is_empty() {
            examples.push_str("<br>");
            continue;
        }
        let _ = write!(
            examples,
            r#"<a href="{}" data-query="{}">{}</a> "#,
            html_escape(&query_url(q)),
            html_escape(q),
            html_escape(q),
        );
    }

    let votes: Vec<String> = VOTE_FOR
        .iter()
        .map(|(file, label)| vote_link(file, label, "vote"))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<link rel="stylesheet" href="{css}">
</head>
<body>
<h1><a href="/">xconf</a></h1>
<form action="/" method="get" data-pjax>
<input id="q" name="q" type="search" value="{query}" placeholder="Search Dockerfiles" autofocus>
</form>
<p id="example-queries">{examples}</p>
<div id="fake-results-container" style="display:none"><p>Searching...</p></div>
<div data-pjax-container>{results}</div>
<p class="votes">Want more? Vote for {votes}</p>
<script src="{jquery}"></script>
<script src="{pjax}"></script>
<script>{script}</script>
</body>
</html>
"#,
        css = html_escape(&settings.asset_url(&format!("sourcebox{infix}css"))),
        query = html_escape(&page.query),
        results = render_results(page, settings),
        votes = votes.join(", "),
        jquery = html_escape(&settings.asset_url(&format!("jquery{infix}js"))),
        pjax = html_escape(&settings.asset_url(&format!("jquery.pjax{infix}js"))),
        script = SCRIPT,
    )
}
