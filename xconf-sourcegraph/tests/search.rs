use std::time::Duration;

use serde_json::{Value, json};
use tokio::time::Instant;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use xconf_http::HttpClient;
use xconf_sourcegraph::{
    AggregateError, FetchError, Fetcher, QueryError, SearchSettings, SourceboxFetcher,
    SourceboxSearch, Target,
};

fn unit(repo: &str, commit: &str, file: &str) -> Value {
    json!({
        "Repo": repo,
        "CommitID": commit,
        "UnitType": "Dockerfile",
        "Unit": file,
        "Data": {"Name": file, "Type": "Dockerfile", "Files": [file]}
    })
}

fn sourcebox(repo: &str, file: &str) -> Value {
    json!({
        "Repo": repo,
        "CommitID": "c1",
        "File": file,
        "StartLine": 1,
        "EndLine": 3,
        "HTML": "<pre>FROM ubuntu</pre>"
    })
}

async fn mount_sourcebox(server: &MockServer, repo: &str, file: &str, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(format!("/{repo}@c1/.tree/{file}/.sourcebox.json")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(sourcebox(repo, file))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

fn connect(server: &MockServer) -> SourceboxSearch {
    connect_with_timeout(server, Duration::from_secs(10))
}

fn connect_with_timeout(server: &MockServer, client_timeout: Duration) -> SourceboxSearch {
    SourceboxSearch::connect(&SearchSettings {
        sourcegraph_url: server.uri(),
        client_timeout,
        cache: None,
    })
    .unwrap()
}

#[tokio::test]
async fn partial_results_with_timeout_when_one_sourcebox_is_slow() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/.units"))
        .and(query_param("Query", "nodejs"))
        .and(query_param("UnitType", "Dockerfile"))
        .and(query_param("PerPage", "4"))
        .and(header("user-agent", "xconf/0.0.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            unit("github.com/a/one", "c1", "Dockerfile"),
            unit("github.com/a/two", "c1", "Dockerfile"),
            unit("github.com/a/three", "c1", "Dockerfile"),
        ])))
        .mount(&server)
        .await;
    mount_sourcebox(&server, "github.com/a/one", "Dockerfile", Duration::from_millis(10)).await;
    mount_sourcebox(&server, "github.com/a/two", "Dockerfile", Duration::from_millis(10)).await;
    mount_sourcebox(&server, "github.com/a/three", "Dockerfile", Duration::from_secs(5)).await;

    let search = connect(&server);
    let started = Instant::now();
    let result = search
        .query("nodejs", started + Duration::from_millis(800))
        .await
        .expect("search step succeeds");

    assert!(started.elapsed() < Duration::from_secs(3));
    let mut repos: Vec<_> = result.documents.iter().map(|sb| sb.repo.clone()).collect();
    repos.sort();
    assert_eq!(repos, vec!["github.com/a/one", "github.com/a/two"]);
    assert!(matches!(
        result.error,
        Some(AggregateError::Timeout { outstanding: 1, .. })
    ));
}

#[tokio::test]
async fn transport_timeout_on_a_target_counts_as_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/.units"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            unit("github.com/a/quick", "c1", "Dockerfile"),
            unit("github.com/a/stuck", "c1", "Dockerfile"),
        ])))
        .mount(&server)
        .await;
    mount_sourcebox(&server, "github.com/a/quick", "Dockerfile", Duration::ZERO).await;
    mount_sourcebox(&server, "github.com/a/stuck", "Dockerfile", Duration::from_secs(3)).await;

    let result = connect_with_timeout(&server, Duration::from_millis(200))
        .query("redis", Instant::now() + Duration::from_secs(10))
        .await
        .unwrap();

    assert_eq!(result.documents.len(), 1);
    assert_eq!(result.documents[0].repo, "github.com/a/quick");
    let err = result.error.expect("stuck fetch surfaces");
    assert!(
        matches!(&err, AggregateError::Fetch(FetchError::Http(e)) if e.is_timeout()),
        "{err:?}"
    );
    assert!(err.is_timeout());
}

#[tokio::test]
async fn instruction_query_is_rewritten_and_empty_listing_is_ok() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/.units"))
        .and(query_param("Query", "nADD"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let result = connect(&server)
        .query("ADD", Instant::now() + Duration::from_secs(1))
        .await
        .unwrap();

    assert!(result.documents.is_empty());
    assert!(result.error.is_none());
}

#[tokio::test]
async fn failed_search_step_fails_the_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/.units"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = connect(&server)
        .query("mysql", Instant::now() + Duration::from_secs(1))
        .await
        .unwrap_err();

    assert!(matches!(err, QueryError::Search(_)), "{err:?}");
    assert!(!err.is_timeout());
}

#[tokio::test]
async fn bad_status_on_only_target_is_the_representative_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/.units"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([unit("github.com/a/gone", "c1", "Dockerfile")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/github.com/a/gone@c1/.tree/Dockerfile/.sourcebox.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = connect(&server)
        .query("postgres", Instant::now() + Duration::from_secs(2))
        .await
        .unwrap();

    assert!(result.documents.is_empty());
    let err = result.error.expect("bad status surfaces");
    assert!(!err.is_timeout());
    assert!(err.to_string().contains("404"), "{err}");
}

#[tokio::test]
async fn fetcher_distinguishes_failure_kinds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sourcebox("github.com/x/y", "Dockerfile")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/garbled.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forbidden.json"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let fetcher = SourceboxFetcher::new(HttpClient::new(&server.uri()).unwrap());
    let at = |p: &str| Target::new(format!("{}{p}", server.uri()));

    let sb = fetcher.fetch(&at("/ok.json")).await.unwrap();
    assert_eq!(sb.file, "Dockerfile");
    assert_eq!(sb.end_line, Some(3));

    match fetcher.fetch(&at("/garbled.json")).await {
        Err(FetchError::Http(xconf_http::HttpError::Decode(..))) => {}
        other => panic!("expected decode failure, got {other:?}"),
    }
    match fetcher.fetch(&at("/forbidden.json")).await {
        Err(FetchError::Http(e)) => assert_eq!(e.status().map(|s| s.as_u16()), Some(403)),
        other => panic!("expected status failure, got {other:?}"),
    }
}
