//! Client and command tests against a local mock of the GitHub REST API.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};
use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use github_tools::commands::issue_stats::{self, sync_cache, IssueStatsArgs};
use github_tools::commands::merged_prs::merged_pulls_since;
use github_tools::{GitHubClientBuilder, IssueCache, MergeSummary, Repository};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clap::Parser;

const REPO_PATH: &str = "/repos/openframeworks/openFrameworks";

fn repo() -> Repository {
    Repository::new("openframeworks", "openFrameworks")
}

fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 3, 1, 0, 0, 0).unwrap() + Duration::days(n)
}

fn builder(server: &MockServer) -> GitHubClientBuilder {
    GitHubClientBuilder::new()
        .token("test-token")
        .api_base_url(server.uri())
        .timeout(5)
        .mergeable_poll_interval_ms(0)
}

fn issue_json(number: u64, created: i64, updated: i64, closed: Option<i64>) -> Value {
    json!({
        "number": number,
        "title": format!("issue {}", number),
        "state": if closed.is_some() { "closed" } else { "open" },
        "user": {"login": "ofTheo"},
        "labels": [],
        "created_at": day(created),
        "updated_at": day(updated),
        "closed_at": closed.map(day),
        "html_url": format!("https://github.com/openframeworks/openFrameworks/issues/{}", number)
    })
}

fn pull_json(number: u64, updated: DateTime<Utc>, mergeable: Option<bool>) -> Value {
    json!({
        "number": number,
        "title": format!("pull {}", number),
        "state": "closed",
        "user": {"login": "dimitre"},
        "created_at": updated - Duration::days(2),
        "updated_at": updated,
        "closed_at": updated,
        "merged_at": updated,
        "html_url": format!("https://github.com/openframeworks/openFrameworks/pull/{}", number),
        "mergeable": mergeable
    })
}

#[tokio::test]
async fn test_mergeability_polling_gives_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/pulls/5", REPO_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(pull_json(5, day(0), None)))
        .expect(3)
        .mount(&server)
        .await;

    let client = builder(&server).max_mergeable_polls(3).build().unwrap();
    assert_eq!(client.fetch_pull_mergeable(&repo(), 5).await.unwrap(), None);
    assert_eq!(client.request_count(), 3);
}

#[tokio::test]
async fn test_mergeability_polling_settles() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/pulls/6", REPO_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(pull_json(6, day(0), None)))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/pulls/6", REPO_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(pull_json(6, day(0), Some(false))))
        .mount(&server)
        .await;

    let client = builder(&server).max_mergeable_polls(10).build().unwrap();
    assert_eq!(client.fetch_pull_mergeable(&repo(), 6).await.unwrap(), Some(false));
    assert_eq!(client.request_count(), 3);
}

#[tokio::test]
async fn test_merged_listing_stops_at_threshold() {
    let server = MockServer::start().await;
    let threshold = day(0);
    // A full first page, most recently updated first; the last 40 predate the threshold.
    let page: Vec<Value> = (0..100)
        .map(|i| pull_json(1000 - i, threshold + Duration::hours(60 - i as i64), None))
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("{}/pulls", REPO_PATH)))
        .and(query_param("page", "1"))
        .and(query_param("sort", "updated"))
        .and(query_param("direction", "desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/pulls", REPO_PATH)))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let client = builder(&server).build().unwrap();
    let merged = merged_pulls_since(&client, &repo(), threshold).await.unwrap();
    assert_eq!(merged.len(), 60);
    assert!(merged.iter().all(|pr| pr.updated_at > threshold));
    assert_eq!(client.request_count(), 1);
}

#[tokio::test]
async fn test_sync_requests_full_history_then_updates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/issues", REPO_PATH)))
        .and(query_param("state", "all"))
        .and(query_param("sort", "created"))
        .and(query_param_is_missing("since"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            issue_json(1, 0, 0, None),
            issue_json(2, 0, 1, Some(1)),
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/issues", REPO_PATH)))
        .and(query_param("since", "2021-03-02T00:00:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            issue_json(2, 0, 1, Some(1)),
            issue_json(1, 0, 3, Some(3)),
            issue_json(3, 2, 2, None),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = builder(&server).build().unwrap();
    let mut cache = IssueCache::new();

    let full = sync_cache(&client, &repo(), &mut cache).await.unwrap();
    assert_eq!(full.inserted, 2);
    assert_eq!(cache.last_update(), Some(day(1)));

    let update = sync_cache(&client, &repo(), &mut cache).await.unwrap();
    assert_eq!(
        update,
        MergeSummary {
            inserted: 1,
            refreshed: 1,
            skipped: 1
        }
    );
    assert_eq!(cache.len(), 3);
    assert_eq!(cache.get(1).and_then(|r| r.closed_at), Some(day(3)));
}

async fn mount_stats_endpoints(server: &MockServer, tags: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(REPO_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"open_issues_count": 1})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/issues", REPO_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            issue_json(1, 0, 0, None),
            issue_json(2, 3, 20, Some(20)),
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/tags", REPO_PATH)))
        .respond_with(tags)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/commits", REPO_PATH)))
        .and(query_param("sha", "master"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
}

fn stats_args(server: &MockServer, dir: &Path) -> IssueStatsArgs {
    let token_file = dir.join("github_token.txt");
    fs::write(&token_file, "test-token\n").unwrap();
    let config_file = dir.join("config.json");
    let config = json!({
        "github": {"api_base_url": server.uri()},
        "stats": {
            "cache_path": dir.join("cache").join("issues.json"),
            "output_dir": dir.join("charts"),
            "location_file": dir.join("repo_location.txt")
        }
    });
    fs::write(&config_file, config.to_string()).unwrap();

    IssueStatsArgs::parse_from([
        OsStr::new("plot-issue-stats"),
        OsStr::new("--config"),
        config_file.as_os_str(),
        OsStr::new("--token-file"),
        token_file.as_os_str(),
    ])
}

#[tokio::test]
async fn test_stats_run_writes_chart_and_cache() {
    let server = MockServer::start().await;
    mount_stats_endpoints(&server, ResponseTemplate::new(200).set_body_json(json!([]))).await;
    let dir = tempfile::tempdir().unwrap();
    let args = stats_args(&server, dir.path());

    let mut out = Vec::new();
    issue_stats::run(&args, &mut out).await.unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("GitHub shows 1 open issues."));
    assert!(text.contains("2 issues on record"));

    let cache = IssueCache::load(&dir.path().join("cache").join("issues.json"), &repo()).unwrap();
    assert_eq!(cache.len(), 2);
    assert_eq!(fs::read_dir(dir.path().join("charts")).unwrap().count(), 1);
}

#[tokio::test]
async fn test_failed_stats_run_leaves_cache_alone() {
    let server = MockServer::start().await;
    let not_found = ResponseTemplate::new(404).set_body_json(json!({
        "message": "Not Found",
        "documentation_url": "https://docs.github.com/rest"
    }));
    mount_stats_endpoints(&server, not_found).await;
    let dir = tempfile::tempdir().unwrap();
    let args = stats_args(&server, dir.path());

    let mut out = Vec::new();
    assert!(issue_stats::run(&args, &mut out).await.is_err());
    assert!(!dir.path().join("cache").join("issues.json").exists());
}

#[tokio::test]
async fn test_env_token_needs_opt_in() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("github_token.txt");
    std::env::set_var("GITHUB_TOOLS_MOCK_TOKEN", "ghp_env");

    assert!(GitHubClientBuilder::new().token_file(&missing).build().is_err());
    assert!(GitHubClientBuilder::new()
        .token_file(&missing)
        .token_env_var("GITHUB_TOOLS_MOCK_TOKEN")
        .build()
        .is_ok());
}
