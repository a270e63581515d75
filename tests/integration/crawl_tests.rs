//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use ripple_harvest::config::Config;
use ripple_harvest::crawler::{crawl, CrawlBudget, CrawlRequest};
use ripple_harvest::email::{encode_cf_email, EmailRecord, NO_TITLE};
use ripple_harvest::output::{save_report, statistics_for, ElapsedUnit, OutputPaths};
use ripple_harvest::state::{CrawlState, StopReason};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Home links to an about page, a missing page, a PDF and another site
async fn mount_site(server: &MockServer) {
    let base = server.uri();

    mount_page(
        server,
        "/",
        format!(
            r#"<html><head><title>Home</title></head><body>
            <a href="/about">About</a>
            <a href="{base}/missing">Missing</a>
            <a href="/brochure.pdf">Brochure</a>
            <a href="https://other.example/people">Elsewhere</a>
            <h2>Contact</h2>
            <p>Write to info@example.edu</p>
            </body></html>"#
        ),
    )
    .await;

    mount_page(
        server,
        "/about",
        format!(
            r#"<html><head><title>About Us</title></head><body>
            <a href="/">Home</a>
            <span class="__cf_email__" data-cfemail="{}">[email protected]</span>
            </body></html>"#,
            encode_cf_email("dean@example.edu", 0x42)
        ),
    )
    .await;

    mount_page(
        server,
        "/brochure.pdf",
        "<html><body>never@fetched.edu</body></html>".to_string(),
    )
    .await;
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let start = format!("{}/", server.uri());

    let request = CrawlRequest::new(start.clone(), CrawlBudget::from_minutes(1));
    let (report, emails) = crawl(&Config::default(), &request)
        .await
        .expect("crawl should run");

    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.pages_failed, 1);
    assert_eq!(report.new_emails, 2);
    assert_eq!(report.state, CrawlState::Done(StopReason::FrontierEmpty));

    let expected = vec![
        EmailRecord::new("dean@example.edu", format!("{}/about", server.uri()), "About Us"),
        EmailRecord::new("info@example.edu", start.clone(), "Contact"),
    ];
    assert_eq!(emails.into_iter().collect::<Vec<_>>(), expected);

    // The PDF and the off-origin link are never requested
    let requests = server.received_requests().await.expect("recording enabled");
    assert!(requests.iter().all(|r| r.url.path() != "/brochure.pdf"));
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_crawl_respects_page_ceiling() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let budget = CrawlBudget::from_minutes(1).max_units(Some(1));
    let request = CrawlRequest::new(format!("{}/", server.uri()), budget);
    let (report, emails) = crawl(&Config::default(), &request).await.unwrap();

    assert_eq!(report.pages_visited, 1);
    assert_eq!(report.state, CrawlState::Done(StopReason::UnitLimit));
    assert_eq!(emails.len(), 1);
}

#[tokio::test]
async fn test_crawl_with_zero_time_limit_fetches_nothing() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let budget = CrawlBudget::with_time_limit(Duration::ZERO);
    let request = CrawlRequest::new(format!("{}/", server.uri()), budget);
    let (report, emails) = crawl(&Config::default(), &request).await.unwrap();

    assert_eq!(report.pages_visited, 0);
    assert_eq!(report.state, CrawlState::Done(StopReason::TimeLimit));
    assert!(emails.is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_start_still_reports() {
    let request = CrawlRequest::new("http://127.0.0.1:9/", CrawlBudget::from_minutes(1));
    let (report, emails) = crawl(&Config::default(), &request).await.unwrap();

    assert_eq!(report.pages_visited, 0);
    assert_eq!(report.pages_failed, 1);
    assert!(emails.is_empty());
}

#[tokio::test]
async fn test_crawl_output_files() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body><a href="/cdn-cgi/l/email-protection#7a1e1f1b143a1f021b170a161f541f1e0f">x</a></body></html>"#
            .to_string(),
    )
    .await;

    let request = CrawlRequest::new(format!("{}/", server.uri()), CrawlBudget::from_minutes(1));
    let (report, emails) = crawl(&Config::default(), &request).await.unwrap();
    assert_eq!(emails.len(), 1);
    assert_eq!(emails.iter().next().unwrap().context, NO_TITLE);

    let dir = tempfile::tempdir().unwrap();
    let paths = OutputPaths::new(
        dir.path().join("emails.csv").to_string_lossy(),
        dir.path().join("stats.txt").to_string_lossy(),
    );
    let stats = statistics_for(
        report.pages_visited,
        &emails,
        report.started_at,
        report.elapsed,
        ElapsedUnit::Seconds,
    );
    save_report(&paths, &emails, &stats).unwrap();

    let csv = std::fs::read_to_string(&paths.emails).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("Email,Source URL,Webpage Title"));
    assert_eq!(
        lines.next(),
        Some(format!("dean@example.edu,{}/,No Title", server.uri()).as_str())
    );

    let text = std::fs::read_to_string(&paths.stats).unwrap();
    assert!(text.contains("Total Pages Crawled: 1"));
    assert!(text.contains("Total Emails Found: 1"));
    assert!(text.contains("Time taken:"));
}
