//! End-to-end dispatch tests
//!
//! A directory server and a worker node run in-process on ephemeral ports;
//! the worker crawls a wiremock site and the session talks to it over HTTP.

use ripple_harvest::config::Config;
use ripple_harvest::dispatch::{
    bind_worker, directory_router, run_session, serve, start_worker_nodes, CrawlCall, Directory,
    Dispatcher, HttpDirectory, HttpWorker, MemoryDirectory, SessionRequest, WorkerHandle,
    WorkerSelection, WorkerService,
};
use ripple_harvest::email::EmailRecord;
use ripple_harvest::RemoteCallError;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Starts a directory server and returns a config pointing at it
async fn start_directory() -> Config {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let directory: Arc<dyn Directory> = Arc::new(MemoryDirectory::new());
    tokio::spawn(serve(listener, directory_router(directory)));

    let mut config = Config::default();
    config.directory.port = port;
    config
}

async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><title>Faculty</title></head><body>
            <a href="/people">People</a>
            <p>Front desk: desk@example.edu</p>
            </body></html>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/people"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><title>People</title></head><body>
            <h3>Chairperson</h3>
            <p>chair@example.edu</p>
            </body></html>"#,
        ))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_nodes_register_and_are_discovered() {
    let mut config = start_directory().await;
    config.worker.nodes = 2;

    let directory = HttpDirectory::connect(&config.directory.base_url()).unwrap();
    let nodes = start_worker_nodes(&config, &directory).await.unwrap();
    assert_eq!(nodes.len(), 2);

    let dispatcher = Dispatcher::discover(&directory, &config.directory.worker_prefix)
        .await
        .unwrap();
    let names: Vec<&str> = dispatcher
        .entries()
        .iter()
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(names, vec!["harvest.node.1", "harvest.node.2"]);

    let entry = dispatcher.select(WorkerSelection::Index(1)).unwrap();
    let worker = HttpWorker::connect(entry.handle.clone()).unwrap();
    let identity = bind_worker(entry, &worker).await.unwrap();
    assert_eq!(identity.id, 2);
    assert_eq!(identity.handle, nodes[1].handle);

    let none = Dispatcher::discover(&directory, "other.prefix.").await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_session_through_remote_worker() {
    let site = MockServer::start().await;
    mount_site(&site).await;
    let start = format!("{}/", site.uri());

    let config = start_directory().await;
    let directory = HttpDirectory::connect(&config.directory.base_url()).unwrap();
    start_worker_nodes(&config, &directory).await.unwrap();

    let dispatcher = Dispatcher::discover(&directory, &config.directory.worker_prefix)
        .await
        .unwrap();
    let entry = dispatcher.select(WorkerSelection::First).unwrap();
    let worker = HttpWorker::connect(entry.handle.clone()).unwrap();
    let identity = bind_worker(entry, &worker).await.unwrap();

    let request = SessionRequest::new(start.clone(), 1);
    let aggregate = run_session(&worker, &identity, &request).await;

    assert_eq!(aggregate.worker_id, 1);
    assert_eq!(aggregate.dispatched, vec![start.clone()]);
    assert_eq!(aggregate.total_pages, 2);
    assert_eq!(aggregate.failed_calls, 0);
    assert_eq!(
        aggregate.emails.into_iter().collect::<Vec<_>>(),
        vec![
            EmailRecord::new("chair@example.edu", format!("{}/people", site.uri()), "Chairperson"),
            EmailRecord::new("desk@example.edu", start, "Faculty"),
        ]
    );
}

#[tokio::test]
async fn test_redispatch_skips_pages_the_worker_has_seen() {
    let site = MockServer::start().await;
    mount_site(&site).await;
    let start = format!("{}/", site.uri());
    let people = format!("{}/people", site.uri());

    let config = start_directory().await;
    let directory = HttpDirectory::connect(&config.directory.base_url()).unwrap();
    let nodes = start_worker_nodes(&config, &directory).await.unwrap();
    let worker = HttpWorker::connect(nodes[0].handle.clone()).unwrap();
    let identity = bind_worker(&dispatcher_entry(&directory, &config).await, &worker)
        .await
        .unwrap();

    let request = SessionRequest::new(start.clone(), 1).with_redispatch(true);
    let aggregate = run_session(&worker, &identity, &request).await;

    // The worker already visited /people during the first call
    assert_eq!(aggregate.dispatched, vec![start, people]);
    assert_eq!(aggregate.total_pages, 2);
    assert_eq!(aggregate.emails.len(), 2);
}

async fn dispatcher_entry(
    directory: &HttpDirectory,
    config: &Config,
) -> ripple_harvest::dispatch::DirectoryEntry {
    Dispatcher::discover(directory, &config.directory.worker_prefix)
        .await
        .unwrap()
        .select(WorkerSelection::First)
        .cloned()
        .unwrap()
}

#[tokio::test]
async fn test_crawl_survives_caller_hanging_up() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><title>Faculty</title></head><body>
            <a href="/people">People</a><p>desk@example.edu</p></body></html>"#,
        ))
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/people"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><p>chair@example.edu</p></body></html>")
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&site)
        .await;
    let start = format!("{}/", site.uri());

    let config = start_directory().await;
    let directory = HttpDirectory::connect(&config.directory.base_url()).unwrap();
    let nodes = start_worker_nodes(&config, &directory).await.unwrap();

    // A caller that gives up long before the worker is done
    let impatient = reqwest::Client::builder()
        .timeout(Duration::from_millis(300))
        .build()
        .unwrap();
    let hung_up = impatient
        .post(format!("{}/crawl", nodes[0].handle))
        .json(&CrawlCall {
            start_url: start.clone(),
            time_limit_minutes: 1,
        })
        .send()
        .await;
    assert!(hung_up.is_err());

    tokio::time::sleep(Duration::from_secs(2)).await;

    let worker = HttpWorker::connect(nodes[0].handle.clone()).unwrap();
    assert_eq!(worker.crawl(&start, 1).await.unwrap(), 0);
    assert_eq!(worker.get_emails().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_invalid_url_is_rejected_by_worker() {
    let config = start_directory().await;
    let directory = HttpDirectory::connect(&config.directory.base_url()).unwrap();
    let nodes = start_worker_nodes(&config, &directory).await.unwrap();
    let worker = HttpWorker::connect(nodes[0].handle.clone()).unwrap();

    let err = worker.crawl("not a url", 1).await.unwrap_err();
    assert!(matches!(err, RemoteCallError::Rejected { status: 400, .. }));
}

#[tokio::test]
async fn test_unreachable_worker() {
    let worker = HttpWorker::connect(WorkerHandle::new("http://127.0.0.1:9")).unwrap();
    let err = worker.get_identity().await.unwrap_err();
    assert!(matches!(err, RemoteCallError::Unreachable { .. }));
}
