//! End-to-end tests driving the interceptor over real sockets.

use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use keda_interceptor::config::{FailoverConfig, PlaceholderConfig};
use keda_interceptor::queue::QueueCounter;

mod common;

use common::{client, config, start_interceptor, target};

#[tokio::test]
async fn unmatched_host_gets_404() {
    let backend = common::start_fixed_backend("hello").await;
    let mut t = target("app", backend);
    t.hosts = vec!["app.example.com".into()];
    let harness = start_interceptor(config(vec![t])).await;

    let res = client().get(harness.url("/")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(res.text().await.unwrap(), "Not Found");
}

#[tokio::test]
async fn probe_user_agent_gets_probe_state() {
    let harness = start_interceptor(config(Vec::new())).await;

    let res = client()
        .get(harness.url("/healthz"))
        .header("User-Agent", "kube-probe/1.30")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 503);

    harness.probe.check_once().await;
    let res = client()
        .get(harness.url("/healthz"))
        .header("User-Agent", "kube-probe/1.30")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn forwards_and_echoes_request_id() {
    let backend = common::start_fixed_backend("hello").await;
    let harness = start_interceptor(config(vec![target("app", backend)])).await;

    let res = client()
        .get(harness.url("/"))
        .header("x-request-id", "abc-123")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-request-id"], "abc-123");
    assert_eq!(res.headers()["x-keda-http-cold-start"], "false");
    assert_eq!(res.text().await.unwrap(), "hello");
}

#[tokio::test]
async fn unreachable_backend_returns_502() {
    let backend = common::unused_addr().await;
    let harness = start_interceptor(config(vec![target("app", backend)])).await;

    let res = client().get(harness.url("/")).send().await.unwrap();
    assert_eq!(res.status(), 502);
    assert_eq!(res.text().await.unwrap(), "Bad Gateway");
}

#[tokio::test]
async fn dial_retries_wait_out_the_backoff() {
    let backend = common::unused_addr().await;
    let mut cfg = config(vec![target("app", backend)]);
    cfg.dial_backoff.steps = 3;
    cfg.dial_backoff.factor = 1.0;
    let harness = start_interceptor(cfg).await;

    let started = Instant::now();
    let res = client().get(harness.url("/")).send().await.unwrap();
    assert_eq!(res.status(), 502);
    // Two sleeps of the 50ms connect timeout between three attempts.
    assert!(started.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn slow_response_headers_time_out() {
    let backend = common::start_silent_backend().await;
    let mut cfg = config(vec![target("app", backend)]);
    cfg.timeouts.response_header_ms = 200;
    let harness = start_interceptor(cfg).await;

    let started = Instant::now();
    let res = client().get(harness.url("/")).send().await.unwrap();
    let elapsed = started.elapsed();
    assert_eq!(res.status(), 502);
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_secs(5));
}

#[tokio::test]
async fn slow_upload_does_not_count_against_header_timeout() {
    let backend = common::start_upload_backend().await;
    let mut cfg = config(vec![target("app", backend)]);
    cfg.timeouts.response_header_ms = 200;
    let harness = start_interceptor(cfg).await;

    let mut socket = TcpStream::connect(harness.addr).await.unwrap();
    socket
        .write_all(b"POST /upload HTTP/1.1\r\nHost: app\r\nContent-Length: 10\r\nConnection: close\r\n\r\nhello")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;
    socket.write_all(b"world").await.unwrap();

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), socket.read_to_end(&mut response))
        .await
        .unwrap()
        .unwrap();
    let response = String::from_utf8_lossy(&response);
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.ends_with("helloworld"), "{response}");
}

#[tokio::test]
async fn appends_peer_to_forwarded_for() {
    let backend = common::start_echo_backend().await;
    let harness = start_interceptor(config(vec![target("app", backend)])).await;

    let res = client()
        .get(harness.url("/"))
        .header("X-Forwarded-For", "1.2.3.4")
        .header("X-Forwarded-For", "5.6.7.8")
        .send()
        .await
        .unwrap();
    let head = res.text().await.unwrap().to_lowercase();
    assert!(head.contains("x-forwarded-for: 1.2.3.4, 5.6.7.8, 127.0.0.1\r\n"), "{head}");
}

#[tokio::test]
async fn preserves_path_and_query() {
    let backend = common::start_echo_backend().await;
    let harness = start_interceptor(config(vec![target("app", backend)])).await;

    let res = client().get(harness.url("/a/b?x=1&y=two")).send().await.unwrap();
    let head = res.text().await.unwrap();
    assert!(head.starts_with("GET /a/b?x=1&y=two HTTP/1.1\r\n"), "{head}");
}

#[tokio::test]
async fn redirects_pass_through_untouched() {
    let backend = common::start_redirect_backend("/elsewhere").await;
    let harness = start_interceptor(config(vec![target("app", backend)])).await;

    let res = client().get(harness.url("/")).send().await.unwrap();
    assert_eq!(res.status(), 302);
    assert_eq!(res.headers()["location"], "/elsewhere");
}

#[tokio::test]
async fn concurrent_requests_leave_count_at_zero() {
    let backend = common::start_fixed_backend("ok").await;
    let harness = start_interceptor(config(vec![target("app", backend)])).await;
    let client = client();

    let requests = (0..20).map(|_| {
        let client = client.clone();
        let url = harness.url("/");
        tokio::spawn(async move { client.get(url).send().await.unwrap().text().await.unwrap() })
    });
    for handle in requests {
        assert_eq!(handle.await.unwrap(), "ok");
    }

    for _ in 0..100 {
        if harness.queue.current_for_host("test/app").await == Some(0) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("pending count did not return to zero");
}

#[tokio::test]
async fn mixed_outcomes_leave_every_count_at_zero() {
    let good = common::start_fixed_backend("ok").await;
    let bad = common::unused_addr().await;
    let mut ok_target = target("good", good);
    ok_target.path_prefixes = vec!["/good".into()];
    let mut failing = target("bad", bad);
    failing.path_prefixes = vec!["/bad".into()];
    let harness = start_interceptor(config(vec![ok_target, failing])).await;
    let client = client();

    let requests = (0..20).map(|i| {
        let client = client.clone();
        let (path, expected) = if i % 2 == 0 { ("/good", 200) } else { ("/bad", 502) };
        let url = harness.url(path);
        tokio::spawn(async move {
            let res = client.get(url).send().await.unwrap();
            assert_eq!(res.status(), expected);
            res.bytes().await.unwrap();
        })
    });
    for handle in requests {
        handle.await.unwrap();
    }

    for _ in 0..100 {
        let counts = harness.queue.current().await;
        if counts.get("test/good") == Some(&0) && counts.get("test/bad") == Some(&0) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("pending counts did not return to zero: {:?}", harness.queue.current().await);
}

#[tokio::test]
async fn cold_workload_serves_placeholder() {
    let backend = common::start_fixed_backend("warm").await;
    let mut t = target("app", backend);
    t.placeholder = Some(PlaceholderConfig {
        enabled: true,
        content: Some("<p>{{ .Namespace }} waking</p>".into()),
        ..Default::default()
    });
    let harness = start_interceptor(config(vec![t])).await;
    harness.readiness.set("test/app", 0);

    let res = client().get(harness.url("/")).send().await.unwrap();
    assert_eq!(res.status(), 503);
    assert_eq!(res.headers()["x-keda-http-placeholder-served"], "true");
    assert_eq!(res.text().await.unwrap(), "<p>test waking</p>");
}

#[tokio::test]
async fn cold_workload_is_held_until_ready() {
    let backend = common::start_fixed_backend("warm").await;
    let harness = start_interceptor(config(vec![target("app", backend)])).await;
    harness.readiness.set("test/app", 0);

    let readiness = harness.readiness.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        readiness.set("test/app", 1);
    });

    let res = client().get(harness.url("/")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-keda-http-cold-start"], "true");
    assert_eq!(res.text().await.unwrap(), "warm");
}

#[tokio::test]
async fn cold_workload_without_failover_times_out() {
    let backend = common::start_fixed_backend("warm").await;
    let mut cfg = config(vec![target("app", backend)]);
    cfg.timeouts.workload_replicas_ms = 100;
    let harness = start_interceptor(cfg).await;
    harness.readiness.set("test/app", 0);

    let res = client().get(harness.url("/")).send().await.unwrap();
    assert_eq!(res.status(), 502);
}

#[tokio::test]
async fn cold_workload_fails_over() {
    let primary = common::start_fixed_backend("primary").await;
    let secondary = common::start_fixed_backend("failover").await;
    let mut t = target("app", primary);
    t.failover = Some(FailoverConfig {
        service: secondary.ip().to_string(),
        port: secondary.port(),
        timeout_ms: 100,
    });
    let harness = start_interceptor(config(vec![t])).await;
    harness.readiness.set("test/app", 0);

    let res = client().get(harness.url("/")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "failover");
}
