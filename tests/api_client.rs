//! HTTP client tests against a mock VictoriaMetrics server

use serde_json::json;
use std::io::Cursor;
use std::time::Duration;
use vm_metrics::api::{
    ApiError, ExportApi, ExportFormat, ExportOptions, ImportApi, ImportFormat, ImportOptions,
    QueryApi, QueryResult, VmClient,
};
use vm_metrics::config::Config;
use wiremock::matchers::{basic_auth, bearer_token, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> Config {
    let mut config = Config::defaults().expect("default config");
    config.server.url = server.uri();
    config.server.timeout = Duration::from_secs(5);
    config
}

/// Run blocking client code off the async test runtime.
async fn blocking<T, F>(f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.expect("blocking task")
}

#[tokio::test(flavor = "multi_thread")]
async fn test_instant_query_vector() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .and(query_param("query", "up"))
        .and(query_param("time", "1700000000.000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [{ "metric": { "__name__": "up", "job": "vm" }, "value": [1700000000, "1"] }]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let result = blocking(move || {
        let client = VmClient::new(&config)?;
        client.query("up", chrono::DateTime::from_timestamp(1_700_000_000, 0))
    })
    .await
    .expect("query");

    match result {
        QueryResult::Vector(samples) => {
            assert_eq!(samples.len(), 1);
            assert_eq!(samples[0].metric["job"], "vm");
            assert_eq!(samples[0].value.as_ref().map(|v| v.value), Some(1.0));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_path_prefix_and_bearer_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/select/0/prometheus/api/v1/labels"))
        .and(bearer_token("t0ken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": ["__name__", "job"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.server.url.push('/');
    config.server.path_prefix = "/select/0/prometheus/".to_string();
    config.auth.kind = "bearer".to_string();
    config.auth.token = "t0ken".to_string();

    let labels = blocking(move || VmClient::new(&config)?.labels(None, None)).await.expect("labels");
    assert_eq!(labels, vec!["__name__", "job"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_series_repeats_match_and_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/series"))
        .and(query_param("match[]", "up"))
        .and(query_param("match[]", "process_cpu_seconds_total"))
        .and(basic_auth("admin", "pw"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": [{ "__name__": "up", "job": "vm" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.auth.kind = "basic".to_string();
    config.auth.user = "admin".to_string();
    config.auth.password = "pw".to_string();

    let series = blocking(move || {
        let matches = vec!["up".to_string(), "process_cpu_seconds_total".to_string()];
        VmClient::new(&config)?.series(&matches, None, None)
    })
    .await
    .expect("series");
    assert_eq!(series.len(), 1);
    assert_eq!(series[0]["__name__"], "up");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_api_error_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/query_range"))
        .and(query_param("step", "60"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "status": "error",
            "errorType": "bad_data",
            "error": "unparsable query"
        })))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let err = blocking(move || {
        let end = chrono::Utc::now();
        VmClient::new(&config)?.query_range("up{", end - chrono::Duration::minutes(5), end, Duration::from_secs(60))
    })
    .await
    .unwrap_err();

    match err {
        ApiError::Api { error_type, message } => {
            assert_eq!(error_type, "bad_data");
            assert_eq!(message, "unparsable query");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_non_json_failure_keeps_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/label/job/values"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let err = blocking(move || VmClient::new(&config)?.label_values("job", None, None))
        .await
        .unwrap_err();
    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "overloaded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_export_csv_streams_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/export/csv"))
        .and(query_param("match[]", "up"))
        .and(query_param("format", "__name__,__value__,__timestamp__:unix_s"))
        .respond_with(ResponseTemplate::new(200).set_body_string("up,1,1700000000\n"))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let (written, out) = blocking(move || {
        let options = ExportOptions { matches: vec!["up".to_string()], ..ExportOptions::default() };
        let mut out = Vec::new();
        let written = VmClient::new(&config)?.export(ExportFormat::Csv, &options, &mut out)?;
        Ok::<_, ApiError>((written, out))
    })
    .await
    .expect("export");
    assert_eq!(written, 16);
    assert_eq!(out, b"up,1,1700000000\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_import_prometheus_with_grouping_labels() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/import/prometheus/metrics/job/batch/instance/host-1"))
        .and(header("content-type", "text/plain"))
        .and(body_string("up 1\n"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    blocking(move || {
        let options = ImportOptions { job: Some("batch".into()), instance: Some("host-1".into()) };
        VmClient::new(&config)?.import(ImportFormat::Prometheus, &options, Box::new(Cursor::new(b"up 1\n".to_vec())))
    })
    .await
    .expect("import");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_import_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/import/csv"))
        .respond_with(ResponseTemplate::new(400).set_body_string("missing format query arg"))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let err = blocking(move || {
        VmClient::new(&config)?.import(ImportFormat::Csv, &ImportOptions::default(), Box::new(Cursor::new(Vec::new())))
    })
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 400, .. }));
}

#[test]
fn test_unsupported_auth_type() {
    let mut config = Config::defaults().expect("default config");
    config.auth.kind = "digest".to_string();
    assert!(matches!(VmClient::new(&config), Err(ApiError::UnsupportedAuth(kind)) if kind == "digest"));
}
