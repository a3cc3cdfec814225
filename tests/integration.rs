//! Integration tests for the XMLA proxy HTTP API.
//!
//! Each test starts a server on an ephemeral port, backed by a scripted
//! engine, and uses reqwest to exercise the endpoints.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use parking_lot::Mutex;
use reqwest::Client;
use reqwest::header::HeaderValue;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use xmla_proxy::config::Config;
use xmla_service::engine::{ConnectionDescriptor, Connector, EngineError, EngineSession, Rowset};

// ---------------------------------------------------------------------------
// Scripted engine
// ---------------------------------------------------------------------------

enum Step {
    Rows(Rowset),
    Fail(EngineError),
    Panic,
}

#[derive(Default)]
struct Journal {
    connects: usize,
    closes: usize,
    statements: Vec<String>,
    descriptor: Option<ConnectionDescriptor>,
}

/// Engine that replays one step per executed statement.
#[derive(Clone)]
struct ScriptedEngine {
    script: Arc<Mutex<VecDeque<Step>>>,
    journal: Arc<Mutex<Journal>>,
    refuse: Option<String>,
}

impl ScriptedEngine {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            script: Arc::new(Mutex::new(steps.into())),
            journal: Arc::default(),
            refuse: None,
        }
    }

    fn refusing(message: &str) -> Self {
        Self {
            refuse: Some(message.to_owned()),
            ..Self::new(vec![])
        }
    }

    fn connects(&self) -> usize {
        self.journal.lock().connects
    }

    fn closes(&self) -> usize {
        self.journal.lock().closes
    }

    fn statements(&self) -> Vec<String> {
        self.journal.lock().statements.clone()
    }
}

#[async_trait]
impl Connector for ScriptedEngine {
    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Box<dyn EngineSession>, EngineError> {
        {
            let mut journal = self.journal.lock();
            journal.connects += 1;
            journal.descriptor = Some(descriptor.clone());
        }
        if let Some(message) = &self.refuse {
            return Err(EngineError::Client(message.clone()));
        }
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl EngineSession for ScriptedEngine {
    async fn execute(&mut self, statement: &str) -> Result<Rowset, EngineError> {
        self.journal.lock().statements.push(statement.to_owned());
        let step = self.script.lock().pop_front();
        match step {
            Some(Step::Rows(rowset)) => Ok(rowset),
            Some(Step::Fail(e)) => Err(e),
            Some(Step::Panic) => panic!("engine reader blew up"),
            None => Err(EngineError::Client("script exhausted".into())),
        }
    }

    async fn close(&mut self) -> Result<(), EngineError> {
        self.journal.lock().closes += 1;
        Ok(())
    }
}

fn domains(n: usize) -> Step {
    Step::Rows(Rowset {
        columns: vec!["Domains[domain_id]".into()],
        rows: (0..n).map(|i| vec![json!(format!("d-{i}"))]).collect(),
    })
}

fn engine_error(message: &str) -> Step {
    Step::Fail(EngineError::Engine {
        code: Some("3241803779".into()),
        message: message.to_owned(),
    })
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Boots a proxy backed by `engine` on an OS-assigned port.
/// Returns the base URL (e.g. "http://127.0.0.1:12345").
async fn spawn_server(engine: ScriptedEngine) -> String {
    let config = Config::try_parse_from(["xmla-proxy"]).unwrap();
    let state = xmla_proxy::app_state(&config, Arc::new(engine));
    let app = xmla_proxy::router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

const HEADERS: [(&str, &str); 5] = [
    ("x-pbi-tenant-id", "5f1c2a10-0000-4000-8000-000000000001"),
    ("x-pbi-client-id", "9a8b7c6d-0000-4000-8000-000000000002"),
    ("x-pbi-client-secret", "s3cr3t"),
    (
        "x-pbi-xmla-endpoint",
        "powerbi://api.powerbi.com/v1.0/myorg/Celesta%20Analytics",
    ),
    ("x-pbi-dataset-name", "[CEL-007] - Payment Report"),
];

fn post(base: &str, path: &str, skip: Option<&str>) -> reqwest::RequestBuilder {
    let mut req = Client::new().post(format!("{base}{path}"));
    for (name, value) in HEADERS {
        if Some(name) != skip {
            req = req.header(name, value);
        }
    }
    req
}

fn batch(queries: &[&str]) -> Value {
    json!({
        "queries": queries.iter().map(|q| json!({ "query": q })).collect::<Vec<_>>(),
        "impersonatedUserName": "a@b.com",
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn each_missing_header_is_named() {
    for (missing, _) in HEADERS {
        let engine = ScriptedEngine::new(vec![]);
        let base = spawn_server(engine.clone()).await;

        let resp = post(&base, "/", Some(missing))
            .json(&batch(&["EVALUATE T"]))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "missing {missing}");

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Invalid header");
        assert_eq!(body["detail"], format!("{missing} header is required"));
        assert_eq!(engine.connects(), 0);
    }
}

#[tokio::test]
async fn missing_header_wins_over_bad_body() {
    let base = spawn_server(ScriptedEngine::new(vec![])).await;

    let resp = post(&base, "/", Some("x-pbi-dataset-name"))
        .body("")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "x-pbi-dataset-name header is required");
}

#[tokio::test]
async fn utf8_dataset_name_reaches_the_engine() {
    let engine = ScriptedEngine::new(vec![domains(1)]);
    let base = spawn_server(engine.clone()).await;

    let dataset = HeaderValue::from_bytes("Umsätze Übersicht".as_bytes()).unwrap();
    let resp = post(&base, "/", Some("x-pbi-dataset-name"))
        .header("x-pbi-dataset-name", dataset)
        .json(&batch(&["EVALUATE Domains"]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let descriptor = engine.journal.lock().descriptor.clone().unwrap();
    assert_eq!(descriptor.catalog, "Umsätze Übersicht");
    assert_eq!(engine.closes(), 1);
}

#[tokio::test]
async fn undecodable_header_is_invalid_not_missing() {
    let engine = ScriptedEngine::new(vec![]);
    let base = spawn_server(engine.clone()).await;

    let tenant = HeaderValue::from_bytes(b"tenant-\xff").unwrap();
    let resp = post(&base, "/", Some("x-pbi-tenant-id"))
        .header("x-pbi-tenant-id", tenant)
        .json(&batch(&["EVALUATE T"]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid header");
    assert_eq!(body["detail"], "x-pbi-tenant-id header is not valid UTF-8");
    assert_eq!(engine.connects(), 0);
}

#[tokio::test]
async fn blank_body_is_invalid() {
    for raw in ["", "   \n\t"] {
        let engine = ScriptedEngine::new(vec![]);
        let base = spawn_server(engine.clone()).await;

        let resp = post(&base, "/", None)
            .header("content-type", "application/json")
            .body(raw)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Invalid body");
        assert_eq!(engine.connects(), 0);
    }
}

#[tokio::test]
async fn non_email_identity_is_invalid() {
    let base = spawn_server(ScriptedEngine::new(vec![])).await;

    let resp = post(&base, "/", None)
        .json(&json!({ "queries": [{ "query": "EVALUATE T" }], "impersonatedUserName": "alice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid body");
    assert_eq!(body["detail"], "impersonatedUserName must be an email address");
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn three_rows_succeed() {
    let engine = ScriptedEngine::new(vec![domains(3)]);
    let base = spawn_server(engine.clone()).await;

    let resp = post(&base, "/", None)
        .json(&batch(&["EVALUATE DISTINCT(Domains[domain_id])"]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    let rows = body["results"][0]["tables"][0]["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], json!({ "Domains[domain_id]": "d-0" }));
    assert_eq!(engine.closes(), 1);
    assert_eq!(
        engine.statements(),
        vec!["EVALUATE DISTINCT(Domains[domain_id])"]
    );

    let descriptor = engine.journal.lock().descriptor.clone().unwrap();
    assert_eq!(
        descriptor.user_id,
        "app:9a8b7c6d-0000-4000-8000-000000000002@5f1c2a10-0000-4000-8000-000000000001"
    );
    assert_eq!(descriptor.catalog, "[CEL-007] - Payment Report");
    assert_eq!(descriptor.effective_user_name, "a@b.com");
}

#[tokio::test]
async fn engine_error_is_model_query_execution_error() {
    let engine = ScriptedEngine::new(vec![engine_error("Query (1, 10) column not found")]);
    let base = spawn_server(engine.clone()).await;

    let resp = post(&base, "/executeQueries", None)
        .json(&batch(&["EVALUATE Missing"]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["results"][0]["error"]["code"], "ModelQueryExecutionError");
    assert_eq!(
        body["results"][0]["error"]["message"],
        "Query (1, 10) column not found"
    );
    assert_eq!(engine.closes(), 1);
}

#[tokio::test]
async fn partial_failure_keeps_order() {
    let engine = ScriptedEngine::new(vec![
        domains(2),
        engine_error("bad"),
        Step::Fail(EngineError::Client("socket reset".into())),
        domains(1),
    ]);
    let base = spawn_server(engine.clone()).await;

    let resp = post(&base, "/", None)
        .json(&batch(&["Q1", "Q2", "Q3", "Q4"]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.unwrap();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 4);
    assert!(results[0]["tables"].is_array());
    assert_eq!(results[1]["error"]["code"], "ModelQueryExecutionError");
    assert_eq!(results[2]["error"]["code"], "EngineClientError");
    assert_eq!(results[3]["tables"][0]["rows"].as_array().unwrap().len(), 1);
    assert_eq!(engine.statements(), vec!["Q1", "Q2", "Q3", "Q4"]);
    assert_eq!(engine.closes(), 1);
}

#[tokio::test]
async fn connect_failure_is_unhandled_error() {
    let engine = ScriptedEngine::refusing("AADSTS7000215: Invalid client secret");
    let base = spawn_server(engine.clone()).await;

    let resp = post(&base, "/", None)
        .json(&batch(&["EVALUATE T"]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "An unhandled error occurred");
    assert_eq!(engine.connects(), 1);
    assert_eq!(engine.closes(), 0);
}

#[tokio::test]
async fn panic_after_open_still_closes_once() {
    let engine = ScriptedEngine::new(vec![domains(1), Step::Panic]);
    let base = spawn_server(engine.clone()).await;

    let resp = post(&base, "/", None)
        .json(&batch(&["Q1", "Q2"]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "An unhandled error occurred");

    // The close runs on a spawned task once the panicking executor unwinds.
    for _ in 0..50 {
        if engine.closes() == 1 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(engine.closes(), 1);
}

#[tokio::test]
async fn include_nulls_false_drops_null_columns() {
    let engine = ScriptedEngine::new(vec![Step::Rows(Rowset {
        columns: vec!["T[a]".into(), "T[b]".into()],
        rows: vec![vec![json!(1), Value::Null]],
    })]);
    let base = spawn_server(engine).await;

    let resp = post(&base, "/", None)
        .json(&json!({
            "queries": [{ "query": "EVALUATE T" }],
            "impersonatedUserName": "a@b.com",
            "serializerSettings": { "includeNulls": false },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["results"][0]["tables"][0]["rows"][0], json!({ "T[a]": 1 }));
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[tokio::test]
async fn non_post_is_not_implemented() {
    let base = spawn_server(ScriptedEngine::new(vec![])).await;
    let client = Client::new();

    let resp = client.get(format!("{base}/")).send().await.unwrap();
    assert_eq!(resp.status(), 501);
    let resp = client
        .put(format!("{base}/executeQueries"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 501);
}

#[tokio::test]
async fn health_returns_ok() {
    let base = spawn_server(ScriptedEngine::new(vec![])).await;

    let resp = Client::new()
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn request_id_round_trip() {
    let base = spawn_server(ScriptedEngine::new(vec![])).await;
    let client = Client::new();

    let resp = client.get(format!("{base}/health")).send().await.unwrap();
    let generated = resp.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert_eq!(generated.len(), 36);

    let resp = client
        .get(format!("{base}/health"))
        .header("x-request-id", "my-custom-id-123")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["x-request-id"], "my-custom-id-123");
}

#[tokio::test]
async fn metrics_count_batches() {
    let base = spawn_server(ScriptedEngine::new(vec![domains(1)])).await;

    post(&base, "/", None)
        .json(&batch(&["EVALUATE T"]))
        .send()
        .await
        .unwrap();

    let text = Client::new()
        .get(format!("{base}/metrics"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(text.contains("xmla_proxy_batches_total 1"));
    assert!(text.contains("xmla_proxy_queries_total 1"));
}
