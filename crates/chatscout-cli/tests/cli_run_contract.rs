use axum::{extract::State, routing::post, Json, Router};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct Calls {
    // "llm:<prompt>" / "search:<q>" in arrival order.
    log: Arc<Mutex<Vec<String>>>,
}

impl Calls {
    fn snapshot(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn kinds(&self) -> Vec<String> {
        self.snapshot()
            .iter()
            .map(|s| s.split(':').next().unwrap_or("").to_string())
            .collect()
    }
}

async fn chat_completions(
    State(calls): State<Calls>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let prompt = body["messages"][0]["content"]
        .as_str()
        .unwrap_or("")
        .to_string();
    let n = {
        let mut log = calls.log.lock().unwrap();
        log.push(format!("llm:{prompt}"));
        log.len()
    };
    let reply = if n == 1 {
        "Rivendell Elrond rings of power".to_string()
    } else {
        format!("**Finding {n}**\nsecond line")
    };
    Json(serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": reply}}]
    }))
}

async fn serper(
    State(calls): State<Calls>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let q = body["q"].as_str().unwrap_or("").to_string();
    calls.log.lock().unwrap().push(format!("search:{q}"));
    Json(serde_json::json!({
        "organic": [
            {"title": "Rivendell - Tolkien Gateway", "snippet": "Rivendell was an Elven town in Middle-earth."},
            {"title": "Elrond", "snippet": "Elrond Half-elven was the Lord of Rivendell."}
        ]
    }))
}

fn start_stub(rt: &tokio::runtime::Runtime, calls: Calls) -> SocketAddr {
    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let app = Router::new()
            .route("/v1/chat/completions", post(chat_completions))
            .route("/search", post(serper))
            .with_state(calls);
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("axum serve");
        });
        addr
    })
}

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

fn chatscout(config_dir: &Path, addr: SocketAddr) -> Command {
    chatscout_with_templates(config_dir, addr, &fixtures().join("templates.json"))
}

fn chatscout_with_templates(config_dir: &Path, addr: SocketAddr, templates: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("chatscout"));
    cmd.env("CHATSCOUT_CONFIG_DIR", config_dir)
        .env("CHATSCOUT_API_URL", format!("http://{addr}/v1"))
        .env("CHATSCOUT_SERPER_ENDPOINT", format!("http://{addr}/search"))
        .env("CHATSCOUT_MODEL", "stub-model")
        .env_remove("CHATSCOUT_ENV_FILE")
        .env_remove("CHATSCOUT_SEARCH_PROVIDER")
        .env_remove("CHATSCOUT_TEMPLATES")
        .args(["run", "--chat"])
        .arg(fixtures().join("chat.json"))
        .arg("--templates")
        .arg(templates);
    cmd
}

#[test]
fn run_makes_one_plus_n_llm_calls_and_renders_panel_cards() {
    let rt = tokio::runtime::Runtime::new().expect("rt");
    let calls = Calls::default();
    let addr = start_stub(&rt, calls.clone());
    let tmp = tempfile::tempdir().unwrap();

    let out = chatscout(tmp.path(), addr)
        .env("CHATSCOUT_API_KEY", "sk-test")
        .env("CHATSCOUT_SEARCH_API_KEY", "serper-test")
        .output()
        .expect("run chatscout");
    assert!(
        out.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );

    // Two panel templates in the fixture: 1 + 2 LLM calls, one search, fixed order.
    assert_eq!(calls.kinds(), vec!["llm", "search", "llm", "llm"]);
    let log = calls.snapshot();
    assert!(log[0].contains("User: We finally reached Rivendell."));
    assert!(log[1].starts_with("search:Rivendell Elrond rings of power -"));
    assert!(log[2].contains("Compare the setting details"));
    assert!(log[2].contains("1. Rivendell - Tolkien Gateway"));
    assert!(log[2].ends_with("one point per line."));
    assert!(log[3].ends_with("structured JSON only."));

    let html = String::from_utf8_lossy(&out.stdout);
    assert!(html.contains("<h3>设定考据</h3>"), "html={html}");
    assert!(html.contains("<h3>角色一致性</h3>"));
    assert!(!html.contains("raw-entities"));
    assert!(html.contains("<b>Finding 3</b><br>second line"));
}

#[test]
fn run_json_output_reports_query_and_evidence() {
    let rt = tokio::runtime::Runtime::new().expect("rt");
    let calls = Calls::default();
    let addr = start_stub(&rt, calls.clone());
    let tmp = tempfile::tempdir().unwrap();

    let out = chatscout(tmp.path(), addr)
        .env("CHATSCOUT_API_KEY", "sk-test")
        .env("CHATSCOUT_SEARCH_API_KEY", "serper-test")
        .args(["--output", "json"])
        .output()
        .expect("run chatscout");
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json report");
    assert_eq!(v["outcome"], "completed");
    assert_eq!(v["query"], "Rivendell Elrond rings of power");
    assert!(v["evidence"]
        .as_str()
        .unwrap_or("")
        .starts_with("Search results:\n1. Rivendell"));
    assert_eq!(v["cards"].as_array().map(|a| a.len()), Some(2));
}

#[test]
fn run_without_llm_key_issues_no_requests() {
    let rt = tokio::runtime::Runtime::new().expect("rt");
    let calls = Calls::default();
    let addr = start_stub(&rt, calls.clone());
    let tmp = tempfile::tempdir().unwrap();

    let out = chatscout(tmp.path(), addr)
        .env_remove("CHATSCOUT_API_KEY")
        .env("CHATSCOUT_SEARCH_API_KEY", "serper-test")
        .output()
        .expect("run chatscout");
    assert!(out.status.success());
    assert!(calls.snapshot().is_empty(), "calls={:?}", calls.snapshot());
    assert!(String::from_utf8_lossy(&out.stderr).contains("not configured"));
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "");
}

#[test]
fn run_without_search_key_still_analyzes_with_empty_evidence() {
    let rt = tokio::runtime::Runtime::new().expect("rt");
    let calls = Calls::default();
    let addr = start_stub(&rt, calls.clone());
    let tmp = tempfile::tempdir().unwrap();

    let out = chatscout(tmp.path(), addr)
        .env("CHATSCOUT_API_KEY", "sk-test")
        .env_remove("CHATSCOUT_SEARCH_API_KEY")
        .output()
        .expect("run chatscout");
    assert!(out.status.success());
    assert_eq!(calls.kinds(), vec!["llm", "llm", "llm"]);
    let log = calls.snapshot();
    assert!(log[1].contains("<search_results>\n\n</search_results>"));
    assert!(String::from_utf8_lossy(&out.stderr).contains("search_api_key"));
}

#[test]
fn run_with_missing_template_file_makes_no_cards() {
    let rt = tokio::runtime::Runtime::new().expect("rt");
    let calls = Calls::default();
    let addr = start_stub(&rt, calls.clone());
    let tmp = tempfile::tempdir().unwrap();

    let missing = tmp.path().join("does-not-exist.json");
    let out = chatscout_with_templates(tmp.path(), addr, &missing)
        .env("CHATSCOUT_API_KEY", "sk-test")
        .env("CHATSCOUT_SEARCH_API_KEY", "serper-test")
        .output()
        .expect("run chatscout");
    assert!(out.status.success());
    assert_eq!(calls.kinds(), vec!["llm", "search"]);
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "");
}
