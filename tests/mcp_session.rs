//! A full stdio session against a mocked arXiv and a temporary cache root.

use mcp_paper_cache::provider::arxiv::{ArxivConfig, ArxivProvider};
use mcp_paper_cache::server::{McpServer, ServerConfig};
use mcp_paper_cache::service::PaperCacheService;
use mcp_paper_cache::storage::json::JsonTopicStorage;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/abs/2301.00001v2</id>
    <published>2023-01-15T18:30:00Z</published>
    <title>Quantum Error Correction</title>
    <summary>We study things.</summary>
    <author><name>Alice Smith</name></author>
    <author><name>Bob Jones</name></author>
    <link title="pdf" href="http://arxiv.org/pdf/2301.00001v2" rel="related" type="application/pdf"/>
  </entry>
</feed>"#;

const EMPTY_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom"><title>none</title></feed>"#;

async fn server_for(arxiv: &MockServer, root: &TempDir) -> McpServer<ArxivProvider, JsonTopicStorage> {
    let provider = ArxivProvider::new(ArxivConfig {
        base_url: format!("{}/api/query", arxiv.uri()),
        timeout_secs: 5,
        request_interval_ms: 0,
        max_retries: 0,
    })
    .unwrap();
    let storage = JsonTopicStorage::new(root.path().join("papers"));
    McpServer::new(ServerConfig::default(), PaperCacheService::new(provider, storage))
}

fn call(id: u64, tool: &str, arguments: Value) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": tool, "arguments": arguments },
    })
    .to_string()
}

fn first_text(response: &Value) -> &str {
    response["result"]["content"][0]["text"].as_str().unwrap()
}

#[tokio::test]
async fn search_then_lookup_then_cite() {
    let arxiv = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("search_query", "Quantum Computing"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .expect(1)
        .mount(&arxiv)
        .await;
    Mock::given(method("GET"))
        .and(query_param("id_list", "9999.99999"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_FEED))
        .expect(1)
        .mount(&arxiv)
        .await;

    let root = TempDir::new().unwrap();
    let server = server_for(&arxiv, &root).await;

    let input = [
        json!({
            "jsonrpc": "2.0", "id": 0, "method": "initialize",
            "params": { "protocolVersion": "2024-11-05", "capabilities": {},
                        "clientInfo": { "name": "test", "version": "0" } },
        })
        .to_string(),
        json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }).to_string(),
        call(1, "search_papers", json!({ "topic": "Quantum Computing", "max_results": 2 })),
        call(2, "extract_paper_info", json!({ "paper_id": "2301.00001v2" })),
        call(3, "get_paper_citations", json!({ "paper_id": "2301.00001v2" })),
        call(4, "extract_paper_info", json!({ "paper_id": "9999.99999" })),
        call(5, "get_paper_citations", json!({ "paper_id": "9999.99999" })),
    ]
    .join("\n")
        + "\n";

    let mut output = Vec::new();
    server.serve(input.as_bytes(), &mut output).await.unwrap();

    let responses: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(responses.len(), 6);

    assert_eq!(responses[0]["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "research");

    assert_eq!(responses[1]["id"], 1);
    assert_eq!(first_text(&responses[1]), "2301.00001v2");
    assert_eq!(
        responses[1]["result"]["structuredContent"]["result"],
        json!(["2301.00001v2"])
    );

    let info: Value = serde_json::from_str(first_text(&responses[2])).unwrap();
    assert_eq!(
        info,
        json!({
            "title": "Quantum Error Correction",
            "authors": ["Alice Smith", "Bob Jones"],
            "summary": "We study things.",
            "pdf_url": "http://arxiv.org/pdf/2301.00001v2",
            "published": "2023-01-15",
        })
    );

    let bundle: Value = serde_json::from_str(first_text(&responses[3])).unwrap();
    assert_eq!(bundle["paper_id"], "2301.00001v2");
    assert!(bundle["citations"]["APA"].as_str().unwrap().contains("Smith"));
    assert!(bundle["citations"]["BibTeX"]
        .as_str()
        .unwrap()
        .starts_with("@misc{230100001,"));

    assert_eq!(
        first_text(&responses[4]),
        "There's no saved information related to paper 9999.99999."
    );
    assert_eq!(
        first_text(&responses[5]),
        "Paper with ID 9999.99999 not found on arXiv."
    );

    let cached = root
        .path()
        .join("papers")
        .join("quantum_computing")
        .join("papers_info.json");
    let document: Value =
        serde_json::from_str(&std::fs::read_to_string(cached).unwrap()).unwrap();
    assert!(document.get("2301.00001v2").is_some());
}

#[tokio::test]
async fn arxiv_outage_is_reported_as_tool_error() {
    let arxiv = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&arxiv)
        .await;

    let root = TempDir::new().unwrap();
    let server = server_for(&arxiv, &root).await;

    let response = server
        .handle_message(&call(7, "search_papers", json!({ "topic": "llm" })))
        .await
        .unwrap();

    assert_eq!(response["result"]["isError"], true);
    assert!(first_text(&response).starts_with("Error executing tool search_papers:"));
    assert!(!root.path().join("papers").join("llm").exists());
}
