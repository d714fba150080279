//! Integration tests for the NVD search client
//!
//! Uses wiremock in place of the NVD CVE 2.0 endpoint.

use serde_json::json;
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use breach_investigator::capabilities::VulnerabilitySearch;
use breach_investigator::config::{NvdConfig, RequestConfig};
use breach_investigator::nvd::NvdClient;

fn create_test_client(base_url: &str, api_key: Option<&str>) -> NvdClient {
    let config = NvdConfig {
        base_url: format!("{}/rest/json/cves/2.0", base_url),
        api_key: api_key.map(str::to_string),
        rate_limit_ms: 0,
        max_results: 5,
    };
    let request = RequestConfig {
        timeout_ms: 5000,
        max_retries: 0,
        retry_delay_ms: 10,
    };
    NvdClient::new(&config, &request).expect("Failed to create client")
}

fn keywords(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

#[tokio::test]
async fn test_search_sends_query_and_flattens_results() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/json/cves/2.0"))
        .and(query_param("keywordSearch", "exchange remote execution"))
        .and(query_param("resultsPerPage", "2"))
        .and(header("apiKey", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resultsPerPage": 2,
            "startIndex": 0,
            "totalResults": 40,
            "vulnerabilities": [
                {"cve": {"id": "CVE-2021-26855", "descriptions": [
                    {"lang": "en", "value": "Microsoft Exchange Server Remote Code Execution Vulnerability"},
                    {"lang": "es", "value": "Vulnerabilidad"}
                ]}},
                {"cve": {"id": "CVE-2021-27065", "descriptions": [
                    {"lang": "en", "value": "Post-auth arbitrary file write"}
                ]}}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri(), Some("secret"));
    let records = client
        .search_by_keywords(&keywords(&["exchange", "remote", "execution"]), 2)
        .await;

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "CVE-2021-26855");
    assert_eq!(
        records[0].description,
        "Microsoft Exchange Server Remote Code Execution Vulnerability"
    );
    assert_eq!(records[1].id, "CVE-2021-27065");
}

#[tokio::test]
async fn test_search_truncates_to_max_results() {
    let mock_server = MockServer::start().await;

    let items: Vec<_> = (0..4)
        .map(|i| json!({"cve": {"id": format!("CVE-2024-000{}", i), "descriptions": []}}))
        .collect();
    Mock::given(method("GET"))
        .and(path("/rest/json/cves/2.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"vulnerabilities": items})))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri(), None);
    let records = client.search_by_keywords(&keywords(&["vpn"]), 3).await;
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].description, "");
}

#[tokio::test]
async fn test_search_http_error_yields_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/json/cves/2.0"))
        .respond_with(ResponseTemplate::new(403).set_body_string("rate limited"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri(), None);
    assert!(client.search_by_keywords(&keywords(&["vpn"]), 5).await.is_empty());
}

#[tokio::test]
async fn test_search_garbage_body_yields_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/json/cves/2.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri(), None);
    assert!(client.search_by_keywords(&keywords(&["vpn"]), 5).await.is_empty());
}

#[tokio::test]
async fn test_search_without_keywords_skips_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"vulnerabilities": []})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri(), None);
    assert!(client.search_by_keywords(&[], 5).await.is_empty());
    assert!(client.search_by_keywords(&keywords(&["vpn"]), 0).await.is_empty());
}

#[tokio::test]
async fn test_search_unreachable_host_yields_empty() {
    let client = create_test_client("http://127.0.0.1:1", None);
    assert!(client.search_by_keywords(&keywords(&["vpn"]), 5).await.is_empty());
}
