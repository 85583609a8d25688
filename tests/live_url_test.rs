use std::net::TcpListener;

use hatest::{HatestError, request};
use regex::Regex;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 以 URL 字符串为目标
#[tokio::test]
async fn test_get_against_running_server() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [
                { "id": 1, "name": "Alice" },
                { "id": 2, "name": "Bob", "nickname": null }
            ]
        })))
        .mount(&mock_server)
        .await;

    let response = request(mock_server.uri())
        .get("/api/users")
        .set("Accept", "application/json")
        .expect(200)
        .expect(("Content-Type", Regex::new("json").unwrap()))
        .expect(json!({ "users": [{ "id": "Number", "name": "String", "nickname": "String?" }] }))
        .await
        .unwrap();

    assert_eq!(response.data["users"][1]["name"], json!("Bob"));
}

/// 基础 URL 带路径前缀
#[tokio::test]
async fn test_base_url_with_path_prefix() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/items"))
        .and(query_param("draft", "true"))
        .and(body_json(json!({ "name": "widget" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 7 })))
        .mount(&mock_server)
        .await;

    request(format!("{}/v1/", mock_server.uri()))
        .post("items")
        .query(&json!({ "draft": true }))
        .send(&json!({ "name": "widget" }))
        .expect(201)
        .expect(json!({ "id": "Number" }))
        .await
        .unwrap();
}

/// 4xx 响应照常交给断言
#[tokio::test]
async fn test_not_found_is_a_response() {
    let mock_server = MockServer::start().await;

    let err = request(mock_server.uri())
        .get("/nothing")
        .expect(200)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "expected 200 \"OK\", got 404 \"Not Found\"");
}

/// 服务没有启动时得到连接错误
#[tokio::test]
async fn test_server_down() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let err = request(format!("http://127.0.0.1:{}", port))
        .get("/")
        .expect(200)
        .await
        .unwrap_err();

    assert!(matches!(err, HatestError::Transport(_)));
    assert!(err.to_string().starts_with("connect"));
    assert!(err.expected().is_none());
}
