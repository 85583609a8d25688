use hatest::{App, AppResponse, RequestOptions, request};
use serde::Serialize;
use serde_json::json;

/// 回显原始 query 的服务
fn echo_app() -> App {
    App::new().get("/", |req| async move {
        AppResponse::json(&json!({
            "raw": req.query.clone().unwrap_or_default(),
            "val": req.query_all("val[]"),
        }))
    })
}

/// 多次 query 调用合并
#[tokio::test]
async fn test_query_calls_are_merged() {
    let response = request(echo_app())
        .get("/")
        .query(&json!({ "a": 1 }))
        .query(&json!({ "b": "two" }))
        .expect(200)
        .await
        .unwrap();

    assert_eq!(response.request.path, "/?a=1&b=two");
    assert_eq!(response.data["raw"], json!("a=1&b=two"));
}

/// key 按调用顺序发送，不按字母排序
#[tokio::test]
async fn test_query_keeps_call_order() {
    let response = request(echo_app())
        .get("/")
        .query(&json!({ "b": 1 }))
        .query(&json!({ "a": 2 }))
        .await
        .unwrap();

    assert_eq!(response.request.path, "/?b=1&a=2");
    assert_eq!(response.data["raw"], json!("b=1&a=2"));
}

/// 数组按 key[]=value 重复
#[tokio::test]
async fn test_array_values() {
    let response = request(echo_app())
        .get("/")
        .query(&json!({ "val": ["Test1", "Test2"] }))
        .expect(200)
        .await
        .unwrap();

    assert_eq!(response.request.path, "/?val[]=Test1&val[]=Test2");
    assert_eq!(response.data["val"], json!(["Test1", "Test2"]));
}

#[tokio::test]
async fn test_single_element_array() {
    let response = request(echo_app())
        .get("/")
        .query(&json!({ "val": ["Test1"] }))
        .await
        .unwrap();

    assert_eq!(response.request.path, "/?val[]=Test1");
}

/// 对象按 JSON 编码
#[tokio::test]
async fn test_object_values() {
    let response = request(echo_app())
        .get("/")
        .query(&json!({ "val": { "test": "Test1" } }))
        .await
        .unwrap();

    assert_eq!(response.request.path, "/?val=%7B%22test%22:%22Test1%22%7D");
}

/// 可序列化的结构体直接作为 query
#[tokio::test]
async fn test_struct_query_and_options() {
    #[derive(Serialize)]
    struct Page {
        page: u32,
        q: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        limit: Option<u32>,
    }

    let options = RequestOptions::new("/")
        .query(&Page {
            page: 2,
            q: "rust lang",
            limit: None,
        })
        .unwrap();

    let response = request(echo_app()).get(options).await.unwrap();
    assert_eq!(response.request.path, "/?page=2&q=rust+lang");
}

/// null 值被跳过
#[tokio::test]
async fn test_null_values_are_skipped() {
    let response = request(echo_app())
        .get("/")
        .query(&json!({ "a": null, "b": 1 }))
        .await
        .unwrap();

    assert_eq!(response.request.path, "/?b=1");
}

/// 非对象的 query 参数在分发时报错
#[tokio::test]
async fn test_non_object_query_is_rejected() {
    let err = request(echo_app())
        .get("/")
        .query(&json!(["a", "b"]))
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("invalid request"));
}
