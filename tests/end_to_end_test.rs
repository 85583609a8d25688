use std::time::Duration;

use hatest::logger::init_logger;
use hatest::{App, AppResponse, HatestError, callback, check, request};
use regex::Regex;
use serde_json::json;

fn hello_app() -> App {
    App::new().get("/", |_req| async { AppResponse::text("hey") })
}

/// 基本的状态码和 body 断言
#[tokio::test]
async fn test_fires_up_the_app_on_an_ephemeral_port() {
    init_logger();

    let response = request(hello_app())
        .get("/")
        .expect(200)
        .expect("hey")
        .await
        .unwrap();

    assert_eq!(response.text, "hey");
    assert_eq!(response.request.path, "/");
    assert!(response.request.url.starts_with("http://127.0.0.1:"));
}

/// 同一个 App 多次分发使用同一个地址
#[tokio::test]
async fn test_binding_is_reused() {
    let app = hello_app();

    let first = request(&app).get("/").expect(200).await.unwrap();
    let second = request(&app).get("/").expect(200).await.unwrap();
    assert_eq!(first.request.url, second.request.url);
}

/// 状态码不符时的消息带状态短语
#[tokio::test]
async fn test_status_mismatch_message() {
    let err = request(hello_app())
        .get("/")
        .expect(404)
        .await
        .unwrap_err();

    assert!(err.is_assertion());
    assert_eq!(err.to_string(), "expected 404 \"Not Found\", got 200 \"OK\"");
    assert_eq!(err.expected(), Some("404"));
    assert_eq!(err.actual(), Some("200"));
}

/// 服务端错误是正常响应，可以被断言
#[tokio::test]
async fn test_server_error_with_schema() {
    let app = App::new().get("/", |_req| async {
        AppResponse::json(&json!({ "message": "something went wrong" })).status(500)
    });

    request(&app)
        .get("/")
        .expect(500)
        .expect(json!({ "message": "String" }))
        .await
        .unwrap();

    let err = request(&app)
        .get("/")
        .expect(json!({ "message": "Number" }))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "expected data.message to be Number, got String");
}

/// 默认跟随重定向，次数为 0 时能看到 302
#[tokio::test]
async fn test_redirects() {
    let app = App::new()
        .get("/", |_req| async { AppResponse::redirect("/login") })
        .get("/login", |_req| async { AppResponse::text("Login") });

    let response = request(&app).get("/").expect(200).expect("Login").await.unwrap();
    assert_eq!(response.request.path, "/login");

    request(&app)
        .get("/")
        .redirects(0)
        .expect(302)
        .expect(("Location", "/login"))
        .await
        .unwrap();
}

/// end_with 传 schema 时追加一条 body 规则
#[tokio::test]
async fn test_end_with_schema() {
    let app = App::new().get("/", |_req| async {
        AppResponse::json(&json!({ "str": "asdasd", "num": 1, "obj": {}, "arr": [] }))
    });

    request(&app)
        .get("/")
        .end_with(json!({ "str": "String", "num": "Number", "obj": "Object", "arr": "Array" }))
        .await
        .unwrap();
}

/// 连接被关闭时得到传输错误
#[tokio::test]
async fn test_socket_hang_up() {
    let app = App::new().get("/", |_req| async { AppResponse::hang_up() });

    let err = request(&app).get("/").expect(200).await.unwrap_err();

    assert!(err.is_transport());
    assert_eq!(err.to_string(), "socket hang up");
    assert!(err.expected().is_none());
    assert!(err.actual().is_none());
}

/// 超时也是传输错误
#[tokio::test]
async fn test_timeout() {
    let app = App::new().get("/", |_req| async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        AppResponse::text("late")
    });

    let err = request(&app)
        .get("/")
        .timeout(Duration::from_millis(50))
        .expect(200)
        .await
        .unwrap_err();

    assert!(matches!(err, HatestError::Transport(_)));
    assert_eq!(err.to_string(), "timeout of 50ms exceeded");
}

/// 字符串 body 以文本发送，响应 data 为原文
#[tokio::test]
async fn test_text_body() {
    let app = App::new().post("/", |req| async move {
        let content_type = req.header("content-type").unwrap_or_default().to_string();
        AppResponse::text(req.text()).header("x-received-type", &content_type)
    });

    let response = request(&app)
        .post("/")
        .send("hello")
        .expect(("X-Received-Type", Regex::new("^text/plain").unwrap()))
        .expect("hello")
        .await
        .unwrap();
    assert_eq!(response.data, json!("hello"));
}

/// JSON body 多次 send 合并
#[tokio::test]
async fn test_json_body_is_merged() {
    let app = App::new().post("/", |req| async move {
        let body: serde_json::Value = req.json().unwrap_or_default();
        AppResponse::json(&body)
    });

    let response = request(&app)
        .post("/")
        .send(&json!({ "name": "tj" }))
        .send(&json!({ "pet": "tobi" }))
        .expect(200)
        .await
        .unwrap();
    assert_eq!(response.data, json!({ "name": "tj", "pet": "tobi" }));
}

/// 多个 body 正则依次检查
#[tokio::test]
async fn test_multiple_body_patterns() {
    let app = App::new().get("/", |_req| async { AppResponse::text("hey tj") });

    request(&app)
        .get("/")
        .expect(Regex::new("tj").unwrap())
        .expect(Regex::new("^hey").unwrap())
        .expect("hey tj")
        .await
        .unwrap();

    let err = request(&app)
        .get("/")
        .expect(Regex::new("tj").unwrap())
        .expect(Regex::new("^bye").unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "expected body 'hey tj' to match /^bye/");
}

/// 字面量 body 不符时带 diff 信息
#[tokio::test]
async fn test_literal_body_mismatch() {
    let err = request(hello_app())
        .get("/")
        .expect("hello")
        .await
        .unwrap_err();

    match err {
        HatestError::Assertion(assertion) => {
            assert_eq!(assertion.message, "expected 'hello' response body, got 'hey'");
            assert!(assertion.show_diff);
        }
        other => panic!("unexpected error: {}", other),
    }
}

/// header 断言
#[tokio::test]
async fn test_header_expectations() {
    let app = App::new().get("/", |_req| async { AppResponse::json(&json!({ "ok": true })) });

    request(&app)
        .get("/")
        .expect(("Content-Type", Regex::new("json").unwrap()))
        .expect(("content-type", "application/json; charset=utf-8"))
        .await
        .unwrap();

    let err = request(&app)
        .get("/")
        .expect(("Content-Type", Regex::new("html").unwrap()))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "expected content-type matching /html/, got application/json; charset=utf-8"
    );

    let err = request(&app)
        .get("/")
        .expect(("X-Missing", "nope"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "expected x-missing header field");
}

/// 所有 verb 方法，包括 del 别名和 req
#[tokio::test]
async fn test_verbs() {
    let app = App::new().all("/", |req| async move { AppResponse::text(req.method.as_str()) });

    request(&app).get("/").expect("GET").await.unwrap();
    request(&app).post("/").expect("POST").await.unwrap();
    request(&app).put("/").expect("PUT").await.unwrap();
    request(&app).patch("/").expect("PATCH").await.unwrap();
    request(&app).delete("/").expect("DELETE").await.unwrap();
    request(&app).del("/").expect("DELETE").await.unwrap();
    request(&app).options("/").expect("OPTIONS").await.unwrap();
    request(&app).req("put", "/").expect("PUT").await.unwrap();

    let response = request(&app).head("/").expect(200).await.unwrap();
    assert_eq!(response.text, "");
}

/// 未匹配的路由返回 404
#[tokio::test]
async fn test_unknown_route() {
    request(hello_app())
        .get("/missing")
        .expect(404)
        .expect("Cannot GET /missing")
        .await
        .unwrap();
}

/// predicate 修改 body 后，后续规则看到修改后的值
#[tokio::test]
async fn test_predicate_mutation_is_observed() {
    let response = request(hello_app())
        .get("/")
        .expect(check(|res| {
            res.data = json!("hello");
        }))
        .expect("hello")
        .expect(check(|res| {
            res.data = json!({ "greeting": "hola" });
        }))
        .expect(json!({ "greeting": "String" }))
        .await
        .unwrap();

    assert_eq!(response.data, json!({ "greeting": "hola" }));
}

/// predicate 修改 header
#[tokio::test]
async fn test_predicate_header_mutation() {
    request(hello_app())
        .get("/")
        .expect(check(|res| {
            res.headers.insert("x-injected".to_string(), "yes".to_string());
        }))
        .expect(("X-Injected", "yes"))
        .await
        .unwrap();
}

/// predicate 失败或 panic 都变成断言错误，后续规则不再执行
#[tokio::test]
async fn test_predicate_failures() {
    let err = request(hello_app())
        .get("/")
        .expect(check(|res| {
            if res.text != "nope" {
                anyhow::bail!("body was {}", res.text);
            }
            Ok(())
        }))
        .expect(check(|_res| -> anyhow::Result<()> {
            panic!("should not run");
        }))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "body was hey");
    assert!(err.expected().is_none());

    let err = request(hello_app())
        .get("/")
        .expect(check(|res| assert_eq!(res.text, "nope", "text mismatch")))
        .await
        .unwrap_err();
    assert!(err.is_assertion());
    assert!(err.to_string().contains("text mismatch"));
}

/// 回调模式：回调收到错误和响应，结果仍然反映错误
#[tokio::test]
async fn test_callback_mode() {
    let (tx, rx) = std::sync::mpsc::channel();

    let result = request(hello_app())
        .get("/")
        .expect((
            201,
            callback(move |err, res| {
                tx.send((err.map(|e| e.to_string()), res.map(|r| r.status.code())))
                    .unwrap();
            }),
        ))
        .await;

    assert!(result.is_err());
    let (err, status) = rx.recv().unwrap();
    assert_eq!(err.as_deref(), Some("expected 201 \"Created\", got 200 \"OK\""));
    assert_eq!(status, Some(200));
}

/// 回调本身失败时替换原来的结果
#[tokio::test]
async fn test_callback_error_replaces_result() {
    let err = request(hello_app())
        .get("/")
        .expect(200)
        .end_with(callback(|_err, _res| Err::<(), _>(anyhow::anyhow!("callback says no"))))
        .await
        .unwrap_err();

    assert!(matches!(err, HatestError::Callback(_)));
    assert_eq!(err.to_string(), "callback says no");
}

/// 无法归类的 expect 参数在所在位置失败
#[tokio::test]
async fn test_unsupported_expectation_fails() {
    let err = request(hello_app())
        .get("/")
        .expect(200)
        .expect(json!(true))
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("unsupported expectation"));
}
