//! A configuration file drives the assembled API.

use jsonrest::config::{ConfigLoader, StackKind};
use jsonrest::prelude::*;
use jsonrest_test::{make_simple_request, run_request, TestRequest};
use serde_json::{json, Value};

fn routes() -> Vec<Route> {
    vec![
        Route::get("/users/:id", |w, r| {
            let _ = w.write_json(&json!({ "Id": r.path_param("id") }));
        }),
        Route::post("/users", |w, r| match r.decode_json_payload::<Value>() {
            Ok(user) => {
                let _ = w.write_json(&user);
            }
            Err(e) => write_error(w, &e.to_string(), http::StatusCode::BAD_REQUEST),
        }),
    ]
}

#[test]
fn test_prod_config_gzips_and_checks_content_type() {
    let config = ConfigLoader::new()
        .with_string("[api]\nstack = \"prod\"\n", "toml")
        .unwrap()
        .load()
        .unwrap();
    let api = jsonrest::build_api(&config.api, routes()).unwrap();
    let handler = api.make_handler();

    let recorded = run_request(
        &handler,
        make_simple_request("GET", "http://localhost/users/42", None).unwrap(),
    );
    recorded.code_is(200).content_encoding_is_gzip();
    let body: Value = recorded.decode_json_payload().unwrap();
    assert_eq!(body, json!({ "Id": "42" }));

    run_request(
        &handler,
        TestRequest::post("http://localhost/users")
            .content_type("text/plain")
            .body("hello")
            .build()
            .unwrap(),
    )
    .code_is(415);
}

#[test]
fn test_writer_options_from_config() {
    let config = ConfigLoader::new()
        .with_string(
            r#"{"api": {"stack": "none", "indent_json": true, "powered_by": "users-api"}}"#,
            "json",
        )
        .unwrap()
        .load()
        .unwrap();
    assert_eq!(config.api.stack, StackKind::None);

    let api = jsonrest::build_api(&config.api, routes()).unwrap();
    assert!(api.middleware_names().is_empty());

    run_request(
        &api.make_handler(),
        TestRequest::get("http://localhost/users/7").build().unwrap(),
    )
    .code_is(200)
    .header_is("x-powered-by", "users-api")
    .body_is("{\n  \"Id\": \"7\"\n}");
}

#[test]
fn test_uncompressed_trie_routes_the_same() {
    let config = ConfigLoader::new()
        .with_string("[api]\nstack = \"common\"\ndisable_trie_compression = true\n", "toml")
        .unwrap()
        .load()
        .unwrap();
    let api = jsonrest::build_api(&config.api, routes()).unwrap();

    run_request(
        &api.make_handler(),
        TestRequest::get("http://localhost/users/abc").build().unwrap(),
    )
    .code_is(200)
    .body_is(r#"{"Id":"abc"}"#);
}
