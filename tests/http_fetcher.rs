//! `HttpFetcher` against a local document server.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::{extract::Query, http::StatusCode, routing::get, Router};
use jeego::{CallFlowDocument, Command, DocumentFetcher, GatewayError, HttpFetcher};
use tokio::net::TcpListener;

async fn flow(Query(q): Query<HashMap<String, String>>) -> String {
    format!(
        r#"<Response><Say message="{}:{}:{}"/></Response>"#,
        q.get("uuid")
            .map(String::as_str)
            .unwrap_or("-"),
        q.get("to")
            .map(String::as_str)
            .unwrap_or("-"),
        q.get("digits")
            .map(String::as_str)
            .unwrap_or("-"),
    )
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn document_server() -> SocketAddr {
    let app = Router::new()
        .route("/flow.xml", get(flow))
        .route("/broken.xml", get(broken));
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap();
    let addr = listener
        .local_addr()
        .unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .unwrap();
    });
    addr
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn query_parameters_reach_the_server() {
    let addr = document_server().await;
    let fetcher = HttpFetcher::new().unwrap();

    let xml = fetcher
        .fetch(
            &format!("http://{}/flow.xml", addr),
            &pairs(&[("uuid", "u-1"), ("to", "555"), ("digits", "12#")]),
        )
        .await
        .unwrap();
    let doc = CallFlowDocument::parse(&xml).unwrap();
    assert_eq!(
        doc.commands(),
        &[Command::Say {
            message: "u-1:555:12#".into()
        }]
    );
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let addr = document_server().await;
    let fetcher = HttpFetcher::new().unwrap();

    let err = fetcher
        .fetch(&format!("http://{}/broken.xml", addr), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::FetchStatus { status: 500, .. }));

    let err = fetcher
        .fetch(&format!("http://{}/missing.xml", addr), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::FetchStatus { status: 404, .. }));
}

#[tokio::test]
async fn unreachable_server_is_an_error() {
    // Bind then drop to get a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap();
    let addr = listener
        .local_addr()
        .unwrap();
    drop(listener);

    let err = HttpFetcher::new()
        .unwrap()
        .fetch(&format!("http://{}/flow.xml", addr), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Http(_)));
}
