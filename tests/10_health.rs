mod common;

use anyhow::Result;
use reqwest::StatusCode;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    let res = server.get("/health", None).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn index_lists_are_empty_on_a_new_index() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    let data = common::data(server.get("/", None).await?).await?;
    assert_eq!(data["page"], "index");
    assert_eq!(data["user"], serde_json::Value::Null);
    assert_eq!(data["context"]["top_rated"], serde_json::json!([]));
    assert_eq!(data["context"]["most_rated"], serde_json::json!([]));
    Ok(())
}

#[tokio::test]
async fn missing_dap_is_404_with_envelope() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    let res = server.get("/dap/nope/", None).await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Dap nope not found");
    Ok(())
}
