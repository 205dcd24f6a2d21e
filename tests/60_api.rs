mod common;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{dap_archive, TestServer};

async fn upload(server: &TestServer, token: &str, name: &str, version: &str) -> Result<()> {
    let (filename, bytes) = dap_archive(name, version);
    let res = server.upload(token, &filename, bytes).await?;
    anyhow::ensure!(res.status() == StatusCode::FOUND, "upload of {} failed", filename);
    Ok(())
}

#[tokio::test]
async fn resources_link_to_each_other() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.login("owner").await?;
    upload(&server, &owner, "foo", "1.0").await?;
    upload(&server, &owner, "foo", "1.1b").await?;

    let metadaps = common::data(server.get("/api/metadaps/", None).await?).await?;
    assert_eq!(metadaps["count"], 1);
    let foo = &metadaps["results"][0];
    assert_eq!(foo["package_name"], "foo");
    assert_eq!(foo["active"], true);
    assert_eq!(foo["dap_set"].as_array().map(Vec::len), Some(2));

    let user_url = foo["user"].as_str().context("no user link")?;
    let path = user_url
        .strip_prefix(&server.base_url)
        .context("user link is not absolute")?;
    let user = common::data(server.get(path, None).await?).await?;
    assert_eq!(user["username"], "owner");
    assert_eq!(user["github_username"], "owner");
    assert_eq!(user["fedora_username"], Value::Null);
    assert_eq!(user["metadap_set"], json!([foo["url"]]));

    let latest = foo["latest"].as_str().context("no latest")?;
    let dap = common::data(server.get(&latest.replace(&server.base_url, ""), None).await?).await?;
    assert_eq!(dap["version"], "1.1b");
    assert_eq!(dap["is_pre"], true);
    assert_eq!(dap["is_latest"], true);
    assert_eq!(dap["is_latest_stable"], false);
    assert_eq!(dap["metadap"], foo["url"]);
    Ok(())
}

#[tokio::test]
async fn lists_are_paginated() -> Result<()> {
    let server = TestServer::spawn_with(|config| config.api.page_size = 2).await?;
    let owner = server.login("owner").await?;
    for version in ["1.0", "1.1", "1.2"] {
        upload(&server, &owner, "foo", version).await?;
    }

    let first = common::data(server.get("/api/daps/", None).await?).await?;
    assert_eq!(first["count"], 3);
    assert_eq!(first["results"].as_array().map(Vec::len), Some(2));
    assert_eq!(first["next"], server.url("/api/daps/?page=2"));
    assert_eq!(first["previous"], Value::Null);

    let second = common::data(server.get("/api/daps/?page=2", None).await?).await?;
    assert_eq!(second["results"][0]["version"], "1.2");
    assert_eq!(second["next"], Value::Null);
    assert_eq!(second["previous"], server.url("/api/daps/?page=1"));

    for page in ["3", "0", "last"] {
        let res = server.get(&format!("/api/daps/?page={}", page), None).await?;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "page {}", page);
    }
    Ok(())
}

#[tokio::test]
async fn inactive_daps_stay_in_the_api() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.login("owner").await?;
    upload(&server, &owner, "foo", "1.0").await?;
    server
        .post_form("/dap/foo/admin/", Some(&owner), &[("aform", "1"), ("verification", "foo")])
        .await?;

    let index = common::data(server.get("/", None).await?).await?;
    assert_eq!(index["context"]["top_rated"], json!([]));

    let metadaps = common::data(server.get("/api/metadaps/", None).await?).await?;
    assert_eq!(metadaps["results"][0]["active"], false);

    let res = server.get("/api/users/999/", None).await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    Ok(())
}
