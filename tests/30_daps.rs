mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::{archive_with_meta, dap_archive, flash, location, TestServer};
use dapi::database::{MetaDapRepo, RankRepo};

async fn upload(server: &TestServer, token: &str, name: &str, version: &str) -> Result<reqwest::Response> {
    let (filename, bytes) = dap_archive(name, version);
    server.upload(token, &filename, bytes).await
}

#[tokio::test]
async fn upload_creates_dap_and_tracks_latest() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.login("owner").await?;

    let res = upload(&server, &token, "foo", "1.0").await?;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res).as_deref(), Some("/dap/foo/"));
    assert_eq!(flash(&res), vec!["Dap successfully uploaded."]);

    upload(&server, &token, "foo", "1.1a").await?;

    let data = common::data(server.get("/dap/foo/", None).await?).await?;
    assert_eq!(data["context"]["dap"]["version"], "1.0");
    assert_eq!(data["context"]["owner"], "owner");
    assert_eq!(data["context"]["versions"], json!(["1.0", "1.1a"]));

    let devel = common::data(server.get("/dap/foo/devel/", None).await?).await?;
    assert_eq!(devel["context"]["dap"]["version"], "1.1a");
    assert_eq!(devel["context"]["dap"]["is_pre"], true);
    let stable = common::data(server.get("/dap/foo/stable/", None).await?).await?;
    assert_eq!(stable["context"]["dap"]["version"], "1.0");

    let res = server.get("/dap/foo/1.0/download/", None).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let bytes = res.bytes().await?;
    let meta = dapi::package::read_dap("foo-1.0.dap", &bytes).map_err(|e| anyhow::anyhow!("{:?}", e))?;
    assert_eq!(meta.version, "1.0");
    Ok(())
}

#[tokio::test]
async fn upload_errors_stay_on_the_form() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.login("owner").await?;
    let other = server.login("other").await?;
    upload(&server, &owner, "foo", "1.0").await?;

    let res = upload(&server, &owner, "foo", "1.0").await?;
    assert_eq!(res.status(), StatusCode::OK);
    let data = common::data(res).await?;
    assert_eq!(
        data["context"]["form"]["errors"]["file"],
        json!(["Version 1.0 of foo already exists."])
    );

    let data = common::data(upload(&server, &other, "foo", "2.0").await?).await?;
    assert_eq!(
        data["context"]["form"]["errors"]["file"],
        json!(["You don't have permissions to upload new versions of dap foo."])
    );

    let res = server
        .upload(&owner, "notes.txt", b"hello".to_vec())
        .await?;
    let data = common::data(res).await?;
    assert_eq!(
        data["context"]["form"]["errors"]["file"],
        json!(["notes.txt is not a .dap file."])
    );

    // A few compressed bytes may not unpack into a huge meta.yaml
    let bloated = format!("package_name: bar\nversion: '1.0'\n#{}\n", "x".repeat(1024 * 1024));
    let res = server
        .upload(&owner, "bar-1.0.dap", archive_with_meta("bar-1.0", &bloated))
        .await?;
    let data = common::data(res).await?;
    assert_eq!(
        data["context"]["form"]["errors"]["file"],
        json!(["meta.yaml is larger than 64 KiB."])
    );
    assert!(server.store.metadap_by_name("bar").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn rank_and_unrank() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.login("owner").await?;
    let fan = server.login("fan").await?;
    upload(&server, &owner, "foo", "1.0").await?;

    let res = server.post_form("/dap/foo/rank/4/", Some(&fan), &[]).await?;
    assert_eq!(flash(&res), vec!["Successfully ranked foo with 4"]);
    server.post_form("/dap/foo/rank/2/", Some(&owner), &[]).await?;

    let metadap = server.store.metadap_by_name("foo").await?.unwrap();
    assert_eq!((metadap.rank_count, metadap.average_rank), (2, 3.0));

    let page = common::data(server.get("/dap/foo/", Some(&fan)).await?).await?;
    assert_eq!(page["context"]["rank"], 4);

    let res = server.post_form("/dap/foo/rank/0/", Some(&fan), &[]).await?;
    assert_eq!(flash(&res), vec!["Successfully unranked foo"]);
    let fan_user = server.user("fan").await?;
    assert!(server.store.rank_of(fan_user.id, metadap.id).await?.is_none());

    let res = server.post_form("/dap/foo/rank/6/", Some(&fan), &[]).await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn tags_are_lowercased_and_listed() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.login("owner").await?;
    let stranger = server.login("stranger").await?;
    upload(&server, &owner, "foo", "1.0").await?;
    upload(&server, &owner, "bar", "1.0").await?;

    let res = server
        .post_form("/dap/foo/tags/", Some(&stranger), &[("tags", "python")])
        .await?;
    assert_eq!(flash(&res), vec!["You don't have permissions to change tags of this dap."]);

    let res = server
        .post_form("/dap/foo/tags/", Some(&owner), &[("tags", "Python, C")])
        .await?;
    assert_eq!(flash(&res), vec!["Tags successfully saved."]);
    server
        .post_form("/dap/bar/tags/", Some(&owner), &[("tags", "python")])
        .await?;

    let form = common::data(server.get("/dap/foo/tags/", Some(&owner)).await?).await?;
    assert_eq!(form["context"]["form"]["fields"][0]["value"], "c, python");

    let tag = common::data(server.get("/tag/python/?page=99", None).await?).await?;
    assert_eq!(tag["context"]["daps"].as_array().map(Vec::len), Some(2));
    assert_eq!(tag["context"]["pagination"]["page"]["number"], 1);

    let page = common::data(server.get("/dap/foo/", None).await?).await?;
    assert_eq!(page["context"]["similar"][0]["package_name"], "bar");

    assert_eq!(server.get("/tag/nope/", None).await?.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn tags_sharing_a_slug_stay_distinct() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.login("owner").await?;
    upload(&server, &owner, "foo", "1.0").await?;
    upload(&server, &owner, "bar", "1.0").await?;

    server
        .post_form("/dap/foo/tags/", Some(&owner), &[("tags", "c++")])
        .await?;
    server
        .post_form("/dap/bar/tags/", Some(&owner), &[("tags", "c")])
        .await?;

    let form = common::data(server.get("/dap/bar/tags/", Some(&owner)).await?).await?;
    assert_eq!(form["context"]["form"]["fields"][0]["value"], "c");

    let cpp = common::data(server.get("/tag/c/", None).await?).await?;
    assert_eq!(cpp["context"]["tag"]["name"], "c++");
    assert_eq!(cpp["context"]["daps"][0]["package_name"], "foo");
    let c = common::data(server.get("/tag/c_1/", None).await?).await?;
    assert_eq!(c["context"]["tag"]["name"], "c");
    assert_eq!(c["context"]["daps"].as_array().map(Vec::len), Some(1));
    assert_eq!(c["context"]["daps"][0]["package_name"], "bar");
    Ok(())
}

#[tokio::test]
async fn transfer_needs_the_typed_name() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.login("owner").await?;
    let heir = server.login("heir").await?;
    upload(&server, &owner, "foo", "1.0").await?;

    let res = server
        .post_form("/dap/foo/admin/", Some(&heir), &[("cform", "1")])
        .await?;
    assert_eq!(flash(&res), vec!["You don't have permissions to administrate this dap."]);

    server
        .post_form("/dap/foo/admin/", Some(&owner), &[("cform", "1"), ("comaintainers", "heir")])
        .await?;

    let res = server
        .post_form(
            "/dap/foo/admin/",
            Some(&owner),
            &[("tform", "1"), ("user", "heir"), ("verification", "fo")],
        )
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let data = common::data(res).await?;
    assert_eq!(
        data["context"]["tform"]["errors"]["verification"],
        json!(["You didn't enter the dap's name correctly."])
    );

    let res = server
        .post_form(
            "/dap/foo/admin/",
            Some(&owner),
            &[("tform", "1"), ("user", "heir"), ("verification", "foo")],
        )
        .await?;
    assert_eq!(flash(&res), vec!["Dap foo successfully transfered."]);

    let metadap = server.store.metadap_by_name("foo").await?.unwrap();
    assert_eq!(metadap.user_id, server.user("heir").await?.id);
    let comaintainers: Vec<String> = server
        .store
        .comaintainers(metadap.id)
        .await?
        .into_iter()
        .map(|u| u.username)
        .collect();
    assert_eq!(comaintainers, vec!["owner"]);
    Ok(())
}

#[tokio::test]
async fn deactivate_leave_and_delete() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.login("owner").await?;
    let co = server.login("co").await?;
    upload(&server, &owner, "foo", "1.0").await?;
    upload(&server, &owner, "foo", "1.1").await?;
    server
        .post_form("/dap/foo/admin/", Some(&owner), &[("cform", "1"), ("comaintainers", "co")])
        .await?;

    let res = server
        .post_form("/dap/foo/admin/", Some(&owner), &[("aform", "1"), ("verification", "foo")])
        .await?;
    assert_eq!(flash(&res), vec!["Dap foo successfully deactivated."]);
    assert!(!server.store.metadap_by_name("foo").await?.unwrap().active);

    let res = server.get("/dap/foo/leave/", Some(&owner)).await?;
    assert_eq!(
        flash(&res),
        vec!["You cannot leave this dap. First, transfer it to someone else."]
    );

    let res = server
        .post_form("/dap/foo/1.1/delete/", Some(&co), &[
            ("verification_name", "foo"),
            ("verification_version", "1.1"),
        ])
        .await?;
    assert_eq!(flash(&res), vec!["Successfully deleted foo-1.1."]);
    let page = common::data(server.get("/dap/foo/", None).await?).await?;
    assert_eq!(page["context"]["dap"]["version"], "1.0");

    let res = server
        .post_form("/dap/foo/leave/", Some(&co), &[("verification", "foo")])
        .await?;
    assert_eq!(flash(&res), vec!["Successfully leaved foo."]);
    let res = server.get("/dap/foo/leave/", Some(&co)).await?;
    assert_eq!(
        flash(&res),
        vec!["You cannot leave this dap, you are not it's comaintainer."]
    );

    let res = server
        .post_form("/dap/foo/admin/", Some(&owner), &[("dform", "1"), ("verification", "foo")])
        .await?;
    assert_eq!(location(&res).as_deref(), Some("/"));
    assert_eq!(flash(&res), vec!["Dap foo successfully deleted."]);
    assert!(server.store.metadap_by_name("foo").await?.is_none());
    assert_eq!(server.get("/dap/foo/1.0/", None).await?.status(), StatusCode::NOT_FOUND);
    Ok(())
}
