mod common;

use anyhow::Result;
use reqwest::StatusCode;

use common::{cookie, dap_archive, flash, location, TestServer};
use dapi::database::{MetaDapRepo, SocialRepo, UserRepo};

#[tokio::test]
async fn synced_profile_keeps_provider_fields() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.login("alice").await?;

    let page = common::data(server.get("/user/alice/edit/", Some(&token)).await?).await?;
    let fields = &page["context"]["uform"]["fields"];
    assert_eq!(fields[1]["name"], "email");
    assert_eq!(fields[1]["readonly"], true);

    let res = server
        .post_form(
            "/user/alice/edit/",
            Some(&token),
            &[("uform", "1"), ("username", "alice"), ("email", "evil@example.com")],
        )
        .await?;
    assert_eq!(flash(&res), vec!["User successfully saved."]);
    assert_eq!(server.user("alice").await?.email, "alice@example.com");

    // Without syncs the e-mail becomes editable
    let res = server
        .post_form("/user/alice/edit/", Some(&token), &[("pform", "1")])
        .await?;
    assert_eq!(flash(&res), vec!["Sync settings successfully saved."]);
    let alice = server.user("alice").await?;
    assert!(server.store.profile_syncs(alice.id).await?.is_empty());

    server
        .post_form(
            "/user/alice/edit/",
            Some(&token),
            &[("uform", "1"), ("username", "alice"), ("email", "new@example.com")],
        )
        .await?;
    assert_eq!(server.user("alice").await?.email, "new@example.com");
    Ok(())
}

#[tokio::test]
async fn renaming_redirects_to_the_new_name() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.login("alice").await?;
    server.login("bob").await?;

    let res = server
        .post_form("/user/alice/edit/", Some(&token), &[("uform", "1"), ("username", "bob")])
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let data = common::data(res).await?;
    assert_eq!(
        data["context"]["uform"]["errors"]["username"][0],
        "A user with that username already exists."
    );

    let res = server
        .post_form("/user/alice/edit/", Some(&token), &[("uform", "1"), ("username", "alicia")])
        .await?;
    assert_eq!(location(&res).as_deref(), Some("/user/alicia/edit/"));

    // The session follows the user id, not the name
    let page = common::data(server.get("/user/alicia/", Some(&token)).await?).await?;
    assert_eq!(page["context"]["can_edit"], true);
    assert_eq!(server.get("/user/alice/", None).await?.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn others_cannot_edit() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.login("alice").await?;
    let mallory = server.login("mallory").await?;

    let res = server.get("/user/alice/edit/", Some(&mallory)).await?;
    assert_eq!(location(&res).as_deref(), Some("/user/alice/"));
    assert_eq!(flash(&res), vec!["You don't have permissions to edit this user."]);

    let res = server
        .post_form("/user/alice/edit/", Some(&mallory), &[("dform", "1"), ("verification", "alice")])
        .await?;
    assert_eq!(flash(&res), vec!["You don't have permissions to edit this user."]);
    assert!(server.store.user_by_username("alice").await?.is_some());
    Ok(())
}

#[tokio::test]
async fn deleting_yourself_removes_your_daps() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.login("alice").await?;
    let (filename, bytes) = dap_archive("foo", "1.0");
    server.upload(&token, &filename, bytes).await?;

    let res = server
        .post_form("/user/alice/edit/", Some(&token), &[("dform", "1"), ("verification", "alicia")])
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server
        .post_form("/user/alice/edit/", Some(&token), &[("dform", "1"), ("verification", "alice")])
        .await?;
    assert_eq!(location(&res).as_deref(), Some("/"));
    assert_eq!(flash(&res), vec!["Successfully deleted alice."]);
    assert_eq!(cookie(&res, "dapi_session").as_deref(), Some(""));

    assert!(server.store.user_by_username("alice").await?.is_none());
    assert!(server.store.metadap_by_name("foo").await?.is_none());
    assert!(!server.media_dir.join("daps/foo/foo-1.0.dap").exists());
    Ok(())
}
