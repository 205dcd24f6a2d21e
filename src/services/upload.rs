use crate::database::models::{MetaDap, NewDap, User};
use crate::database::{DatabaseError, Store};
use crate::package::read_dap;
use crate::storage::MediaStorage;

use super::daps::{can_maintain, refresh_latest};

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Problems shown to the uploader on the `file` field
    #[error("invalid dap: {}", .0.join(" "))]
    Invalid(Vec<String>),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("Archive check failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl UploadError {
    fn invalid(message: impl Into<String>) -> Self {
        UploadError::Invalid(vec![message.into()])
    }
}

/// Validates an uploaded archive, records the new version and stores the
/// file. Returns the updated package.
pub async fn handle_uploaded_dap(
    store: &dyn Store,
    media: &MediaStorage,
    uploader: &User,
    filename: &str,
    bytes: &[u8],
) -> Result<MetaDap, UploadError> {
    // Unpacking is CPU bound
    let (name, archive) = (filename.to_string(), bytes.to_vec());
    let meta = tokio::task::spawn_blocking(move || read_dap(&name, &archive))
        .await?
        .map_err(UploadError::Invalid)?;

    let (metadap, created) = match store.metadap_by_name(&meta.package_name).await? {
        Some(metadap) => {
            if !can_maintain(store, uploader, &metadap).await? {
                return Err(UploadError::invalid(format!(
                    "You don't have permissions to upload new versions of dap {}.",
                    meta.package_name
                )));
            }
            (metadap, false)
        }
        None => match store.create_metadap(&meta.package_name, uploader.id).await {
            Ok(metadap) => {
                tracing::info!("Created dap {} owned by {}", metadap.package_name, uploader.username);
                (metadap, true)
            }
            Err(DatabaseError::Conflict(_)) => {
                return Err(UploadError::invalid(format!(
                    "Dap {} was created by someone else in the meantime, please try again.",
                    meta.package_name
                )))
            }
            Err(e) => return Err(e.into()),
        },
    };

    let version_taken = || {
        UploadError::invalid(format!(
            "Version {} of {} already exists.",
            meta.version, meta.package_name
        ))
    };
    if store.dap_by_version(metadap.id, &meta.version).await?.is_some() {
        return Err(version_taken());
    }

    let file = MediaStorage::dap_path(&meta.package_name, &meta.version);
    let dap = match store
        .create_dap(NewDap {
            metadap_id: metadap.id,
            version: meta.version.clone(),
            license: meta.license.clone(),
            summary: meta.summary.clone(),
            description: meta.description.clone(),
            authors: meta.authors.clone(),
            homepage: meta.homepage.clone(),
            bugreports: meta.bugreports.clone(),
            file: file.clone(),
        })
        .await
    {
        Ok(dap) => dap,
        Err(DatabaseError::Conflict(_)) => return Err(version_taken()),
        Err(e) => return Err(e.into()),
    };

    if let Err(e) = media.save(&file, bytes).await {
        tracing::error!("Storing {} failed: {}", file, e);
        store.delete_dap(dap.id).await?;
        if created {
            store.delete_metadap(metadap.id).await?;
        }
        return Err(e.into());
    }

    let metadap = refresh_latest(store, metadap.id).await?;
    tracing::info!(
        "{} uploaded {}",
        uploader.username,
        dap.label(&metadap.package_name)
    );
    Ok(metadap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::NewUser;
    use crate::database::{MemoryStore, MetaDapRepo, UserRepo};
    use crate::package::archive::tests::tarball;

    fn meta(version: &str) -> String {
        format!(
            "package_name: foo\nversion: '{}'\nlicense: MIT\nauthors: [Foo]\nsummary: Foo\n",
            version
        )
    }

    fn archive(version: &str) -> Vec<u8> {
        let path = format!("foo-{}/meta.yaml", version);
        let content = meta(version);
        tarball(&[(path.as_str(), content.as_str())])
    }

    fn temp_media() -> MediaStorage {
        MediaStorage::new(std::env::temp_dir().join(format!("dapi-upload-{}", uuid::Uuid::new_v4())))
    }

    #[tokio::test]
    async fn first_upload_creates_the_dap() {
        let store = MemoryStore::new();
        let media = temp_media();
        let owner = store.create_user(NewUser::named("owner")).await.unwrap();

        let metadap = handle_uploaded_dap(&store, &media, &owner, "foo-1.0.dap", &archive("1.0"))
            .await
            .unwrap();
        assert_eq!(metadap.user_id, owner.id);
        assert!(metadap.latest_id.is_some());
        assert_eq!(metadap.latest_id, metadap.latest_stable_id);
        assert!(media.read("daps/foo/foo-1.0.dap").await.is_ok());

        let metadap = handle_uploaded_dap(&store, &media, &owner, "foo-1.1a.dap", &archive("1.1a"))
            .await
            .unwrap();
        assert_ne!(metadap.latest_id, metadap.latest_stable_id);

        let _ = std::fs::remove_dir_all(media.root());
    }

    #[tokio::test]
    async fn rejects_strangers_and_duplicates() {
        let store = MemoryStore::new();
        let media = temp_media();
        let owner = store.create_user(NewUser::named("owner")).await.unwrap();
        let stranger = store.create_user(NewUser::named("stranger")).await.unwrap();
        handle_uploaded_dap(&store, &media, &owner, "foo-1.0.dap", &archive("1.0"))
            .await
            .unwrap();

        match handle_uploaded_dap(&store, &media, &owner, "foo-1.0.dap", &archive("1.0")).await {
            Err(UploadError::Invalid(errors)) => {
                assert_eq!(errors, vec!["Version 1.0 of foo already exists."])
            }
            other => panic!("unexpected {:?}", other),
        }
        match handle_uploaded_dap(&store, &media, &stranger, "foo-2.0.dap", &archive("2.0")).await {
            Err(UploadError::Invalid(errors)) => assert_eq!(
                errors,
                vec!["You don't have permissions to upload new versions of dap foo."]
            ),
            other => panic!("unexpected {:?}", other),
        }

        let _ = std::fs::remove_dir_all(media.root());
    }

    #[tokio::test]
    async fn archive_errors_are_reported() {
        let store = MemoryStore::new();
        let media = temp_media();
        let owner = store.create_user(NewUser::named("owner")).await.unwrap();
        let result = handle_uploaded_dap(&store, &media, &owner, "foo.zip", b"zip").await;
        assert!(matches!(result, Err(UploadError::Invalid(_))));
        assert!(store.metadap_by_name("foo").await.unwrap().is_none());
    }
}
