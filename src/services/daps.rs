//! Latest version tracking and removal of daps with their archives.

use crate::database::models::{Dap, MetaDap, User};
use crate::database::{DatabaseError, Store, StoreResult};
use crate::package::Version;
use crate::storage::MediaStorage;

/// Ids of the highest version and the highest non pre-release version.
/// Equal versions resolve to the later upload; unparsable ones are skipped.
pub fn pick_latest(daps: &[Dap]) -> (Option<i64>, Option<i64>) {
    let parsed: Vec<(Version, i64)> = daps
        .iter()
        .filter_map(|d| Version::parse(&d.version).ok().map(|v| (v, d.id)))
        .collect();

    let newest = |stable_only: bool| {
        parsed
            .iter()
            .filter(|(v, _)| !stable_only || !v.is_pre())
            .max_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)))
            .map(|(_, id)| *id)
    };
    (newest(false), newest(true))
}

/// Recomputes the latest pointers from the stored daps
pub async fn refresh_latest(store: &dyn Store, metadap_id: i64) -> StoreResult<MetaDap> {
    let mut metadap = store
        .metadap_by_id(metadap_id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("dap {}", metadap_id)))?;
    let daps = store.daps_of(metadap_id).await?;
    let (latest, latest_stable) = pick_latest(&daps);

    if metadap.latest_id != latest || metadap.latest_stable_id != latest_stable {
        metadap.latest_id = latest;
        metadap.latest_stable_id = latest_stable;
        store.update_metadap(&metadap).await?;
    }
    Ok(metadap)
}

/// Owner, comaintainer or superuser
pub async fn can_maintain(store: &dyn Store, user: &User, metadap: &MetaDap) -> StoreResult<bool> {
    if metadap.is_owner(user) || user.is_superuser {
        return Ok(true);
    }
    Ok(store
        .comaintainers(metadap.id)
        .await?
        .iter()
        .any(|c| c.id == user.id))
}

/// Owner or superuser
pub fn can_administrate(user: &User, metadap: &MetaDap) -> bool {
    metadap.is_owner(user) || user.is_superuser
}

async fn remove_file(media: &MediaStorage, path: &str) {
    if path.is_empty() {
        return;
    }
    if let Err(e) = media.delete(path).await {
        tracing::warn!("Could not remove {}: {}", path, e);
    }
}

/// Deletes one version and points latest/latest_stable at what remains
pub async fn delete_version(
    store: &dyn Store,
    media: &MediaStorage,
    dap: &Dap,
) -> StoreResult<MetaDap> {
    store.delete_dap(dap.id).await?;
    remove_file(media, &dap.file).await;
    refresh_latest(store, dap.metadap_id).await
}

/// Deletes a dap with all its versions
pub async fn delete_metadap(
    store: &dyn Store,
    media: &MediaStorage,
    metadap: &MetaDap,
) -> StoreResult<()> {
    let daps = store.daps_of(metadap.id).await?;
    store.delete_metadap(metadap.id).await?;
    for dap in daps {
        remove_file(media, &dap.file).await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{NewDap, NewUser};
    use crate::database::{DapRepo, MemoryStore, MetaDapRepo, UserRepo};
    use chrono::Utc;

    fn dap(id: i64, version: &str) -> Dap {
        Dap {
            id,
            metadap_id: 1,
            version: version.into(),
            license: String::new(),
            summary: String::new(),
            description: String::new(),
            authors: Vec::new(),
            homepage: String::new(),
            bugreports: String::new(),
            file: String::new(),
            uploaded_at: Utc::now(),
        }
    }

    #[test]
    fn picks_highest_versions() {
        let daps = [dap(1, "1.0"), dap(2, "1.10"), dap(3, "2.0dev"), dap(4, "1.9")];
        assert_eq!(pick_latest(&daps), (Some(3), Some(2)));
    }

    #[test]
    fn only_prereleases() {
        let daps = [dap(1, "0.1a"), dap(2, "0.1b")];
        assert_eq!(pick_latest(&daps), (Some(2), None));
        assert_eq!(pick_latest(&[]), (None, None));
    }

    #[test]
    fn final_beats_prerelease_of_same_number() {
        let daps = [dap(1, "1.0"), dap(2, "1.0b")];
        assert_eq!(pick_latest(&daps), (Some(1), Some(1)));
    }

    #[tokio::test]
    async fn deleting_latest_version_moves_pointers() {
        let store = MemoryStore::new();
        let media = MediaStorage::new(std::env::temp_dir().join("dapi-unused-media"));
        let owner = store.create_user(NewUser::named("owner")).await.unwrap();
        let metadap = store.create_metadap("foo", owner.id).await.unwrap();
        let mut ids = Vec::new();
        for version in ["1.0", "1.1", "2.0a"] {
            let created = store
                .create_dap(NewDap {
                    metadap_id: metadap.id,
                    version: version.into(),
                    license: "MIT".into(),
                    summary: "s".into(),
                    description: String::new(),
                    authors: vec!["a".into()],
                    homepage: String::new(),
                    bugreports: String::new(),
                    file: String::new(),
                })
                .await
                .unwrap();
            ids.push(created);
        }
        let refreshed = refresh_latest(&store, metadap.id).await.unwrap();
        assert_eq!(refreshed.latest_id, Some(ids[2].id));
        assert_eq!(refreshed.latest_stable_id, Some(ids[1].id));

        let after = delete_version(&store, &media, &ids[1]).await.unwrap();
        assert_eq!(after.latest_id, Some(ids[2].id));
        assert_eq!(after.latest_stable_id, Some(ids[0].id));
    }

    #[tokio::test]
    async fn maintainers() {
        let store = MemoryStore::new();
        let owner = store.create_user(NewUser::named("owner")).await.unwrap();
        let co = store.create_user(NewUser::named("co")).await.unwrap();
        let other = store.create_user(NewUser::named("other")).await.unwrap();
        let root = store
            .create_user(NewUser {
                is_superuser: true,
                ..NewUser::named("root")
            })
            .await
            .unwrap();
        let metadap = store.create_metadap("foo", owner.id).await.unwrap();
        store.set_comaintainers(metadap.id, &[co.id]).await.unwrap();

        assert!(can_maintain(&store, &owner, &metadap).await.unwrap());
        assert!(can_maintain(&store, &co, &metadap).await.unwrap());
        assert!(can_maintain(&store, &root, &metadap).await.unwrap());
        assert!(!can_maintain(&store, &other, &metadap).await.unwrap());
        assert!(!can_administrate(&co, &metadap));
        assert!(can_administrate(&root, &metadap));
    }
}
