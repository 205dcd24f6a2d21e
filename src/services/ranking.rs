use crate::database::models::{MetaDap, User};
use crate::database::{Store, StoreResult};

pub const MAX_RANK: i32 = 5;

/// The user's score for the dap, 0 when unranked or anonymous
pub async fn get_rank(store: &dyn Store, metadap: &MetaDap, user: Option<&User>) -> StoreResult<i32> {
    let Some(user) = user else {
        return Ok(0);
    };
    Ok(store
        .rank_of(user.id, metadap.id)
        .await?
        .map(|r| r.rank)
        .unwrap_or(0))
}

/// Ranks with 1..=5 or unranks with 0 and refreshes the aggregates.
/// Callers reject values above [`MAX_RANK`].
pub async fn rank_dap(
    store: &dyn Store,
    user: &User,
    metadap: &MetaDap,
    rank: i32,
) -> StoreResult<MetaDap> {
    if rank > 0 {
        store.upsert_rank(user.id, metadap.id, rank).await?;
    } else {
        store.delete_rank(user.id, metadap.id).await?;
    }
    store.refresh_rank_stats(metadap.id).await
}
