use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use crate::database::manager::{conflict_on_unique, DatabaseError, DatabaseManager};
use crate::database::models::{
    Dap, MetaDap, MetaDapOrder, MetaDapQuery, NewDap, NewReport, NewTag, NewUser, Rank, Report,
    SocialAuth, Tag, User,
};
use crate::database::store::{
    DapRepo, MetaDapRepo, RankRepo, ReportRepo, SocialRepo, Store, StoreResult, TagRepo,
    UserRepo, Window,
};
use crate::package::suffixed_slug;

const USER_COLUMNS: &str =
    "u.id, u.username, u.email, u.first_name, u.last_name, u.is_staff, u.is_superuser, u.date_joined";

const METADAP_COLUMNS: &str =
    "m.id, m.package_name, m.user_id, m.active, m.latest_id, m.latest_stable_id, m.average_rank, m.rank_count";

const DAP_COLUMNS: &str = "d.id, d.metadap_id, d.version, d.license, d.summary, d.description, \
     d.authors, d.homepage, d.bugreports, d.file, d.uploaded_at";

const REPORT_SELECT: &str = "SELECT r.id, r.metadap_id, r.problem, r.reporter_id, r.email, \
     r.message, r.solved, r.created_at, \
     ARRAY(SELECT v.dap_id FROM report_versions v WHERE v.report_id = r.id ORDER BY v.dap_id) AS versions \
     FROM reports r";

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_metadap_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &MetaDapQuery) {
        builder.push(" WHERE TRUE");
        if let Some(active) = query.active {
            builder.push(" AND m.active = ").push_bind(active);
        }
        if let Some(slug) = &query.tag_slug {
            builder
                .push(
                    " AND EXISTS (SELECT 1 FROM metadap_tags mt JOIN tags t ON t.id = mt.tag_id \
                     WHERE mt.metadap_id = m.id AND t.slug = ",
                )
                .push_bind(slug.clone())
                .push(")");
        }
    }
}

#[async_trait]
impl UserRepo for PgStore {
    async fn user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users u WHERE u.id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users u WHERE u.username = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_users(&self, window: Window) -> StoreResult<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM users u ORDER BY u.id LIMIT $1 OFFSET $2",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(window.limit)
            .bind(window.offset)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn count_users(&self) -> StoreResult<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email, first_name, last_name, is_staff, is_superuser)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, username, email, first_name, last_name, is_staff, is_superuser, date_joined",
        )
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(new.is_staff)
        .bind(new.is_superuser)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, format!("username {}", new.username)))
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET username = $2, email = $3, first_name = $4, last_name = $5,
             is_staff = $6, is_superuser = $7
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, format!("username {}", user.username)))?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("user {}", user.id)));
        }
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let ranked: Vec<i64> =
            sqlx::query_scalar("SELECT DISTINCT metadap_id FROM ranks WHERE user_id = $1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("user {}", id)));
        }

        // Owned metadaps are gone by now; the rest get fresh aggregates
        sqlx::query(
            "UPDATE metadaps SET
                rank_count = (SELECT COUNT(*) FROM ranks r WHERE r.metadap_id = metadaps.id),
                average_rank = COALESCE((SELECT AVG(r.rank) FROM ranks r WHERE r.metadap_id = metadaps.id), 0)
             WHERE id = ANY($1)",
        )
        .bind(&ranked)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl SocialRepo for PgStore {
    async fn social_auths_of(&self, user_id: i64) -> StoreResult<Vec<SocialAuth>> {
        Ok(sqlx::query_as::<_, SocialAuth>(
            "SELECT id, user_id, provider, uid, username FROM social_auths WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn social_auth_by_uid(&self, provider: &str, uid: &str) -> StoreResult<Option<SocialAuth>> {
        Ok(sqlx::query_as::<_, SocialAuth>(
            "SELECT id, user_id, provider, uid, username FROM social_auths WHERE provider = $1 AND uid = $2",
        )
        .bind(provider)
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_social_auth(
        &self,
        user_id: i64,
        provider: &str,
        uid: &str,
        username: &str,
    ) -> StoreResult<SocialAuth> {
        sqlx::query_as::<_, SocialAuth>(
            "INSERT INTO social_auths (user_id, provider, uid, username) VALUES ($1, $2, $3, $4)
             RETURNING id, user_id, provider, uid, username",
        )
        .bind(user_id)
        .bind(provider)
        .bind(uid)
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, format!("{} account {}", provider, uid)))
    }

    async fn update_social_auth(&self, auth: &SocialAuth) -> StoreResult<()> {
        sqlx::query("UPDATE social_auths SET username = $2 WHERE id = $1")
            .bind(auth.id)
            .bind(&auth.username)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn profile_syncs(&self, user_id: i64) -> StoreResult<Vec<i64>> {
        Ok(sqlx::query_scalar(
            "SELECT social_auth_id FROM profile_syncs WHERE user_id = $1 ORDER BY social_auth_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn set_profile_syncs(&self, user_id: i64, social_auth_ids: &[i64]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM profile_syncs WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        for id in social_auth_ids {
            sqlx::query(
                "INSERT INTO profile_syncs (user_id, social_auth_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(user_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl MetaDapRepo for PgStore {
    async fn metadap_by_id(&self, id: i64) -> StoreResult<Option<MetaDap>> {
        let sql = format!("SELECT {} FROM metadaps m WHERE m.id = $1", METADAP_COLUMNS);
        Ok(sqlx::query_as::<_, MetaDap>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn metadap_by_name(&self, package_name: &str) -> StoreResult<Option<MetaDap>> {
        let sql = format!("SELECT {} FROM metadaps m WHERE m.package_name = $1", METADAP_COLUMNS);
        Ok(sqlx::query_as::<_, MetaDap>(&sql)
            .bind(package_name)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_metadaps(&self, query: &MetaDapQuery) -> StoreResult<Vec<MetaDap>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM metadaps m", METADAP_COLUMNS));
        Self::push_metadap_filters(&mut builder, query);
        builder.push(match query.order {
            MetaDapOrder::TopRated => " ORDER BY m.average_rank DESC, m.rank_count DESC, m.id",
            MetaDapOrder::MostRated => " ORDER BY m.rank_count DESC, m.average_rank DESC, m.id",
            MetaDapOrder::Id => " ORDER BY m.id",
        });
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit);
        }
        builder.push(" OFFSET ").push_bind(query.offset);

        Ok(builder
            .build_query_as::<MetaDap>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn count_metadaps(&self, query: &MetaDapQuery) -> StoreResult<i64> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM metadaps m");
        Self::push_metadap_filters(&mut builder, query);
        Ok(builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?)
    }

    async fn create_metadap(&self, package_name: &str, owner_id: i64) -> StoreResult<MetaDap> {
        sqlx::query_as::<_, MetaDap>(
            "INSERT INTO metadaps (package_name, user_id) VALUES ($1, $2)
             RETURNING id, package_name, user_id, active, latest_id, latest_stable_id, average_rank, rank_count",
        )
        .bind(package_name)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, format!("dap {}", package_name)))
    }

    async fn update_metadap(&self, metadap: &MetaDap) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE metadaps SET active = $2, latest_id = $3, latest_stable_id = $4 WHERE id = $1",
        )
        .bind(metadap.id)
        .bind(metadap.active)
        .bind(metadap.latest_id)
        .bind(metadap.latest_stable_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("dap {}", metadap.package_name)));
        }
        Ok(())
    }

    async fn delete_metadap(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM metadaps WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("dap {}", id)));
        }
        Ok(())
    }

    async fn owned_by(&self, user_id: i64) -> StoreResult<Vec<MetaDap>> {
        let sql = format!(
            "SELECT {} FROM metadaps m WHERE m.user_id = $1 ORDER BY m.package_name",
            METADAP_COLUMNS
        );
        Ok(sqlx::query_as::<_, MetaDap>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn comaintained_by(&self, user_id: i64) -> StoreResult<Vec<MetaDap>> {
        let sql = format!(
            "SELECT {} FROM metadaps m JOIN metadap_comaintainers c ON c.metadap_id = m.id
             WHERE c.user_id = $1 ORDER BY m.package_name",
            METADAP_COLUMNS
        );
        Ok(sqlx::query_as::<_, MetaDap>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn comaintainers(&self, metadap_id: i64) -> StoreResult<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM users u JOIN metadap_comaintainers c ON c.user_id = u.id
             WHERE c.metadap_id = $1 ORDER BY u.username",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(metadap_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn set_comaintainers(&self, metadap_id: i64, user_ids: &[i64]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let owner: i64 = sqlx::query_scalar("SELECT user_id FROM metadaps WHERE id = $1 FOR UPDATE")
            .bind(metadap_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("dap {}", metadap_id)))?;

        sqlx::query("DELETE FROM metadap_comaintainers WHERE metadap_id = $1")
            .bind(metadap_id)
            .execute(&mut *tx)
            .await?;
        for user_id in user_ids.iter().filter(|id| **id != owner) {
            sqlx::query(
                "INSERT INTO metadap_comaintainers (metadap_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(metadap_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn remove_comaintainer(&self, metadap_id: i64, user_id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM metadap_comaintainers WHERE metadap_id = $1 AND user_id = $2")
            .bind(metadap_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn transfer_ownership(&self, metadap_id: i64, new_owner_id: i64) -> StoreResult<MetaDap> {
        let mut tx = self.pool.begin().await?;
        let old_owner: i64 = sqlx::query_scalar("SELECT user_id FROM metadaps WHERE id = $1 FOR UPDATE")
            .bind(metadap_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("dap {}", metadap_id)))?;

        let updated = sqlx::query_as::<_, MetaDap>(
            "UPDATE metadaps SET user_id = $2 WHERE id = $1
             RETURNING id, package_name, user_id, active, latest_id, latest_stable_id, average_rank, rank_count",
        )
        .bind(metadap_id)
        .bind(new_owner_id)
        .fetch_one(&mut *tx)
        .await?;

        if old_owner != new_owner_id {
            sqlx::query(
                "INSERT INTO metadap_comaintainers (metadap_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(metadap_id)
            .bind(old_owner)
            .execute(&mut *tx)
            .await?;
        }
        sqlx::query("DELETE FROM metadap_comaintainers WHERE metadap_id = $1 AND user_id = $2")
            .bind(metadap_id)
            .bind(new_owner_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn similar_active(&self, metadap_id: i64, limit: i64) -> StoreResult<Vec<MetaDap>> {
        let sql = format!(
            "SELECT {} FROM metadaps m
             JOIN metadap_tags mt ON mt.metadap_id = m.id
             WHERE m.active AND m.id <> $1
               AND mt.tag_id IN (SELECT tag_id FROM metadap_tags WHERE metadap_id = $1)
             GROUP BY m.id
             ORDER BY COUNT(*) DESC, m.package_name
             LIMIT $2",
            METADAP_COLUMNS
        );
        Ok(sqlx::query_as::<_, MetaDap>(&sql)
            .bind(metadap_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
    }
}

#[async_trait]
impl TagRepo for PgStore {
    async fn tag_by_slug(&self, slug: &str) -> StoreResult<Option<Tag>> {
        Ok(sqlx::query_as::<_, Tag>("SELECT id, name, slug FROM tags WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn tags_of(&self, metadap_id: i64) -> StoreResult<Vec<Tag>> {
        Ok(sqlx::query_as::<_, Tag>(
            "SELECT t.id, t.name, t.slug FROM tags t JOIN metadap_tags mt ON mt.tag_id = t.id
             WHERE mt.metadap_id = $1 ORDER BY t.name",
        )
        .bind(metadap_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn set_tags(&self, metadap_id: i64, tags: &[NewTag]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM metadap_tags WHERE metadap_id = $1")
            .bind(metadap_id)
            .execute(&mut *tx)
            .await?;
        for tag in tags {
            let tag_id = tag_id_for(&mut tx, tag).await?;
            sqlx::query(
                "INSERT INTO metadap_tags (metadap_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(metadap_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

/// Id of the tag with this name, created with the first free slug when missing
async fn tag_id_for(tx: &mut Transaction<'_, Postgres>, tag: &NewTag) -> StoreResult<i64> {
    let mut attempt = 0;
    loop {
        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM tags WHERE name = $1")
            .bind(&tag.name)
            .fetch_optional(&mut **tx)
            .await?;
        if let Some(id) = existing {
            return Ok(id);
        }
        let inserted: Option<i64> = sqlx::query_scalar(
            "INSERT INTO tags (name, slug) VALUES ($1, $2) ON CONFLICT DO NOTHING RETURNING id",
        )
        .bind(&tag.name)
        .bind(suffixed_slug(&tag.slug, attempt))
        .fetch_optional(&mut **tx)
        .await?;
        if let Some(id) = inserted {
            return Ok(id);
        }
        attempt += 1;
    }
}

#[async_trait]
impl DapRepo for PgStore {
    async fn dap_by_id(&self, id: i64) -> StoreResult<Option<Dap>> {
        let sql = format!("SELECT {} FROM daps d WHERE d.id = $1", DAP_COLUMNS);
        Ok(sqlx::query_as::<_, Dap>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn dap_by_version(&self, metadap_id: i64, version: &str) -> StoreResult<Option<Dap>> {
        let sql = format!(
            "SELECT {} FROM daps d WHERE d.metadap_id = $1 AND d.version = $2",
            DAP_COLUMNS
        );
        Ok(sqlx::query_as::<_, Dap>(&sql)
            .bind(metadap_id)
            .bind(version)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn daps_of(&self, metadap_id: i64) -> StoreResult<Vec<Dap>> {
        let sql = format!(
            "SELECT {} FROM daps d WHERE d.metadap_id = $1 ORDER BY d.id",
            DAP_COLUMNS
        );
        Ok(sqlx::query_as::<_, Dap>(&sql)
            .bind(metadap_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_daps(&self, window: Window) -> StoreResult<Vec<Dap>> {
        let sql = format!(
            "SELECT {} FROM daps d ORDER BY d.id LIMIT $1 OFFSET $2",
            DAP_COLUMNS
        );
        Ok(sqlx::query_as::<_, Dap>(&sql)
            .bind(window.limit)
            .bind(window.offset)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn count_daps(&self) -> StoreResult<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM daps")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn create_dap(&self, new: NewDap) -> StoreResult<Dap> {
        sqlx::query_as::<_, Dap>(
            "INSERT INTO daps (metadap_id, version, license, summary, description, authors,
                               homepage, bugreports, file)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING id, metadap_id, version, license, summary, description, authors,
                       homepage, bugreports, file, uploaded_at",
        )
        .bind(new.metadap_id)
        .bind(&new.version)
        .bind(&new.license)
        .bind(&new.summary)
        .bind(&new.description)
        .bind(&new.authors)
        .bind(&new.homepage)
        .bind(&new.bugreports)
        .bind(&new.file)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, format!("version {}", new.version)))
    }

    async fn delete_dap(&self, id: i64) -> StoreResult<()> {
        // latest pointers are cleared by ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM daps WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("dap version {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl ReportRepo for PgStore {
    async fn report_by_id(&self, id: i64) -> StoreResult<Option<Report>> {
        let sql = format!("{} WHERE r.id = $1", REPORT_SELECT);
        Ok(sqlx::query_as::<_, Report>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn reports_of(&self, metadap_id: i64, include_solved: bool) -> StoreResult<Vec<Report>> {
        let sql = format!(
            "{} WHERE r.metadap_id = $1 AND ($2 OR NOT r.solved) ORDER BY r.solved, r.id",
            REPORT_SELECT
        );
        Ok(sqlx::query_as::<_, Report>(&sql)
            .bind(metadap_id)
            .bind(include_solved)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn unsolved_report_count(&self, metadap_id: i64) -> StoreResult<i64> {
        Ok(sqlx::query_scalar(
            "SELECT COUNT(*) FROM reports WHERE metadap_id = $1 AND NOT solved",
        )
        .bind(metadap_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn create_report(&self, new: NewReport) -> StoreResult<Report> {
        let mut tx = self.pool.begin().await?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO reports (metadap_id, problem, reporter_id, email, message)
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(new.metadap_id)
        .bind(new.problem.as_str())
        .bind(new.reporter_id)
        .bind(&new.email)
        .bind(&new.message)
        .fetch_one(&mut *tx)
        .await?;

        for dap_id in &new.versions {
            sqlx::query(
                "INSERT INTO report_versions (report_id, dap_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(dap_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        self.report_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("report {}", id)))
    }

    async fn set_report_solved(&self, id: i64, solved: bool) -> StoreResult<()> {
        let result = sqlx::query("UPDATE reports SET solved = $2 WHERE id = $1")
            .bind(id)
            .bind(solved)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("report {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl RankRepo for PgStore {
    async fn rank_of(&self, user_id: i64, metadap_id: i64) -> StoreResult<Option<Rank>> {
        Ok(sqlx::query_as::<_, Rank>(
            "SELECT id, user_id, metadap_id, rank FROM ranks WHERE user_id = $1 AND metadap_id = $2",
        )
        .bind(user_id)
        .bind(metadap_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn upsert_rank(&self, user_id: i64, metadap_id: i64, rank: i32) -> StoreResult<Rank> {
        Ok(sqlx::query_as::<_, Rank>(
            "INSERT INTO ranks (user_id, metadap_id, rank) VALUES ($1, $2, $3)
             ON CONFLICT (user_id, metadap_id) DO UPDATE SET rank = EXCLUDED.rank
             RETURNING id, user_id, metadap_id, rank",
        )
        .bind(user_id)
        .bind(metadap_id)
        .bind(rank)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn delete_rank(&self, user_id: i64, metadap_id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM ranks WHERE user_id = $1 AND metadap_id = $2")
            .bind(user_id)
            .bind(metadap_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn refresh_rank_stats(&self, metadap_id: i64) -> StoreResult<MetaDap> {
        sqlx::query_as::<_, MetaDap>(
            "UPDATE metadaps SET
                rank_count = (SELECT COUNT(*) FROM ranks r WHERE r.metadap_id = $1),
                average_rank = COALESCE((SELECT AVG(r.rank)::FLOAT8 FROM ranks r WHERE r.metadap_id = $1), 0)
             WHERE id = $1
             RETURNING id, package_name, user_id, active, latest_id, latest_stable_id, average_rank, rank_count",
        )
        .bind(metadap_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("dap {}", metadap_id)))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn migrate(&self) -> StoreResult<()> {
        DatabaseManager::migrate(&self.pool).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        DatabaseManager::health_check(&self.pool).await
    }
}
