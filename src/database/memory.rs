//! In-process store backing `dapi serve --memory` and the test suites.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    Dap, MetaDap, MetaDapOrder, MetaDapQuery, NewDap, NewReport, NewTag, NewUser, Rank, Report,
    SocialAuth, Tag, User,
};
use crate::database::store::{
    DapRepo, MetaDapRepo, RankRepo, ReportRepo, SocialRepo, Store, StoreResult, TagRepo,
    UserRepo, Window,
};
use crate::package::suffixed_slug;

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    social_auths: BTreeMap<i64, SocialAuth>,
    // (user_id, social_auth_id)
    syncs: BTreeSet<(i64, i64)>,
    metadaps: BTreeMap<i64, MetaDap>,
    // (metadap_id, user_id)
    comaintainers: BTreeSet<(i64, i64)>,
    tags: BTreeMap<i64, Tag>,
    // (metadap_id, tag_id)
    metadap_tags: BTreeSet<(i64, i64)>,
    daps: BTreeMap<i64, Dap>,
    reports: BTreeMap<i64, Report>,
    ranks: BTreeMap<i64, Rank>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn username_taken(&self, username: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && Some(u.id) != except)
    }

    fn matches(&self, m: &MetaDap, query: &MetaDapQuery) -> bool {
        if let Some(active) = query.active {
            if m.active != active {
                return false;
            }
        }
        if let Some(slug) = &query.tag_slug {
            let tagged = self
                .metadap_tags
                .iter()
                .filter(|(metadap_id, _)| *metadap_id == m.id)
                .any(|(_, tag_id)| self.tags.get(tag_id).map(|t| &t.slug) == Some(slug));
            if !tagged {
                return false;
            }
        }
        true
    }

    fn remove_metadap(&mut self, id: i64) {
        self.metadaps.remove(&id);
        self.daps.retain(|_, d| d.metadap_id != id);
        self.reports.retain(|_, r| r.metadap_id != id);
        self.ranks.retain(|_, r| r.metadap_id != id);
        self.comaintainers.retain(|(m, _)| *m != id);
        self.metadap_tags.retain(|(m, _)| *m != id);
    }

    fn refresh_stats(&mut self, metadap_id: i64) -> Option<MetaDap> {
        let scores: Vec<i32> = self
            .ranks
            .values()
            .filter(|r| r.metadap_id == metadap_id)
            .map(|r| r.rank)
            .collect();
        let metadap = self.metadaps.get_mut(&metadap_id)?;
        metadap.rank_count = scores.len() as i32;
        metadap.average_rank = if scores.is_empty() {
            0.0
        } else {
            scores.iter().map(|s| f64::from(*s)).sum::<f64>() / scores.len() as f64
        };
        Some(metadap.clone())
    }

    fn users_of(&self, ids: impl Iterator<Item = i64>) -> Vec<User> {
        let mut users: Vec<User> = ids.filter_map(|id| self.users.get(&id).cloned()).collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users
    }
}

fn not_found(what: impl Into<String>) -> DatabaseError {
    DatabaseError::NotFound(what.into())
}

fn sort_metadaps(metadaps: &mut [MetaDap], order: MetaDapOrder) {
    match order {
        MetaDapOrder::TopRated => metadaps.sort_by(|a, b| {
            b.average_rank
                .total_cmp(&a.average_rank)
                .then(b.rank_count.cmp(&a.rank_count))
                .then(a.id.cmp(&b.id))
        }),
        MetaDapOrder::MostRated => metadaps.sort_by(|a, b| {
            b.rank_count
                .cmp(&a.rank_count)
                .then(b.average_rank.total_cmp(&a.average_rank))
                .then(a.id.cmp(&b.id))
        }),
        MetaDapOrder::Id => metadaps.sort_by_key(|m| m.id),
    }
}

fn apply_window<T>(items: Vec<T>, limit: Option<i64>, offset: i64) -> Vec<T> {
    let skipped = items.into_iter().skip(offset.max(0) as usize);
    match limit {
        Some(limit) => skipped.take(limit.max(0) as usize).collect(),
        None => skipped.collect(),
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn list_users(&self, window: Window) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        let users = tables.users.values().cloned().collect();
        Ok(apply_window(users, Some(window.limit), window.offset))
    }

    async fn count_users(&self) -> StoreResult<i64> {
        Ok(self.tables.read().await.users.len() as i64)
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.username_taken(&new.username, None) {
            return Err(DatabaseError::Conflict(format!("username {}", new.username)));
        }
        let user = User {
            id: tables.next_id(),
            username: new.username,
            email: new.email,
            first_name: new.first_name,
            last_name: new.last_name,
            is_staff: new.is_staff,
            is_superuser: new.is_superuser,
            date_joined: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.username_taken(&user.username, Some(user.id)) {
            return Err(DatabaseError::Conflict(format!("username {}", user.username)));
        }
        let slot = tables
            .users
            .get_mut(&user.id)
            .ok_or_else(|| not_found(format!("user {}", user.id)))?;
        *slot = user.clone();
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Err(not_found(format!("user {}", id)));
        }
        let owned: Vec<i64> = tables
            .metadaps
            .values()
            .filter(|m| m.user_id == id)
            .map(|m| m.id)
            .collect();
        for metadap_id in owned {
            tables.remove_metadap(metadap_id);
        }
        let ranked: BTreeSet<i64> = tables
            .ranks
            .values()
            .filter(|r| r.user_id == id)
            .map(|r| r.metadap_id)
            .collect();
        tables.ranks.retain(|_, r| r.user_id != id);
        for metadap_id in ranked {
            tables.refresh_stats(metadap_id);
        }
        tables.social_auths.retain(|_, a| a.user_id != id);
        tables.syncs.retain(|(user_id, _)| *user_id != id);
        tables.comaintainers.retain(|(_, user_id)| *user_id != id);
        for report in tables.reports.values_mut() {
            if report.reporter_id == Some(id) {
                report.reporter_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SocialRepo for MemoryStore {
    async fn social_auths_of(&self, user_id: i64) -> StoreResult<Vec<SocialAuth>> {
        let tables = self.tables.read().await;
        Ok(tables
            .social_auths
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn social_auth_by_uid(&self, provider: &str, uid: &str) -> StoreResult<Option<SocialAuth>> {
        let tables = self.tables.read().await;
        Ok(tables
            .social_auths
            .values()
            .find(|a| a.provider == provider && a.uid == uid)
            .cloned())
    }

    async fn create_social_auth(
        &self,
        user_id: i64,
        provider: &str,
        uid: &str,
        username: &str,
    ) -> StoreResult<SocialAuth> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(not_found(format!("user {}", user_id)));
        }
        if tables
            .social_auths
            .values()
            .any(|a| a.provider == provider && a.uid == uid)
        {
            return Err(DatabaseError::Conflict(format!("{} account {}", provider, uid)));
        }
        let auth = SocialAuth {
            id: tables.next_id(),
            user_id,
            provider: provider.to_string(),
            uid: uid.to_string(),
            username: username.to_string(),
        };
        tables.social_auths.insert(auth.id, auth.clone());
        Ok(auth)
    }

    async fn update_social_auth(&self, auth: &SocialAuth) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .social_auths
            .get_mut(&auth.id)
            .ok_or_else(|| not_found(format!("social auth {}", auth.id)))?;
        *slot = auth.clone();
        Ok(())
    }

    async fn profile_syncs(&self, user_id: i64) -> StoreResult<Vec<i64>> {
        let tables = self.tables.read().await;
        Ok(tables
            .syncs
            .iter()
            .filter(|(u, _)| *u == user_id)
            .map(|(_, a)| *a)
            .collect())
    }

    async fn set_profile_syncs(&self, user_id: i64, social_auth_ids: &[i64]) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.syncs.retain(|(u, _)| *u != user_id);
        for id in social_auth_ids {
            tables.syncs.insert((user_id, *id));
        }
        Ok(())
    }
}

#[async_trait]
impl MetaDapRepo for MemoryStore {
    async fn metadap_by_id(&self, id: i64) -> StoreResult<Option<MetaDap>> {
        Ok(self.tables.read().await.metadaps.get(&id).cloned())
    }

    async fn metadap_by_name(&self, package_name: &str) -> StoreResult<Option<MetaDap>> {
        let tables = self.tables.read().await;
        Ok(tables
            .metadaps
            .values()
            .find(|m| m.package_name == package_name)
            .cloned())
    }

    async fn list_metadaps(&self, query: &MetaDapQuery) -> StoreResult<Vec<MetaDap>> {
        let tables = self.tables.read().await;
        let mut found: Vec<MetaDap> = tables
            .metadaps
            .values()
            .filter(|m| tables.matches(m, query))
            .cloned()
            .collect();
        sort_metadaps(&mut found, query.order);
        Ok(apply_window(found, query.limit, query.offset))
    }

    async fn count_metadaps(&self, query: &MetaDapQuery) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .metadaps
            .values()
            .filter(|m| tables.matches(m, query))
            .count() as i64)
    }

    async fn create_metadap(&self, package_name: &str, owner_id: i64) -> StoreResult<MetaDap> {
        let mut tables = self.tables.write().await;
        if tables.metadaps.values().any(|m| m.package_name == package_name) {
            return Err(DatabaseError::Conflict(format!("dap {}", package_name)));
        }
        let metadap = MetaDap {
            id: tables.next_id(),
            package_name: package_name.to_string(),
            user_id: owner_id,
            active: true,
            latest_id: None,
            latest_stable_id: None,
            average_rank: 0.0,
            rank_count: 0,
        };
        tables.metadaps.insert(metadap.id, metadap.clone());
        Ok(metadap)
    }

    async fn update_metadap(&self, metadap: &MetaDap) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .metadaps
            .get_mut(&metadap.id)
            .ok_or_else(|| not_found(format!("dap {}", metadap.package_name)))?;
        slot.active = metadap.active;
        slot.latest_id = metadap.latest_id;
        slot.latest_stable_id = metadap.latest_stable_id;
        Ok(())
    }

    async fn delete_metadap(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.metadaps.contains_key(&id) {
            return Err(not_found(format!("dap {}", id)));
        }
        tables.remove_metadap(id);
        Ok(())
    }

    async fn owned_by(&self, user_id: i64) -> StoreResult<Vec<MetaDap>> {
        let tables = self.tables.read().await;
        Ok(tables
            .metadaps
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn comaintained_by(&self, user_id: i64) -> StoreResult<Vec<MetaDap>> {
        let tables = self.tables.read().await;
        Ok(tables
            .comaintainers
            .iter()
            .filter(|(_, u)| *u == user_id)
            .filter_map(|(m, _)| tables.metadaps.get(m).cloned())
            .collect())
    }

    async fn comaintainers(&self, metadap_id: i64) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        let ids = tables
            .comaintainers
            .iter()
            .filter(|(m, _)| *m == metadap_id)
            .map(|(_, u)| *u);
        Ok(tables.users_of(ids))
    }

    async fn set_comaintainers(&self, metadap_id: i64, user_ids: &[i64]) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let owner = tables
            .metadaps
            .get(&metadap_id)
            .map(|m| m.user_id)
            .ok_or_else(|| not_found(format!("dap {}", metadap_id)))?;
        tables.comaintainers.retain(|(m, _)| *m != metadap_id);
        for user_id in user_ids.iter().filter(|id| **id != owner) {
            tables.comaintainers.insert((metadap_id, *user_id));
        }
        Ok(())
    }

    async fn remove_comaintainer(&self, metadap_id: i64, user_id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.comaintainers.remove(&(metadap_id, user_id));
        Ok(())
    }

    async fn transfer_ownership(&self, metadap_id: i64, new_owner_id: i64) -> StoreResult<MetaDap> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&new_owner_id) {
            return Err(not_found(format!("user {}", new_owner_id)));
        }
        let metadap = tables
            .metadaps
            .get_mut(&metadap_id)
            .ok_or_else(|| not_found(format!("dap {}", metadap_id)))?;
        let old_owner_id = metadap.user_id;
        metadap.user_id = new_owner_id;
        let updated = metadap.clone();
        if old_owner_id != new_owner_id {
            tables.comaintainers.insert((metadap_id, old_owner_id));
        }
        tables.comaintainers.remove(&(metadap_id, new_owner_id));
        Ok(updated)
    }

    async fn similar_active(&self, metadap_id: i64, limit: i64) -> StoreResult<Vec<MetaDap>> {
        let tables = self.tables.read().await;
        let own: BTreeSet<i64> = tables
            .metadap_tags
            .iter()
            .filter(|(m, _)| *m == metadap_id)
            .map(|(_, t)| *t)
            .collect();
        let mut scored: Vec<(usize, MetaDap)> = tables
            .metadaps
            .values()
            .filter(|m| m.active && m.id != metadap_id)
            .map(|m| {
                let shared = tables
                    .metadap_tags
                    .iter()
                    .filter(|(other, tag)| *other == m.id && own.contains(tag))
                    .count();
                (shared, m.clone())
            })
            .filter(|(shared, _)| *shared > 0)
            .collect();
        scored.sort_by(|(sa, a), (sb, b)| sb.cmp(sa).then(a.package_name.cmp(&b.package_name)));
        Ok(scored
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|(_, m)| m)
            .collect())
    }
}

#[async_trait]
impl TagRepo for MemoryStore {
    async fn tag_by_slug(&self, slug: &str) -> StoreResult<Option<Tag>> {
        let tables = self.tables.read().await;
        Ok(tables.tags.values().find(|t| t.slug == slug).cloned())
    }

    async fn tags_of(&self, metadap_id: i64) -> StoreResult<Vec<Tag>> {
        let tables = self.tables.read().await;
        let mut tags: Vec<Tag> = tables
            .metadap_tags
            .iter()
            .filter(|(m, _)| *m == metadap_id)
            .filter_map(|(_, t)| tables.tags.get(t).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn set_tags(&self, metadap_id: i64, tags: &[NewTag]) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.metadaps.contains_key(&metadap_id) {
            return Err(not_found(format!("dap {}", metadap_id)));
        }
        tables.metadap_tags.retain(|(m, _)| *m != metadap_id);
        for new in tags {
            // Tags are identified by name; slugs only need to be unique
            let existing = tables.tags.values().find(|t| t.name == new.name).map(|t| t.id);
            let tag_id = match existing {
                Some(id) => id,
                None => {
                    let slug = (0..)
                        .map(|attempt| suffixed_slug(&new.slug, attempt))
                        .find(|slug| !tables.tags.values().any(|t| &t.slug == slug))
                        .unwrap_or_else(|| new.slug.clone());
                    let id = tables.next_id();
                    tables.tags.insert(
                        id,
                        Tag {
                            id,
                            name: new.name.clone(),
                            slug,
                        },
                    );
                    id
                }
            };
            tables.metadap_tags.insert((metadap_id, tag_id));
        }
        Ok(())
    }
}

#[async_trait]
impl DapRepo for MemoryStore {
    async fn dap_by_id(&self, id: i64) -> StoreResult<Option<Dap>> {
        Ok(self.tables.read().await.daps.get(&id).cloned())
    }

    async fn dap_by_version(&self, metadap_id: i64, version: &str) -> StoreResult<Option<Dap>> {
        let tables = self.tables.read().await;
        Ok(tables
            .daps
            .values()
            .find(|d| d.metadap_id == metadap_id && d.version == version)
            .cloned())
    }

    async fn daps_of(&self, metadap_id: i64) -> StoreResult<Vec<Dap>> {
        let tables = self.tables.read().await;
        Ok(tables
            .daps
            .values()
            .filter(|d| d.metadap_id == metadap_id)
            .cloned()
            .collect())
    }

    async fn list_daps(&self, window: Window) -> StoreResult<Vec<Dap>> {
        let tables = self.tables.read().await;
        let daps = tables.daps.values().cloned().collect();
        Ok(apply_window(daps, Some(window.limit), window.offset))
    }

    async fn count_daps(&self) -> StoreResult<i64> {
        Ok(self.tables.read().await.daps.len() as i64)
    }

    async fn create_dap(&self, new: NewDap) -> StoreResult<Dap> {
        let mut tables = self.tables.write().await;
        if !tables.metadaps.contains_key(&new.metadap_id) {
            return Err(not_found(format!("dap {}", new.metadap_id)));
        }
        if tables
            .daps
            .values()
            .any(|d| d.metadap_id == new.metadap_id && d.version == new.version)
        {
            return Err(DatabaseError::Conflict(format!("version {}", new.version)));
        }
        let dap = Dap {
            id: tables.next_id(),
            metadap_id: new.metadap_id,
            version: new.version,
            license: new.license,
            summary: new.summary,
            description: new.description,
            authors: new.authors,
            homepage: new.homepage,
            bugreports: new.bugreports,
            file: new.file,
            uploaded_at: Utc::now(),
        };
        tables.daps.insert(dap.id, dap.clone());
        Ok(dap)
    }

    async fn delete_dap(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.daps.remove(&id).is_none() {
            return Err(not_found(format!("dap version {}", id)));
        }
        for metadap in tables.metadaps.values_mut() {
            if metadap.latest_id == Some(id) {
                metadap.latest_id = None;
            }
            if metadap.latest_stable_id == Some(id) {
                metadap.latest_stable_id = None;
            }
        }
        for report in tables.reports.values_mut() {
            report.versions.retain(|v| *v != id);
        }
        Ok(())
    }
}

#[async_trait]
impl ReportRepo for MemoryStore {
    async fn report_by_id(&self, id: i64) -> StoreResult<Option<Report>> {
        Ok(self.tables.read().await.reports.get(&id).cloned())
    }

    async fn reports_of(&self, metadap_id: i64, include_solved: bool) -> StoreResult<Vec<Report>> {
        let tables = self.tables.read().await;
        let mut reports: Vec<Report> = tables
            .reports
            .values()
            .filter(|r| r.metadap_id == metadap_id && (include_solved || !r.solved))
            .cloned()
            .collect();
        reports.sort_by_key(|r| (r.solved, r.id));
        Ok(reports)
    }

    async fn unsolved_report_count(&self, metadap_id: i64) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .reports
            .values()
            .filter(|r| r.metadap_id == metadap_id && !r.solved)
            .count() as i64)
    }

    async fn create_report(&self, new: NewReport) -> StoreResult<Report> {
        let mut tables = self.tables.write().await;
        if !tables.metadaps.contains_key(&new.metadap_id) {
            return Err(not_found(format!("dap {}", new.metadap_id)));
        }
        let report = Report {
            id: tables.next_id(),
            metadap_id: new.metadap_id,
            problem: new.problem.as_str().to_string(),
            reporter_id: new.reporter_id,
            email: new.email,
            message: new.message,
            solved: false,
            created_at: Utc::now(),
            versions: new.versions,
        };
        tables.reports.insert(report.id, report.clone());
        Ok(report)
    }

    async fn set_report_solved(&self, id: i64, solved: bool) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let report = tables
            .reports
            .get_mut(&id)
            .ok_or_else(|| not_found(format!("report {}", id)))?;
        report.solved = solved;
        Ok(())
    }
}

#[async_trait]
impl RankRepo for MemoryStore {
    async fn rank_of(&self, user_id: i64, metadap_id: i64) -> StoreResult<Option<Rank>> {
        let tables = self.tables.read().await;
        Ok(tables
            .ranks
            .values()
            .find(|r| r.user_id == user_id && r.metadap_id == metadap_id)
            .cloned())
    }

    async fn upsert_rank(&self, user_id: i64, metadap_id: i64, rank: i32) -> StoreResult<Rank> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .ranks
            .values_mut()
            .find(|r| r.user_id == user_id && r.metadap_id == metadap_id)
        {
            existing.rank = rank;
            return Ok(existing.clone());
        }
        let row = Rank {
            id: tables.next_id(),
            user_id,
            metadap_id,
            rank,
        };
        tables.ranks.insert(row.id, row.clone());
        Ok(row)
    }

    async fn delete_rank(&self, user_id: i64, metadap_id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.ranks.len();
        tables
            .ranks
            .retain(|_, r| !(r.user_id == user_id && r.metadap_id == metadap_id));
        Ok(tables.ranks.len() != before)
    }

    async fn refresh_rank_stats(&self, metadap_id: i64) -> StoreResult<MetaDap> {
        let mut tables = self.tables.write().await;
        tables
            .refresh_stats(metadap_id)
            .ok_or_else(|| not_found(format!("dap {}", metadap_id)))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn migrate(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryStore, User, MetaDap) {
        let store = MemoryStore::new();
        let owner = store.create_user(NewUser::named("owner")).await.unwrap();
        let metadap = store.create_metadap("foo", owner.id).await.unwrap();
        (store, owner, metadap)
    }

    fn new_dap(metadap_id: i64, version: &str) -> NewDap {
        NewDap {
            metadap_id,
            version: version.to_string(),
            license: "GPLv2+".to_string(),
            summary: "Foo".to_string(),
            description: String::new(),
            authors: vec!["Foo <foo@example.com>".to_string()],
            homepage: String::new(),
            bugreports: String::new(),
            file: format!("daps/foo-{}.dap", version),
        }
    }

    #[tokio::test]
    async fn duplicate_usernames_conflict() {
        let (store, _, _) = seeded().await;
        let err = store.create_user(NewUser::named("owner")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn deleting_metadap_cascades() {
        let (store, owner, metadap) = seeded().await;
        let dap = store.create_dap(new_dap(metadap.id, "1.0")).await.unwrap();
        store.upsert_rank(owner.id, metadap.id, 4).await.unwrap();
        store
            .create_report(NewReport {
                metadap_id: metadap.id,
                problem: crate::database::models::Problem::Spam,
                reporter_id: None,
                email: String::new(),
                message: "spam".to_string(),
                versions: vec![dap.id],
            })
            .await
            .unwrap();

        store.delete_metadap(metadap.id).await.unwrap();

        assert!(store.dap_by_id(dap.id).await.unwrap().is_none());
        assert!(store.rank_of(owner.id, metadap.id).await.unwrap().is_none());
        assert!(store.reports_of(metadap.id, true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn transfer_swaps_owner_into_comaintainers() {
        let (store, owner, metadap) = seeded().await;
        let heir = store.create_user(NewUser::named("heir")).await.unwrap();
        store.set_comaintainers(metadap.id, &[heir.id]).await.unwrap();

        let updated = store.transfer_ownership(metadap.id, heir.id).await.unwrap();

        assert_eq!(updated.user_id, heir.id);
        let comaintainers = store.comaintainers(metadap.id).await.unwrap();
        assert_eq!(comaintainers, vec![owner]);
    }

    #[tokio::test]
    async fn set_comaintainers_skips_owner() {
        let (store, owner, metadap) = seeded().await;
        store.set_comaintainers(metadap.id, &[owner.id]).await.unwrap();
        assert!(store.comaintainers(metadap.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rank_stats_follow_rows() {
        let (store, owner, metadap) = seeded().await;
        let other = store.create_user(NewUser::named("other")).await.unwrap();
        store.upsert_rank(owner.id, metadap.id, 5).await.unwrap();
        store.upsert_rank(other.id, metadap.id, 2).await.unwrap();
        store.upsert_rank(other.id, metadap.id, 3).await.unwrap();

        let stats = store.refresh_rank_stats(metadap.id).await.unwrap();
        assert_eq!(stats.rank_count, 2);
        assert!((stats.average_rank - 4.0).abs() < f64::EPSILON);

        assert!(store.delete_rank(owner.id, metadap.id).await.unwrap());
        assert!(!store.delete_rank(owner.id, metadap.id).await.unwrap());
        let stats = store.refresh_rank_stats(metadap.id).await.unwrap();
        assert_eq!(stats.rank_count, 1);
    }

    #[tokio::test]
    async fn deleting_dap_clears_latest_pointers() {
        let (store, _, mut metadap) = seeded().await;
        let dap = store.create_dap(new_dap(metadap.id, "1.0")).await.unwrap();
        metadap.latest_id = Some(dap.id);
        metadap.latest_stable_id = Some(dap.id);
        store.update_metadap(&metadap).await.unwrap();

        store.delete_dap(dap.id).await.unwrap();

        let reloaded = store.metadap_by_id(metadap.id).await.unwrap().unwrap();
        assert_eq!(reloaded.latest_id, None);
        assert_eq!(reloaded.latest_stable_id, None);
    }

    #[tokio::test]
    async fn deleting_user_keeps_their_reports_anonymous() {
        let (store, owner, metadap) = seeded().await;
        let reporter = store.create_user(NewUser::named("reporter")).await.unwrap();
        let report = store
            .create_report(NewReport {
                metadap_id: metadap.id,
                problem: crate::database::models::Problem::Other,
                reporter_id: Some(reporter.id),
                email: String::new(),
                message: "odd".to_string(),
                versions: Vec::new(),
            })
            .await
            .unwrap();

        store.delete_user(reporter.id).await.unwrap();
        let kept = store.report_by_id(report.id).await.unwrap().unwrap();
        assert_eq!(kept.reporter_id, None);

        store.delete_user(owner.id).await.unwrap();
        assert!(store.metadap_by_id(metadap.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn similar_active_orders_by_shared_tags() {
        let (store, owner, foo) = seeded().await;
        let bar = store.create_metadap("bar", owner.id).await.unwrap();
        let baz = store.create_metadap("baz", owner.id).await.unwrap();
        let tag = |name: &str| NewTag {
            name: name.to_string(),
            slug: name.to_string(),
        };
        store.set_tags(foo.id, &[tag("python"), tag("web")]).await.unwrap();
        store.set_tags(bar.id, &[tag("python")]).await.unwrap();
        store.set_tags(baz.id, &[tag("python"), tag("web")]).await.unwrap();

        let similar = store.similar_active(foo.id, 5).await.unwrap();
        let names: Vec<_> = similar.iter().map(|m| m.package_name.as_str()).collect();
        assert_eq!(names, vec!["baz", "bar"]);

        let mut inactive = baz.clone();
        inactive.active = false;
        store.update_metadap(&inactive).await.unwrap();
        let similar = store.similar_active(foo.id, 5).await.unwrap();
        assert_eq!(similar.len(), 1);
    }

    #[tokio::test]
    async fn tags_with_clashing_slugs_stay_apart() {
        let (store, owner, foo) = seeded().await;
        let bar = store.create_metadap("bar", owner.id).await.unwrap();
        let tag = |name: &str| NewTag {
            name: name.to_string(),
            slug: crate::package::slugify(name),
        };
        store.set_tags(foo.id, &[tag("c++")]).await.unwrap();
        store.set_tags(bar.id, &[tag("c")]).await.unwrap();

        let bar_tags = store.tags_of(bar.id).await.unwrap();
        assert_eq!(bar_tags.len(), 1);
        assert_eq!((bar_tags[0].name.as_str(), bar_tags[0].slug.as_str()), ("c", "c_1"));
        assert_eq!(store.tag_by_slug("c").await.unwrap().unwrap().name, "c++");

        // Reusing a name reuses the tag
        store.set_tags(foo.id, &[tag("c++"), tag("c")]).await.unwrap();
        let slugs: Vec<_> = store.tags_of(foo.id).await.unwrap().into_iter().map(|t| t.slug).collect();
        assert_eq!(slugs, vec!["c_1", "c"]);
    }
}
