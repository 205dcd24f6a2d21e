use crate::config::AppConfig;
use crate::database::models::{MetaDap, NewReport, Report, User};
use crate::database::{Store, StoreResult};
use crate::forms::report::ReportInput;
use crate::mail::{Mailer, Message};

/// Stores a report and notifies the owner and the admins. Anonymous
/// reports keep the optional e-mail; signed-in reporters are linked.
pub async fn file_report(
    store: &dyn Store,
    mailer: &dyn Mailer,
    config: &AppConfig,
    metadap: &MetaDap,
    reporter: Option<&User>,
    input: ReportInput,
) -> StoreResult<Report> {
    let report = store
        .create_report(NewReport {
            metadap_id: metadap.id,
            problem: input.problem,
            reporter_id: reporter.map(|u| u.id),
            email: if reporter.is_some() { String::new() } else { input.email },
            message: input.message,
            versions: input.versions,
        })
        .await?;
    tracing::info!(
        "Dap {} reported ({}) by {}",
        metadap.package_name,
        report.problem,
        reporter.map(|u| u.username.as_str()).unwrap_or("anonymous")
    );

    if config.mail.enabled {
        let owner = store.user_by_id(metadap.user_id).await?;
        if let Some(message) = notification(config, metadap, owner.as_ref()) {
            if let Err(e) = mailer.send(message).await {
                tracing::error!("Report notification for {} failed: {}", metadap.package_name, e);
            }
        }
    }
    Ok(report)
}

/// Mail for a new report, None when nobody would receive it
pub fn notification(config: &AppConfig, metadap: &MetaDap, owner: Option<&User>) -> Option<Message> {
    let mut to: Vec<String> = Vec::new();
    if let Some(owner) = owner.filter(|o| !o.email.is_empty()) {
        to.push(owner.email.clone());
    }
    to.extend(config.mail.admins.iter().cloned());
    if to.is_empty() {
        return None;
    }

    let link = config.absolute_url(&format!("/dap/{}/reports/", metadap.package_name));
    Some(Message {
        from: config.mail.from.clone(),
        to,
        subject: format!("Dap {} reported as evil", metadap.package_name),
        body: format!(
            "Hi, dap {} was reported as evil.\nSee {} for more information.",
            metadap.package_name, link
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{NewUser, Problem};
    use crate::database::{MemoryStore, MetaDapRepo, UserRepo};
    use crate::mail::MemoryMailer;

    fn input() -> ReportInput {
        ReportInput {
            problem: Problem::Malware,
            versions: Vec::new(),
            message: "steals cookies".into(),
            email: "anon@example.com".into(),
        }
    }

    fn mail_config() -> AppConfig {
        let mut config = AppConfig::development();
        config.mail.enabled = true;
        config.mail.admins = vec!["admin@example.com".into()];
        config
    }

    #[tokio::test]
    async fn report_mails_owner_and_admins() {
        let store = MemoryStore::new();
        let mailer = MemoryMailer::new();
        let config = mail_config();
        let owner = store
            .create_user(NewUser {
                email: "owner@example.com".into(),
                ..NewUser::named("owner")
            })
            .await
            .unwrap();
        let metadap = store.create_metadap("foo", owner.id).await.unwrap();

        let report = file_report(&store, &mailer, &config, &metadap, None, input())
            .await
            .unwrap();
        assert_eq!(report.problem, "malware");
        assert_eq!(report.email, "anon@example.com");
        assert_eq!(report.reporter_id, None);

        let outbox = mailer.outbox().await;
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].subject, "Dap foo reported as evil");
        assert_eq!(outbox[0].to, vec!["owner@example.com", "admin@example.com"]);
        assert!(outbox[0].body.contains("/dap/foo/reports/"));
    }

    #[tokio::test]
    async fn signed_in_reports_drop_the_email() {
        let store = MemoryStore::new();
        let mailer = MemoryMailer::new();
        let config = AppConfig::development();
        let owner = store.create_user(NewUser::named("owner")).await.unwrap();
        let reporter = store.create_user(NewUser::named("reporter")).await.unwrap();
        let metadap = store.create_metadap("foo", owner.id).await.unwrap();

        let report = file_report(&store, &mailer, &config, &metadap, Some(&reporter), input())
            .await
            .unwrap();
        assert_eq!(report.reporter_id, Some(reporter.id));
        assert_eq!(report.email, "");
        assert!(mailer.outbox().await.is_empty());
    }

    #[test]
    fn nobody_to_notify() {
        let config = AppConfig::development();
        let metadap = MetaDap {
            id: 1,
            package_name: "foo".into(),
            user_id: 1,
            active: true,
            latest_id: None,
            latest_stable_id: None,
            average_rank: 0.0,
            rank_count: 0,
        };
        assert!(notification(&config, &metadap, None).is_none());
    }
}
