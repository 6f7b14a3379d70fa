mod support;

use lectern::application::admin::analytics::DateRange;
use lectern::application::admin::clients::AdminClientError;
use lectern::application::pagination::{DueCursor, PageRequest, TimeCursor};
use lectern::application::portal::PortalError;
use lectern::application::repos::{ActivityQueryFilter, DealQueryFilter, TaskQueryFilter};
use lectern::domain::types::{DealStage, TaskPriority, TaskStatus};
use lectern_api_types::{ContractCreateRequest, ContractSendRequest, SpeakerProfilePatch, TaskCreateRequest};
use sqlx::PgPool;
use time::macros::date;
use time::{Date, OffsetDateTime};

use support::{ACTOR, client, deal, services, speaker};

fn task(title: &str, due_on: Option<Date>) -> TaskCreateRequest {
    TaskCreateRequest {
        title: title.into(),
        description: String::new(),
        priority: Some(TaskPriority::High),
        due_on,
        assignee: Some("sam".into()),
        deal_id: None,
        client_id: None,
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn client_with_deals_cannot_be_deleted(pool: PgPool) {
    let services = services(pool);
    let client = client(&services, "buyer@acme.test").await;
    deal(&services, &client, None).await;

    let err = services.clients.delete(ACTOR, client.id).await.unwrap_err();
    assert!(matches!(err, AdminClientError::InUse { count: 1 }));
}

#[sqlx::test(migrations = "./migrations")]
async fn closing_and_reopening_a_deal_tracks_closed_at(pool: PgPool) {
    let services = services(pool);
    let client = client(&services, "buyer@acme.test").await;
    let deal = deal(&services, &client, None).await;
    assert_eq!(deal.stage, DealStage::Lead);

    let lost = services
        .deals
        .change_stage(ACTOR, deal.id, DealStage::Lost)
        .await
        .unwrap();
    assert!(lost.closed_at.is_some());

    let reopened = services
        .deals
        .change_stage(ACTOR, deal.id, DealStage::Lead)
        .await
        .unwrap();
    assert!(reopened.closed_at.is_none());
    assert!(
        services
            .deals
            .change_stage(ACTOR, deal.id, DealStage::Lead)
            .await
            .is_err(),
        "same-stage moves are rejected"
    );

    let filter = DealQueryFilter {
        stage: Some(DealStage::Lead),
        ..Default::default()
    };
    let page = services
        .deals
        .list(&filter, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn tasks_page_by_due_date_with_undated_last(pool: PgPool) {
    let services = services(pool);
    let later = services
        .tasks
        .create(ACTOR, task("later", Some(date!(2030 - 01 - 02))))
        .await
        .unwrap();
    let undated = services.tasks.create(ACTOR, task("someday", None)).await.unwrap();
    let sooner = services
        .tasks
        .create(ACTOR, task("sooner", Some(date!(2030 - 01 - 01))))
        .await
        .unwrap();

    let filter = TaskQueryFilter::default();
    let first = services
        .tasks
        .list(&filter, PageRequest::new(2, None))
        .await
        .unwrap();
    let ids: Vec<_> = first.items.iter().map(|task| task.id).collect();
    assert_eq!(ids, vec![sooner.id, later.id]);

    let cursor = DueCursor::decode(first.next_cursor.as_deref().expect("more rows")).unwrap();
    let second = services
        .tasks
        .list(&filter, PageRequest::new(2, Some(cursor)))
        .await
        .unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].id, undated.id);
    assert!(second.next_cursor.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn overdue_filter_skips_done_tasks(pool: PgPool) {
    let services = services(pool);
    let stale = services
        .tasks
        .create(ACTOR, task("stale", Some(date!(2020 - 01 - 01))))
        .await
        .unwrap();
    let finished = services
        .tasks
        .create(ACTOR, task("finished", Some(date!(2020 - 01 - 01))))
        .await
        .unwrap();
    services
        .tasks
        .set_status(ACTOR, finished.id, TaskStatus::Done)
        .await
        .unwrap();

    let filter = TaskQueryFilter {
        overdue_before: Some(OffsetDateTime::now_utc().date()),
        ..Default::default()
    };
    let page = services
        .tasks
        .list(&filter, PageRequest::default())
        .await
        .unwrap();
    let ids: Vec<_> = page.items.iter().map(|task| task.id).collect();
    assert_eq!(ids, vec![stale.id]);
}

#[sqlx::test(migrations = "./migrations")]
async fn client_portal_lists_only_sent_contracts(pool: PgPool) {
    let services = services(pool);
    let client = client(&services, "buyer@acme.test").await;
    let speaker = speaker(&services, "Ada Lovelace").await;
    let deal = deal(&services, &client, Some(&speaker)).await;
    let request = ContractCreateRequest {
        deal_id: deal.id,
        fee_cents: None,
        currency: None,
        terms: String::new(),
    };
    let hidden = services.contracts.create(ACTOR, request.clone()).await.unwrap();
    let shown = services.contracts.create(ACTOR, request).await.unwrap();
    services
        .contracts
        .send(ACTOR, shown.id, ContractSendRequest::default())
        .await
        .unwrap();

    let portal = services
        .portal
        .client_portal(&client.portal_token)
        .await
        .unwrap();
    assert_eq!(portal.deals.len(), 1);
    assert_eq!(portal.contracts.len(), 1);
    assert_eq!(portal.contracts[0].id, shown.id);
    assert_ne!(portal.contracts[0].id, hidden.id);
    assert!(
        portal.contracts[0]
            .viewer_url
            .starts_with("https://lectern.test/contracts/view/")
    );

    let rotated = services
        .clients
        .rotate_portal_token(ACTOR, client.id)
        .await
        .unwrap();
    assert!(matches!(
        services.portal.client_portal(&client.portal_token).await,
        Err(PortalError::NotFound)
    ));
    assert!(services.portal.client_portal(&rotated.portal_token).await.is_ok());
}

#[sqlx::test(migrations = "./migrations")]
async fn speaker_profile_patch_touches_only_given_fields(pool: PgPool) {
    let services = services(pool);
    let speaker = speaker(&services, "Ada Lovelace").await;

    let updated = services
        .portal
        .update_speaker_profile(
            &speaker.portal_token,
            SpeakerProfilePatch {
                headline: Some("Futurist".into()),
                bio: None,
                topics: Some(vec!["ai".into(), "ethics".into()]),
                location: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.headline, "Futurist");
    assert_eq!(updated.topics, vec!["ai".to_string(), "ethics".to_string()]);
    assert_eq!(updated.location.as_deref(), Some("Lisbon"));

    services
        .speakers
        .set_active(ACTOR, speaker.id, false)
        .await
        .unwrap();
    assert!(matches!(
        services.portal.speaker_portal(&speaker.portal_token).await,
        Err(PortalError::NotFound)
    ));
}

#[sqlx::test(migrations = "./migrations")]
async fn analytics_counts_pipeline_and_wins(pool: PgPool) {
    let services = services(pool);
    let client = client(&services, "buyer@acme.test").await;
    let open = deal(&services, &client, None).await;
    let won = deal(&services, &client, None).await;
    services
        .deals
        .change_stage(ACTOR, won.id, DealStage::Won)
        .await
        .unwrap();

    let today = OffsetDateTime::now_utc().date();
    let range = DateRange::resolve(None, None, today).unwrap();
    let summary = services.analytics.summary(range, today).await.unwrap();

    assert_eq!(summary.deals.open_pipeline_cents, open.value_cents);
    assert_eq!(summary.deals.won_count, 1);
    assert_eq!(summary.deals.won_cents, won.value_cents);
    assert_eq!(summary.deals.win_rate, Some(1.0));
    assert!(!summary.recent_activity.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn activity_log_filters_by_entity_type(pool: PgPool) {
    let services = services(pool);
    let client = client(&services, "buyer@acme.test").await;
    speaker(&services, "Ada Lovelace").await;
    deal(&services, &client, None).await;

    let filter = ActivityQueryFilter {
        entity_type: Some("deal".into()),
        ..Default::default()
    };
    let page = services
        .activity
        .list_filtered(PageRequest::<TimeCursor>::default(), &filter)
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].action, "deal.create");
    assert_eq!(page.items[0].actor, ACTOR);
}
