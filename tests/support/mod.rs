#![allow(dead_code)]

use std::sync::Arc;

use lectern::application::context::Services;
use lectern::domain::entities::{ClientRecord, DealRecord, SpeakerRecord};
use lectern::infra::db::PostgresRepositories;
use lectern_api_types::{ClientCreateRequest, DealCreateRequest, SpeakerCreateRequest};
use sqlx::PgPool;
use url::Url;

pub const ACTOR: &str = "tester";

pub fn services(pool: PgPool) -> Services {
    let repos = Arc::new(PostgresRepositories::new(pool));
    Services::build(
        repos.clone(),
        repos,
        Url::parse("https://lectern.test/").expect("static url"),
    )
}

pub async fn client(services: &Services, email: &str) -> ClientRecord {
    services
        .clients
        .create(
            ACTOR,
            ClientCreateRequest {
                name: "Acme Events".into(),
                email: email.into(),
                company: Some("Acme".into()),
                phone: None,
                notes: String::new(),
            },
        )
        .await
        .expect("create client")
}

pub async fn speaker(services: &Services, name: &str) -> SpeakerRecord {
    services
        .speakers
        .create(
            ACTOR,
            SpeakerCreateRequest {
                name: name.into(),
                email: None,
                headline: "Keynote speaker".into(),
                bio: String::new(),
                topics: vec!["leadership".into()],
                location: Some("Lisbon".into()),
                fee_min_cents: Some(500_000),
                fee_max_cents: Some(900_000),
                active: true,
            },
        )
        .await
        .expect("create speaker")
}

pub async fn deal(
    services: &Services,
    client: &ClientRecord,
    speaker: Option<&SpeakerRecord>,
) -> DealRecord {
    services
        .deals
        .create(
            ACTOR,
            DealCreateRequest {
                client_id: client.id,
                speaker_id: speaker.map(|speaker| speaker.id),
                event_name: "Annual Summit".into(),
                event_date: None,
                event_location: Some("Porto".into()),
                value_cents: 750_000,
                currency: "EUR".into(),
                notes: String::new(),
            },
        )
        .await
        .expect("create deal")
}
