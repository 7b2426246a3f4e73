//! Write side to read model
//!
//! Commands run against the in-memory ledger; the published events are fed
//! to the consumer with every transaction reversed, and the read model is
//! checked through the queries.

use journal_ledger::command::{
    BoolUpdate, FieldUpdate, ManuscriptCreate, ManuscriptReference, PersonCreate,
};
use journal_ledger::event::BlockCommit;
use journal_ledger::model::{EditorState, ManuscriptStatus, PriceKind, PriceList};
use journal_ledger::{
    Address, Command, CommandBody, CommandProcessor, Config, EntityKind, Event, MemoryLedger,
    TransactionHeader,
};
use journal_projector::{spawn_consumer, DatabaseConfig, Outcome, Projector};
use std::collections::{BTreeMap, HashMap};

struct Desk {
    processor: CommandProcessor,
    ledger: MemoryLedger,
    prices: PriceList,
    keys: HashMap<Address, String>,
    clock: i64,
    transactions: usize,
}

impl Desk {
    fn bootstrap() -> (Self, Address) {
        let mut values = [0i32; PriceKind::COUNT];
        for (i, value) in values.iter_mut().enumerate() {
            *value = i as i32 + 1;
        }
        let mut desk = Desk {
            processor: CommandProcessor::new(&Config::default()).unwrap(),
            ledger: MemoryLedger::new(),
            prices: PriceList::from_values(values),
            keys: HashMap::new(),
            clock: 1_600_000_000,
            transactions: 0,
        };
        let major = Address::create(EntityKind::Person);
        desk.keys.insert(major.clone(), "key-major".into());
        desk.run(
            &major,
            None,
            CommandBody::Bootstrap {
                price_list: desk.prices.clone(),
                first_major: PersonCreate {
                    new_person_id: major.clone(),
                    public_key: "key-major".into(),
                    name: "Martijn".into(),
                    email: "xxx@gmail.com".into(),
                },
            },
        );
        (desk, major)
    }

    fn run(&mut self, signer: &Address, kind: Option<PriceKind>, body: CommandBody) {
        self.clock += 10;
        self.transactions += 1;
        let header = TransactionHeader {
            transaction_id: format!("tx-{}", self.transactions),
            signer_public_key: self.keys[signer].clone(),
            family_name: "alexandria".into(),
            family_version: "1.0".into(),
        };
        let price = kind.map_or(0, |kind| self.prices.price_for(kind));
        let command = Command::new(signer.clone(), price, self.clock, body);
        self.processor
            .process(&header, &command, &mut self.ledger)
            .unwrap();
    }

    fn person(&mut self, major: &Address, name: &str) -> Address {
        let id = Address::create(EntityKind::Person);
        let key = format!("key-{name}");
        self.keys.insert(id.clone(), key.clone());
        self.run(
            major,
            Some(PriceKind::MajorCreatePerson),
            CommandBody::PersonCreate(PersonCreate {
                new_person_id: id.clone(),
                public_key: key,
                name: name.into(),
                email: format!("{name}@example.org"),
            }),
        );
        id
    }
}

/// Ledger events with each transaction reversed and a block commit after it
fn scrambled(events: &[Event]) -> Vec<Event> {
    let mut out = Vec::new();
    let mut current: Vec<Event> = Vec::new();
    let mut block = 0;
    for event in events {
        let same = current
            .first()
            .map_or(true, |first| first.transaction_id().ok() == event.transaction_id().ok());
        if !same {
            out.extend(current.drain(..).rev());
            block += 1;
            out.push(
                BlockCommit {
                    block_id: format!("block-{block}"),
                    previous_block_id: format!("block-{}", block - 1),
                }
                .to_event(),
            );
        }
        current.push(event.clone());
    }
    out.extend(current.into_iter().rev());
    out
}

#[tokio::test]
async fn test_manuscript_workflow_reaches_read_model() {
    let (mut desk, major) = Desk::bootstrap();
    let alice = desk.person(&major, "alice");
    let bob = desk.person(&major, "bob");
    let ed = desk.person(&major, "ed");
    let colleague = desk.person(&major, "colleague");

    let journal_id = Address::create(EntityKind::Journal);
    desk.run(
        &ed,
        Some(PriceKind::EditorCreateJournal),
        CommandBody::JournalCreate {
            journal_id: journal_id.clone(),
            title: "Journal of Tests".into(),
        },
    );
    desk.run(
        &ed,
        Some(PriceKind::EditorAddColleague),
        CommandBody::EditorInvite {
            journal_id: journal_id.clone(),
            invited_editor_id: colleague.clone(),
        },
    );
    let volume_id = Address::create(EntityKind::Volume);
    desk.run(
        &ed,
        Some(PriceKind::EditorCreateVolume),
        CommandBody::VolumeCreate {
            volume_id: volume_id.clone(),
            journal_id: journal_id.clone(),
            issue: "2021/1".into(),
            logical_publication_time: 1_610_000_000,
        },
    );

    let thread_id = Address::create(EntityKind::ManuscriptThread);
    let manuscript_id = Address::create(EntityKind::Manuscript);
    desk.run(
        &bob,
        Some(PriceKind::AuthorSubmitNewManuscript),
        CommandBody::ManuscriptCreate(ManuscriptCreate {
            manuscript_id: manuscript_id.clone(),
            thread_id: thread_id.clone(),
            journal_id: journal_id.clone(),
            hash: "hash-1".into(),
            commit_msg: "first".into(),
            title: "On Testing".into(),
            author_ids: vec![alice.clone(), bob.clone()],
        }),
    );
    let authors = desk
        .ledger
        .record::<journal_ledger::model::Manuscript>(&manuscript_id)
        .unwrap()
        .unwrap()
        .authors;
    desk.run(
        &alice,
        Some(PriceKind::AuthorAcceptAuthorship),
        CommandBody::ManuscriptAcceptAuthorship {
            manuscript_id: manuscript_id.clone(),
            thread_id: thread_id.clone(),
            authors,
        },
    );
    desk.run(
        &ed,
        Some(PriceKind::EditorAllowManuscriptReview),
        CommandBody::ManuscriptAllowReview {
            thread_id: thread_id.clone(),
            journal_id: journal_id.clone(),
            thread_reference: vec![ManuscriptReference {
                manuscript_id: manuscript_id.clone(),
                status: ManuscriptStatus::New,
            }],
        },
    );

    let projector = Projector::connect(&DatabaseConfig::in_memory())
        .await
        .unwrap();
    let (consumer, task) = spawn_consumer(projector.clone(), 64, None);
    let mut projected = 0;
    for event in scrambled(desk.ledger.events()) {
        if let Outcome::Projected { .. } = consumer.submit(event).await.unwrap() {
            projected += 1;
        }
    }
    let status = consumer.status().await.unwrap();
    assert_eq!(projected, desk.transactions);
    assert_eq!(status.projected_transactions, desk.transactions as u64);
    assert_eq!(status.pending_transactions, 0);
    assert_eq!(
        status.last_block_id,
        Some(format!("block-{}", desk.transactions - 1))
    );
    consumer.shutdown().await.unwrap();
    task.await.unwrap();

    let major_row = projector.person_by_public_key("key-major").await.unwrap().unwrap();
    assert_eq!(major_row.id, major.to_string());
    assert!(major_row.is_major);
    assert!(major_row.is_signed);
    assert_eq!(
        projector.settings().await.unwrap().unwrap().price_list,
        desk.prices
    );

    let editors = projector.editors(journal_id.as_str()).await.unwrap();
    assert_eq!(editors.len(), 2);
    assert!(editors.windows(2).all(|w| w[0].person_id < w[1].person_id));
    let proposed = projector
        .journals_with_editor(colleague.as_str(), EditorState::Proposed)
        .await
        .unwrap();
    assert_eq!(proposed.len(), 1);
    assert_eq!(proposed[0].title, "Journal of Tests");
    assert!(projector
        .journals_with_editor(colleague.as_str(), EditorState::Accepted)
        .await
        .unwrap()
        .is_empty());

    let volumes = projector.volumes(journal_id.as_str()).await.unwrap();
    assert_eq!(volumes.len(), 1);
    assert_eq!(volumes[0].issue, "2021/1");

    let manuscript = projector
        .manuscript(manuscript_id.as_str())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(manuscript.status, ManuscriptStatus::Reviewable.as_str());
    assert!(manuscript.is_reviewable);
    assert_eq!(manuscript.version_number, 0);
    assert!(manuscript.modified_on > manuscript.created_on);
    assert_eq!(
        projector.thread(thread_id.as_str()).await.unwrap(),
        vec![manuscript.clone()]
    );

    let author_rows = projector.authors(manuscript_id.as_str()).await.unwrap();
    let ids: Vec<&str> = author_rows.iter().map(|a| a.person_id.as_str()).collect();
    assert_eq!(ids, vec![alice.as_str(), bob.as_str()]);
    assert!(author_rows.iter().all(|a| a.did_sign));
    assert!(projector
        .reviews(manuscript_id.as_str())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_journal_and_settings_updates_reach_read_model() {
    let (mut desk, major) = Desk::bootstrap();
    let ed = desk.person(&major, "ed");

    let journal_id = Address::create(EntityKind::Journal);
    desk.run(
        &ed,
        Some(PriceKind::EditorCreateJournal),
        CommandBody::JournalCreate {
            journal_id: journal_id.clone(),
            title: "T1".into(),
        },
    );
    desk.run(
        &ed,
        Some(PriceKind::EditorEditJournal),
        CommandBody::JournalUpdateProperties {
            journal_id: journal_id.clone(),
            title: Some(FieldUpdate::new("T1".to_string(), "T2".to_string())),
            description_hash: Some(FieldUpdate::new(String::new(), "dh".to_string())),
        },
    );
    desk.run(
        &major,
        Some(PriceKind::MajorChangeJournalAuthorization),
        CommandBody::JournalUpdateAuthorization {
            journal_id: journal_id.clone(),
            make_signed: BoolUpdate::MakeTrue,
        },
    );
    let signed_at = desk.clock;
    desk.run(
        &major,
        Some(PriceKind::MajorEditSettings),
        CommandBody::SettingsUpdate {
            prices: BTreeMap::from([(
                PriceKind::AuthorSubmitNewManuscript,
                FieldUpdate::new(6, 99),
            )]),
        },
    );

    let projector = Projector::connect(&DatabaseConfig::in_memory())
        .await
        .unwrap();
    let (consumer, task) = spawn_consumer(projector.clone(), 64, None);
    for event in scrambled(desk.ledger.events()) {
        consumer.submit(event).await.unwrap();
    }
    assert_eq!(
        consumer.status().await.unwrap().projected_transactions,
        desk.transactions as u64
    );
    consumer.shutdown().await.unwrap();
    task.await.unwrap();

    let journal = projector
        .journal(journal_id.as_str())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(journal.title, "T2");
    assert_eq!(journal.description_hash, "dh");
    assert!(journal.is_signed);
    assert_eq!(journal.modified_on, signed_at);
    assert!(journal.modified_on > journal.created_on);

    let settings = projector.settings().await.unwrap().unwrap();
    assert_eq!(
        settings.price_list.price_for(PriceKind::AuthorSubmitNewManuscript),
        99
    );
    assert_eq!(
        settings.price_list.price_for(PriceKind::EditorCreateJournal),
        desk.prices.price_for(PriceKind::EditorCreateJournal)
    );
    assert_eq!(settings.modified_on, desk.clock);
    assert!(settings.modified_on > settings.created_on);
}

#[tokio::test]
async fn test_file_backed_read_model_survives_reconnect() {
    let (desk, major) = Desk::bootstrap();
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig {
        url: format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("journal.db").display()
        ),
        ..DatabaseConfig::default()
    };

    let projector = Projector::connect(&config).await.unwrap();
    let (consumer, task) = spawn_consumer(projector, 8, None);
    for event in desk.ledger.events() {
        consumer.submit(event.clone()).await.unwrap();
    }
    consumer.shutdown().await.unwrap();
    task.await.unwrap();

    let reopened = Projector::connect(&config).await.unwrap();
    let person = reopened.person(major.as_str()).await.unwrap().unwrap();
    assert_eq!(person.name, "Martijn");
    assert!(reopened.settings().await.unwrap().is_some());
}
