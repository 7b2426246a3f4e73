//! Projection of hand-built event streams
//!
//! - Bootstrap: settings and the first person appear after one transaction
//! - Arrival order: every permutation of a transaction yields the same rows,
//!   wherever the control event sits in the sequence
//! - Atomicity: a failing statement leaves no rows of its transaction

use journal_ledger::event::{keys, EventKind, TransactionControl};
use journal_ledger::model::{PriceKind, PriceList};
use journal_ledger::Event;
use journal_projector::queries::{PersonRow, SettingsRow};
use journal_projector::{
    spawn_consumer, DatabaseConfig, Error, Outcome, Projector, ReassemblyBuffer,
};
use proptest::prelude::*;

const TIMESTAMP: i64 = 1_600_000_000;

fn control(tx: &str, num_events: u32) -> Event {
    control_at(tx, 0, num_events)
}

fn control_at(tx: &str, event_seq: u32, num_events: u32) -> Event {
    TransactionControl {
        transaction_id: tx.to_string(),
        event_seq,
        num_events,
    }
    .to_event()
}

fn data(kind: EventKind, tx: &str, seq: u32) -> Event {
    Event::new(kind)
        .with(keys::TRANSACTION_ID, tx)
        .with(keys::EVENT_SEQ, seq)
        .with(keys::TIMESTAMP, TIMESTAMP)
}

fn settings_create(tx: &str, seq: u32) -> Event {
    PriceKind::ALL
        .iter()
        .fold(data(EventKind::SettingsCreate, tx, seq), |event, kind| {
            event.with(kind.event_key(), kind.index() + 1)
        })
}

fn person_create(tx: &str, seq: u32, id: &str) -> Event {
    data(EventKind::PersonCreate, tx, seq)
        .with(keys::ID, id)
        .with("name", "Martijn")
        .with("email", "xxx@gmail.com")
}

/// The bootstrap transaction as the ledger would publish it
fn bootstrap(tx: &str) -> Vec<Event> {
    bootstrap_with_control_at(tx, 0)
}

/// Bootstrap with the control event at `control_seq` and data events
/// taking the remaining sequence numbers
fn bootstrap_with_control_at(tx: &str, control_seq: u32) -> Vec<Event> {
    let mut data_seqs = (0..3).filter(|seq| *seq != control_seq);
    let settings_seq = data_seqs.next().unwrap();
    let person_seq = data_seqs.next().unwrap();
    vec![
        control_at(tx, control_seq, 3),
        settings_create(tx, settings_seq),
        person_create(tx, person_seq, "martijn"),
    ]
}

async fn projector() -> Projector {
    Projector::connect(&DatabaseConfig::in_memory()).await.unwrap()
}

async fn project_all(events: Vec<Event>) -> (Projector, usize) {
    let projector = projector().await;
    let mut buffer = ReassemblyBuffer::new();
    let mut committed = 0;
    for event in events {
        if let Some(completed) = buffer.push(event).unwrap() {
            projector.apply(&completed).await.unwrap();
            committed += 1;
        }
    }
    assert_eq!(buffer.pending_transactions(), 0);
    (projector, committed)
}

async fn snapshot(projector: &Projector) -> (Option<SettingsRow>, Option<PersonRow>) {
    (
        projector.settings().await.unwrap(),
        projector.person("martijn").await.unwrap(),
    )
}

#[tokio::test]
async fn test_bootstrap_projection() {
    let (projector, committed) = project_all(bootstrap("tx-1")).await;
    assert_eq!(committed, 1);

    let settings = projector.settings().await.unwrap().unwrap();
    let expected: Vec<i32> = (1..=18).collect();
    let prices: Vec<i32> = settings.price_list.iter().map(|(_, price)| price).collect();
    assert_eq!(prices, expected);
    assert_eq!(settings.created_on, TIMESTAMP);

    let person = projector.person("martijn").await.unwrap().unwrap();
    assert_eq!(person.name, "Martijn");
    assert_eq!(person.email, "xxx@gmail.com");
    assert!(!person.is_major);
    assert!(!person.is_signed);
    assert_eq!(person.balance, 0);
    assert_eq!(person.created_on, person.modified_on);
}

#[tokio::test]
async fn test_arrival_orders_converge() {
    let events = bootstrap("tx-1");
    let (reference, _) = project_all(events.clone()).await;
    let expected = snapshot(&reference).await;
    assert!(expected.0.is_some());

    let orders: [[usize; 3]; 3] = [[0, 1, 2], [1, 2, 0], [2, 0, 1]];
    for order in orders {
        let shuffled = order.iter().map(|&i| events[i].clone()).collect();
        let (projector, committed) = project_all(shuffled).await;
        assert_eq!(committed, 1);
        assert_eq!(snapshot(&projector).await, expected, "order {order:?}");
    }
}

#[tokio::test]
async fn test_control_event_may_take_any_seq() {
    let (reference, _) = project_all(bootstrap("tx-1")).await;
    let expected = snapshot(&reference).await;

    for control_seq in [1, 2] {
        let events = bootstrap_with_control_at("tx-1", control_seq);
        let orders: [[usize; 3]; 3] = [[0, 1, 2], [1, 2, 0], [2, 1, 0]];
        for order in orders {
            let shuffled = order.iter().map(|&i| events[i].clone()).collect();
            let (projector, committed) = project_all(shuffled).await;
            assert_eq!(committed, 1);
            assert_eq!(
                snapshot(&projector).await,
                expected,
                "control at {control_seq}, order {order:?}"
            );
        }
    }

    // the control event's seq still counts against numEvents
    let mut buffer = ReassemblyBuffer::new();
    buffer.push(settings_create("tx-1", 0)).unwrap();
    assert!(matches!(
        buffer.push(control_at("tx-1", 3, 3)),
        Err(Error::Reassembly { .. })
    ));
}

#[tokio::test]
async fn test_failed_statement_rolls_back_transaction() {
    let events = vec![
        control("tx-1", 3),
        person_create("tx-1", 1, "martijn"),
        // no such person
        data(EventKind::PersonModificationTime, "tx-1", 2).with(keys::ID, "ghost"),
    ];
    let projector = projector().await;
    let mut buffer = ReassemblyBuffer::new();
    let mut result = Ok(0);
    for event in events {
        if let Some(completed) = buffer.push(event).unwrap() {
            result = projector.apply(&completed).await;
        }
    }
    assert!(matches!(result, Err(Error::MalformedEvent(_))));
    assert_eq!(projector.person("martijn").await.unwrap(), None);
}

#[tokio::test]
async fn test_unknown_event_type_fails_projection() {
    let mut foreign = data(EventKind::PersonCreate, "tx-1", 1).with(keys::ID, "p");
    foreign.event_type = "alexandria/evMystery".into();

    let projector = projector().await;
    let (consumer, _task) = spawn_consumer(projector, 8, None);
    assert_eq!(consumer.submit(control("tx-1", 2)).await.unwrap(), Outcome::Buffered);
    assert!(matches!(
        consumer.submit(foreign).await,
        Err(Error::MalformedEvent(_))
    ));
    let status = consumer.status().await.unwrap();
    assert!(status.is_halted());
}

#[tokio::test]
async fn test_updates_follow_creates_across_transactions() {
    let mut events = bootstrap("tx-1");
    events.extend([
        control("tx-2", 3),
        data(EventKind::PersonUpdate, "tx-2", 1)
            .with(keys::ID, "martijn")
            .with("postalCode", "1234 AB"),
        data(EventKind::PersonModificationTime, "tx-2", 2).with(keys::ID, "martijn"),
    ]);
    events.extend([
        control("tx-3", 2),
        data(EventKind::SettingsUpdate, "tx-3", 1).with("priceEditorAcceptDuty", 99),
    ]);

    let (projector, committed) = project_all(events).await;
    assert_eq!(committed, 3);
    let person = projector.person("martijn").await.unwrap().unwrap();
    assert_eq!(person.postal_code, "1234 AB");
    let settings = projector.settings().await.unwrap().unwrap();
    assert_eq!(settings.price_list.price_for(PriceKind::EditorAcceptDuty), 99);
    assert_ne!(settings.price_list, PriceList::default());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_shuffled_transactions_converge(
        order in Just((0..6usize).collect::<Vec<_>>()).prop_shuffle(),
        first_control in 0u32..3,
        second_control in 0u32..3,
    ) {
        let mut events = bootstrap_with_control_at("tx-1", first_control);
        let mut data_seqs = (0..3u32).filter(|seq| *seq != second_control);
        let update_seq = data_seqs.next().unwrap();
        let bump_seq = data_seqs.next().unwrap();
        events.extend([
            control_at("tx-2", second_control, 3),
            data(EventKind::PersonUpdate, "tx-2", update_seq)
                .with(keys::ID, "martijn")
                .with(keys::IS_MAJOR, true),
            data(EventKind::PersonModificationTime, "tx-2", bump_seq).with(keys::ID, "martijn"),
        ]);
        // tx-2 updates rows created by tx-1, so transactions keep their order
        let (first, second) = events.split_at(3);
        let shuffled: Vec<Event> = order
            .iter()
            .filter(|&&i| i < 3)
            .map(|&i| first[i].clone())
            .chain(order.iter().filter(|&&i| i >= 3).map(|&i| second[i - 3].clone()))
            .collect();

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (person, committed) = runtime.block_on(async {
            let (projector, committed) = project_all(shuffled).await;
            (projector.person("martijn").await.unwrap(), committed)
        });
        prop_assert_eq!(committed, 2);
        let person = person.unwrap();
        prop_assert!(person.is_major);
        prop_assert!(!person.is_signed);
        prop_assert_eq!(person.name, "Martijn");
    }
}
