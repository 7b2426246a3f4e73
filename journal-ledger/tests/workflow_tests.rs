//! End-to-end command workflows against the in-memory ledger
//!
//! A manuscript travels from submission through co-author signing, review,
//! a second version, judgement and volume assignment.

use journal_ledger::command::{
    BoolUpdate, FieldUpdate, ManuscriptCreate, ManuscriptNewVersion, ManuscriptReference,
    PersonCreate,
};
use journal_ledger::emitter::Emission;
use journal_ledger::event::{keys, EventKind};
use journal_ledger::model::{
    Author, EditorState, Journal, Judgement, Manuscript, ManuscriptJudgement, ManuscriptStatus,
    ManuscriptThread, Person, PriceKind, PriceList, Review, Settings,
};
use journal_ledger::{
    Address, Command, CommandBody, CommandProcessor, Config, EntityKind, Error, MemoryLedger,
    Result, TransactionHeader,
};
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
        let body = CommandBody::Bootstrap {
            price_list: desk.prices.clone(),
            first_major: PersonCreate {
                new_person_id: major.clone(),
                public_key: "key-major".into(),
                name: "Martijn".into(),
                email: "xxx@gmail.com".into(),
            },
        };
        desk.submit_at_price(&major, 0, body).unwrap();
        (desk, major)
    }

    fn submit_at_price(&mut self, signer: &Address, price: i32, body: CommandBody) -> Result<Emission> {
        self.clock += 10;
        self.transactions += 1;
        let header = TransactionHeader {
            transaction_id: format!("tx-{}", self.transactions),
            signer_public_key: self.keys.get(signer).cloned().unwrap_or_default(),
            family_name: "alexandria".into(),
            family_version: "1.0".into(),
        };
        let command = Command::new(signer.clone(), price, self.clock, body);
        self.processor.process(&header, &command, &mut self.ledger)
    }

    fn submit(&mut self, signer: &Address, kind: PriceKind, body: CommandBody) -> Result<Emission> {
        let price = self.prices.price_for(kind);
        self.submit_at_price(signer, price, body)
    }

    fn person(&mut self, major: &Address, name: &str) -> Address {
        let id = Address::create(EntityKind::Person);
        let key = format!("key-{name}");
        self.keys.insert(id.clone(), key.clone());
        self.submit(
            major,
            PriceKind::MajorCreatePerson,
            CommandBody::PersonCreate(PersonCreate {
                new_person_id: id.clone(),
                public_key: key,
                name: name.into(),
                email: format!("{name}@example.org"),
            }),
        )
        .unwrap();
        id
    }

    fn record<T: serde::de::DeserializeOwned>(&self, address: &Address) -> T {
        self.ledger.record(address).unwrap().unwrap()
    }

    /// Kinds of the events published since the last call
    fn published(&mut self) -> Vec<EventKind> {
        self.ledger
            .take_events()
            .iter()
            .filter_map(|e| e.kind())
            .collect()
    }
}

#[test]
fn test_bootstrap_creates_signed_major() {
    let (desk, major) = Desk::bootstrap();
    let person: Person = desk.record(&major);
    assert!(person.is_major);
    assert!(person.is_signed);
    assert_eq!(person.balance, 0);
    assert_eq!(person.name, "Martijn");
    assert_eq!(desk.ledger.len(), 2);
}

#[test]
fn test_command_before_bootstrap_is_rejected() {
    let mut ledger = MemoryLedger::new();
    let processor = CommandProcessor::new(&Config::default()).unwrap();
    let signer = Address::create(EntityKind::Person);
    let command = Command::new(
        signer,
        0,
        1,
        CommandBody::JournalCreate {
            journal_id: Address::create(EntityKind::Journal),
            title: "Journal".into(),
        },
    );
    let header = TransactionHeader {
        transaction_id: "tx".into(),
        signer_public_key: "k".into(),
        family_name: "alexandria".into(),
        family_version: "1.0".into(),
    };
    match processor.process(&header, &command, &mut ledger) {
        Err(Error::Validation(msg)) => assert!(msg.contains("not bootstrapped")),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(ledger.events().is_empty());
}

#[test]
fn test_wrong_signing_key_is_rejected() {
    let (mut desk, major) = Desk::bootstrap();
    desk.keys.insert(major.clone(), "stolen".into());
    let result = desk.submit(
        &major,
        PriceKind::EditorCreateJournal,
        CommandBody::JournalCreate {
            journal_id: Address::create(EntityKind::Journal),
            title: "Journal".into(),
        },
    );
    assert!(matches!(result, Err(Error::Validation(_))));
}

#[test]
fn test_editor_lifecycle() {
    let (mut desk, major) = Desk::bootstrap();
    let editor = desk.person(&major, "editor");
    let colleague = desk.person(&major, "colleague");
    let journal_id = Address::create(EntityKind::Journal);

    desk.submit(
        &editor,
        PriceKind::EditorCreateJournal,
        CommandBody::JournalCreate {
            journal_id: journal_id.clone(),
            title: "Journal of Tests".into(),
        },
    )
    .unwrap();

    // colleague is not an editor yet
    assert!(matches!(
        desk.submit(
            &colleague,
            PriceKind::EditorAddColleague,
            CommandBody::EditorInvite {
                journal_id: journal_id.clone(),
                invited_editor_id: editor.clone(),
            },
        ),
        Err(Error::Validation(_))
    ));

    desk.submit(
        &editor,
        PriceKind::EditorAddColleague,
        CommandBody::EditorInvite {
            journal_id: journal_id.clone(),
            invited_editor_id: colleague.clone(),
        },
    )
    .unwrap();
    let journal: Journal = desk.record(&journal_id);
    assert_eq!(journal.editor_state(&colleague), Some(EditorState::Proposed));

    desk.submit(
        &colleague,
        PriceKind::EditorAcceptDuty,
        CommandBody::EditorAcceptDuty {
            journal_id: journal_id.clone(),
        },
    )
    .unwrap();
    let journal: Journal = desk.record(&journal_id);
    assert_eq!(journal.editor_state(&colleague), Some(EditorState::Accepted));

    desk.submit_at_price(
        &editor,
        0,
        CommandBody::EditorResign {
            journal_id: journal_id.clone(),
        },
    )
    .unwrap();
    let journal: Journal = desk.record(&journal_id);
    assert_eq!(journal.editor_state(&editor), None);
    assert_eq!(journal.editors.len(), 1);
}

#[test]
fn test_manuscript_from_submission_to_assignment() {
    let (mut desk, major) = Desk::bootstrap();
    let first_author = desk.person(&major, "alice");
    let second_author = desk.person(&major, "bob");
    let reviewer = desk.person(&major, "rita");
    let editor = desk.person(&major, "ed");

    let journal_id = Address::create(EntityKind::Journal);
    desk.submit(
        &editor,
        PriceKind::EditorCreateJournal,
        CommandBody::JournalCreate {
            journal_id: journal_id.clone(),
            title: "Journal".into(),
        },
    )
    .unwrap();
    let volume_id = Address::create(EntityKind::Volume);
    desk.submit(
        &editor,
        PriceKind::EditorCreateVolume,
        CommandBody::VolumeCreate {
            volume_id: volume_id.clone(),
            journal_id: journal_id.clone(),
            issue: "2021/1".into(),
            logical_publication_time: 1_610_000_000,
        },
    )
    .unwrap();

    // submission by the second author
    let thread_id = Address::create(EntityKind::ManuscriptThread);
    let first = Address::create(EntityKind::Manuscript);
    desk.ledger.take_events();
    let emission = desk
        .submit(
            &second_author,
            PriceKind::AuthorSubmitNewManuscript,
            CommandBody::ManuscriptCreate(ManuscriptCreate {
                manuscript_id: first.clone(),
                thread_id: thread_id.clone(),
                journal_id: journal_id.clone(),
                hash: "hash-1".into(),
                commit_msg: "first".into(),
                title: "On Testing".into(),
                author_ids: vec![first_author.clone(), second_author.clone()],
            }),
        )
        .unwrap();
    assert_eq!(emission.num_events, 4);
    let events = desk.ledger.take_events();
    assert_eq!(events[1].kind(), Some(EventKind::ManuscriptCreate));
    assert_eq!(events[2].get(keys::AUTHOR_NUMBER), Some("0"));
    assert_eq!(events[2].get(keys::DID_SIGN), Some("false"));
    assert_eq!(events[3].get(keys::AUTHOR_NUMBER), Some("1"));
    assert_eq!(events[3].get(keys::DID_SIGN), Some("true"));

    let manuscript: Manuscript = desk.record(&first);
    assert_eq!(manuscript.status, ManuscriptStatus::Init);
    let authors = manuscript.authors.clone();

    // reviewing is closed while authors are still signing
    assert!(desk
        .submit(
            &editor,
            PriceKind::EditorAllowManuscriptReview,
            CommandBody::ManuscriptAllowReview {
                thread_id: thread_id.clone(),
                journal_id: journal_id.clone(),
                thread_reference: vec![ManuscriptReference {
                    manuscript_id: first.clone(),
                    status: ManuscriptStatus::New,
                }],
            },
        )
        .is_err());

    let accept = CommandBody::ManuscriptAcceptAuthorship {
        manuscript_id: first.clone(),
        thread_id: thread_id.clone(),
        authors,
    };
    desk.submit(&first_author, PriceKind::AuthorAcceptAuthorship, accept.clone())
        .unwrap();
    let manuscript: Manuscript = desk.record(&first);
    assert_eq!(manuscript.status, ManuscriptStatus::New);
    assert!(manuscript.all_signed());
    assert!(desk
        .submit(&first_author, PriceKind::AuthorAcceptAuthorship, accept)
        .is_err());

    desk.submit(
        &editor,
        PriceKind::EditorAllowManuscriptReview,
        CommandBody::ManuscriptAllowReview {
            thread_id: thread_id.clone(),
            journal_id: journal_id.clone(),
            thread_reference: vec![ManuscriptReference {
                manuscript_id: first.clone(),
                status: ManuscriptStatus::New,
            }],
        },
    )
    .unwrap();
    let manuscript: Manuscript = desk.record(&first);
    assert_eq!(manuscript.status, ManuscriptStatus::Reviewable);
    assert!(manuscript.is_reviewable);

    // a single-author second version inherits reviewability
    let second = Address::create(EntityKind::Manuscript);
    desk.submit(
        &first_author,
        PriceKind::AuthorSubmitNewVersion,
        CommandBody::ManuscriptCreateNewVersion(ManuscriptNewVersion {
            manuscript_id: second.clone(),
            previous_manuscript_id: first.clone(),
            thread_id: thread_id.clone(),
            journal_id: journal_id.clone(),
            hash: "hash-2".into(),
            commit_msg: "address comments".into(),
            title: "On Testing, Again".into(),
            author_ids: vec![first_author.clone()],
            thread_reference: vec![ManuscriptReference {
                manuscript_id: first.clone(),
                status: ManuscriptStatus::Reviewable,
            }],
            historic_author_ids: vec![first_author.clone(), second_author.clone()],
        }),
    )
    .unwrap();
    let version: Manuscript = desk.record(&second);
    assert_eq!(version.version_number, 1);
    assert_eq!(version.status, ManuscriptStatus::Reviewable);
    let thread: ManuscriptThread = desk.record(&thread_id);
    assert_eq!(thread.manuscript_ids, vec![first.clone(), second.clone()]);

    // authors cannot review themselves
    assert!(desk
        .submit(
            &first_author,
            PriceKind::ReviewerSubmit,
            CommandBody::WriteReview {
                review_id: Address::create(EntityKind::Review),
                manuscript_id: second.clone(),
                hash: "review".into(),
                judgement: Judgement::Positive,
            },
        )
        .is_err());

    let review_id = Address::create(EntityKind::Review);
    desk.submit(
        &reviewer,
        PriceKind::ReviewerSubmit,
        CommandBody::WriteReview {
            review_id: review_id.clone(),
            manuscript_id: second.clone(),
            hash: "review".into(),
            judgement: Judgement::Positive,
        },
    )
    .unwrap();

    desk.submit(
        &editor,
        PriceKind::EditorPublishManuscript,
        CommandBody::ManuscriptJudge {
            manuscript_id: second.clone(),
            journal_id: journal_id.clone(),
            review_ids: vec![review_id.clone()],
            judgement: ManuscriptJudgement::Accepted,
        },
    )
    .unwrap();
    let review: Review = desk.record(&review_id);
    assert!(review.is_used_by_editor);

    desk.submit(
        &editor,
        PriceKind::EditorAssignManuscript,
        CommandBody::ManuscriptAssign {
            manuscript_id: second.clone(),
            journal_id: journal_id.clone(),
            volume_id: volume_id.clone(),
            first_page: "1".into(),
            last_page: "12".into(),
        },
    )
    .unwrap();
    let published: Manuscript = desk.record(&second);
    assert_eq!(published.status, ManuscriptStatus::Assigned);
    assert_eq!(published.volume_id, volume_id.to_string());
    assert_eq!(published.first_page, "1");
    assert_eq!(published.last_page, "12");
    assert!(published.modified_on > published.created_on);
}

#[test]
fn test_balance_and_authorization_updates() {
    let (mut desk, major) = Desk::bootstrap();
    let person = desk.person(&major, "carol");

    desk.submit_at_price(
        &major,
        0,
        CommandBody::PersonUpdateBalanceIncrement {
            person_id: person.clone(),
            increment: 25,
        },
    )
    .unwrap();
    assert!(desk
        .submit_at_price(
            &major,
            0,
            CommandBody::PersonUpdateBalanceIncrement {
                person_id: person.clone(),
                increment: -26,
            },
        )
        .is_err());

    desk.submit(
        &major,
        PriceKind::MajorChangePersonAuthorization,
        CommandBody::PersonUpdateAuthorization {
            person_id: person.clone(),
            make_major: Default::default(),
            make_signed: journal_ledger::command::BoolUpdate::MakeTrue,
        },
    )
    .unwrap();

    let record: Person = desk.record(&person);
    assert_eq!(record.balance, 25);
    assert!(record.is_signed);
    assert!(!record.is_major);

    // non-majors cannot move balances
    assert!(desk
        .submit_at_price(
            &person,
            0,
            CommandBody::PersonUpdateBalanceIncrement {
                person_id: person.clone(),
                increment: 1,
            },
        )
        .is_err());
}

#[test]
fn test_author_entries_follow_list_order() {
    let (mut desk, major) = Desk::bootstrap();
    let a0 = desk.person(&major, "a0");
    let a1 = desk.person(&major, "a1");
    let editor = desk.person(&major, "editor");
    let journal_id = Address::create(EntityKind::Journal);
    desk.submit(
        &editor,
        PriceKind::EditorCreateJournal,
        CommandBody::JournalCreate {
            journal_id: journal_id.clone(),
            title: "J".into(),
        },
    )
    .unwrap();

    let manuscript_id = Address::create(EntityKind::Manuscript);
    desk.submit(
        &a1,
        PriceKind::AuthorSubmitNewManuscript,
        CommandBody::ManuscriptCreate(ManuscriptCreate {
            manuscript_id: manuscript_id.clone(),
            thread_id: Address::create(EntityKind::ManuscriptThread),
            journal_id,
            hash: "h".into(),
            commit_msg: String::new(),
            title: "T".into(),
            author_ids: vec![a0.clone(), a1.clone()],
        }),
    )
    .unwrap();

    let manuscript: Manuscript = desk.record(&manuscript_id);
    assert_eq!(manuscript.status, ManuscriptStatus::Init);
    assert_eq!(
        manuscript.authors,
        vec![
            Author {
                author_id: a0,
                did_sign: false,
                author_number: 0,
            },
            Author {
                author_id: a1,
                did_sign: true,
                author_number: 1,
            },
        ]
    );
}

#[test]
fn test_settings_update() {
    let (mut desk, major) = Desk::bootstrap();
    let carol = desk.person(&major, "carol");
    let kind = PriceKind::AuthorSubmitNewManuscript;
    let change = |old: i32, new: i32| CommandBody::SettingsUpdate {
        prices: BTreeMap::from([(kind, FieldUpdate::new(old, new))]),
    };
    let before: Settings = desk.record(&Address::settings());
    assert_eq!(before.price_list.price_for(kind), 6);
    desk.published();

    // stale old value
    assert!(matches!(
        desk.submit(&major, PriceKind::MajorEditSettings, change(5, 99)),
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        desk.submit(&major, PriceKind::MajorEditSettings, change(6, -1)),
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        desk.submit(&carol, PriceKind::MajorEditSettings, change(6, 99)),
        Err(Error::Validation(_))
    ));
    assert!(desk.published().is_empty());
    assert_eq!(desk.record::<Settings>(&Address::settings()), before);

    // unchanged price
    let emission = desk
        .submit(&major, PriceKind::MajorEditSettings, change(6, 6))
        .unwrap();
    assert_eq!(emission.num_events, 1);
    assert_eq!(desk.published(), vec![EventKind::TransactionControl]);
    assert_eq!(desk.record::<Settings>(&Address::settings()), before);

    desk.submit(&major, PriceKind::MajorEditSettings, change(6, 99))
        .unwrap();
    assert_eq!(
        desk.published(),
        vec![
            EventKind::TransactionControl,
            EventKind::SettingsUpdate,
            EventKind::SettingsModificationTime,
        ]
    );
    let after: Settings = desk.record(&Address::settings());
    assert_eq!(after.price_list.price_for(kind), 99);
    assert_eq!(after.created_on, before.created_on);
    assert_eq!(after.modified_on, desk.clock);
}

#[test]
fn test_journal_property_and_authorization_updates() {
    let (mut desk, major) = Desk::bootstrap();
    let editor = desk.person(&major, "editor");
    let outsider = desk.person(&major, "outsider");
    let journal_id = Address::create(EntityKind::Journal);
    desk.submit(
        &editor,
        PriceKind::EditorCreateJournal,
        CommandBody::JournalCreate {
            journal_id: journal_id.clone(),
            title: "T1".into(),
        },
    )
    .unwrap();
    let created: Journal = desk.record(&journal_id);
    desk.published();

    let properties = |title: Option<(&str, &str)>, description: Option<(&str, &str)>| {
        CommandBody::JournalUpdateProperties {
            journal_id: journal_id.clone(),
            title: title.map(|(old, new)| FieldUpdate::new(old.to_string(), new.to_string())),
            description_hash: description
                .map(|(old, new)| FieldUpdate::new(old.to_string(), new.to_string())),
        }
    };

    for (signer, body) in [
        (&editor, properties(Some(("stale", "T2")), None)),
        (&editor, properties(Some(("T1", " ")), None)),
        (&outsider, properties(Some(("T1", "T2")), None)),
    ] {
        assert!(matches!(
            desk.submit(signer, PriceKind::EditorEditJournal, body),
            Err(Error::Validation(_))
        ));
    }
    assert!(desk.published().is_empty());
    assert_eq!(desk.record::<Journal>(&journal_id), created);

    let emission = desk
        .submit(
            &editor,
            PriceKind::EditorEditJournal,
            properties(Some(("T1", "T1")), None),
        )
        .unwrap();
    assert_eq!(emission.num_events, 1);
    assert_eq!(desk.record::<Journal>(&journal_id), created);
    desk.published();

    desk.submit(
        &editor,
        PriceKind::EditorEditJournal,
        properties(Some(("T1", "T2")), Some(("", "dh"))),
    )
    .unwrap();
    assert_eq!(
        desk.published(),
        vec![
            EventKind::TransactionControl,
            EventKind::JournalUpdate,
            EventKind::JournalUpdate,
            EventKind::JournalModificationTime,
        ]
    );
    let journal: Journal = desk.record(&journal_id);
    assert_eq!(journal.title, "T2");
    assert_eq!(journal.description_hash, "dh");
    assert_eq!(journal.modified_on, desk.clock);
    assert!(!journal.is_signed);

    // only majors sign journals
    let sign = CommandBody::JournalUpdateAuthorization {
        journal_id: journal_id.clone(),
        make_signed: BoolUpdate::MakeTrue,
    };
    assert!(matches!(
        desk.submit(&editor, PriceKind::MajorChangeJournalAuthorization, sign.clone()),
        Err(Error::Validation(_))
    ));
    desk.submit(&major, PriceKind::MajorChangeJournalAuthorization, sign.clone())
        .unwrap();
    let signed: Journal = desk.record(&journal_id);
    assert!(signed.is_signed);
    assert_eq!(signed.modified_on, desk.clock);
    assert_eq!(
        desk.published(),
        vec![
            EventKind::TransactionControl,
            EventKind::JournalUpdate,
            EventKind::JournalModificationTime,
        ]
    );

    let emission = desk
        .submit(&major, PriceKind::MajorChangeJournalAuthorization, sign)
        .unwrap();
    assert_eq!(emission.num_events, 1);
    assert_eq!(desk.record::<Journal>(&journal_id), signed);
}
