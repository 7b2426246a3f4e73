//! Command validation
//!
//! [`check_protocol`] rejects malformed commands before any ledger read.
//! [`check`] runs the body's checker against staged state and returns the
//! ordered update list. Checkers never touch the ledger.

mod journal;
mod manuscript;
mod person;
mod settings;

use crate::address::{Address, EntityKind};
use crate::command::{Command, CommandBody};
use crate::error::{invalid, protocol, Error, Result};
use crate::model::{
    EditorState, Journal, Manuscript, ManuscriptThread, Person, PriceKind, Review, Settings,
    Volume,
};
use crate::state::{AddressState, StagedState};
use crate::update::Update;

/// Structural checks that need no state
pub fn check_protocol(command: &Command, transaction_id: &str) -> Result<()> {
    if transaction_id.is_empty() {
        return protocol("transaction id is empty");
    }
    if command.timestamp <= 0 {
        return protocol(format!("timestamp {} is not a valid time", command.timestamp));
    }
    command.signer.expect_kind(EntityKind::Person, "signer")?;
    if let Some(address) = command
        .write_addresses
        .iter()
        .find(|a| !command.read_addresses.contains(*a))
    {
        return protocol(format!("write address {address} is not declared readable"));
    }
    check_address_kinds(&command.body)?;

    let needed = command.body.declared_addresses(&command.signer);
    if let Some(address) = needed.reads.difference(&command.read_addresses).next() {
        return protocol(format!("missing declared read address {address}"));
    }
    if let Some(address) = needed.writes.difference(&command.write_addresses).next() {
        return protocol(format!("missing declared write address {address}"));
    }
    Ok(())
}

fn check_address_kinds(body: &CommandBody) -> Result<()> {
    use EntityKind as K;
    let mut expected: Vec<(&Address, EntityKind, &str)> = Vec::new();
    match body {
        CommandBody::Bootstrap { first_major, .. } => {
            expected.push((&first_major.new_person_id, K::Person, "new person"));
        }
        CommandBody::SettingsUpdate { .. } => {}
        CommandBody::PersonCreate(create) => {
            expected.push((&create.new_person_id, K::Person, "new person"));
        }
        CommandBody::PersonUpdateProperties { person_id, .. }
        | CommandBody::PersonUpdateAuthorization { person_id, .. }
        | CommandBody::PersonUpdateBalanceIncrement { person_id, .. } => {
            expected.push((person_id, K::Person, "person"));
        }
        CommandBody::JournalCreate { journal_id, .. }
        | CommandBody::JournalUpdateProperties { journal_id, .. }
        | CommandBody::JournalUpdateAuthorization { journal_id, .. }
        | CommandBody::EditorAcceptDuty { journal_id }
        | CommandBody::EditorResign { journal_id } => {
            expected.push((journal_id, K::Journal, "journal"));
        }
        CommandBody::EditorInvite {
            journal_id,
            invited_editor_id,
        } => {
            expected.push((journal_id, K::Journal, "journal"));
            expected.push((invited_editor_id, K::Person, "invited editor"));
        }
        CommandBody::VolumeCreate {
            volume_id,
            journal_id,
            ..
        } => {
            expected.push((volume_id, K::Volume, "volume"));
            expected.push((journal_id, K::Journal, "journal"));
        }
        CommandBody::ManuscriptCreate(create) => {
            expected.push((&create.manuscript_id, K::Manuscript, "manuscript"));
            expected.push((&create.thread_id, K::ManuscriptThread, "thread"));
            expected.push((&create.journal_id, K::Journal, "journal"));
            expected.extend(create.author_ids.iter().map(|a| (a, K::Person, "author")));
        }
        CommandBody::ManuscriptCreateNewVersion(version) => {
            expected.push((&version.manuscript_id, K::Manuscript, "manuscript"));
            expected.push((
                &version.previous_manuscript_id,
                K::Manuscript,
                "previous manuscript",
            ));
            expected.push((&version.thread_id, K::ManuscriptThread, "thread"));
            expected.push((&version.journal_id, K::Journal, "journal"));
            expected.extend(version.author_ids.iter().map(|a| (a, K::Person, "author")));
            expected.extend(
                version
                    .historic_author_ids
                    .iter()
                    .map(|a| (a, K::Person, "historic author")),
            );
            expected.extend(
                version
                    .thread_reference
                    .iter()
                    .map(|r| (&r.manuscript_id, K::Manuscript, "thread manuscript")),
            );
        }
        CommandBody::ManuscriptAcceptAuthorship {
            manuscript_id,
            thread_id,
            authors,
        } => {
            expected.push((manuscript_id, K::Manuscript, "manuscript"));
            expected.push((thread_id, K::ManuscriptThread, "thread"));
            expected.extend(authors.iter().map(|a| (&a.author_id, K::Person, "author")));
        }
        CommandBody::ManuscriptAllowReview {
            thread_id,
            journal_id,
            thread_reference,
        } => {
            expected.push((thread_id, K::ManuscriptThread, "thread"));
            expected.push((journal_id, K::Journal, "journal"));
            expected.extend(
                thread_reference
                    .iter()
                    .map(|r| (&r.manuscript_id, K::Manuscript, "thread manuscript")),
            );
        }
        CommandBody::WriteReview {
            review_id,
            manuscript_id,
            ..
        } => {
            expected.push((review_id, K::Review, "review"));
            expected.push((manuscript_id, K::Manuscript, "manuscript"));
        }
        CommandBody::ManuscriptJudge {
            manuscript_id,
            journal_id,
            review_ids,
            ..
        } => {
            expected.push((manuscript_id, K::Manuscript, "manuscript"));
            expected.push((journal_id, K::Journal, "journal"));
            expected.extend(review_ids.iter().map(|r| (r, K::Review, "review")));
        }
        CommandBody::ManuscriptAssign {
            manuscript_id,
            journal_id,
            volume_id,
            ..
        } => {
            expected.push((manuscript_id, K::Manuscript, "manuscript"));
            expected.push((journal_id, K::Journal, "journal"));
            expected.push((volume_id, K::Volume, "volume"));
        }
    }
    expected
        .into_iter()
        .try_for_each(|(address, kind, role)| address.expect_kind(kind, role))
}

/// Validate a command against staged state
pub fn check(command: &Command, signer_key: &str, state: &StagedState) -> Result<Vec<Update>> {
    let ctx = Check {
        command,
        signer_key,
        state,
    };
    match &command.body {
        CommandBody::Bootstrap {
            price_list,
            first_major,
        } => settings::bootstrap(&ctx, price_list, first_major),
        body => {
            ctx.settings()?;
            let signer = ctx.signer()?;
            if signer.public_key != signer_key {
                return invalid(format!(
                    "signing key does not belong to person {}",
                    command.signer
                ));
            }
            dispatch(&ctx, body)
        }
    }
}

fn dispatch(ctx: &Check<'_>, body: &CommandBody) -> Result<Vec<Update>> {
    match body {
        CommandBody::Bootstrap { .. } => invalid("ledger is already bootstrapped"),
        CommandBody::SettingsUpdate { prices } => settings::update(ctx, prices),
        CommandBody::PersonCreate(create) => person::create(ctx, create),
        CommandBody::PersonUpdateProperties { person_id, fields } => {
            person::update_properties(ctx, person_id, fields)
        }
        CommandBody::PersonUpdateAuthorization {
            person_id,
            make_major,
            make_signed,
        } => person::update_authorization(ctx, person_id, *make_major, *make_signed),
        CommandBody::PersonUpdateBalanceIncrement {
            person_id,
            increment,
        } => person::update_balance(ctx, person_id, *increment),
        CommandBody::JournalCreate { journal_id, title } => {
            journal::create(ctx, journal_id, title)
        }
        CommandBody::JournalUpdateProperties {
            journal_id,
            title,
            description_hash,
        } => journal::update_properties(ctx, journal_id, title.as_ref(), description_hash.as_ref()),
        CommandBody::JournalUpdateAuthorization {
            journal_id,
            make_signed,
        } => journal::update_authorization(ctx, journal_id, *make_signed),
        CommandBody::EditorInvite {
            journal_id,
            invited_editor_id,
        } => journal::editor_invite(ctx, journal_id, invited_editor_id),
        CommandBody::EditorAcceptDuty { journal_id } => journal::editor_accept_duty(ctx, journal_id),
        CommandBody::EditorResign { journal_id } => journal::editor_resign(ctx, journal_id),
        CommandBody::VolumeCreate {
            volume_id,
            journal_id,
            issue,
            logical_publication_time,
        } => journal::volume_create(ctx, volume_id, journal_id, issue, *logical_publication_time),
        CommandBody::ManuscriptCreate(create) => manuscript::create(ctx, create),
        CommandBody::ManuscriptCreateNewVersion(version) => {
            manuscript::create_new_version(ctx, version)
        }
        CommandBody::ManuscriptAcceptAuthorship {
            manuscript_id,
            thread_id,
            authors,
        } => manuscript::accept_authorship(ctx, manuscript_id, thread_id, authors),
        CommandBody::ManuscriptAllowReview {
            thread_id,
            journal_id,
            thread_reference,
        } => manuscript::allow_review(ctx, thread_id, journal_id, thread_reference),
        CommandBody::WriteReview {
            review_id,
            manuscript_id,
            hash,
            judgement,
        } => manuscript::write_review(ctx, review_id, manuscript_id, hash, *judgement),
        CommandBody::ManuscriptJudge {
            manuscript_id,
            journal_id,
            review_ids,
            judgement,
        } => manuscript::judge(ctx, manuscript_id, journal_id, review_ids, *judgement),
        CommandBody::ManuscriptAssign {
            manuscript_id,
            journal_id,
            volume_id,
            first_page,
            last_page,
        } => manuscript::assign(ctx, manuscript_id, journal_id, volume_id, first_page, last_page),
    }
}

/// Shared lookups and rules for checkers
struct Check<'a> {
    command: &'a Command,
    signer_key: &'a str,
    state: &'a StagedState,
}

impl<'a> Check<'a> {
    fn signer_id(&self) -> &'a Address {
        &self.command.signer
    }

    fn timestamp(&self) -> i64 {
        self.command.timestamp
    }

    fn lookup<T>(&self, address: &Address, what: &str, found: Option<&'a T>) -> Result<&'a T> {
        match self.state.classify(address) {
            AddressState::Unknown => protocol(format!("{what} {address} was not declared")),
            AddressState::Empty => invalid(format!("{what} {address} does not exist")),
            AddressState::Filled => {
                found.ok_or_else(|| Error::Internal(format!("{what} {address} filled but absent")))
            }
        }
    }

    fn require_empty(&self, address: &Address, what: &str) -> Result<()> {
        match self.state.classify(address) {
            AddressState::Unknown => protocol(format!("{what} {address} was not declared")),
            AddressState::Filled => invalid(format!("{what} {address} already exists")),
            AddressState::Empty => Ok(()),
        }
    }

    fn settings(&self) -> Result<&'a Settings> {
        let settings = Address::settings();
        match self.state.classify(&settings) {
            AddressState::Empty => invalid("ledger is not bootstrapped"),
            _ => self.lookup(&settings, "settings", self.state.settings()),
        }
    }

    fn person(&self, id: &Address) -> Result<&'a Person> {
        self.lookup(id, "person", self.state.person(id))
    }

    fn signer(&self) -> Result<&'a Person> {
        self.person(self.signer_id())
    }

    fn journal(&self, id: &Address) -> Result<&'a Journal> {
        self.lookup(id, "journal", self.state.journal(id))
    }

    fn volume(&self, id: &Address) -> Result<&'a Volume> {
        self.lookup(id, "volume", self.state.volume(id))
    }

    fn manuscript(&self, id: &Address) -> Result<&'a Manuscript> {
        self.lookup(id, "manuscript", self.state.manuscript(id))
    }

    fn thread(&self, id: &Address) -> Result<&'a ManuscriptThread> {
        self.lookup(id, "manuscript thread", self.state.thread(id))
    }

    fn review(&self, id: &Address) -> Result<&'a Review> {
        self.lookup(id, "review", self.state.review(id))
    }

    /// Price must equal the configured price exactly
    fn require_price(&self, kind: PriceKind) -> Result<()> {
        let expected = self.settings()?.price_list.price_for(kind);
        if self.command.price != expected {
            return invalid(format!(
                "price {} does not match {} = {expected}",
                self.command.price,
                kind.event_key()
            ));
        }
        Ok(())
    }

    /// Operations without a configured price must be free
    fn require_free(&self) -> Result<()> {
        if self.command.price != 0 {
            return invalid(format!(
                "price {} given for an operation without price",
                self.command.price
            ));
        }
        Ok(())
    }

    fn require_major(&self) -> Result<&'a Person> {
        let signer = self.signer()?;
        if !signer.is_major {
            return invalid(format!("{} is not a major", signer.id));
        }
        Ok(signer)
    }

    fn require_accepted_editor(&self, journal: &Journal) -> Result<()> {
        match journal.editor_state(self.signer_id()) {
            Some(EditorState::Accepted) => Ok(()),
            _ => invalid(format!(
                "{} is not an accepted editor of journal {}",
                self.signer_id(),
                journal.id
            )),
        }
    }
}

fn require_non_empty(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return invalid(format!("{what} must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandBody, PersonCreate};
    use crate::model::PriceList;

    fn bootstrap_command() -> Command {
        let signer = Address::create(EntityKind::Person);
        Command::new(
            signer.clone(),
            0,
            1_600_000_000,
            CommandBody::Bootstrap {
                price_list: PriceList::default(),
                first_major: PersonCreate {
                    new_person_id: signer,
                    public_key: "key".into(),
                    name: "Martijn".into(),
                    email: "xxx@gmail.com".into(),
                },
            },
        )
    }

    #[test]
    fn test_protocol_accepts_well_formed_command() {
        assert!(check_protocol(&bootstrap_command(), "tx").is_ok());
    }

    #[test]
    fn test_protocol_rejects_missing_basics() {
        let command = bootstrap_command();
        assert!(matches!(check_protocol(&command, ""), Err(Error::Protocol(_))));

        let mut zero_time = command.clone();
        zero_time.timestamp = 0;
        assert!(matches!(check_protocol(&zero_time, "tx"), Err(Error::Protocol(_))));

        let mut journal_signer = command.clone();
        journal_signer.signer = Address::create(EntityKind::Journal);
        assert!(matches!(check_protocol(&journal_signer, "tx"), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_protocol_rejects_undeclared_addresses() {
        let mut command = bootstrap_command();
        command.read_addresses.remove(&Address::settings());
        command.write_addresses.remove(&Address::settings());
        assert!(matches!(check_protocol(&command, "tx"), Err(Error::Protocol(_))));

        let mut write_only = bootstrap_command();
        write_only.read_addresses.remove(&Address::settings());
        assert!(matches!(check_protocol(&write_only, "tx"), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_protocol_rejects_wrong_address_kind() {
        let signer = Address::create(EntityKind::Person);
        let command = Command::new(
            signer,
            0,
            1,
            CommandBody::JournalCreate {
                journal_id: Address::create(EntityKind::Volume),
                title: "t".into(),
            },
        );
        assert!(matches!(check_protocol(&command, "tx"), Err(Error::Protocol(_))));
    }
}
