use super::{require_non_empty, Check};
use crate::address::Address;
use crate::command::{BoolUpdate, FieldUpdate};
use crate::error::{invalid, Result};
use crate::model::{EditorState, JournalField, PriceKind, Timestamp, Volume};
use crate::update::Update;

pub(super) fn create(ctx: &Check<'_>, journal_id: &Address, title: &str) -> Result<Vec<Update>> {
    ctx.require_price(PriceKind::EditorCreateJournal)?;
    ctx.require_empty(journal_id, "journal")?;
    require_non_empty(title, "title")?;
    Ok(vec![
        Update::JournalCreate {
            journal_id: journal_id.clone(),
            title: title.to_string(),
        },
        Update::EditorCreate {
            journal_id: journal_id.clone(),
            editor_id: ctx.signer_id().clone(),
            state: EditorState::Accepted,
        },
    ])
}

pub(super) fn update_properties(
    ctx: &Check<'_>,
    journal_id: &Address,
    title: Option<&FieldUpdate<String>>,
    description_hash: Option<&FieldUpdate<String>>,
) -> Result<Vec<Update>> {
    ctx.require_price(PriceKind::EditorEditJournal)?;
    let journal = ctx.journal(journal_id)?;
    ctx.require_accepted_editor(journal)?;
    if let Some(title) = title {
        require_non_empty(&title.new, "title")?;
    }

    let mut updates = Vec::new();
    for (field, change) in [
        (JournalField::Title, title),
        (JournalField::DescriptionHash, description_hash),
    ] {
        let Some(change) = change else { continue };
        if journal.field(field) != change.old {
            return invalid(format!(
                "journal {} changed concurrently: expected {:?}, found {:?}",
                field.event_key(),
                change.old,
                journal.field(field)
            ));
        }
        if change.is_change() {
            updates.push(Update::JournalProperty {
                journal_id: journal_id.clone(),
                field,
                value: change.new.clone(),
            });
        }
    }
    Ok(updates)
}

pub(super) fn update_authorization(
    ctx: &Check<'_>,
    journal_id: &Address,
    make_signed: BoolUpdate,
) -> Result<Vec<Update>> {
    ctx.require_price(PriceKind::MajorChangeJournalAuthorization)?;
    ctx.require_major()?;
    let journal = ctx.journal(journal_id)?;
    let is_signed = make_signed.apply(journal.is_signed);
    if is_signed == journal.is_signed {
        return Ok(Vec::new());
    }
    Ok(vec![Update::JournalSigned {
        journal_id: journal_id.clone(),
        is_signed,
    }])
}

pub(super) fn editor_invite(
    ctx: &Check<'_>,
    journal_id: &Address,
    invited: &Address,
) -> Result<Vec<Update>> {
    ctx.require_price(PriceKind::EditorAddColleague)?;
    let journal = ctx.journal(journal_id)?;
    ctx.require_accepted_editor(journal)?;
    if let Some(state) = journal.editor_state(invited) {
        return invalid(format!("{invited} is already a {state} editor of {journal_id}"));
    }
    Ok(vec![Update::EditorCreate {
        journal_id: journal_id.clone(),
        editor_id: invited.clone(),
        state: EditorState::Proposed,
    }])
}

pub(super) fn editor_accept_duty(ctx: &Check<'_>, journal_id: &Address) -> Result<Vec<Update>> {
    ctx.require_price(PriceKind::EditorAcceptDuty)?;
    let journal = ctx.journal(journal_id)?;
    match journal.editor_state(ctx.signer_id()) {
        Some(EditorState::Proposed) => Ok(vec![Update::EditorAcceptDuty {
            journal_id: journal_id.clone(),
            editor_id: ctx.signer_id().clone(),
        }]),
        Some(EditorState::Accepted) => invalid("editor duty was already accepted"),
        None => invalid(format!("{} was not invited to {journal_id}", ctx.signer_id())),
    }
}

pub(super) fn editor_resign(ctx: &Check<'_>, journal_id: &Address) -> Result<Vec<Update>> {
    ctx.require_free()?;
    let journal = ctx.journal(journal_id)?;
    if journal.editor_state(ctx.signer_id()).is_none() {
        return invalid(format!("{} is not an editor of {journal_id}", ctx.signer_id()));
    }
    Ok(vec![Update::EditorDelete {
        journal_id: journal_id.clone(),
        editor_id: ctx.signer_id().clone(),
    }])
}

pub(super) fn volume_create(
    ctx: &Check<'_>,
    volume_id: &Address,
    journal_id: &Address,
    issue: &str,
    logical_publication_time: Timestamp,
) -> Result<Vec<Update>> {
    ctx.require_price(PriceKind::EditorCreateVolume)?;
    let journal = ctx.journal(journal_id)?;
    ctx.require_accepted_editor(journal)?;
    ctx.require_empty(volume_id, "volume")?;
    require_non_empty(issue, "issue")?;
    Ok(vec![Update::VolumeCreate {
        volume: Volume {
            id: volume_id.clone(),
            created_on: ctx.timestamp(),
            journal_id: journal_id.clone(),
            issue: issue.to_string(),
            logical_publication_time,
        },
    }])
}
