use super::{require_non_empty, Check};
use crate::address::Address;
use crate::command::{ManuscriptCreate, ManuscriptNewVersion, ManuscriptReference};
use crate::error::{invalid, Error, Result};
use crate::model::{
    Author, Judgement, Manuscript, ManuscriptField, ManuscriptJudgement, ManuscriptStatus,
    ManuscriptThread, PriceKind, Review,
};
use crate::update::Update;
use std::collections::{BTreeSet, HashSet};

/// Authors must be non-empty, distinct, existing persons and include the signer
fn check_authors(ctx: &Check<'_>, author_ids: &[Address]) -> Result<()> {
    if author_ids.is_empty() {
        return invalid("a manuscript needs at least one author");
    }
    let mut seen = HashSet::new();
    for id in author_ids {
        if !seen.insert(id) {
            return invalid(format!("author {id} is listed twice"));
        }
        ctx.person(id)?;
    }
    if !seen.contains(ctx.signer_id()) {
        return invalid("the submitter must be one of the authors");
    }
    Ok(())
}

/// Initial author entries; only the signer has signed
fn initial_authors(ctx: &Check<'_>, manuscript_id: &Address, author_ids: &[Address]) -> Vec<Update> {
    (0i32..)
        .zip(author_ids)
        .map(|(author_number, id)| Update::AuthorCreate {
            manuscript_id: manuscript_id.clone(),
            author: Author {
                author_id: id.clone(),
                did_sign: id == ctx.signer_id(),
                author_number,
            },
        })
        .collect()
}

fn initial_status(author_count: usize, thread_is_reviewable: bool) -> ManuscriptStatus {
    if author_count == 1 {
        ManuscriptStatus::after_signing(thread_is_reviewable)
    } else {
        ManuscriptStatus::Init
    }
}

/// The client's view of the thread must equal current state
fn check_thread_reference<'a>(
    ctx: &Check<'a>,
    thread: &ManuscriptThread,
    reference: &[ManuscriptReference],
) -> Result<Vec<&'a Manuscript>> {
    let referenced: Vec<&Address> = reference.iter().map(|r| &r.manuscript_id).collect();
    let actual: Vec<&Address> = thread.manuscript_ids.iter().collect();
    if referenced != actual {
        return invalid(format!("manuscripts of thread {} changed", thread.id));
    }
    let mut members = Vec::with_capacity(reference.len());
    for item in reference {
        let manuscript = ctx.manuscript(&item.manuscript_id)?;
        if manuscript.status != item.status {
            return invalid(format!(
                "manuscript {} is {}, expected {}",
                manuscript.id, manuscript.status, item.status
            ));
        }
        members.push(manuscript);
    }
    Ok(members)
}

pub(super) fn create(ctx: &Check<'_>, create: &ManuscriptCreate) -> Result<Vec<Update>> {
    ctx.require_price(PriceKind::AuthorSubmitNewManuscript)?;
    require_non_empty(&create.hash, "hash")?;
    require_non_empty(&create.title, "title")?;
    check_authors(ctx, &create.author_ids)?;
    ctx.journal(&create.journal_id)?;
    ctx.require_empty(&create.manuscript_id, "manuscript")?;
    ctx.require_empty(&create.thread_id, "manuscript thread")?;

    let manuscript = Manuscript {
        id: create.manuscript_id.clone(),
        created_on: ctx.timestamp(),
        modified_on: ctx.timestamp(),
        hash: create.hash.clone(),
        thread_id: create.thread_id.clone(),
        version_number: 0,
        commit_msg: create.commit_msg.clone(),
        title: create.title.clone(),
        authors: Vec::new(),
        status: initial_status(create.author_ids.len(), false),
        journal_id: create.journal_id.clone(),
        volume_id: String::new(),
        first_page: String::new(),
        last_page: String::new(),
        is_reviewable: false,
    };
    let mut updates = vec![Update::ManuscriptCreate {
        manuscript,
        opens_thread: true,
    }];
    updates.extend(initial_authors(ctx, &create.manuscript_id, &create.author_ids));
    Ok(updates)
}

pub(super) fn create_new_version(
    ctx: &Check<'_>,
    version: &ManuscriptNewVersion,
) -> Result<Vec<Update>> {
    ctx.require_price(PriceKind::AuthorSubmitNewVersion)?;
    require_non_empty(&version.commit_msg, "commit message")?;
    require_non_empty(&version.hash, "hash")?;
    require_non_empty(&version.title, "title")?;
    check_authors(ctx, &version.author_ids)?;
    ctx.journal(&version.journal_id)?;
    ctx.require_empty(&version.manuscript_id, "manuscript")?;

    let previous = ctx.manuscript(&version.previous_manuscript_id)?;
    if previous.thread_id != version.thread_id {
        return invalid(format!(
            "manuscript {} does not belong to thread {}",
            previous.id, version.thread_id
        ));
    }
    if previous.journal_id != version.journal_id {
        return invalid(format!(
            "manuscript {} does not belong to journal {}",
            previous.id, version.journal_id
        ));
    }
    let thread = ctx.thread(&version.thread_id)?;
    if thread.manuscript_ids.last() != Some(&previous.id) {
        return invalid(format!("manuscript {} is not the latest version", previous.id));
    }
    let members = check_thread_reference(ctx, thread, &version.thread_reference)?;

    let signed: BTreeSet<&Address> = members
        .iter()
        .flat_map(|m| m.authors.iter())
        .filter(|a| a.did_sign)
        .map(|a| &a.author_id)
        .collect();
    let claimed: BTreeSet<&Address> = version.historic_author_ids.iter().collect();
    if signed != claimed {
        return invalid(format!("historic authors of thread {} changed", thread.id));
    }
    if !signed.contains(ctx.signer_id()) {
        return invalid("only an author of an earlier version may submit a new version");
    }

    let version_number = i32::try_from(thread.manuscript_ids.len())
        .map_err(|_| Error::Validation("thread has too many versions".into()))?;
    let manuscript = Manuscript {
        id: version.manuscript_id.clone(),
        created_on: ctx.timestamp(),
        modified_on: ctx.timestamp(),
        hash: version.hash.clone(),
        thread_id: version.thread_id.clone(),
        version_number,
        commit_msg: version.commit_msg.clone(),
        title: version.title.clone(),
        authors: Vec::new(),
        status: initial_status(version.author_ids.len(), thread.is_reviewable),
        journal_id: version.journal_id.clone(),
        volume_id: String::new(),
        first_page: String::new(),
        last_page: String::new(),
        is_reviewable: thread.is_reviewable,
    };
    let mut updates = vec![Update::ManuscriptCreate {
        manuscript,
        opens_thread: false,
    }];
    updates.extend(initial_authors(ctx, &version.manuscript_id, &version.author_ids));
    Ok(updates)
}

pub(super) fn accept_authorship(
    ctx: &Check<'_>,
    manuscript_id: &Address,
    thread_id: &Address,
    authors: &[Author],
) -> Result<Vec<Update>> {
    ctx.require_price(PriceKind::AuthorAcceptAuthorship)?;
    let manuscript = ctx.manuscript(manuscript_id)?;
    if &manuscript.thread_id != thread_id {
        return invalid(format!("manuscript {manuscript_id} is not in thread {thread_id}"));
    }
    if manuscript.status != ManuscriptStatus::Init {
        return invalid(format!(
            "manuscript {manuscript_id} is {}, authorship can only be accepted while INIT",
            manuscript.status
        ));
    }
    if manuscript.authors != authors {
        return invalid(format!("authors of manuscript {manuscript_id} changed"));
    }
    let me = manuscript
        .author(ctx.signer_id())
        .ok_or_else(|| Error::Validation(format!("{} is not an author", ctx.signer_id())))?;
    if me.did_sign {
        return invalid(format!("{} already accepted authorship", ctx.signer_id()));
    }
    let thread = ctx.thread(thread_id)?;

    let mut updates = vec![Update::AuthorSign {
        manuscript_id: manuscript_id.clone(),
        author_id: ctx.signer_id().clone(),
    }];
    let others_signed = manuscript
        .authors
        .iter()
        .filter(|a| &a.author_id != ctx.signer_id())
        .all(|a| a.did_sign);
    if others_signed {
        updates.push(Update::ManuscriptStatus {
            manuscript_id: manuscript_id.clone(),
            status: ManuscriptStatus::after_signing(thread.is_reviewable),
        });
    }
    Ok(updates)
}

pub(super) fn allow_review(
    ctx: &Check<'_>,
    thread_id: &Address,
    journal_id: &Address,
    reference: &[ManuscriptReference],
) -> Result<Vec<Update>> {
    ctx.require_price(PriceKind::EditorAllowManuscriptReview)?;
    let journal = ctx.journal(journal_id)?;
    ctx.require_accepted_editor(journal)?;
    let thread = ctx.thread(thread_id)?;
    if thread.is_reviewable {
        return invalid(format!("thread {thread_id} is already reviewable"));
    }
    let members = check_thread_reference(ctx, thread, reference)?;
    if let Some(foreign) = members.iter().find(|m| &m.journal_id != journal_id) {
        return invalid(format!(
            "manuscript {} was not submitted to journal {journal_id}",
            foreign.id
        ));
    }

    let mut updates = vec![Update::ThreadAllowReview {
        thread_id: thread_id.clone(),
        manuscript_ids: thread.manuscript_ids.clone(),
    }];
    updates.extend(
        members
            .iter()
            .filter(|m| m.status == ManuscriptStatus::New)
            .map(|m| Update::ManuscriptStatus {
                manuscript_id: m.id.clone(),
                status: ManuscriptStatus::Reviewable,
            }),
    );
    Ok(updates)
}

pub(super) fn write_review(
    ctx: &Check<'_>,
    review_id: &Address,
    manuscript_id: &Address,
    hash: &str,
    judgement: Judgement,
) -> Result<Vec<Update>> {
    ctx.require_price(PriceKind::ReviewerSubmit)?;
    ctx.require_empty(review_id, "review")?;
    require_non_empty(hash, "hash")?;
    let manuscript = ctx.manuscript(manuscript_id)?;
    if !manuscript.status.accepts_reviews() {
        return invalid(format!(
            "manuscript {manuscript_id} is {} and cannot be reviewed",
            manuscript.status
        ));
    }
    if manuscript.author(ctx.signer_id()).is_some() {
        return invalid("authors cannot review their own manuscript");
    }
    Ok(vec![Update::ReviewCreate {
        review: Review {
            id: review_id.clone(),
            created_on: ctx.timestamp(),
            manuscript_id: manuscript_id.clone(),
            review_author_id: ctx.signer_id().clone(),
            hash: hash.to_string(),
            judgement,
            is_used_by_editor: false,
        },
    }])
}

/// Manuscript that belongs to the journal the signer edits
fn edited_manuscript<'a>(
    ctx: &Check<'a>,
    manuscript_id: &Address,
    journal_id: &Address,
) -> Result<&'a Manuscript> {
    let manuscript = ctx.manuscript(manuscript_id)?;
    if &manuscript.journal_id != journal_id {
        return invalid(format!(
            "manuscript {manuscript_id} was not submitted to journal {journal_id}"
        ));
    }
    let journal = ctx.journal(journal_id)?;
    ctx.require_accepted_editor(journal)?;
    Ok(manuscript)
}

pub(super) fn judge(
    ctx: &Check<'_>,
    manuscript_id: &Address,
    journal_id: &Address,
    review_ids: &[Address],
    judgement: ManuscriptJudgement,
) -> Result<Vec<Update>> {
    ctx.require_price(judgement.price_kind())?;
    let manuscript = edited_manuscript(ctx, manuscript_id, journal_id)?;
    if manuscript.status != ManuscriptStatus::Reviewable {
        return invalid(format!(
            "manuscript {manuscript_id} is {}, only REVIEWABLE manuscripts can be judged",
            manuscript.status
        ));
    }

    let mut updates = vec![Update::ManuscriptStatus {
        manuscript_id: manuscript_id.clone(),
        status: judgement.status(),
    }];
    let mut seen = HashSet::new();
    for review_id in review_ids {
        if !seen.insert(review_id) {
            return invalid(format!("review {review_id} is listed twice"));
        }
        let review = ctx.review(review_id)?;
        if &review.manuscript_id != manuscript_id {
            return invalid(format!("review {review_id} is not about {manuscript_id}"));
        }
        updates.push(Update::ReviewUseByEditor {
            review_id: review_id.clone(),
        });
    }
    Ok(updates)
}

pub(super) fn assign(
    ctx: &Check<'_>,
    manuscript_id: &Address,
    journal_id: &Address,
    volume_id: &Address,
    first_page: &str,
    last_page: &str,
) -> Result<Vec<Update>> {
    ctx.require_price(PriceKind::EditorAssignManuscript)?;
    let manuscript = edited_manuscript(ctx, manuscript_id, journal_id)?;
    if manuscript.status != ManuscriptStatus::Published {
        return invalid(format!(
            "manuscript {manuscript_id} is {}, only PUBLISHED manuscripts can be assigned",
            manuscript.status
        ));
    }
    let volume = ctx.volume(volume_id)?;
    if &volume.journal_id != journal_id {
        return invalid(format!("volume {volume_id} does not belong to journal {journal_id}"));
    }
    require_non_empty(first_page, "first page")?;
    require_non_empty(last_page, "last page")?;

    let placement = |field, value: &str| Update::ManuscriptPlacement {
        manuscript_id: manuscript_id.clone(),
        field,
        value: value.to_string(),
    };
    Ok(vec![
        Update::ManuscriptStatus {
            manuscript_id: manuscript_id.clone(),
            status: ManuscriptStatus::Assigned,
        },
        placement(ManuscriptField::VolumeId, volume_id.as_str()),
        placement(ManuscriptField::FirstPage, first_page),
        placement(ManuscriptField::LastPage, last_page),
    ])
}
