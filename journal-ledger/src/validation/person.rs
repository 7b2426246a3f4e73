use super::{require_non_empty, Check};
use crate::address::Address;
use crate::command::{BoolUpdate, FieldUpdate, PersonCreate};
use crate::error::{invalid, Result};
use crate::model::{Person, PersonField, PersonFlag, PriceKind, Timestamp};
use crate::update::Update;
use std::collections::BTreeMap;

pub(super) fn check_new_person(create: &PersonCreate) -> Result<()> {
    require_non_empty(&create.public_key, "public key")?;
    require_non_empty(&create.name, "name")?;
    require_non_empty(&create.email, "email")
}

pub(super) fn new_person(
    create: &PersonCreate,
    timestamp: Timestamp,
    is_major: bool,
    is_signed: bool,
) -> Person {
    Person {
        id: create.new_person_id.clone(),
        created_on: timestamp,
        modified_on: timestamp,
        public_key: create.public_key.clone(),
        name: create.name.clone(),
        email: create.email.clone(),
        is_major,
        is_signed,
        balance: 0,
        biography_hash: String::new(),
        organization: String::new(),
        telephone: String::new(),
        address: String::new(),
        postal_code: String::new(),
        country: String::new(),
        extra_info: String::new(),
    }
}

pub(super) fn create(ctx: &Check<'_>, create: &PersonCreate) -> Result<Vec<Update>> {
    ctx.require_price(PriceKind::MajorCreatePerson)?;
    ctx.require_major()?;
    check_new_person(create)?;
    ctx.require_empty(&create.new_person_id, "person")?;
    Ok(vec![Update::PersonCreate {
        person: new_person(create, ctx.timestamp(), false, false),
    }])
}

pub(super) fn update_properties(
    ctx: &Check<'_>,
    person_id: &Address,
    fields: &BTreeMap<PersonField, FieldUpdate<String>>,
) -> Result<Vec<Update>> {
    ctx.require_price(PriceKind::PersonEdit)?;
    if person_id != ctx.signer_id() {
        return invalid("persons can only edit their own properties");
    }
    let person = ctx.person(person_id)?;

    let mut updates = Vec::new();
    for (field, change) in fields {
        if person.field(*field) != change.old {
            return invalid(format!(
                "{} changed concurrently: expected {:?}, found {:?}",
                field.event_key(),
                change.old,
                person.field(*field)
            ));
        }
        if matches!(
            field,
            PersonField::PublicKey | PersonField::Name | PersonField::Email
        ) {
            require_non_empty(&change.new, field.event_key())?;
        }
        if change.is_change() {
            updates.push(Update::PersonProperty {
                person_id: person_id.clone(),
                field: *field,
                value: change.new.clone(),
            });
        }
    }
    Ok(updates)
}

pub(super) fn update_authorization(
    ctx: &Check<'_>,
    person_id: &Address,
    make_major: BoolUpdate,
    make_signed: BoolUpdate,
) -> Result<Vec<Update>> {
    ctx.require_price(PriceKind::MajorChangePersonAuthorization)?;
    ctx.require_major()?;
    let person = ctx.person(person_id)?;

    Ok([(PersonFlag::IsMajor, make_major), (PersonFlag::IsSigned, make_signed)]
        .into_iter()
        .filter_map(|(flag, change)| {
            let current = person.flag(flag);
            let value = change.apply(current);
            (value != current).then(|| Update::PersonFlag {
                person_id: person_id.clone(),
                flag,
                value,
            })
        })
        .collect())
}

pub(super) fn update_balance(
    ctx: &Check<'_>,
    person_id: &Address,
    increment: i32,
) -> Result<Vec<Update>> {
    ctx.require_free()?;
    ctx.require_major()?;
    let person = ctx.person(person_id)?;
    let balance = match person.balance.checked_add(increment) {
        Some(balance) if balance >= 0 => balance,
        Some(balance) => return invalid(format!("balance of {person_id} would become {balance}")),
        None => return invalid(format!("balance of {person_id} would overflow")),
    };
    if increment == 0 {
        return Ok(Vec::new());
    }
    Ok(vec![Update::PersonBalance {
        person_id: person_id.clone(),
        balance,
    }])
}
