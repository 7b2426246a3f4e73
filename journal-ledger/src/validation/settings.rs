use super::{person, Check};
use crate::address::Address;
use crate::command::{FieldUpdate, PersonCreate};
use crate::error::{invalid, protocol, Result};
use crate::model::{PriceKind, PriceList};
use crate::state::AddressState;
use crate::update::Update;
use std::collections::BTreeMap;

pub(super) fn bootstrap(
    ctx: &Check<'_>,
    price_list: &PriceList,
    first_major: &PersonCreate,
) -> Result<Vec<Update>> {
    match ctx.state.classify(&Address::settings()) {
        AddressState::Empty => {}
        AddressState::Filled => return invalid("ledger is already bootstrapped"),
        AddressState::Unknown => return protocol("settings address was not declared"),
    }
    ctx.require_free()?;
    if &first_major.new_person_id != ctx.signer_id() {
        return invalid("the first major must sign the bootstrap");
    }
    if first_major.public_key != ctx.signer_key {
        return invalid("signing key does not match the first major's public key");
    }
    person::check_new_person(first_major)?;
    ctx.require_empty(&first_major.new_person_id, "person")?;
    if let Some((kind, price)) = price_list.iter().find(|(_, price)| *price < 0) {
        return invalid(format!("{} must not be negative, got {price}", kind.event_key()));
    }

    Ok(vec![
        Update::SettingsCreate {
            price_list: price_list.clone(),
        },
        Update::PersonCreate {
            person: person::new_person(first_major, ctx.timestamp(), true, true),
        },
    ])
}

pub(super) fn update(
    ctx: &Check<'_>,
    prices: &BTreeMap<PriceKind, FieldUpdate<i32>>,
) -> Result<Vec<Update>> {
    ctx.require_price(PriceKind::MajorEditSettings)?;
    ctx.require_major()?;
    let current = &ctx.settings()?.price_list;

    let mut updates = Vec::new();
    for (kind, change) in prices {
        let actual = current.price_for(*kind);
        if actual != change.old {
            return invalid(format!(
                "{} changed concurrently: expected {}, found {actual}",
                kind.event_key(),
                change.old
            ));
        }
        if change.new < 0 {
            return invalid(format!("{} must not be negative", kind.event_key()));
        }
        if change.is_change() {
            updates.push(Update::SettingsPrice {
                kind: *kind,
                price: change.new,
            });
        }
    }
    Ok(updates)
}
