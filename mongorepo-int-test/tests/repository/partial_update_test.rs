use chrono::{FixedOffset, TimeZone, Utc};
use mongorepo::common::Value;
use mongorepo::errors::ErrorKind;
use mongorepo::repository::{Repository, UpdateDefinition};
use mongorepo_int_test::models::{generate_customer, Address, Customer, Tier};
use mongorepo_int_test::test_util::{cleanup, create_test_context, run_test};

#[test]
fn test_partial_update_touches_only_selected_members() {
    run_test(
        || create_test_context(),
        |ctx| {
            let repo = ctx.repository::<Customer>()?;
            let original = generate_customer();
            repo.add(&original)?;

            let mut changed = original.clone();
            changed.name = "Katherine Johnson".to_string();
            changed.lifetime_value = 5_000_000_000_000;
            changed.email = "not-saved@example.com".to_string();
            changed.visits = original.visits + 10;

            let result = repo.save_partial(&changed, &["name", "lifetime_value"])?;
            assert_eq!(result.matched_count(), 1);
            assert_eq!(result.modified_count(), 1);

            let stored = repo.find_by_id(&original.id)?.unwrap();
            assert_eq!(stored.name, "Katherine Johnson");
            assert_eq!(stored.lifetime_value, 5_000_000_000_000);
            assert_eq!(stored.email, original.email);
            assert_eq!(stored.visits, original.visits);
            assert_eq!(stored.address, original.address);
            assert_eq!(stored.tags, original.tags);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_partial_update_document_text() {
    run_test(
        || create_test_context(),
        |ctx| {
            let repo = ctx.repository::<Customer>()?;
            let mut customer = generate_customer();
            customer.registered_at = Utc.with_ymd_and_hms(2023, 5, 1, 12, 0, 0).unwrap()
                + chrono::Duration::milliseconds(500);
            customer.lifetime_value = 123456789012345;
            customer.visits = 3;

            let update =
                repo.partial_update(&customer, &["registered_at", "lifetime_value", "visits"])?;
            assert_eq!(
                update.to_json()?,
                r#"{"$set": {"registered_at": ISODate("2023-05-01T12:00:00.5Z"), "lifetime_value": NumberLong("123456789012345"), "visits": 3}}"#
            );
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_partial_update_uses_element_names() {
    run_test(
        || create_test_context(),
        |ctx| {
            let repo = ctx.repository::<Customer>()?;
            let mut customer = generate_customer();
            customer.name = "Ada".to_string();
            customer.address = Some(Address {
                street: "Main St".to_string(),
                city: "Lisbon".to_string(),
                zip: "1000-001".to_string(),
            });

            let update = repo.partial_update(&customer, &["name", "address"])?;
            assert_eq!(
                update.to_json()?,
                r#"{"$set": {"full_name": "Ada", "address": {"street_line": "Main St", "city": "Lisbon", "zip": "1000-001"}}}"#
            );

            // element names select the same member
            let by_element = repo.partial_update(&customer, &["full_name"])?;
            assert_eq!(by_element.to_json()?, r#"{"$set": {"full_name": "Ada"}}"#);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_partial_update_normalizes_offsets_to_utc() {
    run_test(
        || create_test_context(),
        |ctx| {
            let repo = ctx.repository::<Customer>()?;
            let offset = FixedOffset::east_opt(2 * 3600).unwrap();
            let mut customer = generate_customer();
            customer.registered_at = offset
                .with_ymd_and_hms(2023, 5, 1, 14, 0, 0)
                .unwrap()
                .with_timezone(&Utc);

            let update = repo.partial_update(&customer, &["registered_at"])?;
            assert_eq!(
                update.to_json()?,
                r#"{"$set": {"registered_at": ISODate("2023-05-01T12:00:00Z")}}"#
            );
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_partial_update_of_enum_member() {
    run_test(
        || create_test_context(),
        |ctx| {
            let repo = ctx.repository::<Customer>()?;
            let mut customer = generate_customer();
            repo.add(&customer)?;

            let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
            customer.tier = Tier::Premium { since };
            let update = repo.partial_update(&customer, &["tier"])?;
            assert_eq!(
                update.to_json()?,
                r#"{"$set": {"tier": {"variant": "Premium", "value": {"since": ISODate("2024-01-01T00:00:00Z")}}}}"#
            );

            repo.save_partial(&customer, &["tier"])?;
            let stored = repo.find_by_id(&customer.id)?.unwrap();
            assert_eq!(stored.tier, Tier::Premium { since });
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_partial_update_rejects_unmapped_selectors() {
    run_test(
        || create_test_context(),
        |ctx| {
            let repo = ctx.repository::<Customer>()?;
            let customer = generate_customer();
            repo.add(&customer)?;

            for selector in ["nickname", "session_token"] {
                let err = repo.save_partial(&customer, &["name", selector]).unwrap_err();
                assert_eq!(err.kind(), &ErrorKind::UnmappedMember);
            }

            assert_eq!(repo.find_by_id(&customer.id)?, Some(customer));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_partial_update_without_selectors() {
    run_test(
        || create_test_context(),
        |ctx| {
            let repo = ctx.repository::<Customer>()?;
            let customer = generate_customer();
            repo.add(&customer)?;

            let update = repo.partial_update(&customer, &[])?;
            assert!(update.is_empty());
            assert_eq!(update.to_json()?, "{}");

            let result = repo.save_partial(&customer, &[])?;
            assert_eq!(result.matched_count(), 1);
            assert_eq!(result.modified_count(), 0);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_partial_update_of_missing_entity() {
    run_test(
        || create_test_context(),
        |ctx| {
            let repo = ctx.repository::<Customer>()?;
            let customer = generate_customer();

            let result = repo.save_partial(&customer, &["name"])?;
            assert_eq!(result.matched_count(), 0);
            assert_eq!(result.modified_count(), 0);
            assert!(repo.find_by_id(&customer.id)?.is_none());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_repeated_selector_last_one_wins() {
    run_test(
        || create_test_context(),
        |ctx| {
            let repo = ctx.repository::<Customer>()?;
            let customer = generate_customer();

            let update = repo.partial_update(&customer, &["visits", "visits"])?;
            assert_eq!(update.clauses().len(), 2);
            assert_eq!(
                update.to_json()?,
                format!(r#"{{"$set": {{"visits": {}}}}}"#, customer.visits)
            );
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_literals_decode_through_the_backend() {
    let update = UpdateDefinition::combine(vec![
        UpdateDefinition::set("at", r#"ISODate("2023-05-01T12:00:00.5Z")"#.to_string()),
        UpdateDefinition::set("big", r#"NumberLong("123456789012345")"#.to_string()),
    ]);

    let document = update.to_document().unwrap();
    let set = document.get("$set").unwrap();
    let set = set.as_document().unwrap();
    assert_eq!(
        set.get("at").unwrap(),
        Value::DateTime(
            Utc.with_ymd_and_hms(2023, 5, 1, 12, 0, 0).unwrap()
                + chrono::Duration::milliseconds(500)
        )
    );
    assert_eq!(set.get("big").unwrap(), Value::I64(123456789012345));
}
