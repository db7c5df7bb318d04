use mongorepo::collection::{order_by, Query};
use mongorepo::common::{SortOrder, Value};
use mongorepo::errors::ErrorKind;
use mongorepo::filter::{all, field};
use mongorepo::mapping::{EntityId, MongoEntity};
use mongorepo::repository::Repository;
use mongorepo_int_test::models::{
    generate_audit_entry, generate_customer, AuditEntry, Customer, Tier,
};
use mongorepo_int_test::test_util::{cleanup, create_test_context, now, run_test};

#[test]
fn test_add_and_find_by_id() {
    run_test(
        || create_test_context(),
        |ctx| {
            let repo = ctx.repository::<Customer>()?;
            let customer = generate_customer();

            let result = repo.add(&customer)?;
            assert_eq!(result.inserted_count(), 1);
            assert_eq!(result.inserted_ids()[0], Value::from(customer.id.as_str()));

            let found = repo.find_by_id(&customer.id)?;
            assert_eq!(found, Some(customer));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_stored_document_uses_element_names() {
    run_test(
        || create_test_context(),
        |ctx| {
            let repo = ctx.repository::<Customer>()?;
            assert_eq!(repo.collection_name(), "customers");

            let mut customer = generate_customer();
            customer.session_token = Some("token".to_string());
            repo.add(&customer)?;

            let documents = repo.find_documents(&Query::default())?;
            assert_eq!(documents.len(), 1);
            let document = &documents[0];
            assert_eq!(document.id(), Some(&Value::from(customer.id.as_str())));
            assert_eq!(document.get("full_name")?, Value::from(customer.name.clone()));
            assert!(!document.contains_key("session_token"));
            assert!(document.contains_field("address.street_line"));

            let names = ctx.client().database(ctx.database())?.collection_names()?;
            assert_eq!(names, vec!["customers".to_string()]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_add_duplicate_id_fails() {
    run_test(
        || create_test_context(),
        |ctx| {
            let repo = ctx.repository::<Customer>()?;
            let customer = generate_customer();
            repo.add(&customer)?;

            let err = repo.add(&customer).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::DuplicateKey);
            assert_eq!(repo.count(&all())?, 1);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_add_many_is_all_or_nothing() {
    run_test(
        || create_test_context(),
        |ctx| {
            let repo = ctx.repository::<Customer>()?;
            let first = generate_customer();
            repo.add(&first)?;

            let batch = vec![generate_customer(), first.clone(), generate_customer()];
            let err = repo.add_many(&batch).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::DuplicateKey);
            assert_eq!(repo.count(&all())?, 1);

            let batch: Vec<Customer> = (0..5).map(|_| generate_customer()).collect();
            let result = repo.add_many(&batch)?;
            assert_eq!(result.inserted_count(), 5);
            assert_eq!(repo.count(&all())?, 6);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_save_replaces_whole_entity() {
    run_test(
        || create_test_context(),
        |ctx| {
            let repo = ctx.repository::<Customer>()?;
            let mut customer = generate_customer();
            repo.add(&customer)?;

            customer.name = "Grace Hopper".to_string();
            customer.tier = Tier::Premium { since: now() };
            customer.address = None;
            let result = repo.save(&customer, false)?;
            assert_eq!(result.matched_count(), 1);
            assert_eq!(result.modified_count(), 1);
            assert!(result.upserted_id().is_none());

            let found = repo.find_by_id(&customer.id)?;
            assert_eq!(found, Some(customer));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_save_missing_entity() {
    run_test(
        || create_test_context(),
        |ctx| {
            let repo = ctx.repository::<Customer>()?;
            let customer = generate_customer();

            let result = repo.save(&customer, false)?;
            assert_eq!(result.matched_count(), 0);
            assert_eq!(repo.count(&all())?, 0);

            let result = repo.save(&customer, true)?;
            assert_eq!(result.matched_count(), 0);
            assert_eq!(
                result.upserted_id(),
                Some(&Value::from(customer.id.as_str()))
            );
            assert_eq!(repo.find_by_id(&customer.id)?, Some(customer));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_delete() {
    run_test(
        || create_test_context(),
        |ctx| {
            let repo = ctx.repository::<Customer>()?;
            let customers: Vec<Customer> = (0..4).map(|_| generate_customer()).collect();
            repo.add_many(&customers)?;

            let result = repo.delete(&customers[0])?;
            assert_eq!(result.deleted_count(), 1);
            assert_eq!(repo.delete(&customers[0])?.deleted_count(), 0);

            let result = repo.delete_many(&customers[1..3])?;
            assert_eq!(result.deleted_count(), 2);

            let remaining = repo.find(&Query::default())?;
            assert_eq!(remaining, vec![customers[3].clone()]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_delete_many_with_no_entities() {
    run_test(
        || create_test_context(),
        |ctx| {
            let repo = ctx.repository::<Customer>()?;
            repo.add(&generate_customer())?;

            let result = repo.delete_many(&[])?;
            assert_eq!(result.deleted_count(), 0);
            assert_eq!(repo.count(&all())?, 1);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_find_with_filter_sort_and_paging() {
    run_test(
        || create_test_context(),
        |ctx| {
            let repo = ctx.repository::<AuditEntry>()?;
            assert_eq!(repo.collection_name(), "AuditEntry");

            let entries: Vec<AuditEntry> = (0..10).map(generate_audit_entry).collect();
            repo.add_many(&entries)?;

            let query = order_by("sequence", SortOrder::Descending)
                .filter(field("sequence").gte(3i64))
                .skip(1)
                .limit(3);
            let found = repo.find(&query)?;
            let sequences: Vec<i64> = found.iter().map(|e| e.sequence).collect();
            assert_eq!(sequences, vec![8, 7, 6]);

            assert_eq!(repo.count(&field("sequence").lt(5i64))?, 5);

            let first = repo.find_one(&order_by("sequence", SortOrder::Ascending))?;
            assert_eq!(first.map(|e| e.sequence), Some(0));

            let none = repo.find_one(&Query::new(field("sequence").gt(100i64)))?;
            assert!(none.is_none());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_find_by_element_name() {
    run_test(
        || create_test_context(),
        |ctx| {
            let repo = ctx.repository::<Customer>()?;
            let mut ada = generate_customer();
            ada.name = "Ada Lovelace".to_string();
            repo.add_many(&[ada.clone(), generate_customer(), generate_customer()])?;

            let found = repo.find(&Query::new(field("full_name").eq("Ada Lovelace")))?;
            assert_eq!(found, vec![ada]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_find_documents_projection() {
    run_test(
        || create_test_context(),
        |ctx| {
            let repo = ctx.repository::<Customer>()?;
            let customer = generate_customer();
            repo.add(&customer)?;

            let documents = repo.find_documents(&Query::default().project(&["full_name"]))?;
            assert_eq!(documents.len(), 1);
            let keys: Vec<&String> = documents[0].keys().collect();
            assert_eq!(keys, vec!["_id", "full_name"]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_find_by_unknown_id() {
    run_test(
        || create_test_context(),
        |ctx| {
            let repo = ctx.repository::<Customer>()?;
            repo.add(&generate_customer())?;
            assert!(repo.find_by_id(&EntityId::new())?.is_none());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_repositories_share_a_database() {
    run_test(
        || create_test_context(),
        |ctx| {
            let customers = ctx.repository::<Customer>()?;
            let audit = ctx.repository::<AuditEntry>()?;

            let customer = generate_customer();
            customers.add(&customer)?;
            audit.add(&generate_audit_entry(1))?;

            assert_eq!(customers.count(&all())?, 1);
            assert_eq!(audit.count(&all())?, 1);
            assert_eq!(
                customers.find_by_id(customer.entity_id())?.map(|c| c.id),
                Some(customer.id.clone())
            );

            let mut names = ctx.client().database(ctx.database())?.collection_names()?;
            names.sort();
            assert_eq!(names, vec!["AuditEntry".to_string(), "customers".to_string()]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
