use mongorepo::client::memory::InMemoryClient;
use mongorepo::client::DocumentClient;
use mongorepo::collection::Query;
use mongorepo::errors::RepoResult;
use mongorepo::filter::{all, field};
use mongorepo::repository::{AsyncRepository, MongoRepository, Repository};
use mongorepo_int_test::models::{generate_customer, Customer};
use mongorepo_int_test::test_util::{create_test_context, random_database};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

fn slow_repository(latency: Duration) -> RepoResult<MongoRepository<Customer>> {
    MongoRepository::builder()
        .client(DocumentClient::new(InMemoryClient::with_latency(latency)))
        .database(&random_database())
        .build()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_async_crud() -> RepoResult<()> {
    let repo = create_test_context()?.repository::<Customer>()?;
    let token = CancellationToken::new();

    let mut customer = generate_customer();
    let inserted = repo.add_async(&customer, &token).await?;
    assert_eq!(inserted.inserted_count(), 1);

    customer.name = "Dorothy Vaughan".to_string();
    customer.visits += 1;
    let updated = repo.save_partial_async(&customer, &["name"], &token).await?;
    assert_eq!(updated.modified_count(), 1);

    let stored = repo.find_by_id_async(&customer.id, &token).await?.unwrap();
    assert_eq!(stored.name, "Dorothy Vaughan");
    assert_eq!(stored.visits, customer.visits - 1);

    let saved = repo.save_async(&customer, false, &token).await?;
    assert_eq!(saved.matched_count(), 1);
    let stored = repo
        .find_one_async(&Query::new(field("full_name").eq("Dorothy Vaughan")), &token)
        .await?;
    assert_eq!(stored, Some(customer.clone()));

    let others: Vec<Customer> = (0..3).map(|_| generate_customer()).collect();
    repo.add_many_async(&others, &token).await?;
    assert_eq!(repo.count_async(&all(), &token).await?, 4);
    assert_eq!(repo.find_async(&Query::default(), &token).await?.len(), 4);
    assert_eq!(
        repo.find_documents_async(&Query::default(), &token).await?.len(),
        4
    );

    assert_eq!(repo.delete_many_async(&others, &token).await?.deleted_count(), 3);
    assert_eq!(repo.delete_async(&customer, &token).await?.deleted_count(), 1);
    assert_eq!(repo.count_async(&all(), &token).await?, 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_async_results_match_sync_results() -> RepoResult<()> {
    let repo = create_test_context()?.repository::<Customer>()?;
    let token = CancellationToken::new();
    let customers: Vec<Customer> = (0..5).map(|_| generate_customer()).collect();
    repo.add_many(&customers)?;

    let query = Query::new(field("visits").gte(0));
    let sync_found = repo.find(&query)?;
    let async_found = repo.find_async(&query, &token).await?;
    assert_eq!(sync_found, async_found);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancelled_before_start_touches_nothing() -> RepoResult<()> {
    let repo = create_test_context()?.repository::<Customer>()?;
    let token = CancellationToken::new();
    token.cancel();

    let customer = generate_customer();
    let err = repo.add_async(&customer, &token).await.unwrap_err();
    assert!(err.is_cancelled());

    let err = repo.count_async(&all(), &token).await.unwrap_err();
    assert!(err.is_cancelled());

    let err = repo
        .save_partial_async(&customer, &["name"], &token)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());

    assert_eq!(repo.count(&all())?, 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancel_in_flight() -> RepoResult<()> {
    let repo = slow_repository(Duration::from_millis(500))?;
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let start = Instant::now();
    let err = repo.find_async(&Query::default(), &token).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(start.elapsed() < Duration::from_millis(500));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_uncancelled_slow_call_completes() -> RepoResult<()> {
    let repo = slow_repository(Duration::from_millis(20))?;
    let token = CancellationToken::new();

    let customer = generate_customer();
    repo.add_async(&customer, &token).await?;
    let found = repo.find_by_id_async(&customer.id, &token).await?;
    assert_eq!(found, Some(customer));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_async_adds() -> RepoResult<()> {
    let repo = create_test_context()?.repository::<Customer>()?;
    let token = CancellationToken::new();

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let repo = repo.clone();
            let token = token.clone();
            tokio::spawn(async move { repo.add_async(&generate_customer(), &token).await })
        })
        .collect();

    for task in tasks {
        task.await.unwrap()?;
    }
    assert_eq!(repo.count_async(&all(), &token).await?, 16);
    Ok(())
}
