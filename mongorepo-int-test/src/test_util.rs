use chrono::{DateTime, SubsecRound, Utc};
use mongorepo::client::memory::InMemoryClient;
use mongorepo::client::DocumentClient;
use mongorepo::errors::RepoResult;
use mongorepo::filter::all;
use mongorepo::mapping::MongoEntity;
use mongorepo::repository::MongoRepository;
use std::backtrace::Backtrace;
use std::thread;
use std::time::{Duration, Instant};

/// Runs a test with retry logic and error handling.
/// `after` runs even when the test fails so every context gets cleaned up.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> RepoResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> RepoResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> RepoResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    const MAX_RETRIES: u32 = 3;
    let mut last_error: Option<String> = None;
    let mut last_backtrace: Option<String> = None;

    for attempt in 1..=MAX_RETRIES {
        let start_time = Instant::now();

        let result = std::panic::catch_unwind(|| {
            let backtrace = Backtrace::capture();
            match before() {
                Ok(ctx) => match test(ctx.clone()) {
                    Ok(_) => match after(ctx) {
                        Ok(_) => Ok(()),
                        Err(e) => Err((format!("After run failed: {:?}", e), backtrace.to_string())),
                    },
                    Err(e) => {
                        let _ = after(ctx);
                        Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                    }
                },
                Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
            }
        });

        let elapsed = start_time.elapsed();

        match result {
            Ok(Ok(_)) => return,
            Ok(Err((e, bt))) => {
                last_error = Some(e.clone());
                last_backtrace = Some(bt);
                if attempt < MAX_RETRIES {
                    eprintln!(
                        "\n========== Test Attempt {}/{} Failed (took {:?}) ==========",
                        attempt, MAX_RETRIES, elapsed
                    );
                    eprintln!("Error: {}", e);
                    thread::sleep(Duration::from_millis(100 * attempt as u64));
                }
            }
            Err(panic_err) => {
                let err_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_err.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };

                last_error = Some(format!("Panic: {}", err_msg));
                last_backtrace = Some(Backtrace::capture().to_string());

                if attempt < MAX_RETRIES {
                    eprintln!(
                        "\n========== Test Attempt {}/{} Panicked (took {:?}) ==========",
                        attempt, MAX_RETRIES, elapsed
                    );
                    eprintln!("Panic: {}", err_msg);
                    thread::sleep(Duration::from_millis(100 * attempt as u64));
                }
            }
        }
    }

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Failed after {} attempts", MAX_RETRIES);
    eprintln!("Last error: {}", last_error.as_deref().unwrap_or("Unknown"));
    if let Some(bt) = &last_backtrace {
        if !bt.is_empty() && !bt.contains("disabled") {
            eprintln!("\nBacktrace:\n{}", bt);
        }
    }
    eprintln!("=====================================================\n");

    panic!(
        "Test failed after {} attempts. Last error: {}",
        MAX_RETRIES,
        last_error.unwrap_or_default()
    );
}

/// A client plus a database name no other test uses.
#[derive(Clone)]
pub struct TestContext {
    client: DocumentClient,
    database: String,
}

impl TestContext {
    pub fn new(client: DocumentClient, database: String) -> Self {
        Self { client, database }
    }

    pub fn client(&self) -> DocumentClient {
        self.client.clone()
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn repository<T: MongoEntity>(&self) -> RepoResult<MongoRepository<T>> {
        MongoRepository::builder()
            .client(self.client())
            .database(&self.database)
            .build()
    }
}

pub fn random_database() -> String {
    format!("it_{}", uuid::Uuid::new_v4().simple())
}

/// Uses a live server when built with the `mongodb` feature and
/// `MONGOREPO_TEST_URI` is set, a fresh in-memory client otherwise.
pub fn create_test_context() -> RepoResult<TestContext> {
    #[cfg(feature = "mongodb")]
    if let Ok(uri) = std::env::var("MONGOREPO_TEST_URI") {
        use mongorepo::client::mongo::MongoClient;
        use mongorepo::config::ConnectionString;

        let connection_string = ConnectionString::parse(&uri)?;
        let client = DocumentClient::new(MongoClient::connect(&connection_string)?);
        return Ok(TestContext::new(client, random_database()));
    }

    Ok(TestContext::new(
        DocumentClient::new(InMemoryClient::new()),
        random_database(),
    ))
}

/// Empties every collection the test wrote to.
pub fn cleanup(ctx: TestContext) -> RepoResult<()> {
    let database = ctx.client.database(ctx.database())?;
    for name in database.collection_names()? {
        database.collection(&name)?.delete_many(&all())?;
    }
    Ok(())
}

/// Now, truncated to what the store keeps.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
