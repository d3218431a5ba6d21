use std::fs::File;

use anyhow::{Context, Result};
use cute_teller::{
    bin_utils::{Script, ScriptError, seed_accounts},
    config::{StoreKind, TellerConfig},
    logging::init_logging,
    service::{Outcome, TransferService},
    store::{AccountStore, in_memory_store::InMemoryAccountStore, pg_store::PgAccountStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    let operations = std::env::args()
        .nth(1)
        .context("Expected an operations file name as the first argument")?;
    let seeds = std::env::args().nth(2);

    let config = TellerConfig::load().context("Failed to load configuration")?;
    init_logging(&config);

    match config.store {
        StoreKind::Memory => run(InMemoryAccountStore::default(), &operations, seeds).await,
        StoreKind::Postgres => {
            let url = config
                .postgres_url
                .as_deref()
                .context("`postgres` store selected, but neither postgres_url nor DATABASE_URL is set")?;
            let store = PgAccountStore::connect(url, config.max_connections)
                .await
                .context("Failed to connect to PostgreSQL")?;
            store
                .ensure_schema()
                .await
                .context("Failed to create the accounts table")?;
            run(store, &operations, seeds).await
        }
    }
}

async fn run<S>(store: S, operations: &str, seeds: Option<String>) -> Result<()>
where
    S: AccountStore,
{
    if let Some(seeds) = seeds {
        let file = File::open(&seeds).with_context(|| format!("Failed to open `{seeds}`"))?;
        seed_accounts(&store, file).await?;
    }
    let file =
        File::open(operations).with_context(|| format!("Failed to open `{operations}`"))?;

    let service = TransferService::new(store);
    let script = Script {
        operations: file,
        output: &mut std::io::stdout(),
        success_printer: Box::new(|_: u64, outcome: Outcome| println!("ok: {outcome}")),
        error_printer: Box::new(|line: u64, err: ScriptError| eprintln!("error at line {line}: {err}")),
    };
    script.run(&service).await
}
