use clap::Parser;
use engine::{Account, CoinHistory, Engine, EngineError, Item, LedgerEntry, UserInfo};
use migration::{Migrator, MigratorTrait};
use serde::Serialize;

use cli::{Cli, Command, MigrateAction};

mod cli;
mod settings;

/// Exit code for failures worth retrying (`EX_TEMPFAIL`).
const EXIT_TRANSIENT: i32 = 75;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "coinstore={level},engine={level},migration={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let url = cli
        .database_url
        .clone()
        .unwrap_or_else(|| settings.database_url());
    let db = sea_orm::Database::connect(&url).await?;

    if let Command::Migrate(args) = &cli.command {
        match args.action {
            MigrateAction::Up => Migrator::up(&db, None).await?,
            MigrateAction::Down => Migrator::down(&db, None).await?,
            MigrateAction::Fresh => Migrator::fresh(&db).await?,
            MigrateAction::Status => Migrator::status(&db).await?,
        }
        return Ok(());
    }

    Migrator::up(&db, None).await?;
    let engine = Engine::builder()
        .database(db)
        .starting_grant(settings.ledger.starting_grant)
        .build()
        .await?;

    let output = match run(&engine, cli.command).await {
        Ok(output) => output,
        Err(err) => {
            tracing::error!("{err}");
            std::process::exit(if err.is_transient() { EXIT_TRANSIENT } else { 1 });
        }
    };
    if let Some(output) = output {
        print_json(&output)?;
    }

    Ok(())
}

/// Result of a subcommand, printed as JSON.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Output {
    Account(Account),
    Entry(LedgerEntry),
    Info(UserInfo),
    History(CoinHistory),
    Items(Vec<Item>),
}

async fn run(engine: &Engine, command: Command) -> Result<Option<Output>, EngineError> {
    let output = match command {
        Command::Migrate(_) => return Ok(None),
        Command::Register(args) => Output::Account(engine.open_account(&args.username).await?),
        Command::Send(args) => Output::Entry(
            engine
                .transfer_to_username(args.from, &args.to, args.amount)
                .await?,
        ),
        Command::Buy(args) => Output::Entry(engine.purchase(args.user, &args.item).await?),
        Command::Info(args) => Output::Info(engine.user_info(args.user).await?),
        Command::History(args) => Output::History(engine.history(args.user).await?),
        Command::Items => Output::Items(engine.catalog().await?),
    };
    Ok(Some(output))
}

fn print_json<T: Serialize>(value: &T) -> serde_json::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
