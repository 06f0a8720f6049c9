use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "coinstore")]
#[command(about = "Coin ledger of the rewards store: accounts, transfers, purchases")]
pub struct Cli {
    /// Settings file, without extension.
    #[arg(long, default_value = "settings")]
    pub config: String,

    /// Database connection string; overrides the settings file.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply or inspect schema migrations.
    Migrate(MigrateArgs),
    /// Open an account credited with the starting grant.
    Register(RegisterArgs),
    /// Send coins to another user.
    Send(SendArgs),
    /// Buy one item from the catalog.
    Buy(BuyArgs),
    /// Show balance, inventory and coin history.
    Info(UserArgs),
    /// Show coins received and sent.
    History(UserArgs),
    /// List the catalog.
    Items,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MigrateAction {
    Up,
    Down,
    Fresh,
    Status,
}

#[derive(Args, Debug)]
pub struct MigrateArgs {
    #[arg(value_enum, default_value = "up")]
    pub action: MigrateAction,
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    #[arg(long)]
    pub username: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Id of the paying account.
    #[arg(long)]
    pub from: i64,
    /// Username of the receiving account.
    #[arg(long)]
    pub to: String,
    #[arg(long)]
    pub amount: i64,
}

#[derive(Args, Debug)]
pub struct BuyArgs {
    #[arg(long)]
    pub user: i64,
    #[arg(long)]
    pub item: String,
}

#[derive(Args, Debug)]
pub struct UserArgs {
    #[arg(long)]
    pub user: i64,
}
