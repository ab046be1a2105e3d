use clap::{Parser, Subcommand};
use fortune_core::{CoreConfig, Fortune, Identity, ResetScope};

#[derive(Parser)]
#[command(name = "fortune-cli", about = "Operator CLI for the fortune wheel")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Database URL, default sqlite://fortune.db
    #[arg(long, value_parser, env = "DATABASE_URL")]
    database_url: Option<String>,
    /// Identity id of the roster member running the command
    #[arg(long, env = "FORTUNE_ACTOR_ID")]
    actor: i64,
}

#[derive(Subcommand)]
enum Commands {
    /// List every prize in wheel order
    Prizes,
    /// Show the last N spin results
    Results {
        #[arg(default_value_t = 20)]
        n: usize,
    },
    /// Show the last N audit entries
    Audit {
        #[arg(default_value_t = 20)]
        n: i64,
    },
    /// Reset all spins, or only the one for --identity
    Reset {
        #[arg(long)]
        identity: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = CoreConfig::from_env()?;
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }
    let fortune = Fortune::open(&config).await?;
    let actor = Identity::new(cli.actor, "cli");

    match cli.command {
        Commands::Prizes => {
            for p in fortune.admin.prizes(&actor).await? {
                let state = if p.active { "active" } else { "hidden" };
                println!(
                    "{:>3}. #{:<4} {} {:<30} {} {}",
                    p.position, p.id, p.icon, p.label, p.color, state
                );
            }
        }
        Commands::Results { n } => {
            let records = fortune.admin.results(&actor).await?;
            let total = records.len();
            for r in records.into_iter().take(n) {
                println!(
                    "#{:>6} {} identity={} name={} prize={} ({})",
                    r.id,
                    r.created_at.to_rfc3339(),
                    r.identity_id,
                    r.display_name.as_deref().unwrap_or("-"),
                    r.prize_label,
                    r.prize_id
                );
            }
            println!("{total} results in total");
        }
        Commands::Audit { n } => {
            for e in fortune.admin.audit_log(&actor, n).await? {
                println!(
                    "#{:>6} {} actor={} ({}) {} {}",
                    e.id,
                    e.created_at.to_rfc3339(),
                    e.actor_id,
                    e.actor_name.as_deref().unwrap_or("-"),
                    e.action,
                    e.details.as_deref().unwrap_or("")
                );
            }
        }
        Commands::Reset { identity } => {
            let scope = identity.map_or(ResetScope::All, ResetScope::Identity);
            let removed = fortune.admin.reset_spins(&actor, scope).await?;
            println!("Removed {removed} spin records");
        }
    }
    Ok(())
}
