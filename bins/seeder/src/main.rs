//! Database seeder for Tally development and testing.
//!
//! Seeds sponsorship tiers, a demo service, two funded demo agents, a demo
//! user and one platform expense. Safe to run repeatedly.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tally_core::ledger::{LedgerError, MutationRef};
use tally_db::entities::sponsorship_tiers;
use tally_db::{Ledger, NewExpense, connect};
use tally_shared::config::{DatabaseConfig, LedgerConfig};
use tally_shared::types::{AgentId, Amount};

/// (name, price, gem reward)
const TIERS: [(&str, i64, i64); 3] = [
    ("Bronze", 5_000, 500),
    ("Silver", 10_000, 1_200),
    ("Gold", 30_000, 4_000),
];

const DEMO_SERVICE: &str = "demo-game";
const DEMO_AGENTS: [&str; 2] = ["demo-agent-alice", "demo-agent-bob"];
const DEMO_AGENT_FUNDS: i64 = 10_000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set in environment")?;

    println!("Connecting to database...");
    let db = connect(&DatabaseConfig {
        url,
        max_connections: 2,
        min_connections: 1,
        acquire_timeout_secs: 8,
    })
    .await
    .context("failed to connect to database")?;
    let ledger = Ledger::new(db.clone(), &LedgerConfig::default());

    println!("Seeding sponsorship tiers...");
    seed_tiers(&ledger, &db).await?;

    println!("Seeding demo service...");
    seed_service(&ledger).await?;

    println!("Seeding demo agents...");
    seed_agents(&ledger).await?;

    println!("Seeding demo user...");
    let user = ledger.users().create("Demo Sponsor").await?;
    println!("  Created user {}", user.id);

    println!("Seeding platform expense...");
    ledger
        .sponsorship()
        .add_expense(NewExpense {
            category: "hosting".to_string(),
            amount: 2_000,
            description: Some("Seeded server costs".to_string()),
            expense_date: None,
        })
        .await?;

    println!("Seeding complete!");
    Ok(())
}

async fn seed_tiers(ledger: &Ledger, db: &DatabaseConnection) -> anyhow::Result<()> {
    if !ledger.sponsorship().tiers().await?.is_empty() {
        println!("  Tiers already exist, skipping...");
        return Ok(());
    }

    for (sort_order, (name, amount, gem_reward)) in (0..).zip(TIERS) {
        sponsorship_tiers::ActiveModel {
            name: Set(name.to_string()),
            amount: Set(amount),
            gem_reward: Set(gem_reward),
            sort_order: Set(sort_order),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(db)
        .await?;
        println!("  Created tier {name}");
    }
    Ok(())
}

async fn seed_service(ledger: &Ledger) -> anyhow::Result<()> {
    match ledger.services().create(DEMO_SERVICE, None).await {
        Ok(service) => println!("  Created service {} ({})", service.name, service.id),
        Err(LedgerError::Conflict(_)) => println!("  Service already exists, skipping..."),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn seed_agents(ledger: &Ledger) -> anyhow::Result<()> {
    let funds = Amount::new(DEMO_AGENT_FUNDS)?;
    for name in DEMO_AGENTS {
        let agent = match ledger.agents().create(name).await {
            Ok(agent) => agent,
            Err(LedgerError::Conflict(_)) => {
                println!("  Agent {name} already exists, skipping...");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let r = MutationRef::new()
            .with_reference("seed")
            .with_memo("seed funds");
        ledger
            .agent_ledger()
            .credit(AgentId::from_uuid(agent.id), funds, None, &r)
            .await?;
        println!("  Created agent {name} with {DEMO_AGENT_FUNDS} points");
    }
    Ok(())
}
