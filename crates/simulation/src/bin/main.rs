//! RegionX simulation CLI
//!
//! Runs the full region lifecycle on a simulated relay, coretime and RegionX
//! network: bridge relay token, buy a region, move it to RegionX, resolve
//! its record, fund an order and fulfill it.

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use xregion_protocol::ProtocolConfig;
use xregion_simulation::accounts::{alice, bob, charlie};
use xregion_simulation::{NetworkConfig, Scenario, SimulationConfig, CORETIME, REGIONX, RELAY};
use xregion_types::{ParaId, Requirements, CORETIME_PARA_ID, REGIONX_PARA_ID};

#[derive(Parser)]
#[command(name = "xregion-sim")]
#[command(about = "Simulated cross-chain region custody and order market")]
#[command(version)]
struct Cli {
    /// Random seed; overrides the config file
    #[arg(long)]
    seed: Option<u64>,

    /// TOML file with `seed` and a `[network]` table
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Parachain the order buys coretime for
    #[arg(long, default_value = "2000")]
    para_id: u32,

    /// Give up after this much simulated time (e.g. "30m", "2h")
    #[arg(short, long, default_value = "2h")]
    timeout: humantime::Duration,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    seed: Option<u64>,
    network: NetworkConfig,
}

const UNIT: u128 = 1_000_000_000_000;

async fn run(scenario: &Scenario, para_id: ParaId) -> Result<(), Box<dyn std::error::Error>> {
    // Relay token to the coretime chain (teleport) and to RegionX (reserve).
    let teleport = scenario
        .bridge
        .bridge_asset(10 * UNIT, CORETIME_PARA_ID, RELAY, alice(), bob())
        .await?;
    let credited = scenario.bridge.await_credit(&teleport).await?;
    println!("{} to coretime: {} credited", teleport.mode, credited);

    let reserve = scenario
        .bridge
        .bridge_asset(10 * UNIT, REGIONX_PARA_ID, RELAY, alice(), charlie())
        .await?;
    let credited = scenario.bridge.await_credit(&reserve).await?;
    println!("{} to RegionX: {} credited", reserve.mode, credited);

    scenario.start_sales(UNIT, 2, 34, 20).await?;
    let region_id = scenario.purchase_region(alice(), UNIT).await?;
    println!("Purchased {region_id}");

    let record = scenario.move_to_market(region_id, alice()).await?;
    println!(
        "Record of {region_id} available on RegionX: end {}, owner {}",
        record.end, record.owner
    );

    let requirements = Requirements {
        begin: 40,
        end: 45,
        core_occupancy: 57_600,
    };
    let order_id = scenario
        .market
        .create_order(bob(), para_id, requirements)
        .await?;
    let contributed = scenario
        .market
        .contribute(order_id, charlie(), 5 * UNIT)
        .await?;
    println!("Order {} for {para_id}: {contributed} contributed", order_id.0);

    let fulfillment = scenario
        .market
        .fulfill_order(order_id, region_id, alice())
        .await?;
    println!(
        "Order {} fulfilled in {}: {} paid to seller",
        order_id.0, fulfillment.block, fulfillment.payout
    );

    let item = scenario.market.await_assignment(region_id, para_id).await?;
    println!("Workplan on {CORETIME}: {:?}", item.assignment);

    let holders = scenario
        .custody
        .holders(region_id, &[CORETIME, REGIONX])
        .await?;
    println!("Region holders after fulfillment: {holders:?}");
    Ok(())
}

#[tokio::main(flavor = "current_thread", start_paused = true)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let file = match &cli.config {
        Some(path) => toml::from_str::<FileConfig>(&std::fs::read_to_string(path)?)?,
        None => FileConfig::default(),
    };
    let seed = cli.seed.or(file.seed).unwrap_or(12345);

    let config = SimulationConfig::standard()
        .with_seed(seed)
        .with_network(file.network);
    let scenario = Scenario::start(config, ProtocolConfig::default())?;

    let limit: Duration = *cli.timeout;
    tokio::time::timeout(limit, run(&scenario, ParaId(cli.para_id))).await??;

    let stats = scenario.simulation.stats();
    println!();
    println!("Simulated time:      {:?}", scenario.simulation.now());
    println!("Events processed:    {}", stats.events_processed);
    println!(
        "Extrinsics:          {} ({} rejected)",
        stats.extrinsics_submitted, stats.extrinsics_rejected
    );
    println!(
        "Messages:            {} ({} dropped)",
        stats.messages_sent, stats.messages_dropped
    );
    println!("Headers relayed:     {}", stats.headers_relayed);
    println!("Blocks finalized:    {}", stats.blocks_finalized);
    Ok(())
}
