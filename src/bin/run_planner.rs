//! Run the financial planner: load configuration, build or read a sales plan,
//! consolidate cash flow and P&L, and write the CSV outputs.

use anyhow::{Context, Result};
use clap::Parser;
use financial_planner::{config, export, FinancialPlanner, PlannerConfig, SalesPlan};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

/// Monthly cash-flow and P&L projections for a sales plan
#[derive(Parser, Debug)]
#[command(name = "run_planner", version, about)]
struct Cli {
    /// Path to the global config YAML
    #[arg(long, default_value = "data/global_config.yaml")]
    global_config: PathBuf,

    /// Path to the products config YAML
    #[arg(long, default_value = "data/productos_config.yaml")]
    products_config: PathBuf,

    /// Directory to store CSV results
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Seed for the sales plan generator (overrides `semilla` in the global config)
    #[arg(long)]
    seed: Option<u64>,

    /// Consolidate this sales plan CSV instead of generating one
    #[arg(long)]
    sales_plan: Option<PathBuf>,

    /// Print the configuration JSON schema and exit
    #[arg(long)]
    print_schema: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.print_schema {
        println!("{}", PlannerConfig::schema_as_json()?);
        return Ok(());
    }

    let config = config::load_config(&cli.global_config, &cli.products_config).with_context(|| {
        format!(
            "Failed to load configuration from {} and {}",
            cli.global_config.display(),
            cli.products_config.display()
        )
    })?;

    let plan = match &cli.sales_plan {
        Some(path) => export::read_sales_plan_file(path)
            .with_context(|| format!("Failed to read sales plan {}", path.display()))?,
        None => generate_plan(&config, cli.seed)?,
    };

    let projection = FinancialPlanner::project(&config, &plan)?;

    let files = export::write_all(
        &cli.output_dir,
        &plan,
        &projection.cash_flow,
        &projection.pnl,
        config.global.fecha_inicio,
    )
    .with_context(|| format!("Failed to write outputs to {}", cli.output_dir.display()))?;

    println!("Sales in plan: {}", plan.len());
    if projection.cash_flow.capital_necesario > 0.0 {
        println!(
            "Capital needed: {:.2} (lowest cumulative flow at month {})",
            projection.cash_flow.capital_necesario, projection.cash_flow.mes_capital_minimo
        );
    } else {
        println!("Capital needed: 0.00");
    }
    for year in projection.pnl.annual() {
        println!(
            "Year {}: sales {:.2}, EBIT {:.2}",
            year.anio, year.total_ventas, year.ebit
        );
    }
    for file in files {
        println!("Wrote {}", file.display());
    }

    Ok(())
}

fn generate_plan(config: &PlannerConfig, seed: Option<u64>) -> Result<SalesPlan> {
    let mut rng = match seed.or(config.global.semilla) {
        Some(s) => {
            info!("Generating sales plan with seed {}", s);
            StdRng::seed_from_u64(s)
        }
        None => StdRng::from_entropy(),
    };
    Ok(FinancialPlanner::generate_plan(config, &mut rng)?)
}
