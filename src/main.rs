//! Demo driver for the beanbag engine.
//!
//! Reads `beanbag.toml` when present (falling back to an in-memory database
//! otherwise), opens a session and walks through the core operations:
//! dispensing, storing, widening, linking, a parent/child edge, and a final
//! maintenance pass.

use beanbag::bean::Value;
use beanbag::engine::{Engine, EngineConfig};
use beanbag::error::{BeanError, Result};
use beanbag::store::Stat;
use tracing::info;

fn load_config() -> Result<EngineConfig> {
    config::Config::builder()
        .add_source(config::File::with_name("beanbag").required(false))
        .add_source(config::Environment::with_prefix("BEANBAG"))
        .build()
        .and_then(|settings| settings.try_deserialize())
        .map_err(|e| BeanError::Config(e.to_string()))
}

fn run() -> Result<()> {
    let mut engine = Engine::open(load_config()?)?;

    let mut ann = engine.dispense("user");
    ann.set_prop("name", "Ann");
    ann.set_prop("age", 30i64);
    let report = engine.set(&mut ann)?;
    info!(id = report.id, "stored first user");

    let mut bob = engine.dispense("user");
    bob.set_prop("name", "Bob");
    // a fractional age widens the column created by Ann's integer
    bob.set_prop("age", Value::Float(27.5));
    engine.set(&mut bob)?;

    let mut admins = engine.dispense("group");
    admins.set_prop("title", "admins");
    engine.link(&mut admins, &mut ann)?;
    engine.link(&mut admins, &mut bob)?;
    info!(
        members = engine.related(&admins, "user")?.len(),
        "group populated"
    );

    let mut site = engine.dispense("site");
    site.set_prop("host", "example.org");
    let mut page = engine.dispense("page");
    page.set_prop("path", "/index");
    engine.add_child(&mut site, &mut page)?;

    info!(
        users = engine.count_of("user")?,
        mean_age = engine.stat_of("user", "age", Stat::Avg)?,
        "store snapshot"
    );

    engine.optimize(None, None, None)?;
    engine.close()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    if let Err(e) = run() {
        eprintln!("beanbag demo failed: {e}");
        std::process::exit(1);
    }
}
