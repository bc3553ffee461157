use chrono::{Datelike, Duration};
use forecast_board::{
    Dashboard, KmaProvider, LocalIdentity, RegionSelection, RegionTable, SimulatedProvider,
    WeatherProvider,
};
use log::warn;
use serde::Serialize;
use std::error::Error;
use std::sync::Arc;

/// Renders every view once and prints the tables as JSON.
///
/// `FORECAST_PROVIDER=kma` switches to the KMA open API (needs `KMA_API_KEY`),
/// and `RUST_LOG` controls log output.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let provider: Arc<dyn WeatherProvider> = match std::env::var("FORECAST_PROVIDER").as_deref() {
        Ok("kma") => Arc::new(KmaProvider::from_env()),
        _ => Arc::new(SimulatedProvider::default()),
    };
    let identity = match LocalIdentity::from_config_dir() {
        Ok(identity) => identity,
        Err(e) => {
            warn!("{}, session id will not persist", e);
            LocalIdentity::in_memory()
        }
    };
    let dashboard = Dashboard::builder()
        .provider(provider)
        .regions(RegionTable::load().await?)
        .identity(Arc::new(identity))
        .build();
    let today = dashboard.today();
    println!(
        "session {} using provider '{}'",
        dashboard.session_id().await,
        dashboard.provider_name()
    );

    let selection: RegionSelection = ["daegu-jung", "daegu-suseong", "gumi", "pohang"].into();

    let short_range = dashboard
        .short_range()
        .start(today)
        .end(today + Duration::days(1))
        .selection(selection.clone())
        .call()
        .await;
    print_view("short-range", short_range)?;

    let medium_range = dashboard
        .medium_range()
        .start(today + Duration::days(3))
        .end(today + Duration::days(6))
        .selection(selection)
        .call()
        .await;
    print_view("medium-range", medium_range)?;

    let snapshot = dashboard.snapshot().date(today).call().await;
    print_view("snapshot", snapshot)?;

    let history = dashboard
        .history()
        .region("daegu-jung")
        .start_year(today.year() - 5)
        .end_year(today.year())
        .call()
        .await;
    print_view("history", history)?;

    Ok(())
}

fn print_view<T: Serialize, E: Error>(name: &str, result: Result<T, E>) -> serde_json::Result<()> {
    match result {
        Ok(table) => println!("== {name}\n{}", serde_json::to_string_pretty(&table)?),
        Err(e) => println!("== {name}\nunavailable: {e}"),
    }
    Ok(())
}
