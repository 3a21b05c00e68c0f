use std::env;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use timetable::api::{load_reference_data, HttpTimetableApi};
use timetable::schedule::{WeekKey, WeekScheduleLoader};
use timetable::{EntityId, FetchOutcome, TimetableConfig};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn parse_stage_id(raw: &str) -> EntityId {
    match raw.trim().parse::<i64>() {
        Ok(id) => EntityId::Int(id),
        Err(_) => EntityId::from(raw.trim()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = TimetableConfig::from_env().context("failed to load configuration")?;

    let stage_id = parse_stage_id(&env::var("STAGE_ID").context("STAGE_ID must be set")?);
    let date = match env::var("WEEK_DATE") {
        Ok(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .with_context(|| format!("WEEK_DATE must be YYYY-MM-DD, got {raw:?}"))?,
        Err(_) => Local::now().date_naive(),
    };
    let query = env::var("QUERY").unwrap_or_default();

    let api = Arc::new(
        HttpTimetableApi::with_config(config.http()).context("failed to build HTTP client")?,
    );
    info!(base_url = %api.base_url(), stage_id = %stage_id, "Starting timetable export");

    let reference = load_reference_data(api.as_ref()).await;
    let stage_label = reference
        .stages
        .iter()
        .find(|stage| stage.id.as_ref() == Some(&stage_id))
        .and_then(|stage| stage.name.clone())
        .unwrap_or_else(|| format!("Stage {stage_id}"));

    let key = WeekKey::for_date(stage_id, date);
    let loader = WeekScheduleLoader::new(api);
    if let FetchOutcome::Failed(notice) = loader.load(key.clone()).await {
        bail!(notice.message);
    }

    let view = loader.presentation(&query, &config.layout());
    println!("{} ({})", stage_label, key.label());
    print!("{}", view.render_grid_text());

    if loader.can_print() {
        println!();
        print!("{}", view.print_sheet(stage_label, key.label()).render_text());
    } else {
        info!("No lectures this week; skipping print sheet");
    }

    Ok(())
}
