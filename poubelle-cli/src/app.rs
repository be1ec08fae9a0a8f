use std::sync::Arc;

use anyhow::{Context, Result};
use poubelle_core::config::PipelineConfig;
use poubelle_core::enrich::Enricher;
use poubelle_core::fetch::Fetcher;
use poubelle_core::ports::AreaFilter;
use poubelle_map::Visualizer;
use poubelle_provider_paris as paris;
use tracing::{error, info, warn};

use crate::Step;

/// Run the selected step(s); `false` when a map was requested and none was produced.
///
/// Stage failures are logged and the pipeline carries on; only setup errors are returned.
pub(crate) async fn run(config: &PipelineConfig, step: Step, area: &str) -> Result<bool> {
    match step {
        Step::Fetch => {
            fetch(config, area).await?;
            Ok(true)
        }
        Step::Enrich => {
            enrich(config, area);
            Ok(true)
        }
        Step::Visualize => Ok(visualize(config, area)),
        Step::All => {
            info!(arrondissement = %area, "running full pipeline");
            fetch(config, area).await?;
            enrich(config, area);
            Ok(visualize(config, area))
        }
    }
}

async fn fetch(config: &PipelineConfig, area: &str) -> Result<()> {
    info!(arrondissement = %area, "fetching Paris open data");
    let port = paris::port(&config.api).context("failed to build HTTP client")?;
    let fetcher = Fetcher::new(
        Arc::new(port),
        Arc::new(config.registry()),
        config.layout(),
        config.api.rows,
    );

    let report = fetcher.fetch_area(&AreaFilter::new(area)).await;
    if report.successes() == 0 {
        warn!("no dataset could be fetched");
    }
    Ok(())
}

fn enrich(config: &PipelineConfig, area: &str) {
    info!("enriching data with flow estimates");
    let enricher = Enricher::new(&config.estimates, &config.network, config.layout());

    if let Err(err) = enricher.run(area) {
        error!(error = %err, "failed to write enrichment artifacts");
    }
}

fn visualize(config: &PipelineConfig, area: &str) -> bool {
    info!("creating interactive map");
    let visualizer = Visualizer::new(
        &config.map,
        config.layout(),
        config.network.default_daily_capacity_kg,
    );

    let map = match visualizer.create_map(area) {
        Ok(Some(map)) => map,
        Ok(None) => {
            error!("failed to create map: no data available");
            return false;
        }
        Err(err) => {
            error!(error = %err, "failed to create map");
            return false;
        }
    };

    match visualizer.save(&map) {
        Ok(path) => {
            info!(path = %path.display(), "map created");
            true
        }
        Err(err) => {
            error!(error = %err, "failed to save map");
            false
        }
    }
}
