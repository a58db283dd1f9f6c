use anyhow::{anyhow, bail, Context, Result};
use dotenv::dotenv;
use live_sampler::{match_id_from_url, HltvSampler};
use match_tracker::{MatchFormat, NewMatch, Store, TrackerConfig};

/// add-match <HLTV_URL> [BO1|BO3|BO5]
///
/// Reads team names and series length from the match page and queues the match.
/// The optional format overrides what the page says.
#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(url) = args.next() else {
        bail!("Usage: add-match <HLTV_URL> [BO1|BO3|BO5]");
    };
    let format_override = args.next().map(|f| f.parse::<MatchFormat>()).transpose()?;

    let match_id = match_id_from_url(&url).ok_or_else(|| anyhow!("Malformed HLTV URL: {url}"))?;
    let config = TrackerConfig::from_env();
    let store = Store::open(&config.db_path).context("open tracker db")?;
    if store.load_match(&match_id)?.is_some() {
        bail!("Match {match_id} already exists");
    }

    tracing::info!("Opening {} ...", url);
    let sampler = HltvSampler::new(config.page_load_timeout);
    let info = sampler.fetch_match_info(&url).await?;

    let format = match format_override {
        Some(f) => f,
        None => info
            .best_of
            .and_then(MatchFormat::from_best_of)
            .ok_or_else(|| anyhow!("Match format not found on page, pass BO1/BO3/BO5 explicitly"))?,
    };

    println!("📋 Extracted Match Info:");
    println!("Match ID:      {match_id}");
    println!("Match URL:     {url}");
    println!("Team 1 Name:   {}", info.team1);
    println!("Team 2 Name:   {}", info.team2);
    println!("Match Format:  {format}");

    let new = NewMatch {
        match_id: match_id.clone(),
        match_url: url,
        team1_name: info.team1,
        team2_name: info.team2,
        format,
    };
    match store.register_match(&new)? {
        Some(queue_id) => println!("✅ Queued match {match_id} (queue id {queue_id})"),
        None => bail!("Match {match_id} already exists"),
    }

    Ok(())
}
