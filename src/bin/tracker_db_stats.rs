use anyhow::{Context, Result};
use match_tracker::{Store, TrackerConfig};

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let config = TrackerConfig::from_env();
    let store = Store::open(&config.db_path).with_context(|| format!("open db at {}", config.db_path))?;

    println!("db_path={}", config.db_path);
    for (table, count) in store.table_counts()? {
        println!("{table}: {count}");
    }

    match store.latest_win_state()? {
        Some(row) => println!(
            "last_win_state: ts={} match={} map_win={} match_win={} team={} score={} maps={}",
            row.updated_at,
            row.match_id,
            row.state.map_win,
            row.state.match_win,
            row.state.winning_team.as_deref().unwrap_or("-"),
            row.state.winning_score.as_deref().unwrap_or("-"),
            row.state.map_counts.as_deref().unwrap_or("-"),
        ),
        None => println!("last_win_state: <none>"),
    }

    for m in store.unfinished_matches()? {
        println!("open: {} {} vs {} ({})", m.match_id, m.team1_name, m.team2_name, m.format);
    }

    Ok(())
}
