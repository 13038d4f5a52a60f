use anyhow::Result;
use std::env;
use std::process;

use stock_sentiment::db::{configure_connection, establish_pool, run_migrations};
use stock_sentiment::reddit::RedditClient;
use stock_sentiment::scoring::{FinbertHandle, VaderScorer};
use stock_sentiment::settings::settings;
use stock_sentiment::utils::{log_db_ready, log_db_status, log_startup_config};
use stock_sentiment::{aggregate, ingest, scoring};

fn print_usage() {
    eprintln!("Usage: stock-sentiment [stage]");
    eprintln!();
    eprintln!("Stages:");
    eprintln!("  scrape     ingest hot posts and comments for each subreddit");
    eprintln!("  score      compute sentiment for unscored (or recent) rows");
    eprintln!("  aggregate  rebuild the per-ticker daily rollup");
    eprintln!();
    eprintln!("With no stage, all three run in order.");
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stage = env::args().nth(1).unwrap_or_else(|| "all".to_string());
    let run_scrape = matches!(stage.as_str(), "all" | "scrape");
    let run_score = matches!(stage.as_str(), "all" | "score");
    let run_aggregate = matches!(stage.as_str(), "all" | "aggregate");
    if !(run_scrape || run_score || run_aggregate) {
        print_usage();
        process::exit(1);
    }

    let s = settings();
    let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| "sentiment.db".to_string());

    log_startup_config(
        &database_url,
        &s.reddit.subreddits,
        s.reddit.post_limit,
        s.scoring.use_finbert,
    );

    log_db_status("Initializing SQLite connection pool...");
    let pool = establish_pool(&database_url);
    {
        let mut conn = pool.get().expect("Failed to get initial connection");
        configure_connection(&mut conn).expect("Failed to configure SQLite connection");
        run_migrations(&mut conn)?;
    }
    log_db_ready();

    if run_scrape {
        let mut reddit = RedditClient::from_env(s.reddit.request_timeout_secs)?;
        ingest::run(
            &pool,
            &mut reddit,
            &s.reddit.subreddits,
            s.reddit.post_limit,
        )
        .await?;
    }

    if run_score {
        let lexicon = VaderScorer::new();
        let model = if s.scoring.use_finbert {
            Some(FinbertHandle::spawn(s.scoring.finbert_max_length)?)
        } else {
            None
        };

        let mut conn = pool.get().expect("Failed to get connection");
        scoring::score_posts(
            &mut conn,
            &lexicon,
            model.as_ref(),
            s.scoring.rescore,
            s.scoring.since_days,
        )?;
        scoring::score_comments(
            &mut conn,
            &lexicon,
            model.as_ref(),
            s.scoring.rescore,
            s.scoring.since_days,
        )?;
    }

    if run_aggregate {
        let mut conn = pool.get().expect("Failed to get connection");
        aggregate::run(&mut conn)?;
    }

    Ok(())
}
