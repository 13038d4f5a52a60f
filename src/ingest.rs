use anyhow::{Context, Result};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::db::{self, DbPool, NewComment, NewPost};
use crate::reddit::{PostSnapshot, RedditClient};
use crate::tickers;
use crate::utils::{log_scrape_done, log_scrape_failed, log_scrape_post, log_scrape_start};

#[derive(Debug, Default, Clone, Copy)]
pub struct IngestStats {
    pub posts: usize,
    pub comments: usize,
    pub ticker_links: usize,
}

/// Drive one scrape pass per subreddit, in caller order. A failed pass is
/// logged and rolled back without blocking the remaining subreddits.
pub async fn run(
    pool: &DbPool,
    reddit: &mut RedditClient,
    subreddits: &[String],
    post_limit: u32,
) -> Result<IngestStats> {
    let mut totals = IngestStats::default();

    for name in subreddits {
        match ingest_subreddit(pool, reddit, name, post_limit).await {
            Ok(stats) => {
                totals.posts += stats.posts;
                totals.comments += stats.comments;
                totals.ticker_links += stats.ticker_links;
            }
            Err(e) => log_scrape_failed(name, &e.to_string()),
        }
    }

    Ok(totals)
}

/// One subreddit pass: fetch the ranked listing and every post's flattened
/// comments, then persist the lot in a single transaction. Any error rolls
/// the whole pass back and propagates.
pub async fn ingest_subreddit(
    pool: &DbPool,
    reddit: &mut RedditClient,
    name: &str,
    post_limit: u32,
) -> Result<IngestStats> {
    log_scrape_start(name);

    let mut posts = reddit.hot_posts(name, post_limit).await?;
    for post in &mut posts {
        log_scrape_post(&post.id);
        post.comments = reddit.comments_for(&post.id).await?;
    }

    let mut conn = pool.get().context("Failed to get DB connection")?;
    let stats = conn.transaction(|conn| ingest_snapshots(conn, name, &posts))?;

    log_scrape_done(name, stats.posts, stats.comments, stats.ticker_links);
    Ok(stats)
}

/// The persistence half of a pass. Runs inside the caller's transaction so a
/// failure leaves no partial subreddit data behind.
pub fn ingest_snapshots(
    conn: &mut SqliteConnection,
    subreddit: &str,
    posts: &[PostSnapshot],
) -> QueryResult<IngestStats> {
    let mut stats = IngestStats::default();
    let subreddit_id = db::upsert_subreddit(conn, subreddit)?;

    for post in posts {
        let author_id = db::upsert_author(conn, &author_username(post.author.as_deref()))?;

        let raw = serde_json::json!({
            "id": post.id,
            "subreddit": subreddit,
            "author": post.author,
            "title": post.title,
            "selftext": post.selftext,
            "url": post.url,
            "permalink": post.permalink,
            "score": post.score,
            "num_comments": post.num_comments,
        });

        let post_id = db::upsert_post(
            conn,
            &NewPost {
                reddit_id: post.id.clone(),
                subreddit_id,
                author_id,
                title: post.title.clone(),
                selftext: post.selftext.clone(),
                url: post.url.clone(),
                permalink: post.permalink.clone(),
                score: post.score,
                num_comments: post.num_comments,
                created_utc: post.created_utc,
                raw_json: raw.to_string(),
            },
        )?;
        stats.posts += 1;

        let text = format!("{} {}", post.title, post.selftext);
        for symbol in tickers::extract(&text) {
            let ticker_id = db::upsert_ticker(conn, &symbol)?;
            stats.ticker_links += db::link_post_ticker(conn, post_id, ticker_id)?;
        }

        for comment in &post.comments {
            let comment_author_id =
                db::upsert_author(conn, &author_username(comment.author.as_deref()))?;

            let raw = serde_json::json!({
                "id": comment.id,
                "post_id": post_id,
                "author": comment.author,
                "body": comment.body,
                "score": comment.score,
                "created_utc": comment.created_utc,
            });

            let comment_id = db::upsert_comment(
                conn,
                &NewComment {
                    reddit_id: comment.id.clone(),
                    post_id,
                    author_id: comment_author_id,
                    body: comment.body.clone(),
                    score: comment.score,
                    created_utc: comment.created_utc,
                    // Replies are stored flat; true parent linkage is
                    // intentionally not recorded.
                    parent_comment_id: None,
                    raw_json: raw.to_string(),
                },
            )?;
            stats.comments += 1;

            for symbol in tickers::extract(&comment.body) {
                let ticker_id = db::upsert_ticker(conn, &symbol)?;
                stats.ticker_links += db::link_comment_ticker(conn, comment_id, ticker_id)?;
            }
        }
    }

    Ok(stats)
}

/// Source usernames are prefixed `u_`; deleted or anonymous authors collapse
/// to the `u_deleted` sentinel.
fn author_username(author: Option<&str>) -> String {
    match author {
        Some(name) if !name.is_empty() && name != "[deleted]" => format!("u_{}", name),
        _ => "u_deleted".to_string(),
    }
}
