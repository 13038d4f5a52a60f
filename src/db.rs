use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;
use diesel::upsert::excluded;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::schema::{
    authors, comment_sentiment, comment_tickers, comments, daily_sentiment, post_sentiment,
    post_tickers, posts, subreddits, tickers,
};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub fn establish_pool(database_url: &str) -> DbPool {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    Pool::builder()
        .max_size(5)
        .build(manager)
        .expect("Failed to create pool")
}

pub fn configure_connection(conn: &mut SqliteConnection) -> QueryResult<()> {
    conn.batch_execute("PRAGMA busy_timeout = 2000;")?;
    conn.batch_execute("PRAGMA journal_mode = WAL;")?;
    conn.batch_execute("PRAGMA synchronous = NORMAL;")?;
    conn.batch_execute("PRAGMA foreign_keys = ON;")?;
    Ok(())
}

pub fn run_migrations(conn: &mut SqliteConnection) -> anyhow::Result<()> {
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = posts)]
pub struct NewPost {
    pub reddit_id: String,
    pub subreddit_id: i32,
    pub author_id: i32,
    pub title: String,
    pub selftext: String,
    pub url: String,
    pub permalink: String,
    pub score: i64,
    pub num_comments: i64,
    pub created_utc: i64,
    pub raw_json: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = comments)]
pub struct NewComment {
    pub reddit_id: String,
    pub post_id: i32,
    pub author_id: i32,
    pub body: String,
    pub score: i64,
    pub created_utc: i64,
    pub parent_comment_id: Option<i32>,
    pub raw_json: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = post_sentiment)]
pub struct NewPostSentiment {
    pub post_id: i32,
    pub vader_pos: f64,
    pub vader_neg: f64,
    pub vader_neu: f64,
    pub vader_compound: f64,
    pub finbert_label: Option<String>,
    pub finbert_conf: Option<f64>,
    pub finbert_signed: Option<f64>,
    pub scored_at: i64,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = comment_sentiment)]
pub struct NewCommentSentiment {
    pub comment_id: i32,
    pub vader_pos: f64,
    pub vader_neg: f64,
    pub vader_neu: f64,
    pub vader_compound: f64,
    pub finbert_label: Option<String>,
    pub finbert_conf: Option<f64>,
    pub finbert_signed: Option<f64>,
    pub scored_at: i64,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = daily_sentiment)]
pub struct DailyRollup {
    pub ticker: String,
    pub date: String,
    pub sentiment: Option<f64>,
    pub count: i64,
    pub weight_sum: i64,
}

/// A post or comment selected for sentiment scoring.
#[derive(Debug, Clone)]
pub struct ScorableRow {
    pub id: i32,
    pub text: String,
}

/// One scored (post|comment, ticker) mention feeding the daily rollup.
#[derive(Queryable, Debug, Clone)]
pub struct MentionRow {
    pub symbol: String,
    pub created_utc: i64,
    pub score: i64,
    pub vader_compound: f64,
    pub finbert_signed: Option<f64>,
}

// Insert-or-return-existing upserts for the reference tables. Each is a
// fixed, typed statement; repeat calls with the same value return the same id.

pub fn upsert_subreddit(conn: &mut SqliteConnection, value: &str) -> QueryResult<i32> {
    diesel::insert_into(subreddits::table)
        .values(subreddits::name.eq(value))
        .on_conflict(subreddits::name)
        .do_update()
        .set(subreddits::name.eq(excluded(subreddits::name)))
        .returning(subreddits::id)
        .get_result(conn)
}

pub fn upsert_author(conn: &mut SqliteConnection, value: &str) -> QueryResult<i32> {
    diesel::insert_into(authors::table)
        .values(authors::username.eq(value))
        .on_conflict(authors::username)
        .do_update()
        .set(authors::username.eq(excluded(authors::username)))
        .returning(authors::id)
        .get_result(conn)
}

pub fn upsert_ticker(conn: &mut SqliteConnection, value: &str) -> QueryResult<i32> {
    diesel::insert_into(tickers::table)
        .values(tickers::symbol.eq(value))
        .on_conflict(tickers::symbol)
        .do_update()
        .set(tickers::symbol.eq(excluded(tickers::symbol)))
        .returning(tickers::id)
        .get_result(conn)
}

/// Upsert a post by its reddit id. On conflict only the mutable engagement
/// fields are refreshed; title, body, url and the original snapshot stay as
/// first written.
pub fn upsert_post(conn: &mut SqliteConnection, post: &NewPost) -> QueryResult<i32> {
    diesel::insert_into(posts::table)
        .values(post)
        .on_conflict(posts::reddit_id)
        .do_update()
        .set((
            posts::score.eq(excluded(posts::score)),
            posts::num_comments.eq(excluded(posts::num_comments)),
        ))
        .returning(posts::id)
        .get_result(conn)
}

/// Upsert a comment by its reddit id; only the score is refreshed on conflict.
pub fn upsert_comment(conn: &mut SqliteConnection, comment: &NewComment) -> QueryResult<i32> {
    diesel::insert_into(comments::table)
        .values(comment)
        .on_conflict(comments::reddit_id)
        .do_update()
        .set(comments::score.eq(excluded(comments::score)))
        .returning(comments::id)
        .get_result(conn)
}

pub fn link_post_ticker(
    conn: &mut SqliteConnection,
    post_id_val: i32,
    ticker_id_val: i32,
) -> QueryResult<usize> {
    diesel::insert_or_ignore_into(post_tickers::table)
        .values((
            post_tickers::post_id.eq(post_id_val),
            post_tickers::ticker_id.eq(ticker_id_val),
        ))
        .execute(conn)
}

pub fn link_comment_ticker(
    conn: &mut SqliteConnection,
    comment_id_val: i32,
    ticker_id_val: i32,
) -> QueryResult<usize> {
    diesel::insert_or_ignore_into(comment_tickers::table)
        .values((
            comment_tickers::comment_id.eq(comment_id_val),
            comment_tickers::ticker_id.eq(ticker_id_val),
        ))
        .execute(conn)
}

/// Select posts for scoring. `rescore=false` picks rows without a sentiment
/// row; `rescore=true` picks rows created at or after `cutoff_utc` regardless
/// of whether they were scored before.
pub fn posts_for_scoring(
    conn: &mut SqliteConnection,
    rescore: bool,
    cutoff_utc: i64,
) -> QueryResult<Vec<ScorableRow>> {
    let rows: Vec<(i32, String, String)> = if rescore {
        posts::table
            .filter(posts::created_utc.ge(cutoff_utc))
            .select((posts::id, posts::title, posts::selftext))
            .load(conn)?
    } else {
        posts::table
            .left_join(post_sentiment::table)
            .filter(post_sentiment::post_id.nullable().is_null())
            .select((posts::id, posts::title, posts::selftext))
            .load(conn)?
    };

    Ok(rows
        .into_iter()
        .map(|(id, title, selftext)| ScorableRow {
            id,
            text: format!("{} {}", title, selftext),
        })
        .collect())
}

pub fn comments_for_scoring(
    conn: &mut SqliteConnection,
    rescore: bool,
    cutoff_utc: i64,
) -> QueryResult<Vec<ScorableRow>> {
    let rows: Vec<(i32, String)> = if rescore {
        comments::table
            .filter(comments::created_utc.ge(cutoff_utc))
            .select((comments::id, comments::body))
            .load(conn)?
    } else {
        comments::table
            .left_join(comment_sentiment::table)
            .filter(comment_sentiment::comment_id.nullable().is_null())
            .select((comments::id, comments::body))
            .load(conn)?
    };

    Ok(rows
        .into_iter()
        .map(|(id, body)| ScorableRow { id, text: body })
        .collect())
}

/// Overwrite all sentiment sub-scores for the given posts in one transaction.
pub fn upsert_post_sentiments(
    conn: &mut SqliteConnection,
    rows: &[NewPostSentiment],
) -> QueryResult<usize> {
    conn.transaction(|conn| {
        for row in rows {
            diesel::insert_into(post_sentiment::table)
                .values(row)
                .on_conflict(post_sentiment::post_id)
                .do_update()
                .set((
                    post_sentiment::vader_pos.eq(excluded(post_sentiment::vader_pos)),
                    post_sentiment::vader_neg.eq(excluded(post_sentiment::vader_neg)),
                    post_sentiment::vader_neu.eq(excluded(post_sentiment::vader_neu)),
                    post_sentiment::vader_compound.eq(excluded(post_sentiment::vader_compound)),
                    post_sentiment::finbert_label.eq(excluded(post_sentiment::finbert_label)),
                    post_sentiment::finbert_conf.eq(excluded(post_sentiment::finbert_conf)),
                    post_sentiment::finbert_signed.eq(excluded(post_sentiment::finbert_signed)),
                    post_sentiment::scored_at.eq(excluded(post_sentiment::scored_at)),
                ))
                .execute(conn)?;
        }
        Ok(rows.len())
    })
}

pub fn upsert_comment_sentiments(
    conn: &mut SqliteConnection,
    rows: &[NewCommentSentiment],
) -> QueryResult<usize> {
    conn.transaction(|conn| {
        for row in rows {
            diesel::insert_into(comment_sentiment::table)
                .values(row)
                .on_conflict(comment_sentiment::comment_id)
                .do_update()
                .set((
                    comment_sentiment::vader_pos.eq(excluded(comment_sentiment::vader_pos)),
                    comment_sentiment::vader_neg.eq(excluded(comment_sentiment::vader_neg)),
                    comment_sentiment::vader_neu.eq(excluded(comment_sentiment::vader_neu)),
                    comment_sentiment::vader_compound
                        .eq(excluded(comment_sentiment::vader_compound)),
                    comment_sentiment::finbert_label.eq(excluded(comment_sentiment::finbert_label)),
                    comment_sentiment::finbert_conf.eq(excluded(comment_sentiment::finbert_conf)),
                    comment_sentiment::finbert_signed
                        .eq(excluded(comment_sentiment::finbert_signed)),
                    comment_sentiment::scored_at.eq(excluded(comment_sentiment::scored_at)),
                ))
                .execute(conn)?;
        }
        Ok(rows.len())
    })
}

/// Every scored post mention: (symbol, created_utc, engagement score, lexicon
/// compound, optional model signed score).
pub fn post_mentions(conn: &mut SqliteConnection) -> QueryResult<Vec<MentionRow>> {
    post_tickers::table
        .inner_join(tickers::table)
        .inner_join(posts::table.inner_join(post_sentiment::table))
        .select((
            tickers::symbol,
            posts::created_utc,
            posts::score,
            post_sentiment::vader_compound,
            post_sentiment::finbert_signed,
        ))
        .load(conn)
}

pub fn comment_mentions(conn: &mut SqliteConnection) -> QueryResult<Vec<MentionRow>> {
    comment_tickers::table
        .inner_join(tickers::table)
        .inner_join(comments::table.inner_join(comment_sentiment::table))
        .select((
            tickers::symbol,
            comments::created_utc,
            comments::score,
            comment_sentiment::vader_compound,
            comment_sentiment::finbert_signed,
        ))
        .load(conn)
}

/// Replace the aggregate for each (ticker, date) key with the freshly
/// recomputed value.
pub fn upsert_daily_sentiment(
    conn: &mut SqliteConnection,
    rows: &[DailyRollup],
) -> QueryResult<usize> {
    conn.transaction(|conn| {
        for row in rows {
            diesel::insert_into(daily_sentiment::table)
                .values(row)
                .on_conflict((daily_sentiment::ticker, daily_sentiment::date))
                .do_update()
                .set((
                    daily_sentiment::sentiment.eq(excluded(daily_sentiment::sentiment)),
                    daily_sentiment::count.eq(excluded(daily_sentiment::count)),
                    daily_sentiment::weight_sum.eq(excluded(daily_sentiment::weight_sum)),
                ))
                .execute(conn)?;
        }
        Ok(rows.len())
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_upsert_ref_idempotent() {
        let mut conn = memory_conn();

        let first = upsert_subreddit(&mut conn, "stocks").unwrap();
        let second = upsert_subreddit(&mut conn, "stocks").unwrap();
        assert_eq!(first, second);

        let total: i64 = subreddits::table.count().get_result(&mut conn).unwrap();
        assert_eq!(total, 1);

        let other = upsert_subreddit(&mut conn, "investing").unwrap();
        assert_ne!(first, other);
    }

    #[test]
    fn test_upsert_ticker_idempotent() {
        let mut conn = memory_conn();

        let first = upsert_ticker(&mut conn, "GME").unwrap();
        let second = upsert_ticker(&mut conn, "GME").unwrap();
        assert_eq!(first, second);

        let total: i64 = tickers::table.count().get_result(&mut conn).unwrap();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_post_refresh_keeps_immutable_fields() {
        let mut conn = memory_conn();
        let sub = upsert_subreddit(&mut conn, "stocks").unwrap();
        let author = upsert_author(&mut conn, "u_tester").unwrap();

        let original = sample_post("abc123", sub, author);
        let first_id = upsert_post(&mut conn, &original).unwrap();

        let mut rescrape = sample_post("abc123", sub, author);
        rescrape.title = "edited title".to_string();
        rescrape.score = 42;
        rescrape.num_comments = 7;
        let second_id = upsert_post(&mut conn, &rescrape).unwrap();

        assert_eq!(first_id, second_id);

        let (title, score, num_comments): (String, i64, i64) = posts::table
            .find(first_id)
            .select((posts::title, posts::score, posts::num_comments))
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(title, "GME to the moon");
        assert_eq!(score, 42);
        assert_eq!(num_comments, 7);
    }

    #[test]
    fn test_comment_refresh_score_only() {
        let mut conn = memory_conn();
        let sub = upsert_subreddit(&mut conn, "stocks").unwrap();
        let author = upsert_author(&mut conn, "u_tester").unwrap();
        let post_id = upsert_post(&mut conn, &sample_post("abc123", sub, author)).unwrap();

        let original = sample_comment("c1", post_id, author);
        let first_id = upsert_comment(&mut conn, &original).unwrap();

        let mut rescrape = sample_comment("c1", post_id, author);
        rescrape.body = "edited body".to_string();
        rescrape.score = 99;
        let second_id = upsert_comment(&mut conn, &rescrape).unwrap();

        assert_eq!(first_id, second_id);

        let (body, score): (String, i64) = comments::table
            .find(first_id)
            .select((comments::body, comments::score))
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(body, "GME is the play");
        assert_eq!(score, 99);
    }

    #[test]
    fn test_link_pair_unique() {
        let mut conn = memory_conn();
        let sub = upsert_subreddit(&mut conn, "stocks").unwrap();
        let author = upsert_author(&mut conn, "u_tester").unwrap();
        let post_id = upsert_post(&mut conn, &sample_post("abc123", sub, author)).unwrap();
        let ticker_id = upsert_ticker(&mut conn, "GME").unwrap();

        link_post_ticker(&mut conn, post_id, ticker_id).unwrap();
        link_post_ticker(&mut conn, post_id, ticker_id).unwrap();

        let total: i64 = post_tickers::table.count().get_result(&mut conn).unwrap();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_scoring_selection_modes() {
        let mut conn = memory_conn();
        let sub = upsert_subreddit(&mut conn, "stocks").unwrap();
        let author = upsert_author(&mut conn, "u_tester").unwrap();

        let mut recent = sample_post("recent", sub, author);
        recent.created_utc = 1_700_000_000;
        let recent_id = upsert_post(&mut conn, &recent).unwrap();

        let mut stale = sample_post("stale", sub, author);
        stale.created_utc = 1_600_000_000;
        let stale_id = upsert_post(&mut conn, &stale).unwrap();

        // Score only the stale one.
        upsert_post_sentiments(
            &mut conn,
            &[NewPostSentiment {
                post_id: stale_id,
                vader_pos: 0.0,
                vader_neg: 0.0,
                vader_neu: 1.0,
                vader_compound: 0.0,
                finbert_label: None,
                finbert_conf: None,
                finbert_signed: None,
                scored_at: 1_700_000_000,
            }],
        )
        .unwrap();

        // rescore=false: only the unscored row, regardless of age.
        let unscored = posts_for_scoring(&mut conn, false, 0).unwrap();
        assert_eq!(unscored.len(), 1);
        assert_eq!(unscored[0].id, recent_id);

        // rescore=true: only rows inside the window, scored or not.
        let windowed = posts_for_scoring(&mut conn, true, 1_650_000_000).unwrap();
        assert_eq!(windowed.len(), 1);
        assert_eq!(windowed[0].id, recent_id);

        let everything = posts_for_scoring(&mut conn, true, 0).unwrap();
        assert_eq!(everything.len(), 2);
    }

    #[test]
    fn test_sentiment_upsert_overwrites() {
        let mut conn = memory_conn();
        let sub = upsert_subreddit(&mut conn, "stocks").unwrap();
        let author = upsert_author(&mut conn, "u_tester").unwrap();
        let post_id = upsert_post(&mut conn, &sample_post("abc123", sub, author)).unwrap();

        let first = NewPostSentiment {
            post_id,
            vader_pos: 0.5,
            vader_neg: 0.0,
            vader_neu: 0.5,
            vader_compound: 0.6,
            finbert_label: Some("positive".to_string()),
            finbert_conf: Some(0.9),
            finbert_signed: Some(0.9),
            scored_at: 1_700_000_000,
        };
        upsert_post_sentiments(&mut conn, &[first]).unwrap();

        let second = NewPostSentiment {
            post_id,
            vader_pos: 0.1,
            vader_neg: 0.3,
            vader_neu: 0.6,
            vader_compound: -0.2,
            finbert_label: None,
            finbert_conf: None,
            finbert_signed: None,
            scored_at: 1_700_000_500,
        };
        upsert_post_sentiments(&mut conn, &[second]).unwrap();

        let (compound, label, scored_at): (f64, Option<String>, i64) = post_sentiment::table
            .find(post_id)
            .select((
                post_sentiment::vader_compound,
                post_sentiment::finbert_label,
                post_sentiment::scored_at,
            ))
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(compound, -0.2);
        assert_eq!(label, None);
        assert_eq!(scored_at, 1_700_000_500);

        let total: i64 = post_sentiment::table.count().get_result(&mut conn).unwrap();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_daily_upsert_overwrites_key() {
        let mut conn = memory_conn();

        let first = DailyRollup {
            ticker: "GME".to_string(),
            date: "2024-01-02".to_string(),
            sentiment: Some(0.5),
            count: 3,
            weight_sum: 12,
        };
        upsert_daily_sentiment(&mut conn, &[first]).unwrap();

        let second = DailyRollup {
            ticker: "GME".to_string(),
            date: "2024-01-02".to_string(),
            sentiment: None,
            count: 5,
            weight_sum: 0,
        };
        upsert_daily_sentiment(&mut conn, &[second]).unwrap();

        let rows: Vec<(Option<f64>, i64, i64)> = daily_sentiment::table
            .select((
                daily_sentiment::sentiment,
                daily_sentiment::count,
                daily_sentiment::weight_sum,
            ))
            .load(&mut conn)
            .unwrap();
        assert_eq!(rows, vec![(None, 5, 0)]);
    }
}
