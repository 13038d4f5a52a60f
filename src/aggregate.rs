use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::collections::BTreeMap;

use crate::db::{self, DailyRollup, MentionRow};
use crate::utils::log_agg_done;

/// Recompute the per-(ticker, UTC day) rollup from every scored post and
/// comment mention, overwriting prior aggregates key by key. Returns the
/// number of (ticker, date) rows written.
pub fn run(conn: &mut SqliteConnection) -> QueryResult<usize> {
    let mut mentions = db::post_mentions(conn)?;
    mentions.extend(db::comment_mentions(conn)?);

    let rollups = roll_up(&mentions);
    if rollups.is_empty() {
        return Ok(0);
    }

    db::upsert_daily_sentiment(conn, &rollups)?;
    log_agg_done(rollups.len());
    Ok(rollups.len())
}

/// Weighted mean per (ticker, date). The model signed score takes precedence
/// over the lexicon compound; weights are engagement scores clamped at zero.
/// A zero weight sum leaves the mean unset rather than dividing by zero.
pub fn roll_up(mentions: &[MentionRow]) -> Vec<DailyRollup> {
    #[derive(Default)]
    struct Accum {
        weighted: f64,
        weight: i64,
        count: i64,
    }

    let mut by_key: BTreeMap<(String, String), Accum> = BTreeMap::new();

    for mention in mentions {
        let signed = mention.finbert_signed.unwrap_or(mention.vader_compound);
        let weight = mention.score.max(0);

        let entry = by_key
            .entry((mention.symbol.clone(), utc_date(mention.created_utc)))
            .or_default();
        entry.weighted += signed * weight as f64;
        entry.weight += weight;
        entry.count += 1;
    }

    by_key
        .into_iter()
        .map(|((ticker, date), accum)| DailyRollup {
            ticker,
            date,
            sentiment: (accum.weight > 0).then(|| accum.weighted / accum.weight as f64),
            count: accum.count,
            weight_sum: accum.weight,
        })
        .collect()
}

fn utc_date(epoch_secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(epoch_secs, 0)
        .map(|dt| dt.date_naive().format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "1970-01-01".to_string())
}
