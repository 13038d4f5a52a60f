use anyhow::{bail, Context, Result};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::utils::{log_refs_attempt, log_refs_feed_rows, log_refs_retry, log_refs_written};

/// Warrant/unit/class designators are appended after one of these; everything
/// from the first separator on is dropped.
const SYMBOL_SEPARATORS: [char; 3] = ['.', '-', '/'];

const FOOTER_PREFIX: &str = "File Creation Time:";

type FeedRow = HashMap<String, String>;

/// Parse a pipe-delimited listing feed body into rows keyed by header column.
/// The trailing `File Creation Time:` footer is discarded first. A body with
/// no data rows is an error so the caller retries it like a failed fetch.
pub fn parse_feed(body: &str) -> Result<Vec<FeedRow>> {
    let mut lines: Vec<&str> = body.trim().lines().collect();
    if matches!(lines.last(), Some(last) if last.starts_with(FOOTER_PREFIX)) {
        lines.pop();
    }

    let mut iter = lines.into_iter();
    let header: Vec<&str> = match iter.next() {
        Some(line) => line.split('|').map(str::trim).collect(),
        None => bail!("Empty response or header only."),
    };

    let rows: Vec<FeedRow> = iter
        .map(|line| {
            header
                .iter()
                .zip(line.split('|'))
                .map(|(col, value)| (col.to_string(), value.trim().to_string()))
                .collect()
        })
        .collect();

    if rows.is_empty() {
        bail!("Empty response or header only.");
    }
    Ok(rows)
}

/// ETF, test-issue and NextShares listings are not plain equities.
pub fn is_equity_issue(row: &FeedRow) -> bool {
    for flag in ["ETF", "Test Issue", "NextShares"] {
        let value = row.get(flag).map(String::as_str).unwrap_or("N");
        if value.eq_ignore_ascii_case("Y") {
            return false;
        }
    }
    true
}

/// Uppercase and truncate at the first warrant/unit/class separator.
pub fn normalize_symbol(symbol: &str) -> String {
    let upper = symbol.trim().to_uppercase();
    match upper.find(&SYMBOL_SEPARATORS[..]) {
        Some(idx) => upper[..idx].to_string(),
        None => upper,
    }
}

/// Reduce feed rows to the set of normalized, equity-eligible symbols of 1-5
/// alphabetic characters.
pub fn collect_symbols(rows: &[FeedRow]) -> BTreeSet<String> {
    rows.iter()
        .filter(|row| is_equity_issue(row))
        .map(|row| normalize_symbol(row.get("Symbol").map(String::as_str).unwrap_or("")))
        .filter(|sym| {
            (1..=5).contains(&sym.len()) && sym.chars().all(|c| c.is_ascii_alphabetic())
        })
        .collect()
}

/// Fetch one feed with bounded retry and linearly increasing backoff. An
/// empty or header-only body counts as a failed attempt.
pub async fn fetch_feed(
    client: &reqwest::Client,
    url: &str,
    retries: u32,
    timeout_secs: u64,
) -> Result<Vec<FeedRow>> {
    let mut last_err = None;

    for attempt in 1..=retries {
        log_refs_attempt(url, attempt, retries);

        let result = async {
            let response = client
                .get(url)
                .header("User-Agent", "curl/8")
                .timeout(Duration::from_secs(timeout_secs))
                .send()
                .await?
                .error_for_status()?;
            let body = response.text().await?;
            parse_feed(&body)
        }
        .await;

        match result {
            Ok(rows) => return Ok(rows),
            Err(e) => {
                log_refs_retry(&e.to_string());
                last_err = Some(e);
                tokio::time::sleep(Duration::from_secs(1 + u64::from(attempt))).await;
            }
        }
    }

    match last_err {
        Some(e) => Err(e).with_context(|| format!("Failed to fetch {}", url)),
        None => bail!("Failed to fetch {}: no attempts made", url),
    }
}

/// Build the reference symbol listing: union of all feeds, sorted, one
/// normalized symbol per line under a `symbol` header.
pub async fn build(
    client: &reqwest::Client,
    feed_urls: &[String],
    out_path: &str,
    retries: u32,
    timeout_secs: u64,
) -> Result<usize> {
    let mut symbols = BTreeSet::new();

    for url in feed_urls {
        let rows = fetch_feed(client, url, retries, timeout_secs).await?;
        log_refs_feed_rows(url, rows.len());
        symbols.extend(collect_symbols(&rows));
    }

    if let Some(parent) = Path::new(out_path).parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut out = String::from("symbol\n");
    for sym in &symbols {
        out.push_str(sym);
        out.push('\n');
    }
    fs::write(out_path, out).with_context(|| format!("Failed to write {}", out_path))?;

    log_refs_written(symbols.len(), out_path);
    Ok(symbols.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = "\
Symbol|Security Name|ETF|Test Issue|NextShares
AAPL|Apple Inc.|N|N|N
BRK.B|Berkshire Hathaway Class B|N|N|N
SPY|SPDR S&P 500 ETF|Y|N|N
ZTEST|Test listing|N|Y|N
TOOLONGG|Too long|N|N|N
File Creation Time: 0101202522:30|||||
";

    #[test]
    fn test_parse_feed_drops_footer() {
        let rows = parse_feed(SAMPLE_FEED).unwrap();
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|r| !r["Symbol"].starts_with("File")));
    }

    #[test]
    fn test_parse_feed_header_only_is_error() {
        let header_only = "Symbol|Security Name|ETF|Test Issue|NextShares\n";
        assert!(parse_feed(header_only).is_err());
        assert!(parse_feed("").is_err());

        let footer_only =
            "Symbol|Security Name|ETF|Test Issue|NextShares\nFile Creation Time: 0101202522:30\n";
        assert!(parse_feed(footer_only).is_err());
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol("BRK.B"), "BRK");
        assert_eq!(normalize_symbol("brk-b"), "BRK");
        assert_eq!(normalize_symbol("AAPL"), "AAPL");
        assert_eq!(normalize_symbol(" msft "), "MSFT");
        assert_eq!(normalize_symbol("ABC/WS"), "ABC");
    }

    #[test]
    fn test_collect_symbols_filters_flags_and_shape() {
        let rows = parse_feed(SAMPLE_FEED).unwrap();
        let symbols = collect_symbols(&rows);

        assert!(symbols.contains("AAPL"));
        assert!(symbols.contains("BRK"));
        // ETF and test issues are excluded, as are symbols outside 1-5 chars.
        assert!(!symbols.contains("SPY"));
        assert!(!symbols.contains("ZTEST"));
        assert!(!symbols.contains("TOOLONGG"));
    }

    #[test]
    fn test_collect_symbols_sorted_and_deduplicated() {
        let feed = "\
Symbol|ETF|Test Issue|NextShares
GME|N|N|N
AMC|N|N|N
GME|N|N|N
";
        let rows = parse_feed(feed).unwrap();
        let symbols: Vec<String> = collect_symbols(&rows).into_iter().collect();
        assert_eq!(symbols, vec!["AMC".to_string(), "GME".to_string()]);
    }
}
