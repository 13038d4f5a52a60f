use console::Style;

pub fn dim() -> Style {
    Style::new().dim()
}

fn blue() -> Style {
    Style::new().blue()
}

fn magenta() -> Style {
    Style::new().magenta()
}

fn cyan() -> Style {
    Style::new().cyan()
}

fn green() -> Style {
    Style::new().green()
}

fn red() -> Style {
    Style::new().red()
}

fn yellow() -> Style {
    Style::new().yellow()
}

fn bold() -> Style {
    Style::new().bold()
}

fn init_prefix() -> String {
    blue().apply_to("[INIT]").to_string()
}

fn scrape_prefix() -> String {
    magenta().apply_to("[SCRAPE]").to_string()
}

fn score_prefix() -> String {
    yellow().apply_to("[SCORE]").to_string()
}

fn agg_prefix() -> String {
    cyan().apply_to("[AGG]").to_string()
}

fn refs_prefix() -> String {
    green().apply_to("[REFS]").to_string()
}

fn ml_prefix() -> String {
    yellow().apply_to("[ML]").to_string()
}

pub fn log_startup_config(
    database_url: &str,
    subreddits: &[String],
    post_limit: u32,
    use_finbert: bool,
) {
    println!(
        "{} database: {}",
        init_prefix(),
        cyan().apply_to(database_url)
    );
    println!(
        "{} subreddits: {} (limit {} posts each)",
        init_prefix(),
        cyan().apply_to(subreddits.join(", ")),
        bold().apply_to(post_limit)
    );
    println!(
        "{} finbert is {}.",
        init_prefix(),
        if use_finbert {
            green().apply_to("enabled")
        } else {
            yellow().apply_to("disabled")
        }
    );
}

pub fn log_db_status(msg: &str) {
    println!("{} {}", init_prefix(), msg);
}

pub fn log_db_ready() {
    println!("{} database ready.", init_prefix());
}

pub fn log_scrape_start(subreddit: &str) {
    println!(
        "{} scraping r/{}...",
        scrape_prefix(),
        cyan().apply_to(subreddit)
    );
}

pub fn log_scrape_post(post_id: &str) {
    println!(
        "{} fetching comments for {}",
        scrape_prefix(),
        dim().apply_to(post_id)
    );
}

pub fn log_scrape_done(subreddit: &str, posts: usize, comments: usize, ticker_links: usize) {
    println!(
        "{} r/{} done: {} posts, {} comments, {} ticker links",
        scrape_prefix(),
        cyan().apply_to(subreddit),
        bold().apply_to(posts),
        bold().apply_to(comments),
        bold().apply_to(ticker_links)
    );
}

pub fn log_scrape_failed(subreddit: &str, error: &str) {
    println!(
        "{} r/{} {} {}",
        scrape_prefix(),
        cyan().apply_to(subreddit),
        red().apply_to("failed, rolled back:"),
        dim().apply_to(error)
    );
}

pub fn log_score_empty(table: &str) {
    println!(
        "{} [{}] nothing to score.",
        score_prefix(),
        dim().apply_to(table)
    );
}

pub fn log_score_done(table: &str, rows: usize) {
    println!(
        "{} [{}] scored {} rows",
        score_prefix(),
        dim().apply_to(table),
        bold().apply_to(rows)
    );
}

pub fn log_agg_done(rows: usize) {
    println!(
        "{} {} (ticker, date) rollups written",
        agg_prefix(),
        bold().apply_to(rows)
    );
}

pub fn log_refs_attempt(url: &str, attempt: u32, retries: u32) {
    println!(
        "{} fetching {} {}",
        refs_prefix(),
        cyan().apply_to(url),
        dim().apply_to(format!("(attempt {}/{})", attempt, retries))
    );
}

pub fn log_refs_retry(error: &str) {
    println!(
        "{} {} {}",
        refs_prefix(),
        yellow().apply_to("warn:"),
        dim().apply_to(error)
    );
}

pub fn log_refs_feed_rows(url: &str, rows: usize) {
    println!(
        "{} {}: {} raw rows",
        refs_prefix(),
        dim().apply_to(url),
        bold().apply_to(rows)
    );
}

pub fn log_refs_written(count: usize, path: &str) {
    println!(
        "{} wrote {} symbols to {}",
        refs_prefix(),
        bold().apply_to(count),
        cyan().apply_to(path)
    );
}

pub fn log_ml_loading() {
    println!("{} loading zero-shot sentiment model...", ml_prefix());
}

pub fn log_ml_model_loaded(seconds: f32) {
    println!(
        "{} model loaded in {}",
        ml_prefix(),
        dim().apply_to(format!("{seconds:.1}s"))
    );
}

pub fn log_ml_ready() {
    println!("{} model ready!", ml_prefix());
}

pub fn log_ml_error(error: &str) {
    println!("{} {}", ml_prefix(), red().apply_to(error));
}
