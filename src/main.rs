use crossterm::style::Stylize;
use openlibrary_sync::config::Config;
use openlibrary_sync::store::EntityStore;
use openlibrary_sync::utils::logging::{get_log_buffer, init_tracing};
use openlibrary_sync::{
    QueryClient, ReqwestFetcher, SqliteStore, SyncEngine, SyncOutcome, TracingSink,
};

mod table_display;

use table_display::{display_books, display_records};

fn print_help() {
    println!("{}", "openlibrary-sync - Open Library search and book sync".blue().bold());
    println!();
    println!("{}", "Usage:".yellow());
    println!("  openlibrary-sync <COMMAND> [OPTIONS]");
    println!();
    println!("{}", "Commands:".yellow());
    println!("  {}  - Query the API and print the raw result", "fetch".green());
    println!("  {}   - Query the API and store missing books", "sync".green());
    println!("  {}   - Show stored books", "list".green());
    println!();
    println!("{}", "Options:".yellow());
    println!("  {} - Title to search for", "--title <TEXT>".green());
    println!("  {} - Author to search for", "--author <TEXT>".green());
    println!("  {}        - Print fetch results as a table", "--table".green());
    println!("  {}      - Echo log output to stderr", "--verbose".green());
    println!("  {} - Print a commented default config file", "--generate-config".green());
    println!("  {}         - Show this help", "--help".green());
    println!();
    println!("{}", "Examples:".yellow());
    println!("  openlibrary-sync fetch --title \"dune\" --author \"frank herbert\"");
    println!("  openlibrary-sync sync --title Dune --author \"Frank Herbert\"");
    println!();
}

/// Value of `--flag value` or `--flag=value`; empty when absent
fn option_value(args: &[String], flag: &str) -> String {
    let prefix = format!("{}=", flag);
    if let Some(value) = args.iter().find_map(|arg| arg.strip_prefix(&prefix)) {
        return value.to_string();
    }

    args.iter()
        .position(|arg| arg == flag)
        .and_then(|pos| args.get(pos + 1))
        .filter(|value| !value.starts_with("--"))
        .cloned()
        .unwrap_or_default()
}

fn build_client(config: &Config) -> anyhow::Result<QueryClient<ReqwestFetcher>> {
    let fetcher = ReqwestFetcher::new(config.timeout(), &config.api.user_agent)?;
    Ok(QueryClient::new(&config.api.base_url, fetcher))
}

fn run_fetch(config: &Config, title: &str, author: &str, as_table: bool) -> anyhow::Result<()> {
    let client = build_client(config)?;

    match client.fetch(title, author) {
        Ok(books) if as_table => display_records(&books),
        Ok(books) => println!("{}", serde_json::to_string_pretty(&books)?),
        Err(e) => println!("{}", e),
    }
    Ok(())
}

fn run_sync(config: &Config, title: &str, author: &str) -> anyhow::Result<()> {
    let client = build_client(config)?;
    let database_path = config.database_path()?;
    tracing::debug!(target: "sync", "Using database {}", database_path.display());
    let store = SqliteStore::open(&database_path)?;

    let mut engine = SyncEngine::new(client, store, TracingSink);
    match engine.sync(title, author)? {
        SyncOutcome::Created(count) => {
            println!("{}", format!("Created {} book(s).", count).green());
        }
        SyncOutcome::Duplicate => {
            println!("{}", "Book already exists, nothing created.".yellow());
        }
        // Already reported through the messenger
        SyncOutcome::NoResults | SyncOutcome::Failed(_) => {}
    }
    Ok(())
}

fn run_list(config: &Config) -> anyhow::Result<()> {
    let store = SqliteStore::open(config.database_path()?)?;
    let books = store.list_books()?;
    display_books(&books, &store)
}

fn run(args: &[String]) -> anyhow::Result<()> {
    if args.len() < 2 || args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return Ok(());
    }

    if args.contains(&"--generate-config".to_string()) {
        print!("{}", Config::create_default_with_comments());
        return Ok(());
    }

    let config = Config::load()?;
    let verbose = args.contains(&"--verbose".to_string());
    init_tracing(&config.logging.level, verbose);

    let title = option_value(args, "--title");
    let author = option_value(args, "--author");

    match args[1].as_str() {
        "fetch" => run_fetch(&config, &title, &author, args.contains(&"--table".to_string())),
        "sync" => run_sync(&config, &title, &author),
        "list" => run_list(&config),
        other => {
            print_help();
            Err(anyhow::anyhow!("Unknown command '{}'", other))
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if let Err(e) = run(&args) {
        eprintln!("{}", format!("Error: {:#}", e).red());
        if let Some(buffer) = get_log_buffer() {
            for entry in buffer.get_recent(10) {
                eprintln!("  {}", entry.format_for_display());
            }
        }
        std::process::exit(1);
    }
}
