use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use zettel::{CardId, CardStore, Config, IndexState, NewCard, SearchIndex, StoreError};

/// zettel - numbered knowledge cards with cross-references
#[derive(Parser)]
#[command(name = "zettel")]
#[command(about = "Numbered knowledge cards with symmetric cross-references")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Create a new card
    New(NewCommand),
    /// Show a card's index entry
    Show {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Search cards by title and text
    Search {
        #[arg(value_name = "QUERY")]
        query: String,
        /// Query the SQLite search index instead of scanning cards
        #[arg(long)]
        index: bool,
    },
    /// Print collection statistics
    Stats,
    /// Suggest existing cards related to some text
    Suggest {
        #[arg(value_name = "TEXT")]
        text: String,
    },
    /// Cross-reference a card with other cards
    Link {
        #[arg(value_name = "SOURCE")]
        source: String,
        #[arg(value_name = "TARGET", required = true)]
        targets: Vec<String>,
    },
    /// Maintain the search index
    #[command(subcommand)]
    Index(IndexCommand),
    /// Normalize card index entries and copy missing cross-references
    Repair,
}

/// Create a new card
#[derive(Parser)]
struct NewCommand {
    /// Card title
    #[arg(value_name = "TITLE")]
    title: String,

    /// Card body
    #[arg(value_name = "CONTENT")]
    content: String,

    /// Category: main, frequent, quote, or a parent id such as 3 or 3/rivers
    #[arg(short, long, default_value = "main")]
    category: String,

    /// Comma-separated tags
    #[arg(short, long, value_name = "TAGS")]
    tags: Option<String>,

    /// Comma-separated ids to cross-reference
    #[arg(short, long, value_name = "IDS")]
    refs: Option<String>,

    /// Folder that also receives a copy of the card
    #[arg(long, value_name = "DIR")]
    mirror: Option<PathBuf>,
}

#[derive(Subcommand)]
enum IndexCommand {
    /// Rebuild the search index from the card index
    Rebuild,
    /// Refresh the search index row of one card
    Refresh {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Report whether the search index is up to date
    Status,
}

fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

/// Determines if an error is a user error (vs internal error).
///
/// User errors are bad input: empty titles, unknown categories and ids that
/// do not exist. Everything else is an internal error.
fn is_user_error(error: &anyhow::Error) -> bool {
    if let Some(StoreError::UnknownCategory(_)) = error.downcast_ref::<StoreError>() {
        return true;
    }
    let message = error.to_string();
    message.contains("cannot be empty") || message.contains("not found")
}

fn run(command: Commands) -> Result<()> {
    let config = Config::from_env()?;
    let mut store = CardStore::open(config.clone()).context("Failed to open card store")?;

    match command {
        Commands::New(cmd) => {
            let id = execute_new(&cmd, &mut store)?;
            let search = open_search_index(&config)?;
            search
                .upsert_one(store.index(), &id)
                .context("Failed to refresh search index")?;
            Ok(())
        }
        Commands::Show { id } => execute_show(&id, &store),
        Commands::Search { query, index } => {
            if index {
                execute_index_search(&query, &open_search_index(&config)?)
            } else {
                execute_search(&query, &store)
            }
        }
        Commands::Stats => execute_stats(&store),
        Commands::Suggest { text } => execute_suggest(&text, &store),
        Commands::Link { source, targets } => execute_link(&source, &targets, &mut store),
        Commands::Index(cmd) => execute_index(cmd, &store, open_search_index(&config)?),
        Commands::Repair => {
            let repaired = store.repair_index().context("Failed to repair card index")?;
            println!("Repaired {repaired} card index entries");
            Ok(())
        }
    }
}

fn open_search_index(config: &Config) -> Result<SearchIndex> {
    config.ensure_index_directory()?;
    SearchIndex::open(&config.index_path).context("Failed to open search index")
}

/// Creates a card and prints its id.
///
/// Separated from `run` so it can be tested against a temporary store.
fn execute_new(cmd: &NewCommand, store: &mut CardStore) -> Result<CardId> {
    if cmd.title.trim().is_empty() {
        anyhow::bail!("Card title cannot be empty");
    }

    let mut request = NewCard::new(cmd.title.trim(), cmd.content.as_str())
        .category(cmd.category.as_str())
        .tags(cmd.tags.as_deref().map(parse_tags).unwrap_or_default())
        .cross_references(cmd.refs.as_deref().map(parse_ids).unwrap_or_default());
    if let Some(mirror) = &cmd.mirror {
        request = request.secondary_location(mirror);
    }

    let card = store.create_card(request)?;

    print!("Card created (id: {})", card.id);
    if !card.cross_references.is_empty() {
        let refs: Vec<&str> = card.cross_references.iter().map(CardId::as_str).collect();
        print!(" linked to: {}", refs.join(", "));
    }
    println!();
    println!("{}", card.file_path.display());

    Ok(card.id)
}

fn execute_show(id: &str, store: &CardStore) -> Result<()> {
    let card = store
        .get_card(&CardId::new(id))
        .with_context(|| format!("Card {id} not found"))?;

    println!("{id}: {}", card.title);
    println!("  category: {}", card.category);
    if let Some(created) = card.created {
        println!("  created:  {created}");
    }
    println!("  file:     {}", card.file_path.display());
    if !card.tags.is_empty() {
        let tags: Vec<&str> = card.tags.iter().map(String::as_str).collect();
        println!("  tags:     {}", tags.join(", "));
    }
    if !card.cross_references.is_empty() {
        let refs: Vec<&str> = card.cross_references.iter().map(CardId::as_str).collect();
        println!("  related:  {}", refs.join(", "));
    }
    Ok(())
}

fn execute_search(query: &str, store: &CardStore) -> Result<()> {
    let matches = store.search_cards(query);
    if matches.is_empty() {
        println!("No cards match '{query}'");
    }
    for (id, card) in matches {
        println!("{id}\t{}\t{}", card.title, card.category);
    }
    Ok(())
}

fn execute_index_search(query: &str, search: &SearchIndex) -> Result<()> {
    let rows = search.search(query).context("Search index query failed")?;
    if rows.is_empty() {
        println!("No indexed cards match '{query}'");
    }
    for row in rows {
        println!("{}\t{}\t{}", row.card_id, row.title, row.category);
    }
    Ok(())
}

fn execute_stats(store: &CardStore) -> Result<()> {
    let stats = store.get_statistics()?;
    println!("Total cards:           {}", stats.total_cards);
    println!("Main topics:           {}", stats.main_topics);
    println!("Subtopics:             {}", stats.subtopics);
    println!("Frequently accessed:   {}", stats.frequently_accessed);
    println!("Quotes and excerpts:   {}", stats.quotes_excerpts);
    println!("Cross-referenced cards: {}", stats.cross_references);
    println!("Cross-reference links: {}", stats.cross_reference_edges);
    println!("Directories:");
    for dir in &stats.directories {
        println!("  {}", dir.display());
    }
    Ok(())
}

fn execute_suggest(text: &str, store: &CardStore) -> Result<()> {
    let suggestions = store.suggest_connections(text, None);
    if suggestions.is_empty() {
        println!("No related cards found");
    }
    for id in suggestions {
        let title = store.get_card(&id).map(|c| c.title).unwrap_or_default();
        println!("{id}\t{title}");
    }
    Ok(())
}

fn execute_link(source: &str, targets: &[String], store: &mut CardStore) -> Result<()> {
    let source = CardId::new(source);
    if store.get_card(&source).is_none() {
        anyhow::bail!("Card {source} not found");
    }

    let targets: Vec<CardId> = targets.iter().map(|t| CardId::new(t.as_str())).collect();
    let added = store.link(&source, &targets).context("Failed to link cards")?;
    println!("Linked {added} new pair(s) to {source}");
    Ok(())
}

fn execute_index(cmd: IndexCommand, store: &CardStore, mut search: SearchIndex) -> Result<()> {
    match cmd {
        IndexCommand::Rebuild => {
            let rows = search.full_rebuild(store.index())?;
            println!("Indexed {rows} cards");
        }
        IndexCommand::Refresh { id } => {
            if !search.upsert_one(store.index(), &CardId::new(id.as_str()))? {
                anyhow::bail!("Card {id} not found");
            }
            println!("Refreshed {id}");
        }
        IndexCommand::Status => match search.state(store.index())? {
            IndexState::Empty => println!("Search index is empty"),
            IndexState::Consistent => println!("Search index is up to date"),
            IndexState::PartiallyStale => {
                let stale = search.stale_ids(store.index())?;
                let ids: Vec<&str> = stale.iter().map(CardId::as_str).collect();
                println!("Search index is missing: {}", ids.join(", "));
            }
        },
    }
    Ok(())
}

/// Splits on commas, trims whitespace from each tag, and drops empty entries.
fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_ids(input: &str) -> Vec<CardId> {
    parse_tags(input).into_iter().map(CardId::from).collect()
}
