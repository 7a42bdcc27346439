mod config;
mod joke;
mod logging;
mod model;
mod search;
mod store;
mod ui;
mod validate;
mod view;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use log::info;

use config::Config;
use joke::JokeFetcher;
use store::MemoryStore;
use view::ContactListView;

#[derive(Parser, Debug)]
#[command(name = "supercontacts", version, about = "Terminal contact list")]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Contacts seed file, overrides `contacts` from the configuration
    #[arg(long, value_name = "PATH")]
    contacts: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print contacts whose name or phone contains QUERY
    List(ListArgs),
    /// Check whether PHONE would be accepted by the add form
    CheckPhone(CheckPhoneArgs),
    /// Fetch and print one joke
    Joke,
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Search term (matches name and phone)
    query: Option<String>,
}

#[derive(Args, Debug)]
struct CheckPhoneArgs {
    phone: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = config::load(cli.config.as_deref())?;
    if let Some(path) = cli.contacts {
        config.contacts = Some(path);
    }

    let _logger = logging::init(&config.log.level, &config.log.dir)?;
    if let Some(path) = &config.config_path {
        info!("event=config_loaded path={}", path.display());
    }

    let mut store = load_store(&config)?;

    match cli.command {
        Some(Command::List(args)) => handle_list(&mut store, args),
        Some(Command::CheckPhone(args)) => handle_check_phone(&mut store, args),
        Some(Command::Joke) => handle_joke(&config),
        None => {
            let mut app = ui::app::App::new(&mut store, &config)?;
            app.run()
        }
    }
}

fn load_store(config: &Config) -> Result<MemoryStore> {
    let store = match &config.contacts {
        Some(path) => MemoryStore::load(path)?,
        None => MemoryStore::new(),
    };
    info!("event=store_ready count={}", store.len());
    Ok(store)
}

fn handle_list(store: &mut MemoryStore, args: ListArgs) -> Result<()> {
    let query = args.query.unwrap_or_default();
    let mut view = ContactListView::new(store);
    view.set_search(query.as_str());
    let results = view.visible_contacts();

    if query.is_empty() {
        println!("{} contact(s)", results.len());
    } else if results.is_empty() {
        println!("No matches for \"{}\"", query);
    } else {
        println!("Found {} contact(s) matching \"{}\"", results.len(), query);
    }

    // phone<TAB>name<TAB>favorite marker
    for contact in results {
        let marker = if contact.is_favorite { "*" } else { "-" };
        println!("{}\t{}\t{}", contact.phone, contact.name, marker);
    }

    Ok(())
}

fn handle_check_phone(store: &mut MemoryStore, args: CheckPhoneArgs) -> Result<()> {
    let mut view = ContactListView::new(store);
    view.set_phone(args.phone);
    let check = view.phone_check();
    info!("event=phone_checked result={:?}", check);
    println!("{}", check.label());
    Ok(())
}

fn handle_joke(config: &Config) -> Result<()> {
    let fetcher = JokeFetcher::new(&config.joke)?;
    let joke = fetcher.fetch_now()?;
    println!("{}", joke);
    Ok(())
}
