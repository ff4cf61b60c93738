// Entry point and top-level page menu.
//
// Every page reads its workbooks through the shared `DataCache`, so a page
// can be revisited without reloading until a source file changes on disk.
// Errors from a page are printed and the menu comes back.
mod cache;
mod config;
mod dapot;
mod error;
mod filter;
mod fuel;
mod loader;
mod logging;
mod output;
mod pages;
mod pivot;
mod prompt;
mod reshape;
mod session;
mod threshold;
mod types;
mod util;

use cache::DataCache;
use config::Config;
use prompt::{read_choice, Prompt, StdinPrompt};
use session::{Page, SessionContext};
use tracing::{error, info};

fn run_page(p: &mut dyn Prompt, cfg: &Config, cache: &mut DataCache, session: &mut SessionContext) {
    println!();
    let result = match session.page {
        Page::FuelTracker => pages::fuel::show(p, cfg, cache, session),
        Page::Availability => pages::availability::show(p, cfg, cache, session),
        Page::Dapot => pages::dapot::show(p, cfg, cache, session),
    };
    if let Err(e) = result {
        error!(page = %session.page, error = %e, "page failed");
        eprintln!("Failed to render {}: {}\n", session.page, e);
    }
}

fn main() {
    logging::init();
    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };
    info!(export_dir = %cfg.export_dir.display(), today = %cfg.today(), "dashboard started");

    let mut session = SessionContext::default();
    let mut cache = DataCache::default();
    let mut prompt = StdinPrompt::default();

    loop {
        println!("CDC Dashboard:");
        for (i, page) in Page::ALL.iter().enumerate() {
            println!("[{}] {}", i + 1, page);
        }
        println!("[0] Exit\n");
        let choice = read_choice(&mut prompt);
        if prompt.closed() {
            break;
        }
        match choice.as_str() {
            "0" => {
                println!("Exiting the program.");
                break;
            }
            choice => match choice.parse::<usize>().ok().and_then(|n| n.checked_sub(1)).and_then(|i| Page::ALL.get(i)) {
                Some(page) => {
                    session.page = *page;
                    run_page(&mut prompt, &cfg, &mut cache, &mut session);
                }
                None => println!("Invalid choice. Please enter 0-{}.\n", Page::ALL.len()),
            },
        }
    }
}
