//! Tool dispatcher and built-in tool executors for Valet.
//!
//! Executors give the assistant the ability to act in the world: search the
//! web, scrape pages, run code and shell commands, manage notes, calendar
//! entries and a wallet, look up identities, time, and weather.
//!
//! Several executors here are deterministic stand-ins for external services
//! (search, image search, OSINT, wallet, vision, weather) so the
//! orchestration loop can be exercised end-to-end without network keys.
//! `command` and `sandbox` run real processes with timeouts; `scrape`
//! performs a real HTTP fetch.

pub mod calendar;
pub mod command;
pub mod dispatcher;
pub mod image_search;
pub mod notes;
pub mod osint;
pub mod sandbox;
pub mod scrape;
pub mod search;
pub mod time;
pub mod vision;
pub mod wallet;
pub mod weather;

pub use dispatcher::ToolDispatcher;

use std::sync::Arc;
use valet_core::memory::MemoryStore;

/// Create a dispatcher with all built-in executors registered.
pub fn default_dispatcher(memory: Option<Arc<dyn MemoryStore>>) -> ToolDispatcher {
    let mut dispatcher = ToolDispatcher::new(memory);
    dispatcher.register(Arc::new(search::SearchTool));
    dispatcher.register(Arc::new(scrape::ScrapeTool::new()));
    dispatcher.register(Arc::new(sandbox::SandboxTool::new()));
    dispatcher.register(Arc::new(command::CommandTool::new()));
    dispatcher.register(Arc::new(notes::NotesTool::new()));
    dispatcher.register(Arc::new(wallet::WalletTool));
    dispatcher.register(Arc::new(calendar::CalendarTool::new()));
    dispatcher.register(Arc::new(image_search::ImageSearchTool));
    dispatcher.register(Arc::new(vision::VisionAnalyzeTool));
    dispatcher.register(Arc::new(osint::OsintLookupTool));
    dispatcher.register(Arc::new(time::GetTimeTool));
    dispatcher.register(Arc::new(weather::GetWeatherTool));
    dispatcher
}
