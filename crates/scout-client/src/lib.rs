pub mod cleaner;
pub mod crawler;
pub mod gemini;

#[cfg(feature = "browser")]
pub mod browser;

#[cfg(feature = "browser")]
pub use browser::{ChromiumDriver, ChromiumLauncher};
pub use cleaner::HtmdCleaner;
pub use crawler::PageCrawler;
pub use gemini::GeminiSource;
