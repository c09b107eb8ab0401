pub mod download;
pub mod session;
pub mod web;
pub mod webdriver;

pub use session::{Browser, Session, SessionGuard, with_session};
pub use web::{CrawlOutcome, crawl};
pub use webdriver::WebDriverBrowser;
