mod items;
mod library;
mod mock;
mod pages;

pub use mock::*;

use crate::{items::items, library::library, pages::pages};
use log::LevelFilter;
use quarry_core::{Connection, Executor};
use std::env;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Suite run by every driver against a live server. Creates its own tables.
pub async fn execute_tests<E: Executor>(connection: Connection<E>) {
    items(&connection).await;
    library(&connection).await;
    pages(&connection).await;
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
