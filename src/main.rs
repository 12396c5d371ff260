use std::env;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, HttpServer};
use log::info;
use sqlx::postgres::PgPoolOptions;

use dates::SeasonWindow;
use operations::PollOperationsImpl;
use store::file::FilePollStore;
use store::postgres::PgPollStore;
use store::PollStore;

mod dates;
mod ledger;
mod model;
mod operations;
mod paths;
mod store;
mod util;

const DB_URL_KEY: &str = "HOLIDAYPOLL_DB_URL";
const DB_FILE_KEY: &str = "HOLIDAYPOLL_DB_FILE";
const DEFAULT_DB_FILE: &str = "data/polls.json";

const SEASON_OPEN_MONTH_KEY: &str = "HOLIDAYPOLL_SEASON_OPEN_MONTH";
const SEASON_OPEN_DAY_KEY: &str = "HOLIDAYPOLL_SEASON_OPEN_DAY";
const SEASON_CLOSE_MONTH_KEY: &str = "HOLIDAYPOLL_SEASON_CLOSE_MONTH";

fn env_u32(key: &str, default: u32) -> u32 {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .expect(format!("{} must be a number", key).as_str()),
        Err(_) => default,
    }
}

fn season_from_env() -> SeasonWindow {
    let open_month = env_u32(SEASON_OPEN_MONTH_KEY, 7);
    let open_day = env_u32(SEASON_OPEN_DAY_KEY, 15);
    let close_month = env_u32(SEASON_CLOSE_MONTH_KEY, 11);
    SeasonWindow::new(open_month, open_day, close_month)
        .expect("Season window configuration is invalid")
}

async fn build_store() -> Arc<dyn PollStore> {
    match env::var(DB_URL_KEY) {
        Ok(db_url) => {
            let pool = PgPoolOptions::new()
                .min_connections(1)
                .max_connections(4)
                .connect_timeout(Duration::from_secs(2))
                .test_before_acquire(true)
                .connect(&db_url)
                .await
                .expect("Failed to create database pool");
            let store = PgPollStore::new(pool);
            store
                .migrate()
                .await
                .expect("Failed to prepare database schema");
            info!("using the postgres poll store");
            Arc::new(store)
        }
        Err(_) => {
            let path = env::var(DB_FILE_KEY).unwrap_or_else(|_| DEFAULT_DB_FILE.to_string());
            info!("using the file poll store at {}", path);
            Arc::new(FilePollStore::open(path).expect("Failed to open poll database file"))
        }
    }
}

#[actix_web::main]
async fn main() {
    env_logger::init();

    let season = season_from_env();
    let store = build_store().await;
    let ops = PollOperationsImpl::new(store, season);

    let app = move || {
        App::new()
            .data(ops.clone())
            .configure(paths::config::<PollOperationsImpl>)
    };
    HttpServer::new(app)
        .bind(("0.0.0.0", 8080))
        .expect("HTTP server failed to bind to 8080")
        .run()
        .await
        .expect("HTTP Server failed to run");
}
