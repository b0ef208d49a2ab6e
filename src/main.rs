#[macro_use]
extern crate rocket;

mod api;
mod business;
mod db;
mod item;
mod schema;
mod session;
mod store;
mod user;


use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use rocket::fairing::AdHoc;
use rocket::figment::Figment;
use rocket::{Build, Rocket};
use rocket_sync_db_pools::database;
use std::env;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

#[database("db")]
pub struct DbConn(diesel::sqlite::SqliteConnection);

pub struct AppConfig {
    // Whether marking an item done also reactivates a soft-deleted item
    // of that name. Historically always on; kept as a toggle until
    // product decides whether that was intentional.
    pub mark_done_revives: bool,
}

impl AppConfig {
    fn from_env() -> AppConfig {
        AppConfig {
            mark_done_revives: env::var("MARK_DONE_REVIVES")
                .map(|v| !matches!(v.as_str(), "false" | "0" | "no"))
                .unwrap_or(true),
        }
    }
}

fn db_path() -> String {
    env::var("DATABASE_URL").expect("DATABASE_URL must be set")
}

fn build_config() -> Figment {
    rocket::Config::figment().merge(("databases.db.url", db_path()))
}

async fn run_db_migrations(rocket: Rocket<Build>) -> Result<Rocket<Build>, Rocket<Build>> {
    let conn = DbConn::get_one(&rocket)
        .await
        .expect("Could not connect to Database");
    conn.run(|c| {
        // Hold the write lock so that parallel launches (the test suite
        // starts several instances against one file) do not race the
        // migration transaction.
        let _guard = db::DB_LOCK.write().expect("poisoned database lock");
        if let Err(e) = c.run_pending_migrations(MIGRATIONS) {
            // We should not do anything if database failed to migrate
            panic!("Failed to run database migrations: {:?}", e);
        }
    })
    .await;
    Ok(rocket)
}

pub fn build_rocket() -> Rocket<Build> {
    rocket::custom(build_config())
        .manage(AppConfig::from_env())
        .attach(DbConn::fairing())
        .attach(AdHoc::try_on_ignite("Database Migrations", run_db_migrations))
        .mount("/", api::routes())
        .register("/", api::catchers())
}

#[launch]
fn rocket() -> _ {
    dotenvy::dotenv().ok();
    build_rocket()
}
