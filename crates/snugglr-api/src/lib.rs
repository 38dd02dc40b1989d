pub mod chats;
pub mod confessions;
pub mod error;
pub mod matchpool;
pub mod messages;
pub mod middleware;
pub(crate) mod project;

use std::sync::Arc;

use snugglr_db::Database;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
}
