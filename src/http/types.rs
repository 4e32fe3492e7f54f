use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::identity::IdentityProvider;

pub struct AppState {
    pub db: Mutex<Connection>,
    pub db_path: PathBuf,
    pub identity: Arc<dyn IdentityProvider>,
    pub webhook_secret: String,
}

pub type SharedState = Arc<AppState>;
