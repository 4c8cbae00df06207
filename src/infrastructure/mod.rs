pub mod json_file_store;
pub mod sqlite_store;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::config::StorageTarget;
use crate::domain::repository::KeyValueStore;
use json_file_store::JsonFileStore;
use sqlite_store::{SqliteKeyValueStore, prepare_sqlite_file};

/// Opens the backend named by the configuration. The slot still needs `init`.
pub async fn open_store(target: &StorageTarget) -> Result<Arc<dyn KeyValueStore>> {
    match target {
        StorageTarget::Sqlite(url) => {
            prepare_sqlite_file(url)?;
            info!(%url, "using sqlite storage");
            Ok(Arc::new(SqliteKeyValueStore::connect(url).await?))
        }
        StorageTarget::JsonDir(dir) => {
            info!(dir = %dir.display(), "using json file storage");
            Ok(Arc::new(JsonFileStore::new(dir.clone())))
        }
    }
}
