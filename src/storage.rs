use crate::filter::TaskFilter;
use crate::model::TaskStatus;
use crate::store::{sample_store, EntityStore, SCHEMA_VERSION};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;

/// Kanban board column layout, persisted separately from the entities.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BoardLayout {
    pub columns: Vec<BoardColumn>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoardColumn {
    pub title: String,
    pub status: Option<TaskStatus>,
    pub task_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationSettings {
    pub enabled: bool,
    pub remind_before_hours: u32,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            remind_before_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NotificationState {
    pub settings: NotificationSettings,
    pub entries: Vec<NotificationEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationEntry {
    pub id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedSearch {
    pub id: String,
    pub name: String,
    pub filter: TaskFilter,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntegrationConfig {
    pub id: String,
    pub provider: String,
    pub connected: bool,
    #[serde(default)]
    pub settings: serde_json::Value,
}

/// Key-value blob store on disk: one JSON file per persisted key under the
/// data directory. No transactional guarantee; last write wins.
pub struct StorageManager {
    data_dir: PathBuf,
    store_file: PathBuf,
    board_file: PathBuf,
    notifications_file: PathBuf,
    searches_file: PathBuf,
    integrations_file: PathBuf,
}

impl StorageManager {
    pub fn new(base_path: &Path) -> Self {
        let data_dir = base_path.join(".treedo");
        Self {
            store_file: data_dir.join("tasks.json"),
            board_file: data_dir.join("board.json"),
            notifications_file: data_dir.join("notifications.json"),
            searches_file: data_dir.join("searches.json"),
            integrations_file: data_dir.join("integrations.json"),
            data_dir,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub async fn initialize(&self) -> anyhow::Result<()> {
        if !self.data_dir.exists() {
            async_fs::create_dir_all(&self.data_dir).await?;
            println!("[INFO] Created data directory: {:?}", self.data_dir);
        }
        Ok(())
    }

    /// Load the entity snapshot. An absent file yields the sample dataset; a
    /// malformed one is logged and replaced by the sample dataset — loading
    /// never fails the startup.
    pub async fn load_store(&self) -> EntityStore {
        if !self.store_file.exists() {
            return sample_store();
        }
        match async_fs::read_to_string(&self.store_file).await {
            Ok(content) => match serde_json::from_str::<EntityStore>(&content) {
                Ok(store) => migrate(store),
                Err(e) => {
                    eprintln!(
                        "[ERROR] Malformed store blob {:?}: {}; falling back to sample data",
                        self.store_file, e
                    );
                    sample_store()
                }
            },
            Err(e) => {
                eprintln!(
                    "[ERROR] Unreadable store blob {:?}: {}; falling back to sample data",
                    self.store_file, e
                );
                sample_store()
            }
        }
    }

    pub async fn save_store(&self, store: &EntityStore) -> anyhow::Result<()> {
        self.initialize().await?;
        let json_content = serde_json::to_string_pretty(store)?;
        async_fs::write(&self.store_file, json_content).await?;
        Ok(())
    }

    pub async fn load_board(&self) -> BoardLayout {
        self.load_blob(&self.board_file).await
    }

    pub async fn save_board(&self, board: &BoardLayout) -> anyhow::Result<()> {
        self.save_blob(&self.board_file, board).await
    }

    pub async fn load_notifications(&self) -> NotificationState {
        self.load_blob(&self.notifications_file).await
    }

    pub async fn save_notifications(&self, state: &NotificationState) -> anyhow::Result<()> {
        self.save_blob(&self.notifications_file, state).await
    }

    pub async fn load_saved_searches(&self) -> Vec<SavedSearch> {
        self.load_blob(&self.searches_file).await
    }

    pub async fn save_saved_searches(&self, searches: &[SavedSearch]) -> anyhow::Result<()> {
        self.save_blob(&self.searches_file, &searches.to_vec()).await
    }

    pub async fn load_integrations(&self) -> Vec<IntegrationConfig> {
        self.load_blob(&self.integrations_file).await
    }

    pub async fn save_integrations(&self, configs: &[IntegrationConfig]) -> anyhow::Result<()> {
        self.save_blob(&self.integrations_file, &configs.to_vec())
            .await
    }

    async fn load_blob<T: DeserializeOwned + Default>(&self, path: &Path) -> T {
        if !path.exists() {
            return T::default();
        }
        match async_fs::read_to_string(path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(value) => value,
                Err(e) => {
                    eprintln!(
                        "[ERROR] Malformed blob {:?}: {}; falling back to defaults",
                        path, e
                    );
                    T::default()
                }
            },
            Err(e) => {
                eprintln!(
                    "[ERROR] Unreadable blob {:?}: {}; falling back to defaults",
                    path, e
                );
                T::default()
            }
        }
    }

    async fn save_blob<T: Serialize>(&self, path: &Path, value: &T) -> anyhow::Result<()> {
        self.initialize().await?;
        let json_content = serde_json::to_string_pretty(value)?;
        async_fs::write(path, json_content).await?;
        Ok(())
    }

    // --- backups of the entity snapshot ---

    pub async fn create_backup(&self) -> anyhow::Result<PathBuf> {
        if !self.store_file.exists() {
            return Err(anyhow::anyhow!("Store file does not exist"));
        }
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let backup_name = format!("tasks_backup_{}.json", timestamp);
        let backup_path = self.data_dir.join(backup_name);
        async_fs::copy(&self.store_file, &backup_path).await?;
        println!("[INFO] Created backup: {:?}", backup_path);
        Ok(backup_path)
    }

    pub async fn list_backups(&self) -> anyhow::Result<Vec<PathBuf>> {
        let mut backups = Vec::new();
        if !self.data_dir.exists() {
            return Ok(backups);
        }
        let mut entries = async_fs::read_dir(&self.data_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with("tasks_backup_") && name.ends_with(".json") {
                    backups.push(path);
                }
            }
        }
        backups.sort();
        Ok(backups)
    }

    pub async fn cleanup_old_backups(&self, keep_count: usize) -> anyhow::Result<()> {
        let mut backups = self.list_backups().await?;
        if backups.len() <= keep_count {
            return Ok(());
        }
        backups.sort();
        let to_remove = backups.len() - keep_count;
        for backup in backups.iter().take(to_remove) {
            async_fs::remove_file(backup).await?;
            println!("[INFO] Removed old backup: {:?}", backup);
        }
        Ok(())
    }

    pub async fn restore_from_backup(&self, backup_path: &Path) -> anyhow::Result<()> {
        if !backup_path.exists() {
            return Err(anyhow::anyhow!(
                "Backup file does not exist: {:?}",
                backup_path
            ));
        }
        if self.store_file.exists() {
            self.create_backup().await?;
        }
        async_fs::copy(backup_path, &self.store_file).await?;
        println!("[INFO] Restored from backup: {:?}", backup_path);
        Ok(())
    }

    pub async fn export_store(&self, export_path: &Path) -> anyhow::Result<()> {
        let store = self.load_store().await;
        let json_content = serde_json::to_string_pretty(&store)?;
        async_fs::write(export_path, json_content).await?;
        println!("[INFO] Exported data to: {:?}", export_path);
        Ok(())
    }

    pub async fn import_store(&self, import_path: &Path) -> anyhow::Result<()> {
        if !import_path.exists() {
            return Err(anyhow::anyhow!(
                "Import file does not exist: {:?}",
                import_path
            ));
        }
        if self.store_file.exists() {
            self.create_backup().await?;
        }
        let content = async_fs::read_to_string(import_path).await?;
        let store: EntityStore = serde_json::from_str(&content)?;
        self.save_store(&migrate(store)).await?;
        println!("[INFO] Imported data from: {:?}", import_path);
        Ok(())
    }

    pub async fn get_storage_info(&self) -> anyhow::Result<StorageInfo> {
        let mut info = StorageInfo {
            data_dir_exists: self.data_dir.exists(),
            store_file_exists: self.store_file.exists(),
            store_file_size: 0,
            backup_count: 0,
            last_modified: None,
        };
        if info.store_file_exists {
            if let Ok(metadata) = async_fs::metadata(&self.store_file).await {
                info.store_file_size = metadata.len();
                if let Ok(modified) = metadata.modified() {
                    info.last_modified = Some(modified.into());
                }
            }
        }
        info.backup_count = self.list_backups().await?.len();
        Ok(info)
    }
}

/// Schema upgrade hook for persisted snapshots. Version 1 is current; older
/// blobs only need the version stamp refreshed.
fn migrate(mut store: EntityStore) -> EntityStore {
    if store.meta.schema_version < SCHEMA_VERSION {
        println!(
            "[INFO] Migrating store schema {} -> {}",
            store.meta.schema_version, SCHEMA_VERSION
        );
        store.meta.schema_version = SCHEMA_VERSION;
    }
    store
}

#[derive(Debug)]
pub struct StorageInfo {
    pub data_dir_exists: bool,
    pub store_file_exists: bool,
    pub store_file_size: u64,
    pub backup_count: usize,
    pub last_modified: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Project, Task};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_yields_sample_data() {
        let temp_dir = TempDir::new().unwrap();
        let storage = StorageManager::new(temp_dir.path());
        let store = storage.load_store().await;
        assert!(!store.projects.is_empty());
        assert!(!store.tasks.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_blob_falls_back() {
        let temp_dir = TempDir::new().unwrap();
        let storage = StorageManager::new(temp_dir.path());
        storage.initialize().await.unwrap();
        async_fs::write(storage.data_dir.join("tasks.json"), "{not json")
            .await
            .unwrap();
        let store = storage.load_store().await;
        assert!(!store.projects.is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let storage = StorageManager::new(temp_dir.path());
        let mut store = EntityStore::new();
        store.add_project(Project::new("P".to_string())).unwrap();
        store.add_task(Task::new("T".to_string(), None)).unwrap();
        storage.save_store(&store).await.unwrap();
        let loaded = storage.load_store().await;
        assert_eq!(loaded.projects.len(), 1);
        assert_eq!(loaded.tasks.len(), 1);
        assert_eq!(loaded.meta.schema_version, SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_backup_lifecycle() {
        let temp_dir = TempDir::new().unwrap();
        let storage = StorageManager::new(temp_dir.path());
        storage.save_store(&EntityStore::new()).await.unwrap();
        let backup_path = storage.create_backup().await.unwrap();
        assert!(backup_path.exists());
        assert_eq!(storage.list_backups().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_board_defaults_when_absent() {
        let temp_dir = TempDir::new().unwrap();
        let storage = StorageManager::new(temp_dir.path());
        let board = storage.load_board().await;
        assert!(board.columns.is_empty());
        let layout = BoardLayout {
            columns: vec![BoardColumn {
                title: "Doing".to_string(),
                status: Some(TaskStatus::InProgress),
                task_ids: vec![],
            }],
        };
        storage.save_board(&layout).await.unwrap();
        assert_eq!(storage.load_board().await, layout);
    }
}
