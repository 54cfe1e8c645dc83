//! Business snapshot provider.
//!
//! The pipeline fetches one snapshot per run and holds it for the run's
//! duration. Edits made through the directory while a run is in flight are
//! not observed by that run.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::model::BusinessSnapshot;
use crate::error::DirectoryError;

/// Source of business snapshots.
#[async_trait]
pub trait BusinessDirectory: Send + Sync {
    /// Fetch the snapshot for a business. `Ok(None)` when it does not exist.
    async fn fetch(&self, business_id: &str) -> Result<Option<BusinessSnapshot>, DirectoryError>;

    /// The default business (first configured), if any.
    async fn first(&self) -> Result<Option<BusinessSnapshot>, DirectoryError>;

    /// Insert or replace a snapshot by id. Returns the stored (normalized) copy.
    async fn upsert(&self, snapshot: BusinessSnapshot) -> Result<BusinessSnapshot, DirectoryError>;
}

/// Directory held in memory, in insertion order.
pub struct InMemoryDirectory {
    businesses: RwLock<Vec<BusinessSnapshot>>,
}

/// A business file holds one snapshot or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum BusinessFile {
    Many(Vec<BusinessSnapshot>),
    One(Box<BusinessSnapshot>),
}

impl InMemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self {
            businesses: RwLock::new(Vec::new()),
        }
    }

    /// Create a directory from already-built snapshots.
    pub fn with_businesses(
        businesses: Vec<BusinessSnapshot>,
    ) -> Result<Self, DirectoryError> {
        let mut normalized = Vec::with_capacity(businesses.len());
        for mut snapshot in businesses {
            snapshot.validate()?;
            snapshot.normalize();
            normalized.push(snapshot);
        }
        Ok(Self {
            businesses: RwLock::new(normalized),
        })
    }

    /// Parse a directory from JSON text.
    pub fn from_json(json: &str) -> Result<Self, DirectoryError> {
        let businesses = match serde_json::from_str::<BusinessFile>(json)? {
            BusinessFile::Many(list) => list,
            BusinessFile::One(snapshot) => vec![*snapshot],
        };
        Self::with_businesses(businesses)
    }

    /// Load a directory from a JSON file. A missing file yields an empty directory.
    pub async fn load_file(path: &Path) -> Result<Self, DirectoryError> {
        let json = match tokio::fs::read_to_string(path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Business file not found, starting with empty directory");
                return Ok(Self::new());
            }
            Err(e) => {
                return Err(DirectoryError::Io {
                    path: path.display().to_string(),
                    source: e,
                });
            }
        };

        let directory = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            businesses = directory.len().await,
            "Loaded business directory"
        );
        Ok(directory)
    }

    /// Number of businesses.
    pub async fn len(&self) -> usize {
        self.businesses.read().await.len()
    }

    /// True if no business is configured.
    pub async fn is_empty(&self) -> bool {
        self.businesses.read().await.is_empty()
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BusinessDirectory for InMemoryDirectory {
    async fn fetch(&self, business_id: &str) -> Result<Option<BusinessSnapshot>, DirectoryError> {
        Ok(self
            .businesses
            .read()
            .await
            .iter()
            .find(|b| b.id == business_id)
            .cloned())
    }

    async fn first(&self) -> Result<Option<BusinessSnapshot>, DirectoryError> {
        Ok(self.businesses.read().await.first().cloned())
    }

    async fn upsert(&self, mut snapshot: BusinessSnapshot) -> Result<BusinessSnapshot, DirectoryError> {
        snapshot.validate()?;
        snapshot.normalize();

        let mut businesses = self.businesses.write().await;
        match businesses.iter_mut().find(|b| b.id == snapshot.id) {
            Some(existing) => {
                debug!(business_id = %snapshot.id, "Replacing business snapshot");
                *existing = snapshot.clone();
            }
            None => {
                debug!(business_id = %snapshot.id, "Adding business snapshot");
                businesses.push(snapshot.clone());
            }
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::business::model::{OpeningHour, Service};

    fn barber() -> BusinessSnapshot {
        BusinessSnapshot::new("barber", "Downtown Barber")
            .with_services(vec![Service::new("Haircut", 30)])
            .open_every_day("09:00", "17:00")
    }

    #[tokio::test]
    async fn fetch_returns_snapshot_copy() {
        let dir = InMemoryDirectory::with_businesses(vec![barber()]).unwrap();
        let snapshot = dir.fetch("barber").await.unwrap().unwrap();
        assert_eq!(snapshot.services.len(), 1);
        assert!(dir.fetch("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn snapshot_does_not_observe_later_edits() {
        let dir = InMemoryDirectory::with_businesses(vec![barber()]).unwrap();
        let snapshot = dir.fetch("barber").await.unwrap().unwrap();

        let edited = barber().with_services(vec![Service::new("Shave", 15)]);
        dir.upsert(edited).await.unwrap();

        assert_eq!(snapshot.services[0].name, "Haircut");
        let fresh = dir.fetch("barber").await.unwrap().unwrap();
        assert_eq!(fresh.services[0].name, "Shave");
        assert_eq!(dir.len().await, 1);
    }

    #[tokio::test]
    async fn upsert_returns_normalized_copy() {
        let dir = InMemoryDirectory::new();
        let stored = dir
            .upsert(BusinessSnapshot::new("salon", "Salon").with_services(vec![
                Service::new("Trim", 20),
                Service::new("Colour", 90),
            ]))
            .await
            .unwrap();
        assert_eq!(stored.services[0].name, "Colour");
        assert_eq!(dir.first().await.unwrap().unwrap(), stored);
    }

    #[tokio::test]
    async fn upsert_rejects_invalid_snapshot() {
        let dir = InMemoryDirectory::new();
        let bad = BusinessSnapshot::new("x", "X")
            .with_opening_hours(vec![OpeningHour::open(8, "09:00", "17:00")]);
        assert!(dir.upsert(bad).await.is_err());
        assert!(dir.is_empty().await);
    }

    #[tokio::test]
    async fn first_is_insertion_order() {
        let dir = InMemoryDirectory::with_businesses(vec![
            barber(),
            BusinessSnapshot::new("salon", "Salon"),
        ])
        .unwrap();
        assert_eq!(dir.first().await.unwrap().unwrap().id, "barber");
        assert!(InMemoryDirectory::new().first().await.unwrap().is_none());
    }

    #[test]
    fn from_json_single_object() {
        let json = r#"{
            "id": "barber",
            "name": "Downtown Barber",
            "services": [{"name": "Shave", "duration_minutes": 15}, {"name": "Haircut", "duration_minutes": 30}],
            "opening_hours": [
                {"day_of_week": 6, "open_time": "00:00", "close_time": "00:00", "is_closed": true},
                {"day_of_week": 0, "open_time": "09:00", "close_time": "17:00"}
            ]
        }"#;
        let dir = InMemoryDirectory::from_json(json).unwrap();
        let businesses = dir.businesses.try_read().unwrap();
        assert_eq!(businesses.len(), 1);
        assert_eq!(businesses[0].services[0].name, "Haircut");
        assert_eq!(businesses[0].opening_hours[0].day_of_week, 0);
    }

    #[test]
    fn from_json_list() {
        let json = r#"[{"id": "a", "name": "A"}, {"id": "b", "name": "B"}]"#;
        let dir = InMemoryDirectory::from_json(json).unwrap();
        assert_eq!(dir.businesses.try_read().unwrap().len(), 2);
    }

    #[test]
    fn from_json_rejects_garbage() {
        assert!(matches!(
            InMemoryDirectory::from_json("not json"),
            Err(DirectoryError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn load_file_reads_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"id": "barber", "name": "Barber"}}"#).unwrap();

        let dir = InMemoryDirectory::load_file(file.path()).await.unwrap();
        assert!(dir.fetch("barber").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn load_missing_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = InMemoryDirectory::load_file(&tmp.path().join("nope.json"))
            .await
            .unwrap();
        assert!(dir.is_empty().await);
    }
}
