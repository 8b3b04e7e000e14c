//! Topic registry, persisted like the other stores.
//!
//! The registry is an explicit object handed to whoever needs it; on first
//! run (no backing file) it is seeded with the default topics.

use std::path::PathBuf;
use tracing::info;

use super::JsonCollection;
use crate::error::{NewsdeskError, Result};
use crate::models::{Priority, Topic};

/// Fields accepted when creating or replacing a topic.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicInput {
    pub name: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub priority: Priority,
}

#[derive(Debug)]
pub struct TopicRegistry {
    inner: JsonCollection<Topic>,
}

impl TopicRegistry {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let fresh = !path.exists();
        let registry = Self {
            inner: JsonCollection::open(path).await,
        };
        if fresh {
            let mut guard = registry.inner.lock().await;
            for topic in default_topics() {
                guard.insert(topic);
            }
            guard.commit().await?;
            info!(count = guard.items().len(), "Seeded default topics");
        }
        Ok(registry)
    }

    pub async fn list(&self) -> Vec<Topic> {
        self.inner.snapshot().await
    }

    pub async fn get(&self, id: u64) -> Option<Topic> {
        self.inner.get(id).await
    }

    pub async fn get_by_name(&self, name: &str) -> Option<Topic> {
        self.inner
            .snapshot()
            .await
            .into_iter()
            .find(|t| t.name == name)
    }

    pub async fn create(&self, input: TopicInput) -> Result<Topic> {
        let mut guard = self.inner.lock().await;
        if guard.items().iter().any(|t| t.name == input.name) {
            return Err(NewsdeskError::DuplicateTopic(input.name));
        }
        let topic = guard
            .insert(Topic {
                id: 0,
                name: input.name,
                description: input.description,
                keywords: input.keywords,
                priority: input.priority,
            })
            .clone();
        guard.commit().await?;
        Ok(topic)
    }

    /// Replace every field of topic `id`. `Ok(None)` if it does not exist.
    pub async fn update(&self, id: u64, input: TopicInput) -> Result<Option<Topic>> {
        let mut guard = self.inner.lock().await;
        if guard
            .items()
            .iter()
            .any(|t| t.id != id && t.name == input.name)
        {
            return Err(NewsdeskError::DuplicateTopic(input.name));
        }
        let Some(topic) = guard.get_mut(id) else {
            return Ok(None);
        };
        topic.name = input.name;
        topic.description = input.description;
        topic.keywords = input.keywords;
        topic.priority = input.priority;
        let updated = topic.clone();
        guard.commit().await?;
        Ok(Some(updated))
    }

    pub async fn delete(&self, id: u64) -> Result<bool> {
        let mut guard = self.inner.lock().await;
        if guard.remove(id).is_none() {
            return Ok(false);
        }
        guard.commit().await?;
        Ok(true)
    }
}

/// Topics every fresh installation starts with.
pub fn default_topics() -> Vec<Topic> {
    vec![
        Topic::new(
            "Climate Action",
            "News and updates on climate policy, renewable energy, and environmental initiatives.",
            &["climate change", "renewable energy", "carbon emissions", "green policy", "environmental"],
        ),
        Topic::new(
            "Healthcare",
            "News and updates on healthcare policy, universal coverage, and medical advances.",
            &["healthcare", "medicare", "medicaid", "universal healthcare", "medical research"],
        ),
        Topic::new(
            "Economic Justice",
            "News and updates on economic inequality, labor rights, and progressive economic policies.",
            &["economic inequality", "labor rights", "minimum wage", "wealth tax", "worker protections"],
        ),
        Topic::new(
            "Voting Rights",
            "News and updates on voting access, election security, and democratic reforms.",
            &["voting rights", "election security", "voter suppression", "electoral reform", "democracy"],
        ),
        Topic::new(
            "International News",
            "Global news with a focus on progressive policies and international cooperation.",
            &["international relations", "global cooperation", "united nations", "diplomacy", "global policy"],
        ),
        Topic::new(
            "AI News",
            "News and updates on artificial intelligence, its impacts, and ethical considerations.",
            &["artificial intelligence", "AI ethics", "machine learning", "AI regulation", "AI research"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str) -> TopicInput {
        TopicInput {
            name: name.to_string(),
            description: "Space launches and missions".to_string(),
            keywords: vec!["nasa".into(), "spacex".into()],
            priority: Priority::High,
        }
    }

    #[tokio::test]
    async fn test_first_open_seeds_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = TopicRegistry::open(tmp.path().join("topics.json")).await.unwrap();
        let topics = registry.list().await;
        assert_eq!(topics.len(), 6);
        assert_eq!(topics[0].id, 1);
        assert_eq!(topics[5].name, "AI News");
        assert!(tmp.path().join("topics.json").exists());
    }

    #[tokio::test]
    async fn test_edits_survive_restart() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("topics.json");
        {
            let registry = TopicRegistry::open(&path).await.unwrap();
            let created = registry.create(input("Space")).await.unwrap();
            assert_eq!(created.id, 7);
            assert!(registry.delete(1).await.unwrap());
        }

        let registry = TopicRegistry::open(&path).await.unwrap();
        let topics = registry.list().await;
        assert_eq!(topics.len(), 6);
        assert!(registry.get(1).await.is_none());
        assert_eq!(registry.get_by_name("Space").await.unwrap().priority, Priority::High);
    }

    #[tokio::test]
    async fn test_empty_registry_is_not_reseeded() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("topics.json");
        std::fs::write(&path, "[]").unwrap();
        let registry = TopicRegistry::open(&path).await.unwrap();
        assert!(registry.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_names_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = TopicRegistry::open(tmp.path().join("topics.json")).await.unwrap();
        assert!(matches!(
            registry.create(input("Healthcare")).await,
            Err(NewsdeskError::DuplicateTopic(_))
        ));
        assert!(matches!(
            registry.update(1, input("Healthcare")).await,
            Err(NewsdeskError::DuplicateTopic(_))
        ));
    }

    #[tokio::test]
    async fn test_update_missing_and_existing() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = TopicRegistry::open(tmp.path().join("topics.json")).await.unwrap();
        assert_eq!(registry.update(99, input("Space")).await.unwrap(), None);

        let updated = registry.update(2, input("Health & Care")).await.unwrap().unwrap();
        assert_eq!(updated.id, 2);
        assert_eq!(updated.keywords, vec!["nasa", "spacex"]);
        assert_eq!(registry.get(2).await.unwrap().name, "Health & Care");
    }
}
