use crate::{
    core::{
        document::Document,
        vector::{CollectionInfo, Distance, EmbeddedDocument, SearchFilter, SearchHit, VectorStore},
    },
    err,
    error::RagError,
    map_err,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Vector store keeping a single collection in memory and persisting it as
/// JSON at `{directory}/{collection}.json`.
pub struct FsVectorStore {
    directory: PathBuf,
    name: String,
    distance: Distance,
    collection: RwLock<Collection>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Collection {
    dimension: Option<usize>,
    records: BTreeMap<String, Record>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Record {
    content: String,
    metadata: Map<String, Value>,
    embedding: Vec<f32>,
}

impl Record {
    fn to_document(&self) -> Document {
        Document {
            content: self.content.clone(),
            source: self
                .metadata
                .get("source")
                .and_then(Value::as_str)
                .map(String::from),
            metadata: self.metadata.clone(),
        }
    }
}

impl From<&EmbeddedDocument> for Record {
    fn from(document: &EmbeddedDocument) -> Self {
        Self {
            content: document.document.content.clone(),
            metadata: document.document.metadata.clone(),
            embedding: document.embedding.clone(),
        }
    }
}

impl FsVectorStore {
    /// Open the collection `name` in `directory`, creating both if necessary.
    ///
    /// * `directory`: Where collection files are kept.
    /// * `name`: The collection name.
    /// * `distance`: Distance function used for searches.
    pub async fn open(
        directory: impl AsRef<Path>,
        name: &str,
        distance: Distance,
    ) -> Result<Self, RagError> {
        let directory = directory.as_ref().to_path_buf();
        map_err!(tokio::fs::create_dir_all(&directory).await);

        let path = collection_path(&directory, name);

        let collection = if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            let json = map_err!(tokio::fs::read(&path).await);
            map_err!(serde_json::from_slice::<Collection>(&json))
        } else {
            Collection::default()
        };

        info!(
            "Opened collection '{name}' at '{}' with {} document(s)",
            directory.display(),
            collection.records.len()
        );

        Ok(Self {
            directory,
            name: name.to_string(),
            distance,
            collection: RwLock::new(collection),
        })
    }

    fn path(&self) -> PathBuf {
        collection_path(&self.directory, &self.name)
    }

    /// Write the collection to a temporary file and move it into place.
    async fn persist(&self, collection: &Collection) -> Result<(), RagError> {
        let path = self.path();
        let tmp = path.with_extension("json.tmp");

        let json = map_err!(serde_json::to_vec(collection));
        map_err!(tokio::fs::write(&tmp, json).await);
        map_err!(tokio::fs::rename(&tmp, &path).await);

        debug!("Persisted collection '{}' to '{}'", self.name, path.display());

        Ok(())
    }
}

fn collection_path(directory: &Path, name: &str) -> PathBuf {
    directory.join(format!("{name}.json"))
}

/// Fix the dimension of an empty collection or check `embedding` against it.
fn check_dimension(collection: &mut Collection, embedding: &[f32]) -> Result<(), RagError> {
    match collection.dimension {
        None => {
            collection.dimension = Some(embedding.len());
            Ok(())
        }
        Some(dimension) if dimension == embedding.len() => Ok(()),
        Some(dimension) => err!(
            DimensionMismatch,
            "collection has dimension {dimension}, got {}",
            embedding.len()
        ),
    }
}

#[async_trait::async_trait]
impl VectorStore for FsVectorStore {
    fn id(&self) -> &'static str {
        "fs"
    }

    async fn add_documents(
        &self,
        documents: &[EmbeddedDocument],
        batch_size: usize,
    ) -> Result<usize, RagError> {
        if documents.is_empty() {
            return Ok(0);
        }

        let mut collection = self.collection.write().await;

        let expected = collection
            .dimension
            .unwrap_or(documents[0].embedding.len());
        if let Some(document) = documents.iter().find(|d| d.embedding.len() != expected) {
            return err!(
                DimensionMismatch,
                "collection has dimension {expected}, got {}",
                document.embedding.len()
            );
        }
        collection.dimension = Some(expected);

        let mut total = 0;

        for (i, batch) in documents.chunks(batch_size.max(1)).enumerate() {
            let mut added = 0;

            for document in batch {
                let id = document.id();

                if collection.records.contains_key(&id) {
                    debug!("Document '{id}' already exists, skipping");
                    continue;
                }

                collection.records.insert(id, document.into());
                added += 1;
            }

            if added > 0 {
                self.persist(&collection).await?;
            }

            info!("Added batch {}: {added} document(s)", i + 1);
            total += added;
        }

        Ok(total)
    }

    async fn search_similar(
        &self,
        query: &[f32],
        n_results: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<SearchHit>, RagError> {
        let collection = self.collection.read().await;

        let Some(dimension) = collection.dimension else {
            return Ok(vec![]);
        };

        if dimension != query.len() {
            return err!(
                DimensionMismatch,
                "collection has dimension {dimension}, query has {}",
                query.len()
            );
        }

        let mut hits: Vec<(&String, &Record, f32)> = collection
            .records
            .iter()
            .filter(|(_, record)| filter.matches(&record.content, &record.metadata))
            .map(|(id, record)| (id, record, self.distance.between(query, &record.embedding)))
            .collect();

        hits.sort_by(|a, b| a.2.total_cmp(&b.2));
        hits.truncate(n_results);

        debug!("Search returned {} result(s)", hits.len());

        Ok(hits
            .into_iter()
            .map(|(id, record, distance)| SearchHit {
                id: id.clone(),
                document: record.to_document(),
                distance,
            })
            .collect())
    }

    async fn delete_documents(&self, ids: &[String]) -> Result<usize, RagError> {
        let mut collection = self.collection.write().await;

        let removed = ids
            .iter()
            .filter(|id| collection.records.remove(*id).is_some())
            .count();

        if removed > 0 {
            self.persist(&collection).await?;
        }

        info!("Deleted {removed} document(s)");

        Ok(removed)
    }

    async fn update_document(&self, id: &str, document: EmbeddedDocument) -> Result<(), RagError> {
        let mut collection = self.collection.write().await;

        if !collection.records.contains_key(id) {
            return err!(DoesNotExist, "Document with ID '{id}'");
        }

        check_dimension(&mut collection, &document.embedding)?;
        collection.records.insert(id.to_string(), (&document).into());
        self.persist(&collection).await?;

        debug!("Updated document '{id}'");

        Ok(())
    }

    async fn count(&self) -> Result<usize, RagError> {
        Ok(self.collection.read().await.records.len())
    }

    async fn list_collections(&self) -> Result<Vec<String>, RagError> {
        let mut entries = map_err!(tokio::fs::read_dir(&self.directory).await);
        let mut names = vec![];

        while let Some(entry) = map_err!(entries.next_entry().await) {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }

        names.sort();

        Ok(names)
    }

    async fn clear_collection(&self) -> Result<(), RagError> {
        let mut collection = self.collection.write().await;

        let count = collection.records.len();
        collection.records.clear();
        collection.dimension = None;
        self.persist(&collection).await?;

        info!("Cleared {count} document(s) from collection '{}'", self.name);

        Ok(())
    }

    async fn collection_info(&self) -> Result<CollectionInfo, RagError> {
        let collection = self.collection.read().await;

        Ok(CollectionInfo {
            name: self.name.clone(),
            document_count: collection.records.len(),
            persist_directory: self.directory.clone(),
            dimension: collection.dimension,
            distance: self.distance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagErr;
    use tracing_test::traced_test;

    fn embedded(content: &str, source: &str, embedding: Vec<f32>) -> EmbeddedDocument {
        let mut metadata = Map::new();
        metadata.insert("source".to_string(), source.into());
        EmbeddedDocument::new(
            Document {
                content: content.to_string(),
                metadata,
                source: Some(source.to_string()),
            },
            embedding,
        )
    }

    async fn store(dir: &Path) -> FsVectorStore {
        FsVectorStore::open(dir, "documents", Distance::L2).await.unwrap()
    }

    #[tokio::test]
    #[traced_test]
    async fn add_skips_existing_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path()).await;

        let docs = vec![
            embedded("one", "a.txt", vec![1.0, 0.0]),
            embedded("two", "a.txt", vec![0.0, 1.0]),
            embedded("one", "a.txt", vec![1.0, 0.0]),
        ];

        assert_eq!(2, store.add_documents(&docs, 1).await.unwrap());
        assert_eq!(0, store.add_documents(&docs, 100).await.unwrap());
        assert_eq!(0, store.add_documents(&[], 100).await.unwrap());
        assert_eq!(2, store.count().await.unwrap());
        assert!(logs_contain("already exists, skipping"));
    }

    #[tokio::test]
    async fn add_rejects_dimension_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path()).await;

        store
            .add_documents(&[embedded("one", "a.txt", vec![1.0, 0.0])], 10)
            .await
            .unwrap();

        let e = store
            .add_documents(&[embedded("two", "a.txt", vec![1.0])], 10)
            .await
            .unwrap_err();
        assert!(matches!(e.error, RagErr::DimensionMismatch(_)));

        let e = store.search_similar(&[1.0], 1, &SearchFilter::default()).await.unwrap_err();
        assert!(matches!(e.error, RagErr::DimensionMismatch(_)));
    }

    #[tokio::test]
    async fn search_orders_by_distance() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path()).await;

        assert!(store
            .search_similar(&[1.0, 0.0], 5, &SearchFilter::default())
            .await
            .unwrap()
            .is_empty());

        store
            .add_documents(
                &[
                    embedded("far", "a.txt", vec![0.0, 5.0]),
                    embedded("close", "a.txt", vec![1.0, 0.5]),
                    embedded("exact", "b.txt", vec![1.0, 0.0]),
                ],
                10,
            )
            .await
            .unwrap();

        let hits = store
            .search_similar(&[1.0, 0.0], 2, &SearchFilter::default())
            .await
            .unwrap();

        assert_eq!(2, hits.len());
        assert_eq!("exact", hits[0].document.content);
        assert_eq!(0.0, hits[0].distance);
        assert_eq!(Some("b.txt"), hits[0].document.source.as_deref());
        assert_eq!("close", hits[1].document.content);
        assert_eq!(0.25, hits[1].distance);

        let filter = SearchFilter {
            where_metadata: Map::from_iter([("source".to_string(), Value::from("a.txt"))]),
            where_document: None,
        };
        let hits = store.search_similar(&[1.0, 0.0], 5, &filter).await.unwrap();
        assert_eq!(vec!["close", "far"], hits.iter().map(|h| h.document.content.as_str()).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn collection_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = store(dir.path()).await;
            store
                .add_documents(&[embedded("one", "a.txt", vec![1.0, 2.0, 3.0])], 10)
                .await
                .unwrap();
        }

        let store = store(dir.path()).await;
        let info = store.collection_info().await.unwrap();

        assert_eq!("documents", info.name);
        assert_eq!(1, info.document_count);
        assert_eq!(Some(3), info.dimension);
        assert_eq!(Distance::L2, info.distance);
        assert_eq!(vec!["documents"], store.list_collections().await.unwrap());
    }

    #[tokio::test]
    async fn update_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path()).await;

        let original = embedded("one", "a.txt", vec![1.0, 0.0]);
        let id = original.id();
        store.add_documents(&[original], 10).await.unwrap();

        store
            .update_document(&id, embedded("updated", "a.txt", vec![0.0, 1.0]))
            .await
            .unwrap();

        let hits = store
            .search_similar(&[0.0, 1.0], 1, &SearchFilter::default())
            .await
            .unwrap();
        assert_eq!(id, hits[0].id);
        assert_eq!("updated", hits[0].document.content);

        let e = store
            .update_document("missing", embedded("x", "a.txt", vec![0.0, 1.0]))
            .await
            .unwrap_err();
        assert!(matches!(e.error, RagErr::DoesNotExist(_)));

        assert_eq!(1, store.delete_documents(&[id.clone(), "missing".to_string()]).await.unwrap());
        assert_eq!(0, store.count().await.unwrap());
    }

    #[tokio::test]
    async fn clear_resets_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path()).await;

        store
            .add_documents(&[embedded("one", "a.txt", vec![1.0, 0.0])], 10)
            .await
            .unwrap();
        store.clear_collection().await.unwrap();

        assert_eq!(0, store.count().await.unwrap());
        store
            .add_documents(&[embedded("one", "a.txt", vec![1.0])], 10)
            .await
            .unwrap();
        assert_eq!(Some(1), store.collection_info().await.unwrap().dimension);
    }
}
