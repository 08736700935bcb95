use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{msg, ConceptError, Msg};
use crate::database::{DatabaseError, DatabaseManager, DocCollection, Document, Patch};
use crate::filter::{Filter, FindOptions};
use crate::types::{Category, Id};

const NOT_FOUND: &str = "Collection could not be found!";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDoc {
    pub owner: Id,
    /// `None` for the root collection of each category
    pub parent: Option<Category>,
    pub shared: Vec<Id>,
    pub title: String,
    pub contents: Vec<Id>,
    pub deadline: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionCreated {
    pub msg: &'static str,
    pub collection: Document<CollectionDoc>,
}

pub struct CollectioningConcept {
    collections: DocCollection<CollectionDoc>,
}

impl CollectioningConcept {
    pub fn new(db: &DatabaseManager, collection: &str) -> Result<Self, DatabaseError> {
        Ok(Self {
            collections: db.collection(collection)?,
        })
    }

    pub async fn create_collection(
        &self,
        owner: Id,
        parent: Option<Category>,
        title: &str,
        deadline: &str,
    ) -> Result<CollectionCreated, ConceptError> {
        if title.trim().is_empty() {
            return Err(ConceptError::bad_values("Collection title must be non-empty!"));
        }
        // Category titles belong to the root collections
        if parent.is_some() && title.parse::<Category>().is_ok() {
            return Err(ConceptError::not_allowed(format!(
                "{} is reserved for a default collection!",
                title
            )));
        }
        if self.get_collection_by_name(owner, title).await?.is_some() {
            return Err(ConceptError::not_allowed(format!("Collection {} already exists!", title)));
        }
        let id = self
            .collections
            .create_one(&CollectionDoc {
                owner,
                parent,
                shared: Vec::new(),
                title: title.to_string(),
                contents: Vec::new(),
                deadline: deadline.to_string(),
            })
            .await?;
        let collection = self
            .get_collection_by_id(id)
            .await?
            .ok_or_else(|| ConceptError::not_found(NOT_FOUND))?;
        Ok(CollectionCreated {
            msg: "Collection successfully created!",
            collection,
        })
    }

    /// Create whichever of the per-category root collections `owner` is missing.
    /// Returns all six, in category order.
    pub async fn ensure_default_collections(&self, owner: Id) -> Result<Vec<Document<CollectionDoc>>, ConceptError> {
        let mut roots = Vec::with_capacity(Category::ALL.len());
        for category in Category::ALL {
            let root = match self.collections.read_one(Self::root(owner, category)).await? {
                Some(existing) => existing,
                None => self.create_collection(owner, None, category.name(), "").await?.collection,
            };
            roots.push(root);
        }
        Ok(roots)
    }

    pub async fn get_user_collections(&self, owner: Id) -> Result<Vec<Document<CollectionDoc>>, ConceptError> {
        Ok(self
            .collections
            .read_many(Filter::new().eq("owner", owner), FindOptions::default())
            .await?)
    }

    pub async fn get_collection_by_name(
        &self,
        owner: Id,
        title: &str,
    ) -> Result<Option<Document<CollectionDoc>>, ConceptError> {
        Ok(self.collections.read_one(Self::named(owner, title)).await?)
    }

    pub async fn get_collection_by_id(&self, id: Id) -> Result<Option<Document<CollectionDoc>>, ConceptError> {
        Ok(self.collections.read_by_id(id).await?)
    }

    pub async fn get_content(&self, id: Id) -> Result<Vec<Id>, ConceptError> {
        self.get_collection_by_id(id)
            .await?
            .map(|c| c.into_fields().contents)
            .ok_or_else(|| ConceptError::not_found(NOT_FOUND))
    }

    pub async fn add_to_collection(&self, owner: Id, title: &str, content: Id) -> Result<Msg, ConceptError> {
        let collection = self.require(owner, title).await?;
        if !collection.contents.contains(&content) {
            let mut contents = collection.contents.clone();
            contents.push(content);
            self.save(&collection, Self::list_patch("contents", &contents)?).await?;
        }
        Ok(msg("Successfully added to collection!"))
    }

    pub async fn remove_from_collection(&self, owner: Id, title: &str, content: Id) -> Result<Msg, ConceptError> {
        let collection = self.require(owner, title).await?;
        let contents: Vec<Id> = collection.contents.iter().copied().filter(|id| *id != content).collect();
        self.save(&collection, Self::list_patch("contents", &contents)?).await?;
        Ok(msg("Successfully removed from collection."))
    }

    pub async fn share_collection(&self, owner: Id, title: &str, to: Id) -> Result<Msg, ConceptError> {
        let collection = self.require(owner, title).await?;
        if !collection.shared.contains(&to) {
            let mut shared = collection.shared.clone();
            shared.push(to);
            self.save(&collection, Self::list_patch("shared", &shared)?).await?;
        }
        Ok(msg("Successfully shared collection!"))
    }

    pub async fn unshare_collection(&self, owner: Id, title: &str, from: Id) -> Result<Msg, ConceptError> {
        let collection = self.require(owner, title).await?;
        let shared: Vec<Id> = collection.shared.iter().copied().filter(|id| *id != from).collect();
        self.save(&collection, Self::list_patch("shared", &shared)?).await?;
        Ok(msg("Successfully unshared collection!"))
    }

    pub async fn update_collection_deadline(&self, owner: Id, title: &str, deadline: &str) -> Result<Msg, ConceptError> {
        let collection = self.require(owner, title).await?;
        self.save(&collection, Patch::new().set("deadline", deadline)).await?;
        Ok(msg("Successfully changed collection deadline!"))
    }

    pub async fn get_collection_deadline(&self, owner: Id, title: &str) -> Result<String, ConceptError> {
        Ok(self.require(owner, title).await?.into_fields().deadline)
    }

    /// Number of items in the named collection; 0 when `owner` has no such collection
    pub async fn get_collection_length(&self, owner: Id, title: &str) -> Result<usize, ConceptError> {
        Ok(self
            .get_collection_by_name(owner, title)
            .await?
            .map(|c| c.contents.len())
            .unwrap_or(0))
    }

    pub async fn get_shared_collections(&self, user: Id) -> Result<Vec<Document<CollectionDoc>>, ConceptError> {
        Ok(self
            .collections
            .read_many(Filter::new().contains("shared", user), FindOptions::default())
            .await?)
    }

    pub async fn delete_collection(&self, owner: Id, title: &str) -> Result<Msg, ConceptError> {
        self.collections
            .delete_one(Self::named(owner, title))
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound(_) => ConceptError::not_found(NOT_FOUND),
                other => other.into(),
            })?;
        Ok(msg("Collection deleted!"))
    }

    pub async fn count_user_collections(&self, owner: Id) -> Result<u64, ConceptError> {
        Ok(self.collections.count(Filter::new().eq("owner", owner)).await?)
    }

    async fn require(&self, owner: Id, title: &str) -> Result<Document<CollectionDoc>, ConceptError> {
        self.get_collection_by_name(owner, title)
            .await?
            .ok_or_else(|| ConceptError::not_found(NOT_FOUND))
    }

    async fn save(&self, collection: &Document<CollectionDoc>, patch: Patch) -> Result<(), ConceptError> {
        self.collections
            .partial_update_one(Filter::by_id(collection.id), patch)
            .await?;
        Ok(())
    }

    fn list_patch(field: &str, ids: &[Id]) -> Result<Patch, ConceptError> {
        Ok(Patch::new().set_serialized(field, &ids).map_err(DatabaseError::from)?)
    }

    fn named(owner: Id, title: &str) -> Filter {
        Filter::new().eq("owner", owner).eq("title", title)
    }

    fn root(owner: Id, category: Category) -> Filter {
        Self::named(owner, category.name()).eq("parent", Value::Null)
    }
}
