use serde::{Deserialize, Serialize};

use super::{msg, ConceptError, Msg};
use crate::database::{DatabaseError, DatabaseManager, DocCollection, Document, Patch};
use crate::filter::{Filter, FindOptions, SortSpec, CREATED_FIELD};
use crate::types::{Category, Id};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostOptions {
    #[serde(rename = "backgroundColor", default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDoc {
    pub author: Id,
    pub content: String,
    pub quality_rating: i64,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<PostOptions>,
}

/// Fields a post update may touch. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PostUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<PostOptions>,
}

pub struct PostingConcept {
    posts: DocCollection<PostDoc>,
}

impl PostingConcept {
    pub fn new(db: &DatabaseManager, collection: &str) -> Result<Self, DatabaseError> {
        Ok(Self {
            posts: db.collection(collection)?,
        })
    }

    pub async fn create(
        &self,
        author: Id,
        content: &str,
        category: Category,
        options: Option<PostOptions>,
    ) -> Result<Document<PostDoc>, ConceptError> {
        let id = self
            .posts
            .create_one(&PostDoc {
                author,
                content: content.to_string(),
                quality_rating: 0,
                category,
                options,
            })
            .await?;
        self.get_post(id).await
    }

    pub async fn get_post(&self, id: Id) -> Result<Document<PostDoc>, ConceptError> {
        self.posts
            .read_by_id(id)
            .await?
            .ok_or_else(|| ConceptError::not_found(format!("Post {} does not exist!", id)))
    }

    /// Every post, newest first
    pub async fn get_posts(&self) -> Result<Vec<Document<PostDoc>>, ConceptError> {
        Ok(self
            .posts
            .read_many(Filter::new(), FindOptions::sorted(SortSpec::desc(CREATED_FIELD)))
            .await?)
    }

    pub async fn get_by_author(&self, author: Id) -> Result<Vec<Document<PostDoc>>, ConceptError> {
        Ok(self
            .posts
            .read_many(Filter::new().eq("author", author), FindOptions::default())
            .await?)
    }

    pub async fn get_by_category(&self, category: Category) -> Result<Vec<Document<PostDoc>>, ConceptError> {
        Ok(self
            .posts
            .read_many(Filter::new().eq("category", category), FindOptions::default())
            .await?)
    }

    pub async fn update(&self, id: Id, update: PostUpdate) -> Result<Msg, ConceptError> {
        let patch = Patch::from_present(&update).map_err(DatabaseError::from)?;
        if !patch.is_empty() {
            self.posts
                .partial_update_one(Filter::by_id(id), patch)
                .await
                .map_err(|e| self.missing(id, e))?;
        } else {
            self.get_post(id).await?;
        }
        Ok(msg("Post successfully updated!"))
    }

    pub async fn delete(&self, id: Id) -> Result<Msg, ConceptError> {
        self.posts
            .delete_one(Filter::by_id(id))
            .await
            .map_err(|e| self.missing(id, e))?;
        Ok(msg("Post deleted successfully!"))
    }

    pub async fn increment_quality_rating(&self, id: Id) -> Result<Msg, ConceptError> {
        self.adjust_rating(id, 1).await?;
        Ok(msg("Quality rating of post increased!"))
    }

    pub async fn decrement_quality_rating(&self, id: Id) -> Result<Msg, ConceptError> {
        self.adjust_rating(id, -1).await?;
        Ok(msg("Quality rating of post decreased!"))
    }

    pub async fn assert_author_is_user(&self, id: Id, user: Id) -> Result<(), ConceptError> {
        let post = self.get_post(id).await?;
        if post.author != user {
            return Err(ConceptError::not_allowed("Only the author can change this post!"));
        }
        Ok(())
    }

    // Read-modify-write: concurrent adjustments to one post can lose an update
    async fn adjust_rating(&self, id: Id, delta: i64) -> Result<(), ConceptError> {
        let post = self.get_post(id).await?;
        self.posts
            .partial_update_one(Filter::by_id(id), Patch::new().set("quality_rating", post.quality_rating + delta))
            .await
            .map_err(|e| self.missing(id, e))?;
        Ok(())
    }

    fn missing(&self, id: Id, err: DatabaseError) -> ConceptError {
        match err {
            DatabaseError::NotFound(_) => ConceptError::not_found(format!("Post {} does not exist!", id)),
            other => other.into(),
        }
    }
}
