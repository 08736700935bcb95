use serde::{Deserialize, Serialize};

use super::{msg, ConceptError, Msg};
use crate::database::{DatabaseError, DatabaseManager, DocCollection, Patch};
use crate::filter::Filter;
use crate::types::{Category, Id};

const NOT_FOUND: &str = "Activity summary was not found for user.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryDoc {
    pub user: Id,
    /// Saved-item counts indexed by `Category::index`
    pub categories: Vec<u64>,
}

pub struct SummarizingConcept {
    summaries: DocCollection<SummaryDoc>,
}

impl SummarizingConcept {
    pub fn new(db: &DatabaseManager, collection: &str) -> Result<Self, DatabaseError> {
        Ok(Self {
            summaries: db.collection(collection)?,
        })
    }

    pub async fn get_summary(&self, user: Id) -> Result<Vec<u64>, ConceptError> {
        self.summaries
            .read_one(Self::of(user))
            .await?
            .map(|s| s.into_fields().categories)
            .ok_or_else(|| ConceptError::not_found(NOT_FOUND))
    }

    /// Replace the user's counts, creating the summary on first use
    pub async fn update_summary(&self, user: Id, categories: Vec<u64>) -> Result<Msg, ConceptError> {
        if categories.len() != Category::ALL.len() {
            return Err(ConceptError::bad_values(format!(
                "Summary needs exactly {} category counts!",
                Category::ALL.len()
            )));
        }
        match self.summaries.read_one(Self::of(user)).await? {
            Some(existing) => {
                let patch = Patch::new()
                    .set_serialized("categories", &categories)
                    .map_err(DatabaseError::from)?;
                self.summaries.partial_update_one(Filter::by_id(existing.id), patch).await?;
            }
            None => {
                self.summaries.create_one(&SummaryDoc { user, categories }).await?;
            }
        }
        Ok(msg("Summary successfully updated!"))
    }

    /// Category with the fewest saved items; ties go to the earliest category
    pub async fn find_low_activity_category(&self, user: Id) -> Result<Category, ConceptError> {
        let counts = self.get_summary(user).await?;
        let mut lowest: Option<(usize, u64)> = None;
        for (idx, count) in counts.iter().copied().enumerate() {
            if lowest.map_or(true, |(_, min)| count < min) {
                lowest = Some((idx, count));
            }
        }
        lowest
            .and_then(|(idx, _)| Category::from_index(idx))
            .ok_or_else(|| ConceptError::not_found(NOT_FOUND))
    }

    fn of(user: Id) -> Filter {
        Filter::new().eq("user", user)
    }
}
