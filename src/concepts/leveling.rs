use serde::{Deserialize, Serialize};

use super::ConceptError;
use crate::database::{DatabaseError, DatabaseManager, DocCollection, Document, Patch};
use crate::filter::Filter;
use crate::types::Id;

pub const EXP_PER_LEVEL: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDoc {
    pub uid: Id,
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpUpdated {
    pub msg: &'static str,
    pub exp: i64,
}

pub struct LevelingConcept {
    levels: DocCollection<LevelDoc>,
}

impl LevelingConcept {
    pub fn new(db: &DatabaseManager, collection: &str) -> Result<Self, DatabaseError> {
        Ok(Self {
            levels: db.collection(collection)?,
        })
    }

    pub async fn get_exp(&self, uid: Id) -> Result<i64, ConceptError> {
        Ok(self.record(uid).await?.exp)
    }

    pub async fn get_level(&self, uid: Id) -> Result<i64, ConceptError> {
        Ok(self.get_exp(uid).await?.div_euclid(EXP_PER_LEVEL))
    }

    /// Total experience earned from `source`, one entry per activity
    pub async fn calculate_total_exp(&self, uid: Id, source: &[i64]) -> Result<i64, ConceptError> {
        self.record(uid).await?;
        Ok(source.iter().sum())
    }

    /// Recompute the user's experience from `source` and persist it
    pub async fn update_exp(&self, uid: Id, source: &[i64]) -> Result<ExpUpdated, ConceptError> {
        let exp = self.calculate_total_exp(uid, source).await?;
        self.set_exp(uid, exp).await?;
        Ok(ExpUpdated {
            msg: "Exp successfully updated!",
            exp,
        })
    }

    pub async fn add_exp(&self, uid: Id, amount: i64) -> Result<i64, ConceptError> {
        let exp = self.get_exp(uid).await? + amount;
        self.set_exp(uid, exp).await?;
        Ok(exp)
    }

    async fn set_exp(&self, uid: Id, exp: i64) -> Result<(), ConceptError> {
        let record = self.record(uid).await?;
        self.levels
            .partial_update_one(Filter::by_id(record.id), Patch::new().set("exp", exp))
            .await?;
        Ok(())
    }

    // Lazily creates the zero record. Two first reads racing can both create one.
    async fn record(&self, uid: Id) -> Result<Document<LevelDoc>, ConceptError> {
        if let Some(existing) = self.levels.read_one(Filter::new().eq("uid", uid)).await? {
            return Ok(existing);
        }
        let id = self.levels.create_one(&LevelDoc { uid, exp: 0 }).await?;
        Ok(self.levels.read_404(id).await?)
    }
}
