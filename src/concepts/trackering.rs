use serde::{Deserialize, Serialize};

use super::{msg, ConceptError, Msg};
use crate::database::{DatabaseError, DatabaseManager, DocCollection, Document, Patch};
use crate::filter::{Filter, FindOptions};
use crate::types::Id;

/// Days tracked per habit; valid day indexes are `0..TRACKER_DAYS`
pub const TRACKER_DAYS: usize = 365;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerDoc {
    pub owner: Id,
    pub shared: Vec<Id>,
    pub title: String,
    pub days: Vec<bool>,
}

pub struct TrackeringConcept {
    trackers: DocCollection<TrackerDoc>,
}

impl TrackeringConcept {
    pub fn new(db: &DatabaseManager, collection: &str) -> Result<Self, DatabaseError> {
        Ok(Self {
            trackers: db.collection(collection)?,
        })
    }

    pub async fn make_tracker(&self, owner: Id, title: &str) -> Result<Document<TrackerDoc>, ConceptError> {
        if title.trim().is_empty() {
            return Err(ConceptError::bad_values("Tracker title must be non-empty!"));
        }
        if self.get_tracker_by_name(owner, title).await?.is_some() {
            return Err(ConceptError::not_allowed(format!("Tracker {} already exists!", title)));
        }
        let id = self
            .trackers
            .create_one(&TrackerDoc {
                owner,
                shared: Vec::new(),
                title: title.to_string(),
                days: vec![false; TRACKER_DAYS],
            })
            .await?;
        self.get_tracker_by_id(id)
            .await?
            .ok_or_else(|| ConceptError::not_found("Tracker could not be found!"))
    }

    pub async fn get_trackers(&self, owner: Id) -> Result<Vec<Document<TrackerDoc>>, ConceptError> {
        Ok(self
            .trackers
            .read_many(Filter::new().eq("owner", owner), FindOptions::default())
            .await?)
    }

    pub async fn get_tracker_by_name(&self, owner: Id, title: &str) -> Result<Option<Document<TrackerDoc>>, ConceptError> {
        Ok(self.trackers.read_one(Self::named(owner, title)).await?)
    }

    pub async fn get_tracker_by_id(&self, id: Id) -> Result<Option<Document<TrackerDoc>>, ConceptError> {
        Ok(self.trackers.read_by_id(id).await?)
    }

    /// Trackers other users have shared with `user`
    pub async fn get_shared_trackers(&self, user: Id) -> Result<Vec<Document<TrackerDoc>>, ConceptError> {
        Ok(self
            .trackers
            .read_many(Filter::new().contains("shared", user), FindOptions::default())
            .await?)
    }

    pub async fn share_tracker(&self, owner: Id, title: &str, to: Id) -> Result<Msg, ConceptError> {
        let tracker = self.require(owner, title).await?;
        if !tracker.shared.contains(&to) {
            let mut shared = tracker.shared.clone();
            shared.push(to);
            self.save(&tracker, Patch::new().set_serialized("shared", &shared).map_err(DatabaseError::from)?)
                .await?;
        }
        Ok(msg("Successfully shared tracker!"))
    }

    pub async fn unshare_tracker(&self, owner: Id, title: &str, from: Id) -> Result<Msg, ConceptError> {
        let tracker = self.require(owner, title).await?;
        let shared: Vec<Id> = tracker.shared.iter().copied().filter(|id| *id != from).collect();
        self.save(&tracker, Patch::new().set_serialized("shared", &shared).map_err(DatabaseError::from)?)
            .await?;
        Ok(msg("Successfully unshared tracker."))
    }

    pub async fn check_day(&self, owner: Id, title: &str, day: i64) -> Result<Msg, ConceptError> {
        self.mark(owner, title, day, true).await?;
        Ok(msg("Successfully checked in today!"))
    }

    pub async fn uncheck_day(&self, owner: Id, title: &str, day: i64) -> Result<Msg, ConceptError> {
        self.mark(owner, title, day, false).await?;
        Ok(msg("Successfully unchecked today's progress."))
    }

    pub async fn get_checked_days(&self, owner: Id, title: &str) -> Result<Vec<bool>, ConceptError> {
        Ok(self.require(owner, title).await?.into_fields().days)
    }

    pub async fn get_total_checked_days(&self, owner: Id, title: &str) -> Result<usize, ConceptError> {
        Ok(self.require(owner, title).await?.days.iter().filter(|d| **d).count())
    }

    pub async fn delete_tracker(&self, owner: Id, title: &str) -> Result<Msg, ConceptError> {
        self.trackers.delete_one(Self::named(owner, title)).await.map_err(|e| match e {
            DatabaseError::NotFound(_) => ConceptError::not_found("Tracker could not be found!"),
            other => other.into(),
        })?;
        Ok(msg("Tracker deleted!"))
    }

    async fn mark(&self, owner: Id, title: &str, day: i64, checked: bool) -> Result<(), ConceptError> {
        let idx = usize::try_from(day)
            .ok()
            .filter(|d| *d < TRACKER_DAYS)
            .ok_or_else(|| ConceptError::bad_values(format!("Day must be between 0 and {}!", TRACKER_DAYS - 1)))?;

        let tracker = self.require(owner, title).await?;
        let mut days = tracker.days.clone();
        days.resize(TRACKER_DAYS, false);
        days[idx] = checked;
        self.save(&tracker, Patch::new().set_serialized("days", &days).map_err(DatabaseError::from)?)
            .await
    }

    async fn require(&self, owner: Id, title: &str) -> Result<Document<TrackerDoc>, ConceptError> {
        self.get_tracker_by_name(owner, title)
            .await?
            .ok_or_else(|| ConceptError::not_found("Tracker could not be found!"))
    }

    async fn save(&self, tracker: &Document<TrackerDoc>, patch: Patch) -> Result<(), ConceptError> {
        self.trackers.partial_update_one(Filter::by_id(tracker.id), patch).await?;
        Ok(())
    }

    fn named(owner: Id, title: &str) -> Filter {
        Filter::new().eq("owner", owner).eq("title", title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concept() -> TrackeringConcept {
        TrackeringConcept::new(&DatabaseManager::memory(), "trackers").unwrap()
    }

    #[tokio::test]
    async fn titles_are_unique_per_owner() {
        let trackering = concept();
        let (alice, bob) = (Id::new(), Id::new());
        let run = trackering.make_tracker(alice, "run").await.unwrap();
        assert_eq!(run.days.len(), TRACKER_DAYS);
        assert!(matches!(trackering.make_tracker(alice, "run").await, Err(ConceptError::NotAllowed(_))));
        assert!(trackering.make_tracker(bob, "run").await.is_ok());
        assert!(matches!(trackering.make_tracker(bob, " ").await, Err(ConceptError::BadValues(_))));
        assert_eq!(trackering.get_trackers(alice).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn check_and_uncheck_persist() {
        let trackering = concept();
        let owner = Id::new();
        trackering.make_tracker(owner, "run").await.unwrap();

        trackering.check_day(owner, "run", 0).await.unwrap();
        trackering.check_day(owner, "run", 364).await.unwrap();
        trackering.check_day(owner, "run", 10).await.unwrap();
        assert_eq!(trackering.get_total_checked_days(owner, "run").await.unwrap(), 3);

        trackering.uncheck_day(owner, "run", 10).await.unwrap();
        let days = trackering.get_checked_days(owner, "run").await.unwrap();
        assert!(days[0] && days[364] && !days[10]);
        assert_eq!(trackering.get_total_checked_days(owner, "run").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn out_of_range_days_are_rejected() {
        let trackering = concept();
        let owner = Id::new();
        trackering.make_tracker(owner, "run").await.unwrap();
        assert!(matches!(trackering.check_day(owner, "run", 365).await, Err(ConceptError::BadValues(_))));
        assert!(matches!(trackering.uncheck_day(owner, "run", -1).await, Err(ConceptError::BadValues(_))));
        assert!(matches!(trackering.check_day(owner, "swim", 1).await, Err(ConceptError::NotFound(_))));
    }

    #[tokio::test]
    async fn sharing_is_idempotent_and_persists() {
        let trackering = concept();
        let (owner, friend) = (Id::new(), Id::new());
        trackering.make_tracker(owner, "run").await.unwrap();

        trackering.share_tracker(owner, "run", friend).await.unwrap();
        trackering.share_tracker(owner, "run", friend).await.unwrap();
        let shared = trackering.get_shared_trackers(friend).await.unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].shared, vec![friend]);

        trackering.unshare_tracker(owner, "run", friend).await.unwrap();
        assert!(trackering.get_shared_trackers(friend).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_tracker() {
        let trackering = concept();
        let owner = Id::new();
        trackering.make_tracker(owner, "run").await.unwrap();
        trackering.delete_tracker(owner, "run").await.unwrap();
        assert!(trackering.get_tracker_by_name(owner, "run").await.unwrap().is_none());
        assert!(matches!(trackering.delete_tracker(owner, "run").await, Err(ConceptError::NotFound(_))));
    }
}
