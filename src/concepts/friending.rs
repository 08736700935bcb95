use serde::{Deserialize, Serialize};

use super::{msg, ConceptError, Msg};
use crate::database::{DatabaseError, DatabaseManager, DocCollection, Document, Patch};
use crate::filter::{Filter, FindOptions};
use crate::types::Id;

const ALREADY_FRIENDS: &str = "Users are already friends!";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendshipDoc {
    pub user1: Id,
    pub user2: Id,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl From<RequestStatus> for serde_json::Value {
    fn from(status: RequestStatus) -> Self {
        let name = match status {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        };
        serde_json::Value::String(name.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendRequestDoc {
    pub from: Id,
    pub to: Id,
    pub status: RequestStatus,
}

pub struct FriendingConcept {
    friends: DocCollection<FriendshipDoc>,
    requests: DocCollection<FriendRequestDoc>,
}

impl FriendingConcept {
    pub fn new(db: &DatabaseManager, friends: &str, requests: &str) -> Result<Self, DatabaseError> {
        Ok(Self {
            friends: db.collection(friends)?,
            requests: db.collection(requests)?,
        })
    }

    pub async fn send_request(&self, from: Id, to: Id) -> Result<Msg, ConceptError> {
        if from == to {
            return Err(ConceptError::not_allowed("Cannot send a friend request to yourself!"));
        }
        if self.are_friends(from, to).await? {
            return Err(ConceptError::not_allowed(ALREADY_FRIENDS));
        }
        if self.pending(from, to).await?.is_some() || self.pending(to, from).await?.is_some() {
            return Err(ConceptError::not_allowed("A pending friend request already exists!"));
        }
        self.requests
            .create_one(&FriendRequestDoc { from, to, status: RequestStatus::Pending })
            .await?;
        Ok(msg("Sent request!"))
    }

    /// Accepting from someone who is already a friend (e.g. through a follow) only resolves the request
    pub async fn accept_request(&self, from: Id, to: Id) -> Result<Msg, ConceptError> {
        self.resolve_pending(from, to, RequestStatus::Accepted).await?;
        if !self.are_friends(from, to).await? {
            self.add_friend(from, to).await?;
        }
        Ok(msg("Accepted request!"))
    }

    pub async fn reject_request(&self, from: Id, to: Id) -> Result<Msg, ConceptError> {
        self.resolve_pending(from, to, RequestStatus::Rejected).await?;
        Ok(msg("Rejected request!"))
    }

    /// Withdraw a pending request
    pub async fn remove_request(&self, from: Id, to: Id) -> Result<Msg, ConceptError> {
        self.requests
            .delete_one(Self::pending_filter(from, to))
            .await
            .map_err(Self::no_request)?;
        Ok(msg("Removed request!"))
    }

    /// Requests sent or received by `user`, oldest first
    pub async fn get_requests(&self, user: Id) -> Result<Vec<Document<FriendRequestDoc>>, ConceptError> {
        let mut all = self
            .requests
            .read_many(Filter::new().eq("from", user), FindOptions::default())
            .await?;
        all.extend(
            self.requests
                .read_many(Filter::new().eq("to", user), FindOptions::default())
                .await?
                .into_iter()
                .filter(|r| r.from != user),
        );
        all.sort_by(|a, b| a.date_created.cmp(&b.date_created));
        Ok(all)
    }

    pub async fn get_friends(&self, user: Id) -> Result<Vec<Id>, ConceptError> {
        let mut friends: Vec<Id> = self
            .friends
            .read_many(Filter::new().eq("user1", user), FindOptions::default())
            .await?
            .into_iter()
            .map(|f| f.user2)
            .collect();
        friends.extend(
            self.friends
                .read_many(Filter::new().eq("user2", user), FindOptions::default())
                .await?
                .into_iter()
                .map(|f| f.user1),
        );
        Ok(friends)
    }

    pub async fn remove_friend(&self, user: Id, friend: Id) -> Result<Msg, ConceptError> {
        let friendship = match self.friendship(user, friend).await? {
            Some(f) => f,
            None => return Err(ConceptError::not_found("Friendship not found!")),
        };
        self.friends.delete_one(Filter::by_id(friendship.id)).await?;
        Ok(msg("Unfriended!"))
    }

    pub async fn add_friend(&self, user1: Id, user2: Id) -> Result<(), ConceptError> {
        if self.are_friends(user1, user2).await? {
            return Err(ConceptError::not_allowed(ALREADY_FRIENDS));
        }
        self.friends.create_one(&FriendshipDoc { user1, user2 }).await?;
        Ok(())
    }

    pub async fn are_friends(&self, user1: Id, user2: Id) -> Result<bool, ConceptError> {
        Ok(self.friendship(user1, user2).await?.is_some())
    }

    async fn friendship(&self, a: Id, b: Id) -> Result<Option<Document<FriendshipDoc>>, ConceptError> {
        if let Some(f) = self.friends.read_one(Filter::new().eq("user1", a).eq("user2", b)).await? {
            return Ok(Some(f));
        }
        Ok(self.friends.read_one(Filter::new().eq("user1", b).eq("user2", a)).await?)
    }

    async fn pending(&self, from: Id, to: Id) -> Result<Option<Document<FriendRequestDoc>>, ConceptError> {
        Ok(self.requests.read_one(Self::pending_filter(from, to)).await?)
    }

    async fn resolve_pending(&self, from: Id, to: Id, status: RequestStatus) -> Result<(), ConceptError> {
        self.requests
            .partial_update_one(Self::pending_filter(from, to), Patch::new().set("status", status))
            .await
            .map_err(Self::no_request)?;
        Ok(())
    }

    fn pending_filter(from: Id, to: Id) -> Filter {
        Filter::new()
            .eq("from", from)
            .eq("to", to)
            .eq("status", RequestStatus::Pending)
    }

    fn no_request(err: DatabaseError) -> ConceptError {
        match err {
            DatabaseError::NotFound(_) => ConceptError::not_found("Pending friend request does not exist!"),
            other => other.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concept() -> FriendingConcept {
        FriendingConcept::new(&DatabaseManager::memory(), "friends", "friend_requests").unwrap()
    }

    #[tokio::test]
    async fn request_accept_and_unfriend() {
        let friending = concept();
        let (a, b) = (Id::new(), Id::new());

        friending.send_request(a, b).await.unwrap();
        assert!(matches!(friending.send_request(b, a).await, Err(ConceptError::NotAllowed(_))));
        assert_eq!(friending.get_requests(b).await.unwrap().len(), 1);

        friending.accept_request(a, b).await.unwrap();
        assert!(friending.are_friends(b, a).await.unwrap());
        assert_eq!(friending.get_friends(a).await.unwrap(), vec![b]);
        assert_eq!(friending.get_friends(b).await.unwrap(), vec![a]);

        let requests = friending.get_requests(a).await.unwrap();
        assert_eq!(requests[0].status, RequestStatus::Accepted);
        assert!(matches!(friending.send_request(a, b).await, Err(ConceptError::NotAllowed(_))));

        friending.remove_friend(b, a).await.unwrap();
        assert!(!friending.are_friends(a, b).await.unwrap());
        assert!(matches!(friending.remove_friend(a, b).await, Err(ConceptError::NotFound(_))));
    }

    #[tokio::test]
    async fn reject_and_remove_need_a_pending_request() {
        let friending = concept();
        let (a, b) = (Id::new(), Id::new());

        assert!(matches!(friending.accept_request(a, b).await, Err(ConceptError::NotFound(_))));
        assert!(matches!(friending.remove_request(a, b).await, Err(ConceptError::NotFound(_))));

        friending.send_request(a, b).await.unwrap();
        friending.reject_request(a, b).await.unwrap();
        assert!(!friending.are_friends(a, b).await.unwrap());
        assert!(matches!(friending.reject_request(a, b).await, Err(ConceptError::NotFound(_))));

        // A rejected request no longer blocks a new one
        friending.send_request(a, b).await.unwrap();
        friending.remove_request(a, b).await.unwrap();
        assert_eq!(friending.get_requests(a).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn accepting_from_an_existing_friend_resolves_the_request() {
        let friending = concept();
        let (creator, reader) = (Id::new(), Id::new());

        friending.send_request(creator, reader).await.unwrap();
        friending.add_friend(reader, creator).await.unwrap();

        friending.accept_request(creator, reader).await.unwrap();
        assert_eq!(friending.get_friends(reader).await.unwrap(), vec![creator]);
        assert_eq!(friending.get_requests(reader).await.unwrap()[0].status, RequestStatus::Accepted);
        assert!(matches!(
            friending.accept_request(creator, reader).await,
            Err(ConceptError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn cannot_befriend_self_or_add_twice() {
        let friending = concept();
        let (a, b) = (Id::new(), Id::new());
        assert!(matches!(friending.send_request(a, a).await, Err(ConceptError::NotAllowed(_))));
        friending.add_friend(a, b).await.unwrap();
        assert!(matches!(friending.add_friend(b, a).await, Err(ConceptError::NotAllowed(_))));
    }
}
