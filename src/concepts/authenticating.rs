use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use uuid::Uuid;

use super::{msg, ConceptError, Msg};
use crate::database::document::timestamp;
use crate::database::{DatabaseError, DatabaseManager, DocCollection, Document, Patch};
use crate::filter::{Filter, FindOptions, ID_FIELD};
use crate::types::{Id, Role};

pub const DELETED_USER: &str = "DELETED_USER";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDoc {
    pub username: String,
    /// `salt$sha256(salt + password)`
    pub password: String,
    pub role: Role,
}

/// A user as returned to callers; never carries the password hash
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    pub username: String,
    pub role: Role,
    #[serde(rename = "dateCreated", with = "timestamp")]
    pub date_created: DateTime<Utc>,
    #[serde(rename = "dateUpdated", with = "timestamp")]
    pub date_updated: DateTime<Utc>,
}

impl From<Document<UserDoc>> for User {
    fn from(doc: Document<UserDoc>) -> Self {
        Self {
            id: doc.id,
            date_created: doc.date_created,
            date_updated: doc.date_updated,
            username: doc.fields.username,
            role: doc.fields.role,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserCreated {
    pub msg: &'static str,
    pub user: User,
}

fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{}${:x}", salt, hasher.finalize())
}

fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, _)) => hash_password(password, salt) == stored,
        None => false,
    }
}

fn new_password_hash(password: &str) -> String {
    hash_password(password, &Uuid::new_v4().simple().to_string())
}

pub struct AuthenticatingConcept {
    users: DocCollection<UserDoc>,
}

impl AuthenticatingConcept {
    pub fn new(db: &DatabaseManager, collection: &str) -> Result<Self, DatabaseError> {
        Ok(Self {
            users: db.collection(collection)?,
        })
    }

    pub async fn create(&self, username: &str, password: &str, role: Role) -> Result<UserCreated, ConceptError> {
        self.can_create(username, password).await?;
        let id = self
            .users
            .create_one(&UserDoc {
                username: username.to_string(),
                password: new_password_hash(password),
                role,
            })
            .await?;
        tracing::info!("Created user {} ({})", username, role);
        Ok(UserCreated {
            msg: "User created successfully!",
            user: self.get_user_by_id(id).await?,
        })
    }

    pub async fn get_user_by_id(&self, id: Id) -> Result<User, ConceptError> {
        self.users
            .read_by_id(id)
            .await?
            .map(User::from)
            .ok_or_else(|| ConceptError::not_found("User not found!"))
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<User, ConceptError> {
        self.find_by_username(username)
            .await?
            .map(User::from)
            .ok_or_else(|| ConceptError::not_found(format!("User with username {} does not exist!", username)))
    }

    pub async fn get_users(&self) -> Result<Vec<User>, ConceptError> {
        let docs = self.users.read_many(Filter::new(), FindOptions::default()).await?;
        Ok(docs.into_iter().map(User::from).collect())
    }

    pub async fn get_users_by_role(&self, role: Role) -> Result<Vec<User>, ConceptError> {
        let docs = self
            .users
            .read_many(Filter::new().eq("role", role), FindOptions::default())
            .await?;
        Ok(docs.into_iter().map(User::from).collect())
    }

    pub async fn get_user_role(&self, id: Id) -> Result<Role, ConceptError> {
        Ok(self.get_user_by_id(id).await?.role)
    }

    /// Usernames in the same order as `ids`; ids with no user map to `DELETED_USER`
    pub async fn ids_to_usernames(&self, ids: &[Id]) -> Result<Vec<String>, ConceptError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let docs = self
            .users
            .read_many(Filter::new().is_in(ID_FIELD, ids.iter().copied()), FindOptions::default())
            .await?;
        let names: HashMap<Id, String> = docs.into_iter().map(|d| (d.id, d.fields.username)).collect();
        Ok(ids
            .iter()
            .map(|id| names.get(id).cloned().unwrap_or_else(|| DELETED_USER.to_string()))
            .collect())
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, ConceptError> {
        match self.find_by_username(username).await? {
            Some(doc) if verify_password(password, &doc.password) => Ok(User::from(doc)),
            _ => Err(ConceptError::not_allowed("Username or password is incorrect.")),
        }
    }

    pub async fn update_username(&self, id: Id, username: &str) -> Result<Msg, ConceptError> {
        if username.is_empty() {
            return Err(ConceptError::bad_values("Username must be non-empty!"));
        }
        if let Some(existing) = self.find_by_username(username).await? {
            if existing.id != id {
                return Err(ConceptError::not_allowed(format!("User with username {} already exists!", username)));
            }
        }
        self.get_user_by_id(id).await?;
        self.users
            .partial_update_one(Filter::by_id(id), Patch::new().set("username", username))
            .await?;
        Ok(msg("Updated user successfully!"))
    }

    pub async fn update_password(&self, id: Id, current: &str, new: &str) -> Result<Msg, ConceptError> {
        if new.is_empty() {
            return Err(ConceptError::bad_values("Password must be non-empty!"));
        }
        let doc = self
            .users
            .read_by_id(id)
            .await?
            .ok_or_else(|| ConceptError::not_found("User not found!"))?;
        if !verify_password(current, &doc.password) {
            return Err(ConceptError::not_allowed("The given current password is wrong!"));
        }
        self.users
            .partial_update_one(Filter::by_id(id), Patch::new().set("password", new_password_hash(new)))
            .await?;
        Ok(msg("Password updated successfully!"))
    }

    pub async fn delete(&self, id: Id) -> Result<Msg, ConceptError> {
        self.users.delete_one(Filter::by_id(id)).await.map_err(|e| match e {
            DatabaseError::NotFound(_) => ConceptError::not_found("User not found!"),
            other => other.into(),
        })?;
        Ok(msg("User deleted!"))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Document<UserDoc>>, ConceptError> {
        Ok(self.users.read_one(Filter::new().eq("username", username)).await?)
    }

    async fn can_create(&self, username: &str, password: &str) -> Result<(), ConceptError> {
        if username.is_empty() || password.is_empty() {
            return Err(ConceptError::bad_values("Username and password must be non-empty!"));
        }
        if self.find_by_username(username).await?.is_some() {
            return Err(ConceptError::not_allowed(format!("User with username {} already exists!", username)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concept() -> AuthenticatingConcept {
        AuthenticatingConcept::new(&DatabaseManager::memory(), "users").unwrap()
    }

    #[test]
    fn password_hashes_are_salted() {
        let a = new_password_hash("secret");
        let b = new_password_hash("secret");
        assert_ne!(a, b);
        assert!(verify_password("secret", &a));
        assert!(!verify_password("Secret", &a));
        assert!(!verify_password("secret", "no-salt"));
    }

    #[tokio::test]
    async fn create_and_authenticate() {
        let auth = concept();
        let created = auth.create("alice", "pw", Role::RegularUser).await.unwrap();
        assert_eq!(created.user.username, "alice");

        let json = serde_json::to_value(&created).unwrap();
        assert!(json["user"].get("password").is_none());

        let user = auth.authenticate("alice", "pw").await.unwrap();
        assert_eq!(user.id, created.user.id);
        assert!(matches!(auth.authenticate("alice", "nope").await, Err(ConceptError::NotAllowed(_))));
        assert!(matches!(auth.authenticate("bob", "pw").await, Err(ConceptError::NotAllowed(_))));
    }

    #[tokio::test]
    async fn rejects_empty_and_duplicate_usernames() {
        let auth = concept();
        assert!(matches!(auth.create("", "pw", Role::RegularUser).await, Err(ConceptError::BadValues(_))));
        auth.create("alice", "pw", Role::RegularUser).await.unwrap();
        assert!(matches!(
            auth.create("alice", "other", Role::ContentCreator).await,
            Err(ConceptError::NotAllowed(_))
        ));
    }

    #[tokio::test]
    async fn ids_map_to_usernames_in_order() {
        let auth = concept();
        let a = auth.create("a", "pw", Role::RegularUser).await.unwrap().user.id;
        let b = auth.create("b", "pw", Role::ContentCreator).await.unwrap().user.id;
        let names = auth.ids_to_usernames(&[b, Id::new(), a]).await.unwrap();
        assert_eq!(names, vec!["b", DELETED_USER, "a"]);

        let creators = auth.get_users_by_role(Role::ContentCreator).await.unwrap();
        assert_eq!(creators.len(), 1);
        assert_eq!(auth.get_user_role(a).await.unwrap(), Role::RegularUser);
    }

    #[tokio::test]
    async fn updates_and_delete() {
        let auth = concept();
        let id = auth.create("a", "pw", Role::RegularUser).await.unwrap().user.id;
        auth.create("taken", "pw", Role::RegularUser).await.unwrap();

        assert!(matches!(auth.update_username(id, "taken").await, Err(ConceptError::NotAllowed(_))));
        auth.update_username(id, "renamed").await.unwrap();
        assert_eq!(auth.get_user_by_id(id).await.unwrap().username, "renamed");

        assert!(matches!(auth.update_password(id, "wrong", "new").await, Err(ConceptError::NotAllowed(_))));
        auth.update_password(id, "pw", "new").await.unwrap();
        assert!(auth.authenticate("renamed", "new").await.is_ok());

        auth.delete(id).await.unwrap();
        assert!(matches!(auth.get_user_by_id(id).await, Err(ConceptError::NotFound(_))));
        assert!(matches!(auth.delete(id).await, Err(ConceptError::NotFound(_))));
    }
}
