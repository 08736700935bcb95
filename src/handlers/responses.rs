use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::App;
use crate::concepts::friending::{FriendRequestDoc, RequestStatus};
use crate::concepts::posting::{PostDoc, PostOptions};
use crate::database::document::timestamp;
use crate::database::Document;
use crate::error::ApiError;
use crate::types::{Category, Id};

/// A post with its author shown by username
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(rename = "dateCreated", with = "timestamp")]
    pub date_created: DateTime<Utc>,
    #[serde(rename = "dateUpdated", with = "timestamp")]
    pub date_updated: DateTime<Utc>,
    pub author: String,
    pub content: String,
    pub quality_rating: i64,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<PostOptions>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FriendRequestView {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(rename = "dateCreated", with = "timestamp")]
    pub date_created: DateTime<Utc>,
    pub from: String,
    pub to: String,
    pub status: RequestStatus,
}

pub async fn post(app: &App, post: Document<PostDoc>) -> Result<PostView, ApiError> {
    posts(app, vec![post])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::internal_server_error("Post view was not produced"))
}

/// Author ids resolved in one lookup; authors that no longer exist show as `DELETED_USER`
pub async fn posts(app: &App, posts: Vec<Document<PostDoc>>) -> Result<Vec<PostView>, ApiError> {
    let authors: Vec<Id> = posts.iter().map(|p| p.author).collect();
    let names = app.authing.ids_to_usernames(&authors).await?;
    Ok(posts
        .into_iter()
        .zip(names)
        .map(|(doc, author)| PostView {
            id: doc.id,
            date_created: doc.date_created,
            date_updated: doc.date_updated,
            author,
            content: doc.fields.content,
            quality_rating: doc.fields.quality_rating,
            category: doc.fields.category,
            options: doc.fields.options,
        })
        .collect())
}

pub async fn friend_requests(
    app: &App,
    requests: Vec<Document<FriendRequestDoc>>,
) -> Result<Vec<FriendRequestView>, ApiError> {
    let from: Vec<Id> = requests.iter().map(|r| r.from).collect();
    let to: Vec<Id> = requests.iter().map(|r| r.to).collect();
    let from = app.authing.ids_to_usernames(&from).await?;
    let to = app.authing.ids_to_usernames(&to).await?;
    Ok(requests
        .into_iter()
        .zip(from.into_iter().zip(to))
        .map(|(doc, (from, to))| FriendRequestView {
            id: doc.id,
            date_created: doc.date_created,
            from,
            to,
            status: doc.fields.status,
        })
        .collect())
}
