use axum::http::Method;
use serde::Serialize;
use std::sync::Arc;

use super::progress::sync_summary;
use crate::app::App;
use crate::concepts::collectioning::{CollectionCreated, CollectionDoc};
use crate::concepts::Msg;
use crate::database::Document;
use crate::error::ApiError;
use crate::router::{handler, Call, Registry, RegistryError};
use crate::types::{Category, Id, Role};
use crate::validation::{Rule, Schema};

#[derive(Debug, Serialize)]
struct ContentsChanged {
    msg: &'static str,
    summary: Vec<u64>,
}

pub fn register(registry: &mut Registry<App>) -> Result<(), RegistryError> {
    let title = || Schema::new().required("title", Rule::string().min_len(1));
    let item = || {
        Some(
            Schema::new()
                .required("collectionTitle", Rule::string().min_len(1))
                .required("post", Rule::id()),
        )
    };

    registry
        .register(Method::POST, "/collections", handler(default_collections).with_session(), None)?
        .register(
            Method::POST,
            "/collections/create",
            handler(create_collection)
                .with_session()
                .params(&["title"])
                .optional(&["parent", "deadline"]),
            Some(
                title()
                    .optional("parent", Rule::one_of(Category::NAMES))
                    .optional("deadline", Rule::string()),
            ),
        )?
        .register(Method::GET, "/collections", handler(list_collections).with_session(), None)?
        .register(
            Method::GET,
            "/collections/shared/:title",
            handler(shared_collections).with_session(),
            None,
        )?
        .register(
            Method::GET,
            "/collections/:id",
            handler(collection_content),
            Some(Schema::new().required("id", Rule::id())),
        )?
        .register(
            Method::POST,
            "/collections/share",
            handler(share_collection).with_session().params(&["to", "title"]),
            Some(title().required("to", Rule::string().min_len(1))),
        )?
        .register(
            Method::POST,
            "/collections/unshare",
            handler(unshare_collection).with_session().params(&["from", "title"]),
            Some(title().required("from", Rule::string().min_len(1))),
        )?
        .register(
            Method::DELETE,
            "/collections",
            handler(delete_collection).with_session().params(&["title"]),
            Some(title()),
        )?
        .register(
            Method::PATCH,
            "/collections/add",
            handler(add_to_collection).with_session().params(&["collectionTitle", "post"]),
            item(),
        )?
        .register(
            Method::PATCH,
            "/collections/remove",
            handler(remove_from_collection)
                .with_session()
                .params(&["collectionTitle", "post"]),
            item(),
        )?
        .register(
            Method::PATCH,
            "/collections",
            handler(update_deadline)
                .with_session()
                .params(&["collectionTitle", "deadline"]),
            Some(
                Schema::new()
                    .required("collectionTitle", Rule::string().min_len(1))
                    .required("deadline", Rule::string()),
            ),
        )?;
    Ok(())
}

/// POST /collections - Make sure the user has a root collection for every category
async fn default_collections(app: Arc<App>, call: Call) -> Result<Vec<Document<CollectionDoc>>, ApiError> {
    let user = app.current_user(&call)?;
    Ok(app.collectioning.ensure_default_collections(user).await?)
}

/// POST /collections/create - `parent` defaults to the default category
async fn create_collection(app: Arc<App>, call: Call) -> Result<CollectionCreated, ApiError> {
    let user = app.current_user(&call)?;
    let deadline = call.opt_string("deadline").unwrap_or_default();
    Ok(app
        .collectioning
        .create_collection(user, Some(call.category("parent")?), &call.string("title")?, &deadline)
        .await?)
}

async fn list_collections(app: Arc<App>, call: Call) -> Result<Vec<Document<CollectionDoc>>, ApiError> {
    let user = app.current_user(&call)?;
    Ok(app.collectioning.get_user_collections(user).await?)
}

/// GET /collections/shared/:title - Collections with this title that others share with the user
async fn shared_collections(app: Arc<App>, call: Call) -> Result<Vec<Document<CollectionDoc>>, ApiError> {
    let user = app.current_user(&call)?;
    let title = call.string("title")?;
    let mut shared = app.collectioning.get_shared_collections(user).await?;
    shared.retain(|c| c.title == title);
    Ok(shared)
}

/// GET /collections/:id - Post ids saved in the collection
async fn collection_content(app: Arc<App>, call: Call) -> Result<Vec<Id>, ApiError> {
    Ok(app.collectioning.get_content(call.id("id")?).await?)
}

async fn share_collection(app: Arc<App>, call: Call) -> Result<Msg, ApiError> {
    let user = app.current_user(&call)?;
    app.require_role(user, Role::RegularUser).await?;
    let to = app.user_id(&call.string("to")?).await?;
    Ok(app.collectioning.share_collection(user, &call.string("title")?, to).await?)
}

async fn unshare_collection(app: Arc<App>, call: Call) -> Result<Msg, ApiError> {
    let user = app.current_user(&call)?;
    app.require_role(user, Role::RegularUser).await?;
    let from = app.user_id(&call.string("from")?).await?;
    Ok(app.collectioning.unshare_collection(user, &call.string("title")?, from).await?)
}

async fn delete_collection(app: Arc<App>, call: Call) -> Result<Msg, ApiError> {
    let user = app.current_user(&call)?;
    app.require_role(user, Role::RegularUser).await?;
    Ok(app.collectioning.delete_collection(user, &call.string("title")?).await?)
}

/// PATCH /collections/add - Save an existing post and refresh the activity summary
async fn add_to_collection(app: Arc<App>, call: Call) -> Result<ContentsChanged, ApiError> {
    let user = app.current_user(&call)?;
    app.require_role(user, Role::RegularUser).await?;
    let post = app.posting.get_post(call.id("post")?).await?;
    let done = app
        .collectioning
        .add_to_collection(user, &call.string("collectionTitle")?, post.id)
        .await?;
    let summary = sync_summary(&app, user).await?;
    Ok(ContentsChanged {
        msg: done.msg,
        summary: summary.categories,
    })
}

async fn remove_from_collection(app: Arc<App>, call: Call) -> Result<ContentsChanged, ApiError> {
    let user = app.current_user(&call)?;
    app.require_role(user, Role::RegularUser).await?;
    let done = app
        .collectioning
        .remove_from_collection(user, &call.string("collectionTitle")?, call.id("post")?)
        .await?;
    let summary = sync_summary(&app, user).await?;
    Ok(ContentsChanged {
        msg: done.msg,
        summary: summary.categories,
    })
}

/// PATCH /collections - Change a collection's deadline
async fn update_deadline(app: Arc<App>, call: Call) -> Result<Msg, ApiError> {
    let user = app.current_user(&call)?;
    app.require_role(user, Role::RegularUser).await?;
    Ok(app
        .collectioning
        .update_collection_deadline(user, &call.string("collectionTitle")?, &call.string("deadline")?)
        .await?)
}
