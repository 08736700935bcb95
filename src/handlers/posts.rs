use axum::http::Method;
use serde::Serialize;
use std::sync::Arc;

use super::responses::{self, PostView};
use crate::app::App;
use crate::concepts::posting::{PostOptions, PostUpdate};
use crate::concepts::Msg;
use crate::error::ApiError;
use crate::router::{handler, Call, Registry, RegistryError};
use crate::types::Category;
use crate::validation::{Rule, Schema};

#[derive(Debug, Serialize)]
struct PostCreated {
    msg: &'static str,
    post: PostView,
}

fn options_rule() -> Rule {
    Rule::object(Schema::new().optional("backgroundColor", Rule::string()))
}

fn id_schema() -> Schema {
    Schema::new().required("id", Rule::id())
}

pub fn register(registry: &mut Registry<App>) -> Result<(), RegistryError> {
    registry
        .register(
            Method::GET,
            "/posts",
            handler(list_posts).optional(&["author"]),
            Some(Schema::new().optional("author", Rule::string())),
        )?
        .register(
            Method::POST,
            "/posts",
            handler(create_post)
                .with_session()
                .params(&["content"])
                .optional(&["category", "options"]),
            Some(
                Schema::new()
                    .required("content", Rule::string())
                    .optional("category", Rule::one_of(Category::NAMES))
                    .optional("options", options_rule()),
            ),
        )?
        .register(Method::GET, "/posts/:id", handler(get_post), Some(id_schema()))?
        .register(
            Method::PATCH,
            "/posts/:id",
            handler(update_post).with_session().optional(&["content", "options"]),
            Some(
                id_schema()
                    .optional("content", Rule::string())
                    .optional("options", options_rule()),
            ),
        )?
        .register(Method::DELETE, "/posts/:id", handler(delete_post).with_session(), Some(id_schema()))?
        .register(
            Method::PATCH,
            "/posts/:id/increment-rating",
            handler(increment_rating).with_session(),
            Some(id_schema()),
        )?
        .register(
            Method::PATCH,
            "/posts/:id/decrement-rating",
            handler(decrement_rating).with_session(),
            Some(id_schema()),
        )?
        .register(Method::GET, "/posts/author/:author", handler(author_posts), None)?
        .register(
            Method::GET,
            "/posts/category/:category",
            handler(category_posts),
            Some(Schema::new().required("category", Rule::one_of(Category::NAMES))),
        )?;
    Ok(())
}

/// GET /posts - All posts newest first, or only those by `author` (a username)
async fn list_posts(app: Arc<App>, call: Call) -> Result<Vec<PostView>, ApiError> {
    let posts = match call.opt_string("author") {
        Some(author) => app.posting.get_by_author(app.user_id(&author).await?).await?,
        None => app.posting.get_posts().await?,
    };
    responses::posts(&app, posts).await
}

/// POST /posts - A missing category files the post under the default category
async fn create_post(app: Arc<App>, call: Call) -> Result<PostCreated, ApiError> {
    let user = app.current_user(&call)?;
    let options: Option<PostOptions> = call.json("options")?;
    let post = app
        .posting
        .create(user, &call.string("content")?, call.category("category")?, options)
        .await?;
    Ok(PostCreated {
        msg: "Post successfully created!",
        post: responses::post(&app, post).await?,
    })
}

async fn get_post(app: Arc<App>, call: Call) -> Result<PostView, ApiError> {
    let post = app.posting.get_post(call.id("id")?).await?;
    responses::post(&app, post).await
}

/// PATCH /posts/:id - Author only; fields left out keep their stored value
async fn update_post(app: Arc<App>, call: Call) -> Result<Msg, ApiError> {
    let user = app.current_user(&call)?;
    let id = call.id("id")?;
    app.posting.assert_author_is_user(id, user).await?;
    let update = PostUpdate {
        content: call.opt_string("content"),
        options: call.json("options")?,
    };
    Ok(app.posting.update(id, update).await?)
}

async fn delete_post(app: Arc<App>, call: Call) -> Result<Msg, ApiError> {
    let user = app.current_user(&call)?;
    let id = call.id("id")?;
    app.posting.assert_author_is_user(id, user).await?;
    Ok(app.posting.delete(id).await?)
}

async fn increment_rating(app: Arc<App>, call: Call) -> Result<Msg, ApiError> {
    app.current_user(&call)?;
    Ok(app.posting.increment_quality_rating(call.id("id")?).await?)
}

async fn decrement_rating(app: Arc<App>, call: Call) -> Result<Msg, ApiError> {
    app.current_user(&call)?;
    Ok(app.posting.decrement_quality_rating(call.id("id")?).await?)
}

async fn author_posts(app: Arc<App>, call: Call) -> Result<Vec<PostView>, ApiError> {
    let author = app.user_id(&call.string("author")?).await?;
    let posts = app.posting.get_by_author(author).await?;
    responses::posts(&app, posts).await
}

async fn category_posts(app: Arc<App>, call: Call) -> Result<Vec<PostView>, ApiError> {
    let posts = app.posting.get_by_category(call.category("category")?).await?;
    responses::posts(&app, posts).await
}
