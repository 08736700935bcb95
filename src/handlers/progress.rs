use axum::http::Method;
use serde::Serialize;
use std::sync::Arc;

use crate::app::App;
use crate::concepts::leveling::ExpUpdated;
use crate::error::ApiError;
use crate::router::{handler, Call, Registry, RegistryError};
use crate::types::{Category, Id, Role};

#[derive(Debug, Serialize)]
struct Exp {
    exp: i64,
}

#[derive(Debug, Serialize)]
struct Level {
    level: i64,
}

#[derive(Debug, Serialize)]
struct Recommendation {
    category: Category,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub categories: Vec<u64>,
}

pub fn register(registry: &mut Registry<App>) -> Result<(), RegistryError> {
    registry
        .register(Method::POST, "/exp", handler(recalculate_exp).with_session(), None)?
        .register(Method::GET, "/exp", handler(get_exp).with_session(), None)?
        .register(Method::GET, "/level", handler(get_level).with_session(), None)?
        .register(Method::POST, "/explore", handler(explore).with_session(), None)?
        .register(Method::GET, "/summary", handler(get_summary).with_session(), None)?;
    Ok(())
}

/// Experience is one point per checked day across all of the user's trackers
pub(crate) async fn sync_exp(app: &App, user: Id) -> Result<ExpUpdated, ApiError> {
    let mut source = Vec::new();
    for tracker in app.trackering.get_trackers(user).await? {
        source.push(tracker.days.iter().filter(|d| **d).count() as i64);
    }
    Ok(app.leveling.update_exp(user, &source).await?)
}

/// Per-category saved-item counts: the category's root collection plus every collection
/// filed under it
pub(crate) async fn sync_summary(app: &App, user: Id) -> Result<Summary, ApiError> {
    let mut categories = vec![0u64; Category::ALL.len()];
    for collection in app.collectioning.get_user_collections(user).await? {
        let category = match collection.parent {
            Some(parent) => parent,
            None => match collection.title.parse::<Category>() {
                Ok(root) => root,
                Err(_) => continue,
            },
        };
        categories[category.index()] += collection.contents.len() as u64;
    }
    app.summarizing.update_summary(user, categories.clone()).await?;
    Ok(Summary { categories })
}

/// POST /exp - Recompute and store the logged-in user's experience
async fn recalculate_exp(app: Arc<App>, call: Call) -> Result<ExpUpdated, ApiError> {
    let user = app.current_user(&call)?;
    sync_exp(&app, user).await
}

async fn get_exp(app: Arc<App>, call: Call) -> Result<Exp, ApiError> {
    let user = app.current_user(&call)?;
    Ok(Exp {
        exp: app.leveling.get_exp(user).await?,
    })
}

async fn get_level(app: Arc<App>, call: Call) -> Result<Level, ApiError> {
    let user = app.current_user(&call)?;
    Ok(Level {
        level: app.leveling.get_level(user).await?,
    })
}

/// POST /explore - Recommend the category the user has saved the least from
async fn explore(app: Arc<App>, call: Call) -> Result<Recommendation, ApiError> {
    let user = app.current_user(&call)?;
    app.require_role(user, Role::RegularUser).await?;
    Ok(Recommendation {
        category: app.summarizing.find_low_activity_category(user).await?,
    })
}

async fn get_summary(app: Arc<App>, call: Call) -> Result<Summary, ApiError> {
    let user = app.current_user(&call)?;
    app.require_role(user, Role::RegularUser).await?;
    Ok(Summary {
        categories: app.summarizing.get_summary(user).await?,
    })
}
