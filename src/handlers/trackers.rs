use axum::http::Method;
use serde::Serialize;
use std::sync::Arc;

use super::progress::sync_exp;
use crate::app::App;
use crate::concepts::trackering::{TrackerDoc, TRACKER_DAYS};
use crate::concepts::Msg;
use crate::database::Document;
use crate::error::ApiError;
use crate::router::{handler, Call, Registry, RegistryError};
use crate::types::Role;
use crate::validation::{Rule, Schema};

#[derive(Debug, Serialize)]
struct TrackerCreated {
    msg: &'static str,
    tracker: Document<TrackerDoc>,
}

#[derive(Debug, Serialize)]
struct CheckIn {
    msg: &'static str,
    exp: i64,
}

pub fn register(registry: &mut Registry<App>) -> Result<(), RegistryError> {
    let title = || Schema::new().required("title", Rule::string().min_len(1));
    let day = || Some(title().required("day", Rule::integer().range(0.0, (TRACKER_DAYS - 1) as f64)));

    registry
        .register(
            Method::POST,
            "/trackers/create",
            handler(create_tracker).with_session().params(&["title"]),
            Some(title()),
        )?
        .register(Method::GET, "/trackers", handler(list_trackers).with_session(), None)?
        .register(
            Method::GET,
            "/trackers/shared/:title",
            handler(shared_trackers).with_session(),
            None,
        )?
        .register(
            Method::POST,
            "/trackers/share",
            handler(share_tracker).with_session().params(&["to", "title"]),
            Some(title().required("to", Rule::string().min_len(1))),
        )?
        .register(
            Method::POST,
            "/trackers/unshare",
            handler(unshare_tracker).with_session().params(&["from", "title"]),
            Some(title().required("from", Rule::string().min_len(1))),
        )?
        .register(
            Method::DELETE,
            "/trackers",
            handler(delete_tracker).with_session().params(&["title"]),
            Some(title()),
        )?
        .register(
            Method::PATCH,
            "/trackers/:title/check",
            handler(check).with_session().params(&["day"]),
            day(),
        )?
        .register(
            Method::PATCH,
            "/trackers/:title/uncheck",
            handler(uncheck).with_session().params(&["day"]),
            day(),
        )?;
    Ok(())
}

async fn create_tracker(app: Arc<App>, call: Call) -> Result<TrackerCreated, ApiError> {
    let user = app.current_user(&call)?;
    let tracker = app.trackering.make_tracker(user, &call.string("title")?).await?;
    Ok(TrackerCreated {
        msg: "Tracker successfully created!",
        tracker,
    })
}

async fn list_trackers(app: Arc<App>, call: Call) -> Result<Vec<Document<TrackerDoc>>, ApiError> {
    let user = app.current_user(&call)?;
    Ok(app.trackering.get_trackers(user).await?)
}

/// GET /trackers/shared/:title - Trackers with this title that others share with the user
async fn shared_trackers(app: Arc<App>, call: Call) -> Result<Vec<Document<TrackerDoc>>, ApiError> {
    let user = app.current_user(&call)?;
    let title = call.string("title")?;
    let mut shared = app.trackering.get_shared_trackers(user).await?;
    shared.retain(|t| t.title == title);
    Ok(shared)
}

async fn share_tracker(app: Arc<App>, call: Call) -> Result<Msg, ApiError> {
    let user = app.current_user(&call)?;
    app.require_role(user, Role::RegularUser).await?;
    let to = app.user_id(&call.string("to")?).await?;
    Ok(app.trackering.share_tracker(user, &call.string("title")?, to).await?)
}

async fn unshare_tracker(app: Arc<App>, call: Call) -> Result<Msg, ApiError> {
    let user = app.current_user(&call)?;
    app.require_role(user, Role::RegularUser).await?;
    let from = app.user_id(&call.string("from")?).await?;
    Ok(app.trackering.unshare_tracker(user, &call.string("title")?, from).await?)
}

async fn delete_tracker(app: Arc<App>, call: Call) -> Result<Msg, ApiError> {
    let user = app.current_user(&call)?;
    app.require_role(user, Role::RegularUser).await?;
    Ok(app.trackering.delete_tracker(user, &call.string("title")?).await?)
}

/// PATCH /trackers/:title/check - Mark a day done and refresh the user's experience
async fn check(app: Arc<App>, call: Call) -> Result<CheckIn, ApiError> {
    let user = app.current_user(&call)?;
    app.require_role(user, Role::RegularUser).await?;
    let done = app
        .trackering
        .check_day(user, &call.string("title")?, call.integer("day")?)
        .await?;
    let exp = sync_exp(&app, user).await?.exp;
    Ok(CheckIn { msg: done.msg, exp })
}

async fn uncheck(app: Arc<App>, call: Call) -> Result<CheckIn, ApiError> {
    let user = app.current_user(&call)?;
    app.require_role(user, Role::RegularUser).await?;
    let done = app
        .trackering
        .uncheck_day(user, &call.string("title")?, call.integer("day")?)
        .await?;
    let exp = sync_exp(&app, user).await?.exp;
    Ok(CheckIn { msg: done.msg, exp })
}
