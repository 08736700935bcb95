use axum::http::Method;
use std::sync::Arc;

use super::responses::{self, FriendRequestView};
use crate::app::App;
use crate::concepts::{msg, ConceptError, Msg};
use crate::error::ApiError;
use crate::router::{handler, Call, Registry, RegistryError};
use crate::types::{Id, Role};
use crate::validation::{Rule, Schema};

pub fn register(registry: &mut Registry<App>) -> Result<(), RegistryError> {
    let creator = || Some(Schema::new().required("creator", Rule::string().min_len(1)));

    registry
        .register(Method::GET, "/friends", handler(list_friends).with_session(), None)?
        .register(Method::DELETE, "/friends/:friend", handler(remove_friend).with_session(), None)?
        .register(
            Method::POST,
            "/follow",
            handler(follow).with_session().params(&["creator"]),
            creator(),
        )?
        .register(
            Method::POST,
            "/unfollow",
            handler(unfollow).with_session().params(&["creator"]),
            creator(),
        )?
        .register(Method::GET, "/friend/requests", handler(list_requests).with_session(), None)?
        .register(Method::POST, "/friend/requests/:to", handler(send_request).with_session(), None)?
        .register(Method::DELETE, "/friend/requests/:to", handler(remove_request).with_session(), None)?
        .register(Method::PUT, "/friend/accept/:from", handler(accept_request).with_session(), None)?
        .register(Method::PUT, "/friend/reject/:from", handler(reject_request).with_session(), None)?
        .register(Method::GET, "/followers", handler(followers).with_session(), None)?
        .register(Method::GET, "/followings", handler(followings).with_session(), None)?;
    Ok(())
}

/// GET /friends - Usernames of the logged-in user's friends
async fn list_friends(app: Arc<App>, call: Call) -> Result<Vec<String>, ApiError> {
    let user = app.current_user(&call)?;
    let friends = app.friending.get_friends(user).await?;
    Ok(app.authing.ids_to_usernames(&friends).await?)
}

async fn remove_friend(app: Arc<App>, call: Call) -> Result<Msg, ApiError> {
    let user = app.current_user(&call)?;
    let friend = app.user_id(&call.string("friend")?).await?;
    Ok(app.friending.remove_friend(user, friend).await?)
}

/// POST /follow - A regular user follows a content creator without a request round-trip
async fn follow(app: Arc<App>, call: Call) -> Result<Msg, ApiError> {
    let (user, creator) = follow_pair(&app, &call).await?;
    app.friending.add_friend(user, creator).await?;
    Ok(msg("Followed content creator!"))
}

async fn unfollow(app: Arc<App>, call: Call) -> Result<Msg, ApiError> {
    let (user, creator) = follow_pair(&app, &call).await?;
    app.friending.remove_friend(user, creator).await?;
    Ok(msg("Unfollowed content creator!"))
}

async fn follow_pair(app: &App, call: &Call) -> Result<(Id, Id), ApiError> {
    let user = app.current_user(call)?;
    app.require_role(user, Role::RegularUser).await?;
    let creator = app.authing.get_user_by_username(&call.string("creator")?).await?;
    if creator.role != Role::ContentCreator {
        return Err(ConceptError::not_allowed(format!("{} is not a content creator!", creator.username)).into());
    }
    Ok((user, creator.id))
}

async fn list_requests(app: Arc<App>, call: Call) -> Result<Vec<FriendRequestView>, ApiError> {
    let user = app.current_user(&call)?;
    let requests = app.friending.get_requests(user).await?;
    responses::friend_requests(&app, requests).await
}

async fn send_request(app: Arc<App>, call: Call) -> Result<Msg, ApiError> {
    let user = app.current_user(&call)?;
    let to = app.user_id(&call.string("to")?).await?;
    Ok(app.friending.send_request(user, to).await?)
}

async fn remove_request(app: Arc<App>, call: Call) -> Result<Msg, ApiError> {
    let user = app.current_user(&call)?;
    let to = app.user_id(&call.string("to")?).await?;
    Ok(app.friending.remove_request(user, to).await?)
}

async fn accept_request(app: Arc<App>, call: Call) -> Result<Msg, ApiError> {
    let user = app.current_user(&call)?;
    let from = app.user_id(&call.string("from")?).await?;
    Ok(app.friending.accept_request(from, user).await?)
}

async fn reject_request(app: Arc<App>, call: Call) -> Result<Msg, ApiError> {
    let user = app.current_user(&call)?;
    let from = app.user_id(&call.string("from")?).await?;
    Ok(app.friending.reject_request(from, user).await?)
}

/// GET /followers - Friends who are regular users
async fn followers(app: Arc<App>, call: Call) -> Result<Vec<String>, ApiError> {
    friends_with_role(&app, &call, Role::RegularUser).await
}

/// GET /followings - Friends who are content creators
async fn followings(app: Arc<App>, call: Call) -> Result<Vec<String>, ApiError> {
    friends_with_role(&app, &call, Role::ContentCreator).await
}

async fn friends_with_role(app: &App, call: &Call, role: Role) -> Result<Vec<String>, ApiError> {
    let user = app.current_user(call)?;
    let mut names = Vec::new();
    for friend in app.friending.get_friends(user).await? {
        match app.authing.get_user_by_id(friend).await {
            Ok(found) if found.role == role => names.push(found.username),
            Ok(_) | Err(ConceptError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(names)
}
