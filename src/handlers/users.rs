use axum::http::Method;
use std::sync::Arc;

use crate::app::App;
use crate::concepts::authenticating::UserCreated;
use crate::concepts::{msg, Msg, User};
use crate::error::ApiError;
use crate::router::{handler, Call, Registry, RegistryError};
use crate::types::Role;
use crate::validation::{Rule, Schema};

pub fn register(registry: &mut Registry<App>) -> Result<(), RegistryError> {
    registry
        .register(Method::GET, "/session", handler(session_user).with_session(), None)?
        .register(Method::GET, "/users", handler(list_users), None)?
        .register(
            Method::GET,
            "/users/:username",
            handler(get_user),
            Some(Schema::new().required("username", Rule::string().min_len(1))),
        )?
        .register(
            Method::POST,
            "/users",
            handler(create_user).with_session().params(&["username", "password", "role"]),
            Some(
                Schema::new()
                    .required("username", Rule::string())
                    .required("password", Rule::string())
                    .required("role", Rule::one_of(Role::NAMES)),
            ),
        )?
        .register(
            Method::PATCH,
            "/users/username",
            handler(update_username).with_session().params(&["username"]),
            Some(Schema::new().required("username", Rule::string())),
        )?
        .register(
            Method::PATCH,
            "/users/password",
            handler(update_password)
                .with_session()
                .params(&["currentPassword", "newPassword"]),
            Some(
                Schema::new()
                    .required("currentPassword", Rule::string())
                    .required("newPassword", Rule::string()),
            ),
        )?
        .register(Method::DELETE, "/users", handler(delete_user).with_session(), None)?
        .register(
            Method::POST,
            "/login",
            handler(login).with_session().params(&["username", "password"]),
            Some(
                Schema::new()
                    .required("username", Rule::string())
                    .required("password", Rule::string()),
            ),
        )?
        .register(Method::POST, "/logout", handler(logout).with_session(), None)?
        .register(Method::GET, "/contentcreators", handler(content_creators), None)?
        .register(Method::GET, "/regularusers", handler(regular_users), None)?;
    Ok(())
}

/// GET /session - The logged-in user
async fn session_user(app: Arc<App>, call: Call) -> Result<User, ApiError> {
    let user = app.current_user(&call)?;
    Ok(app.authing.get_user_by_id(user).await?)
}

async fn list_users(app: Arc<App>, _call: Call) -> Result<Vec<User>, ApiError> {
    Ok(app.authing.get_users().await?)
}

async fn get_user(app: Arc<App>, call: Call) -> Result<User, ApiError> {
    Ok(app.authing.get_user_by_username(&call.string("username")?).await?)
}

/// POST /users - Register; only allowed while logged out
async fn create_user(app: Arc<App>, call: Call) -> Result<UserCreated, ApiError> {
    app.sessioning.is_logged_out(call.session()?)?;
    let role: Role = call.string("role")?.parse().map_err(ApiError::bad_request)?;
    Ok(app
        .authing
        .create(&call.string("username")?, &call.string("password")?, role)
        .await?)
}

async fn update_username(app: Arc<App>, call: Call) -> Result<Msg, ApiError> {
    let user = app.current_user(&call)?;
    Ok(app.authing.update_username(user, &call.string("username")?).await?)
}

async fn update_password(app: Arc<App>, call: Call) -> Result<Msg, ApiError> {
    let user = app.current_user(&call)?;
    Ok(app
        .authing
        .update_password(user, &call.string("currentPassword")?, &call.string("newPassword")?)
        .await?)
}

/// DELETE /users - Delete the logged-in account and end its session
async fn delete_user(app: Arc<App>, call: Call) -> Result<Msg, ApiError> {
    let session = call.session()?;
    let user = app.sessioning.get_user(session)?;
    app.sessioning.end(session)?;
    Ok(app.authing.delete(user).await?)
}

/// POST /login - Authenticate and bind the user to the session
async fn login(app: Arc<App>, call: Call) -> Result<Msg, ApiError> {
    let session = call.session()?;
    app.sessioning.is_logged_out(session)?;
    let user = app
        .authing
        .authenticate(&call.string("username")?, &call.string("password")?)
        .await?;
    app.sessioning.start(session, user.id)?;
    tracing::info!("User {} logged in", user.username);
    Ok(msg("Logged in!"))
}

async fn logout(app: Arc<App>, call: Call) -> Result<Msg, ApiError> {
    app.sessioning.end(call.session()?)?;
    Ok(msg("Logged out!"))
}

async fn content_creators(app: Arc<App>, _call: Call) -> Result<Vec<User>, ApiError> {
    Ok(app.authing.get_users_by_role(Role::ContentCreator).await?)
}

async fn regular_users(app: Arc<App>, _call: Call) -> Result<Vec<User>, ApiError> {
    Ok(app.authing.get_users_by_role(Role::RegularUser).await?)
}
