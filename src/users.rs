use spin_sdk::http::{Request, Response};
use uuid::Uuid;

use crate::auth::{issue_token, validate_token};
use crate::config::*;
use crate::core::db::SocialStore;
use crate::core::errors::ApiError;
use crate::core::helpers::{hash_password, sanitize_text, store, verify_password};
use crate::models::records::{TokenData, User};
use crate::profiles::profile_of_user;

fn build_user_json<S: SocialStore>(store: &S, user: &User) -> anyhow::Result<serde_json::Value> {
    let profile_id = profile_of_user(store, &user.id)?.map(|p| p.id);

    Ok(serde_json::json!({
        "id": user.id,
        "username": user.username,
        "profile_id": profile_id,
    }))
}

/// POST /users - account registration. The social profile is created
/// separately, once, via POST /profiles.
pub fn create_user(req: Request) -> anyhow::Result<Response> {
    let store = store();
    let body = req.body();

    let new_user: serde_json::Value = serde_json::from_slice(body)?;
    let username = new_user["username"].as_str().unwrap_or("");
    let password = new_user["password"].as_str().unwrap_or("");

    if username.is_empty() {
        return Ok(ApiError::BadRequest("Username is required".to_string()).into());
    }
    if username.len() < MIN_USERNAME_LENGTH || username.len() > MAX_USERNAME_LENGTH {
        return Ok(ApiError::BadRequest("Username must be 3-50 characters".to_string()).into());
    }
    if password.is_empty() {
        return Ok(ApiError::BadRequest("Password is required".to_string()).into());
    }
    if password.len() < MIN_PASSWORD_LENGTH {
        return Ok(ApiError::BadRequest("Password must be at least 3 characters".to_string()).into());
    }

    let sanitized_username = sanitize_text(username);

    // Check duplicate username
    let existing_users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    for id in &existing_users {
        if let Some(u) = store.get_json::<User>(&user_key(id))? {
            if u.username == sanitized_username {
                return Ok(ApiError::Conflict("Username exists".to_string()).into());
            }
        }
    }

    let id = Uuid::new_v4().to_string();
    let user = User {
        id: id.clone(),
        username: sanitized_username,
        password: hash_password(password)?,
    };
    store.set_json(&user_key(&id), &user)?;

    let mut users = existing_users;
    users.push(id);
    store.set_json(USERS_LIST_KEY, &users)?;

    Ok(Response::builder()
        .status(201)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&build_user_json(&store, &user)?)?)
        .build())
}

/// GET /me
pub fn get_me(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    if let Some(user) = store.get_json::<User>(&user_key(&user_id))? {
        Ok(Response::builder()
            .status(200)
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&build_user_json(&store, &user)?)?)
            .build())
    } else {
        Ok(ApiError::NotFound("User not found".to_string()).into())
    }
}

/// PUT /me - password change revokes every outstanding token for the
/// account and hands back a fresh one.
pub fn update_me(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let mut user = match store.get_json::<User>(&user_key(&user_id))? {
        Some(u) => u,
        None => return Ok(ApiError::NotFound("User not found".to_string()).into()),
    };

    let value: serde_json::Value = serde_json::from_slice(req.body())?;
    let mut password_changed = false;

    if let Some(username) = value["username"].as_str() {
        if username.len() < MIN_USERNAME_LENGTH || username.len() > MAX_USERNAME_LENGTH {
            return Ok(ApiError::BadRequest("Username must be 3-50 characters".to_string()).into());
        }
        let sanitized = sanitize_text(username);
        if sanitized != user.username {
            let users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
            for id in &users {
                if let Some(u) = store.get_json::<User>(&user_key(id))? {
                    if u.id != user.id && u.username == sanitized {
                        return Ok(ApiError::Conflict("Username exists".to_string()).into());
                    }
                }
            }
            user.username = sanitized;
        }
    }

    if let Some(new_password) = value["new_password"].as_str() {
        if new_password.len() < MIN_PASSWORD_LENGTH {
            return Ok(
                ApiError::BadRequest("Password must be at least 3 characters".to_string()).into(),
            );
        }

        let old_password = match value["old_password"].as_str() {
            Some(p) => p,
            None => {
                return Ok(ApiError::BadRequest("Current password required".to_string()).into())
            }
        };
        if !verify_password(old_password, &user.password) {
            return Ok(ApiError::Unauthorized.into());
        }

        user.password = hash_password(new_password)?;
        password_changed = true;
    }

    store.set_json(&user_key(&user_id), &user)?;

    let mut response_data = build_user_json(&store, &user)?;
    if password_changed {
        let all_tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();

        let mut kept_tokens = Vec::with_capacity(all_tokens.len());
        for token in all_tokens {
            match store.get_json::<TokenData>(&token_key(&token))? {
                Some(data) if data.user_id == user_id => {
                    store.delete(&token_key(&token))?;
                }
                _ => kept_tokens.push(token),
            }
        }
        store.set_json(TOKENS_LIST_KEY, &kept_tokens)?;

        let new_token = issue_token(&store, &user_id)?;
        response_data["token"] = serde_json::Value::String(new_token);
    }

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&response_data)?)
        .build())
}
