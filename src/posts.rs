use spin_sdk::http::{Request, Response};
use uuid::Uuid;

use crate::auth::validate_token;
use crate::comments::comments_of;
use crate::config::*;
use crate::core::db::SocialStore;
use crate::core::errors::{ApiError, SocialError};
use crate::core::helpers::{now, sanitize_text, store, upload_path, validate_uuid};
use crate::feed::summarize;
use crate::models::records::Post;
use crate::models::views::PostDetail;
use crate::profiles::require_profile;

pub fn create_post_record<S: SocialStore>(
    store: &S,
    profile_id: &str,
    title: &str,
    text: &str,
    hashtags: Option<&str>,
    image: Option<String>,
) -> Result<Post, SocialError> {
    let post = Post {
        id: Uuid::new_v4().to_string(),
        profile_id: profile_id.to_string(),
        title: title.to_string(),
        text: text.to_string(),
        hashtags: hashtags.map(|h| h.to_string()),
        image,
        created: now(),
        updated: None,
    };
    store.set_json(&post_key(&post.id), &post)?;

    // prepend newest to the global feed list
    let mut feed: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();
    feed.insert(0, post.id.clone());
    store.set_json(FEED_KEY, &feed)?;

    Ok(post)
}

pub fn load_post<S: SocialStore>(store: &S, post_id: &str) -> Result<Post, SocialError> {
    store
        .get_json(&post_key(post_id))?
        .ok_or_else(|| SocialError::NotFound("Post".to_string()))
}

// === HTTP Handlers ===

/// POST /posts
pub fn create_post(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let author = match require_profile(&store, &user_id) {
        Ok(p) => p,
        Err(e) => return Ok(ApiError::from(e).into()),
    };

    let value: serde_json::Value = serde_json::from_slice(req.body())?;
    let title = value["title"].as_str().unwrap_or_default();
    let text = value["text"].as_str().unwrap_or_default();
    let hashtags = value["hashtags"].as_str();

    if title.is_empty() || title.len() > MAX_TITLE_LENGTH {
        return Ok(ApiError::BadRequest("Invalid title".to_string()).into());
    }
    if text.is_empty() || text.len() > MAX_TEXT_LENGTH {
        return Ok(ApiError::BadRequest("Invalid text".to_string()).into());
    }
    if hashtags.map(|h| h.len() > MAX_HASHTAGS_LENGTH).unwrap_or(false) {
        return Ok(ApiError::BadRequest("Hashtags too long".to_string()).into());
    }

    let image = value["image"]
        .as_str()
        .filter(|f| !f.is_empty())
        .map(|f| upload_path("post", &author.full_name(), f));

    let sanitized_hashtags = hashtags.map(sanitize_text);
    let post = match create_post_record(
        &store,
        &author.id,
        &sanitize_text(title),
        &sanitize_text(text),
        sanitized_hashtags.as_deref(),
        image,
    ) {
        Ok(p) => p,
        Err(e) => return Ok(ApiError::from(e).into()),
    };

    Ok(Response::builder()
        .status(201)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&post)?)
        .build())
}

/// GET /posts/{id}
pub fn get_post_detail(req: Request) -> anyhow::Result<Response> {
    if validate_token(&req).is_none() {
        return Ok(ApiError::Unauthorized.into());
    }

    let post_id = req.path().trim_start_matches("/posts/");
    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    let store = store();
    let post = match load_post(&store, post_id) {
        Ok(p) => p,
        Err(e) => return Ok(ApiError::from(e).into()),
    };

    let summary = summarize(&store, &post)?;
    let comments = match comments_of(&store, post_id) {
        Ok(c) => c,
        Err(e) => return Ok(ApiError::from(e).into()),
    };

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&PostDetail::build(summary, comments))?)
        .build())
}

/// PUT /posts/{id} - author only; the author itself is immutable.
pub fn edit_post(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let post_id = req.path().trim_start_matches("/posts/");
    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    let store = store();
    let viewer = match require_profile(&store, &user_id) {
        Ok(p) => p,
        Err(e) => return Ok(ApiError::from(e).into()),
    };
    let mut post = match load_post(&store, post_id) {
        Ok(p) => p,
        Err(e) => return Ok(ApiError::from(e).into()),
    };
    if post.profile_id != viewer.id {
        return Ok(ApiError::Forbidden.into());
    }

    let value: serde_json::Value = serde_json::from_slice(req.body())?;

    if let Some(title) = value["title"].as_str() {
        if title.is_empty() || title.len() > MAX_TITLE_LENGTH {
            return Ok(ApiError::BadRequest("Invalid title".to_string()).into());
        }
        post.title = sanitize_text(title);
    }
    if let Some(text) = value["text"].as_str() {
        if text.is_empty() || text.len() > MAX_TEXT_LENGTH {
            return Ok(ApiError::BadRequest("Invalid text".to_string()).into());
        }
        post.text = sanitize_text(text);
    }
    if let Some(hashtags) = value["hashtags"].as_str() {
        if hashtags.len() > MAX_HASHTAGS_LENGTH {
            return Ok(ApiError::BadRequest("Hashtags too long".to_string()).into());
        }
        post.hashtags = if hashtags.is_empty() {
            None
        } else {
            Some(sanitize_text(hashtags))
        };
    }

    post.updated = Some(now());
    store.set_json(&post_key(&post.id), &post)?;

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&post)?)
        .build())
}

/// DELETE /posts/{id} - author only; takes comments and reactions along.
pub fn delete_post(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let post_id = req.path().trim_start_matches("/posts/");
    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    let store = store();
    let viewer = match require_profile(&store, &user_id) {
        Ok(p) => p,
        Err(e) => return Ok(ApiError::from(e).into()),
    };
    let post = match load_post(&store, post_id) {
        Ok(p) => p,
        Err(e) => return Ok(ApiError::from(e).into()),
    };
    if post.profile_id != viewer.id {
        return Ok(ApiError::Forbidden.into());
    }

    store.delete(&post_key(post_id))?;
    store.delete(&comments_key(post_id))?;
    store.delete(&reactions_key(post_id))?;

    let mut feed: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();
    feed.retain(|id| id != post_id);
    store.set_json(FEED_KEY, &feed)?;

    Ok(Response::builder().status(204).build())
}
