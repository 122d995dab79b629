use spin_sdk::http::{Request, Response};
use uuid::Uuid;

use crate::auth::validate_token;
use crate::config::*;
use crate::core::db::SocialStore;
use crate::core::errors::{ApiError, SocialError};
use crate::core::helpers::{now, sanitize_text, store, validate_uuid};
use crate::models::records::{Comment, Post};
use crate::profiles::require_profile;

/// Attach a comment to a post. The post's comment list is kept
/// newest-first, so a single prepend preserves the ordering.
pub fn add_comment<S: SocialStore>(
    store: &S,
    profile_id: &str,
    post_id: &str,
    text: &str,
) -> Result<Comment, SocialError> {
    if store.get_json::<Post>(&post_key(post_id))?.is_none() {
        return Err(SocialError::NotFound("Post".to_string()));
    }

    let comment = Comment {
        id: Uuid::new_v4().to_string(),
        post_id: post_id.to_string(),
        profile_id: profile_id.to_string(),
        text: text.to_string(),
        created: now(),
    };

    let key = comments_key(post_id);
    let mut comments: Vec<Comment> = store.get_json(&key)?.unwrap_or_default();
    comments.insert(0, comment.clone());
    store.set_json(&key, &comments)?;

    Ok(comment)
}

/// A post's comments, newest first.
pub fn comments_of<S: SocialStore>(store: &S, post_id: &str) -> Result<Vec<Comment>, SocialError> {
    let comments: Vec<Comment> = store.get_json(&comments_key(post_id))?.unwrap_or_default();

    Ok(comments)
}

// === HTTP Handlers ===

/// POST /posts/{id}/comments
pub fn handle_add_comment(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let viewer = match require_profile(&store, &user_id) {
        Ok(p) => p,
        Err(e) => return Ok(ApiError::from(e).into()),
    };

    let post_id = req.path().split('/').nth(2).unwrap_or("");
    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    let value: serde_json::Value = serde_json::from_slice(req.body())?;
    let text = value["text"].as_str().unwrap_or_default();
    if text.is_empty() || text.len() > MAX_COMMENT_LENGTH {
        return Ok(ApiError::BadRequest("Invalid comment text".to_string()).into());
    }

    let comment = match add_comment(&store, &viewer.id, post_id, &sanitize_text(text)) {
        Ok(c) => c,
        Err(e) => return Ok(ApiError::from(e).into()),
    };

    Ok(Response::builder()
        .status(201)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&comment)?)
        .build())
}

/// GET /posts/{id}/comments
pub fn list_post_comments(req: Request) -> anyhow::Result<Response> {
    if validate_token(&req).is_none() {
        return Ok(ApiError::Unauthorized.into());
    }

    let post_id = req.path().split('/').nth(2).unwrap_or("");
    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    let store = store();
    if let Err(e) = crate::posts::load_post(&store, post_id) {
        return Ok(ApiError::from(e).into());
    }

    let comments = match comments_of(&store, post_id) {
        Ok(c) => c,
        Err(e) => return Ok(ApiError::from(e).into()),
    };

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&comments)?)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::MemStore;
    use crate::posts::create_post_record;
    use crate::profiles::testing::sample_profile;

    #[test]
    fn comments_attach_to_their_post() {
        let store = MemStore::new();
        let author = sample_profile(&store, "Ann");
        let commenter = sample_profile(&store, "Ben");
        let post = create_post_record(&store, &author.id, "Title", "Text", None, None).unwrap();
        let other = create_post_record(&store, &author.id, "Other", "Text", None, None).unwrap();

        let comment = add_comment(&store, &commenter.id, &post.id, "nice one").unwrap();

        let listed = comments_of(&store, &post.id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, comment.id);
        assert_eq!(listed[0].profile_id, commenter.id);
        assert!(comments_of(&store, &other.id).unwrap().is_empty());
    }

    #[test]
    fn comments_list_newest_first() {
        let store = MemStore::new();
        let author = sample_profile(&store, "Ann");
        let post = create_post_record(&store, &author.id, "Title", "Text", None, None).unwrap();

        let first = add_comment(&store, &author.id, &post.id, "first").unwrap();
        let second = add_comment(&store, &author.id, &post.id, "second").unwrap();

        let listed = comments_of(&store, &post.id).unwrap();
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[test]
    fn commenting_on_missing_post_is_not_found() {
        let store = MemStore::new();
        let commenter = sample_profile(&store, "Ben");

        let err = add_comment(&store, &commenter.id, "no-such-post", "hello").unwrap_err();
        assert!(matches!(err, SocialError::NotFound(_)));
    }
}
