use spin_sdk::http::{Request, Response};

use crate::auth::validate_token;
use crate::config::*;
use crate::core::db::SocialStore;
use crate::core::errors::{ApiError, SocialError};
use crate::core::helpers::{store, validate_uuid};
use crate::models::records::Profile;
use crate::models::views::ProfileSummary;
use crate::profiles::{load_profile, require_profile};

/// What a toggle call did to the edge.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FollowOutcome {
    Following,
    Unfollowing,
}

/// Toggle the directed edge `viewer -> target`. A repeated call restores
/// the original graph; following yourself is always rejected before any
/// read. One read-modify-write of the viewer's following list.
pub fn follow_or_unfollow<S: SocialStore>(
    store: &S,
    viewer_id: &str,
    target_id: &str,
) -> Result<FollowOutcome, SocialError> {
    if viewer_id == target_id {
        return Err(SocialError::SelfRelation);
    }
    if store
        .get_json::<Profile>(&profile_key(target_id))?
        .is_none()
    {
        return Err(SocialError::NotFound("Profile".to_string()));
    }

    let key = followings_key(viewer_id);
    let mut followings: Vec<String> = store.get_json(&key)?.unwrap_or_default();

    let outcome = if let Some(pos) = followings.iter().position(|id| id == target_id) {
        followings.remove(pos);
        FollowOutcome::Unfollowing
    } else {
        followings.push(target_id.to_string());
        FollowOutcome::Following
    };
    store.set_json(&key, &followings)?;

    Ok(outcome)
}

/// Profile ids the given profile follows, id-ascending.
pub fn followings_of<S: SocialStore>(
    store: &S,
    profile_id: &str,
) -> Result<Vec<String>, SocialError> {
    let mut followings: Vec<String> = store
        .get_json(&followings_key(profile_id))?
        .unwrap_or_default();
    followings.sort();

    Ok(followings)
}

/// Profile ids following the given profile, id-ascending. The relation is
/// stored in one direction only, so the reverse side is derived by
/// scanning every profile's following list.
pub fn followers_of<S: SocialStore>(
    store: &S,
    profile_id: &str,
) -> Result<Vec<String>, SocialError> {
    let profiles: Vec<String> = store.get_json(PROFILES_LIST_KEY)?.unwrap_or_default();
    let mut followers = Vec::new();

    for id in profiles {
        let followings: Vec<String> = store.get_json(&followings_key(&id))?.unwrap_or_default();
        if followings.iter().any(|f| f == profile_id) {
            followers.push(id);
        }
    }
    followers.sort();

    Ok(followers)
}

pub fn is_following<S: SocialStore>(
    store: &S,
    viewer_id: &str,
    target_id: &str,
) -> Result<bool, SocialError> {
    let followings: Vec<String> = store
        .get_json(&followings_key(viewer_id))?
        .unwrap_or_default();

    Ok(followings.iter().any(|id| id == target_id))
}

// === HTTP Handlers ===

/// POST /profiles/{id}/follow
pub fn handle_follow_toggle(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let viewer = match require_profile(&store, &user_id) {
        Ok(p) => p,
        Err(e) => return Ok(ApiError::from(e).into()),
    };

    let target_id = req.path().split('/').nth(2).unwrap_or("");
    if target_id.is_empty() || !validate_uuid(target_id) {
        return Ok(ApiError::BadRequest("Invalid target profile".to_string()).into());
    }

    let outcome = match follow_or_unfollow(&store, &viewer.id, target_id) {
        Ok(o) => o,
        Err(e) => return Ok(ApiError::from(e).into()),
    };

    let target = load_profile(&store, target_id)?;
    let detail = match outcome {
        FollowOutcome::Following => {
            format!("Now you are following user {}.", target.full_name())
        }
        FollowOutcome::Unfollowing => {
            format!("Now you are unfollowing user {}.", target.full_name())
        }
    };

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({ "detail": detail }))?)
        .build())
}

fn profile_summaries<S: SocialStore>(store: &S, ids: &[String]) -> anyhow::Result<Vec<ProfileSummary>> {
    let mut summaries = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(profile) = store.get_json::<Profile>(&profile_key(id))? {
            summaries.push(ProfileSummary::build(&profile));
        }
    }
    Ok(summaries)
}

/// GET /following
pub fn list_following(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let viewer = match require_profile(&store, &user_id) {
        Ok(p) => p,
        Err(e) => return Ok(ApiError::from(e).into()),
    };

    let ids = match followings_of(&store, &viewer.id) {
        Ok(ids) => ids,
        Err(e) => return Ok(ApiError::from(e).into()),
    };

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&profile_summaries(&store, &ids)?)?)
        .build())
}

/// GET /followers
pub fn list_followers(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let viewer = match require_profile(&store, &user_id) {
        Ok(p) => p,
        Err(e) => return Ok(ApiError::from(e).into()),
    };

    let ids = match followers_of(&store, &viewer.id) {
        Ok(ids) => ids,
        Err(e) => return Ok(ApiError::from(e).into()),
    };

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&profile_summaries(&store, &ids)?)?)
        .build())
}
