use spin_sdk::http::{Request, Response};

use crate::auth::validate_token;
use crate::config::*;
use crate::core::db::SocialStore;
use crate::core::errors::{ApiError, SocialError};
use crate::core::helpers::{store, validate_uuid};
use crate::models::records::{Post, Reaction, Stance};
use crate::profiles::require_profile;

/// Apply a stance to a post. At most one reaction per (profile, post):
/// an existing record is overwritten in place, a repeated identical
/// stance is a silent re-save, and `cancel` keeps the record while
/// withdrawing it from both counts. One read-then-write of the post's
/// reaction list.
pub fn react<S: SocialStore>(
    store: &S,
    profile_id: &str,
    post_id: &str,
    stance: Stance,
) -> Result<Reaction, SocialError> {
    if store.get_json::<Post>(&post_key(post_id))?.is_none() {
        return Err(SocialError::NotFound("Post".to_string()));
    }

    let key = reactions_key(post_id);
    let mut reactions: Vec<Reaction> = store.get_json(&key)?.unwrap_or_default();

    let reaction = Reaction {
        profile_id: profile_id.to_string(),
        stance,
    };
    match reactions.iter_mut().find(|r| r.profile_id == profile_id) {
        Some(existing) => existing.stance = stance,
        None => reactions.push(reaction.clone()),
    }
    store.set_json(&key, &reactions)?;

    Ok(reaction)
}

/// The profile's current stance on a post, if it ever reacted.
pub fn stance_of<S: SocialStore>(
    store: &S,
    profile_id: &str,
    post_id: &str,
) -> Result<Option<Stance>, SocialError> {
    let reactions: Vec<Reaction> = store.get_json(&reactions_key(post_id))?.unwrap_or_default();

    Ok(reactions
        .iter()
        .find(|r| r.profile_id == profile_id)
        .map(|r| r.stance))
}

/// Live (likes, dislikes) tally; cancelled records count toward neither.
pub fn reaction_counts<S: SocialStore>(
    store: &S,
    post_id: &str,
) -> Result<(usize, usize), SocialError> {
    let reactions: Vec<Reaction> = store.get_json(&reactions_key(post_id))?.unwrap_or_default();

    let likes = reactions.iter().filter(|r| r.stance == Stance::Like).count();
    let dislikes = reactions
        .iter()
        .filter(|r| r.stance == Stance::Dislike)
        .count();

    Ok((likes, dislikes))
}

// === HTTP Handlers ===

/// POST /posts/{id}/reactions with body {"action": "like" | "dislike" | "cancel"}
pub fn handle_react(req: Request) -> anyhow::Result<Response> {
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
    let stance = match value["action"].as_str() {
        Some("like") => Stance::Like,
        Some("dislike") => Stance::Dislike,
        Some("cancel") => Stance::Cancel,
        _ => {
            return Ok(
                ApiError::BadRequest("Action must be like, dislike or cancel".to_string()).into(),
            )
        }
    };

    let reaction = match react(&store, &viewer.id, post_id, stance) {
        Ok(r) => r,
        Err(e) => return Ok(ApiError::from(e).into()),
    };

    Ok(Response::builder()
        .status(201)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({
            "post_id": post_id,
            "profile_id": reaction.profile_id,
            "action": reaction.stance,
        }))?)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::MemStore;
    use crate::posts::create_post_record;
    use crate::profiles::testing::sample_profile;

    fn reaction_rows(store: &MemStore, post_id: &str) -> Vec<Reaction> {
        store
            .get_json(&reactions_key(post_id))
            .unwrap()
            .unwrap_or_default()
    }

    #[test]
    fn first_reaction_creates_one_record() {
        let store = MemStore::new();
        let author = sample_profile(&store, "Ann");
        let viewer = sample_profile(&store, "Ben");
        let post = create_post_record(&store, &author.id, "Title", "Text", None, None).unwrap();

        react(&store, &viewer.id, &post.id, Stance::Like).unwrap();

        assert_eq!(reaction_rows(&store, &post.id).len(), 1);
        assert_eq!(reaction_counts(&store, &post.id).unwrap(), (1, 0));
        assert_eq!(
            stance_of(&store, &viewer.id, &post.id).unwrap(),
            Some(Stance::Like)
        );
    }

    #[test]
    fn like_then_dislike_overwrites_in_place() {
        let store = MemStore::new();
        let author = sample_profile(&store, "Ann");
        let viewer = sample_profile(&store, "Ben");
        let post = create_post_record(&store, &author.id, "Title", "Text", None, None).unwrap();

        react(&store, &viewer.id, &post.id, Stance::Like).unwrap();
        assert_eq!(reaction_counts(&store, &post.id).unwrap(), (1, 0));

        react(&store, &viewer.id, &post.id, Stance::Dislike).unwrap();

        let rows = reaction_rows(&store, &post.id);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].stance, Stance::Dislike);
        assert_eq!(reaction_counts(&store, &post.id).unwrap(), (0, 1));
    }

    #[test]
    fn repeated_identical_stance_is_a_noop() {
        let store = MemStore::new();
        let author = sample_profile(&store, "Ann");
        let viewer = sample_profile(&store, "Ben");
        let post = create_post_record(&store, &author.id, "Title", "Text", None, None).unwrap();

        react(&store, &viewer.id, &post.id, Stance::Like).unwrap();
        react(&store, &viewer.id, &post.id, Stance::Like).unwrap();

        let rows = reaction_rows(&store, &post.id);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].stance, Stance::Like);
        assert_eq!(reaction_counts(&store, &post.id).unwrap(), (1, 0));
    }

    #[test]
    fn cancel_keeps_the_record_out_of_both_counts() {
        let store = MemStore::new();
        let author = sample_profile(&store, "Ann");
        let viewer = sample_profile(&store, "Ben");
        let post = create_post_record(&store, &author.id, "Title", "Text", None, None).unwrap();

        react(&store, &viewer.id, &post.id, Stance::Like).unwrap();
        react(&store, &viewer.id, &post.id, Stance::Cancel).unwrap();

        let rows = reaction_rows(&store, &post.id);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].stance, Stance::Cancel);
        assert_eq!(reaction_counts(&store, &post.id).unwrap(), (0, 0));
        assert_eq!(
            stance_of(&store, &viewer.id, &post.id).unwrap(),
            Some(Stance::Cancel)
        );
    }

    #[test]
    fn counts_tally_distinct_profiles() {
        let store = MemStore::new();
        let author = sample_profile(&store, "Ann");
        let post = create_post_record(&store, &author.id, "Title", "Text", None, None).unwrap();

        for i in 0..3 {
            let viewer = sample_profile(&store, &format!("Fan{}", i));
            react(&store, &viewer.id, &post.id, Stance::Like).unwrap();
        }
        let critic = sample_profile(&store, "Critic");
        react(&store, &critic.id, &post.id, Stance::Dislike).unwrap();

        assert_eq!(reaction_counts(&store, &post.id).unwrap(), (3, 1));
    }

    #[test]
    fn reacting_to_missing_post_is_not_found() {
        let store = MemStore::new();
        let viewer = sample_profile(&store, "Ben");

        let err = react(&store, &viewer.id, "no-such-post", Stance::Like).unwrap_err();
        assert!(matches!(err, SocialError::NotFound(_)));
    }
}
