use std::collections::HashSet;

use spin_sdk::http::{Request, Response};

use crate::auth::validate_token;
use crate::comments::comments_of;
use crate::config::*;
use crate::core::db::SocialStore;
use crate::core::errors::{ApiError, SocialError};
use crate::core::helpers::store;
use crate::core::query_params::{paginate, QueryParams};
use crate::follow::followings_of;
use crate::likes::{reaction_counts, stance_of};
use crate::models::records::{Post, Profile, Stance};
use crate::models::views::PostSummary;
use crate::profiles::require_profile;

/// Optional narrowing of a post listing; both filters are
/// case-insensitive substring matches and compose as an intersection.
#[derive(Default)]
pub struct PostFilters {
    pub text: Option<String>,
    pub hashtag: Option<String>,
}

impl PostFilters {
    pub fn from_query(params: &QueryParams) -> Self {
        PostFilters {
            text: params.get("text").map(|s| s.to_string()),
            hashtag: params.get("hashtag").map(|s| s.to_string()),
        }
    }

    fn matches(&self, post: &Post) -> bool {
        if let Some(needle) = &self.text {
            let needle = needle.to_lowercase();
            if !post.title.to_lowercase().contains(&needle)
                && !post.text.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if let Some(needle) = &self.hashtag {
            let needle = needle.to_lowercase();
            match &post.hashtags {
                Some(hashtags) if hashtags.to_lowercase().contains(&needle) => {}
                _ => return false,
            }
        }
        true
    }
}

/// Annotate one post with its author name and live reaction counts.
pub fn summarize<S: SocialStore>(store: &S, post: &Post) -> Result<PostSummary, SocialError> {
    let author = store
        .get_json::<Profile>(&profile_key(&post.profile_id))?
        .map(|p| p.full_name())
        .unwrap_or_default();
    let (likes, dislikes) = reaction_counts(store, &post.id)?;
    let comments = comments_of(store, &post.id)?.len();

    Ok(PostSummary::build(post, author, likes, dislikes, comments))
}

/// Walk the global feed once, deduplicating ids, and keep the posts the
/// caller's predicate accepts and the filters match.
fn collect_posts<S, F>(
    store: &S,
    filters: &PostFilters,
    mut keep: F,
) -> Result<Vec<Post>, SocialError>
where
    S: SocialStore,
    F: FnMut(&Post) -> Result<bool, SocialError>,
{
    let feed: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();
    let mut seen = HashSet::new();
    let mut posts = Vec::new();

    for id in feed {
        if !seen.insert(id.clone()) {
            continue;
        }
        if let Some(post) = store.get_json::<Post>(&post_key(&id))? {
            if keep(&post)? && filters.matches(&post) {
                posts.push(post);
            }
        }
    }

    Ok(posts)
}

fn annotate<S: SocialStore>(
    store: &S,
    mut posts: Vec<Post>,
) -> Result<Vec<PostSummary>, SocialError> {
    // newest first; the stable sort keeps feed order for equal stamps
    posts.sort_by(|a, b| b.created.cmp(&a.created));

    let mut summaries = Vec::with_capacity(posts.len());
    for post in &posts {
        summaries.push(summarize(store, post)?);
    }

    Ok(summaries)
}

/// The feed a profile is authorized to see: its own posts plus the posts
/// of every profile it follows.
pub fn visible_posts<S: SocialStore>(
    store: &S,
    viewer_id: &str,
    filters: &PostFilters,
) -> Result<Vec<PostSummary>, SocialError> {
    let followings = followings_of(store, viewer_id)?;
    let posts = collect_posts(store, filters, |post| {
        Ok(post.profile_id == viewer_id || followings.contains(&post.profile_id))
    })?;

    annotate(store, posts)
}

/// Only the viewer's own posts, same filter/order/annotation rules.
pub fn my_posts<S: SocialStore>(
    store: &S,
    viewer_id: &str,
    filters: &PostFilters,
) -> Result<Vec<PostSummary>, SocialError> {
    let posts = collect_posts(store, filters, |post| Ok(post.profile_id == viewer_id))?;

    annotate(store, posts)
}

/// Posts the viewer currently likes, same filter/order/annotation rules.
pub fn liked_posts<S: SocialStore>(
    store: &S,
    viewer_id: &str,
    filters: &PostFilters,
) -> Result<Vec<PostSummary>, SocialError> {
    let posts = collect_posts(store, filters, |post| {
        Ok(stance_of(store, viewer_id, &post.id)? == Some(Stance::Like))
    })?;

    annotate(store, posts)
}

// === HTTP Handlers ===

fn listing_response<S: SocialStore>(
    store: &S,
    req: &Request,
    resolve: fn(&S, &str, &PostFilters) -> Result<Vec<PostSummary>, SocialError>,
) -> anyhow::Result<Response> {
    let user_id = match validate_token(req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let viewer = match require_profile(store, &user_id) {
        Ok(p) => p,
        Err(e) => return Ok(ApiError::from(e).into()),
    };

    let params = QueryParams::parse(req.uri());
    let filters = PostFilters::from_query(&params);

    let summaries = match resolve(store, &viewer.id, &filters) {
        Ok(s) => s,
        Err(e) => return Ok(ApiError::from(e).into()),
    };

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&paginate(summaries, params.page()))?)
        .build())
}

/// GET /posts?text=&hashtag=&page=
pub fn list_feed(req: Request) -> anyhow::Result<Response> {
    let store = store();
    listing_response(&store, &req, visible_posts)
}

/// GET /posts/my
pub fn list_my_posts(req: Request) -> anyhow::Result<Response> {
    let store = store();
    listing_response(&store, &req, my_posts)
}

/// GET /posts/liked
pub fn list_liked_posts(req: Request) -> anyhow::Result<Response> {
    let store = store();
    listing_response(&store, &req, liked_posts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::MemStore;
    use crate::follow::follow_or_unfollow;
    use crate::likes::react;
    use crate::posts::create_post_record;
    use crate::profiles::testing::sample_profile;

    fn ids(summaries: &[PostSummary]) -> Vec<String> {
        summaries.iter().map(|s| s.id.clone()).collect()
    }

    #[test]
    fn feed_is_own_posts_plus_followed_authors() {
        let store = MemStore::new();
        let viewer = sample_profile(&store, "Ann");
        let followed = sample_profile(&store, "Ben");
        let stranger = sample_profile(&store, "Cam");

        follow_or_unfollow(&store, &viewer.id, &followed.id).unwrap();

        let own = create_post_record(&store, &viewer.id, "Mine", "text", None, None).unwrap();
        let theirs = create_post_record(&store, &followed.id, "Ben's", "text", None, None).unwrap();
        create_post_record(&store, &stranger.id, "Cam's", "text", None, None).unwrap();

        let feed = visible_posts(&store, &viewer.id, &PostFilters::default()).unwrap();
        let feed_ids = ids(&feed);

        assert_eq!(feed.len(), 2);
        assert!(feed_ids.contains(&own.id));
        assert!(feed_ids.contains(&theirs.id));
    }

    #[test]
    fn unfollow_removes_posts_from_feed() {
        let store = MemStore::new();
        let viewer = sample_profile(&store, "Ann");
        let author = sample_profile(&store, "Ben");

        follow_or_unfollow(&store, &viewer.id, &author.id).unwrap();
        let post = create_post_record(&store, &author.id, "Hello", "text", None, None).unwrap();

        let before = visible_posts(&store, &viewer.id, &PostFilters::default()).unwrap();
        assert!(ids(&before).contains(&post.id));

        // second toggle unfollows
        follow_or_unfollow(&store, &viewer.id, &author.id).unwrap();
        let after = visible_posts(&store, &viewer.id, &PostFilters::default()).unwrap();
        assert!(!ids(&after).contains(&post.id));
    }

    #[test]
    fn feed_orders_newest_first() {
        let store = MemStore::new();
        let viewer = sample_profile(&store, "Ann");

        let first = create_post_record(&store, &viewer.id, "First", "text", None, None).unwrap();
        let second = create_post_record(&store, &viewer.id, "Second", "text", None, None).unwrap();
        let third = create_post_record(&store, &viewer.id, "Third", "text", None, None).unwrap();

        let feed = visible_posts(&store, &viewer.id, &PostFilters::default()).unwrap();
        assert_eq!(ids(&feed), vec![third.id, second.id, first.id]);
    }

    #[test]
    fn text_filter_is_a_subset_matching_title_or_text() {
        let store = MemStore::new();
        let viewer = sample_profile(&store, "Ann");

        let by_title =
            create_post_record(&store, &viewer.id, "Rust tips", "body", None, None).unwrap();
        let by_text =
            create_post_record(&store, &viewer.id, "Other", "all about RUST here", None, None)
                .unwrap();
        create_post_record(&store, &viewer.id, "Gardening", "tomatoes", None, None).unwrap();

        let unfiltered = visible_posts(&store, &viewer.id, &PostFilters::default()).unwrap();
        let filters = PostFilters {
            text: Some("rust".to_string()),
            ..Default::default()
        };
        let filtered = visible_posts(&store, &viewer.id, &filters).unwrap();

        assert_eq!(filtered.len(), 2);
        let filtered_ids = ids(&filtered);
        assert!(filtered_ids.contains(&by_title.id));
        assert!(filtered_ids.contains(&by_text.id));
        assert!(filtered_ids.iter().all(|id| ids(&unfiltered).contains(id)));
    }

    #[test]
    fn combined_filters_intersect() {
        let store = MemStore::new();
        let viewer = sample_profile(&store, "Ann");

        let both = create_post_record(
            &store,
            &viewer.id,
            "Rust tricks",
            "body",
            Some("systems"),
            None,
        )
        .unwrap();
        create_post_record(&store, &viewer.id, "Rust intro", "body", Some("beginners"), None)
            .unwrap();
        create_post_record(&store, &viewer.id, "Cooking", "body", Some("systems"), None).unwrap();

        let filters = PostFilters {
            text: Some("rust".to_string()),
            hashtag: Some("systems".to_string()),
        };
        let filtered = visible_posts(&store, &viewer.id, &filters).unwrap();

        assert_eq!(ids(&filtered), vec![both.id]);
    }

    #[test]
    fn my_posts_excludes_followed_authors() {
        let store = MemStore::new();
        let viewer = sample_profile(&store, "Ann");
        let followed = sample_profile(&store, "Ben");
        follow_or_unfollow(&store, &viewer.id, &followed.id).unwrap();

        let mine = create_post_record(&store, &viewer.id, "Mine", "text", None, None).unwrap();
        create_post_record(&store, &followed.id, "Ben's", "text", None, None).unwrap();

        let listed = my_posts(&store, &viewer.id, &PostFilters::default()).unwrap();
        assert_eq!(ids(&listed), vec![mine.id]);
    }

    #[test]
    fn liked_posts_tracks_current_stance() {
        let store = MemStore::new();
        let viewer = sample_profile(&store, "Ann");
        let author = sample_profile(&store, "Ben");

        let liked = create_post_record(&store, &author.id, "Liked", "text", None, None).unwrap();
        let dropped =
            create_post_record(&store, &author.id, "Dropped", "text", None, None).unwrap();
        create_post_record(&store, &author.id, "Ignored", "text", None, None).unwrap();

        react(&store, &viewer.id, &liked.id, Stance::Like).unwrap();
        react(&store, &viewer.id, &dropped.id, Stance::Like).unwrap();
        react(&store, &viewer.id, &dropped.id, Stance::Cancel).unwrap();

        let listed = liked_posts(&store, &viewer.id, &PostFilters::default()).unwrap();
        assert_eq!(ids(&listed), vec![liked.id]);
    }

    #[test]
    fn summaries_carry_live_counts() {
        let store = MemStore::new();
        let viewer = sample_profile(&store, "Ann");
        let fan = sample_profile(&store, "Ben");
        let critic = sample_profile(&store, "Cam");

        let post = create_post_record(&store, &viewer.id, "Counted", "text", None, None).unwrap();
        react(&store, &fan.id, &post.id, Stance::Like).unwrap();
        react(&store, &critic.id, &post.id, Stance::Dislike).unwrap();

        let feed = visible_posts(&store, &viewer.id, &PostFilters::default()).unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].likes_count, 1);
        assert_eq!(feed[0].dislikes_count, 1);
        assert_eq!(feed[0].author, viewer.full_name());

        // switching the stance moves the counts, never duplicates them
        react(&store, &fan.id, &post.id, Stance::Dislike).unwrap();
        let feed = visible_posts(&store, &viewer.id, &PostFilters::default()).unwrap();
        assert_eq!(feed[0].likes_count, 0);
        assert_eq!(feed[0].dislikes_count, 2);
    }

    #[test]
    fn duplicate_feed_entries_surface_once() {
        let store = MemStore::new();
        let viewer = sample_profile(&store, "Ann");
        let post = create_post_record(&store, &viewer.id, "Once", "text", None, None).unwrap();

        // simulate a double-insert of the same id in the global feed list
        let mut feed: Vec<String> = store.get_json(FEED_KEY).unwrap().unwrap_or_default();
        feed.insert(0, post.id.clone());
        store.set_json(FEED_KEY, &feed).unwrap();

        let listed = visible_posts(&store, &viewer.id, &PostFilters::default()).unwrap();
        assert_eq!(listed.len(), 1);
    }
}
