//! Fixed response shapes. Each handler picks one variant by context
//! (list vs detail) instead of trimming fields at serialization time.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::models::records::{Comment, Gender, Post, Profile};

#[derive(Serialize)]
pub struct ProfileSummary {
    pub id: String,
    pub full_name: String,
    pub image: Option<String>,
    pub bio: Option<String>,
}

impl ProfileSummary {
    pub fn build(profile: &Profile) -> Self {
        ProfileSummary {
            id: profile.id.clone(),
            full_name: profile.full_name(),
            image: profile.image.clone(),
            bio: profile.bio.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct ProfileDetail {
    pub id: String,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub image: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Gender,
    pub bio: Option<String>,
    pub phone_number: Option<String>,
    pub following: Vec<String>,
    pub followers: Vec<String>,
}

impl ProfileDetail {
    pub fn build(profile: &Profile, following: Vec<String>, followers: Vec<String>) -> Self {
        ProfileDetail {
            id: profile.id.clone(),
            user_id: profile.user_id.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            full_name: profile.full_name(),
            image: profile.image.clone(),
            birth_date: profile.birth_date,
            gender: profile.gender,
            bio: profile.bio.clone(),
            phone_number: profile.phone_number.clone(),
            following,
            followers,
        }
    }
}

/// List shape: the post plus counts derived at query time.
#[derive(Serialize)]
pub struct PostSummary {
    pub id: String,
    pub profile_id: String,
    pub author: String,
    pub title: String,
    pub text: String,
    pub hashtags: Option<String>,
    pub image: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: Option<DateTime<Utc>>,
    pub likes_count: usize,
    pub dislikes_count: usize,
    pub comments_count: usize,
}

impl PostSummary {
    pub fn build(
        post: &Post,
        author: String,
        likes_count: usize,
        dislikes_count: usize,
        comments_count: usize,
    ) -> Self {
        PostSummary {
            id: post.id.clone(),
            profile_id: post.profile_id.clone(),
            author,
            title: post.title.clone(),
            text: post.text.clone(),
            hashtags: post.hashtags.clone(),
            image: post.image.clone(),
            created: post.created,
            updated: post.updated,
            likes_count,
            dislikes_count,
            comments_count,
        }
    }
}

/// Retrieve shape: the list shape with the comment thread embedded.
#[derive(Serialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub summary: PostSummary,
    pub comments: Vec<Comment>,
}

impl PostDetail {
    pub fn build(summary: PostSummary, comments: Vec<Comment>) -> Self {
        PostDetail { summary, comments }
    }
}
