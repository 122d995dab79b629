use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Auth account. Profiles, posts and reactions hang off the profile,
/// not the account.
#[derive(Serialize, Deserialize, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum Gender {
    Male,
    Female,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Profile {
    pub id: String,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub image: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Gender,
    pub bio: Option<String>,
    pub phone_number: Option<String>,
}

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Author is fixed at creation time; edits touch title/text/hashtags only.
#[derive(Serialize, Deserialize, Clone)]
pub struct Post {
    pub id: String,
    pub profile_id: String,
    pub title: String,
    pub text: String,
    pub hashtags: Option<String>,
    pub image: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub profile_id: String,
    pub text: String,
    pub created: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Like,
    Dislike,
    Cancel,
}

/// One record per (profile, post) pair; the post id is the storage key,
/// so the record itself carries only the profile side.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Reaction {
    pub profile_id: String,
    pub stance: Stance,
}

#[derive(Serialize, Deserialize)]
pub struct TokenData {
    pub user_id: String,
    pub created_at: String,
}
