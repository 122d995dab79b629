pub const USERS_LIST_KEY: &str = "users_list";
pub const PROFILES_LIST_KEY: &str = "profiles_list";
pub const TOKENS_LIST_KEY: &str = "tokens_list";
pub const FEED_KEY: &str = "feed";

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MIN_PASSWORD_LENGTH: usize = 3;
pub const MAX_NAME_LENGTH: usize = 255;
pub const MAX_BIO_LENGTH: usize = 255;
pub const MAX_PHONE_LENGTH: usize = 12;
pub const MAX_TITLE_LENGTH: usize = 255;
pub const MAX_TEXT_LENGTH: usize = 5000;
pub const MAX_HASHTAGS_LENGTH: usize = 125;
pub const MAX_COMMENT_LENGTH: usize = 255;
pub const POSTS_PER_PAGE: usize = 20;

pub fn user_key(id: &str) -> String {
    format!("user:{}", id)
}

pub fn token_key(token: &str) -> String {
    format!("token:{}", token)
}

pub fn profile_key(id: &str) -> String {
    format!("profile:{}", id)
}

/// Index from account id to the account's single profile id.
pub fn profile_user_key(user_id: &str) -> String {
    format!("profile_user:{}", user_id)
}

pub fn followings_key(profile_id: &str) -> String {
    format!("followings:{}", profile_id)
}

pub fn post_key(id: &str) -> String {
    format!("post:{}", id)
}

pub fn comments_key(post_id: &str) -> String {
    format!("comments:{}", post_id)
}

pub fn reactions_key(post_id: &str) -> String {
    format!("reactions:{}", post_id)
}

pub fn token_expiration_hours() -> i64 {
    std::env::var("RIPPLE_TOKEN_EXPIRATION_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(24)
}
