use spin_sdk::http::{Request, Response};

pub mod auth;
pub mod comments;
pub mod config;
pub mod core;
pub mod feed;
pub mod follow;
pub mod likes;
pub mod models;
pub mod posts;
pub mod profiles;
pub mod users;

use crate::core::errors::ApiError;

/// One route table for both entrypoints (Spin component and the native
/// adapter binary).
pub fn route(req: Request) -> anyhow::Result<Response> {
    let method = req.method().to_string();
    let path = req.path().to_string();

    match (method.as_str(), path.as_str()) {
        ("POST", "/users") => users::create_user(req),
        ("POST", "/login") => auth::login_user(req),
        ("POST", "/logout") => auth::logout_user(req),
        ("GET", "/me") => users::get_me(req),
        ("PUT", "/me") => users::update_me(req),
        ("POST", "/profiles") => profiles::create_profile(req),
        ("GET", "/profiles") => profiles::list_profiles(req),
        ("GET", "/following") => follow::list_following(req),
        ("GET", "/followers") => follow::list_followers(req),
        ("POST", p) if p.starts_with("/profiles/") && p.ends_with("/follow") => {
            follow::handle_follow_toggle(req)
        }
        ("POST", p) if p.starts_with("/profiles/") && p.ends_with("/upload-image") => {
            profiles::upload_image(req)
        }
        ("GET", p) if p.starts_with("/profiles/") => profiles::get_profile_detail(req),
        ("PUT", p) if p.starts_with("/profiles/") => profiles::update_profile(req),
        ("GET", "/posts") => feed::list_feed(req),
        ("GET", "/posts/my") => feed::list_my_posts(req),
        ("GET", "/posts/liked") => feed::list_liked_posts(req),
        ("POST", "/posts") => posts::create_post(req),
        ("POST", p) if p.starts_with("/posts/") && p.ends_with("/comments") => {
            comments::handle_add_comment(req)
        }
        ("GET", p) if p.starts_with("/posts/") && p.ends_with("/comments") => {
            comments::list_post_comments(req)
        }
        ("POST", p) if p.starts_with("/posts/") && p.ends_with("/reactions") => {
            likes::handle_react(req)
        }
        ("GET", p) if p.starts_with("/posts/") => posts::get_post_detail(req),
        ("PUT", p) if p.starts_with("/posts/") => posts::edit_post(req),
        ("DELETE", p) if p.starts_with("/posts/") => posts::delete_post(req),
        _ => Ok(ApiError::NotFound("No route found".to_string()).into()),
    }
}

#[cfg(target_arch = "wasm32")]
mod component {
    use spin_sdk::http::{IntoResponse, Request};
    use spin_sdk::http_component;

    use crate::core::db;
    use crate::core::helpers::store;

    #[http_component]
    fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
        let _ = db::init_demo_data(&store());
        crate::route(req)
    }
}
