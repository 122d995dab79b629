use chrono::NaiveDate;
use spin_sdk::http::{Request, Response};
use uuid::Uuid;

use crate::auth::validate_token;
use crate::config::*;
use crate::core::db::SocialStore;
use crate::core::errors::{ApiError, SocialError};
use crate::core::helpers::{sanitize_text, store, upload_path, validate_uuid};
use crate::core::query_params::{paginate, QueryParams};
use crate::follow::{followers_of, followings_of};
use crate::models::records::{Gender, Profile};
use crate::models::views::{ProfileDetail, ProfileSummary};

pub struct NewProfile {
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub birth_date: Option<NaiveDate>,
    pub bio: Option<String>,
    pub phone_number: Option<String>,
}

pub fn create_profile_record<S: SocialStore>(
    store: &S,
    user_id: &str,
    new: NewProfile,
) -> Result<Profile, SocialError> {
    let profile = Profile {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        first_name: new.first_name,
        last_name: new.last_name,
        image: None,
        birth_date: new.birth_date,
        gender: new.gender,
        bio: new.bio,
        phone_number: new.phone_number,
    };

    store.set_json(&profile_key(&profile.id), &profile)?;
    store.set_json(&profile_user_key(user_id), &profile.id)?;

    let mut profiles: Vec<String> = store.get_json(PROFILES_LIST_KEY)?.unwrap_or_default();
    profiles.push(profile.id.clone());
    store.set_json(PROFILES_LIST_KEY, &profiles)?;

    Ok(profile)
}

pub fn load_profile<S: SocialStore>(store: &S, profile_id: &str) -> Result<Profile, SocialError> {
    store
        .get_json(&profile_key(profile_id))?
        .ok_or_else(|| SocialError::NotFound("Profile".to_string()))
}

/// The single profile belonging to an account, if one was created.
pub fn profile_of_user<S: SocialStore>(
    store: &S,
    user_id: &str,
) -> Result<Option<Profile>, SocialError> {
    let profile_id: Option<String> = store.get_json(&profile_user_key(user_id))?;
    match profile_id {
        Some(id) => Ok(store.get_json(&profile_key(&id))?),
        None => Ok(None),
    }
}

pub fn require_profile<S: SocialStore>(store: &S, user_id: &str) -> Result<Profile, SocialError> {
    profile_of_user(store, user_id)?
        .ok_or_else(|| SocialError::NotFound("Profile for current user".to_string()))
}

#[derive(Default)]
pub struct ProfileFilters {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

impl ProfileFilters {
    pub fn from_query(params: &QueryParams) -> Self {
        ProfileFilters {
            first_name: params.get("first_name").map(|s| s.to_string()),
            last_name: params.get("last_name").map(|s| s.to_string()),
            birth_date: params.date("birth_date"),
        }
    }

    fn matches(&self, profile: &Profile) -> bool {
        if let Some(needle) = &self.first_name {
            if !profile
                .first_name
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }
        if let Some(needle) = &self.last_name {
            if !profile
                .last_name
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }
        if let Some(date) = self.birth_date {
            if profile.birth_date != Some(date) {
                return false;
            }
        }
        true
    }
}

/// All profiles passing the filters, id-ascending.
pub fn list_profiles_filtered<S: SocialStore>(
    store: &S,
    filters: &ProfileFilters,
) -> Result<Vec<Profile>, SocialError> {
    let mut ids: Vec<String> = store.get_json(PROFILES_LIST_KEY)?.unwrap_or_default();
    ids.sort();

    let mut profiles = Vec::new();
    for id in ids {
        if let Some(profile) = store.get_json::<Profile>(&profile_key(&id))? {
            if filters.matches(&profile) {
                profiles.push(profile);
            }
        }
    }

    Ok(profiles)
}

fn detail_response<S: SocialStore>(store: &S, profile: &Profile) -> anyhow::Result<Response> {
    let following = followings_of(store, &profile.id)?;
    let followers = followers_of(store, &profile.id)?;

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&ProfileDetail::build(
            profile, following, followers,
        ))?)
        .build())
}

// === HTTP Handlers ===

/// POST /profiles
pub fn create_profile(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    if profile_of_user(&store, &user_id)?.is_some() {
        return Ok(ApiError::Conflict("Profile already exists".to_string()).into());
    }

    let value: serde_json::Value = serde_json::from_slice(req.body())?;
    let first_name = value["first_name"].as_str().unwrap_or_default();
    let last_name = value["last_name"].as_str().unwrap_or_default();

    if first_name.is_empty() || first_name.len() > MAX_NAME_LENGTH {
        return Ok(ApiError::BadRequest("First name is required".to_string()).into());
    }
    if last_name.is_empty() || last_name.len() > MAX_NAME_LENGTH {
        return Ok(ApiError::BadRequest("Last name is required".to_string()).into());
    }

    let gender = match value["gender"].as_str() {
        Some("Male") => Gender::Male,
        Some("Female") => Gender::Female,
        _ => return Ok(ApiError::BadRequest("Gender must be Male or Female".to_string()).into()),
    };

    let birth_date = match value["birth_date"].as_str() {
        Some(date) => match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                return Ok(ApiError::BadRequest("Invalid birth date".to_string()).into());
            }
        },
        None => None,
    };

    let bio = match value["bio"].as_str() {
        Some(bio) if bio.len() > MAX_BIO_LENGTH => {
            return Ok(ApiError::BadRequest("Bio too long (max 255 chars)".to_string()).into())
        }
        Some(bio) if !bio.is_empty() => Some(sanitize_text(bio)),
        _ => None,
    };

    let phone_number = match value["phone_number"].as_str() {
        Some(phone) if phone.len() > MAX_PHONE_LENGTH => {
            return Ok(ApiError::BadRequest("Invalid phone number".to_string()).into())
        }
        Some(phone) if !phone.is_empty() => Some(phone.to_string()),
        _ => None,
    };

    let profile = match create_profile_record(
        &store,
        &user_id,
        NewProfile {
            first_name: sanitize_text(first_name),
            last_name: sanitize_text(last_name),
            gender,
            birth_date,
            bio,
            phone_number,
        },
    ) {
        Ok(p) => p,
        Err(e) => return Ok(ApiError::from(e).into()),
    };

    Ok(Response::builder()
        .status(201)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&ProfileDetail::build(
            &profile,
            Vec::new(),
            Vec::new(),
        ))?)
        .build())
}

/// GET /profiles?first_name=&last_name=&birth_date=&page=
pub fn list_profiles(req: Request) -> anyhow::Result<Response> {
    if validate_token(&req).is_none() {
        return Ok(ApiError::Unauthorized.into());
    }

    let store = store();
    let params = QueryParams::parse(req.uri());
    let filters = ProfileFilters::from_query(&params);

    let profiles = match list_profiles_filtered(&store, &filters) {
        Ok(p) => p,
        Err(e) => return Ok(ApiError::from(e).into()),
    };
    let summaries: Vec<ProfileSummary> = paginate(profiles, params.page())
        .iter()
        .map(ProfileSummary::build)
        .collect();

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&summaries)?)
        .build())
}

/// GET /profiles/{id}
pub fn get_profile_detail(req: Request) -> anyhow::Result<Response> {
    if validate_token(&req).is_none() {
        return Ok(ApiError::Unauthorized.into());
    }

    let profile_id = req.path().trim_start_matches("/profiles/");
    if profile_id.is_empty() || !validate_uuid(profile_id) {
        return Ok(ApiError::BadRequest("Profile ID required".to_string()).into());
    }

    let store = store();
    match load_profile(&store, profile_id) {
        Ok(profile) => detail_response(&store, &profile),
        Err(e) => Ok(ApiError::from(e).into()),
    }
}

/// PUT /profiles/{id} - owner only
pub fn update_profile(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let profile_id = req.path().trim_start_matches("/profiles/");
    if profile_id.is_empty() || !validate_uuid(profile_id) {
        return Ok(ApiError::BadRequest("Profile ID required".to_string()).into());
    }

    let store = store();
    let mut profile = match load_profile(&store, profile_id) {
        Ok(p) => p,
        Err(e) => return Ok(ApiError::from(e).into()),
    };
    if profile.user_id != user_id {
        return Ok(ApiError::Forbidden.into());
    }

    let value: serde_json::Value = serde_json::from_slice(req.body())?;

    if let Some(first_name) = value["first_name"].as_str() {
        if first_name.is_empty() || first_name.len() > MAX_NAME_LENGTH {
            return Ok(ApiError::BadRequest("Invalid first name".to_string()).into());
        }
        profile.first_name = sanitize_text(first_name);
    }
    if let Some(last_name) = value["last_name"].as_str() {
        if last_name.is_empty() || last_name.len() > MAX_NAME_LENGTH {
            return Ok(ApiError::BadRequest("Invalid last name".to_string()).into());
        }
        profile.last_name = sanitize_text(last_name);
    }
    if let Some(bio) = value["bio"].as_str() {
        if bio.len() > MAX_BIO_LENGTH {
            return Ok(ApiError::BadRequest("Bio too long (max 255 chars)".to_string()).into());
        }
        let sanitized = sanitize_text(bio);
        profile.bio = if sanitized.is_empty() {
            None
        } else {
            Some(sanitized)
        };
    }
    if let Some(phone) = value["phone_number"].as_str() {
        if phone.len() > MAX_PHONE_LENGTH {
            return Ok(ApiError::BadRequest("Invalid phone number".to_string()).into());
        }
        profile.phone_number = if phone.is_empty() {
            None
        } else {
            Some(phone.to_string())
        };
    }
    if let Some(date) = value["birth_date"].as_str() {
        match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            Ok(parsed) => profile.birth_date = Some(parsed),
            Err(_) => {
                return Ok(ApiError::BadRequest("Invalid birth date".to_string()).into());
            }
        }
    }

    store.set_json(&profile_key(&profile.id), &profile)?;

    detail_response(&store, &profile)
}

/// POST /profiles/{id}/upload-image - owner only. The body names the
/// original file; the stored value is the object-storage reference.
pub fn upload_image(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let profile_id = req.path().split('/').nth(2).unwrap_or("");
    if profile_id.is_empty() || !validate_uuid(profile_id) {
        return Ok(ApiError::BadRequest("Profile ID required".to_string()).into());
    }

    let store = store();
    let mut profile = match load_profile(&store, profile_id) {
        Ok(p) => p,
        Err(e) => return Ok(ApiError::from(e).into()),
    };
    if profile.user_id != user_id {
        return Ok(ApiError::Forbidden.into());
    }

    let value: serde_json::Value = serde_json::from_slice(req.body())?;
    let filename = value["filename"].as_str().unwrap_or_default();
    if filename.is_empty() {
        return Ok(ApiError::BadRequest("Filename is required".to_string()).into());
    }

    profile.image = Some(upload_path("profile", &profile.full_name(), filename));
    store.set_json(&profile_key(&profile.id), &profile)?;

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({
            "id": profile.id,
            "image": profile.image,
        }))?)
        .build())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use uuid::Uuid;

    pub fn sample_profile<S: SocialStore>(store: &S, first_name: &str) -> Profile {
        sample_profile_born(store, first_name, None)
    }

    pub fn sample_profile_born<S: SocialStore>(
        store: &S,
        first_name: &str,
        birth_date: Option<NaiveDate>,
    ) -> Profile {
        create_profile_record(
            store,
            &Uuid::new_v4().to_string(),
            NewProfile {
                first_name: first_name.to_string(),
                last_name: "Tester".to_string(),
                gender: Gender::Female,
                birth_date,
                bio: None,
                phone_number: None,
            },
        )
        .unwrap()
    }
}
