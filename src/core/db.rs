use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use spin_sdk::key_value::Store;
use uuid::Uuid;

use crate::config::*;
use crate::core::helpers::hash_password;
use crate::models::records::{Gender, Post, Profile, Reaction, Stance, User};

/// Storage contract for the whole backend: JSON values behind string keys.
/// Every mutation in the domain modules is one get/set pair on a single
/// key, so the store only has to serialize writes per key to uphold the
/// at-most-one-edge and at-most-one-reaction invariants.
pub trait SocialStore {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>>;
    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()>;
    fn delete(&self, key: &str) -> anyhow::Result<()>;
}

/// Spin key-value store, the production backend.
pub struct KvStore {
    inner: Store,
}

impl KvStore {
    pub fn open_default() -> anyhow::Result<Self> {
        Ok(KvStore {
            inner: Store::open_default()?,
        })
    }
}

impl SocialStore for KvStore {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        Ok(self.inner.get_json(key)?)
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        Ok(self.inner.set_json(key, value)?)
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        Ok(self.inner.delete(key)?)
    }
}

/// Mutex-guarded map with the same contract, for module tests.
#[cfg(test)]
pub struct MemStore {
    entries: std::sync::Mutex<std::collections::HashMap<String, serde_json::Value>>,
}

#[cfg(test)]
impl MemStore {
    pub fn new() -> Self {
        MemStore {
            entries: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }
}

#[cfg(test)]
impl SocialStore for MemStore {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        let entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(key);
        Ok(())
    }
}

fn seed_account<S: SocialStore>(
    store: &S,
    username: &str,
    first_name: &str,
    last_name: &str,
    gender: Gender,
    bio: &str,
) -> anyhow::Result<Profile> {
    let user_id = Uuid::new_v4().to_string();
    let user = User {
        id: user_id.clone(),
        username: username.to_string(),
        password: hash_password(username)?,
    };
    store.set_json(&user_key(&user_id), &user)?;

    let mut users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    users.push(user_id.clone());
    store.set_json(USERS_LIST_KEY, &users)?;

    let profile = Profile {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.clone(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        image: None,
        birth_date: None,
        gender,
        bio: Some(bio.to_string()),
        phone_number: None,
    };
    store.set_json(&profile_key(&profile.id), &profile)?;
    store.set_json(&profile_user_key(&user_id), &profile.id)?;

    let mut profiles: Vec<String> = store.get_json(PROFILES_LIST_KEY)?.unwrap_or_default();
    profiles.push(profile.id.clone());
    store.set_json(PROFILES_LIST_KEY, &profiles)?;

    Ok(profile)
}

fn seed_post<S: SocialStore>(
    store: &S,
    profile_id: &str,
    title: &str,
    text: &str,
    hashtags: Option<&str>,
) -> anyhow::Result<Post> {
    let post = Post {
        id: Uuid::new_v4().to_string(),
        profile_id: profile_id.to_string(),
        title: title.to_string(),
        text: text.to_string(),
        hashtags: hashtags.map(|h| h.to_string()),
        image: None,
        created: Utc::now(),
        updated: None,
    };
    store.set_json(&post_key(&post.id), &post)?;

    let mut feed: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();
    feed.insert(0, post.id.clone());
    store.set_json(FEED_KEY, &feed)?;

    Ok(post)
}

/// Seed a small demo graph on first request: two accounts with profiles,
/// a follow edge and a like, enough to exercise every list endpoint.
pub fn init_demo_data<S: SocialStore>(store: &S) -> anyhow::Result<()> {
    let users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    for id in &users {
        if let Some(u) = store.get_json::<User>(&user_key(id))? {
            if u.username == "alice" {
                return Ok(());
            }
        }
    }

    let alice = seed_account(
        store,
        "alice",
        "Alice",
        "Reed",
        Gender::Female,
        "Hello, I'm Alice!",
    )?;
    let bob = seed_account(
        store,
        "bob",
        "Bob",
        "Stone",
        Gender::Male,
        "Bob's corner of the internet",
    )?;

    seed_post(
        store,
        &alice.id,
        "First post",
        "Excited to share thoughts here.",
        Some("intro"),
    )?;
    let bob_post = seed_post(
        store,
        &bob.id,
        "Hey everyone",
        "Just joined, looking forward to connecting with you all.",
        Some("intro hello"),
    )?;

    // alice follows bob and likes his post
    let mut followings: Vec<String> = store
        .get_json(&followings_key(&alice.id))?
        .unwrap_or_default();
    if !followings.contains(&bob.id) {
        followings.push(bob.id.clone());
        store.set_json(&followings_key(&alice.id), &followings)?;
    }

    let reactions = vec![Reaction {
        profile_id: alice.id.clone(),
        stance: Stance::Like,
    }];
    store.set_json(&reactions_key(&bob_post.id), &reactions)?;

    Ok(())
}

/// Wipe every record, list and index. Used between integration runs.
pub fn reset_data<S: SocialStore>(store: &S) -> anyhow::Result<()> {
    let users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    for id in &users {
        store.delete(&user_key(id))?;
        store.delete(&profile_user_key(id))?;
    }

    let profiles: Vec<String> = store.get_json(PROFILES_LIST_KEY)?.unwrap_or_default();
    for id in &profiles {
        store.delete(&profile_key(id))?;
        store.delete(&followings_key(id))?;
    }

    let feed: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();
    for id in &feed {
        store.delete(&post_key(id))?;
        store.delete(&comments_key(id))?;
        store.delete(&reactions_key(id))?;
    }

    let tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    for token in &tokens {
        store.delete(&token_key(token))?;
    }

    store.delete(USERS_LIST_KEY)?;
    store.delete(PROFILES_LIST_KEY)?;
    store.delete(FEED_KEY)?;
    store.delete(TOKENS_LIST_KEY)?;

    Ok(())
}
