use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use regex::Regex;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::core::db::KvStore;

pub fn store() -> KvStore {
    KvStore::open_default().expect("KV store must exist")
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::PasswordHash;

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

pub fn validate_uuid(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

/// Strip all HTML from free-text input. Applied once, at input time.
pub fn sanitize_text(text: &str) -> String {
    ammonia::Builder::default()
        .tags(std::collections::HashSet::new())
        .clean(text)
        .to_string()
}

fn slug_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("Regex should compile"))
}

/// Storage reference for an uploaded image: the upload itself is handled
/// by the object store, only this path is kept on the record.
/// `uploads/profile/alice-reed-<uuid>.jpg`
pub fn upload_path(kind: &str, owner_name: &str, filename: &str) -> String {
    let slug = slug_regex()
        .replace_all(&owner_name.to_lowercase(), "-")
        .trim_matches('-')
        .to_string();
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| format!(".{}", ext))
        .unwrap_or_default();

    format!("uploads/{}/{}-{}{}", kind, slug, Uuid::new_v4(), extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_path_slugs_owner_and_keeps_extension() {
        let path = upload_path("profile", "Alice Reed", "holiday photo.JPG");
        assert!(path.starts_with("uploads/profile/alice-reed-"));
        assert!(path.ends_with(".JPG"));
    }

    #[test]
    fn upload_path_without_extension() {
        let path = upload_path("post", "Bob Stone", "raw");
        assert!(path.starts_with("uploads/post/bob-stone-"));
        assert!(!path.contains(".."));
    }

    #[test]
    fn sanitize_strips_markup() {
        assert_eq!(sanitize_text("<script>x</script>hi <b>there</b>"), "hi there");
    }

    #[test]
    fn password_hash_roundtrip() {
        let hash = hash_password("secret").unwrap();
        assert!(verify_password("secret", &hash));
        assert!(!verify_password("other", &hash));
    }
}
