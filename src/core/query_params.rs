use chrono::NaiveDate;
use std::collections::HashMap;

use crate::config::POSTS_PER_PAGE;

/// Decoded query string of a request URI. Repeated keys keep the last
/// value.
pub struct QueryParams {
    params: HashMap<String, String>,
}

impl QueryParams {
    pub fn parse(uri: &str) -> Self {
        let mut params = HashMap::new();

        if let Some(query_start) = uri.find('?') {
            let query = &uri[query_start + 1..];
            for param in query.split('&') {
                if let Some((key, encoded)) = param.split_once('=') {
                    let decoded = urlencoding::decode(encoded)
                        .unwrap_or(std::borrow::Cow::Borrowed(encoded))
                        .to_string();
                    params.insert(key.to_string(), decoded);
                } else if !param.is_empty() {
                    // Flag parameter without value
                    params.insert(param.to_string(), String::new());
                }
            }
        }

        QueryParams { params }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(|s| s.as_str())
    }

    pub fn date(&self, key: &str) -> Option<NaiveDate> {
        self.params
            .get(key)
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
    }

    /// 1-based page number, clamped to at least 1.
    pub fn page(&self) -> usize {
        self.params
            .get("page")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(1)
            .max(1)
    }
}

/// Slice out one page of an already-ordered listing.
pub fn paginate<T>(items: Vec<T>, page: usize) -> Vec<T> {
    items
        .into_iter()
        .skip((page - 1) * POSTS_PER_PAGE)
        .take(POSTS_PER_PAGE)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decoded_values() {
        let params = QueryParams::parse("/posts?text=hello%20world&hashtag=rust");
        assert_eq!(params.get("text"), Some("hello world"));
        assert_eq!(params.get("hashtag"), Some("rust"));
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn page_defaults_and_clamps() {
        assert_eq!(QueryParams::parse("/posts").page(), 1);
        assert_eq!(QueryParams::parse("/posts?page=0").page(), 1);
        assert_eq!(QueryParams::parse("/posts?page=3").page(), 3);
        assert_eq!(QueryParams::parse("/posts?page=abc").page(), 1);
    }

    #[test]
    fn parses_dates() {
        let params = QueryParams::parse("/profiles?birth_date=2001-01-01");
        assert_eq!(
            params.date("birth_date"),
            NaiveDate::from_ymd_opt(2001, 1, 1)
        );
        assert_eq!(params.date("other"), None);
    }

    #[test]
    fn paginate_slices_pages() {
        let items: Vec<usize> = (0..45).collect();
        assert_eq!(paginate(items.clone(), 1).len(), POSTS_PER_PAGE);
        assert_eq!(paginate(items.clone(), 3).len(), 5);
        assert_eq!(paginate(items, 4).len(), 0);
    }
}
