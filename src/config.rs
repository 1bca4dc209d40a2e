use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::model::message::Language;

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub socket_url: String,
    pub token: String,
    pub user_id: String,
    pub page_size: usize,
    pub download_dir: PathBuf,
    pub language: Option<Language>,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .with_context(|| format!("{key} is not set"))
        };

        let api_url = required("MATCHCHAT_API_URL")?;
        let socket_url = required("MATCHCHAT_SOCKET_URL")?;
        let token = required("MATCHCHAT_TOKEN")?;
        let user_id = required("MATCHCHAT_USER_ID")?;

        let page_size = match lookup("MATCHCHAT_PAGE_SIZE") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|v| *v > 0)
                .with_context(|| format!("MATCHCHAT_PAGE_SIZE must be a positive integer, got {raw:?}"))?,
            None => DEFAULT_PAGE_SIZE,
        };

        let download_dir = lookup("MATCHCHAT_DOWNLOAD_DIR")
            .map(PathBuf::from)
            .or_else(|| dirs::download_dir().map(|d| d.join("matchchat")))
            .unwrap_or_else(|| PathBuf::from("downloads"));

        let language = match lookup("MATCHCHAT_LANGUAGE") {
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => match Language::from_code(&raw) {
                Some(lang) => Some(lang),
                None => bail!("MATCHCHAT_LANGUAGE must be one of en, es, fr; got {raw:?}"),
            },
            None => None,
        };

        Ok(Self {
            api_url,
            socket_url,
            token,
            user_id,
            page_size,
            download_dir,
            language,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("MATCHCHAT_API_URL", "https://api.example.com/api/v1"),
        ("MATCHCHAT_SOCKET_URL", "wss://socket.example.com"),
        ("MATCHCHAT_TOKEN", "tok"),
        ("MATCHCHAT_USER_ID", "u1"),
    ];

    #[test]
    fn defaults_apply() {
        let cfg = ClientConfig::from_lookup(lookup(BASE)).unwrap();
        assert_eq!(cfg.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(cfg.language, None);
        assert_eq!(cfg.user_id, "u1");
    }

    #[test]
    fn optional_values_are_parsed() {
        let mut pairs = BASE.to_vec();
        pairs.push(("MATCHCHAT_PAGE_SIZE", "50"));
        pairs.push(("MATCHCHAT_LANGUAGE", "ES"));
        pairs.push(("MATCHCHAT_DOWNLOAD_DIR", "/tmp/mc"));
        let cfg = ClientConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(cfg.page_size, 50);
        assert_eq!(cfg.language, Some(Language::Es));
        assert_eq!(cfg.download_dir, PathBuf::from("/tmp/mc"));
    }

    #[test]
    fn missing_or_invalid_values_fail() {
        let err = ClientConfig::from_lookup(lookup(&BASE[..3])).unwrap_err();
        assert!(err.to_string().contains("MATCHCHAT_USER_ID"));

        let mut pairs = BASE.to_vec();
        pairs.push(("MATCHCHAT_PAGE_SIZE", "0"));
        assert!(ClientConfig::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = BASE.to_vec();
        pairs.push(("MATCHCHAT_LANGUAGE", "de"));
        assert!(ClientConfig::from_lookup(lookup(&pairs)).is_err());
    }
}
