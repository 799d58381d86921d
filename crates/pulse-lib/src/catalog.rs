//! All-apps catalog and avatar resolution

use tracing::warn;

use crate::error::ClientError;
use crate::fence::RequestFence;
use crate::models::{AppCatalog, AppInfo};

/// Backend marker meaning "no logo, draw a letter"
pub const LETTER_AVATAR: &str = "LETTER_AVATAR";

/// Number of gradient palettes for letter avatars
pub const AVATAR_PALETTES: usize = 6;

/// How an app or process icon should be drawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Avatar {
    Logo(String),
    Letter { letter: char, palette: usize },
}

/// Pick a logo when one is usable, else a letter avatar.
///
/// `palette_key` spreads avatars across palettes by its length.
pub fn resolve_avatar(name: &str, palette_key: &str, logo: Option<&str>) -> Avatar {
    let logo = logo.map(str::trim).unwrap_or("");
    if !logo.is_empty() && logo != LETTER_AVATAR && logo != "undefined" {
        return Avatar::Logo(logo.to_string());
    }

    let letter = name
        .chars()
        .next()
        .and_then(|c| c.to_uppercase().next())
        .unwrap_or('?');
    Avatar::Letter {
        letter,
        palette: palette_key.chars().count() % AVATAR_PALETTES,
    }
}

impl AppInfo {
    pub fn avatar(&self) -> Avatar {
        resolve_avatar(&self.display_name, &self.exe_name, self.logo.as_deref())
    }
}

/// Cached catalog; fetched once and reused on every switch to all-apps
#[derive(Debug, Default)]
pub struct CatalogStore {
    apps: Option<Vec<AppInfo>>,
    fence: RequestFence,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apps(&self) -> Option<&[AppInfo]> {
        self.apps.as_deref()
    }

    pub fn is_cached(&self) -> bool {
        self.apps.is_some()
    }

    pub fn begin(&mut self) -> u64 {
        self.fence.issue()
    }

    pub fn complete(&mut self, seq: u64, result: Result<AppCatalog, ClientError>) -> bool {
        if !self.fence.is_current(seq) {
            return false;
        }
        match result {
            Ok(AppCatalog(apps)) => {
                self.apps = Some(apps);
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to load all apps");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logo_used_when_present() {
        assert_eq!(
            resolve_avatar("Firefox", "firefox.exe", Some(" /static/logos/firefox.png ")),
            Avatar::Logo("/static/logos/firefox.png".to_string())
        );
    }

    #[test]
    fn test_letter_fallbacks() {
        for logo in [None, Some(""), Some("LETTER_AVATAR"), Some("undefined")] {
            assert_eq!(
                resolve_avatar("slack", "slack.exe", logo),
                Avatar::Letter {
                    letter: 'S',
                    palette: 3
                }
            );
        }
        assert_eq!(
            resolve_avatar("", "", None),
            Avatar::Letter {
                letter: '?',
                palette: 0
            }
        );
    }

    #[test]
    fn test_catalog_cached_after_load() {
        let mut store = CatalogStore::new();
        assert!(!store.is_cached());
        let seq = store.begin();
        let apps = AppCatalog(vec![AppInfo {
            display_name: "Code".to_string(),
            exe_name: "code".to_string(),
            logo: None,
        }]);
        assert!(store.complete(seq, Ok(apps)));
        assert_eq!(store.apps().unwrap().len(), 1);
        assert_eq!(
            store.apps().unwrap()[0].avatar(),
            Avatar::Letter {
                letter: 'C',
                palette: 4
            }
        );
    }
}
