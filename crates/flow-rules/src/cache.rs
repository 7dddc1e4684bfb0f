use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::directive::{
    NavDirective, VisibilityDirective, parse_nav_directives, parse_visibility_directives,
};
use crate::error::RuleParseError;

pub type Parsed<T> = Arc<Result<Vec<T>, RuleParseError>>;

/// Memoized directive parses keyed by raw rule text.
///
/// Rule text is immutable for a flow version, so entries never go stale. A
/// poisoned lock is treated as a miss.
#[derive(Debug, Default)]
pub struct DirectiveCache {
    visibility: Mutex<HashMap<String, Parsed<VisibilityDirective>>>,
    navigation: Mutex<HashMap<String, Parsed<NavDirective>>>,
}

impl DirectiveCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visibility(&self, text: &str) -> Parsed<VisibilityDirective> {
        lookup(&self.visibility, text, parse_visibility_directives)
    }

    pub fn navigation(&self, text: &str) -> Parsed<NavDirective> {
        lookup(&self.navigation, text, parse_nav_directives)
    }

    pub fn len(&self) -> usize {
        let visibility = self.visibility.lock().map(|map| map.len()).unwrap_or(0);
        let navigation = self.navigation.lock().map(|map| map.len()).unwrap_or(0);
        visibility + navigation
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut map) = self.visibility.lock() {
            map.clear();
        }
        if let Ok(mut map) = self.navigation.lock() {
            map.clear();
        }
    }
}

fn lookup<T>(
    map: &Mutex<HashMap<String, Parsed<T>>>,
    text: &str,
    parse: fn(&str) -> Result<Vec<T>, RuleParseError>,
) -> Parsed<T> {
    if let Ok(guard) = map.lock()
        && let Some(hit) = guard.get(text)
    {
        return Arc::clone(hit);
    }

    let parsed = Arc::new(parse(text));
    if let Ok(mut guard) = map.lock() {
        guard.insert(text.to_string(), Arc::clone(&parsed));
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_lookups_share_one_parse() {
        let cache = DirectiveCache::new();
        let first = cache.visibility("skip_if(true)");
        let second = cache.visibility("skip_if(true)");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn parse_errors_are_cached_too() {
        let cache = DirectiveCache::new();
        assert!(cache.navigation("goto_if(true)").is_err());
        assert!(cache.navigation("goto_if(true)").is_err());
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
