//! Process-wide cache of parsed expression trees.
//!
//! The cache is a pure function of (grammar, input text) and never needs
//! invalidation: cached trees are immutable inputs to cloning, and lookups
//! always hand out an independent clone. Concurrent readers from independent
//! logical queries only contend on the insertion path.

use super::{Grammar, Parsed};
use hashbrown::HashMap;
use std::sync::{LazyLock, RwLock};

static CACHE: LazyLock<RwLock<HashMap<(Grammar, String), Parsed>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

pub(super) fn lookup(grammar: Grammar, text: &str) -> Option<Parsed> {
    let cache = CACHE.read().ok()?;
    cache.get(&(grammar, text.to_owned())).cloned()
}

pub(super) fn insert(grammar: Grammar, text: &str, parsed: &Parsed) {
    if let Ok(mut cache) = CACHE.write() {
        cache.insert((grammar, text.to_owned()), parsed.clone());
    }
}
