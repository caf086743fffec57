//! Process-wide memo of expression summaries.
//!
//! Entries are immutable once written. Readers take the shared lock; a miss
//! summarizes outside the lock and the first writer wins.

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::CompilerError;
use crate::expression::{summarize, ExpressionSummary};

lazy_static! {
    static ref EXPRESSIONS: RwLock<HashMap<String, Arc<ExpressionSummary>>> =
        RwLock::new(HashMap::new());
}

pub fn summarize_cached(source: &str) -> Result<Arc<ExpressionSummary>, CompilerError> {
    let key = source.trim();
    if let Ok(entries) = EXPRESSIONS.read() {
        if let Some(hit) = entries.get(key) {
            return Ok(Arc::clone(hit));
        }
    }

    let summary = Arc::new(summarize(key)?);
    match EXPRESSIONS.write() {
        Ok(mut entries) => Ok(Arc::clone(
            entries
                .entry(key.to_string())
                .or_insert_with(|| Arc::clone(&summary)),
        )),
        Err(_) => Ok(summary),
    }
}

pub fn cached_expressions() -> usize {
    EXPRESSIONS.read().map(|entries| entries.len()).unwrap_or(0)
}
