//! Layered directive text for an external consumer.
//!
//! Two independent bounded maps: persistent prompts, and temporary prompts
//! that carry an absolute expiry. Prompt content is opaque; it is
//! concatenated, never parsed. Callers must not depend on the order of
//! prompts within the combined text.

use lru::LruCache;
use std::num::NonZeroUsize;
use tracing::debug;

use crate::clock::Millis;
use crate::config::PromptConfig;
use crate::types::Vitals;

#[derive(Debug, Clone)]
struct TemporaryPrompt {
    content: String,
    expires_at: Millis,
}

/// Persistent and temporary prompt maps.
#[derive(Debug)]
pub struct PromptDirectives {
    persistent: LruCache<String, String>,
    temporary: LruCache<String, TemporaryPrompt>,
}

impl PromptDirectives {
    /// Empty maps bounded by `config.capacity`, then the configured defaults.
    #[must_use]
    pub fn new(config: &PromptConfig) -> Self {
        let cap = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        let mut prompts = Self {
            persistent: LruCache::new(cap),
            temporary: LruCache::new(cap),
        };
        for (key, content) in &config.defaults {
            prompts.persistent.put(key.clone(), content.clone());
        }
        prompts
    }

    /// Store a prompt. Temporary prompts expire `duration_secs` after `now`.
    /// Re-using a key replaces the previous content in that map.
    pub fn set(&mut self, key: &str, content: &str, temporary: bool, duration_secs: u32, now: Millis) {
        if temporary {
            let expires_at = now.saturating_add(u64::from(duration_secs) * 1000);
            self.temporary.put(
                key.to_string(),
                TemporaryPrompt {
                    content: content.to_string(),
                    expires_at,
                },
            );
        } else {
            self.persistent.put(key.to_string(), content.to_string());
        }
        debug!(key, temporary, duration_secs, "Prompt set");
    }

    /// Persistent prompt content by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.persistent.peek(key).map(String::as_str)
    }

    /// Concatenate persistent prompts, then live temporary prompts, then a
    /// decision-context section. Expired temporary prompts are purged.
    pub fn generate_combined(
        &mut self,
        vitals: &Vitals,
        emotion: &str,
        hints: &[String],
        now: Millis,
    ) -> String {
        self.purge_expired(now);

        let mut out = String::new();
        for (_, content) in self.persistent.iter().rev() {
            out.push_str(content);
            out.push(' ');
        }
        for (_, prompt) in self.temporary.iter().rev() {
            out.push_str(&prompt.content);
            out.push(' ');
        }

        out.push_str("[states:");
        for (name, value) in vitals.named() {
            out.push_str(&format!(" {name}={value:.2}"));
        }
        out.push_str(&format!("] [mood: {emotion}]"));
        if !hints.is_empty() {
            out.push_str(&format!(" [hints: {}]", hints.join("; ")));
        }
        out
    }

    /// Drop expired temporary prompts.
    pub fn optimize(&mut self, now: Millis) {
        self.purge_expired(now);
    }

    fn purge_expired(&mut self, now: Millis) {
        let expired: Vec<String> = self
            .temporary
            .iter()
            .filter(|(_, p)| p.expires_at <= now)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            self.temporary.pop(key);
        }
        if !expired.is_empty() {
            debug!(count = expired.len(), "Expired prompts purged");
        }
    }

    /// Number of persistent prompts.
    #[must_use]
    pub fn persistent_len(&self) -> usize {
        self.persistent.len()
    }

    /// Number of temporary prompts, including expired ones not yet purged.
    #[must_use]
    pub fn temporary_len(&self) -> usize {
        self.temporary.len()
    }

    /// Total prompts across both maps.
    #[must_use]
    pub fn total(&self) -> usize {
        self.persistent_len() + self.temporary_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(capacity: usize) -> PromptConfig {
        PromptConfig {
            capacity,
            defaults: Vec::new(),
        }
    }

    #[test]
    fn defaults_installed() {
        let p = PromptDirectives::new(&PromptConfig::default());
        assert_eq!(p.persistent_len(), 2);
        assert!(p.get("personality").is_some());
    }

    #[test]
    fn persistent_map_is_bounded() {
        let mut p = PromptDirectives::new(&config(3));
        for i in 0..5 {
            p.set(&format!("k{i}"), "text", false, 0, 0);
        }
        assert_eq!(p.persistent_len(), 3);
        assert!(p.get("k0").is_none());
        assert!(p.get("k4").is_some());
    }

    #[test]
    fn temporary_prompts_expire() {
        let mut p = PromptDirectives::new(&config(4));
        p.set("base", "BASE", false, 0, 0);
        p.set("alert", "ALERT", true, 5, 1_000);
        let vitals = Vitals::default();

        let live = p.generate_combined(&vitals, "joy", &[], 3_000);
        assert!(live.contains("BASE"));
        assert!(live.contains("ALERT"));

        let later = p.generate_combined(&vitals, "joy", &[], 6_000);
        assert!(later.contains("BASE"));
        assert!(!later.contains("ALERT"));
        assert_eq!(p.temporary_len(), 0);
    }

    #[test]
    fn optimize_purges() {
        let mut p = PromptDirectives::new(&config(4));
        p.set("a", "x", true, 1, 0);
        p.set("b", "y", true, 100, 0);
        p.optimize(2_000);
        assert_eq!(p.temporary_len(), 1);
        assert_eq!(p.total(), 1);
    }

    #[test]
    fn context_section_appended() {
        let mut p = PromptDirectives::new(&config(2));
        let text = p.generate_combined(
            &Vitals::default(),
            "calm",
            &["Develop patience".to_string()],
            0,
        );
        assert!(text.contains("hunger=0.00"));
        assert!(text.contains("[mood: calm]"));
        assert!(text.contains("Develop patience"));
    }
}
