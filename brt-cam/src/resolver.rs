//! Line resolver
//!
//! Turns recognizer candidates plus an optional explicit override into
//! exactly one [`ResolvedLine`].
//!
//! **Algorithm** (first rule that yields a line wins):
//! 1. Explicit override, trimmed and non-empty, taken as-is. Registry
//!    membership is not required.
//! 2. For each candidate in emission order, the first registry id (in
//!    registry order) that occurs as a substring of the candidate.
//! 3. The first non-empty candidate, cut to its first 4 characters.
//!    Candidates are trimmed first, so `" 12345"` gives `"1234"`;
//!    surrounding whitespace never counts toward the 4 characters.
//! 4. A registry line chosen pseudo-randomly from the SHA-256 of the image
//!    bytes. The same bytes always give the same line.
//!
//! Only an empty registry with no usable override or candidate yields
//! [`ResolvedLine::Unresolved`].

use brt_common::LineRegistry;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Characters kept from an unmatched candidate
pub const TRUNCATED_CANDIDATE_CHARS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedLine {
    Resolved(String),
    Unresolved,
}

impl ResolvedLine {
    pub fn line_id(&self) -> Option<&str> {
        match self {
            ResolvedLine::Resolved(id) => Some(id),
            ResolvedLine::Unresolved => None,
        }
    }
}

/// Which rule produced the line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    Override,
    RegistryMatch,
    Truncated,
    HashFallback,
}

/// Resolver outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub line: ResolvedLine,
    pub method: Option<ResolutionMethod>,
}

impl Resolution {
    fn resolved(id: impl Into<String>, method: ResolutionMethod) -> Self {
        Self {
            line: ResolvedLine::Resolved(id.into()),
            method: Some(method),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LineResolver {
    registry: Arc<LineRegistry>,
}

impl LineResolver {
    pub fn new(registry: Arc<LineRegistry>) -> Self {
        Self { registry }
    }

    pub fn resolve(
        &self,
        candidates: &[String],
        explicit_override: Option<&str>,
        image: &[u8],
    ) -> Resolution {
        if let Some(line) = explicit_override.map(str::trim).filter(|s| !s.is_empty()) {
            return Resolution::resolved(line, ResolutionMethod::Override);
        }

        if let Some(known) = self.first_registry_match(candidates) {
            return Resolution::resolved(known, ResolutionMethod::RegistryMatch);
        }

        if let Some(first) = candidates.iter().map(|c| c.trim()).find(|c| !c.is_empty()) {
            let truncated: String = first.chars().take(TRUNCATED_CANDIDATE_CHARS).collect();
            return Resolution::resolved(truncated, ResolutionMethod::Truncated);
        }

        match simulate_line(image, &self.registry) {
            Some(line) => Resolution::resolved(line, ResolutionMethod::HashFallback),
            None => Resolution {
                line: ResolvedLine::Unresolved,
                method: None,
            },
        }
    }

    fn first_registry_match(&self, candidates: &[String]) -> Option<&str> {
        candidates.iter().find_map(|candidate| {
            self.registry
                .all_ids()
                .find(|id| candidate.contains(id))
        })
    }
}

/// Deterministic registry line for `image`
///
/// The leading four digest bytes (big-endian) seed the generator, which
/// then picks uniformly among registry ids in registry order.
pub fn simulate_line<'a>(image: &[u8], registry: &'a LineRegistry) -> Option<&'a str> {
    let ids: Vec<&str> = registry.all_ids().collect();
    if ids.is_empty() {
        return None;
    }

    let digest = Sha256::digest(image);
    let seed = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    let mut rng = StdRng::seed_from_u64(u64::from(seed));

    ids.choose(&mut rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use brt_common::LineEntry;
    use std::collections::HashSet;

    fn resolver() -> LineResolver {
        LineResolver::new(Arc::new(LineRegistry::builtin()))
    }

    fn candidates(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_override_wins_over_candidates() {
        let r = resolver().resolve(&candidates(&["437"]), Some(" 301 "), b"img");
        assert_eq!(r.line, ResolvedLine::Resolved("301".into()));
        assert_eq!(r.method, Some(ResolutionMethod::Override));
    }

    #[test]
    fn test_unknown_override_is_accepted() {
        let r = resolver().resolve(&[], Some("999"), b"img");
        assert_eq!(r.line.line_id(), Some("999"));
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let r = resolver().resolve(&candidates(&["820"]), Some("   "), b"img");
        assert_eq!(r.line.line_id(), Some("820"));
        assert_eq!(r.method, Some(ResolutionMethod::RegistryMatch));
    }

    #[test]
    fn test_substring_match_ignores_surrounding_noise() {
        let r = resolver().resolve(&candidates(&["X437Y"]), None, b"img");
        assert_eq!(r.line.line_id(), Some("437"));
    }

    #[test]
    fn test_registry_order_breaks_ties_within_candidate() {
        // Contains both "2441" and "437"; "437" is registered first
        let r = resolver().resolve(&candidates(&["24414370"]), None, b"img");
        assert_eq!(r.line.line_id(), Some("437"));
    }

    #[test]
    fn test_candidate_order_beats_registry_order() {
        let r = resolver().resolve(&candidates(&["88820", "437"]), None, b"img");
        assert_eq!(r.line.line_id(), Some("820"));
    }

    #[test]
    fn test_unmatched_candidate_is_truncated() {
        let r = resolver().resolve(&candidates(&["", "  ", "123456"]), None, b"img");
        assert_eq!(r.line.line_id(), Some("1234"));
        assert_eq!(r.method, Some(ResolutionMethod::Truncated));
    }

    #[test]
    fn test_candidate_trimmed_before_truncation() {
        let r = resolver().resolve(&candidates(&[" 12345"]), None, b"img");
        assert_eq!(r.line.line_id(), Some("1234"));
    }

    #[test]
    fn test_short_unmatched_candidate_kept_whole() {
        let r = resolver().resolve(&candidates(&["55"]), None, b"img");
        assert_eq!(r.line.line_id(), Some("55"));
    }

    #[test]
    fn test_hash_fallback_is_deterministic() {
        let resolver = resolver();
        let first = resolver.resolve(&[], None, b"webcam frame 42");
        let second = resolver.resolve(&[], None, b"webcam frame 42");
        assert_eq!(first, second);
        assert_eq!(first.method, Some(ResolutionMethod::HashFallback));
        assert!(LineRegistry::builtin().contains(first.line.line_id().unwrap()));
    }

    #[test]
    fn test_hash_fallback_spreads_over_registry() {
        let registry = LineRegistry::builtin();
        let seen: HashSet<&str> = (0..500u32)
            .filter_map(|i| simulate_line(&i.to_be_bytes(), &registry))
            .collect();
        // 500 draws over 7 lines reach every line
        assert_eq!(seen.len(), registry.len());
    }

    #[test]
    fn test_empty_registry_without_input_is_unresolved() {
        let resolver = LineResolver::new(Arc::new(LineRegistry::default()));
        let r = resolver.resolve(&[], None, b"img");
        assert_eq!(r.line, ResolvedLine::Unresolved);
        assert_eq!(r.method, None);
    }

    #[test]
    fn test_empty_registry_still_honours_candidates() {
        let resolver = LineResolver::new(Arc::new(LineRegistry::default()));
        let r = resolver.resolve(&candidates(&["77777"]), None, b"img");
        assert_eq!(r.line.line_id(), Some("7777"));
    }

    #[test]
    fn test_single_line_registry_fallback() {
        let registry = LineRegistry::new(vec![LineEntry::new("42", "Only", 3)]).unwrap();
        let resolver = LineResolver::new(Arc::new(registry));
        let r = resolver.resolve(&[], None, b"anything");
        assert_eq!(r.line.line_id(), Some("42"));
    }
}
