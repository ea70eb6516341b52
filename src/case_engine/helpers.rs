//! Shared builder functions for assembling cases in code.
//!
//! Authored cases normally arrive as JSON, but demos and tests build small
//! graphs by hand. These helpers keep that boilerplate out of the call sites.

use std::collections::{BTreeMap, BTreeSet};

use rand::{rngs::StdRng, RngCore, SeedableRng};

use crate::case_engine::models::*;

/// Build one choice whose label mirrors its id.
pub fn choice(id: &str, next: &str) -> CaseChoice {
    CaseChoice {
        id: id.to_string(),
        label: id.to_string(),
        next: next.to_string(),
        description: None,
        rationale: None,
    }
}

/// Build a placeholder node from `(choice_id, next)` pairs, in presentation order.
pub fn node(id: &str, choices: &[(&str, &str)]) -> CaseNode {
    CaseNode {
        id: id.to_string(),
        title: None,
        description: None,
        prompt: None,
        asset: CaseAsset::default(),
        choices: choices.iter().map(|(c, next)| choice(c, next)).collect(),
        auto_advance: None,
    }
}

/// Same as [`node`] with a timed transition attached.
pub fn timed_node(id: &str, next: &str, after_ms: u64) -> CaseNode {
    CaseNode {
        auto_advance: Some(AutoAdvanceRule { next: next.to_string(), after_ms }),
        ..node(id, &[])
    }
}

/// Assemble a manifest keyed by each node's own id.
pub fn manifest(id: &str, start: &str, nodes: Vec<CaseNode>) -> CaseManifest {
    CaseManifest {
        id: id.to_string(),
        title: id.to_string(),
        chief_complaint: String::new(),
        summary: String::new(),
        language_level: LanguageLevel::B1,
        skills: BTreeSet::new(),
        start_node_id: start.to_string(),
        nodes: nodes.into_iter().map(|n| (n.id.clone(), n)).collect::<BTreeMap<_, _>>(),
        character_id: None,
    }
}

/// Session id in the form `CASEID-1A2B3C4D`.
///
/// The prefix is the case id upper-cased and cut to eight characters; the
/// suffix comes from a seeded RNG when a seed is given, so ids are
/// reproducible in tests.
pub fn make_session_id(case_id: &str, seed: Option<u64>) -> String {
    let mut rng: StdRng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let prefix: String = case_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect::<String>()
        .to_ascii_uppercase();
    let prefix = if prefix.is_empty() { "CASE".to_string() } else { prefix };
    format!("{}-{:08X}", prefix, rng.next_u32())
}

/// Round `100 * part / whole` to a whole percent; an empty whole is 0%.
pub fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (100.0 * part as f64 / whole as f64).round() as u32
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_is_deterministic_with_seed() {
        let a = make_session_id("chest-pain", Some(7));
        let b = make_session_id("chest-pain", Some(7));
        assert_eq!(a, b);
        assert!(a.starts_with("CHESTPAI-"), "unexpected id {a}");
        assert_ne!(a, make_session_id("chest-pain", Some(8)));
    }

    #[test]
    fn session_id_falls_back_to_generic_prefix() {
        assert!(make_session_id("---", Some(1)).starts_with("CASE-"));
    }

    #[test]
    fn percent_rounds_to_whole_numbers() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(0, 0), 0);
    }
}
