//! Reconciliation rules for replicated keys.
//!
//! Both rules are commutative and associative, so the order in which
//! backends are consulted (or repaired concurrently) cannot lower the result.

use serde::{Deserialize, Serialize};

/// How divergent copies of one key are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// Present if any backend holds it.
    Flag,
    /// Largest numeric value wins; unparsable copies count as 0.
    Timestamp,
}

/// What a single backend reported for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Present(String),
    Absent,
    /// Backend could not be read; it is neither counted nor repaired.
    Unavailable,
}

/// Canonical value plus the backend indices that must be rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub value: String,
    pub repair: Vec<usize>,
}

/// Combine per-backend observations. `None` means every reachable backend
/// reported the key absent (or none was reachable).
pub fn reconcile(kind: KeyKind, observations: &[Observation]) -> Option<Reconciled> {
    match kind {
        KeyKind::Flag => reconcile_flag(observations),
        KeyKind::Timestamp => reconcile_timestamp(observations),
    }
}

/// Parse a stored timestamp; anything that is not a non-negative integer is 0.
pub fn parse_timestamp(raw: &str) -> u64 {
    raw.trim().parse::<u64>().unwrap_or(0)
}

fn reconcile_flag(observations: &[Observation]) -> Option<Reconciled> {
    let value = observations.iter().find_map(|obs| match obs {
        Observation::Present(value) => Some(value.clone()),
        _ => None,
    })?;
    let repair = observations
        .iter()
        .enumerate()
        .filter(|(_, obs)| matches!(obs, Observation::Absent))
        .map(|(idx, _)| idx)
        .collect();
    Some(Reconciled { value, repair })
}

fn reconcile_timestamp(observations: &[Observation]) -> Option<Reconciled> {
    let max = observations
        .iter()
        .filter_map(|obs| match obs {
            Observation::Present(value) => Some(parse_timestamp(value)),
            _ => None,
        })
        .max()?;

    // A zero canonical value carries no lock, so there is nothing to spread.
    let repair = if max == 0 {
        Vec::new()
    } else {
        observations
            .iter()
            .enumerate()
            .filter(|(_, obs)| match obs {
                Observation::Absent => true,
                Observation::Present(value) => parse_timestamp(value) < max,
                Observation::Unavailable => false,
            })
            .map(|(idx, _)| idx)
            .collect()
    };
    Some(Reconciled {
        value: max.to_string(),
        repair,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn present(value: &str) -> Observation {
        Observation::Present(value.to_string())
    }

    #[test]
    fn flag_is_present_if_any_backend_holds_it() {
        let result = reconcile(
            KeyKind::Flag,
            &[Observation::Absent, present("true"), Observation::Unavailable],
        )
        .expect("present");
        assert_eq!(result.value, "true");
        assert_eq!(result.repair, vec![0]);
    }

    #[test]
    fn all_absent_is_absent() {
        let observations = [Observation::Absent, Observation::Unavailable];
        assert_eq!(reconcile(KeyKind::Flag, &observations), None);
        assert_eq!(reconcile(KeyKind::Timestamp, &observations), None);
    }

    #[test]
    fn timestamp_takes_maximum_and_repairs_smaller_copies() {
        let result = reconcile(
            KeyKind::Timestamp,
            &[present("100"), present("250"), Observation::Absent, present("junk")],
        )
        .expect("present");
        assert_eq!(result.value, "250");
        assert_eq!(result.repair, vec![0, 2, 3]);
    }

    #[test]
    fn zero_timestamp_is_not_spread() {
        let result = reconcile(KeyKind::Timestamp, &[present("junk"), Observation::Absent])
            .expect("present");
        assert_eq!(result.value, "0");
        assert!(result.repair.is_empty());
    }

    #[test]
    fn result_does_not_depend_on_backend_order() {
        let forward = [present("5"), present("9"), present("7")];
        let reversed = [present("7"), present("9"), present("5")];
        let a = reconcile(KeyKind::Timestamp, &forward).expect("a");
        let b = reconcile(KeyKind::Timestamp, &reversed).expect("b");
        assert_eq!(a.value, b.value);
    }
}
