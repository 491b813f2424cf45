//! Correlation engine properties: order independence over every
//! permutation of a mixed finding set, idempotence, and survivor
//! preference.

use saguru_scanners::{CoreFinding, Correlator, FindingKind, Location, Severity};

fn finding(
    kind: FindingKind,
    source: &str,
    severity: Severity,
    category: &str,
    file: &str,
    start: usize,
    end: usize,
) -> CoreFinding {
    CoreFinding::new(kind, source, severity, format!("{category} at {file}:{start}"))
        .with_category(category)
        .with_location(Location::file(file).with_lines(start, end))
}

fn mixed_set() -> Vec<CoreFinding> {
    vec![
        finding(
            FindingKind::Static,
            "sql-string-concat",
            Severity::High,
            "sql-injection",
            "src/db.ts",
            16,
            19,
        ),
        finding(
            FindingKind::Repository,
            "llm_rule",
            Severity::High,
            "sql-injection",
            "src/db.ts",
            17,
            19,
        ),
        finding(
            FindingKind::Static,
            "reachable-handler",
            Severity::Low,
            "attack-surface",
            "src/routes.ts",
            4,
            4,
        ),
        finding(
            FindingKind::Repository,
            "llm_open",
            Severity::Medium,
            "auth",
            "src/routes.ts",
            12,
            20,
        ),
    ]
}

fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut all = Vec::new();
    for (i, head) in items.iter().enumerate() {
        let mut rest = items.to_vec();
        rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head.clone());
            all.push(tail);
        }
    }
    all
}

#[test]
fn every_permutation_yields_identical_output() {
    let correlator = Correlator::default();
    let baseline = correlator.correlate(&mixed_set());

    for permutation in permutations(&mixed_set()) {
        assert_eq!(
            correlator.correlate(&permutation),
            baseline,
            "correlation must not depend on input order"
        );
    }
}

#[test]
fn correlation_is_idempotent_on_its_own_output() {
    let correlator = Correlator::default();
    let once = correlator.correlate(&mixed_set());
    let twice = correlator.correlate(&once);
    assert_eq!(once, twice);
}

#[test]
fn duplicate_survivor_prefers_severity_then_corroboration() {
    let correlator = Correlator::default();

    // Same class and site: the stronger severity survives.
    let out = correlator.correlate(&[
        finding(FindingKind::Repository, "llm_rule", Severity::Medium, "auth", "src/a.ts", 5, 9),
        finding(FindingKind::Static, "unsafe-token-decode", Severity::High, "auth", "src/a.ts", 6, 6),
    ]);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].severity, Severity::High);
    assert_eq!(out[0].kind, FindingKind::Static);

    // Severity tied: the more corroborated kind survives.
    let out = correlator.correlate(&[
        finding(FindingKind::Static, "unsafe-token-decode", Severity::High, "auth", "src/a.ts", 6, 6),
        finding(FindingKind::Repository, "llm_rule", Severity::High, "auth", "src/a.ts", 5, 9),
    ]);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].kind, FindingKind::Repository);
}

#[test]
fn promoted_composite_carries_max_severity_and_contributors() {
    let correlator = Correlator::default();
    let out = correlator.correlate(&mixed_set());

    let composite: Vec<&CoreFinding> = out
        .iter()
        .filter(|f| f.kind == FindingKind::RepositoryComposite)
        .collect();
    assert_eq!(composite.len(), 1);

    let merged = composite[0];
    assert_eq!(merged.file(), Some("src/routes.ts"));
    assert_eq!(merged.severity, Severity::Medium);
    let contributing = merged.details.get("contributing_summaries").unwrap();
    assert!(contributing.contains("attack-surface"));
    assert!(contributing.contains("auth"));

    // The deduplicated sql pair stays a single non-composite finding.
    assert!(out
        .iter()
        .any(|f| f.file() == Some("src/db.ts") && f.kind == FindingKind::Repository));
    assert_eq!(out.len(), 2);
}
