//! Eval harness end to end: scan a fixture with the mock collaborator,
//! then score the result against group specs.

use anyhow::Result;
use std::sync::Arc;
use saguru_scanners::llm::mock::model_finding;
use saguru_scanners::llm::SeverityLevel;
use saguru_scanners::{
    eval, CancelFlag, EvalGroupSpec, ExpectedFinding, InMemoryRepository, MockLlmClient,
    PromptKind, ScanPipeline, Severity,
};

const UNSAFE_SQL: &str = r#"
import { db } from "./db";

export class UserRepository {
  async byName(name: string) {
    // lines padded so the query sits deep in the file
    const started = Date.now();
    void started;
    return this.run(name);
  }

  private async run(name: string) {
    const rows = await db.query(
      "SELECT id, name, role" +
      "  FROM users" +
      " WHERE name = '" + name + "'"
    );
    return rows[0];
  }
}
"#;

fn fixture_repo() -> InMemoryRepository {
    InMemoryRepository::new().with_file("src/unsafeSql.ts", UNSAFE_SQL)
}

fn spec(allow_unexpected: bool) -> EvalGroupSpec {
    EvalGroupSpec {
        id: "sql-injection-basic".into(),
        description: "string-built query must be reported".into(),
        allow_unexpected,
        expected_findings: vec![ExpectedFinding {
            filepath: "src/unsafeSql.ts".into(),
            expectation: "query assembled by string concatenation".into(),
            rule_id: Some("sql-injection".into()),
            anchor_node_id: None,
            start_line: Some(13),
            end_line: Some(18),
            severity: Severity::High,
        }],
    }
}

fn reporting_client() -> MockLlmClient {
    MockLlmClient::new().with_finding(
        PromptKind::Rule,
        "WHERE name = '",
        model_finding(
            "SQL query concatenates caller input",
            SeverityLevel::High,
            "sql-injection",
            "src/unsafeSql.ts",
            13,
            17,
        ),
    )
}

#[tokio::test]
async fn scan_satisfying_the_spec_passes() -> Result<()> {
    let pipeline = ScanPipeline::new(Arc::new(reporting_client()));
    let result = pipeline
        .run(
            &fixture_repo(),
            &saguru_scanners::pipeline::NullSink,
            &CancelFlag::new(),
        )
        .await?;

    let report = eval::match_result(&result, &spec(true));
    assert_eq!(report.matched.len(), 1);
    assert!(report.missed.is_empty());
    assert!(report.passed());
    Ok(())
}

#[tokio::test]
async fn silent_scanner_misses_the_expectation() -> Result<()> {
    // Clean repository: the expected file never shows up.
    let repo = InMemoryRepository::new().with_file("src/other.ts", "export const ok = 1;\n");
    let pipeline = ScanPipeline::new(Arc::new(MockLlmClient::new()));
    let result = pipeline
        .run(&repo, &saguru_scanners::pipeline::NullSink, &CancelFlag::new())
        .await?;

    let report = eval::match_result(&result, &spec(false));
    assert_eq!(report.missed.len(), 1);
    assert!(!report.passed());
    Ok(())
}

#[tokio::test]
async fn strict_spec_fails_on_noise() -> Result<()> {
    // The extra finding lands in an unrelated file.
    let client = reporting_client().with_finding(
        PromptKind::Open,
        "WHERE name = '",
        model_finding(
            "speculative timing concern",
            SeverityLevel::Low,
            "timing",
            "src/unrelated.ts",
            1,
            2,
        ),
    );
    let pipeline = ScanPipeline::new(Arc::new(client));
    let result = pipeline
        .run(
            &fixture_repo(),
            &saguru_scanners::pipeline::NullSink,
            &CancelFlag::new(),
        )
        .await?;

    let strict = eval::match_result(&result, &spec(false));
    assert!(!strict.passed());
    assert!(!strict.unexpected.is_empty());

    let tolerant = eval::match_result(&result, &spec(true));
    assert!(tolerant.passed());
    Ok(())
}

#[test]
fn specs_load_from_yaml_directory() -> Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(
        dir.path().join("01-sql.yaml"),
        r#"
id: sql-injection-basic
description: string-built query must be reported
allowUnexpected: false
expectedFindings:
  - filepath: src/unsafeSql.ts
    expectation: query assembled by string concatenation
    ruleId: sql-injection
    startLine: 16
    endLine: 19
    severity: high
"#,
    )?;
    std::fs::write(
        dir.path().join("02-fakeout.json"),
        r#"{
  "id": "sql-fakeout",
  "description": "parameterized query must not be reported",
  "allowUnexpected": false,
  "expectedFindings": []
}"#,
    )?;

    let specs = eval::load_specs(dir.path())?;
    assert_eq!(specs.len(), 2);
    assert_eq!(specs[0].id, "sql-injection-basic");
    assert_eq!(specs[0].expected_findings[0].severity, Severity::High);
    assert_eq!(specs[1].id, "sql-fakeout");
    assert!(specs[1].expected_findings.is_empty());
    Ok(())
}
