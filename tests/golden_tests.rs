//! Golden tests - fixture-based tests that lock expected behavior
//!
//! These tests use JSON fixtures to verify that engine output normalization
//! and level parsing produce expected results. Any change in behavior will
//! cause these tests to fail, signaling a potential breaking change.
//!
//! Run with: cargo test --test golden_tests

use serde::Deserialize;
use serde_json::Value;
use std::fs;

fn read_fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read {}: {}", path, e))
}

// ============================================================================
// ENGINE OUTPUT GOLDEN TESTS
// ============================================================================

mod engine_golden {
    use super::*;
    use wcag_probe::config::AuditConfig;
    use wcag_probe::engines::{normalize_ace_report, parse_axe_results, EngineReport};

    #[derive(Debug, Deserialize)]
    struct Fixture {
        input: Value,
        expected: Expected,
    }

    #[derive(Debug, Deserialize)]
    struct Expected {
        engine: String,
        passes: usize,
        incomplete: usize,
        violations: Vec<ExpectedViolation>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct ExpectedViolation {
        id: String,
        impact: Option<String>,
        #[serde(default)]
        tags: Option<Vec<String>>,
        #[serde(default)]
        help_url: Option<String>,
        targets: Vec<String>,
    }

    fn load(name: &str) -> Fixture {
        serde_json::from_str(&read_fixture(name)).expect("Failed to parse fixture JSON")
    }

    fn check(report: &EngineReport, expected: &Expected) {
        assert_eq!(report.engine, expected.engine);
        assert_eq!(report.passes, expected.passes, "passes");
        assert_eq!(report.incomplete, expected.incomplete, "incomplete");

        let ids: Vec<&str> = report.violations.iter().map(|v| v.id.as_str()).collect();
        let expected_ids: Vec<&str> = expected.violations.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, expected_ids, "violation order");

        for (actual, want) in report.violations.iter().zip(&expected.violations) {
            assert_eq!(
                actual.impact.map(|i| i.to_string()),
                want.impact,
                "impact of {}",
                want.id
            );
            let targets: Vec<String> = actual
                .nodes
                .iter()
                .flat_map(|n| n.target.iter().cloned())
                .collect();
            assert_eq!(targets, want.targets, "targets of {}", want.id);
            if let Some(tags) = &want.tags {
                assert_eq!(&actual.tags, tags, "tags of {}", want.id);
            }
            if let Some(url) = &want.help_url {
                assert_eq!(&actual.help_url, url, "helpUrl of {}", want.id);
            }
        }
    }

    #[test]
    fn test_axe_results_golden() {
        let fixture = load("axe_results.json");
        let report = parse_axe_results(&fixture.input.to_string()).unwrap();
        check(&report, &fixture.expected);

        // Failure summaries are carried through untouched
        let summary = report.violations[0].nodes[0].failure_summary.as_deref();
        assert!(summary.unwrap().contains("alt attribute"));
    }

    #[test]
    fn test_ace_report_golden() {
        let fixture = load("ace_report.json");
        let levels = AuditConfig::default().ace_report_levels;
        let report = normalize_ace_report(&fixture.input.to_string(), &levels).unwrap();
        check(&report, &fixture.expected);

        // Each node keeps its own message as the failure summary
        let nodes = &report.violations[0].nodes;
        assert_eq!(nodes.len(), 2);
        assert!(nodes[1]
            .failure_summary
            .as_deref()
            .unwrap()
            .contains("may not be meaningful"));
    }

    #[test]
    fn test_ace_report_all_levels() {
        use wcag_probe::engines::AceLevel;

        let fixture = load("ace_report.json");
        let levels = [
            AceLevel::Violation,
            AceLevel::PotentialViolation,
            AceLevel::Recommendation,
            AceLevel::PotentialRecommendation,
            AceLevel::Manual,
        ];
        let report = normalize_ace_report(&fixture.input.to_string(), &levels).unwrap();

        let ids: Vec<&str> = report.violations.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "img_alt_valid",
                "text_contrast_sufficient",
                "element_tabbable_role_valid",
                "aria_content_in_landmark",
            ]
        );
        // The INFORMATION result has no level and is dropped entirely
        assert_eq!(report.passes, 2);
        assert_eq!(report.incomplete, 0);
    }
}

// ============================================================================
// WCAG LEVEL GOLDEN TESTS
// ============================================================================

mod level_golden {
    use super::*;
    use wcag_probe::config::WcagLevel;
    use wcag_probe::engines::{ace_policy, axe_tags};

    #[derive(Debug, Deserialize)]
    struct TestCase {
        name: String,
        input: String,
        expected: Expected,
    }

    #[derive(Debug, Deserialize)]
    #[serde(untagged)]
    enum Expected {
        Ok {
            ok: String,
            axe_tags: Vec<String>,
            ace_policy: String,
        },
        Err {
            err: String,
        },
    }

    #[derive(Debug, Deserialize)]
    struct Fixture {
        test_cases: Vec<TestCase>,
    }

    #[test]
    fn test_wcag_level_golden() {
        let fixture: Fixture = serde_json::from_str(&read_fixture("wcag_levels.json"))
            .expect("Failed to parse fixture JSON");

        for case in fixture.test_cases {
            let result = case.input.parse::<WcagLevel>();

            match case.expected {
                Expected::Ok {
                    ok,
                    axe_tags: tags,
                    ace_policy: policy,
                } => {
                    let level = result.unwrap_or_else(|e| {
                        panic!("Case '{}': expected Ok({}), got Err({})", case.name, ok, e)
                    });
                    assert_eq!(level.to_string(), ok, "Case '{}'", case.name);
                    assert_eq!(axe_tags(&level, false), tags, "Case '{}'", case.name);
                    assert_eq!(ace_policy(&level), policy, "Case '{}'", case.name);
                }
                Expected::Err { err } => {
                    let e = result.expect_err(&format!("Case '{}': expected Err", case.name));
                    assert!(
                        e.to_string().contains(&err),
                        "Case '{}': error '{}' should contain '{}'",
                        case.name,
                        e,
                        err
                    );
                }
            }
        }
    }
}
