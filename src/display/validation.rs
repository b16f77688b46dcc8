//! Validation report formatting

use crate::services::validation::ValidationReport;

/// Format a validation report, one violation per line
pub fn format_validation_report(report: &ValidationReport) -> String {
    if report.is_valid() {
        return "Ledger is consistent.".to_string();
    }

    let mut output = format!("{} violation(s):\n", report.violations.len());
    for violation in &report.violations {
        output.push_str(&format!("  - {}\n", violation));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Money, VerificationId};
    use crate::services::validation::Violation;

    #[test]
    fn test_clean_report() {
        let report = ValidationReport::default();
        assert_eq!(format_validation_report(&report), "Ledger is consistent.");
    }

    #[test]
    fn test_violations_listed() {
        let report = ValidationReport {
            violations: vec![Violation::UnbalancedVerification {
                id: VerificationId::new('A', 1),
                sum: Money::from_cents(-100),
            }],
        };

        let output = format_validation_report(&report);
        assert!(output.starts_with("1 violation(s):"));
        assert!(output.contains("Verification A1 sums to -1.00"));
    }
}
