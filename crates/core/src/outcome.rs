//! Outcome classification.
//!
//! Patterns are tried in a fixed priority order and the first one that
//! matches wins: eligibility, payment, base rate, schedule, reduction,
//! threshold. Anything else is [`Outcome::Unrecognized`].

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{
    Calculation, Eligibility, Expression, Reference, ReferenceKind, Rule, RuleBody, DEFAULT_PERIOD,
};

static ELIGIBILITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.+?)\s*(?:=|is)\s*(?:true|eligible)$").unwrap());
static PAYMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^payment\s+is\s+\$?([\d,._]+)(?:\s+per\s+(\w+))?").unwrap()
});
static BASE_RATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^base rate is\s+\$?([\d,._]+)").unwrap());
static SCHEDULE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^rate is determined by (.+)").unwrap());
static REDUCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:payment\s+)?reduces? by ([\d.]+) cents per dollar over \$?([\d,._]+)")
        .unwrap()
});
static THRESHOLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^cut[- ]?out at \$?([\d,._]+)").unwrap());

/// Result of classifying one outcome line.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Eligibility(Eligibility),
    Calculation(Calculation),
    Unrecognized,
}

/// Parse a dollar amount, dropping `,` and `_` separators.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',' && *c != '_').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Snake-like variable key for a benefit name.
pub fn variable_key(benefit: &str) -> String {
    benefit.to_lowercase().replace(' ', "_")
}

pub fn classify_outcome(text: &str) -> Outcome {
    let text = text.trim();

    if let Some(caps) = ELIGIBILITY.captures(text) {
        let benefit = caps[1].trim().to_owned();
        return Outcome::Eligibility(Eligibility {
            variable: variable_key(&benefit),
            benefit,
            value: true,
        });
    }

    if let Some(caps) = PAYMENT.captures(text) {
        if let Some(amount) = parse_amount(&caps[1]) {
            let period = caps
                .get(2)
                .map(|m| m.as_str().to_owned())
                .unwrap_or_else(|| DEFAULT_PERIOD.to_owned());
            return Outcome::Calculation(Calculation::FixedPayment { amount, period });
        }
    }

    if let Some(caps) = BASE_RATE.captures(text) {
        if let Some(amount) = parse_amount(&caps[1]) {
            return Outcome::Calculation(Calculation::BaseRate { amount });
        }
    }

    if let Some(caps) = SCHEDULE.captures(text) {
        let schedule = caps[1].trim().to_owned();
        return Outcome::Calculation(Calculation::ScheduleLookup { schedule });
    }

    if let Some(caps) = REDUCTION.captures(text) {
        if let (Some(cents), Some(threshold)) = (parse_amount(&caps[1]), parse_amount(&caps[2])) {
            return Outcome::Calculation(Calculation::Reduction {
                rate: cents / 100.0,
                threshold,
            });
        }
    }

    if let Some(caps) = THRESHOLD.captures(text) {
        if let Some(cutout) = parse_amount(&caps[1]) {
            return Outcome::Calculation(Calculation::Threshold { cutout });
        }
    }

    Outcome::Unrecognized
}

/// Classify `text` and wrap the result as an outcome [`Rule`].
pub fn outcome_rule(text: &str, line: u32) -> Rule {
    let outcome = classify_outcome(text);
    let mut references = Vec::new();
    let parsed = match outcome {
        Outcome::Eligibility(e) => Some(RuleBody::Eligibility(e)),
        Outcome::Calculation(calc) => {
            if let Calculation::ScheduleLookup { schedule } = &calc {
                references.push(Reference {
                    ref_type: ReferenceKind::Schedule,
                    target: schedule.clone(),
                    location: Some(format!("line {}", line)),
                });
            }
            Some(RuleBody::Expression(Expression::Calculation(calc)))
        }
        Outcome::Unrecognized => None,
    };
    Rule {
        text: text.trim().to_owned(),
        parsed,
        references,
        line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eligibility_with_equals_true() {
        let Outcome::Eligibility(e) = classify_outcome("age_pension_eligible = true") else {
            panic!("expected eligibility");
        };
        assert_eq!(e.benefit, "age_pension_eligible");
        assert_eq!(e.variable, "age_pension_eligible");
        assert!(e.value);
    }

    #[test]
    fn eligibility_with_is_eligible() {
        let Outcome::Eligibility(e) = classify_outcome("Youth Allowance is eligible") else {
            panic!("expected eligibility");
        };
        assert_eq!(e.benefit, "Youth Allowance");
        assert_eq!(e.variable, "youth_allowance");
    }

    #[test]
    fn payment_with_and_without_period() {
        assert_eq!(
            classify_outcome("payment is $350.50 per week"),
            Outcome::Calculation(Calculation::FixedPayment {
                amount: 350.5,
                period: "week".into()
            })
        );
        assert_eq!(
            classify_outcome("Payment is $1,096.70"),
            Outcome::Calculation(Calculation::FixedPayment {
                amount: 1096.7,
                period: "fortnight".into()
            })
        );
    }

    #[test]
    fn base_rate() {
        assert_eq!(
            classify_outcome("base rate is $1_000"),
            Outcome::Calculation(Calculation::BaseRate { amount: 1000.0 })
        );
    }

    #[test]
    fn schedule_lookup_keeps_name_verbatim() {
        assert_eq!(
            classify_outcome("rate is determined by Age Pension Rates"),
            Outcome::Calculation(Calculation::ScheduleLookup {
                schedule: "Age Pension Rates".into()
            })
        );
    }

    #[test]
    fn reduction_converts_cents() {
        assert_eq!(
            classify_outcome("payment reduces by 50 cents per dollar over $204"),
            Outcome::Calculation(Calculation::Reduction {
                rate: 0.5,
                threshold: 204.0
            })
        );
        assert_eq!(
            classify_outcome("reduce by 25 cents per dollar over $1,000"),
            Outcome::Calculation(Calculation::Reduction {
                rate: 0.25,
                threshold: 1000.0
            })
        );
    }

    #[test]
    fn threshold() {
        assert_eq!(
            classify_outcome("cut-out at $2,500"),
            Outcome::Calculation(Calculation::Threshold { cutout: 2500.0 })
        );
        assert_eq!(
            classify_outcome("cutout at 900"),
            Outcome::Calculation(Calculation::Threshold { cutout: 900.0 })
        );
    }

    #[test]
    fn eligibility_outranks_later_patterns() {
        // Ends in "= true", so the eligibility pattern wins even though the
        // text also mentions a payment.
        assert!(matches!(
            classify_outcome("payment is $5 flag = true"),
            Outcome::Eligibility(_)
        ));
    }

    #[test]
    fn unrecognized_outcome() {
        assert_eq!(classify_outcome("something happens"), Outcome::Unrecognized);
        assert_eq!(classify_outcome("payment is $1.2.3"), Outcome::Unrecognized);
    }

    #[test]
    fn schedule_rule_carries_reference() {
        let rule = outcome_rule("rate is determined by Rates", 7);
        assert_eq!(rule.references.len(), 1);
        assert_eq!(rule.references[0].ref_type, ReferenceKind::Schedule);
        assert_eq!(rule.references[0].target, "Rates");
        assert!(rule.calculation().is_some());
    }

    #[test]
    fn unrecognized_rule_has_no_payload() {
        let rule = outcome_rule("  do something  ", 3);
        assert_eq!(rule.text, "do something");
        assert!(rule.parsed.is_none());
    }

    #[test]
    fn amounts_strip_separators() {
        assert_eq!(parse_amount("1,234_567.5"), Some(1234567.5));
        assert_eq!(parse_amount("."), None);
    }
}
