//! YAML parameter tables, one block per schedule.

use std::collections::BTreeMap;

use courgette_core::{Schedule, ScheduleEntry};
use serde::Serialize;
use tracing::warn;

use crate::types::sanitize_ident;

const HEADER: &str = "# OpenFisca Parameters\n# Generated from Courgette schedules\n";
const BRACKET_NOTE: &str =
    "# TODO: map entry conditions to date-indexed brackets where the scheme needs them";

#[derive(Debug, Serialize)]
struct ParameterRow<'a> {
    condition: &'a str,
    value: f64,
    period: &'a str,
}

impl<'a> From<&'a ScheduleEntry> for ParameterRow<'a> {
    fn from(entry: &'a ScheduleEntry) -> Self {
        ParameterRow {
            condition: &entry.condition,
            value: entry.amount,
            period: &entry.period,
        }
    }
}

#[derive(Debug, Serialize)]
struct ParameterBlock<'a> {
    description: &'a str,
    values: Vec<ParameterRow<'a>>,
    #[serde(skip_serializing_if = "no_notes")]
    notes: &'a [String],
}

fn no_notes(notes: &&[String]) -> bool {
    notes.is_empty()
}

/// Render every schedule as a parameter block keyed by its identifier.
/// Schedules are visited in name order; when two names collapse to the same
/// identifier the later one wins.
pub fn generate_parameters(schedules: &BTreeMap<String, Schedule>) -> String {
    let mut blocks: BTreeMap<String, ParameterBlock<'_>> = BTreeMap::new();
    for schedule in schedules.values() {
        let ident = sanitize_ident(&schedule.name);
        let block = ParameterBlock {
            description: &schedule.name,
            values: schedule.entries.iter().map(ParameterRow::from).collect(),
            notes: &schedule.notes,
        };
        if blocks.insert(ident.clone(), block).is_some() {
            warn!(ident = %ident, "two schedules share an identifier; keeping the later");
        }
    }

    let mut out = String::from(HEADER);
    for (ident, block) in blocks {
        out.push('\n');
        out.push_str(BRACKET_NOTE);
        out.push('\n');
        let mut single = BTreeMap::new();
        single.insert(ident.as_str(), block);
        match serde_yaml::to_string(&single) {
            Ok(yaml) => out.push_str(&yaml),
            Err(e) => {
                warn!(ident = %ident, "parameter block not serialisable: {}", e);
                out.push_str(&format!("# TODO: could not serialise '{}': {}\n", ident, e));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use courgette_core::parse_document;

    #[test]
    fn empty_input_has_only_header() {
        assert_eq!(generate_parameters(&BTreeMap::new()), HEADER);
    }

    #[test]
    fn rows_carry_condition_value_and_period() {
        let doc = parse_document("Schedule: Rates\nWhen single: $100.00 per fortnight");
        let yaml = generate_parameters(&doc.schedules);
        assert!(yaml.contains(BRACKET_NOTE));
        assert!(yaml.contains("rates:\n  description: Rates\n  values:\n"));
        assert!(yaml.contains("condition: single"));
        assert!(yaml.contains("value: 100.0"));
        assert!(yaml.contains("period: fortnight"));
        assert!(!yaml.contains("notes:"));
    }

    #[test]
    fn output_parses_back_as_yaml() {
        let doc = parse_document(
            "Schedule: Age Pension Rates\nWhen single: $1,096.70\nWhen couple: $1_650.40 per fortnight\nNote: indexed",
        );
        let yaml = generate_parameters(&doc.schedules);
        let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        let block = &value["age_pension_rates"];
        assert_eq!(block["description"].as_str(), Some("Age Pension Rates"));
        assert_eq!(block["values"][0]["value"].as_f64(), Some(1096.7));
        assert_eq!(block["values"][1]["condition"].as_str(), Some("couple"));
        assert_eq!(block["notes"][0].as_str(), Some("indexed"));
    }

    #[test]
    fn blocks_sorted_by_identifier() {
        let doc = parse_document("Schedule: Zeta\nWhen a: $1\n\nSchedule: Alpha\nWhen a: $2");
        let yaml = generate_parameters(&doc.schedules);
        let alpha = yaml.find("alpha:").unwrap();
        let zeta = yaml.find("zeta:").unwrap();
        assert!(alpha < zeta);
    }

    #[test]
    fn colliding_identifiers_keep_one_block() {
        let doc = parse_document("Schedule: Rates\nWhen a: $1\n\nSchedule: rates\nWhen a: $2");
        let yaml = generate_parameters(&doc.schedules);
        assert_eq!(yaml.matches("\nrates:\n").count(), 1);
        // "rates" sorts after "Rates", so it wins.
        assert!(yaml.contains("value: 2.0"));
    }
}
