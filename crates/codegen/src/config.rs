//! Generation settings.
//!
//! Every field has a default so an empty `[generate]` table, or no config at
//! all, produces the same output as [`GenerateConfig::default`].

use serde::{Deserialize, Serialize};

/// Period constant written on every generated variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionPeriod {
    #[default]
    Month,
    Year,
    Eternity,
}

impl DefinitionPeriod {
    pub fn as_python(self) -> &'static str {
        match self {
            DefinitionPeriod::Month => "MONTH",
            DefinitionPeriod::Year => "YEAR",
            DefinitionPeriod::Eternity => "ETERNITY",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    pub definition_period: DefinitionPeriod,
    /// Attach the scenario summary as `documentation` on eligibility rules.
    pub documentation: bool,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        GenerateConfig {
            definition_period: DefinitionPeriod::Month,
            documentation: true,
        }
    }
}
