use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

pub const DEFAULT_KEY_PREFIX: &str = "ACCOUNTS_STATEMENTS_";
pub const PERIOD_END_ON_PLACEHOLDER: &str = "{period_end_on}";

/// Statement key to display text, loaded once at startup.
///
/// The live map is never handed out; every read returns a fresh copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementsProperties {
    statements: HashMap<String, String>,
}

impl StatementsProperties {
    pub fn new(statements: HashMap<String, String>) -> Self {
        Self { statements }
    }

    /// Collects `<prefix><NAME>=text` pairs into statement `name` (lower-cased).
    pub fn from_kv(kv: &HashMap<String, String>, prefix: &str) -> Self {
        let statements = kv
            .iter()
            .filter_map(|(key, value)| {
                let name = key.strip_prefix(prefix)?.trim();
                let text = value.trim();
                (!name.is_empty() && !text.is_empty())
                    .then(|| (name.to_ascii_lowercase(), text.to_string()))
            })
            .collect();

        Self { statements }
    }

    pub fn set_statements(&mut self, statements: HashMap<String, String>) {
        self.statements = statements;
    }

    pub fn statements_copy(&self) -> HashMap<String, String> {
        self.statements.clone()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Renders every statement with the period end date substituted in.
    pub fn legal_statements(&self, period_end_on: NaiveDate) -> BTreeMap<String, String> {
        let formatted = format_period_end_on(period_end_on);
        self.statements
            .iter()
            .map(|(key, text)| {
                (
                    key.clone(),
                    text.replace(PERIOD_END_ON_PLACEHOLDER, formatted.as_str()),
                )
            })
            .collect()
    }
}

fn format_period_end_on(date: NaiveDate) -> String {
    date.format("%-d %B %Y").to_string()
}
