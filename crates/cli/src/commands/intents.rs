use serde::Serialize;
use storefront_agent::storefront_catalog;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct IntentSummary<'a> {
    id: &'a str,
    priority: u32,
    patterns: Vec<&'a str>,
    keywords: &'a [String],
}

#[derive(Debug, Serialize)]
struct IntentsReport<'a> {
    command: &'static str,
    status: &'static str,
    intents: Vec<IntentSummary<'a>>,
}

pub fn run() -> CommandResult {
    let catalog = match storefront_catalog() {
        Ok(catalog) => catalog,
        Err(error) => return CommandResult::failure("intents", "catalog", error.to_string(), 2),
    };

    let intents = catalog
        .iter()
        .map(|intent| IntentSummary {
            id: intent.id().as_str(),
            priority: intent.priority(),
            patterns: intent.patterns().iter().map(|pattern| pattern.as_str()).collect(),
            keywords: intent.keywords(),
        })
        .collect();

    CommandResult::report(&IntentsReport { command: "intents", status: "ok", intents })
}
