use crate::api_client::{ApiClient, ApiError, SearchCriteria};
use crate::config::config::Config;
use anyhow::Result;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use crossterm::style::Stylize;
use reedline::{
    Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus, Reedline, Signal,
};
use serde_json::Value;
use std::borrow::Cow;
use std::fs;

struct TrialsPrompt;

impl Prompt for TrialsPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Borrowed("trials> ")
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _edit_mode: PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed("> ")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("... ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!(
            "({}reverse search: {})",
            prefix, history_search.term
        ))
    }
}

fn print_help() {
    println!("{}", "trials-cli - ClinicalTrials.gov search".blue().bold());
    println!();
    println!("{}", "Commands:".yellow());
    println!("  {}              - Run a search with the current filters", "search".green());
    println!("  {}  - Change one filter", "\\set cond|status|locn <value>".green());
    println!("  {}               - Show the current filters", "\\show".green());
    println!("  {}       - Write the last response to a file", "\\save <filename>".green());
    println!("  {}               - Show this help", "\\help".green());
    println!("  {}              - Clear screen", "\\clear".green());
    println!("  {}            - Exit", "Ctrl+D".green());
    println!();
    println!("{}", "The filters map straight onto the registry query:".yellow());
    println!("  cond   -> query.cond");
    println!("  status -> filter.overallStatus");
    println!("  locn   -> query.locn");
    println!();
}

fn print_criteria(criteria: &SearchCriteria) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Parameter").add_attribute(Attribute::Bold),
        Cell::new("Value").add_attribute(Attribute::Bold),
    ]);
    for (key, value) in criteria.echo_pairs() {
        table.add_row(vec![key, value]);
    }
    println!("{table}");
}

/// Applies a `\set cond|status|locn <value>` command. The value is taken
/// verbatim, including leading/trailing spaces and empty strings.
fn apply_set(criteria: &mut SearchCriteria, args: &str) -> std::result::Result<String, String> {
    let (field, value) = match args.split_once(' ') {
        Some((field, value)) => (field, value),
        None => (args, ""),
    };
    match field {
        "cond" => {
            criteria.condition = value.to_string();
            Ok(format!("query.cond = {:?}", value))
        }
        "status" => {
            criteria.overall_status = value.to_string();
            Ok(format!("filter.overallStatus = {:?}", value))
        }
        "locn" => {
            criteria.location = value.to_string();
            Ok(format!("query.locn = {:?}", value))
        }
        other => Err(format!(
            "Unknown filter '{}' - expected cond, status or locn",
            other
        )),
    }
}

fn run_search(client: &ApiClient, criteria: &SearchCriteria, last_response: &mut Option<Value>) {
    match client.fetch_studies(criteria) {
        Ok(document) => {
            println!("{}", "Search parameters:".yellow());
            print_criteria(criteria);
            println!("{}", "Response:".yellow());
            match serde_json::to_string_pretty(&document) {
                Ok(pretty) => println!("{pretty}"),
                Err(_) => println!("{document}"),
            }
            *last_response = Some(document);
        }
        Err(err @ ApiError::Http { .. }) => {
            eprintln!("{}", err.to_string().red());
        }
        Err(err) => {
            eprintln!("{}", format!("Error: {}", err).red());
        }
    }
}

fn save_response(response: &Value, filename: &str) -> Result<()> {
    let pretty = serde_json::to_string_pretty(response)?;
    fs::write(filename, pretty + "\n")?;
    Ok(())
}

pub fn run_classic(base_url: &str, config: &Config) -> Result<()> {
    let api_client = ApiClient::with_timeout(base_url, config.api.timeout())?;
    let mut criteria = SearchCriteria::new(
        &config.defaults.condition,
        &config.defaults.overall_status,
        &config.defaults.location,
    );
    let mut last_response: Option<Value> = None;

    print_help();
    println!("{}", format!("Registry: {}", api_client.base_url()).cyan());
    print_criteria(&criteria);

    let mut line_editor = Reedline::create();
    let prompt = TrialsPrompt;

    loop {
        let sig = line_editor.read_line(&prompt)?;
        match sig {
            Signal::Success(buffer) => {
                let trimmed = buffer.trim();
                if trimmed.is_empty() {
                    continue;
                }

                if trimmed == "\\help" {
                    print_help();
                    continue;
                }

                if trimmed == "\\clear" {
                    print!("{esc}[2J{esc}[1;1H", esc = 27 as char);
                    continue;
                }

                if trimmed == "\\show" {
                    print_criteria(&criteria);
                    continue;
                }

                if let Some(args) = trimmed.strip_prefix("\\set ") {
                    match apply_set(&mut criteria, args) {
                        Ok(message) => println!("{}", message.green()),
                        Err(message) => eprintln!("{}", message.red()),
                    }
                    continue;
                }

                if trimmed.starts_with("\\save") {
                    let parts: Vec<&str> = trimmed.split_whitespace().collect();
                    if parts.len() < 2 {
                        eprintln!("{}", "Usage: \\save <filename>".red());
                        continue;
                    }

                    if let Some(ref response) = last_response {
                        match save_response(response, parts[1]) {
                            Ok(()) => println!("{}", format!("Saved to {}", parts[1]).green()),
                            Err(e) => eprintln!("{}", format!("Save error: {}", e).red()),
                        }
                    } else {
                        eprintln!("{}", "No response to save. Run a search first.".red());
                    }
                    continue;
                }

                if trimmed == "search" {
                    run_search(&api_client, &criteria, &mut last_response);
                    continue;
                }

                eprintln!(
                    "{}",
                    format!("Unknown command: {} (\\help for help)", trimmed).red()
                );
            }
            Signal::CtrlD | Signal::CtrlC => {
                println!("\nGoodbye!");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_one_filter_verbatim() {
        let mut criteria = SearchCriteria::new("lung cancer", "RECRUITING", "Japan");

        apply_set(&mut criteria, "cond  heart disease ").unwrap();
        assert_eq!(criteria.condition, " heart disease ");
        assert_eq!(criteria.overall_status, "RECRUITING");

        apply_set(&mut criteria, "status COMPLETED").unwrap();
        assert_eq!(criteria.overall_status, "COMPLETED");

        apply_set(&mut criteria, "locn").unwrap();
        assert_eq!(criteria.location, "");
    }

    #[test]
    fn set_rejects_unknown_filters() {
        let mut criteria = SearchCriteria::new("", "", "");
        let err = apply_set(&mut criteria, "country Japan").unwrap_err();
        assert!(err.contains("country"));
    }

    #[test]
    fn save_response_writes_pretty_json() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("response.json");

        let document = serde_json::json!({"studies": [{"id": "NCT001"}]});
        save_response(&document, path.to_str().unwrap())?;

        let written = fs::read_to_string(&path)?;
        assert_eq!(serde_json::from_str::<Value>(&written)?, document);
        assert!(written.ends_with('\n'));
        Ok(())
    }
}
