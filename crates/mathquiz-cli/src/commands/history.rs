//! The `mathquiz history` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use mathquiz_core::model::TestResult;
use mathquiz_core::statistics::{question_accuracy, summarize_history};
use mathquiz_core::traits::QuizStore;
use mathquiz_providers::config::load_config_from;
use mathquiz_report::{render_index, write_html_report, IndexPage};
use mathquiz_store::JsonFileStore;

pub async fn execute(
    data_dir: Option<PathBuf>,
    session: Option<String>,
    html: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let data_dir = data_dir.unwrap_or(config.data_dir);
    if !data_dir.exists() {
        anyhow::bail!("data directory not found: {}", data_dir.display());
    }
    let store = JsonFileStore::open(&data_dir, config.history_limit).await?;

    let owners = match &session {
        Some(s) => vec![s.clone()],
        None => store.owners().await?,
    };

    if owners.is_empty() {
        println!("No completed tests in {}.", data_dir.display());
    }

    for owner in &owners {
        let history = store.history(owner).await?;
        let summary = summarize_history(&history);
        println!("Session: {owner}");
        if history.is_empty() {
            println!("  no completed tests\n");
            continue;
        }
        println!("{}", history_table(&history));
        println!(
            "{} tests | average {:.1}% | best {:.1}%\n",
            summary.tests_taken, summary.average_percentage, summary.best_percentage
        );

        if let Some(path) = &html {
            let page = render_index(&IndexPage {
                history: &history,
                summary: &summary,
                flash: None,
                questions_per_test: config.questions_per_test,
            });
            write_html_report(&page, path)?;
            println!("Wrote {}", path.display());
        }
    }

    let accuracy = question_accuracy(&store.questions().await?);
    if !accuracy.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["ID", "Question", "Used", "Correct", "Accuracy"]);
        for stat in accuracy.iter().take(10) {
            table.add_row(vec![
                Cell::new(stat.question_id),
                Cell::new(&stat.question),
                Cell::new(stat.times_used),
                Cell::new(stat.times_correct),
                Cell::new(format!("{:.1}%", stat.accuracy * 100.0)),
            ]);
        }
        println!("Hardest questions\n{table}");
    }

    Ok(())
}

fn history_table(history: &[TestResult]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["#", "Date", "Score", "Answered", "Percentage"]);
    for (index, result) in history.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index),
            Cell::new(result.date.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(format!("{}/{}", result.score, result.total)),
            Cell::new(result.answered),
            Cell::new(format!("{:.1}%", result.percentage)),
        ]);
    }
    table
}
