//! The `mathquiz validate` command.

use std::path::PathBuf;

use anyhow::Result;

use mathquiz_core::parser::{load_question_file, validate_questions};

pub fn execute(questions_path: PathBuf) -> Result<()> {
    let questions = load_question_file(&questions_path)?;
    println!(
        "Question file: {} ({} questions)",
        questions_path.display(),
        questions.len()
    );

    let warnings = validate_questions(&questions);
    for w in &warnings {
        let prefix = w
            .question_id
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("All questions valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
