//! The `mathquiz generate` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use mathquiz_core::generator::{merge_into_pool, QuestionOrigin};
use mathquiz_core::model::OPTION_LETTERS;
use mathquiz_core::parser::load_question_file;
use mathquiz_providers::config::{create_generator, load_config_from};

pub async fn execute(
    count: Option<usize>,
    write: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config_from(config_path.as_deref())?;
    config.generation.enabled = true;
    if let Some(count) = count {
        config.generation.count = count;
    }
    config.validate()?;

    let generator = create_generator(&config)?;
    eprintln!(
        "Requesting {} questions from {} ({})",
        config.generation.count, config.generation.provider, config.generation.model
    );
    let generated = generator.generate().await;

    if generated.origin == QuestionOrigin::Fallback {
        eprintln!(
            "Generation failed, using fallback questions: {}",
            generated.fallback_reason.as_deref().unwrap_or("unknown reason")
        );
    }

    for q in &generated.questions {
        println!("{}. {}", q.id, q.question);
        for (letter, option) in OPTION_LETTERS.iter().zip(q.options.iter()) {
            let marker = if option == q.correct_option() { "*" } else { " " };
            println!("   {marker} {letter}) {option}");
        }
    }
    println!(
        "\n{} questions ({})",
        generated.questions.len(),
        generated.origin
    );

    if let Some(path) = write {
        let mut pool = if path.exists() {
            load_question_file(&path)?
        } else {
            Vec::new()
        };
        let added = merge_into_pool(&mut pool, generated.questions);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_json::to_string_pretty(&pool)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!(
            "Added {added} new questions to {} ({} total)",
            path.display(),
            pool.len()
        );
    }

    Ok(())
}
