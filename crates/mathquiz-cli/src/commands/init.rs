//! The `mathquiz init` command.

use std::path::Path;

use anyhow::Result;

use mathquiz_core::bank::fallback_questions;

pub fn execute() -> Result<()> {
    if Path::new("mathquiz.toml").exists() {
        println!("mathquiz.toml already exists, skipping.");
    } else {
        std::fs::write("mathquiz.toml", SAMPLE_CONFIG)?;
        println!("Created mathquiz.toml");
    }

    std::fs::create_dir_all("data")?;
    let questions_path = Path::new("data/questions.json");
    if questions_path.exists() {
        println!("data/questions.json already exists, skipping.");
    } else {
        std::fs::write(
            questions_path,
            serde_json::to_string_pretty(&fallback_questions())?,
        )?;
        println!("Created data/questions.json");
    }

    println!("\nNext steps:");
    println!("  1. Edit mathquiz.toml (set [generation] enabled = true to use an LLM)");
    println!("  2. Run: mathquiz validate --questions data/questions.json");
    println!("  3. Run: mathquiz serve");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# mathquiz configuration

bind = "0.0.0.0:5000"
questions_per_test = 5
history_limit = 5
storage = "json"
data_dir = "./data"
# Session state untouched this long may be dropped
session_idle_hours = 24
max_sessions = 10000

[generation]
enabled = false
provider = "openai"
model = "gpt-4.1-mini"
count = 10
temperature = 0.7
max_tokens = 2000
level = "Year 7"
refresh_on_start = false

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[providers.anthropic]
type = "anthropic"
api_key = "${ANTHROPIC_API_KEY}"
"#;
