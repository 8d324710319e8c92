//! HTML page generator.
//!
//! Produces self-contained HTML documents with all CSS inlined.

use anyhow::Result;
use std::path::Path;

use mathquiz_core::model::{AnswerOutcome, Test, TestResult, OPTION_LETTERS};
use mathquiz_core::statistics::HistorySummary;

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Everything the index page shows.
#[derive(Debug, Clone, Copy)]
pub struct IndexPage<'a> {
    /// Recent results, newest first.
    pub history: &'a [TestResult],
    pub summary: &'a HistorySummary,
    pub flash: Option<&'a str>,
    pub questions_per_test: usize,
}

fn open_page(html: &mut String, title: &str) {
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!("<title>{} | mathquiz</title>\n", html_escape(title)));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");
    html.push_str("<nav><a href=\"/\">mathquiz</a> <a href=\"/start_test\">New test</a></nav>\n");
}

fn close_page(html: &mut String) {
    html.push_str("</body>\n</html>");
}

fn push_flash(html: &mut String, flash: Option<&str>) {
    if let Some(message) = flash {
        html.push_str(&format!(
            "<p class=\"flash\" role=\"alert\">{}</p>\n",
            html_escape(message)
        ));
    }
}

fn score_class(percentage: f64) -> &'static str {
    if percentage >= 80.0 {
        "pass"
    } else if percentage >= 50.0 {
        "warn"
    } else {
        "fail"
    }
}

/// The landing page: start link, summary and recent history.
pub fn render_index(page: &IndexPage<'_>) -> String {
    let mut html = String::new();
    open_page(&mut html, "Home");

    html.push_str("<header>\n<h1>Year 7 Math Quiz</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">Each test has {} multiple-choice questions.</p>\n",
        page.questions_per_test
    ));
    html.push_str("</header>\n");
    push_flash(&mut html, page.flash);

    html.push_str("<p><a class=\"button\" href=\"/start_test\">Start a new test</a></p>\n");

    html.push_str("<section class=\"history\">\n<h2>Recent tests</h2>\n");
    if page.history.is_empty() {
        html.push_str("<p class=\"meta\">No tests taken yet.</p>\n");
    } else {
        let summary = page.summary;
        html.push_str(&format!(
            "<p class=\"meta\">{} tests | average {:.1}% | best {:.1}%</p>\n",
            summary.tests_taken, summary.average_percentage, summary.best_percentage
        ));

        html.push_str("<table>\n");
        html.push_str(
            "<thead><tr><th>#</th><th>Date</th><th>Score</th><th>Percentage</th><th></th></tr></thead>\n",
        );
        html.push_str("<tbody>\n");
        for (index, result) in page.history.iter().enumerate() {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}/{}</td><td class=\"{}\">{:.1}%</td><td>\
                 <form method=\"post\" action=\"/view_test_result\">\
                 <input type=\"hidden\" name=\"test_index\" value=\"{}\">\
                 <button type=\"submit\">View</button></form></td></tr>\n",
                index + 1,
                result.date.format("%Y-%m-%d %H:%M UTC"),
                result.score,
                result.total,
                score_class(result.percentage),
                result.percentage,
                index,
            ));
        }
        html.push_str("</tbody></table>\n");
    }
    html.push_str("</section>\n");

    close_page(&mut html);
    html
}

/// The question form for a test in progress.
///
/// Each question is a radio group named `q_{id}` whose values are the option
/// texts, which the grader matches literally.
pub fn render_test(test: &Test, flash: Option<&str>) -> String {
    let mut html = String::new();
    open_page(&mut html, "Test");

    html.push_str("<header>\n<h1>Math Test</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">{} questions | started {}</p>\n",
        test.questions.len(),
        test.started_at.format("%Y-%m-%d %H:%M UTC")
    ));
    html.push_str("</header>\n");
    push_flash(&mut html, flash);

    html.push_str("<form method=\"post\" action=\"/submit_test\">\n");
    for (number, question) in test.questions.iter().enumerate() {
        let key = question.answer_key();
        html.push_str("<fieldset class=\"question\">\n");
        html.push_str(&format!(
            "<legend>{}. {}</legend>\n",
            number + 1,
            html_escape(&question.question)
        ));
        for (letter, option) in OPTION_LETTERS.iter().zip(question.options.iter()) {
            let option = html_escape(option);
            html.push_str(&format!(
                "<label><input type=\"radio\" name=\"{key}\" value=\"{option}\"> {letter}) {option}</label>\n"
            ));
        }
        html.push_str("</fieldset>\n");
    }
    html.push_str("<button type=\"submit\">Submit answers</button>\n");
    html.push_str("</form>\n");

    close_page(&mut html);
    html
}

/// Score, per-question feedback and the raw result.
pub fn render_results(result: &TestResult, flash: Option<&str>) -> String {
    let mut html = String::new();
    open_page(&mut html, "Results");

    html.push_str("<header>\n<h1>Test Results</h1>\n");
    html.push_str(&format!(
        "<p class=\"score {}\">{} / {} ({:.1}%)</p>\n",
        score_class(result.percentage),
        result.score,
        result.total,
        result.percentage
    ));
    html.push_str(&format!(
        "<p class=\"meta\">{} answered | {}</p>\n",
        result.answered,
        result.date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");
    push_flash(&mut html, flash);

    html.push_str("<section class=\"results\">\n<table>\n");
    html.push_str("<thead><tr><th>Question</th><th>Your answer</th><th>Correct answer</th><th>Explanation</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for feedback in &result.feedback {
        let class = if feedback.is_correct { "pass" } else { "fail" };
        let answer = match (&feedback.user_answer, feedback.outcome) {
            (_, AnswerOutcome::Unanswered) | (None, _) => "<em>no answer</em>".to_string(),
            (Some(a), AnswerOutcome::Invalid) => format!("{} <em>(invalid)</em>", html_escape(a)),
            (Some(a), _) => html_escape(a),
        };
        html.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            class,
            html_escape(&feedback.question),
            answer,
            html_escape(&feedback.correct_answer),
            html_escape(&feedback.explanation),
        ));
    }
    html.push_str("</tbody></table>\n</section>\n");

    html.push_str("<p><a class=\"button\" href=\"/start_test\">Take another test</a> <a href=\"/\">Back to history</a></p>\n");

    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(result).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    close_page(&mut html);
    html
}

pub fn render_not_found(path: &str) -> String {
    let mut html = String::new();
    open_page(&mut html, "Not found");
    html.push_str("<h1>Page not found</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">Nothing lives at <code>{}</code>.</p>\n",
        html_escape(path)
    ));
    html.push_str("<p><a href=\"/\">Go home</a></p>\n");
    close_page(&mut html);
    html
}

/// Write a rendered page to a file, creating parent directories.
pub fn write_html_report(html: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)?;
    Ok(())
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --warn: #fef9c3; --fail: #fde2e2; --accent: #2563eb; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --warn: #713f12; --fail: #7f1d1d; --accent: #60a5fa; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0 auto; max-width: 60rem; padding: 2rem; background: var(--bg); color: var(--fg); }
nav a { margin-right: 1rem; color: var(--accent); text-decoration: none; }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
.flash { padding: 0.75rem 1rem; border: 1px solid var(--border); border-left: 4px solid var(--accent); border-radius: 4px; }
.button, button { display: inline-block; padding: 0.5rem 1rem; border: 0; border-radius: 6px; background: var(--accent); color: #fff; text-decoration: none; cursor: pointer; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; vertical-align: top; }
th { background: var(--border); }
td form { margin: 0; }
fieldset.question { border: 1px solid var(--border); border-radius: 8px; margin: 1rem 0; padding: 1rem; }
fieldset.question label { display: block; padding: 0.25rem 0; }
.score { font-size: 2rem; font-weight: bold; padding: 0.5rem 1rem; border-radius: 8px; display: inline-block; }
.pass { background: var(--pass); }
.warn { background: var(--warn); }
.fail { background: var(--fail); }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use mathquiz_core::bank::fallback_questions;
    use mathquiz_core::grader::grade;
    use mathquiz_core::model::SubmittedAnswer;
    use mathquiz_core::statistics::summarize_history;
    use std::collections::BTreeMap;

    fn make_result() -> (Test, TestResult) {
        let questions = fallback_questions().into_iter().take(3).collect();
        let test = Test::new("session", questions);
        let mut answers = BTreeMap::new();
        answers.insert("q_1".to_string(), SubmittedAnswer::from("5"));
        answers.insert("q_2".to_string(), SubmittedAnswer::from("<script>"));
        let result = grade(&test, &answers).unwrap();
        (test, result)
    }

    #[test]
    fn index_lists_history_with_view_forms() {
        let (_, result) = make_result();
        let history = vec![result.clone(), result];
        let summary = summarize_history(&history);
        let html = render_index(&IndexPage {
            history: &history,
            summary: &summary,
            flash: Some("Invalid test index."),
            questions_per_test: 5,
        });

        assert!(html.contains("<html"));
        assert!(html.contains("</html>"));
        assert!(html.contains("Invalid test index."));
        assert!(html.contains("name=\"test_index\" value=\"0\""));
        assert!(html.contains("name=\"test_index\" value=\"1\""));
        assert!(html.contains("1/3"));
    }

    #[test]
    fn empty_index_has_start_link() {
        let summary = HistorySummary::default();
        let html = render_index(&IndexPage {
            history: &[],
            summary: &summary,
            flash: None,
            questions_per_test: 5,
        });
        assert!(html.contains("href=\"/start_test\""));
        assert!(html.contains("No tests taken yet."));
        assert!(!html.contains("class=\"flash\""));
    }

    #[test]
    fn test_form_has_radio_group_per_question() {
        let (test, _) = make_result();
        let html = render_test(&test, None);
        assert!(html.contains("action=\"/submit_test\""));
        for question in &test.questions {
            let key = format!("name=\"{}\"", question.answer_key());
            assert_eq!(html.matches(&key).count(), 4);
        }
        assert!(html.contains("value=\"5\""));
    }

    #[test]
    fn results_escape_user_input() {
        let (_, result) = make_result();
        let html = render_results(&result, None);
        assert!(html.contains("1 / 3"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("no answer"));
        assert!(html.contains("(invalid)"));
    }

    #[test]
    fn not_found_echoes_escaped_path() {
        let html = render_not_found("/signup?<x>");
        assert!(html.contains("Page not found"));
        assert!(html.contains("/signup?&lt;x&gt;"));
    }

    #[test]
    fn write_to_file() {
        let (_, result) = make_result();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("results.html");

        write_html_report(&render_results(&result, None), &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("<html"));
    }
}
