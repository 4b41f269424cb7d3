//! Golden checks for the built-in prompt templates.
//!
//! Renders each template with realistic variables and checks that every
//! placeholder was filled and the key facts survived rendering.

use persona_llm::prompt::{self, PromptEngine};
use persona_llm::types::ChatMessage;

struct GoldenCase {
    name: &'static str,
    template: &'static str,
    vars: Vec<(&'static str, &'static str)>,
    must_contain: Vec<&'static str>,
    must_not_contain: Vec<&'static str>,
}

fn golden_cases() -> Vec<GoldenCase> {
    vec![
        GoldenCase {
            name: "companion_with_state_block",
            template: prompt::COMPANION_SYSTEM,
            vars: vec![
                ("character_name", "Mina"),
                (
                    "state_block",
                    "You are Mina, a barista.\n\n[Current state]\nMood: Lively (Done with the day).",
                ),
            ],
            must_contain: vec!["You are Mina", "[Current state]", "schedule_message", "RULES"],
            must_not_contain: vec!["{character_name}", "{state_block}"],
        },
        GoldenCase {
            name: "summary_system",
            template: prompt::SUMMARY_SYSTEM,
            vars: vec![("character_name", "Mina")],
            must_contain: vec!["Mina", "Never invent"],
            must_not_contain: vec!["{character_name}"],
        },
        GoldenCase {
            name: "summary_user",
            template: prompt::SUMMARY_USER,
            vars: vec![
                ("prior_summary", "They met at the cafe."),
                ("transcript", "user: I passed my exam!\ncharacter: Congratulations!"),
                ("max_words", "200"),
            ],
            must_contain: vec!["They met at the cafe.", "I passed my exam!", "200 words"],
            must_not_contain: vec!["{prior_summary}", "{transcript}", "{max_words}"],
        },
    ]
}

#[test]
fn golden_templates_render_cleanly() {
    for case in golden_cases() {
        let rendered = prompt::render_template(case.template, &case.vars);
        for needle in &case.must_contain {
            assert!(
                rendered.contains(needle),
                "[{}] expected {needle:?} in:\n{rendered}",
                case.name
            );
        }
        for needle in &case.must_not_contain {
            assert!(
                !rendered.contains(needle),
                "[{}] unexpected {needle:?} in:\n{rendered}",
                case.name
            );
        }
    }
}

#[test]
fn summary_prompt_without_prior_summary() {
    let engine = PromptEngine::builtin();
    let (system, user) = engine.summary(
        "Mina",
        None,
        &[
            ChatMessage::user("My cat is called Biscuit"),
            ChatMessage::assistant("Cute name!"),
        ],
        150,
    );
    assert!(system.contains("Mina"));
    assert!(user.contains("(none yet)"));
    assert!(user.contains("user: My cat is called Biscuit"));
    assert!(user.contains("character: Cute name!"));
    assert!(user.contains("150 words"));
}

#[test]
fn companion_prompt_wraps_state_block_first() {
    let engine = PromptEngine::builtin();
    let rendered = engine.companion_system("Mina", "You are Mina.");
    assert!(rendered.starts_with("You are Mina."));
    assert!(!rendered.contains('{'));
}
