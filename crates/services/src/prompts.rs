//! Prompt builders for the LLM oracle. Every prompt asks for a JSON object
//! whose shape is named in the final instruction.

use std::fmt::Write;

pub(crate) fn classify(message: &str, question: &str) -> String {
    format!(
        "You classify messages sent by a student during a quiz.\n\
         Categories:\n\
         - answer: the student attempts to answer the question\n\
         - help: the student asks for a hint, clarification or explanation\n\
         - other: anything else\n\
         When unsure, choose other.\n\n\
         Question: {question}\n\
         Student message: {message}\n\n\
         Respond with JSON: {{\"type\": \"answer\" | \"help\" | \"other\"}}"
    )
}

pub(crate) fn evaluate(answer: &str, question: &str, reference: &str) -> String {
    format!(
        "You grade a student's answer using the reference text below.\n\
         Judge accuracy, completeness, understanding and clarity.\n\
         Score from 0 to 10: 9-10 exceptional, 7-8 strong with minor gaps, \
         5-6 adequate, 3-4 partial understanding, 0-2 major misconceptions.\n\
         Feedback should name strengths, gaps and concrete improvements, \
         citing the reference where useful.\n\n\
         Question:\n{question}\n\n\
         Student answer:\n{answer}\n\n\
         Reference text:\n{reference}\n\n\
         Respond with JSON: {{\"feedback\": string, \"score\": number}}"
    )
}

pub(crate) fn explain(message: &str, question: &str, reference: &str) -> String {
    format!(
        "A student asked for help with a quiz question. Explain what the \
         question is asking and point them toward the relevant ideas in the \
         reference text without giving the full answer away.\n\n\
         Question:\n{question}\n\n\
         Student message:\n{message}\n\n\
         Reference text:\n{reference}\n\n\
         Respond with JSON: {{\"explanation\": string}}"
    )
}

pub(crate) fn extract_sections(contents: &str, example_titles: &[String]) -> String {
    let mut examples = String::new();
    for (i, title) in example_titles.iter().enumerate() {
        let _ = writeln!(examples, "{}. {title}", i + 1);
    }
    format!(
        "Extract the main sections or chapters from this table of contents. \
         Skip sub-sections. Titles must not include chapter numbers or other \
         prefixes. Return an empty list when no sections are found.\n\n\
         Table of contents:\n{contents}\n\n\
         Example section titles:\n{examples}\n\
         Respond with JSON: {{\"sections\": [{{\"title\": string, \"page_number\": integer}}]}}"
    )
}

pub(crate) fn generate_questions(content: &str, count: u32) -> String {
    format!(
        "Write {count} questions about the text below that test core \
         understanding, critical thinking, practical application and \
         connections to broader ideas. Vary the question style.\n\n\
         Text:\n{content}\n\n\
         Respond with JSON: {{\"questions\": [string]}}"
    )
}

pub(crate) fn improve_question(question: &str, feedback: &str) -> String {
    format!(
        "Rewrite the question to address the feedback while keeping its \
         intent. Make it clear and concise.\n\n\
         Question:\n{question}\n\n\
         Feedback:\n{feedback}\n\n\
         Respond with JSON: {{\"question\": string}}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_titles_are_numbered() {
        let prompt = extract_sections("1 Intro ... 3", &["Motion".into(), "Energy".into()]);
        assert!(prompt.contains("1. Motion\n2. Energy\n"));
        assert!(prompt.contains("1 Intro ... 3"));
    }

    #[test]
    fn prompts_embed_inputs() {
        let prompt = evaluate("F = ma", "State Newton's second law", "Force equals mass times acceleration");
        assert!(prompt.contains("F = ma"));
        assert!(prompt.contains("Newton's second law"));
        assert!(prompt.contains("mass times acceleration"));
        assert!(generate_questions("text", 4).starts_with("Write 4 questions"));
    }
}
