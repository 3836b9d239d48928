use crate::complexity::ComplexityReport;
use crate::core::Scope;

/// Build the review prompt sent to a paid model.
pub fn build_prompt(code: &str, scope: Scope, complexity: Option<&ComplexityReport>) -> String {
    let subject = match scope {
        Scope::All => "the following Python module",
        Scope::Function => "the following Python function in isolation",
        Scope::Class => "the following Python class and its methods",
    };

    let mut prompt = format!(
        "You are a meticulous code reviewer. Assess {subject} for correctness, \
         readability, maintainability and performance.\n\n"
    );

    if let Some(report) = complexity.filter(|r| r.overall_complexity.is_some()) {
        prompt.push_str("Static complexity analysis:\n");
        prompt.push_str(&report.summary());
        prompt.push_str("\n\n");
    }

    prompt.push_str("```python\n");
    prompt.push_str(code.trim_end());
    prompt.push_str("\n```\n\n");
    prompt.push_str(
        "Respond with a single JSON object and nothing else, using exactly these fields:\n\
         {\"status\": \"VALID\" | \"MOSTLY_VALID\" | \"NOT_VALID\", \
         \"confidence\": <number between 0 and 1>, \
         \"explanation\": <one short paragraph>, \
         \"suggestions\": [<concrete improvement>, ...]}\n",
    );
    prompt
}
