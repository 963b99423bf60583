/// Longest explanation the backend is asked for, in characters.
pub const MAX_EXPLANATION_CHARS: usize = 280;

/// Prompt asking for a short explanation and fix of `errors`.
pub fn build_prompt(language: &str, errors: &[String]) -> String {
    format!(
        "Simplify the following Kubernetes error message delimited by triple dashes, \
         written in {language}.\n\
         --- {errors} ---\n\
         Provide the most likely solution as short steps in no more than {max} characters. \
         Write the output in the following format:\n\
         Error: {{Explain error here}}\n\
         Solution: {{Step by step solution here}}",
        language = language,
        errors = errors.join(" "),
        max = MAX_EXPLANATION_CHARS,
    )
}
