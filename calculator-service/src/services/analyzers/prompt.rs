//! Instructions sent alongside the canvas image.

use serde_json::{Map, Value};

const INSTRUCTIONS: &str = r#"The attached image is a hand-drawn canvas containing mathematical expressions, equations or small illustrated problems. Solve them.

Evaluate arithmetic with PEMDAS: Parentheses, Exponents, Multiplication and Division (left to right), Addition and Subtraction (left to right). For example 2 + 3 * 4 is 2 + 12 = 14, and (9 - 7) ^ 2 / 4 * 3 is 4 / 4 * 3 = 3.

The image contains exactly one of the following kinds of problem:
1. A simple expression such as 2 + 2 or 7 * 8 - 1. Answer with a one-element list: [{"expr": "2 + 2", "result": 4}].
2. A set of equations such as x^2 + 2x + 1 = 0 or 3y + 4x = 0 together with 5x^2 + 6y + 7 = 12. Solve for every unknown and answer with one object per variable: [{"expr": "x", "result": 2}, {"expr": "y", "result": 5}].
3. Variable assignments such as x = 4 or y = 5. Answer with one object per assignment and mark it: [{"expr": "x", "result": 4, "assign": true}].
4. A drawn word problem, for example cars colliding, a triangle with labelled sides or a bar chart. Read the drawing and its colours carefully and answer with one object: [{"expr": "<short description of the problem>", "result": <answer>}].
5. An abstract idea expressed as a drawing, such as a historical event or an emotion. Answer with one object: [{"expr": "<what the drawing shows>", "result": "<the concept>"}].

Known variables, already assigned by the user, are given below as JSON. When an expression uses one of them, substitute its value:
"#;

const OUTPUT_RULES: &str = r#"
Reply with a JSON array only, no prose and no code fences. Every element must be an object with the keys "expr" and "result"; include "assign": true only for variable assignments. Quote string values with double quotes."#;

/// Full prompt for one analysis request.
pub fn build_prompt(variables: &Map<String, Value>) -> String {
    let variables_json = Value::Object(variables.clone()).to_string();

    let mut prompt =
        String::with_capacity(INSTRUCTIONS.len() + variables_json.len() + OUTPUT_RULES.len());
    prompt.push_str(INSTRUCTIONS);
    prompt.push_str(&variables_json);
    prompt.push_str(OUTPUT_RULES);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn embeds_variables_as_json() {
        let variables = json!({"x": 4, "name": "ada"});
        let prompt = build_prompt(variables.as_object().unwrap());

        assert!(prompt.contains(r#""x":4"#));
        assert!(prompt.contains(r#""name":"ada""#));
    }

    #[test]
    fn empty_variables_render_as_empty_object() {
        let prompt = build_prompt(&Map::new());
        assert!(prompt.contains("below as JSON. When an expression uses one of them, substitute its value:\n{}"));
        assert!(prompt.ends_with("Quote string values with double quotes."));
    }
}
