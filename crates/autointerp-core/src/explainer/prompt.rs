//! Prompt templates.
//!
//! Pure functions only: identical inputs always produce identical messages.

use crate::providers::llm::Message;

/// Prompt variant selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromptFlags {
    /// Ask for step-by-step analysis before the explanation.
    pub cot: bool,
    /// Examples are followed by `Activations:` lines.
    pub activations: bool,
    /// A `Top_logits:` hint follows the examples.
    pub logits: bool,
}

const SYSTEM_INTRO: &str = "You are a meticulous AI researcher investigating a single neuron-like \
feature inside a language model. Your task is to read text examples in which the feature fires and \
write a short explanation of what the feature detects.";

const SYSTEM_MARKUP: &str = "In each example, the tokens where the feature fires strongly are \
wrapped in delimiters <<like this>>. Consecutive strongly-firing tokens share one pair of \
delimiters <<just like this>>.";

const SYSTEM_ACTIVATIONS: &str = "After each example you are given an Activations line listing \
the selected tokens with their strength on a 0 to 10 scale, for example (\"token\" : 7).";

const SYSTEM_LOGITS: &str = "You are also given Top_logits: the tokens this feature most \
increases in the model's next-token prediction. Use them as a hint about what the feature \
does, but rely on the examples when they disagree.";

const SYSTEM_GUIDELINES: &str = "Guidelines:
- Describe the common pattern concisely; do not list individual examples.
- If some examples are uninformative, ignore them.
- Do not mention the << >> delimiters in your explanation.
- Do not give several alternative explanations.";

const SYSTEM_COT: &str = "Before answering, reason in three steps:
Step 1. List the delimited tokens and the context around them.
Step 2. Note what the delimited tokens have in common, and what the surrounding text has in common.
Step 3. Form a hypothesis and check it against every example.";

const SYSTEM_FORMAT: &str =
    "The last line of your response must be the explanation, formatted as:\n[EXPLANATION]: <your explanation>";

const FEW_SHOT_EXAMPLES: [&str; 3] = [
    "Example 1: and he was <<over the moon>> to find",
    "Example 2: we'll be laughing <<till the cows come home>>! Pro",
    "Example 3: thought Scotland was boring, but really there's more <<than meets the eye>>! I'd",
];

const FEW_SHOT_ACTIVATIONS: [&str; 3] = [
    "Activations: (\"over\" : 5), (\" the\" : 6), (\" moon\" : 9)",
    "Activations: (\"till\" : 5), (\" the\" : 5), (\" cows\" : 8), (\" come\" : 8), (\" home\" : 8)",
    "Activations: (\"than\" : 5), (\" meets\" : 7), (\" the\" : 6), (\" eye\" : 8)",
];

const FEW_SHOT_LOGITS: [&str; 4] = ["elling", "ensible", "eful", "idly"];

const FEW_SHOT_COT: &str = "Step 1.
The delimited tokens are \"over the moon\", \"till the cows come home\" and \"than meets the eye\".
The surrounding text is informal and emotional.

Step 2.
Every delimited span is an idiom or common figurative phrase.
The strongest tokens are the final words of each idiom.

Step 3.
All examples fit: the feature fires on the words of common idioms, most strongly on their final words.
";

const FEW_SHOT_EXPLANATION: &str =
    "[EXPLANATION]: Common idioms in text conveying positive sentiment.";

/// Build the system prompt for one flag combination.
pub fn system_prompt(flags: PromptFlags) -> String {
    let mut sections = vec![SYSTEM_INTRO, SYSTEM_MARKUP];
    if flags.activations {
        sections.push(SYSTEM_ACTIVATIONS);
    }
    if flags.logits {
        sections.push(SYSTEM_LOGITS);
    }
    sections.push(SYSTEM_GUIDELINES);
    if flags.cot {
        sections.push(SYSTEM_COT);
    }
    sections.push(SYSTEM_FORMAT);
    sections.join("\n\n")
}

/// Render a top-logits hint line.
pub fn render_top_logits<S: AsRef<str>>(top_logits: &[S]) -> String {
    let quoted: Vec<String> = top_logits
        .iter()
        .map(|t| format!("{:?}", t.as_ref()))
        .collect();
    format!("Top_logits: [{}]", quoted.join(", "))
}

fn user_block(examples: &str, top_logits: Option<String>) -> String {
    let mut block = format!("Examples:\n\n{examples}\n");
    if let Some(top_logits) = top_logits {
        block.push('\n');
        block.push_str(&top_logits);
        block.push('\n');
    }
    block
}

fn few_shot_examples(flags: PromptFlags) -> String {
    let mut lines = Vec::new();
    for (example, activations) in FEW_SHOT_EXAMPLES.iter().zip(FEW_SHOT_ACTIVATIONS) {
        lines.push(*example);
        if flags.activations {
            lines.push(activations);
        }
    }
    lines.join("\n")
}

fn few_shot_answer(flags: PromptFlags) -> String {
    if flags.cot {
        format!("{FEW_SHOT_COT}\n{FEW_SHOT_EXPLANATION}")
    } else {
        FEW_SHOT_EXPLANATION.to_string()
    }
}

/// Assemble the messages for one request.
///
/// `examples` is the newline-joined highlighted (and optionally annotated)
/// examples block. The top-logits hint is only rendered when `flags.logits`
/// is set and `top_logits` is present. The final message is always the user
/// turn carrying `examples`.
pub fn build_prompt(
    examples: &str,
    flags: PromptFlags,
    top_logits: Option<&[String]>,
) -> Vec<Message> {
    let few_shot_logits = flags.logits.then(|| render_top_logits(&FEW_SHOT_LOGITS));
    let logits = top_logits.filter(|_| flags.logits).map(render_top_logits);

    vec![
        Message::system(system_prompt(flags)),
        Message::user(user_block(&few_shot_examples(flags), few_shot_logits)),
        Message::assistant(few_shot_answer(flags)),
        Message::user(user_block(examples, logits)),
    ]
}
