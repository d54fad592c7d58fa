pub mod llm;
pub mod tokenizer;
