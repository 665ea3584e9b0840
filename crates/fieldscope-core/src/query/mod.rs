pub mod context;
pub mod expand;
pub mod extract;
pub mod guards;
pub mod keywords;
pub mod relevance;
pub mod scoring;
pub mod tokenizer;
