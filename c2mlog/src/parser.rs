use pest_derive::Parser;

/// Pest parser for the C subset, generated from `grammar.pest`.
#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct CParser;
