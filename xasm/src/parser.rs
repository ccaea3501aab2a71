use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "orta.pest"]
pub struct OrtaParser;
