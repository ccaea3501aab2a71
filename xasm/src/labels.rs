use std::collections::HashMap;

use pest::iterators::{Pair, Pairs};

use ortavm::program::mangle_local;

use crate::error::ParseError;
use crate::parser::Rule;

pub type LabelMap = HashMap<String, usize>;

pub fn label_name<'i>(pair: &Pair<'i, Rule>) -> &'i str {
    pair.clone().into_inner().next().unwrap().as_str()
}

/// First pass: records every label with the instruction index it will pin.
/// A declaration occupies one slot itself (the `nop` emitted in the second
/// pass), so the counter advances for labels and instructions alike.
pub fn collect_labels(statements: Pairs<Rule>) -> Result<LabelMap, ParseError> {
    let mut labels = LabelMap::new();
    let mut context: Option<String> = None;
    let mut index = 0usize;

    for pair in statements {
        match pair.as_rule() {
            Rule::label_decl => {
                let name = label_name(&pair);
                let resolved = if name.starts_with('.') {
                    mangle_local(context.as_deref(), name)
                } else {
                    context = Some(name.to_owned());
                    name.to_owned()
                };
                let line = pair.as_span().start_pos().line_col().0;
                if labels.insert(resolved.clone(), index).is_some() {
                    return Err(ParseError::DuplicateLabel {
                        name: resolved,
                        line,
                    });
                }
                index += 1;
            }
            Rule::instruction => index += 1,
            _ => {}
        }
    }

    Ok(labels)
}
