//! Rule Compilation with exclusion-and-rebuild
//!
//! Compiles every include statement of every namespace. A statement whose
//! file cannot be read or compiled is excluded and the whole set is rebuilt
//! from scratch without it, so a single broken rule file never takes the
//! rest of the rule set down with it.

use std::collections::HashSet;
use std::fs;

use super::index::{parse_index, IncludeStatement};
use super::types::{RuleError, RuleSourceLayout, SkippedStatement};

pub struct CompileOutcome {
    pub rules: yara_x::Rules,
    pub skipped: Vec<SkippedStatement>,
    /// Include statements that made it into the rule set
    pub compiled: usize,
}

pub fn compile_rules(layout: &RuleSourceLayout) -> Result<CompileOutcome, RuleError> {
    let statements = parse_index(layout)?;
    let mut excluded: HashSet<usize> = HashSet::new();
    let mut skipped = Vec::new();

    'rebuild: loop {
        let mut compiler = yara_x::Compiler::new();
        let mut current_namespace: Option<&str> = None;

        for (i, statement) in statements.iter().enumerate() {
            if excluded.contains(&i) {
                continue;
            }

            if current_namespace != Some(statement.namespace.as_str()) {
                compiler.new_namespace(&statement.namespace);
                current_namespace = Some(statement.namespace.as_str());
            }

            let added = fs::read_to_string(&statement.path)
                .map_err(|e| e.to_string())
                .and_then(|source| compiler.add_source(source.as_str()).map(|_| ()).map_err(|e| e.to_string()));

            if let Err(reason) = added {
                skipped.push(exclude(statement, reason));
                excluded.insert(i);
                continue 'rebuild;
            }
        }

        let compiled = statements.len() - excluded.len();
        log::info!(
            "[Rules] Compiled {} rule files ({} skipped)",
            compiled,
            skipped.len()
        );

        return Ok(CompileOutcome {
            rules: compiler.build(),
            skipped,
            compiled,
        });
    }
}

fn exclude(statement: &IncludeStatement, reason: String) -> SkippedStatement {
    log::warn!(
        "[Rules] Excluding {} from namespace {}: {}",
        statement.statement,
        statement.namespace,
        reason
    );

    SkippedStatement {
        namespace: statement.namespace.clone(),
        statement: statement.statement.clone(),
        reason,
    }
}
