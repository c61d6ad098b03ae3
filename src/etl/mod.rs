/// ETL Module
///
/// This module holds the two-stage batch pipeline vocabulary:
/// - Catalog: the ordered load and transform statement lists
/// - Runner: sequential execution with a commit after every statement
pub mod catalog;
pub mod runner;

/// The two pipeline stages, in execution order.
///
/// Every load statement commits before the first transform statement runs,
/// because the transform stage reads the staging tables the load stage fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Transform,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Load => "load",
            Stage::Transform => "transform",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single unit of work: one SQL text with a fixed position in its stage.
///
/// Statements are read-only configuration. Order is significant; later
/// statements may depend on earlier ones having committed.
#[derive(Debug, Clone)]
pub struct Statement {
    pub name: &'static str,
    pub sql: String,
}

impl Statement {
    pub fn new(name: &'static str, sql: String) -> Self {
        Self { name, sql }
    }
}
