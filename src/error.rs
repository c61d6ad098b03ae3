/// Error Module
///
/// The pipeline error taxonomy. Statement and connection errors are fatal to
/// a Run and propagate unchanged to the binary boundary; session release
/// errors are logged where they occur and never mask the Run's real outcome.
use crate::etl::Stage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EtlError {
    /// The warehouse session could not be opened. Not retried.
    #[error("failed to open warehouse session")]
    Connection(#[source] sqlx::Error),

    /// A single statement failed. Aborts the stage and the Run; the index is
    /// zero-based within the stage so an operator can find the statement.
    #[error("{stage} statement {index} ({name}) failed")]
    Statement {
        stage: Stage,
        index: usize,
        name: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl EtlError {
    /// The (stage, index) position of the failing statement, if this error
    /// came from statement execution.
    pub fn failed_statement(&self) -> Option<(Stage, usize)> {
        match self {
            EtlError::Statement { stage, index, .. } => Some((*stage, *index)),
            EtlError::Connection(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_error_names_stage_and_index() {
        let err = EtlError::Statement {
            stage: Stage::Load,
            index: 1,
            name: "copy_events",
            source: sqlx::Error::Protocol("simulated failure".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("load"));
        assert!(msg.contains('1'));
        assert!(msg.contains("copy_events"));
        assert_eq!(err.failed_statement(), Some((Stage::Load, 1)));
    }

    #[test]
    fn test_connection_error_has_no_statement_position() {
        let err = EtlError::Connection(sqlx::Error::Protocol("refused".into()));
        assert_eq!(err.failed_statement(), None);
    }
}
