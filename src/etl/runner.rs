/// Runner Module
///
/// Executes one stage's statements in declaration order against an open
/// session, committing after each statement. The commit boundary is per
/// statement rather than per stage: everything up to and including the last
/// committed statement persists across a mid-stage failure, and re-running
/// the pipeline is the recovery mechanism.
use crate::db::Session;
use crate::error::EtlError;
use crate::etl::{Stage, Statement};

/// Run every statement of one stage, stopping at the first failure.
///
/// The first statement that fails aborts the stage; remaining statements are
/// not attempted, and the error carries the stage plus the zero-based index
/// of the failing statement. No retry happens at this layer.
pub async fn run_stage<S: Session>(
    session: &mut S,
    stage: Stage,
    statements: &[Statement],
) -> Result<(), EtlError> {
    for (index, statement) in statements.iter().enumerate() {
        tracing::info!("{} statement {}/{}: {}", stage, index + 1, statements.len(), statement.name);

        let rows = session
            .execute(&statement.sql)
            .await
            .map_err(|source| EtlError::Statement { stage, index, name: statement.name, source })?;

        session
            .commit()
            .await
            .map_err(|source| EtlError::Statement { stage, index, name: statement.name, source })?;

        tracing::debug!("committed {} ({} rows affected)", statement.name, rows);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fake::{Call, CallLog, FakeSession};

    fn statements(names: &[&'static str]) -> Vec<Statement> {
        names.iter().map(|n| Statement::new(n, format!("SELECT '{}'", n))).collect()
    }

    #[tokio::test]
    async fn test_statements_run_in_declaration_order() {
        let log = CallLog::new();
        let mut session = FakeSession::new(log.clone());
        let stage = statements(&["first", "second", "third"]);

        run_stage(&mut session, Stage::Load, &stage).await.unwrap();

        assert_eq!(
            log.calls(),
            vec![
                Call::Execute("SELECT 'first'".to_string()),
                Call::Commit,
                Call::Execute("SELECT 'second'".to_string()),
                Call::Commit,
                Call::Execute("SELECT 'third'".to_string()),
                Call::Commit,
            ]
        );
    }

    #[tokio::test]
    async fn test_fail_fast_skips_remaining_statements() {
        let log = CallLog::new();
        let mut session = FakeSession::new(log.clone()).fail_execute_at(1);
        let stage = statements(&["first", "second", "third"]);

        let err = run_stage(&mut session, Stage::Transform, &stage).await.unwrap_err();

        assert_eq!(err.failed_statement(), Some((Stage::Transform, 1)));
        // Only the first statement executed and committed.
        assert_eq!(log.executed(), vec!["SELECT 'first'".to_string()]);
        assert_eq!(log.commits(), 1);
    }

    #[tokio::test]
    async fn test_error_names_failing_statement() {
        let log = CallLog::new();
        let mut session = FakeSession::new(log).fail_execute_at(0);
        let stage = statements(&["only"]);

        let err = run_stage(&mut session, Stage::Load, &stage).await.unwrap_err();
        assert!(err.to_string().contains("only"));
        assert!(err.to_string().contains("load"));
    }

    #[tokio::test]
    async fn test_empty_stage_is_a_no_op() {
        let log = CallLog::new();
        let mut session = FakeSession::new(log.clone());

        run_stage(&mut session, Stage::Load, &[]).await.unwrap();
        assert!(log.calls().is_empty());
    }
}
