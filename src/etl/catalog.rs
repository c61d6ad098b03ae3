/// Catalog Module
///
/// The canonical, ordered statement lists for both pipeline stages. Storage
/// parameters are substituted into the COPY text once, at construction; the
/// statements themselves carry no runtime state and never exchange results
/// with each other outside the warehouse's committed tables.
use crate::config::StorageConfig;
use crate::etl::Statement;

/// The full statement catalog for one pipeline run.
///
/// Both lists are non-empty and iterate in declaration order. Every load
/// statement truncates its staging table before copying, and every transform
/// statement truncates its target before inserting, so re-running a failed
/// run converges to the same final state.
pub struct Catalog {
    load: Vec<Statement>,
    transform: Vec<Statement>,
}

impl Catalog {
    pub fn new(storage: &StorageConfig) -> Self {
        Self { load: load_statements(storage), transform: transform_statements() }
    }

    /// Bulk-copy statements, external storage into staging tables.
    pub fn load_statements(&self) -> &[Statement] {
        &self.load
    }

    /// Insert-select statements, staging tables into the star schema.
    pub fn transform_statements(&self) -> &[Statement] {
        &self.transform
    }
}

fn load_statements(storage: &StorageConfig) -> Vec<Statement> {
    vec![
        Statement::new(
            "copy_staging_events",
            format!(
                r#"
                TRUNCATE staging_events;
                COPY staging_events FROM '{log_data}'
                IAM_ROLE '{iam_role}'
                REGION '{region}'
                FORMAT AS JSON '{jsonpath}'
                TIMEFORMAT AS 'epochmillisecs';
                "#,
                log_data = storage.log_data,
                iam_role = storage.iam_role_arn,
                region = storage.region,
                jsonpath = storage.log_jsonpath,
            ),
        ),
        Statement::new(
            "copy_staging_songs",
            format!(
                r#"
                TRUNCATE staging_songs;
                COPY staging_songs FROM '{song_data}'
                IAM_ROLE '{iam_role}'
                REGION '{region}'
                FORMAT AS JSON 'auto';
                "#,
                song_data = storage.song_data,
                iam_role = storage.iam_role_arn,
                region = storage.region,
            ),
        ),
    ]
}

fn transform_statements() -> Vec<Statement> {
    vec![
        Statement::new(
            "insert_songplays",
            r#"
            TRUNCATE songplays;
            INSERT INTO songplays (start_time, user_id, level, song_id, artist_id,
                                   session_id, location, user_agent)
            SELECT e.ts, e.user_id, e.level, s.song_id, s.artist_id,
                   e.session_id, e.location, e.user_agent
            FROM staging_events e
            LEFT JOIN staging_songs s
              ON e.song = s.title AND e.artist = s.artist_name
            WHERE e.page = 'NextSong';
            "#
            .to_string(),
        ),
        Statement::new(
            "insert_users",
            r#"
            TRUNCATE users;
            INSERT INTO users (user_id, first_name, last_name, gender, level)
            SELECT DISTINCT user_id, first_name, last_name, gender, level
            FROM staging_events
            WHERE page = 'NextSong' AND user_id IS NOT NULL;
            "#
            .to_string(),
        ),
        Statement::new(
            "insert_songs",
            r#"
            TRUNCATE songs;
            INSERT INTO songs (song_id, title, artist_id, year, duration)
            SELECT DISTINCT song_id, title, artist_id, year, duration
            FROM staging_songs
            WHERE song_id IS NOT NULL;
            "#
            .to_string(),
        ),
        Statement::new(
            "insert_artists",
            r#"
            TRUNCATE artists;
            INSERT INTO artists (artist_id, name, location, latitude, longitude)
            SELECT DISTINCT artist_id, artist_name, artist_location,
                   artist_latitude, artist_longitude
            FROM staging_songs
            WHERE artist_id IS NOT NULL;
            "#
            .to_string(),
        ),
        Statement::new(
            "insert_time",
            r#"
            TRUNCATE time;
            INSERT INTO time (start_time, hour, day, week, month, year, weekday)
            SELECT DISTINCT ts,
                   EXTRACT(hour FROM ts), EXTRACT(day FROM ts),
                   EXTRACT(week FROM ts), EXTRACT(month FROM ts),
                   EXTRACT(year FROM ts), EXTRACT(dow FROM ts)
            FROM staging_events
            WHERE page = 'NextSong' AND ts IS NOT NULL;
            "#
            .to_string(),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> StorageConfig {
        StorageConfig {
            log_data: "s3://udacity-dend/log_data".to_string(),
            log_jsonpath: "s3://udacity-dend/log_json_path.json".to_string(),
            song_data: "s3://udacity-dend/song_data".to_string(),
            iam_role_arn: "arn:aws:iam::123456789012:role/dwhRole".to_string(),
            region: "us-west-2".to_string(),
        }
    }

    #[test]
    fn test_both_stages_non_empty() {
        let catalog = Catalog::new(&storage());
        assert!(!catalog.load_statements().is_empty());
        assert!(!catalog.transform_statements().is_empty());
    }

    #[test]
    fn test_declaration_order_is_stable() {
        let catalog = Catalog::new(&storage());

        let load_names: Vec<_> = catalog.load_statements().iter().map(|s| s.name).collect();
        assert_eq!(load_names, vec!["copy_staging_events", "copy_staging_songs"]);

        let transform_names: Vec<_> = catalog.transform_statements().iter().map(|s| s.name).collect();
        assert_eq!(
            transform_names,
            vec!["insert_songplays", "insert_users", "insert_songs", "insert_artists", "insert_time"]
        );
    }

    #[test]
    fn test_storage_parameters_substituted() {
        let catalog = Catalog::new(&storage());
        let events = &catalog.load_statements()[0].sql;

        assert!(events.contains("s3://udacity-dend/log_data"));
        assert!(events.contains("arn:aws:iam::123456789012:role/dwhRole"));
        assert!(events.contains("us-west-2"));
        assert!(events.contains("s3://udacity-dend/log_json_path.json"));

        let songs = &catalog.load_statements()[1].sql;
        assert!(songs.contains("s3://udacity-dend/song_data"));
    }

    #[test]
    fn test_loads_truncate_before_copying() {
        // Re-running a failed run must converge, so every COPY is preceded
        // by a TRUNCATE of its staging table.
        let catalog = Catalog::new(&storage());

        for statement in catalog.load_statements() {
            let truncate = statement.sql.find("TRUNCATE").expect("load statement should truncate");
            let copy = statement.sql.find("COPY").expect("load statement should copy");
            assert!(truncate < copy, "{} must truncate before copying", statement.name);
        }
    }

    #[test]
    fn test_transforms_truncate_before_inserting() {
        let catalog = Catalog::new(&storage());

        for statement in catalog.transform_statements() {
            let truncate = statement.sql.find("TRUNCATE").expect("transform statement should truncate");
            let insert = statement.sql.find("INSERT").expect("transform statement should insert");
            assert!(truncate < insert, "{} must truncate before inserting", statement.name);
        }
    }

    #[test]
    fn test_transforms_read_only_staging_tables() {
        // Transform statements depend on committed staging state, never on
        // in-memory results of prior statements.
        let catalog = Catalog::new(&storage());

        for statement in catalog.transform_statements() {
            assert!(statement.sql.contains("staging_"), "{} must select from a staging table", statement.name);
        }
    }
}
