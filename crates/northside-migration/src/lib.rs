pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_users;
mod m20240101_000002_create_events;
mod m20240101_000003_create_event_members;
mod m20240101_000004_create_voted_songs;
mod m20240101_000005_create_favourite_songs;
mod m20240101_000006_create_song_reviews;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_users::Migration),
            Box::new(m20240101_000002_create_events::Migration),
            Box::new(m20240101_000003_create_event_members::Migration),
            Box::new(m20240101_000004_create_voted_songs::Migration),
            Box::new(m20240101_000005_create_favourite_songs::Migration),
            Box::new(m20240101_000006_create_song_reviews::Migration),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_ordered_and_unique() {
        let names: Vec<String> = Migrator::migrations()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        assert_eq!(names.len(), 6);
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(names, sorted);
    }
}
