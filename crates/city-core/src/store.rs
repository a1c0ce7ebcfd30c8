use crate::model::{City, StateRecord};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

/// Optional equality filters applied alongside the name pre-filter.
#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    pub country_code: Option<String>,
    pub state_code: Option<String>,
}

/// Access to the city reference table.
///
/// The importer writes it once; the API only reads. Name matching here is
/// the cheap pre-filter (case-insensitive substring); real ranking happens
/// in process after the fetch.
#[derive(Clone)]
pub struct CityStore {
    pool: SqlitePool,
}

impl CityStore {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new().connect(database_url).await?;

        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the cities table and its lookup indexes.
    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS cities (
                geoname_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                country_code TEXT NOT NULL,
                state_code TEXT,
                state_name TEXT,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                population INTEGER
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_cities_name ON cities (name COLLATE NOCASE)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_cities_country ON cities (country_code)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_cities_population ON cities (population)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert a batch of cities inside one transaction.
    ///
    /// `INSERT OR REPLACE` keeps reruns of the importer idempotent on
    /// `geoname_id`.
    pub async fn insert_batch(&self, cities: &[City]) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        for city in cities {
            sqlx::query(
                "INSERT OR REPLACE INTO cities (
                    geoname_id, name, country_code, state_code, state_name,
                    latitude, longitude, population
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(city.geoname_id)
            .bind(&city.name)
            .bind(&city.country_code)
            .bind(&city.state_code)
            .bind(&city.state_name)
            .bind(city.latitude)
            .bind(city.longitude)
            .bind(city.population)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }

    /// Candidate rows whose name contains the query, case-insensitively.
    ///
    /// Capped at `cap` rows in a deterministic order (population
    /// descending, then geoname_id) so scoring over the fetched set is
    /// reproducible regardless of the requested page.
    pub async fn search_candidates(
        &self,
        query: &str,
        filter: &CandidateFilter,
        cap: usize,
    ) -> Result<Vec<City>, sqlx::Error> {
        let sql = format!(
            "SELECT geoname_id, name, country_code, state_code, state_name,
                    latitude, longitude, population
             FROM cities WHERE {}
             ORDER BY population DESC, geoname_id ASC
             LIMIT ?",
            Self::match_clause(filter),
        );

        let mut q = sqlx::query(&sql).bind(like_pattern(query));
        if let Some(cc) = &filter.country_code {
            q = q.bind(cc);
        }
        if let Some(sc) = &filter.state_code {
            q = q.bind(sc);
        }

        let rows = q.bind(cap as i64).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_city).collect()
    }

    /// Total number of rows matching the filter, independent of the cap.
    pub async fn count_matches(
        &self,
        query: &str,
        filter: &CandidateFilter,
    ) -> Result<i64, sqlx::Error> {
        let sql = format!(
            "SELECT COUNT(*) as count FROM cities WHERE {}",
            Self::match_clause(filter),
        );

        let mut q = sqlx::query(&sql).bind(like_pattern(query));
        if let Some(cc) = &filter.country_code {
            q = q.bind(cc);
        }
        if let Some(sc) = &filter.state_code {
            q = q.bind(sc);
        }

        let row = q.fetch_one(&self.pool).await?;
        row.try_get("count")
    }

    fn match_clause(filter: &CandidateFilter) -> String {
        let mut clause = String::from("name LIKE ? ESCAPE '\\'");
        if filter.country_code.is_some() {
            clause.push_str(" AND country_code = ?");
        }
        if filter.state_code.is_some() {
            clause.push_str(" AND state_code = ?");
        }
        clause
    }

    pub async fn distinct_countries(&self) -> Result<Vec<String>, sqlx::Error> {
        let rows =
            sqlx::query("SELECT DISTINCT country_code FROM cities ORDER BY country_code")
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(|row| row.try_get("country_code")).collect()
    }

    /// Every `(country_code, state)` pair with a known subdivision.
    pub async fn all_states(&self) -> Result<Vec<(String, StateRecord)>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT DISTINCT country_code, state_code, state_name
             FROM cities WHERE state_code IS NOT NULL
             ORDER BY country_code, state_code",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok((
                    row.try_get("country_code")?,
                    StateRecord {
                        code: row.try_get("state_code")?,
                        name: row
                            .try_get::<Option<String>, _>("state_name")?
                            .unwrap_or_default(),
                    },
                ))
            })
            .collect()
    }

    pub async fn states_for_country(
        &self,
        country_code: &str,
    ) -> Result<Vec<StateRecord>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT DISTINCT state_code, state_name
             FROM cities WHERE country_code = ? AND state_code IS NOT NULL
             ORDER BY state_code",
        )
        .bind(country_code)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(StateRecord {
                    code: row.try_get("state_code")?,
                    name: row
                        .try_get::<Option<String>, _>("state_name")?
                        .unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Largest stored population, scanned once at startup for the
    /// normalizer's reference maximum.
    pub async fn max_population(&self) -> Result<Option<i64>, sqlx::Error> {
        let row = sqlx::query("SELECT MAX(population) as max_population FROM cities")
            .fetch_one(&self.pool)
            .await?;
        row.try_get("max_population")
    }

    pub async fn city_count(&self) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM cities")
            .fetch_one(&self.pool)
            .await?;
        row.try_get("count")
    }
}

/// Substring pattern with LIKE metacharacters escaped, so a query
/// containing `%` or `_` matches literally.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn row_to_city(row: &SqliteRow) -> Result<City, sqlx::Error> {
    Ok(City {
        geoname_id: row.try_get("geoname_id")?,
        name: row.try_get("name")?,
        country_code: row.try_get("country_code")?,
        state_code: row.try_get("state_code")?,
        state_name: row.try_get("state_name")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        population: row.try_get("population")?,
    })
}
