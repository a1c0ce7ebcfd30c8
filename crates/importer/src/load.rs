use crate::progress::ImportProgress;
use anyhow::Result;
use city_core::model::City;
use city_core::CityStore;
use std::collections::HashMap;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// GeoNames tab-separated layout:
/// 0: geonameid, 1: name, 2: asciiname, 3: alternatenames,
/// 4: latitude, 5: longitude, 6: feature class, 7: feature code,
/// 8: country code, 9: cc2, 10: admin1, 11: admin2, 12: admin3, 13: admin4,
/// 14: population, 15: elevation, 16: dem, 17: timezone, 18: modification date
const MIN_FIELDS: usize = 15;

/// Load a GeoNames cities file into the store.
pub async fn run(
    database_url: &str,
    input: &Path,
    admin1: Option<&Path>,
    batch_size: usize,
) -> Result<()> {
    info!(input = ?input, database_url, "Starting city import");

    let admin1_names = match admin1 {
        Some(path) => {
            let names = load_admin1_names(path).await?;
            info!(subdivisions = names.len(), "Loaded admin1 names");
            names
        }
        None => HashMap::new(),
    };

    let store = CityStore::connect(database_url).await?;
    store.init_schema().await?;

    let file = File::open(input).await?;
    let mut lines = BufReader::new(file).lines();

    let mut progress = ImportProgress::spinner();
    let mut batch: Vec<City> = Vec::with_capacity(batch_size);
    let mut skipped = 0u64;

    while let Some(line) = lines.next_line().await? {
        match parse_city_line(&line, &admin1_names) {
            Some(city) => {
                batch.push(city);
                if batch.len() >= batch_size {
                    store.insert_batch(&batch).await?;
                    progress.inc(batch.len() as u64);
                    batch.clear();
                }
            }
            None => skipped += 1,
        }
    }

    if !batch.is_empty() {
        store.insert_batch(&batch).await?;
        progress.inc(batch.len() as u64);
    }

    progress.finish();

    if skipped > 0 {
        warn!(skipped, "Skipped unparseable or non-place rows");
    }
    info!(imported = progress.count(), "Import complete");

    Ok(())
}

/// Print row counts for an existing database.
pub async fn stats(database_url: &str) -> Result<()> {
    let store = CityStore::connect(database_url).await?;

    let cities = store.city_count().await?;
    let countries = store.distinct_countries().await?.len();
    let max_population = store.max_population().await?.unwrap_or(0);

    println!("Cities:         {cities}");
    println!("Countries:      {countries}");
    println!("Max population: {max_population}");

    Ok(())
}

/// Parse one GeoNames row into a City.
///
/// Returns None for short rows, rows with unparseable coordinates, and
/// rows whose feature class is not `P` (populated place).
fn parse_city_line(line: &str, admin1_names: &HashMap<String, String>) -> Option<City> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < MIN_FIELDS {
        return None;
    }

    if fields[6] != "P" {
        return None;
    }

    let geoname_id: i64 = fields[0].parse().ok()?;
    let latitude: f64 = fields[4].parse().ok()?;
    let longitude: f64 = fields[5].parse().ok()?;

    let name = fields[1].trim();
    let country_code = fields[8].trim();
    if name.is_empty() || country_code.len() != 2 {
        return None;
    }

    let state_code = match fields[10].trim() {
        "" => None,
        code => Some(code.to_string()),
    };
    let state_name = state_code
        .as_deref()
        .and_then(|code| admin1_names.get(&format!("{country_code}.{code}")))
        .cloned();

    // GeoNames uses 0 for unknown population.
    let population = match fields[14].parse::<i64>() {
        Ok(p) if p > 0 => Some(p),
        _ => None,
    };

    Some(City {
        geoname_id,
        name: name.to_string(),
        country_code: country_code.to_uppercase(),
        state_code,
        state_name,
        latitude,
        longitude,
        population,
    })
}

/// Load the admin1CodesASCII file: `CC.ADMIN1<tab>name<tab>ascii name...`.
async fn load_admin1_names(path: &Path) -> Result<HashMap<String, String>> {
    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).lines();

    let mut names = HashMap::new();
    while let Some(line) = lines.next_line().await? {
        let mut fields = line.split('\t');
        let (Some(key), Some(name)) = (fields.next(), fields.next()) else {
            continue;
        };
        if !key.is_empty() && !name.is_empty() {
            names.insert(key.to_string(), name.to_string());
        }
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PARIS_ROW: &str = "2988507\tParis\tParis\tLutece,Paname\t48.85341\t2.3488\tP\tPPLC\tFR\t\t11\t\t\t\t2138551\t\t42\tEurope/Paris\t2016-02-21";

    fn admin1() -> HashMap<String, String> {
        HashMap::from([("FR.11".to_string(), "Île-de-France".to_string())])
    }

    #[test]
    fn test_parse_city_row() {
        let city = parse_city_line(PARIS_ROW, &admin1()).unwrap();

        assert_eq!(city.geoname_id, 2988507);
        assert_eq!(city.name, "Paris");
        assert_eq!(city.country_code, "FR");
        assert_eq!(city.state_code.as_deref(), Some("11"));
        assert_eq!(city.state_name.as_deref(), Some("Île-de-France"));
        assert!((city.latitude - 48.85341).abs() < 1e-9);
        assert_eq!(city.population, Some(2_138_551));
    }

    #[test]
    fn test_parse_skips_non_place_rows() {
        // Feature class A (administrative division), not P.
        let row = PARIS_ROW.replace("\tP\tPPLC\t", "\tA\tADM1\t");
        assert!(parse_city_line(&row, &HashMap::new()).is_none());
    }

    #[test]
    fn test_parse_skips_short_and_malformed_rows() {
        assert!(parse_city_line("", &HashMap::new()).is_none());
        assert!(parse_city_line("1\tOnly\tThree", &HashMap::new()).is_none());

        let bad_lat = PARIS_ROW.replace("48.85341", "north");
        assert!(parse_city_line(&bad_lat, &HashMap::new()).is_none());
    }

    #[test]
    fn test_zero_population_becomes_none() {
        let row = PARIS_ROW.replace("\t2138551\t", "\t0\t");
        let city = parse_city_line(&row, &HashMap::new()).unwrap();
        assert_eq!(city.population, None);
    }

    #[test]
    fn test_missing_admin1_name_leaves_state_name_empty() {
        let city = parse_city_line(PARIS_ROW, &HashMap::new()).unwrap();
        assert_eq!(city.state_code.as_deref(), Some("11"));
        assert_eq!(city.state_name, None);
    }

    #[tokio::test]
    async fn test_run_imports_file() {
        let dir = tempfile::tempdir().unwrap();

        let input = dir.path().join("cities.txt");
        let mut f = std::fs::File::create(&input).unwrap();
        writeln!(f, "{PARIS_ROW}").unwrap();
        writeln!(f, "not a real row").unwrap();
        drop(f);

        let url = format!("sqlite://{}/cities.db?mode=rwc", dir.path().display());
        run(&url, &input, None, 100).await.unwrap();

        let store = CityStore::connect(&url).await.unwrap();
        assert_eq!(store.city_count().await.unwrap(), 1);
    }
}
