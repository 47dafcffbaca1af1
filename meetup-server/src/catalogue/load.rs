//! JSON loading for the catalogue and the static distance table.

use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{Stop, StopId, UnknownStop};

use super::Catalogue;
use super::error::CatalogueError;

/// One stop as it appears in the catalogue file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopRecord {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl Catalogue {
    /// Parse a catalogue from a JSON array of `StopRecord`s.
    pub fn from_json_reader(reader: impl Read) -> Result<Self, CatalogueError> {
        let records: Vec<StopRecord> = serde_json::from_reader(reader)?;
        let stops = records
            .into_iter()
            .map(|r| {
                let id = StopId::parse(&r.id)?;
                Ok(Stop::new(id, r.name, r.lat, r.lon)?)
            })
            .collect::<Result<Vec<_>, CatalogueError>>()?;
        Self::from_stops(stops)
    }

    /// Load a catalogue from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CatalogueError> {
        let file = std::fs::File::open(path)?;
        Self::from_json_reader(std::io::BufReader::new(file))
    }
}

/// One pre-computed distance between an ordered pair of stops.
///
/// `departure` ties `transit_minutes` to a scheduling time. Without it the
/// transit value is a time-agnostic baseline, good enough for pre-filtering
/// but never treated as authoritative for a specific meeting time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticDistanceRow {
    pub from: StopId,
    pub to: StopId,
    #[serde(default)]
    pub geo_km: Option<f64>,
    #[serde(default)]
    pub transit_minutes: Option<f64>,
    #[serde(default)]
    pub departure: Option<NaiveDateTime>,
}

impl StaticDistanceRow {
    fn validate(&self, catalogue: &Catalogue) -> Result<(), CatalogueError> {
        for id in [&self.from, &self.to] {
            if !catalogue.contains(id) {
                return Err(UnknownStop(id.clone()).into());
            }
        }
        for value in [self.geo_km, self.transit_minutes].into_iter().flatten() {
            if !value.is_finite() || value < 0.0 {
                return Err(CatalogueError::InvalidDistance {
                    from: self.from.clone(),
                    to: self.to.clone(),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Parse static distance rows, checking them against the catalogue.
pub fn read_static_distances(
    reader: impl Read,
    catalogue: &Catalogue,
) -> Result<Vec<StaticDistanceRow>, CatalogueError> {
    let rows: Vec<StaticDistanceRow> = serde_json::from_reader(reader)?;
    for row in &rows {
        row.validate(catalogue)?;
    }
    Ok(rows)
}

/// Load static distance rows from a JSON file.
pub fn load_static_distances(
    path: impl AsRef<Path>,
    catalogue: &Catalogue,
) -> Result<Vec<StaticDistanceRow>, CatalogueError> {
    let file = std::fs::File::open(path)?;
    read_static_distances(std::io::BufReader::new(file), catalogue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CATALOGUE_JSON: &str = r#"[
        {"id": "Anděl", "name": "Anděl", "lat": 50.0706, "lon": 14.4036},
        {"id": "Flora", "name": "Flora", "lat": 50.0781, "lon": 14.4623},
        {"id": "Muzeum", "name": "Muzeum", "lat": 50.0795, "lon": 14.4306}
    ]"#;

    #[test]
    fn parse_catalogue() {
        let catalogue = Catalogue::from_json_reader(CATALOGUE_JSON.as_bytes()).unwrap();
        assert_eq!(catalogue.len(), 3);
        let flora = catalogue.get(&StopId::parse("Flora").unwrap()).unwrap();
        assert_eq!(flora.lat(), 50.0781);
    }

    #[test]
    fn reject_bad_stop_id() {
        let json = r#"[{"id": "  ", "name": "Blank", "lat": 0.0, "lon": 0.0}]"#;
        let result = Catalogue::from_json_reader(json.as_bytes());
        assert!(matches!(result, Err(CatalogueError::InvalidStopId(_))));
    }

    #[test]
    fn reject_bad_coordinates() {
        let json = r#"[{"id": "X", "name": "X", "lat": 123.0, "lon": 0.0}]"#;
        let result = Catalogue::from_json_reader(json.as_bytes());
        assert!(matches!(result, Err(CatalogueError::InvalidCoordinates(_))));
    }

    #[test]
    fn reject_malformed_json() {
        let result = Catalogue::from_json_reader("not json".as_bytes());
        assert!(matches!(result, Err(CatalogueError::Json(_))));
    }

    #[test]
    fn load_catalogue_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CATALOGUE_JSON.as_bytes()).unwrap();

        let catalogue = Catalogue::load_json(file.path()).unwrap();
        assert_eq!(catalogue.len(), 3);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Catalogue::load_json(dir.path().join("missing.json"));
        assert!(matches!(result, Err(CatalogueError::Io(_))));
    }

    #[test]
    fn parse_static_distances() {
        let catalogue = Catalogue::from_json_reader(CATALOGUE_JSON.as_bytes()).unwrap();
        let json = r#"[
            {"from": "Anděl", "to": "Flora", "geo_km": 4.3, "transit_minutes": 14},
            {"from": "Flora", "to": "Anděl", "transit_minutes": 16,
             "departure": "2024-03-15T20:00:00"}
        ]"#;

        let rows = read_static_distances(json.as_bytes(), &catalogue).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].geo_km, Some(4.3));
        assert!(rows[0].departure.is_none());
        assert!(rows[1].departure.is_some());
        assert!(rows[1].geo_km.is_none());
    }

    #[test]
    fn static_distances_reject_unknown_stops() {
        let catalogue = Catalogue::from_json_reader(CATALOGUE_JSON.as_bytes()).unwrap();
        let json = r#"[{"from": "Anděl", "to": "Nowhere", "geo_km": 1.0}]"#;
        let result = read_static_distances(json.as_bytes(), &catalogue);
        assert!(matches!(result, Err(CatalogueError::UnknownStop(_))));
    }

    #[test]
    fn static_distances_reject_negative_values() {
        let catalogue = Catalogue::from_json_reader(CATALOGUE_JSON.as_bytes()).unwrap();
        let json = r#"[{"from": "Anděl", "to": "Flora", "transit_minutes": -3}]"#;
        let result = read_static_distances(json.as_bytes(), &catalogue);
        assert!(matches!(result, Err(CatalogueError::InvalidDistance { .. })));
    }
}
