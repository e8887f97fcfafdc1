//! Great-circle math for the tours-within and distances endpoints.

use std::str::FromStr;

pub const EARTH_RADIUS_MILES: f64 = 3963.2;
pub const EARTH_RADIUS_KM: f64 = 6378.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Miles,
    Kilometers,
}

impl Unit {
    #[must_use]
    pub const fn earth_radius(self) -> f64 {
        match self {
            Self::Miles => EARTH_RADIUS_MILES,
            Self::Kilometers => EARTH_RADIUS_KM,
        }
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mi" => Ok(Self::Miles),
            "km" => Ok(Self::Kilometers),
            other => Err(format!("Unit must be 'mi' or 'km' (got '{other}')")),
        }
    }
}

/// Parses a `lat,lng` path segment.
pub fn parse_latlong(s: &str) -> Result<(f64, f64), String> {
    let err = || format!("Provide latitude and longitude as 'lat,lng' (got '{s}')");
    let (lat, lng) = s.split_once(',').ok_or_else(err)?;
    let lat: f64 = lat.trim().parse().map_err(|_| err())?;
    let lng: f64 = lng.trim().parse().map_err(|_| err())?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(err());
    }
    Ok((lat, lng))
}

/// Haversine distance between two points, in the given unit.
#[must_use]
pub fn distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64, unit: Unit) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    unit.earth_radius() * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_parsing() {
        assert_eq!(Unit::from_str("mi").unwrap(), Unit::Miles);
        assert_eq!(Unit::from_str("km").unwrap(), Unit::Kilometers);
        assert!(Unit::from_str("leagues").is_err());
    }

    #[test]
    fn latlong_parsing() {
        assert_eq!(parse_latlong("34.1,-118.1").unwrap(), (34.1, -118.1));
        assert!(parse_latlong("34.1").is_err());
        assert!(parse_latlong("abc,def").is_err());
        assert!(parse_latlong("95.0,10.0").is_err());
    }

    #[test]
    fn known_distance_is_close() {
        // Los Angeles to San Francisco, roughly 350 miles
        let d = distance(34.0522, -118.2437, 37.7749, -122.4194, Unit::Miles);
        assert!((330.0..370.0).contains(&d), "got {d}");

        let zero = distance(10.0, 10.0, 10.0, 10.0, Unit::Kilometers);
        assert!(zero.abs() < 1e-9);
    }
}
