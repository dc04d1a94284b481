use std::{fmt::Display, future::Future};

use serde::{Deserialize, Serialize};

/// A WGS84 point. `0.0` on either axis means "not chosen yet".
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    // 강남역
    pub const GANGNAM_STATION: Coordinate = Coordinate::new(37.498095, 127.027610);
    pub const DEFAULT_CENTER: Coordinate = Coordinate::new(37.5, 127.03);

    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_set(&self) -> bool {
        let valid = |v: f64| v.is_finite() && v != 0.0;
        valid(self.latitude) && valid(self.longitude)
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Bounds {
    pub south_west: Coordinate,
    pub north_east: Coordinate,
}

impl Bounds {
    fn around(point: Coordinate) -> Self {
        Self {
            south_west: point,
            north_east: point,
        }
    }

    fn extend(&mut self, point: Coordinate) {
        self.south_west.latitude = self.south_west.latitude.min(point.latitude);
        self.south_west.longitude = self.south_west.longitude.min(point.longitude);
        self.north_east.latitude = self.north_east.latitude.max(point.latitude);
        self.north_east.longitude = self.north_east.longitude.max(point.longitude);
    }

    pub fn from_points(points: impl IntoIterator<Item = Coordinate>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::around(first), |mut bounds, point| {
            bounds.extend(point);
            bounds
        }))
    }
}

/// Address components resolved from a coordinate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Region {
    pub city: String,
    pub district: String,
    pub neighborhood: String,
    pub address_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub name: String,
    pub address_name: String,
    pub position: Coordinate,
}

pub trait Geocoder {
    type Error: Display;

    /// Resolve a human readable address, `None` when nothing matched.
    fn geocode(&self, address: &str)
        -> impl Future<Output = Result<Option<Coordinate>, Self::Error>>;

    fn reverse(&self, position: Coordinate)
        -> impl Future<Output = Result<Option<Region>, Self::Error>>;
}

pub trait PlaceSearch {
    type Error: Display;

    fn search_places(&self, keyword: &str) -> impl Future<Output = Result<Vec<Place>, Self::Error>>;
}
