use serde::{Deserialize, Serialize};

/// Smallest lat/lng rectangle containing a set of coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBounds {
    pub fn from_point(lat: f64, lng: f64) -> Self {
        Self {
            south: lat,
            west: lng,
            north: lat,
            east: lng,
        }
    }

    pub fn extend(&mut self, lat: f64, lng: f64) {
        self.south = self.south.min(lat);
        self.north = self.north.max(lat);
        self.west = self.west.min(lng);
        self.east = self.east.max(lng);
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.south + self.north) / 2.0, (self.west + self.east) / 2.0)
    }
}

/// Running accumulator; empty until the first point arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundsAccumulator(Option<GeoBounds>);

impl BoundsAccumulator {
    pub fn add(&mut self, lat: f64, lng: f64) {
        match &mut self.0 {
            Some(bounds) => bounds.extend(lat, lng),
            None => self.0 = Some(GeoBounds::from_point(lat, lng)),
        }
    }

    pub fn bounds(&self) -> Option<GeoBounds> {
        self.0
    }
}
