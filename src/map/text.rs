use std::{collections::BTreeMap, fmt::Write};

use super::MapWidget;
use crate::geo::{Bounds, Coordinate};

/// A map drawn as text, for terminals.
pub struct TextMap {
    center: Coordinate,
    level: u8,
    bounds: Option<Bounds>,
    markers: BTreeMap<usize, (Coordinate, String)>,
    next: usize,
}

impl TextMap {
    pub fn new(center: Coordinate, level: u8) -> Self {
        Self {
            center,
            level,
            bounds: None,
            markers: BTreeMap::new(),
            next: 1,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "🗺️ 지도 중심 {} · 레벨 {}", self.center, self.level);
        if let Some(bounds) = &self.bounds {
            let _ = writeln!(
                out,
                "   표시 범위 {} ~ {}",
                bounds.south_west, bounds.north_east
            );
        }
        if self.markers.is_empty() {
            let _ = writeln!(out, "   표시할 마커가 없습니다.");
        }
        for (handle, (position, title)) in &self.markers {
            let _ = writeln!(out, "   [{}] 📍 {} {}", handle, title, position);
        }
        out
    }
}

impl MapWidget for TextMap {
    type Marker = usize;

    fn pan_to(&mut self, center: Coordinate) {
        self.center = center;
    }

    fn add_marker(&mut self, position: Coordinate, title: &str) -> usize {
        let handle = self.next;
        self.next += 1;
        self.markers.insert(handle, (position, title.to_string()));
        handle
    }

    fn remove_marker(&mut self, marker: usize) {
        self.markers.remove(&marker);
        if self.markers.is_empty() {
            self.bounds = None;
        }
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        self.bounds = Some(bounds);
        self.center = Coordinate::new(
            (bounds.south_west.latitude + bounds.north_east.latitude) / 2.0,
            (bounds.south_west.longitude + bounds.north_east.longitude) / 2.0,
        );
    }
}
