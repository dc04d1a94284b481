use crate::{
    api::{matches::Match, MatchId},
    geo::{Bounds, Coordinate},
};

pub mod text;

pub const DEFAULT_LEVEL: u8 = 5;

/// The imperative surface of a map widget.
pub trait MapWidget {
    type Marker: Copy + Eq;

    fn pan_to(&mut self, center: Coordinate);
    fn add_marker(&mut self, position: Coordinate, title: &str) -> Self::Marker;
    fn remove_marker(&mut self, marker: Self::Marker);
    fn fit_bounds(&mut self, bounds: Bounds);
}

/// Owns a map widget and its markers for as long as the view lives.
///
/// The three updates are kept apart: `mount` creates the widget once,
/// `recenter` pans the live widget and `sync` replaces the markers when the
/// collection changed.
pub struct MapView<W: MapWidget> {
    widget: Option<W>,
    center: Coordinate,
    markers: Vec<(W::Marker, MatchId)>,
    synced: Option<u64>,
    on_marker_click: Box<dyn FnMut(MatchId)>,
}

impl<W: MapWidget> MapView<W> {
    pub fn new(center: Coordinate, on_marker_click: impl FnMut(MatchId) + 'static) -> Self {
        Self {
            widget: None,
            center,
            markers: vec![],
            synced: None,
            on_marker_click: Box::new(on_marker_click),
        }
    }

    /// Create the widget unless one is alive already. Returns whether a
    /// widget was created.
    pub fn mount(&mut self, create: impl FnOnce(Coordinate, u8) -> W) -> bool {
        if self.widget.is_some() {
            return false;
        }
        log::debug!("creating map widget at {}", self.center);
        self.widget = Some(create(self.center, DEFAULT_LEVEL));
        self.synced = None;
        true
    }

    pub fn widget(&self) -> Option<&W> {
        self.widget.as_ref()
    }

    pub fn recenter(&mut self, center: Coordinate) {
        if center == self.center {
            return;
        }
        self.center = center;
        if let Some(widget) = self.widget.as_mut() {
            widget.pan_to(center);
        }
    }

    /// Bring the markers in line with collection `generation`. Returns the
    /// number of markers on the map.
    pub fn sync(&mut self, generation: u64, matches: &[Match]) -> usize {
        if self.widget.is_none() || self.synced == Some(generation) {
            return self.markers.len();
        }
        self.clear_markers();

        let Some(widget) = self.widget.as_mut() else {
            return 0;
        };
        // only records with both coordinates set get a pin
        let pinned: Vec<_> = matches
            .iter()
            .filter_map(|mat| mat.position().map(|position| (mat, position)))
            .collect();
        for &(mat, position) in &pinned {
            let marker = widget.add_marker(position, &mat.place_name);
            self.markers.push((marker, mat.id));
        }
        if let Some(bounds) = Bounds::from_points(pinned.iter().map(|&(_, position)| position)) {
            widget.fit_bounds(bounds);
        }
        log::debug!(
            "placed {} markers for {} matches (generation {})",
            self.markers.len(),
            matches.len(),
            generation
        );
        self.synced = Some(generation);
        self.markers.len()
    }

    /// Forward a click on `marker` to the owner. Unknown markers are ignored.
    pub fn click(&mut self, marker: W::Marker) -> Option<MatchId> {
        let id = self
            .markers
            .iter()
            .find(|(handle, _)| *handle == marker)
            .map(|&(_, id)| id)?;
        (self.on_marker_click)(id);
        Some(id)
    }

    pub fn unmount(&mut self) {
        self.clear_markers();
        if self.widget.take().is_some() {
            log::debug!("map widget released");
        }
        self.synced = None;
    }

    fn clear_markers(&mut self) {
        let Some(widget) = self.widget.as_mut() else {
            self.markers.clear();
            return;
        };
        for (marker, _) in self.markers.drain(..) {
            widget.remove_marker(marker);
        }
    }
}

impl<W: MapWidget> Drop for MapView<W> {
    fn drop(&mut self) {
        self.unmount();
    }
}
