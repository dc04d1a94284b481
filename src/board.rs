use std::future::Future;

use crate::{
    api::{
        matches::{Match, NearbyQuery},
        MatchId,
    },
    client::{MatchApi, RequestError},
    geo::{Coordinate, Place, PlaceSearch},
    list::ListState,
};

pub const CONNECTION_FAILED: &str = "서버 연결에 실패했습니다.";
pub const LIST_FAILED: &str = "매치 목록을 불러오지 못했습니다.";
pub const LIST_MALFORMED: &str = "매치 목록 응답 형식이 올바르지 않습니다.";

pub const DEFAULT_RADIUS_KM: f64 = 10.0;

/// Whatever has to happen after a flow changed server state.
pub trait Refresh {
    fn refresh(&mut self) -> impl Future<Output = ()>;
}

/// The shared match collection the map and the list both render from.
///
/// Every fetch replaces the collection wholesale and bumps `generation`;
/// views compare generations instead of contents.
pub struct Board<A> {
    api: A,
    center: Coordinate,
    radius_km: f64,
    matches: Vec<Match>,
    loading: bool,
    error: Option<String>,
    generation: u64,
}

pub fn list_error_message(err: &RequestError) -> String {
    match err {
        RequestError::ConnectionError(_) => CONNECTION_FAILED.to_string(),
        RequestError::Rejected { message, .. } if !message.is_empty() => message.clone(),
        RequestError::Rejected { .. } | RequestError::OtherResponse(_) => LIST_FAILED.to_string(),
        RequestError::DecodeError(_, _) | RequestError::Malformed(_, _) => {
            LIST_MALFORMED.to_string()
        }
    }
}

impl<A: MatchApi> Board<A> {
    pub fn new(api: A, center: Coordinate, radius_km: f64) -> Self {
        Self {
            api,
            center,
            radius_km,
            matches: vec![],
            loading: true,
            error: None,
            generation: 0,
        }
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn find(&self, id: MatchId) -> Option<&Match> {
        self.matches.iter().find(|mat| mat.id == id)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn center(&self) -> Coordinate {
        self.center
    }

    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn list(&self) -> ListState<'_> {
        ListState {
            matches: &self.matches,
            loading: self.loading,
            error: self.error.as_deref(),
            radius_km: self.radius_km,
        }
    }

    pub fn recenter(&mut self, center: Coordinate) {
        log::debug!("board center moved to {}", center);
        self.center = center;
    }

    pub fn set_radius(&mut self, radius_km: f64) {
        self.radius_km = radius_km;
    }

    /// Run the nearby query for the current center.
    ///
    /// Overlapping fetches are not cancelled, whichever answer lands last wins.
    pub async fn fetch(&mut self) {
        self.loading = true;
        let query = NearbyQuery::new(self.center, self.radius_km);
        match self.api.nearby_matches(&query).await {
            Ok(matches) => {
                log::debug!(
                    "retrieved {} matches within {}km of {}",
                    matches.len(),
                    self.radius_km,
                    self.center
                );
                self.matches = matches;
                self.error = None;
            }
            Err(err) => {
                log::warn!("RequestError: {}", err);
                self.matches.clear();
                self.error = Some(list_error_message(&err));
            }
        }
        self.generation += 1;
        self.loading = false;
    }

    /// Resolve a free text place through the map search and move there.
    pub async fn search<P: PlaceSearch>(
        &mut self,
        places: &P,
        keyword: &str,
    ) -> Result<Option<Place>, P::Error> {
        let found = places.search_places(keyword).await?.into_iter().next();
        match &found {
            Some(place) => self.recenter(place.position),
            None => log::info!("no place matched {:?}", keyword),
        }
        Ok(found)
    }
}

impl<A: MatchApi> Refresh for Board<A> {
    async fn refresh(&mut self) {
        self.fetch().await
    }
}
