use chrono::{Duration, Local};
use itertools::Itertools;
use thiserror::Error;

use crate::{
    api::matches::NewMatch,
    board::Refresh,
    client::{MatchApi, RequestError},
    detail::COMMUNICATION_FAILED,
    geo::{Coordinate, Geocoder},
    list::parse_match_date,
};

pub const MIN_PLAYERS: u32 = 2;
pub const MAX_PLAYERS: u32 = 22;
pub const DEFAULT_MAX_PLAYERS: u32 = 10;
pub const DEFAULT_DESCRIPTION: &str = "용병 모집 설명입니다. 많은 참여 바랍니다.";
pub const CREATED_WITHOUT_ID: &str = "✅ 매치 생성 성공! 목록 갱신됨.";
pub const GEOCODE_FAILED: &str = "⚠️ 주소를 좌표로 변환하는 데 실패했습니다.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("❌ 필수 항목이 비어 있습니다: {0}")]
    MissingField(&'static str),
    #[error("❌ 주소 검색이나 지도 선택으로 위치를 먼저 정해 주세요.")]
    MissingCoordinates,
    #[error("❌ 경기 날짜/시간 형식이 올바르지 않습니다: {0}")]
    InvalidDate(String),
    #[error(
        "❌ 최대 인원은 {min}명에서 {max}명 사이여야 합니다. (입력: {0}명)",
        min = MIN_PLAYERS,
        max = MAX_PLAYERS
    )]
    CapacityOutOfRange(u32),
    #[error("❌ 현재 인원({current}명)이 최대 인원({max}명)보다 많습니다.")]
    CapacityExceeded { current: u32, max: u32 },
}

/// What the address lookup popup hands back on selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostcodeSelection {
    pub road_address: String,
    pub jibun_address: String,
    pub building_name: String,
}

impl PostcodeSelection {
    pub fn full_address(&self) -> &str {
        if self.road_address.trim().is_empty() {
            self.jibun_address.trim()
        } else {
            self.road_address.trim()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchForm {
    pub writer_id: u64,
    pub title: String,
    pub city: String,
    pub district: String,
    pub neighborhood: String,
    pub place_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub match_date: String,
    pub max_player_count: u32,
    pub current_player_count: Option<u32>,
    pub description: String,
}

impl MatchForm {
    pub fn new(writer_id: u64) -> Self {
        // an hour from now, in the same shape a datetime-local input produces
        let match_date = (Local::now() + Duration::hours(1))
            .format("%Y-%m-%dT%H:%M")
            .to_string();
        Self {
            writer_id,
            title: String::new(),
            city: String::new(),
            district: String::new(),
            neighborhood: String::new(),
            place_name: String::new(),
            latitude: 0.0,
            longitude: 0.0,
            match_date,
            max_player_count: DEFAULT_MAX_PLAYERS,
            current_player_count: None,
            description: DEFAULT_DESCRIPTION.to_string(),
        }
    }

    pub fn position(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    pub fn address(&self) -> String {
        [&self.city, &self.district, &self.neighborhood]
            .into_iter()
            .filter(|part| !part.is_empty())
            .join(" ")
    }

    /// Checks run before anything is sent.
    pub fn validate(&self) -> Result<NewMatch, ValidationError> {
        let required = [
            ("제목", &self.title),
            ("주소", &self.city),
            ("장소 이름", &self.place_name),
            ("설명", &self.description),
        ];
        if let Some(&(label, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ValidationError::MissingField(label));
        }
        if self.match_date.trim().is_empty() {
            return Err(ValidationError::MissingField("경기 날짜/시간"));
        }
        if parse_match_date(self.match_date.trim()).is_none() {
            return Err(ValidationError::InvalidDate(self.match_date.clone()));
        }
        if !self.position().is_set() {
            return Err(ValidationError::MissingCoordinates);
        }
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.max_player_count) {
            return Err(ValidationError::CapacityOutOfRange(self.max_player_count));
        }
        if let Some(current) = self.current_player_count {
            if current > self.max_player_count {
                return Err(ValidationError::CapacityExceeded {
                    current,
                    max: self.max_player_count,
                });
            }
        }

        Ok(NewMatch {
            writer_id: self.writer_id,
            title: self.title.trim().to_string(),
            city: self.city.clone(),
            district: self.district.clone(),
            neighborhood: self.neighborhood.clone(),
            place_name: self.place_name.trim().to_string(),
            latitude: self.latitude,
            longitude: self.longitude,
            match_date: self.match_date.trim().to_string(),
            max_player_count: self.max_player_count,
            current_player_count: self.current_player_count,
            description: self.description.trim().to_string(),
        })
    }
}

/// The match creation form. `submit` takes `&mut self`, so the form cannot
/// be submitted twice while a create is awaiting the server.
pub struct CreateFlow {
    form: MatchForm,
    status: Option<String>,
}

impl CreateFlow {
    pub fn new(writer_id: u64) -> Self {
        Self {
            form: MatchForm::new(writer_id),
            status: None,
        }
    }

    pub fn form(&self) -> &MatchForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut MatchForm {
        &mut self.form
    }

    /// Take an address from the lookup popup and resolve its coordinates.
    pub async fn select_address<G: Geocoder>(
        &mut self,
        geocoder: &G,
        selection: &PostcodeSelection,
    ) -> &str {
        let full = selection.full_address().to_string();
        // coordinates of an earlier selection never outlive its address
        self.form.latitude = 0.0;
        self.form.longitude = 0.0;
        let mut parts = full.split_whitespace();
        self.form.city = parts.next().unwrap_or_default().to_string();
        self.form.district = parts.next().unwrap_or_default().to_string();
        self.form.neighborhood = parts.next().unwrap_or_default().to_string();
        self.form.place_name = if selection.building_name.trim().is_empty() {
            full.clone()
        } else {
            selection.building_name.trim().to_string()
        };

        let message = match geocoder.geocode(&full).await {
            Ok(Some(position)) => {
                self.form.latitude = position.latitude;
                self.form.longitude = position.longitude;
                format!(
                    "✅ 주소 검색 완료: 위도 {}, 경도 {}",
                    position.latitude, position.longitude
                )
            }
            Ok(None) => {
                log::info!("no coordinates for {:?}", full);
                GEOCODE_FAILED.to_string()
            }
            Err(err) => {
                log::warn!("geocoding {:?} failed: {}", full, err);
                GEOCODE_FAILED.to_string()
            }
        };
        self.status.insert(message)
    }

    /// Take a point clicked or dragged on the map.
    pub async fn pick_location<G: Geocoder>(&mut self, geocoder: &G, position: Coordinate) -> &str {
        self.form.latitude = position.latitude;
        self.form.longitude = position.longitude;
        let message = match geocoder.reverse(position).await {
            Ok(Some(region)) => {
                self.form.city = region.city;
                self.form.district = region.district;
                self.form.neighborhood = region.neighborhood;
                if self.form.place_name.trim().is_empty() {
                    self.form.place_name = region.address_name.clone();
                }
                format!("✅ 지도에서 선택: {}", region.address_name)
            }
            Ok(None) => format!("✅ 지도에서 선택: {}", position),
            Err(err) => {
                log::warn!("reverse geocoding {} failed: {}", position, err);
                format!("⚠️ 선택한 위치의 주소를 찾지 못했습니다: {}", position)
            }
        };
        self.status.insert(message)
    }

    /// Validate, then post the match. A validation failure never reaches the
    /// api.
    pub async fn submit<A: MatchApi, R: Refresh>(
        &mut self,
        api: &A,
        refresh: &mut R,
    ) -> &str {
        let body = match self.form.validate() {
            Ok(body) => body,
            Err(err) => return self.status.insert(err.to_string()),
        };

        let created = match api.create_match(&body).await {
            Ok(Some(id)) => {
                log::info!("created match {}", id);
                self.form = MatchForm::new(self.form.writer_id);
                Some(format!("✅ 매치 생성 성공! ID: {}. 목록 갱신됨.", id))
            }
            Ok(None) => {
                log::info!("created match, no id returned");
                self.form = MatchForm::new(self.form.writer_id);
                Some(CREATED_WITHOUT_ID.to_string())
            }
            Err(err) => {
                log::warn!("creating match failed: {}", err);
                self.status = Some(match err {
                    RequestError::Rejected { message, .. } if !message.is_empty() => {
                        format!("⚠️ 오류: {}", message)
                    }
                    RequestError::Rejected { code, .. } => format!("⚠️ 오류: {}", code),
                    RequestError::OtherResponse(status) => format!("⚠️ 오류: {}", status),
                    _ => COMMUNICATION_FAILED.to_string(),
                });
                None
            }
        };
        if let Some(message) = created {
            refresh.refresh().await;
            self.status = Some(message);
        }
        self.status.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{api::MatchId, client::testing::FakeApi, geo::Region};

    #[derive(Default)]
    struct Counter(usize);

    impl Refresh for Counter {
        async fn refresh(&mut self) {
            self.0 += 1;
        }
    }

    struct FakeGeocoder {
        position: Option<Coordinate>,
    }

    impl Geocoder for FakeGeocoder {
        type Error = String;

        async fn geocode(&self, _address: &str) -> Result<Option<Coordinate>, String> {
            Ok(self.position)
        }

        async fn reverse(&self, _position: Coordinate) -> Result<Option<Region>, String> {
            Err("quota exceeded".into())
        }
    }

    fn filled_form() -> CreateFlow {
        let mut flow = CreateFlow::new(1);
        let form = flow.form_mut();
        form.title = "6vs6 풋살 용병 구합니다".into();
        form.city = "서울".into();
        form.district = "강남구".into();
        form.neighborhood = "역삼동".into();
        form.place_name = "강남 풋살장".into();
        form.latitude = 37.5;
        form.longitude = 127.03;
        form.match_date = "2026-10-20T19:00".into();
        flow
    }

    #[tokio::test]
    async fn test_capacity_blocks_before_request() {
        let api = FakeApi::default();
        let mut flow = filled_form();
        flow.form_mut().current_player_count = Some(5);
        flow.form_mut().max_player_count = 3;
        let mut counter = Counter::default();

        let message = flow.submit(&api, &mut counter).await.to_string();
        assert_eq!(
            message,
            ValidationError::CapacityExceeded { current: 5, max: 3 }.to_string()
        );
        assert_eq!(api.total_calls(), 0);
        assert_eq!(counter.0, 0);
    }

    #[test]
    fn test_validation_rules() {
        let flow = filled_form();
        assert!(flow.form().validate().is_ok());

        let mut form = flow.form().clone();
        form.title = "  ".into();
        assert_eq!(form.validate(), Err(ValidationError::MissingField("제목")));

        let mut form = flow.form().clone();
        form.longitude = 0.0;
        assert_eq!(form.validate(), Err(ValidationError::MissingCoordinates));

        let mut form = flow.form().clone();
        form.match_date = "다음주".into();
        assert!(matches!(form.validate(), Err(ValidationError::InvalidDate(_))));

        let mut form = flow.form().clone();
        form.max_player_count = 30;
        assert_eq!(form.validate(), Err(ValidationError::CapacityOutOfRange(30)));

        let mut form = flow.form().clone();
        form.current_player_count = Some(10);
        assert!(form.validate().is_ok());
    }

    #[tokio::test]
    async fn test_successful_submit_resets_and_refreshes() {
        let api = FakeApi::default();
        api.created.lock().unwrap().push_back(Ok(Some(MatchId(12))));
        let mut flow = filled_form();
        let mut counter = Counter::default();

        let message = flow.submit(&api, &mut counter).await.to_string();
        assert_eq!(message, "✅ 매치 생성 성공! ID: 12. 목록 갱신됨.");
        assert_eq!(counter.0, 1);
        assert_eq!(api.calls("create"), 1);
        assert!(flow.form().title.is_empty());
        assert_eq!(flow.form().latitude, 0.0);
    }

    #[tokio::test]
    async fn test_created_without_id_still_succeeds() {
        let api = FakeApi::default();
        api.created.lock().unwrap().push_back(Ok(None));
        let mut flow = filled_form();
        let mut counter = Counter::default();

        let message = flow.submit(&api, &mut counter).await.to_string();
        assert_eq!(message, CREATED_WITHOUT_ID);
        assert_eq!(counter.0, 1);
        assert!(flow.form().title.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_submit_keeps_form() {
        let api = FakeApi::default();
        api.created.lock().unwrap().push_back(Err(RequestError::Rejected {
            code: 400,
            message: "작성자를 찾을 수 없습니다".into(),
        }));
        let mut flow = filled_form();
        let mut counter = Counter::default();

        let message = flow.submit(&api, &mut counter).await.to_string();
        assert_eq!(message, "⚠️ 오류: 작성자를 찾을 수 없습니다");
        assert_eq!(counter.0, 0);
        assert_eq!(flow.form().place_name, "강남 풋살장");
    }

    #[tokio::test]
    async fn test_address_selection() {
        let mut flow = CreateFlow::new(1);
        let geocoder = FakeGeocoder {
            position: Some(Coordinate::new(37.4979, 127.0276)),
        };
        let selection = PostcodeSelection {
            road_address: "서울 강남구 강남대로 396".into(),
            jibun_address: "서울 강남구 역삼동 858".into(),
            building_name: "강남역 풋살파크".into(),
        };
        let message = flow.select_address(&geocoder, &selection).await.to_string();
        assert!(message.starts_with("✅ 주소 검색 완료"));
        let form = flow.form();
        assert_eq!(form.address(), "서울 강남구 강남대로");
        assert_eq!(form.place_name, "강남역 풋살파크");
        assert_eq!(form.position(), Coordinate::new(37.4979, 127.0276));

        let missing = FakeGeocoder { position: None };
        let jibun_only = PostcodeSelection {
            jibun_address: "서울 서초구 서초동 1".into(),
            ..Default::default()
        };
        let message = flow.select_address(&missing, &jibun_only).await;
        assert_eq!(message, GEOCODE_FAILED);
        assert_eq!(flow.form().place_name, "서울 서초구 서초동 1");
        // the previous coordinates are gone with the previous address
        assert!(!flow.form().position().is_set());

        flow.form_mut().title = "6vs6".into();
        let api = FakeApi::default();
        let mut counter = Counter::default();
        let message = flow.submit(&api, &mut counter).await.to_string();
        assert_eq!(message, ValidationError::MissingCoordinates.to_string());
        assert_eq!(api.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_map_pick_keeps_coordinates_without_address() {
        let mut flow = CreateFlow::new(1);
        let geocoder = FakeGeocoder { position: None };
        let message = flow
            .pick_location(&geocoder, Coordinate::new(37.51, 127.06))
            .await
            .to_string();
        assert!(message.starts_with("⚠️"));
        assert_eq!(flow.form().position(), Coordinate::new(37.51, 127.06));
    }
}
