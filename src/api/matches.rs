use std::fmt::Display;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::MatchId;
use crate::geo::Coordinate;

pub const PLACE_PLACEHOLDER: &str = "장소 미정";

#[derive(Deserialize, Serialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Recruiting,
    Closed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // the backend only ever closes explicitly
        let name = match self {
            MatchStatus::Closed => "마감",
            MatchStatus::Recruiting | MatchStatus::Unknown => "모집중",
        };
        f.write_str(name)
    }
}

// the api has shipped several spellings of the same fields,
// the first name of every pair is the current one
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawMatch {
    #[serde(default)]
    pub match_id: Option<u64>,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub place_name: Option<String>,
    #[serde(default)]
    pub address_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub neighborhood: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub match_date: Option<String>,
    #[serde(default)]
    pub current_player_count: Option<u32>,
    #[serde(default)]
    pub current_member_count: Option<u32>,
    #[serde(default)]
    pub max_player_count: Option<u32>,
    #[serde(default)]
    pub max_member_count: Option<u32>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub status: Option<MatchStatus>,
    #[serde(default)]
    pub writer_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Match {
    pub id: MatchId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub place_name: String,
    pub city: Option<String>,
    pub district: Option<String>,
    pub neighborhood: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub match_date: Option<String>,
    pub current_player_count: u32,
    pub max_player_count: u32,
    pub distance: Option<f64>,
    pub status: MatchStatus,
}

impl Match {
    /// Where to put the marker, `None` when either axis is unset.
    pub fn position(&self) -> Option<Coordinate> {
        let position = Coordinate::new(self.latitude, self.longitude);
        position.is_set().then_some(position)
    }

    pub fn address(&self) -> String {
        [&self.city, &self.district, &self.neighborhood]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .join(" ")
    }

    pub fn is_full(&self) -> bool {
        self.max_player_count > 0 && self.current_player_count >= self.max_player_count
    }
}

fn pick<T>(field: &str, current: Option<T>, legacy: Option<T>, legacy_name: &str) -> Option<T> {
    if current.is_none() && legacy.is_some() {
        log::warn!("field-name drift: got `{}` instead of `{}`", legacy_name, field);
    }
    current.or(legacy)
}

impl RawMatch {
    fn identity(&self) -> Option<MatchId> {
        pick("matchId", self.match_id, self.id, "id").map(MatchId)
    }
}

impl TryFrom<RawMatch> for Match {
    type Error = String;

    fn try_from(value: RawMatch) -> Result<Self, Self::Error> {
        let id = value
            .identity()
            .ok_or_else(|| "match record without an identifier".to_string())?;
        let current_player_count = pick(
            "currentPlayerCount",
            value.current_player_count,
            value.current_member_count,
            "currentMemberCount",
        );
        let max_player_count = pick(
            "maxPlayerCount",
            value.max_player_count,
            value.max_member_count,
            "maxMemberCount",
        );
        let distance = pick("distance", value.distance, value.distance_km, "distanceKm");
        let description = pick("description", value.description, value.content, "content");
        let place_name = value
            .place_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| PLACE_PLACEHOLDER.to_string());

        Ok(Self {
            id,
            title: value.title,
            description,
            place_name,
            city: value.city,
            district: value.district,
            neighborhood: value.neighborhood,
            latitude: value.latitude.unwrap_or_default(),
            longitude: value.longitude.unwrap_or_default(),
            match_date: value.match_date,
            current_player_count: current_player_count.unwrap_or_default(),
            max_player_count: max_player_count.unwrap_or_default(),
            distance,
            status: value.status.unwrap_or_default(),
        })
    }
}

/// Normalize a fetched collection, keeping server order.
///
/// Records without any identifier cannot be selected later on, they are
/// dropped with a warning instead of failing the whole list.
pub fn normalize(raw: Vec<RawMatch>) -> Vec<Match> {
    raw.into_iter()
        .filter_map(|record| match Match::try_from(record) {
            Ok(mat) => Some(mat),
            Err(reason) => {
                log::warn!("skipping record: {}", reason);
                None
            }
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchDetail {
    pub summary: Match,
    pub address_name: Option<String>,
    pub writer_name: Option<String>,
}

impl TryFrom<RawMatch> for MatchDetail {
    type Error = String;

    fn try_from(mut value: RawMatch) -> Result<Self, Self::Error> {
        let address_name = value.address_name.take();
        let writer_name = value.writer_name.take();
        let summary = Match::try_from(value)?;
        Ok(Self {
            summary,
            address_name,
            writer_name,
        })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewMatch {
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_player_count: Option<u32>,
    pub description: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub user_id: u64,
}

#[derive(Serialize, Clone, Debug)]
pub struct NearbyQuery {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "distanceKm")]
    pub distance_km: f64,
}

impl NearbyQuery {
    pub fn new(center: Coordinate, distance_km: f64) -> Self {
        Self {
            latitude: center.latitude,
            longitude: center.longitude,
            distance_km,
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;
    use crate::api::decode;

    const RECORDS: &str = r#"[
        {"matchId":1,"placeName":"강남 풋살장","district":"강남구","matchDate":"2026-10-20T19:00",
         "maxPlayerCount":10,"currentPlayerCount":4,"distance":1.234,"latitude":37.49,"longitude":127.02,
         "status":"RECRUITING"},
        {"matchId":2,"district":"서초구","maxPlayerCount":12,"currentPlayerCount":12,
         "latitude":0,"longitude":127.01,"status":"CLOSED"}
    ]"#;

    #[test]
    fn test_both_shapes_normalize_identically() {
        let bare: Vec<RawMatch> = decode(StatusCode::OK, RECORDS.to_string()).expect("bare");
        let wrapped = format!(r#"{{"code":200,"message":"success","data":{}}}"#, RECORDS);
        let enveloped: Vec<RawMatch> = decode(StatusCode::OK, wrapped).expect("enveloped");
        let bare = normalize(bare);
        assert_eq!(bare, normalize(enveloped));
        assert_eq!(bare.len(), 2);
        assert_eq!(bare[0].id, MatchId(1));
        assert_eq!(bare[1].id, MatchId(2));
    }

    #[test]
    fn test_defaults() {
        let raw: Vec<RawMatch> = serde_json::from_str(RECORDS).expect("records");
        let matches = normalize(raw);
        assert_eq!(matches[0].place_name, "강남 풋살장");
        assert_eq!(matches[1].place_name, PLACE_PLACEHOLDER);
        assert_eq!(matches[1].distance, None);
        assert_eq!(matches[1].status, MatchStatus::Closed);
        assert!(matches[1].is_full());
        assert!(matches[0].position().is_some());
        assert!(matches[1].position().is_none());
    }

    #[test]
    fn test_legacy_field_names() {
        let raw: RawMatch = serde_json::from_str(
            r#"{"id":7,"content":"풋살","currentMemberCount":3,"maxMemberCount":8,"distanceKm":2.5,"status":"WAITING"}"#,
        )
        .expect("legacy record");
        let mat = Match::try_from(raw).expect("has id");
        assert_eq!(mat.id, MatchId(7));
        assert_eq!(mat.description.as_deref(), Some("풋살"));
        assert_eq!(mat.current_player_count, 3);
        assert_eq!(mat.max_player_count, 8);
        assert_eq!(mat.distance, Some(2.5));
        assert_eq!(mat.status, MatchStatus::Unknown);
    }

    #[test]
    fn test_records_without_id_are_dropped() {
        let raw: Vec<RawMatch> =
            serde_json::from_str(r#"[{"placeName":"a"},{"matchId":3}]"#).expect("records");
        let matches = normalize(raw);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, MatchId(3));
    }

    #[test]
    fn test_address() {
        let raw: RawMatch = serde_json::from_str(
            r#"{"matchId":1,"city":"서울특별시","district":"강남구","neighborhood":""}"#,
        )
        .expect("record");
        let mat = Match::try_from(raw).expect("has id");
        assert_eq!(mat.address(), "서울특별시 강남구");
    }

    #[test]
    fn test_new_match_wire_names() {
        let body = NewMatch {
            writer_id: 1,
            title: "6vs6".into(),
            city: "서울".into(),
            district: "강남구".into(),
            neighborhood: "역삼동".into(),
            place_name: "풋살장".into(),
            latitude: 37.5,
            longitude: 127.0,
            match_date: "2026-10-20T19:00".into(),
            max_player_count: 12,
            current_player_count: None,
            description: "설명".into(),
        };
        let value = serde_json::to_value(&body).expect("serialize");
        assert_eq!(value["writerId"], 1);
        assert_eq!(value["placeName"], "풋살장");
        assert_eq!(value["maxPlayerCount"], 12);
        assert!(value.get("currentPlayerCount").is_none());
    }
}
