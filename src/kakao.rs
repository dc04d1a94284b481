use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    client::{build_http, ConstructionError},
    geo::{Coordinate, Geocoder, Place, PlaceSearch, Region},
};

pub const AUTHORIZE_URL: &str = "https://kauth.kakao.com/oauth/authorize";
pub const LOCAL_API_URL: &str = "https://dapi.kakao.com";

#[derive(Error, Debug)]
pub enum KakaoError {
    #[error("Failed to reach kakao: {0}")]
    ConnectionError(#[from] reqwest::Error),
    #[error("Failed to decode kakao response: {0}")]
    DecodeError(serde_json::Error, String),
    #[error("Kakao answered {0}: {1}")]
    OtherResponse(StatusCode, String),
}

/// Where to send the browser to start a kakao login.
pub fn authorize_url(rest_key: &str, redirect_uri: &str) -> Result<Url, ConstructionError> {
    Url::parse_with_params(
        AUTHORIZE_URL,
        &[
            ("client_id", rest_key),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
        ],
    )
    .map_err(|err| ConstructionError::InvalidUrl(err.to_string(), AUTHORIZE_URL.to_string()))
}

// kakao sends coordinates as strings, x is the longitude
#[derive(Deserialize, Debug)]
struct AddressDocument {
    x: String,
    y: String,
}

#[derive(Deserialize, Debug)]
struct RegionAddress {
    #[serde(default)]
    address_name: String,
    #[serde(default)]
    region_1depth_name: String,
    #[serde(default)]
    region_2depth_name: String,
    #[serde(default)]
    region_3depth_name: String,
}

#[derive(Deserialize, Debug)]
struct RegionDocument {
    #[serde(default)]
    address: Option<RegionAddress>,
    #[serde(default)]
    road_address: Option<RegionAddress>,
}

#[derive(Deserialize, Debug)]
struct PlaceDocument {
    place_name: String,
    #[serde(default)]
    address_name: String,
    #[serde(default)]
    road_address_name: String,
    x: String,
    y: String,
}

#[derive(Deserialize, Debug)]
struct Documents<T> {
    documents: Vec<T>,
}

fn parse_xy(x: &str, y: &str) -> Option<Coordinate> {
    let position = Coordinate::new(y.trim().parse().ok()?, x.trim().parse().ok()?);
    position.is_set().then_some(position)
}

/// Kakao Local REST api: address search, reverse geocoding and keyword search.
#[derive(Clone)]
pub struct KakaoLocal {
    client: reqwest::Client,
    base: String,
    rest_key: String,
}

impl KakaoLocal {
    const PATH_ADDRESS: &str = "/v2/local/search/address.json";
    const PATH_COORD_TO_ADDRESS: &str = "/v2/local/geo/coord2address.json";
    const PATH_KEYWORD: &str = "/v2/local/search/keyword.json";

    pub fn new(
        rest_key: &str,
        proxy: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Self, ConstructionError> {
        Self::with_base(LOCAL_API_URL, rest_key, proxy, timeout)
    }

    pub fn with_base(
        base: &str,
        rest_key: &str,
        proxy: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Self, ConstructionError> {
        Ok(Self {
            client: build_http(proxy, timeout)?,
            base: base.trim_end_matches('/').to_string(),
            rest_key: rest_key.to_string(),
        })
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Documents<T>, KakaoError> {
        let resp = self
            .client
            .get(format!("{}{}", self.base, path))
            .header("Authorization", format!("KakaoAK {}", self.rest_key))
            .query(query)
            .send()
            .await?;
        let status = resp.status();
        let content = resp.text().await?;
        if !status.is_success() {
            return Err(KakaoError::OtherResponse(status, content));
        }
        serde_json::from_str(&content).map_err(|err| KakaoError::DecodeError(err, content))
    }
}

impl Geocoder for KakaoLocal {
    type Error = KakaoError;

    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, KakaoError> {
        let found: Documents<AddressDocument> = self
            .get(Self::PATH_ADDRESS, &[("query", address.to_string())])
            .await?;
        Ok(found
            .documents
            .first()
            .and_then(|doc| parse_xy(&doc.x, &doc.y)))
    }

    async fn reverse(&self, position: Coordinate) -> Result<Option<Region>, KakaoError> {
        let found: Documents<RegionDocument> = self
            .get(
                Self::PATH_COORD_TO_ADDRESS,
                &[
                    ("x", position.longitude.to_string()),
                    ("y", position.latitude.to_string()),
                ],
            )
            .await?;
        let region = found.documents.into_iter().next().and_then(|doc| {
            // parcel addresses always carry all three region levels
            let address_name = doc
                .road_address
                .as_ref()
                .map(|road| road.address_name.clone())
                .filter(|name| !name.is_empty());
            doc.address.map(|parcel| Region {
                city: parcel.region_1depth_name,
                district: parcel.region_2depth_name,
                neighborhood: parcel.region_3depth_name,
                address_name: address_name.unwrap_or(parcel.address_name),
            })
        });
        Ok(region)
    }
}

impl PlaceSearch for KakaoLocal {
    type Error = KakaoError;

    async fn search_places(&self, keyword: &str) -> Result<Vec<Place>, KakaoError> {
        let found: Documents<PlaceDocument> = self
            .get(Self::PATH_KEYWORD, &[("query", keyword.to_string())])
            .await?;
        Ok(found
            .documents
            .into_iter()
            .filter_map(|doc| {
                let position = parse_xy(&doc.x, &doc.y)?;
                let address_name = if doc.road_address_name.is_empty() {
                    doc.address_name
                } else {
                    doc.road_address_name
                };
                Some(Place {
                    name: doc.place_name,
                    address_name,
                    position,
                })
            })
            .collect())
    }
}
