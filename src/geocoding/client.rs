use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::core::config::VWorldConfig;
use crate::core::shared::error::ApiError;

pub const MAX_ATTEMPTS: usize = 4;
const MIN_TOKENS: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("VWorld API key is not configured")]
    NotConfigured,
    #[error("address is empty")]
    EmptyAddress,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("VWorld API error: {0}")]
    Api(String),
    #[error("no match after {attempts} attempts")]
    NotFound { attempts: usize },
}

impl From<GeocodeError> for ApiError {
    fn from(e: GeocodeError) -> Self {
        match e {
            GeocodeError::NotConfigured => ApiError::NotConfigured("VWorld 지오코딩".to_string()),
            GeocodeError::EmptyAddress => ApiError::Validation("주소를 입력해주세요.".to_string()),
            GeocodeError::NotFound { .. } => {
                ApiError::NotFound("주소에 해당하는 좌표를 찾을 수 없습니다.".to_string())
            }
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressType {
    Road,
    Parcel,
}

impl AddressType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Road => "road",
            Self::Parcel => "parcel",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub latitude: f64,
    pub longitude: f64,
    pub matched_address: String,
    pub query: String,
    pub address_type: AddressType,
    pub attempts: usize,
}

#[derive(Debug, Deserialize)]
struct VWorldEnvelope {
    response: VWorldResponse,
}

#[derive(Debug, Deserialize)]
struct VWorldResponse {
    status: String,
    #[serde(default)]
    refined: Option<VWorldRefined>,
    #[serde(default)]
    result: Option<VWorldResult>,
    #[serde(default)]
    error: Option<VWorldErrorBody>,
}

#[derive(Debug, Deserialize)]
struct VWorldRefined {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VWorldResult {
    point: VWorldPoint,
}

#[derive(Debug, Deserialize)]
struct VWorldPoint {
    x: String,
    y: String,
}

#[derive(Debug, Deserialize)]
struct VWorldErrorBody {
    #[serde(default)]
    text: Option<String>,
}

/// Query strings for the fallback ladder, most specific first.
///
/// The full address, then the address without parenthesized or comma-separated
/// details, then successively shorter prefixes by whole tokens. Never yields
/// fewer than two tokens and never more than [`MAX_ATTEMPTS`] entries.
pub fn address_candidates(address: &str) -> Vec<String> {
    let normalized = address.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return Vec::new();
    }

    let mut candidates = vec![normalized.clone()];

    let mut depth = 0usize;
    let without_parens: String = normalized
        .chars()
        .filter(|c| match c {
            '(' => {
                depth += 1;
                false
            }
            ')' => {
                depth = depth.saturating_sub(1);
                false
            }
            _ => depth == 0,
        })
        .collect();
    let base = without_parens
        .split(',')
        .next()
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>();

    if !base.is_empty() {
        candidates.push(base.join(" "));
    }

    let mut tokens = base;
    while tokens.len() > MIN_TOKENS {
        tokens.pop();
        candidates.push(tokens.join(" "));
    }

    let mut unique: Vec<String> = Vec::with_capacity(MAX_ATTEMPTS);
    for candidate in candidates {
        if !unique.contains(&candidate) {
            unique.push(candidate);
        }
        if unique.len() == MAX_ATTEMPTS {
            break;
        }
    }
    unique
}

#[derive(Debug, Clone)]
pub struct VWorldClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl VWorldClient {
    pub fn new(http: reqwest::Client, config: &VWorldConfig) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub async fn geocode(&self, address: &str) -> Result<GeocodeResult, GeocodeError> {
        if !self.is_configured() {
            return Err(GeocodeError::NotConfigured);
        }

        let candidates = address_candidates(address);
        if candidates.is_empty() {
            return Err(GeocodeError::EmptyAddress);
        }

        for (index, query) in candidates.iter().enumerate() {
            for address_type in [AddressType::Road, AddressType::Parcel] {
                if let Some((longitude, latitude, refined)) =
                    self.lookup(query, address_type).await?
                {
                    info!(
                        "Geocoded '{}' via '{}' ({}) on attempt {}",
                        address,
                        query,
                        address_type.as_str(),
                        index + 1
                    );
                    return Ok(GeocodeResult {
                        latitude,
                        longitude,
                        matched_address: refined.unwrap_or_else(|| query.clone()),
                        query: query.clone(),
                        address_type,
                        attempts: index + 1,
                    });
                }
            }
            debug!("No geocoding match for '{}'", query);
        }

        warn!("Geocoding failed for '{}' after {} attempts", address, candidates.len());
        Err(GeocodeError::NotFound {
            attempts: candidates.len(),
        })
    }

    async fn lookup(
        &self,
        address: &str,
        address_type: AddressType,
    ) -> Result<Option<(f64, f64, Option<String>)>, GeocodeError> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("service", "address"),
                ("request", "getcoord"),
                ("version", "2.0"),
                ("crs", "epsg:4326"),
                ("refine", "true"),
                ("simple", "false"),
                ("format", "json"),
                ("type", address_type.as_str()),
                ("address", address),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::Api(format!(
                "HTTP status {}",
                response.status()
            )));
        }

        let envelope: VWorldEnvelope = response.json().await?;
        let body = envelope.response;

        match body.status.as_str() {
            "OK" => {
                let Some(result) = body.result else {
                    return Ok(None);
                };
                let x = result.point.x.parse::<f64>();
                let y = result.point.y.parse::<f64>();
                match (x, y) {
                    (Ok(x), Ok(y)) => Ok(Some((x, y, body.refined.and_then(|r| r.text)))),
                    _ => Err(GeocodeError::Api("invalid point in response".to_string())),
                }
            }
            "NOT_FOUND" => Ok(None),
            _ => Err(GeocodeError::Api(
                body.error
                    .and_then(|e| e.text)
                    .unwrap_or_else(|| body.status.clone()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_strip_details_then_tokens() {
        let candidates =
            address_candidates("서울특별시 강남구 테헤란로 152 (역삼동, 강남파이낸스센터) 12층");
        assert_eq!(
            candidates,
            vec![
                "서울특별시 강남구 테헤란로 152 (역삼동, 강남파이낸스센터) 12층",
                "서울특별시 강남구 테헤란로 152 12층",
                "서울특별시 강남구 테헤란로 152",
                "서울특별시 강남구 테헤란로",
            ]
        );
    }

    #[test]
    fn test_candidates_are_capped() {
        let candidates = address_candidates("경기도 성남시 분당구 판교역로 235 에이치스퀘어 N동 7층");
        assert_eq!(candidates.len(), MAX_ATTEMPTS);
        assert_eq!(candidates[0], "경기도 성남시 분당구 판교역로 235 에이치스퀘어 N동 7층");
        assert_eq!(candidates[1], "경기도 성남시 분당구 판교역로 235 에이치스퀘어 N동");
    }

    #[test]
    fn test_candidates_keep_two_tokens() {
        let candidates = address_candidates("  세종특별자치시   한누리대로 ");
        assert_eq!(candidates, vec!["세종특별자치시 한누리대로"]);
    }

    #[test]
    fn test_candidates_comma_details() {
        let candidates = address_candidates("부산광역시 해운대구 센텀중앙로 79, 3층");
        assert_eq!(candidates[1], "부산광역시 해운대구 센텀중앙로 79");
    }

    #[test]
    fn test_empty_address() {
        assert!(address_candidates("   ").is_empty());
    }
}
