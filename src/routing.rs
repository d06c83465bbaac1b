//! Geocoding (Nominatim) and driving routes (OSRM)
//!
//! Every call is attempted once with its own timeout. Failures are logged and
//! surface as `None`, an empty list or an unsuccessful [`RouteInfo`].

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::cache;
use crate::config::{CacheConfig, ServicesConfig};
use crate::models::Location;

const METERS_PER_MILE: f64 = 1_609.344;
/// Shorter address queries are not sent to the geocoder
pub const MIN_ADDRESS_QUERY_LEN: usize = 3;

/// Distance and free-flow duration of one driving route
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    pub distance_mi: f64,
    pub duration_min: f64,
}

/// Outcome of resolving two addresses into a driving route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub success: bool,
    pub distance_mi: Option<f64>,
    pub duration_min: Option<f64>,
    pub origin: Option<Location>,
    pub destination: Option<Location>,
    pub error: Option<String>,
}

impl RouteInfo {
    #[must_use]
    pub fn found(origin: Location, destination: Location, leg: RouteLeg) -> Self {
        Self {
            success: true,
            distance_mi: Some(leg.distance_mi),
            duration_min: Some(leg.duration_min),
            origin: Some(origin),
            destination: Some(destination),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            distance_mi: None,
            duration_min: None,
            origin: None,
            destination: None,
            error: Some(error.into()),
        }
    }
}

/// Geocoding and routing collaborator
#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// Best match for `address`, if any
    async fn geocode(&self, address: &str) -> Option<Location>;

    /// Autocomplete suggestions (display names) for a partial address
    async fn search_addresses(&self, query: &str, limit: usize) -> Vec<String>;

    /// Driving leg between two resolved points
    async fn route(&self, origin: &Location, destination: &Location) -> Result<RouteLeg>;

    /// Geocode both addresses and route between them
    async fn driving_info(&self, origin_address: &str, destination_address: &str) -> RouteInfo {
        let Some(origin) = self.geocode(origin_address).await else {
            return RouteInfo::failed(format!("Could not geocode: {origin_address}"));
        };
        let Some(destination) = self.geocode(destination_address).await else {
            return RouteInfo::failed(format!("Could not geocode: {destination_address}"));
        };

        match self.route(&origin, &destination).await {
            Ok(leg) => RouteInfo::found(origin, destination, leg),
            Err(e) => {
                warn!("Routing failed: {e:#}");
                RouteInfo::failed("Routing failed")
            }
        }
    }
}

/// Metres to miles, rounded to one decimal
#[must_use]
pub fn meters_to_miles(meters: f64) -> f64 {
    round_tenth(meters / METERS_PER_MILE)
}

/// Seconds to minutes, rounded to one decimal
#[must_use]
pub fn seconds_to_minutes(seconds: f64) -> f64 {
    round_tenth(seconds / 60.0)
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: Option<String>,
}

impl NominatimPlace {
    fn into_location(self, query: &str) -> Option<Location> {
        let latitude = self.lat.parse().ok()?;
        let longitude = self.lon.parse().ok()?;
        let name = self
            .display_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| query.to_string());
        Some(Location::new(latitude, longitude, name))
    }
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    /// Metres
    distance: f64,
    /// Seconds
    duration: f64,
}

impl OsrmResponse {
    fn into_leg(self) -> Result<RouteLeg> {
        if self.code != "Ok" {
            return Err(anyhow!("OSRM returned code {}", self.code));
        }
        let route = self
            .routes
            .into_iter()
            .next()
            .ok_or(anyhow!("No routes in response"))?;
        Ok(RouteLeg {
            distance_mi: meters_to_miles(route.distance),
            duration_min: seconds_to_minutes(route.duration),
        })
    }
}

fn route_cache_key(origin: &Location, destination: &Location) -> String {
    format!(
        "route:{:.4},{:.4}:{:.4},{:.4}",
        origin.latitude, origin.longitude, destination.latitude, destination.longitude
    )
}

/// [`RouteProvider`] backed by the public Nominatim and OSRM services
pub struct OsmRouteProvider {
    client: reqwest::Client,
    services: ServicesConfig,
    route_ttl: Duration,
    address_search_ttl: Duration,
}

impl OsmRouteProvider {
    pub fn new(services: &ServicesConfig, cache: &CacheConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(services.user_agent.clone())
            .build()
            .with_context(|| "Failed to create HTTP client")?;
        Ok(Self {
            client,
            services: services.clone(),
            route_ttl: cache.route_ttl(),
            address_search_ttl: cache.address_search_ttl(),
        })
    }

    async fn nominatim_search(
        &self,
        query: &str,
        limit: usize,
        us_only: bool,
        timeout: Duration,
    ) -> Result<Vec<NominatimPlace>> {
        let mut url = format!(
            "{}/search?q={}&format=json&limit={limit}",
            self.services.nominatim_url,
            urlencoding::encode(query)
        );
        if us_only {
            url.push_str("&addressdetails=1&countrycodes=us");
        }
        debug!("Calling Nominatim");
        let places = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(places)
    }

    async fn osrm_route(&self, origin: &Location, destination: &Location) -> Result<RouteLeg> {
        // OSRM takes lon,lat pairs
        let url = format!(
            "{}/route/v1/driving/{},{};{},{}?overview=false",
            self.services.osrm_url,
            origin.longitude,
            origin.latitude,
            destination.longitude,
            destination.latitude
        );
        debug!("Calling OSRM");
        let response: OsrmResponse = self
            .client
            .get(url)
            .timeout(self.services.route_timeout())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response.into_leg()
    }
}

#[async_trait]
impl RouteProvider for OsmRouteProvider {
    #[instrument(skip(self))]
    async fn geocode(&self, address: &str) -> Option<Location> {
        match self
            .nominatim_search(address, 1, false, self.services.geocode_timeout())
            .await
        {
            Ok(places) => places.into_iter().next()?.into_location(address),
            Err(e) => {
                warn!("Geocoding error for '{address}': {e:#}");
                None
            }
        }
    }

    #[instrument(skip(self))]
    async fn search_addresses(&self, query: &str, limit: usize) -> Vec<String> {
        let query = query.trim();
        if query.chars().count() < MIN_ADDRESS_QUERY_LEN {
            return Vec::new();
        }

        let key = format!("search:{}:{limit}", query.to_lowercase());
        if let Some(cached) = cache::lookup::<Vec<String>>(&key).await {
            return cached;
        }

        match self
            .nominatim_search(query, limit, true, self.services.address_search_timeout())
            .await
        {
            Ok(places) => {
                let names: Vec<String> = places
                    .into_iter()
                    .filter_map(|place| place.display_name)
                    .filter(|name| !name.is_empty())
                    .collect();
                cache::store(&key, names.clone(), self.address_search_ttl).await;
                names
            }
            Err(e) => {
                warn!("Address search error for '{query}': {e:#}");
                Vec::new()
            }
        }
    }

    #[instrument(skip(self), fields(origin = %origin.name, destination = %destination.name))]
    async fn route(&self, origin: &Location, destination: &Location) -> Result<RouteLeg> {
        let key = route_cache_key(origin, destination);
        if let Some(cached) = cache::lookup::<RouteLeg>(&key).await {
            return Ok(cached);
        }

        let leg = self.osrm_route(origin, destination).await?;
        cache::store(&key, leg, self.route_ttl).await;
        Ok(leg)
    }
}
