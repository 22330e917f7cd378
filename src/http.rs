//! HTTP surface.
//!
//! Every response is wrapped in `{success, data}` or `{success: false,
//! message}`. Store and upstream calls are blocking and run on actix's
//! blocking pool.

use std::sync::Arc;
use std::thread;

use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError, delete, get, post, web};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::address_search::{AddressCandidate, SearchOptions, SuggestionCache, search_in_polygon};
use crate::composer::{compose_route, compose_segment, order_itinerary};
use crate::config::{Config, IsochroneProvider};
use crate::error::{GeoError, Result};
use crate::geometry::Coordinate;
use crate::haversine::CircleIsochrone;
use crate::nominatim::NominatimClient;
use crate::ors::OrsClient;
use crate::service_area::build_pickup_area;
use crate::store::SqliteStore;
use crate::traits::{Geocoder, Isochrone, ItinerarySource, PointId, PolygonId, TourId};

type SharedIsochrone = Arc<dyn Isochrone + Send + Sync>;
type SharedGeocoder = Arc<dyn Geocoder + Send + Sync>;

/// Shared state handed to every handler.
pub struct AppState {
    pub store: Arc<SqliteStore>,
    pub isochrone: SharedIsochrone,
    pub geocoder: SharedGeocoder,
    pub search: SearchOptions,
    pub suggestions: SuggestionCache,
}

impl AppState {
    /// Wires the configured upstream clients around `store`.
    ///
    /// May be called from inside the actix runtime. reqwest's blocking
    /// clients cannot be built on an async worker, so they are built on a
    /// scoped plain thread.
    pub fn from_config(config: &Config, store: SqliteStore) -> Result<Self> {
        let (isochrone, geocoder) = thread::scope(|scope| scope.spawn(|| upstream_clients(config)).join())
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic))?;

        Ok(Self {
            store: Arc::new(store),
            isochrone,
            geocoder,
            search: config.search.clone(),
            suggestions: SuggestionCache::with_capacity(config.search.suggestion_cache_capacity),
        })
    }
}

fn upstream_clients(config: &Config) -> Result<(SharedIsochrone, SharedGeocoder)> {
    let isochrone: SharedIsochrone = match config.isochrone_provider {
        IsochroneProvider::Ors => Arc::new(OrsClient::new(config.ors.clone())?),
        IsochroneProvider::Circle => Arc::new(CircleIsochrone::default()),
    };
    let geocoder: SharedGeocoder = Arc::new(NominatimClient::new(config.nominatim.clone())?);
    Ok((isochrone, geocoder))
}

#[derive(Debug, Serialize)]
struct Envelope<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(Envelope {
        success: true,
        data: Some(data),
        message: None,
    })
}

/// Handler failure rendered as a JSON envelope.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Geo(#[from] GeoError),
    #[error("blocking task failed")]
    Blocking,
}

impl From<BlockingError> for ApiError {
    fn from(_: BlockingError) -> Self {
        ApiError::Blocking
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Geo(GeoError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::Geo(GeoError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Geo(GeoError::UpstreamUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Geo(GeoError::Persistence(_)) | ApiError::Blocking => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(Envelope::<()> {
            success: false,
            data: None,
            message: Some(message),
        })
    }
}

fn parse_id(name: &str, raw: Option<&str>) -> std::result::Result<i64, GeoError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GeoError::InvalidInput(format!("{} is required", name)))?;
    raw.parse()
        .map_err(|_| GeoError::InvalidInput(format!("{} must be an integer, got '{}'", name, raw)))
}

#[get("/api/tours/{tour_id}/route")]
async fn tour_route(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> std::result::Result<HttpResponse, ApiError> {
    let tour_id = TourId(parse_id("tourId", Some(path.as_str()))?);

    let route = web::block(move || {
        let stops = state
            .store
            .itinerary(tour_id)?
            .ok_or_else(|| GeoError::NotFound(format!("tour {}", tour_id)))?;
        compose_route(state.store.as_ref(), order_itinerary(stops))
    })
    .await??;

    Ok(ok(route))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SegmentQuery {
    start_point_id: Option<String>,
    end_point_id: Option<String>,
}

#[get("/api/route")]
async fn point_to_point_route(
    state: web::Data<AppState>,
    query: web::Query<SegmentQuery>,
) -> std::result::Result<HttpResponse, ApiError> {
    let start = PointId(parse_id("startPointId", query.start_point_id.as_deref())?);
    let end = PointId(parse_id("endPointId", query.end_point_id.as_deref())?);

    let route = web::block(move || compose_segment(state.store.as_ref(), start, end)).await??;

    Ok(ok(route))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PickupAreaRequest {
    latitude: f64,
    longitude: f64,
    budget_meters: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PickupAreaResponse {
    polygon_id: PolygonId,
}

#[post("/api/pickup-areas")]
async fn create_pickup_area(
    state: web::Data<AppState>,
    body: web::Json<PickupAreaRequest>,
) -> std::result::Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    let center = Coordinate::new(request.latitude, request.longitude);

    let polygon_id = web::block(move || {
        build_pickup_area(
            state.isochrone.as_ref(),
            state.store.as_ref(),
            center,
            request.budget_meters,
        )
    })
    .await??;

    Ok(HttpResponse::Created().json(Envelope {
        success: true,
        data: Some(PickupAreaResponse { polygon_id }),
        message: None,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddressQuery {
    #[serde(default)]
    q: String,
    polygon_id: Option<String>,
    session: Option<String>,
}

#[derive(Debug, Serialize)]
struct AddressResponse {
    status: &'static str,
    candidates: Vec<AddressCandidate>,
}

#[get("/api/addresses")]
async fn search_address(
    state: web::Data<AppState>,
    query: web::Query<AddressQuery>,
) -> std::result::Result<HttpResponse, ApiError> {
    let query = query.into_inner();
    let polygon = query
        .polygon_id
        .as_deref()
        .map(|raw| parse_id("polygonId", Some(raw)).map(PolygonId))
        .transpose()?;

    let response = web::block(move || -> Result<AddressResponse> {
        if let (true, Some(polygon), Some(session)) =
            (query.q.trim().is_empty(), polygon, query.session.as_deref())
        {
            let candidates = state.suggestions.default_suggestions(
                state.geocoder.as_ref(),
                state.store.as_ref(),
                &state.search,
                session,
                polygon,
            )?;
            return Ok(AddressResponse {
                status: "suggestions",
                candidates,
            });
        }

        let outcome = search_in_polygon(
            state.geocoder.as_ref(),
            state.store.as_ref(),
            &state.search,
            &query.q,
            polygon,
        )?;
        Ok(AddressResponse {
            status: outcome.status(),
            candidates: outcome.into_candidates(),
        })
    })
    .await??;

    Ok(ok(response))
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    session: Option<String>,
}

#[delete("/api/addresses/suggestions")]
async fn clear_suggestions(
    state: web::Data<AppState>,
    query: web::Query<SessionQuery>,
) -> std::result::Result<HttpResponse, ApiError> {
    let session = query
        .session
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GeoError::InvalidInput("session is required".to_string()))?;
    state.suggestions.clear(session);
    Ok(ok(()))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::from(GeoError::InvalidInput(err.to_string())).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        ApiError::from(GeoError::InvalidInput(err.to_string())).into()
    }))
    .service(tour_route)
    .service(point_to_point_route)
    .service(create_pickup_area)
    .service(search_address)
    .service(clear_suggestions);
}
