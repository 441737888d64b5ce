//! Acquisition of the current position.
//!
//! A [`PositionSource`] answers through a [`PositionReply`] that may be
//! cloned and invoked any number of times; only the first answer counts.
//! [`Geolocator`] drives a single request at a time and bounds it with the
//! configured timeout.

use std::{
    fmt::Debug,
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::{
    config::GeolocationConfig,
    error::{GeolocationError, GeolocationErrorKind},
    query::Query,
};

pub const DEFAULT_IP_LOOKUP_URL: &str = "https://ipinfo.io/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeolocationOptions {
    pub enable_high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached position a source may hand back instead of a fresh one.
    pub maximum_age: Duration,
}

impl Default for GeolocationOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: false,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: Option<f64>,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_m: None,
        }
    }

    /// `lat,lon`, the form the query classifier reads as coordinates.
    pub fn to_query_string(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

type Outcome = Result<Position, GeolocationErrorKind>;
type Slot = Mutex<Option<oneshot::Sender<Outcome>>>;

/// Answer handle for one position request.
#[derive(Debug, Clone)]
pub struct PositionReply {
    slot: Arc<Slot>,
}

impl PositionReply {
    fn channel() -> (Self, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        let reply = Self {
            slot: Arc::new(Mutex::new(Some(tx))),
        };
        (reply, rx)
    }

    /// Returns false if the request was already settled.
    pub fn succeed(&self, position: Position) -> bool {
        settle(&self.slot, Ok(position))
    }

    /// Returns false if the request was already settled.
    pub fn fail(&self, kind: GeolocationErrorKind) -> bool {
        settle(&self.slot, Err(kind))
    }

    pub fn is_settled(&self) -> bool {
        self.slot.lock().is_none()
    }
}

fn settle(slot: &Slot, outcome: Outcome) -> bool {
    match slot.lock().take() {
        Some(tx) => {
            // The receiver may be gone if the requester stopped waiting.
            let _ = tx.send(outcome);
            true
        }
        None => {
            tracing::debug!(?outcome, "ignoring geolocation answer for a settled request");
            false
        }
    }
}

pub trait PositionSource: Send + Sync + Debug {
    /// Start a position request and answer through `reply`, now or later.
    fn request_position(&self, options: &GeolocationOptions, reply: PositionReply);
}

/// Single-shot position acquisition.
#[derive(Debug, Clone)]
pub struct Geolocator {
    source: Option<Arc<dyn PositionSource>>,
    options: GeolocationOptions,
    pending: Arc<AtomicBool>,
}

impl Geolocator {
    pub fn new(source: Arc<dyn PositionSource>, options: GeolocationOptions) -> Self {
        Self {
            source: Some(source),
            options,
            pending: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A geolocator whose every request fails as unsupported.
    pub fn unsupported() -> Self {
        Self {
            source: None,
            options: GeolocationOptions::default(),
            pending: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn from_config(config: &GeolocationConfig) -> Self {
        if !config.enabled {
            return Self::unsupported();
        }
        let source = IpPositionSource::new(config.endpoint.clone());
        Self::new(Arc::new(source), config.options())
    }

    pub fn options(&self) -> &GeolocationOptions {
        &self.options
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    /// Request the current position.
    ///
    /// Returns `Ok(None)` without asking the source when another request
    /// from this geolocator is still in flight.
    pub async fn locate(&self) -> Result<Option<Position>, GeolocationError> {
        let Some(source) = &self.source else {
            return Err(GeolocationErrorKind::Unsupported.into());
        };

        if self.pending.swap(true, Ordering::SeqCst) {
            tracing::debug!("location request already in flight, ignoring");
            return Ok(None);
        }
        let _pending = PendingGuard(&*self.pending);

        let (reply, mut rx) = PositionReply::channel();
        let slot: Weak<Slot> = Arc::downgrade(&reply.slot);
        source.request_position(&self.options, reply);

        let outcome = match tokio::time::timeout(self.options.timeout, &mut rx).await {
            Ok(Ok(outcome)) => outcome,
            // Every reply handle was dropped without an answer.
            Ok(Err(_)) => Err(GeolocationErrorKind::Unknown),
            Err(_) => {
                let timed_out = slot
                    .upgrade()
                    .is_some_and(|slot| settle(&slot, Err(GeolocationErrorKind::Timeout)));
                if timed_out {
                    Err(GeolocationErrorKind::Timeout)
                } else {
                    rx.try_recv().unwrap_or(Err(GeolocationErrorKind::Timeout))
                }
            }
        };

        match outcome {
            Ok(position) => {
                tracing::info!(
                    latitude = position.latitude,
                    longitude = position.longitude,
                    "location acquired"
                );
                Ok(Some(position))
            }
            Err(kind) => {
                tracing::warn!(?kind, "location request failed");
                Err(kind.into())
            }
        }
    }
}

struct PendingGuard<'a>(&'a AtomicBool);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Resolves the position from the public IP address.
#[derive(Debug, Clone)]
pub struct IpPositionSource {
    endpoint: String,
    http: Client,
    last_fix: Arc<Mutex<Option<(Instant, Position)>>>,
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    /// "latitude,longitude"
    #[serde(default)]
    loc: Option<String>,
    #[serde(default)]
    city: Option<String>,
}

impl IpPositionSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: Client::new(),
            last_fix: Arc::new(Mutex::new(None)),
        }
    }

    fn cached(&self, maximum_age: Duration) -> Option<Position> {
        let last_fix = *self.last_fix.lock();
        last_fix
            .filter(|(at, _)| at.elapsed() < maximum_age)
            .map(|(_, position)| position)
    }

    async fn lookup(&self) -> Result<Position, GeolocationErrorKind> {
        let res = self.http.get(&self.endpoint).send().await.map_err(|e| {
            tracing::warn!(error = %e, "IP lookup did not complete");
            GeolocationErrorKind::PositionUnavailable
        })?;

        match res.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(GeolocationErrorKind::PermissionDenied);
            }
            status if !status.is_success() => {
                tracing::warn!(%status, "IP lookup rejected");
                return Err(GeolocationErrorKind::PositionUnavailable);
            }
            _ => {}
        }

        let body: IpLookupResponse = res.json().await.map_err(|e| {
            tracing::warn!(error = %e, "IP lookup body did not decode");
            GeolocationErrorKind::Unknown
        })?;

        tracing::debug!(city = ?body.city, loc = ?body.loc, "IP lookup answered");

        match body.loc.as_deref().map(Query::parse) {
            Some(Ok(Query::Coordinates { lat, lon })) => Ok(Position::new(lat, lon)),
            _ => Err(GeolocationErrorKind::PositionUnavailable),
        }
    }
}

impl PositionSource for IpPositionSource {
    fn request_position(&self, options: &GeolocationOptions, reply: PositionReply) {
        if let Some(position) = self.cached(options.maximum_age) {
            reply.succeed(position);
            return;
        }

        if options.enable_high_accuracy {
            tracing::debug!("high accuracy requested; IP lookup is coarse");
        }

        let this = self.clone();
        tokio::spawn(async move {
            match this.lookup().await {
                Ok(position) => {
                    *this.last_fix.lock() = Some((Instant::now(), position));
                    reply.succeed(position);
                }
                Err(kind) => {
                    reply.fail(kind);
                }
            }
        });
    }
}
