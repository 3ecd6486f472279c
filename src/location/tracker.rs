//! The location tracker — debounced reverse geocoding with change observers.
//!
//! Flow: provider fix → distance gate → reverse geocode → distance gate
//! (against whatever was committed meanwhile) → store → publish.
//!
//! Everything runs on one thread. The tracker lives in an `Rc`, registers
//! itself with the provider as a weak delegate, and geocode completions hold
//! only a weak handle back to it.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use log::{debug, info, warn};

use super::error::{LocationError, ProviderError};
use super::geocoder::{GeocodeResponse, Placemark, ReverseGeocoder};
use super::providers::{PositioningDelegate, PositioningProvider};
use super::types::{
    Accuracy, AuthorizationModel, AuthorizationStatus, LifecycleEvent, Location, LocationResult,
    Position, Reason,
};

/// Fixes closer than this (meters) to the last resolved location are ignored.
pub const UPDATE_THRESHOLD_M: f64 = 100.0;

/// Callback invoked with every published result.
pub type Observer = Rc<dyn Fn(&LocationResult)>;

/// Handle returned by `add_location_change_observer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

pub struct LocationTracker {
    provider: Rc<dyn PositioningProvider>,
    geocoder: Rc<dyn ReverseGeocoder>,
    authorization: AuthorizationModel,
    last_result: RefCell<LocationResult>,
    observers: RefCell<Vec<(ObserverId, Observer)>>,
    next_observer_id: Cell<u64>,
    this: Weak<LocationTracker>,
}

impl LocationTracker {
    /// Create a tracker, register it as the provider's delegate, and start updates.
    pub fn new(
        provider: Rc<dyn PositioningProvider>,
        geocoder: Rc<dyn ReverseGeocoder>,
        authorization: AuthorizationModel,
    ) -> Rc<Self> {
        let tracker = Rc::new_cyclic(|this| Self {
            provider,
            geocoder,
            authorization,
            last_result: RefCell::new(LocationResult::default()),
            observers: RefCell::new(Vec::new()),
            next_observer_id: Cell::new(0),
            this: this.clone(),
        });

        let weak: Weak<LocationTracker> = Rc::downgrade(&tracker);
        let delegate: Weak<dyn PositioningDelegate> = weak;
        tracker.provider.set_delegate(delegate);
        tracker.provider.set_desired_accuracy(Accuracy::Best);
        tracker.provider.request_when_in_use_authorization();
        tracker.provider.start_updating_location();

        tracker
    }

    /// The last published result. Starts as `Failure(NoData)`.
    pub fn current_location(&self) -> LocationResult {
        self.last_result.borrow().clone()
    }

    pub fn add_location_change_observer(
        &self,
        observer: impl Fn(&LocationResult) + 'static,
    ) -> ObserverId {
        let id = ObserverId(self.next_observer_id.get());
        self.next_observer_id.set(id.0 + 1);
        let observer: Observer = Rc::new(observer);
        self.observers.borrow_mut().push((id, observer));
        id
    }

    /// Returns false if `id` was not registered.
    pub fn remove_location_change_observer(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() != before
    }

    #[cfg(test)]
    fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    pub fn on_enter_background(&self) {
        debug!("Entering background, pausing location updates");
        self.provider.stop_updating_location();
    }

    pub fn on_enter_foreground(&self) {
        debug!("Entering foreground, resuming location updates");
        self.provider.start_updating_location();
    }

    pub fn handle_lifecycle_event(&self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::EnterBackground => self.on_enter_background(),
            LifecycleEvent::EnterForeground => self.on_enter_foreground(),
        }
    }

    // ─── Gates ──────────────────────────────────────────────────

    fn should_update_with_location(&self, candidate: &Position) -> bool {
        match &*self.last_result.borrow() {
            LocationResult::Success(last) => {
                candidate.distance_from(&last.physical) > UPDATE_THRESHOLD_M
            }
            LocationResult::Failure(_) => true,
        }
    }

    fn should_update_with_result(&self, result: &LocationResult) -> bool {
        match result {
            LocationResult::Success(location) => self.should_update_with_location(&location.physical),
            LocationResult::Failure(_) => true,
        }
    }

    // ─── Publishing ─────────────────────────────────────────────

    fn publish_change_with_result(&self, result: &LocationResult) {
        // Snapshot so observers may add or remove observers.
        let observers: Vec<Observer> = self
            .observers
            .borrow()
            .iter()
            .map(|(_, observer)| Rc::clone(observer))
            .collect();
        for observer in observers {
            observer(result);
        }
    }

    /// Gate against the previous state, store, then notify. Observers may
    /// trigger nested commits; those land after this one is stored.
    fn commit(&self, result: LocationResult) {
        match &result {
            LocationResult::Success(location) => info!("Location: {}", location.display_line()),
            LocationResult::Failure(reason) => warn!("Location unavailable: {}", reason),
        }
        let notify = self.should_update_with_result(&result);
        *self.last_result.borrow_mut() = result.clone();
        if notify {
            self.publish_change_with_result(&result);
        } else {
            debug!("Result did not move far enough, not notifying");
        }
    }

    fn complete_geocode(&self, fix: Position, response: GeocodeResponse) {
        let placemarks = match response {
            Ok(placemarks) => placemarks,
            Err(e) => {
                self.commit(failure(e.into()));
                return;
            }
        };

        let (city, state, neighborhood) = match place_names(placemarks.into_iter().next()) {
            Ok(names) => names,
            Err(e) => {
                self.commit(failure(e));
                return;
            }
        };

        // Another fix may have been committed while this lookup was in flight.
        if !self.should_update_with_location(&fix) {
            debug!("Dropping geocode for {}: superseded", fix.coordinate);
            return;
        }

        self.commit(LocationResult::Success(Location::new(fix, city, state, neighborhood)));
    }
}

fn failure(error: LocationError) -> LocationResult {
    LocationResult::Failure(Reason::Other(error))
}

fn place_names(placemark: Option<Placemark>) -> Result<(String, String, String), LocationError> {
    let p = placemark.ok_or(LocationError::NoPlacemark)?;
    let city = p
        .locality
        .ok_or(LocationError::IncompletePlacemark { missing: "city" })?;
    let state = p
        .administrative_area
        .ok_or(LocationError::IncompletePlacemark { missing: "state" })?;
    let neighborhood = p
        .sub_locality
        .ok_or(LocationError::IncompletePlacemark { missing: "neighborhood" })?;
    Ok((city, state, neighborhood))
}

impl PositioningDelegate for LocationTracker {
    fn did_update_locations(&self, positions: &[Position]) {
        let Some(candidate) = positions.first() else {
            return;
        };
        if !self.should_update_with_location(candidate) {
            debug!("Ignoring fix at {}: within {} m", candidate.coordinate, UPDATE_THRESHOLD_M);
            return;
        }

        let this = self.this.clone();
        let fix = candidate.clone();
        self.geocoder.reverse_geocode(
            candidate,
            Box::new(move |response| match this.upgrade() {
                Some(tracker) => tracker.complete_geocode(fix, response),
                None => debug!("Tracker dropped before geocode completed"),
            }),
        );
    }

    fn did_fail_with_error(&self, error: ProviderError) {
        self.commit(failure(error.into()));
    }

    fn did_change_authorization(&self, status: AuthorizationStatus) {
        debug!("Authorization changed: {:?}", status);
        match (self.authorization, status) {
            (AuthorizationModel::Unrestricted, _)
            | (AuthorizationModel::RuntimePermission, AuthorizationStatus::AuthorizedWhenInUse) => {
                self.provider.start_updating_location()
            }
            (AuthorizationModel::RuntimePermission, _) => {
                self.provider.request_when_in_use_authorization()
            }
        }
    }
}
