//! Positioning providers: the provider/delegate seam and a replay provider.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::BufRead;
use std::rc::Weak;

use log::{debug, trace};
use thiserror::Error;

use super::error::ProviderError;
use super::types::{Accuracy, AuthorizationStatus, Position};

// ─── Provider seam ──────────────────────────────────────────────

/// Callbacks a positioning provider delivers to its delegate.
pub trait PositioningDelegate {
    /// New fixes, oldest first.
    fn did_update_locations(&self, positions: &[Position]);
    fn did_fail_with_error(&self, error: ProviderError);
    fn did_change_authorization(&self, status: AuthorizationStatus);
}

/// A source of raw fixes.
///
/// All methods take `&self`; implementations keep their own interior state
/// and must not hold borrows while calling back into the delegate.
pub trait PositioningProvider {
    fn set_delegate(&self, delegate: Weak<dyn PositioningDelegate>);
    fn set_desired_accuracy(&self, accuracy: Accuracy);
    fn request_when_in_use_authorization(&self);
    fn start_updating_location(&self);
    fn stop_updating_location(&self);
}

// ─── Replay provider ────────────────────────────────────────────

/// One recorded provider callback.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayEvent {
    Fix(Position),
    Failure(ProviderError),
    Authorization(AuthorizationStatus),
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Cannot read fixes: {0}")]
    Io(#[from] std::io::Error),
    #[error("Line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

/// Replays recorded events into its delegate while updates are running.
pub struct ReplayProvider {
    delegate: RefCell<Option<Weak<dyn PositioningDelegate>>>,
    events: RefCell<VecDeque<ReplayEvent>>,
    running: Cell<bool>,
    accuracy: Cell<Accuracy>,
    status: Cell<AuthorizationStatus>,
}

impl ReplayProvider {
    pub fn new(events: impl IntoIterator<Item = ReplayEvent>) -> Self {
        Self {
            delegate: RefCell::new(None),
            events: RefCell::new(events.into_iter().collect()),
            running: Cell::new(false),
            accuracy: Cell::new(Accuracy::default()),
            status: Cell::new(AuthorizationStatus::NotDetermined),
        }
    }

    /// Build a provider from `lat,lon[,accuracy]` lines.
    pub fn from_reader(reader: impl BufRead) -> Result<Self, ReplayError> {
        let fixes = parse_fixes(reader)?;
        Ok(Self::new(fixes.into_iter().map(ReplayEvent::Fix)))
    }

    pub fn push(&self, event: ReplayEvent) {
        self.events.borrow_mut().push_back(event);
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    pub fn remaining(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn desired_accuracy(&self) -> Accuracy {
        self.accuracy.get()
    }

    pub fn authorization_status(&self) -> AuthorizationStatus {
        self.status.get()
    }

    /// Deliver the next event. Returns false when paused, exhausted,
    /// or the delegate is gone.
    pub fn step(&self) -> bool {
        if !self.running.get() {
            return false;
        }
        let Some(delegate) = self.delegate.borrow().as_ref().and_then(Weak::upgrade) else {
            return false;
        };
        let Some(event) = self.events.borrow_mut().pop_front() else {
            return false;
        };

        trace!("Replaying {:?}", event);
        match event {
            ReplayEvent::Fix(position) => delegate.did_update_locations(&[position]),
            ReplayEvent::Failure(error) => delegate.did_fail_with_error(error),
            ReplayEvent::Authorization(status) => {
                self.status.set(status);
                delegate.did_change_authorization(status);
            }
        }
        true
    }

    /// Step until paused or empty. Returns the number of events delivered.
    pub fn drain(&self) -> usize {
        let mut delivered = 0;
        while self.step() {
            delivered += 1;
        }
        delivered
    }
}

impl PositioningProvider for ReplayProvider {
    fn set_delegate(&self, delegate: Weak<dyn PositioningDelegate>) {
        *self.delegate.borrow_mut() = Some(delegate);
    }

    fn set_desired_accuracy(&self, accuracy: Accuracy) {
        self.accuracy.set(accuracy);
    }

    /// Recorded sessions have already been granted access.
    fn request_when_in_use_authorization(&self) {
        if self.status.get() == AuthorizationStatus::AuthorizedWhenInUse {
            return;
        }
        self.status.set(AuthorizationStatus::AuthorizedWhenInUse);
        let delegate = self.delegate.borrow().as_ref().and_then(Weak::upgrade);
        if let Some(delegate) = delegate {
            delegate.did_change_authorization(AuthorizationStatus::AuthorizedWhenInUse);
        }
    }

    fn start_updating_location(&self) {
        debug!("Replay provider started");
        self.running.set(true);
    }

    fn stop_updating_location(&self) {
        debug!("Replay provider paused ({} events left)", self.remaining());
        self.running.set(false);
    }
}

// ─── Fix parsing ────────────────────────────────────────────────

/// Parse `lat,lon[,accuracy]` lines. Blank lines and `#` comments are skipped.
pub fn parse_fixes(reader: impl BufRead) -> Result<Vec<Position>, ReplayError> {
    let mut fixes = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        fixes.push(parse_fix(trimmed).map_err(|reason| ReplayError::Parse { line: idx + 1, reason })?);
    }
    Ok(fixes)
}

fn parse_fix(s: &str) -> Result<Position, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if !(2..=3).contains(&parts.len()) {
        return Err(format!("expected 'lat,lon[,accuracy]', got '{}'", s));
    }
    let number = |field: &str, raw: &str| -> Result<f64, String> {
        raw.parse::<f64>()
            .map_err(|_| format!("invalid {} '{}'", field, raw))
    };

    let lat = number("latitude", parts[0])?;
    let lon = number("longitude", parts[1])?;
    let mut fix = Position::new(lat, lon);
    if !fix.coordinate.is_valid() {
        return Err("coordinates out of range (lat -90..90, lon -180..180)".into());
    }
    if let Some(raw) = parts.get(2) {
        fix = fix.with_accuracy(number("accuracy", raw)?);
    }
    Ok(fix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        fixes: RefCell<Vec<Position>>,
        errors: RefCell<Vec<ProviderError>>,
        statuses: RefCell<Vec<AuthorizationStatus>>,
    }

    impl PositioningDelegate for Recorder {
        fn did_update_locations(&self, positions: &[Position]) {
            self.fixes.borrow_mut().extend_from_slice(positions);
        }
        fn did_fail_with_error(&self, error: ProviderError) {
            self.errors.borrow_mut().push(error);
        }
        fn did_change_authorization(&self, status: AuthorizationStatus) {
            self.statuses.borrow_mut().push(status);
        }
    }

    fn wire(provider: &ReplayProvider) -> Rc<Recorder> {
        let recorder = Rc::new(Recorder::default());
        let as_delegate: Rc<dyn PositioningDelegate> = recorder.clone();
        provider.set_delegate(Rc::downgrade(&as_delegate));
        recorder
    }

    #[test]
    fn test_parse_fixes_skips_comments_and_blanks() {
        let input = "# recorded walk\n37.0,-122.0\n\n37.001, -122.0, 5\n";
        let fixes = parse_fixes(input.as_bytes()).unwrap();
        assert_eq!(fixes.len(), 2);
        assert_eq!(fixes[0].coordinate.lat, 37.0);
        assert_eq!(fixes[0].horizontal_accuracy, -1.0);
        assert_eq!(fixes[1].horizontal_accuracy, 5.0);
    }

    #[test]
    fn test_parse_fixes_reports_line() {
        let input = "37.0,-122.0\nnot-a-fix\n";
        match parse_fixes(input.as_bytes()) {
            Err(ReplayError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other.map(|f| f.len())),
        }
    }

    #[test]
    fn test_parse_fix_out_of_range() {
        assert!(parse_fix("95.0,10.0").is_err());
        assert!(parse_fix("1,2,3,4").is_err());
    }

    #[test]
    fn test_step_requires_running() {
        let provider = ReplayProvider::new(vec![ReplayEvent::Fix(Position::new(1.0, 2.0))]);
        let recorder = wire(&provider);
        assert!(!provider.step());
        provider.start_updating_location();
        assert!(provider.step());
        assert_eq!(recorder.fixes.borrow().len(), 1);
        assert!(!provider.step());
    }

    #[test]
    fn test_drain_stops_when_paused() {
        let provider = ReplayProvider::new(vec![
            ReplayEvent::Fix(Position::new(1.0, 2.0)),
            ReplayEvent::Failure(ProviderError::LocationUnknown),
            ReplayEvent::Authorization(AuthorizationStatus::Denied),
        ]);
        let recorder = wire(&provider);
        provider.start_updating_location();
        assert_eq!(provider.drain(), 3);
        assert_eq!(recorder.errors.borrow().as_slice(), &[ProviderError::LocationUnknown]);
        assert_eq!(recorder.statuses.borrow().as_slice(), &[AuthorizationStatus::Denied]);
        assert_eq!(provider.authorization_status(), AuthorizationStatus::Denied);
    }

    #[test]
    fn test_request_authorization_grants_once() {
        let provider = ReplayProvider::new(Vec::new());
        let recorder = wire(&provider);
        provider.request_when_in_use_authorization();
        provider.request_when_in_use_authorization();
        assert_eq!(
            recorder.statuses.borrow().as_slice(),
            &[AuthorizationStatus::AuthorizedWhenInUse]
        );
    }

    #[test]
    fn test_step_without_delegate() {
        let provider = ReplayProvider::new(vec![ReplayEvent::Fix(Position::new(1.0, 2.0))]);
        provider.start_updating_location();
        assert!(!provider.step());
        assert_eq!(provider.remaining(), 1);
    }
}
