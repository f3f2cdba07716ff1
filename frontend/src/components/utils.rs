use super::super::Model;
use gloo_file::File as GlooFile;
use gloo_timers::callback::Timeout;
use std::cell::RefCell;
use std::rc::Rc;
use yew::prelude::*;

pub const ACCEPTED_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

// Debounce function to limit button events
pub fn debounce<F>(duration: i32, callback: F) -> Callback<MouseEvent>
where
    F: Fn() + Clone + 'static,
{
    let timeout = Rc::new(RefCell::new(None::<Timeout>));
    let timeout_clone = Rc::clone(&timeout);

    Callback::from(move |_| {
        let mut timeout_ref = timeout_clone.borrow_mut();

        if let Some(old_timeout) = timeout_ref.take() {
            old_timeout.cancel();
        }

        let inner_callback = callback.clone();
        let new_timeout = Timeout::new(duration as u32, move || {
            inner_callback();
        });

        *timeout_ref = Some(new_timeout);
    })
}

/// Tracks the one prediction request allowed in flight. Responses carrying
/// any ticket but the current one are stale and must be dropped.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: u32,
    in_flight: bool,
}

impl RequestTracker {
    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// Returns a ticket for a new request, or `None` while one is pending.
    pub fn start(&mut self) -> Option<u32> {
        if self.in_flight {
            return None;
        }
        self.latest = self.latest.wrapping_add(1);
        self.in_flight = true;
        Some(self.latest)
    }

    /// Settles the request for `ticket`. False means the response is stale.
    pub fn finish(&mut self, ticket: u32) -> bool {
        if self.in_flight && ticket == self.latest {
            self.in_flight = false;
            true
        } else {
            false
        }
    }
}

pub fn accepted_image(file: &GlooFile) -> bool {
    ACCEPTED_TYPES.contains(&file.raw_mime_type().as_str())
}

pub fn render_error_message(model: &Model) -> Html {
    if let Some(error_msg) = &model.error {
        html! {
            <div class="error-message">
                <i class="fa-solid fa-circle-exclamation"></i>
                <p>{ error_msg }</p>
            </div>
        }
    } else {
        html! {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_request_refused_while_pending() {
        let mut tracker = RequestTracker::default();
        let first = tracker.start().unwrap();
        assert!(tracker.is_busy());
        assert_eq!(tracker.start(), None);

        assert!(tracker.finish(first));
        assert!(!tracker.is_busy());
    }

    #[test]
    fn test_stale_response_is_dropped() {
        let mut tracker = RequestTracker::default();
        let first = tracker.start().unwrap();
        assert!(tracker.finish(first));
        let second = tracker.start().unwrap();

        assert!(!tracker.finish(first));
        assert!(tracker.is_busy());
        assert!(tracker.finish(second));
        assert!(!tracker.finish(second));
    }
}
