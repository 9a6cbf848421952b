use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("congressgpt.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter =
    Counter::new("congressgpt.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("congressgpt.client.request_duration_seconds");

pub(crate) static AUTH_REFRESHES: Counter = Counter::new("congressgpt.auth.refreshes");
pub(crate) static AUTH_REFRESH_ERRORS: Counter = Counter::new("congressgpt.auth.refresh_errors");

pub(crate) static TRANSCRIPT_SUBMITS: Counter = Counter::new("congressgpt.transcript.submits");
pub(crate) static TRANSCRIPT_REJECTED: Counter = Counter::new("congressgpt.transcript.rejected");
pub(crate) static TRANSCRIPT_STALE: Counter =
    Counter::new("congressgpt.transcript.stale_completions");
pub(crate) static TRANSCRIPT_SUBMIT_DURATION: Moments =
    Moments::new("congressgpt.transcript.submit_duration_seconds");

pub(crate) static RATING_UPDATES: Counter = Counter::new("congressgpt.rating.updates");
pub(crate) static RATING_UPDATE_ERRORS: Counter =
    Counter::new("congressgpt.rating.update_errors");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&AUTH_REFRESHES);
    collector.register_counter(&AUTH_REFRESH_ERRORS);

    collector.register_counter(&TRANSCRIPT_SUBMITS);
    collector.register_counter(&TRANSCRIPT_REJECTED);
    collector.register_counter(&TRANSCRIPT_STALE);
    collector.register_moments(&TRANSCRIPT_SUBMIT_DURATION);

    collector.register_counter(&RATING_UPDATES);
    collector.register_counter(&RATING_UPDATE_ERRORS);
}
