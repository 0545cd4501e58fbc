use std::time::Instant;

#[derive(prometheus_metric_storage::MetricStorage, Clone, Debug)]
pub(crate) struct Metrics {
    /// Number of completed gateway requests.
    #[metric(labels("endpoint", "outcome"))]
    gateway_requests: prometheus::IntCounterVec,

    /// Execution time of each gateway request.
    #[metric(labels("endpoint"))]
    gateway_request_duration_seconds: prometheus::HistogramVec,

    /// Traffic of event subscriptions.
    #[metric(labels("result"))]
    gateway_events: prometheus::IntCounterVec,
}

impl Metrics {
    pub fn get() -> &'static Self {
        Metrics::instance(observe::metrics::get_storage_registry()).unwrap()
    }

    /// Starts timing a request; the duration is recorded when the returned
    /// guard is dropped.
    pub fn on_request_start(&self, endpoint: &'static str) -> impl Drop + use<'_> {
        let start = Instant::now();
        scopeguard::guard(start, move |start| {
            self.gateway_request_duration_seconds
                .with_label_values(&[endpoint])
                .observe(start.elapsed().as_secs_f64());
        })
    }

    pub fn on_request_completed(&self, endpoint: &str, outcome: &str) {
        self.gateway_requests
            .with_label_values(&[endpoint, outcome])
            .inc();
    }

    pub fn on_event(&self, result: &str) {
        self.gateway_events.with_label_values(&[result]).inc();
    }
}
