//! # Metrics
//!
//! Counters and histograms for the cache-aside path, recorded through the
//! `metrics` facade and exported in Prometheus text format. Recording is a no-op
//! until [`install_recorder`] has been called, so tests never need a recorder.

use ::metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

use crate::caching::ResourceKind;
use crate::core::error::{ProxyError, ProxyResult};

pub const CACHE_HITS: &str = "shl_proxy_cache_hits_total";
pub const CACHE_MISSES: &str = "shl_proxy_cache_misses_total";
pub const UPSTREAM_REQUESTS: &str = "shl_proxy_upstream_requests_total";
pub const UPSTREAM_FAILURES: &str = "shl_proxy_upstream_failures_total";
pub const UPSTREAM_DURATION: &str = "shl_proxy_upstream_duration_seconds";

const UPSTREAM_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0];

/// Install the global Prometheus recorder and describe the proxy's metrics
pub fn install_recorder() -> ProxyResult<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(UPSTREAM_DURATION.to_string()), UPSTREAM_BUCKETS)
        .map_err(|e| ProxyError::internal(format!("Failed to set histogram buckets: {}", e)))?
        .install_recorder()
        .map_err(|e| ProxyError::internal(format!("Failed to install metrics recorder: {}", e)))?;

    describe_counter!(CACHE_HITS, "Resource requests answered from the cache");
    describe_counter!(CACHE_MISSES, "Resource requests that missed the cache");
    describe_counter!(UPSTREAM_REQUESTS, "Statistics API fetches, retries included");
    describe_counter!(UPSTREAM_FAILURES, "Statistics API calls that failed after retries");
    describe_histogram!(
        UPSTREAM_DURATION,
        Unit::Seconds,
        "Statistics API fetch latency"
    );

    Ok(handle)
}

pub fn record_cache_lookup(kind: ResourceKind, hit: bool) {
    let name = if hit { CACHE_HITS } else { CACHE_MISSES };
    counter!(name, "resource" => kind.as_str()).increment(1);
}

pub fn record_upstream(kind: ResourceKind, elapsed: Duration, success: bool) {
    counter!(UPSTREAM_REQUESTS, "resource" => kind.as_str()).increment(1);
    histogram!(UPSTREAM_DURATION, "resource" => kind.as_str()).record(elapsed.as_secs_f64());
    if !success {
        counter!(UPSTREAM_FAILURES, "resource" => kind.as_str()).increment(1);
    }
}
