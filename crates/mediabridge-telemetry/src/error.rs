//! Failures from installing the log subscriber and from the reconcile metrics registry.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use prometheus::Error as PrometheusError;

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Ways [`crate::init_logging`] and [`crate::ReconcileMetrics`] can fail.
#[derive(Debug)]
pub enum TelemetryError {
    /// The global log subscriber could not be set, usually because one already is.
    SubscriberInstall {
        /// Error from `tracing_subscriber`.
        source: tracing_subscriber::util::TryInitError,
    },
    /// A reconcile counter or gauge had an invalid name or label set.
    MetricsCollector {
        /// Metric name.
        name: &'static str,
        /// Error from `prometheus`.
        source: PrometheusError,
    },
    /// The registry rejected a collector, usually a duplicate name.
    MetricsRegister {
        /// Metric name.
        name: &'static str,
        /// Error from `prometheus`.
        source: PrometheusError,
    },
    /// Text exposition of the registry failed.
    MetricsEncode {
        /// Error from `prometheus`.
        source: PrometheusError,
    },
    /// The text encoder emitted bytes that are not UTF-8.
    MetricsUtf8 {
        /// Conversion error.
        source: std::string::FromUtf8Error,
    },
}

impl Display for TelemetryError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubscriberInstall { .. } => {
                formatter.write_str("could not install log subscriber")
            }
            Self::MetricsCollector { name, .. } => {
                write!(formatter, "invalid reconcile metric {name}")
            }
            Self::MetricsRegister { name, .. } => {
                write!(formatter, "could not register reconcile metric {name}")
            }
            Self::MetricsEncode { .. } => {
                formatter.write_str("could not render reconcile metrics")
            }
            Self::MetricsUtf8 { .. } => {
                formatter.write_str("rendered reconcile metrics are not utf-8")
            }
        }
    }
}

impl Error for TelemetryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SubscriberInstall { source } => Some(source),
            Self::MetricsCollector { source, .. }
            | Self::MetricsRegister { source, .. }
            | Self::MetricsEncode { source } => Some(source),
            Self::MetricsUtf8 { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_metric() {
        let prometheus = || PrometheusError::Msg("bad".to_string());
        let cases = vec![
            (
                TelemetryError::MetricsCollector {
                    name: "reconcile_cycles_total",
                    source: prometheus(),
                },
                "invalid reconcile metric reconcile_cycles_total",
            ),
            (
                TelemetryError::MetricsRegister {
                    name: "inventory_rows",
                    source: prometheus(),
                },
                "could not register reconcile metric inventory_rows",
            ),
            (
                TelemetryError::MetricsEncode {
                    source: prometheus(),
                },
                "could not render reconcile metrics",
            ),
            (
                TelemetryError::MetricsUtf8 {
                    source: String::from_utf8(vec![0, 159]).expect_err("invalid utf-8"),
                },
                "rendered reconcile metrics are not utf-8",
            ),
        ];

        for (err, message) in cases {
            assert_eq!(err.to_string(), message);
            assert!(err.source().is_some());
        }
    }
}
