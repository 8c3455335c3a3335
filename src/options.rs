//! Binder configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::host::EventKind;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BinderOptions {
    /// Write controls back on `change` only, instead of on every `input`.
    #[serde(alias = "control-on-submit")]
    pub commit_on_submit: bool,
    /// Milliseconds between polled updates. Fractions are allowed.
    pub poll_interval: Option<f64>,
    /// Re-render everything after each write-back.
    pub update_on_change: bool,
}

impl BinderOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        debug!(?options, "loaded binder options");
        Ok(options)
    }

    pub fn commit_event(&self) -> EventKind {
        if self.commit_on_submit {
            EventKind::Change
        } else {
            EventKind::Input
        }
    }

    /// The polling period. Negative, NaN or out-of-range intervals mean no
    /// polling.
    pub fn poll_interval(&self) -> Option<Duration> {
        let millis = self.poll_interval?;
        match Duration::try_from_secs_f64(millis / 1000.0) {
            Ok(interval) => Some(interval),
            Err(_) => {
                warn!(poll_interval = millis, "ignoring unusable poll interval");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BindError;

    #[test]
    fn test_defaults() {
        let options = BinderOptions::from_json("{}").unwrap();
        assert_eq!(options, BinderOptions::default());
        assert_eq!(options.commit_event(), EventKind::Input);
        assert_eq!(options.poll_interval(), None);
    }

    #[test]
    fn test_kebab_case_keys() {
        let options = BinderOptions::from_json(
            r#"{"commit-on-submit": true, "poll-interval": 250, "update-on-change": true}"#,
        )
        .unwrap();
        assert!(options.commit_on_submit);
        assert!(options.update_on_change);
        assert_eq!(options.commit_event(), EventKind::Change);
        assert_eq!(options.poll_interval(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_fractional_poll_interval() {
        let options = BinderOptions::from_json(r#"{"poll-interval": 16.5}"#).unwrap();
        assert_eq!(options.poll_interval, Some(16.5));
        let interval = options.poll_interval().unwrap();
        assert!((interval.as_secs_f64() * 1000.0 - 16.5).abs() < 1e-6);
    }

    #[test]
    fn test_unusable_poll_interval_disables_polling() {
        let options = BinderOptions::from_json(r#"{"poll-interval": -40}"#).unwrap();
        assert_eq!(options.poll_interval(), None);

        let options = BinderOptions {
            poll_interval: Some(f64::NAN),
            ..Default::default()
        };
        assert_eq!(options.poll_interval(), None);
    }

    #[test]
    fn test_control_on_submit_alias() {
        let options = BinderOptions::from_json(r#"{"control-on-submit": true}"#).unwrap();
        assert!(options.commit_on_submit);
    }

    #[test]
    fn test_malformed_options() {
        let err = BinderOptions::from_json(r#"{"poll-interval": "soon"}"#).unwrap_err();
        assert!(matches!(err, BindError::Options(_)));
    }
}
