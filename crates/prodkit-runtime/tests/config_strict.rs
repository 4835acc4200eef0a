#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use prodkit_core::BuildMetadata;
use prodkit_runtime::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
reporter:
  period_ms: 5000
  defualt_tags: ["env:prod"] # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "INVALID_CONFIG");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.reporter.period_ms, 5000);
    assert!(cfg.reporter.default_tags.is_empty());
    assert!(cfg.statsd.is_none());
    assert_eq!(cfg.healthz.listen, "0.0.0.0:8081");
    assert!(cfg.healthz.alive_on_start);
}

#[test]
fn full_config_maps_to_reporter_config() {
    let ok = r#"
version: 1
reporter:
  period_ms: 10000
  default_tags: ["env:prod", "team:core"]
  sample_rate: 0.5
statsd:
  addr: "127.0.0.1:8125"
healthz:
  listen: "127.0.0.1:9000"
  alive_on_start: false
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.statsd.as_ref().unwrap().addr, "127.0.0.1:8125");
    assert_eq!(cfg.healthz.listen_addr().unwrap().port(), 9000);

    let rc = cfg.reporter.to_reporter_config(BuildMetadata::default());
    assert_eq!(rc.period, Duration::from_secs(10));
    assert_eq!(rc.default_tags, vec!["env:prod", "team:core"]);
    assert_eq!(rc.sample_rate, 0.5);
    assert!(rc.validate().is_ok());
}

#[test]
fn rejects_unsupported_version() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert_eq!(err.code().as_str(), "UNSUPPORTED_VERSION");
}

#[test]
fn rejects_nonsensical_values() {
    let cases = [
        "version: 1\nreporter:\n  period_ms: 0\n",
        "version: 1\nreporter:\n  sample_rate: 0\n",
        "version: 1\nreporter:\n  default_tags: [\"\"]\n",
        "version: 1\nstatsd:\n  addr: \"\"\n",
        "version: 1\nhealthz:\n  listen: \"not-an-addr\"\n",
        "version: 1\nhealthz:\n  sample_rate: 2.0\n",
    ];
    for case in cases {
        let err = config::load_from_str(case).expect_err(case);
        assert_eq!(err.code().as_str(), "INVALID_CONFIG", "case={case}");
    }
}

#[test]
fn missing_file_is_io_error() {
    let err = config::load_from_file("does/not/exist.yaml").expect_err("must fail");
    assert_eq!(err.code().as_str(), "IO");
}
