use std::sync::LazyLock;

use prometheus::*;

static METRIC_RESOLVE_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "face_resolve_count",
        "count of face resolutions by outcome",
        &["outcome"]
    )
    .unwrap()
});

static METRIC_RESOLVE_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "face_resolve_duration",
        "duration of the per-image face resolution in seconds",
        &["outcome"]
    )
    .unwrap()
});

static METRIC_GALLERY_CACHE: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "face_gallery_cache_count",
        "count of gallery cache lookups by result",
        &["result"]
    )
    .unwrap()
});

static METRIC_GALLERY_URL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "face_gallery_url_count",
        "count of gallery image urls by source",
        &["source"]
    )
    .unwrap()
});

/// 人脸识别的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 没有检测到人脸
    NoFace,
    /// 匹配到已有人脸
    Matched,
    /// 创建了新的人脸
    Created,
    /// 人脸过小，没有创建
    Rejected,
}

impl Outcome {
    fn as_str(&self) -> &'static str {
        match self {
            Self::NoFace => "no_face",
            Self::Matched => "matched",
            Self::Created => "created",
            Self::Rejected => "rejected",
        }
    }
}

pub fn observe_resolve(outcome: Outcome, duration: f32) {
    let label = outcome.as_str();
    METRIC_RESOLVE_COUNT.with_label_values(&[label]).inc();
    METRIC_RESOLVE_DURATION.with_label_values(&[label]).observe(duration as f64);
}

/// `result` 取值为 `hit`、`miss`、`stale`、`error`
pub fn inc_gallery_cache(result: &str) {
    METRIC_GALLERY_CACHE.with_label_values(&[result]).inc();
}

/// `source` 取值为 `cache`、`signed`、`failed`
pub fn inc_gallery_url(source: &str) {
    METRIC_GALLERY_URL.with_label_values(&[source]).inc();
}

/// 以 Prometheus 文本格式导出默认注册表中的全部指标
pub fn render() -> Result<String> {
    let metric_families = prometheus::gather();
    TextEncoder::new().encode_to_string(&metric_families)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_contains_recorded_metrics() {
        observe_resolve(Outcome::Matched, 0.01);
        inc_gallery_cache("hit");
        inc_gallery_url("signed");

        let text = render().unwrap();
        assert!(text.contains(r#"face_resolve_count{outcome="matched"}"#));
        assert!(text.contains("face_resolve_duration_bucket"));
        assert!(text.contains(r#"face_gallery_cache_count{result="hit"}"#));
        assert!(text.contains(r#"face_gallery_url_count{source="signed"}"#));
    }
}
