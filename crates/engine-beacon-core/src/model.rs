//! Metric family model shared by both decoders.
//!
//! Only labels are consumed downstream; sample values are kept so the model
//! round-trips through both encoders.

use std::collections::BTreeMap;

/// Label name to value, built per metric. Last write wins on duplicate names.
pub type LabelMap = BTreeMap<String, String>;

/// Family type as declared by `# TYPE` or the protobuf `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricType {
    Counter,
    Gauge,
    Summary,
    #[default]
    Untyped,
    Histogram,
    GaugeHistogram,
}

impl MetricType {
    /// Keyword used on `# TYPE` lines.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::Summary => "summary",
            MetricType::Untyped => "untyped",
            MetricType::Histogram => "histogram",
            MetricType::GaugeHistogram => "gaugehistogram",
        }
    }

    /// Parse a `# TYPE` keyword. `gaugehistogram` has no text form.
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "counter" => Some(MetricType::Counter),
            "gauge" => Some(MetricType::Gauge),
            "summary" => Some(MetricType::Summary),
            "untyped" => Some(MetricType::Untyped),
            "histogram" => Some(MetricType::Histogram),
            _ => None,
        }
    }

    pub(crate) fn is_histogram(self) -> bool {
        matches!(self, MetricType::Histogram | MetricType::GaugeHistogram)
    }
}

/// A single `name="value"` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One quantile of a summary.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantile {
    pub quantile: f64,
    pub value: f64,
}

/// One cumulative histogram bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub upper_bound: f64,
    pub cumulative_count: u64,
}

/// Sample value of a metric.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Counter(f64),
    Gauge(f64),
    Untyped(f64),
    Summary {
        sample_count: u64,
        sample_sum: f64,
        quantiles: Vec<Quantile>,
    },
    Histogram {
        sample_count: u64,
        sample_sum: f64,
        buckets: Vec<Bucket>,
    },
}

impl Value {
    /// Empty value of the shape a family of `kind` carries.
    pub fn empty_for(kind: MetricType) -> Self {
        match kind {
            MetricType::Counter => Value::Counter(0.0),
            MetricType::Gauge => Value::Gauge(0.0),
            MetricType::Untyped => Value::Untyped(0.0),
            MetricType::Summary => Value::Summary {
                sample_count: 0,
                sample_sum: 0.0,
                quantiles: Vec::new(),
            },
            MetricType::Histogram | MetricType::GaugeHistogram => Value::Histogram {
                sample_count: 0,
                sample_sum: 0.0,
                buckets: Vec::new(),
            },
        }
    }

    /// Scalar value of the shape a family of `kind` carries.
    pub fn scalar_for(kind: MetricType, v: f64) -> Self {
        match kind {
            MetricType::Counter => Value::Counter(v),
            MetricType::Gauge => Value::Gauge(v),
            _ => Value::Untyped(v),
        }
    }
}

/// One labeled instance within a family.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub labels: Vec<Label>,
    pub value: Value,
    pub timestamp_ms: Option<i64>,
}

impl Metric {
    pub fn new(labels: Vec<Label>, value: Value) -> Self {
        Self {
            labels,
            value,
            timestamp_ms: None,
        }
    }

    /// Build the label map for this metric.
    pub fn label_map(&self) -> LabelMap {
        self.labels
            .iter()
            .map(|l| (l.name.clone(), l.value.clone()))
            .collect()
    }

    /// Value of the label called `name`, if present.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .rev()
            .find(|l| l.name == name)
            .map(|l| l.value.as_str())
    }
}

/// A named group of metrics, kept in received order.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub name: String,
    pub help: String,
    pub kind: MetricType,
    pub metrics: Vec<Metric>,
}

impl MetricFamily {
    pub fn new(name: impl Into<String>, kind: MetricType) -> Self {
        Self {
            name: name.into(),
            help: String::new(),
            kind,
            metrics: Vec::new(),
        }
    }

    /// Builder-style helper to append a metric.
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metrics.push(metric);
        self
    }

    /// Builder-style helper to set the help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }
}
