//! `io.prometheus.client` protobuf messages (proto2, hand-declared for prost).
//!
//! Only the fields needed to rebuild the model are declared; unknown fields
//! (native histograms, exemplars, created timestamps) are skipped by prost.

use crate::error::{DecodeError, Result};
use crate::model::{Bucket, Label, Metric, MetricFamily, MetricType, Quantile, Value};

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LabelPair {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub value: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Gauge {
    #[prost(double, optional, tag = "1")]
    pub value: Option<f64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Counter {
    #[prost(double, optional, tag = "1")]
    pub value: Option<f64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Untyped {
    #[prost(double, optional, tag = "1")]
    pub value: Option<f64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PbQuantile {
    #[prost(double, optional, tag = "1")]
    pub quantile: Option<f64>,
    #[prost(double, optional, tag = "2")]
    pub value: Option<f64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Summary {
    #[prost(uint64, optional, tag = "1")]
    pub sample_count: Option<u64>,
    #[prost(double, optional, tag = "2")]
    pub sample_sum: Option<f64>,
    #[prost(message, repeated, tag = "3")]
    pub quantile: Vec<PbQuantile>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PbBucket {
    #[prost(uint64, optional, tag = "1")]
    pub cumulative_count: Option<u64>,
    #[prost(double, optional, tag = "2")]
    pub upper_bound: Option<f64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Histogram {
    #[prost(uint64, optional, tag = "1")]
    pub sample_count: Option<u64>,
    #[prost(double, optional, tag = "2")]
    pub sample_sum: Option<f64>,
    #[prost(message, repeated, tag = "3")]
    pub bucket: Vec<PbBucket>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PbMetric {
    #[prost(message, repeated, tag = "1")]
    pub label: Vec<LabelPair>,
    #[prost(message, optional, tag = "2")]
    pub gauge: Option<Gauge>,
    #[prost(message, optional, tag = "3")]
    pub counter: Option<Counter>,
    #[prost(message, optional, tag = "4")]
    pub summary: Option<Summary>,
    #[prost(message, optional, tag = "5")]
    pub untyped: Option<Untyped>,
    #[prost(int64, optional, tag = "6")]
    pub timestamp_ms: Option<i64>,
    #[prost(message, optional, tag = "7")]
    pub histogram: Option<Histogram>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PbMetricFamily {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub help: Option<String>,
    #[prost(enumeration = "PbMetricType", optional, tag = "3")]
    pub kind: Option<i32>,
    #[prost(message, repeated, tag = "4")]
    pub metric: Vec<PbMetric>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PbMetricType {
    Counter = 0,
    Gauge = 1,
    Summary = 2,
    Untyped = 3,
    Histogram = 4,
    GaugeHistogram = 5,
}

fn kind_from_wire(raw: Option<i32>) -> Result<MetricType> {
    // proto2 default for `type` is COUNTER
    let Some(raw) = raw else {
        return Ok(MetricType::Counter);
    };
    let kind = PbMetricType::try_from(raw)
        .map_err(|_| DecodeError::Malformed(format!("unknown metric type {raw}")))?;
    Ok(match kind {
        PbMetricType::Counter => MetricType::Counter,
        PbMetricType::Gauge => MetricType::Gauge,
        PbMetricType::Summary => MetricType::Summary,
        PbMetricType::Untyped => MetricType::Untyped,
        PbMetricType::Histogram => MetricType::Histogram,
        PbMetricType::GaugeHistogram => MetricType::GaugeHistogram,
    })
}

fn kind_to_wire(kind: MetricType) -> PbMetricType {
    match kind {
        MetricType::Counter => PbMetricType::Counter,
        MetricType::Gauge => PbMetricType::Gauge,
        MetricType::Summary => PbMetricType::Summary,
        MetricType::Untyped => PbMetricType::Untyped,
        MetricType::Histogram => PbMetricType::Histogram,
        MetricType::GaugeHistogram => PbMetricType::GaugeHistogram,
    }
}

fn value_from_wire(kind: MetricType, m: &PbMetric) -> Value {
    match kind {
        MetricType::Counter => {
            Value::Counter(m.counter.as_ref().and_then(|c| c.value).unwrap_or_default())
        }
        MetricType::Gauge => Value::Gauge(m.gauge.as_ref().and_then(|g| g.value).unwrap_or_default()),
        MetricType::Untyped => {
            Value::Untyped(m.untyped.as_ref().and_then(|u| u.value).unwrap_or_default())
        }
        MetricType::Summary => {
            let s = m.summary.clone().unwrap_or_default();
            Value::Summary {
                sample_count: s.sample_count.unwrap_or_default(),
                sample_sum: s.sample_sum.unwrap_or_default(),
                quantiles: s
                    .quantile
                    .iter()
                    .map(|q| Quantile {
                        quantile: q.quantile.unwrap_or_default(),
                        value: q.value.unwrap_or_default(),
                    })
                    .collect(),
            }
        }
        MetricType::Histogram | MetricType::GaugeHistogram => {
            let h = m.histogram.clone().unwrap_or_default();
            Value::Histogram {
                sample_count: h.sample_count.unwrap_or_default(),
                sample_sum: h.sample_sum.unwrap_or_default(),
                buckets: h
                    .bucket
                    .iter()
                    .map(|b| Bucket {
                        upper_bound: b.upper_bound.unwrap_or_default(),
                        cumulative_count: b.cumulative_count.unwrap_or_default(),
                    })
                    .collect(),
            }
        }
    }
}

impl TryFrom<PbMetricFamily> for MetricFamily {
    type Error = DecodeError;

    fn try_from(pb: PbMetricFamily) -> Result<Self> {
        let name = pb.name.unwrap_or_default();
        if name.is_empty() {
            return Err(DecodeError::InvalidFamily("empty family name".into()));
        }
        let kind = kind_from_wire(pb.kind)?;

        let metrics = pb
            .metric
            .iter()
            .map(|m| Metric {
                labels: m
                    .label
                    .iter()
                    .map(|lp| {
                        Label::new(
                            lp.name.clone().unwrap_or_default(),
                            lp.value.clone().unwrap_or_default(),
                        )
                    })
                    .collect(),
                value: value_from_wire(kind, m),
                timestamp_ms: m.timestamp_ms,
            })
            .collect();

        Ok(MetricFamily {
            name,
            help: pb.help.unwrap_or_default(),
            kind,
            metrics,
        })
    }
}

impl From<&MetricFamily> for PbMetricFamily {
    fn from(mf: &MetricFamily) -> Self {
        PbMetricFamily {
            name: Some(mf.name.clone()),
            help: (!mf.help.is_empty()).then(|| mf.help.clone()),
            kind: Some(kind_to_wire(mf.kind) as i32),
            metric: mf.metrics.iter().map(PbMetric::from).collect(),
        }
    }
}

impl From<&Metric> for PbMetric {
    fn from(m: &Metric) -> Self {
        let mut pb = PbMetric {
            label: m
                .labels
                .iter()
                .map(|l| LabelPair {
                    name: Some(l.name.clone()),
                    value: Some(l.value.clone()),
                })
                .collect(),
            timestamp_ms: m.timestamp_ms,
            ..Default::default()
        };

        match &m.value {
            Value::Counter(v) => pb.counter = Some(Counter { value: Some(*v) }),
            Value::Gauge(v) => pb.gauge = Some(Gauge { value: Some(*v) }),
            Value::Untyped(v) => pb.untyped = Some(Untyped { value: Some(*v) }),
            Value::Summary {
                sample_count,
                sample_sum,
                quantiles,
            } => {
                pb.summary = Some(Summary {
                    sample_count: Some(*sample_count),
                    sample_sum: Some(*sample_sum),
                    quantile: quantiles
                        .iter()
                        .map(|q| PbQuantile {
                            quantile: Some(q.quantile),
                            value: Some(q.value),
                        })
                        .collect(),
                })
            }
            Value::Histogram {
                sample_count,
                sample_sum,
                buckets,
            } => {
                pb.histogram = Some(Histogram {
                    sample_count: Some(*sample_count),
                    sample_sum: Some(*sample_sum),
                    bucket: buckets
                        .iter()
                        .map(|b| PbBucket {
                            cumulative_count: Some(b.cumulative_count),
                            upper_bound: Some(b.upper_bound),
                        })
                        .collect(),
                })
            }
        }
        pb
    }
}
