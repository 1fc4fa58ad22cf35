//! Text exposition format (version 0.0.4), line by line.
//!
//! Recognized lines:
//! - `# HELP <name> <docstring>` and `# TYPE <name> <type>`
//! - any other `#` comment, and blank lines (ignored)
//! - samples: `<name>[{<label>="<value>",...}] <value> [<timestamp_ms>]`
//!
//! Samples group into families by name in first-seen order. `_count`/`_sum`
//! (and `_bucket` for histograms) samples fold into a summary or histogram
//! family declared by `# TYPE`; the `quantile`/`le` label selects the quantile
//! or bucket and is not kept as a label. Families that never receive a sample
//! are dropped.

use std::collections::HashMap;
use std::fmt::Write;

use bytes::BytesMut;
use memchr::memchr;

use crate::error::{DecodeError, Result};
use crate::model::{Bucket, Label, Metric, MetricFamily, MetricType, Quantile, Value};

/// Incremental decoder: buffers the partial last line between chunks.
#[derive(Debug, Default)]
pub struct TextDecoder {
    pending: BytesMut,
    /// Prefix of `pending` already known to hold no newline.
    scanned: usize,
    line_no: usize,
    parser: TextParser,
}

impl TextDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and parse every line it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        self.pending.extend_from_slice(chunk);
        while let Some(pos) = self.next_newline() {
            let mut line = self.pending.split_to(pos + 1);
            line.truncate(pos);
            self.line_no += 1;
            self.parse_line(&line)?;
        }
        Ok(())
    }

    /// Search only the bytes appended since the last call.
    fn next_newline(&mut self) -> Option<usize> {
        let rest = self.pending.get(self.scanned..).unwrap_or_default();
        match memchr(b'\n', rest) {
            Some(off) => {
                let pos = self.scanned + off;
                self.scanned = 0;
                Some(pos)
            }
            None => {
                self.scanned = self.pending.len();
                None
            }
        }
    }

    /// End of stream: parse an unterminated last line, then collect families.
    pub fn finish(mut self) -> Result<Vec<MetricFamily>> {
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.scanned = 0;
            self.line_no += 1;
            self.parse_line(&line)?;
        }
        Ok(self.parser.finish())
    }

    fn parse_line(&mut self, raw: &[u8]) -> Result<()> {
        let line = std::str::from_utf8(raw)
            .map_err(|e| DecodeError::text(self.line_no, format!("invalid utf-8: {e}")))?;
        self.parser.line(self.line_no, line)
    }
}

/// Which part of a summary/histogram a sample line feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Plain,
    Count,
    Sum,
    Bucket,
}

#[derive(Debug)]
struct FamilyState {
    family: MetricFamily,
    has_help: bool,
    has_type: bool,
    /// Label set (without `quantile`/`le`) to metric index, summaries and histograms only.
    groups: HashMap<Vec<(String, String)>, usize>,
}

#[derive(Debug, Default)]
struct TextParser {
    families: Vec<FamilyState>,
    by_name: HashMap<String, usize>,
}

impl TextParser {
    fn line(&mut self, n: usize, line: &str) -> Result<()> {
        let s = trim_blank_start(line);
        if s.is_empty() {
            return Ok(());
        }
        match s.strip_prefix('#') {
            Some(rest) => self.comment(n, rest),
            None => self.sample(n, s),
        }
    }

    fn finish(self) -> Vec<MetricFamily> {
        self.families
            .into_iter()
            .map(|st| st.family)
            .filter(|mf| !mf.metrics.is_empty())
            .collect()
    }

    fn family_index(&mut self, name: &str) -> usize {
        if let Some(idx) = self.by_name.get(name) {
            return *idx;
        }
        let idx = self.families.len();
        self.families.push(FamilyState {
            family: MetricFamily::new(name, MetricType::Untyped),
            has_help: false,
            has_type: false,
            groups: HashMap::new(),
        });
        self.by_name.insert(name.to_string(), idx);
        idx
    }

    fn comment(&mut self, n: usize, rest: &str) -> Result<()> {
        let rest = trim_blank_start(rest);
        let (keyword, rest) = split_until_blank(rest);
        if keyword != "HELP" && keyword != "TYPE" {
            return Ok(());
        }

        let rest = trim_blank_start(rest);
        let (name, rest) = split_metric_name(rest);
        if name.is_empty() || !(rest.is_empty() || rest.starts_with(is_blank)) {
            return Err(DecodeError::text(n, format!("invalid metric name in {keyword} comment")));
        }
        let rest = trim_blank_start(rest);

        let idx = self.family_index(name);
        let Some(st) = self.families.get_mut(idx) else {
            return Err(DecodeError::text(n, "family index out of range"));
        };

        if keyword == "HELP" {
            if st.has_help {
                return Err(DecodeError::text(n, format!("second HELP line for metric name {name:?}")));
            }
            st.has_help = true;
            st.family.help = unescape_help(rest);
            return Ok(());
        }

        if st.has_type {
            return Err(DecodeError::text(n, format!("second TYPE line for metric name {name:?}")));
        }
        if !st.family.metrics.is_empty() {
            return Err(DecodeError::text(n, format!("TYPE line for {name:?} after its samples")));
        }
        let (token, tail) = split_until_blank(rest);
        if !trim_blank_start(tail).is_empty() {
            return Err(DecodeError::text(n, "unexpected content after TYPE"));
        }
        let kind = MetricType::from_keyword(&token.to_ascii_lowercase())
            .ok_or_else(|| DecodeError::text(n, format!("unknown metric type {token:?}")))?;
        st.has_type = true;
        st.family.kind = kind;
        Ok(())
    }

    /// Find the family a sample named `name` belongs to, folding suffixed
    /// samples into a declared summary/histogram.
    fn resolve(&mut self, name: &str) -> (usize, Role) {
        if let Some(idx) = self.by_name.get(name) {
            return (*idx, Role::Plain);
        }
        for (suffix, role) in [("_count", Role::Count), ("_sum", Role::Sum), ("_bucket", Role::Bucket)] {
            let Some(base) = name.strip_suffix(suffix) else {
                continue;
            };
            let Some(idx) = self.by_name.get(base).copied() else {
                continue;
            };
            let kind = self.families.get(idx).map(|st| st.family.kind);
            let folds = match kind {
                Some(MetricType::Summary) => role != Role::Bucket,
                Some(k) => k.is_histogram(),
                None => false,
            };
            if folds {
                return (idx, role);
            }
        }
        (self.family_index(name), Role::Plain)
    }

    fn sample(&mut self, n: usize, s: &str) -> Result<()> {
        let (name, rest) = split_metric_name(s);
        if name.is_empty() {
            return Err(DecodeError::text(n, "invalid metric name"));
        }
        let rest = trim_blank_start(rest);
        let (labels, rest) = match rest.strip_prefix('{') {
            Some(r) => parse_labels(n, r)?,
            None => (Vec::new(), rest),
        };

        let rest = trim_blank_start(rest);
        let (value_tok, rest) = split_until_blank(rest);
        if value_tok.is_empty() {
            return Err(DecodeError::text(n, "missing sample value"));
        }
        let value = parse_float(value_tok)
            .ok_or_else(|| DecodeError::text(n, format!("invalid sample value {value_tok:?}")))?;

        let rest = trim_blank_start(rest);
        let (ts_tok, rest) = split_until_blank(rest);
        let timestamp_ms = if ts_tok.is_empty() {
            None
        } else {
            Some(
                ts_tok
                    .parse::<i64>()
                    .map_err(|_| DecodeError::text(n, format!("invalid timestamp {ts_tok:?}")))?,
            )
        };
        if !trim_blank_start(rest).is_empty() {
            return Err(DecodeError::text(n, "unexpected content after sample"));
        }

        self.add_sample(n, name, labels, value, timestamp_ms)
    }

    fn add_sample(
        &mut self,
        n: usize,
        name: &str,
        labels: Vec<Label>,
        value: f64,
        timestamp_ms: Option<i64>,
    ) -> Result<()> {
        let (idx, role) = self.resolve(name);
        let Some(st) = self.families.get_mut(idx) else {
            return Err(DecodeError::text(n, "family index out of range"));
        };
        let kind = st.family.kind;

        if !matches!(kind, MetricType::Summary | MetricType::Histogram | MetricType::GaugeHistogram) {
            let mut metric = Metric::new(labels, Value::scalar_for(kind, value));
            metric.timestamp_ms = timestamp_ms;
            st.family.metrics.push(metric);
            return Ok(());
        }

        // split off the quantile/le selector label
        let selector_name = if kind == MetricType::Summary { "quantile" } else { "le" };
        let mut selector = None;
        let mut kept = Vec::with_capacity(labels.len());
        for l in labels {
            if l.name == selector_name {
                let bound = parse_float(&l.value).ok_or_else(|| {
                    DecodeError::text(n, format!("expected float as value for {selector_name:?} label"))
                })?;
                selector = Some(bound);
            } else {
                kept.push(l);
            }
        }

        let key: Vec<(String, String)> = {
            let mut k: Vec<_> = kept.iter().map(|l| (l.name.clone(), l.value.clone())).collect();
            k.sort();
            k
        };
        let metric_idx = match st.groups.get(&key) {
            Some(i) => *i,
            None => {
                let i = st.family.metrics.len();
                st.family.metrics.push(Metric::new(kept, Value::empty_for(kind)));
                st.groups.insert(key, i);
                i
            }
        };
        let Some(metric) = st.family.metrics.get_mut(metric_idx) else {
            return Err(DecodeError::text(n, "metric index out of range"));
        };
        if timestamp_ms.is_some() {
            metric.timestamp_ms = timestamp_ms;
        }

        match (&mut metric.value, role) {
            (Value::Summary { sample_count, .. }, Role::Count)
            | (Value::Histogram { sample_count, .. }, Role::Count) => *sample_count = value as u64,
            (Value::Summary { sample_sum, .. }, Role::Sum)
            | (Value::Histogram { sample_sum, .. }, Role::Sum) => *sample_sum = value,
            (Value::Summary { quantiles, .. }, Role::Plain) => {
                if let Some(quantile) = selector {
                    quantiles.push(Quantile { quantile, value });
                }
            }
            (Value::Histogram { buckets, .. }, Role::Bucket) => {
                if let Some(upper_bound) = selector {
                    buckets.push(Bucket {
                        upper_bound,
                        cumulative_count: value as u64,
                    });
                }
            }
            // bare histogram name or missing selector: nothing to record
            _ => {}
        }
        Ok(())
    }
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn trim_blank_start(s: &str) -> &str {
    s.trim_start_matches(is_blank)
}

fn split_until_blank(s: &str) -> (&str, &str) {
    let end = s.find(is_blank).unwrap_or(s.len());
    s.split_at(end)
}

fn split_name(s: &str, allow_colon: bool) -> (&str, &str) {
    let valid = |i: usize, c: char| {
        c.is_ascii_alphabetic() || c == '_' || (allow_colon && c == ':') || (i > 0 && c.is_ascii_digit())
    };
    let end = s
        .char_indices()
        .find(|(i, c)| !valid(*i, *c))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s.split_at(end)
}

fn split_metric_name(s: &str) -> (&str, &str) {
    split_name(s, true)
}

fn split_label_name(s: &str) -> (&str, &str) {
    split_name(s, false)
}

fn parse_float(s: &str) -> Option<f64> {
    s.parse::<f64>().ok()
}

/// Parse `name="value",...}` (opening brace already consumed).
fn parse_labels(n: usize, s: &str) -> Result<(Vec<Label>, &str)> {
    let mut labels: Vec<Label> = Vec::new();
    let mut rest = s;
    loop {
        rest = trim_blank_start(rest);
        if let Some(r) = rest.strip_prefix('}') {
            return Ok((labels, r));
        }
        if rest.is_empty() {
            return Err(DecodeError::text(n, "unexpected end of line in label set"));
        }

        let (name, r) = split_label_name(rest);
        if name.is_empty() {
            return Err(DecodeError::text(n, "invalid label name"));
        }
        let r = trim_blank_start(r);
        let r = r
            .strip_prefix('=')
            .ok_or_else(|| DecodeError::text(n, format!("expected '=' after label name {name:?}")))?;
        let r = trim_blank_start(r);
        let r = r
            .strip_prefix('"')
            .ok_or_else(|| DecodeError::text(n, format!("expected '\"' to start value of label {name:?}")))?;
        let (value, r) = parse_label_value(n, r)?;

        if labels.iter().any(|l| l.name == name) {
            return Err(DecodeError::text(n, format!("duplicate label name {name:?}")));
        }
        labels.push(Label::new(name, value));

        rest = trim_blank_start(r);
        if let Some(r) = rest.strip_prefix(',') {
            rest = r;
        } else if !rest.starts_with('}') {
            return Err(DecodeError::text(n, "expected ',' or '}' after label value"));
        }
    }
}

/// Read a label value up to its closing quote (opening quote consumed).
fn parse_label_value(n: usize, s: &str) -> Result<(String, &str)> {
    let mut out = String::new();
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((out, &s[i + 1..])),
            '\\' => match chars.next() {
                Some((_, '\\')) => out.push('\\'),
                Some((_, '"')) => out.push('"'),
                Some((_, 'n')) => out.push('\n'),
                Some((_, other)) => {
                    return Err(DecodeError::text(n, format!("invalid escape sequence '\\{other}' in label value")))
                }
                None => break,
            },
            _ => out.push(c),
        }
    }
    Err(DecodeError::text(n, "unterminated label value"))
}

fn unescape_help(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn escape_help(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn fmt_float(v: f64) -> String {
    if v.is_nan() {
        "NaN".into()
    } else if v == f64::INFINITY {
        "+Inf".into()
    } else if v == f64::NEG_INFINITY {
        "-Inf".into()
    } else {
        format!("{v}")
    }
}

fn write_sample(
    out: &mut String,
    name: &str,
    labels: &[Label],
    extra: Option<(&str, f64)>,
    value: f64,
    timestamp_ms: Option<i64>,
) {
    let mut pairs: Vec<String> = labels
        .iter()
        .map(|l| format!("{}=\"{}\"", l.name, escape_label(&l.value)))
        .collect();
    if let Some((k, v)) = extra {
        pairs.push(format!("{k}=\"{}\"", fmt_float(v)));
    }

    let _ = write!(out, "{name}");
    if !pairs.is_empty() {
        let _ = write!(out, "{{{}}}", pairs.join(","));
    }
    let _ = write!(out, " {}", fmt_float(value));
    if let Some(ts) = timestamp_ms {
        let _ = write!(out, " {ts}");
    }
    out.push('\n');
}

/// Render families in the text exposition format.
pub fn render_text(families: &[MetricFamily]) -> String {
    let mut out = String::new();
    for mf in families {
        let name = mf.name.as_str();
        if !mf.help.is_empty() {
            let _ = writeln!(out, "# HELP {name} {}", escape_help(&mf.help));
        }
        let kind = match mf.kind {
            MetricType::GaugeHistogram => MetricType::Histogram,
            k => k,
        };
        let _ = writeln!(out, "# TYPE {name} {}", kind.as_str());

        for m in &mf.metrics {
            let ts = m.timestamp_ms;
            match &m.value {
                Value::Counter(v) | Value::Gauge(v) | Value::Untyped(v) => {
                    write_sample(&mut out, name, &m.labels, None, *v, ts)
                }
                Value::Summary {
                    sample_count,
                    sample_sum,
                    quantiles,
                } => {
                    for q in quantiles {
                        write_sample(&mut out, name, &m.labels, Some(("quantile", q.quantile)), q.value, ts);
                    }
                    write_sample(&mut out, &format!("{name}_sum"), &m.labels, None, *sample_sum, ts);
                    write_sample(&mut out, &format!("{name}_count"), &m.labels, None, *sample_count as f64, ts);
                }
                Value::Histogram {
                    sample_count,
                    sample_sum,
                    buckets,
                } => {
                    for b in buckets {
                        write_sample(
                            &mut out,
                            &format!("{name}_bucket"),
                            &m.labels,
                            Some(("le", b.upper_bound)),
                            b.cumulative_count as f64,
                            ts,
                        );
                    }
                    write_sample(&mut out, &format!("{name}_sum"), &m.labels, None, *sample_sum, ts);
                    write_sample(&mut out, &format!("{name}_count"), &m.labels, None, *sample_count as f64, ts);
                }
            }
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Result<Vec<MetricFamily>> {
        let mut dec = TextDecoder::new();
        dec.feed(s.as_bytes())?;
        dec.finish()
    }

    #[test]
    fn two_families_in_first_seen_order() {
        let fams = parse("A{x=\"1\"} 1\nB{y=\"2\"} 2\n").unwrap();
        assert_eq!(fams.len(), 2);
        assert_eq!(fams[0].name, "A");
        assert_eq!(fams[0].metrics.len(), 1);
        assert_eq!(fams[0].metrics[0].label("x"), Some("1"));
        assert_eq!(fams[1].name, "B");
        assert_eq!(fams[1].metrics[0].label("y"), Some("2"));
        assert_eq!(fams[1].kind, MetricType::Untyped);
    }

    #[test]
    fn help_type_and_escapes() {
        let fams = parse(concat!(
            "# HELP engine_daemon_engine_info The information related to the engine\\nand the OS\n",
            "# TYPE engine_daemon_engine_info gauge\n",
            "engine_daemon_engine_info{id=\"a\\\"b\",path=\"c:\\\\d\",note=\"x\\ny\"} 1 1700000000000\n",
        ))
        .unwrap();
        let mf = &fams[0];
        assert_eq!(mf.kind, MetricType::Gauge);
        assert_eq!(mf.help, "The information related to the engine\nand the OS");
        let m = &mf.metrics[0];
        assert_eq!(m.label("id"), Some("a\"b"));
        assert_eq!(m.label("path"), Some("c:\\d"));
        assert_eq!(m.label("note"), Some("x\ny"));
        assert_eq!(m.value, Value::Gauge(1.0));
        assert_eq!(m.timestamp_ms, Some(1_700_000_000_000));
    }

    #[test]
    fn special_values_and_trailing_comma() {
        let fams = parse("a{x=\"1\",} +Inf\nb -Inf\nc NaN\n").unwrap();
        assert_eq!(fams[0].metrics[0].value, Value::Untyped(f64::INFINITY));
        assert_eq!(fams[1].metrics[0].value, Value::Untyped(f64::NEG_INFINITY));
        assert!(matches!(fams[2].metrics[0].value, Value::Untyped(v) if v.is_nan()));
    }

    #[test]
    fn summary_folds_suffixes() {
        let fams = parse(concat!(
            "# TYPE rpc summary\n",
            "rpc{svc=\"a\",quantile=\"0.5\"} 10\n",
            "rpc{svc=\"a\",quantile=\"0.9\"} 20\n",
            "rpc_sum{svc=\"a\"} 100\n",
            "rpc_count{svc=\"a\"} 7\n",
            "rpc{svc=\"b\",quantile=\"0.5\"} 1\n",
        ))
        .unwrap();
        assert_eq!(fams.len(), 1);
        let mf = &fams[0];
        assert_eq!(mf.metrics.len(), 2);
        assert_eq!(mf.metrics[0].labels, vec![Label::new("svc", "a")]);
        match &mf.metrics[0].value {
            Value::Summary {
                sample_count,
                sample_sum,
                quantiles,
            } => {
                assert_eq!(*sample_count, 7);
                assert_eq!(*sample_sum, 100.0);
                assert_eq!(quantiles.len(), 2);
                assert_eq!(quantiles[1], Quantile { quantile: 0.9, value: 20.0 });
            }
            other => panic!("unexpected value {other:?}"),
        }
    }

    #[test]
    fn histogram_folds_buckets() {
        let fams = parse(concat!(
            "# TYPE lat histogram\n",
            "lat_bucket{le=\"0.1\"} 1\n",
            "lat_bucket{le=\"+Inf\"} 3\n",
            "lat_sum 0.7\n",
            "lat_count 3\n",
        ))
        .unwrap();
        let mf = &fams[0];
        assert_eq!(mf.metrics.len(), 1);
        assert!(mf.metrics[0].labels.is_empty());
        match &mf.metrics[0].value {
            Value::Histogram { sample_count, buckets, .. } => {
                assert_eq!(*sample_count, 3);
                assert_eq!(buckets.len(), 2);
                assert_eq!(buckets[1].upper_bound, f64::INFINITY);
            }
            other => panic!("unexpected value {other:?}"),
        }
    }

    #[test]
    fn suffixed_names_without_declared_base_stay_separate() {
        let fams = parse("x 1\nx_count 2\n").unwrap();
        let names: Vec<_> = fams.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["x", "x_count"]);
    }

    #[test]
    fn help_only_family_is_dropped() {
        let fams = parse("# HELP lonely nothing here\n# a plain comment\n\nb 1\n").unwrap();
        assert_eq!(fams.len(), 1);
        assert_eq!(fams[0].name, "b");
    }

    #[test]
    fn errors_carry_line_numbers() {
        let cases = [
            ("a 1\nb{x=\"1\",x=\"2\"} 1\n", 2),
            ("a{x=1} 1\n", 1),
            ("a{x=\"1\"\n", 1),
            ("\n\na notanumber\n", 3),
            ("a 1 12.5\n", 1),
            ("a 1 2 3\n", 1),
            ("# TYPE a counter\n# TYPE a gauge\n", 2),
            ("# HELP a x\n# HELP a y\n", 2),
            ("a 1\n# TYPE a counter\n", 2),
            ("# TYPE a bogus\n", 1),
            ("a{x=\"\\t\"} 1\n", 1),
            ("{x=\"1\"} 1\n", 1),
            ("a\n", 1),
        ];
        for (input, want_line) in cases {
            match parse(input) {
                Err(DecodeError::Text { line, .. }) => assert_eq!(line, want_line, "input={input:?}"),
                other => panic!("expected text error for {input:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let mut dec = TextDecoder::new();
        let err = dec.feed(b"a{x=\"\xff\"} 1\n").unwrap_err();
        assert_eq!(err.code().as_str(), "TEXT_SYNTAX");
    }

    #[test]
    fn last_line_without_newline() {
        let fams = parse("a 1\nb 2").unwrap();
        assert_eq!(fams.len(), 2);
    }

    #[test]
    fn render_then_parse_keeps_families() {
        let input = concat!(
            "# HELP up whether\\nup\n",
            "# TYPE up gauge\n",
            "up{job=\"a\\\"b\"} 1\n",
            "# TYPE rpc summary\n",
            "rpc{quantile=\"0.5\"} 3\n",
            "rpc_sum 9\n",
            "rpc_count 3\n",
        );
        let fams = parse(input).unwrap();
        let again = parse(&render_text(&fams)).unwrap();
        assert_eq!(fams, again);
    }

    #[test]
    fn built_family_renders_help_and_parses_back() {
        let built = MetricFamily::new("engine_daemon_engine_info", MetricType::Gauge)
            .with_help("The information related to the engine\nand the OS")
            .with_metric(Metric::new(vec![Label::new("id", "abc")], Value::Gauge(1.0)));

        let text = render_text(std::slice::from_ref(&built));
        assert!(text.starts_with("# HELP engine_daemon_engine_info The information related to the engine\\nand the OS\n"));
        assert_eq!(parse(&text).unwrap(), vec![built]);
    }

    #[test]
    fn long_line_in_small_chunks_is_scanned_once() {
        let value = "y".repeat(4 << 20);
        let input = format!("a{{x=\"{value}\"}} 1\nb 2\n");

        let mut dec = TextDecoder::new();
        let mut high_water = 0;
        for chunk in input.as_bytes().chunks(8 * 1024) {
            dec.feed(chunk).unwrap();
            // everything buffered has been searched; the next feed starts past it
            assert_eq!(dec.scanned, dec.pending.len());
            high_water = high_water.max(dec.pending.len());
        }
        assert!(high_water >= (4 << 20) - 8 * 1024);

        let fams = dec.finish().unwrap();
        assert_eq!(fams.len(), 2);
        assert_eq!(fams[0].metrics[0].label("x").map(str::len), Some(4 << 20));
        assert_eq!(fams[1].name, "b");
    }

    #[test]
    fn newline_split_across_feeds_keeps_line_numbers() {
        let mut dec = TextDecoder::new();
        dec.feed(b"a 1").unwrap();
        dec.feed(b"\nb").unwrap();
        dec.feed(b" 2\nc{").unwrap();
        let err = dec.feed(b"\n").unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
    }
}
