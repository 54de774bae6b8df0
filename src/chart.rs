use crate::db::executor::{ColumnInfo, ColumnKind};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

const PIE_SLICES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Bar,
    Scatter,
    Pie,
    Histogram,
    Table,
    Empty,
}

/// One plotted value. `x` is a label for line, bar and pie charts, a number for
/// scatter plots and the row position for histograms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub x: Value,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x: Option<String>,
    pub y: Option<String>,
    pub points: Vec<ChartPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ChartSpec {
    fn new(kind: ChartKind, title: String, x: Option<&str>, y: Option<&str>, points: Vec<ChartPoint>) -> Self {
        Self {
            kind,
            title,
            x: x.map(str::to_string),
            y: y.map(str::to_string),
            points,
            message: None,
        }
    }

    pub fn empty() -> Self {
        Self {
            kind: ChartKind::Empty,
            title: String::new(),
            x: None,
            y: None,
            points: Vec::new(),
            message: Some("No data to visualize".to_string()),
        }
    }
}

/// Picks a chart for a query result from its column kinds.
pub fn select_chart(columns: &[ColumnInfo], rows: &[Map<String, Value>]) -> ChartSpec {
    if rows.is_empty() {
        return ChartSpec::empty();
    }

    let first_of = |kind: ColumnKind| columns.iter().find(|c| c.kind == kind).map(|c| c.name.as_str());
    let numeric: Vec<&str> = columns
        .iter()
        .filter(|c| c.kind == ColumnKind::Numeric)
        .map(|c| c.name.as_str())
        .collect();
    let temporal = first_of(ColumnKind::Temporal);
    let categorical = first_of(ColumnKind::Categorical);

    match (temporal, categorical, numeric.as_slice()) {
        (Some(x), _, [y, ..]) => ChartSpec::new(
            ChartKind::Line,
            format!("{} over time", y),
            Some(x),
            Some(y),
            paired_points(rows, x, y),
        ),
        (_, Some(x), [y, ..]) => ChartSpec::new(
            ChartKind::Bar,
            format!("{} by {}", y, x),
            Some(x),
            Some(y),
            grouped_sums(rows, x, y),
        ),
        (_, _, [x, y, ..]) => ChartSpec::new(
            ChartKind::Scatter,
            format!("{} vs {}", x, y),
            Some(x),
            Some(y),
            scatter_points(rows, x, y),
        ),
        (_, Some(x), []) => ChartSpec::new(
            ChartKind::Pie,
            format!("Distribution of {}", x),
            Some(x),
            None,
            value_counts(rows, x),
        ),
        (_, _, [x]) => ChartSpec::new(
            ChartKind::Histogram,
            format!("Distribution of {}", x),
            Some(x),
            None,
            raw_values(rows, x),
        ),
        _ => ChartSpec::new(ChartKind::Table, "Data Table".to_string(), None, None, Vec::new()),
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        // Decimals come back from the JSON writer as strings
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn label(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn field<'a>(row: &'a Map<String, Value>, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&Value::Null)
}

fn paired_points(rows: &[Map<String, Value>], x: &str, y: &str) -> Vec<ChartPoint> {
    rows.iter()
        .filter_map(|row| {
            let x = label(field(row, x))?;
            let y = numeric(field(row, y))?;
            Some(ChartPoint { x: Value::String(x), y })
        })
        .collect()
}

fn grouped_sums(rows: &[Map<String, Value>], x: &str, y: &str) -> Vec<ChartPoint> {
    let mut groups: BTreeMap<String, f64> = BTreeMap::new();
    for row in rows {
        if let (Some(group), Some(value)) = (label(field(row, x)), numeric(field(row, y))) {
            *groups.entry(group).or_insert(0.0) += value;
        }
    }
    groups
        .into_iter()
        .map(|(group, total)| ChartPoint {
            x: Value::String(group),
            y: total,
        })
        .collect()
}

fn scatter_points(rows: &[Map<String, Value>], x: &str, y: &str) -> Vec<ChartPoint> {
    rows.iter()
        .filter_map(|row| {
            let x = numeric(field(row, x))?;
            let y = numeric(field(row, y))?;
            Some(ChartPoint { x: Value::from(x), y })
        })
        .collect()
}

fn value_counts(rows: &[Map<String, Value>], x: &str) -> Vec<ChartPoint> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in rows.iter().filter_map(|row| label(field(row, x))) {
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
        .into_iter()
        .take(PIE_SLICES)
        .map(|(value, count)| ChartPoint {
            x: Value::String(value),
            y: count as f64,
        })
        .collect()
}

fn raw_values(rows: &[Map<String, Value>], x: &str) -> Vec<ChartPoint> {
    rows.iter()
        .filter_map(|row| numeric(field(row, x)))
        .enumerate()
        .map(|(position, value)| ChartPoint {
            x: Value::from(position),
            y: value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn col(name: &str, kind: ColumnKind) -> ColumnInfo {
        ColumnInfo {
            name: name.to_string(),
            data_type: String::new(),
            kind,
        }
    }

    fn rows(values: Value) -> Vec<Map<String, Value>> {
        serde_json::from_value(values).unwrap()
    }

    #[test]
    fn test_no_rows_is_empty_chart() {
        let chart = select_chart(&[col("n", ColumnKind::Numeric)], &[]);
        assert_eq!(chart.kind, ChartKind::Empty);
        assert_eq!(chart.message.as_deref(), Some("No data to visualize"));
    }

    #[test]
    fn test_temporal_and_numeric_is_line() {
        let columns = [
            col("region", ColumnKind::Categorical),
            col("day", ColumnKind::Temporal),
            col("revenue", ColumnKind::Numeric),
        ];
        let data = rows(json!([
            {"region": "n", "day": "2024-01-01", "revenue": 3},
            {"region": "s", "day": "2024-01-02", "revenue": null},
            {"region": "s", "day": "2024-01-03", "revenue": "4.50"}
        ]));

        let chart = select_chart(&columns, &data);
        assert_eq!(chart.kind, ChartKind::Line);
        assert_eq!(chart.title, "revenue over time");
        assert_eq!(chart.x.as_deref(), Some("day"));
        assert_eq!(
            chart.points,
            vec![
                ChartPoint { x: json!("2024-01-01"), y: 3.0 },
                ChartPoint { x: json!("2024-01-03"), y: 4.5 },
            ]
        );
    }

    #[test]
    fn test_categorical_and_numeric_is_grouped_bar() {
        let columns = [col("city", ColumnKind::Categorical), col("sales", ColumnKind::Numeric)];
        let data = rows(json!([
            {"city": "Vientiane", "sales": 5},
            {"city": "Luang Prabang", "sales": 2},
            {"city": "Vientiane", "sales": 1.5},
            {"city": null, "sales": 9}
        ]));

        let chart = select_chart(&columns, &data);
        assert_eq!(chart.kind, ChartKind::Bar);
        assert_eq!(chart.title, "sales by city");
        assert_eq!(
            chart.points,
            vec![
                ChartPoint { x: json!("Luang Prabang"), y: 2.0 },
                ChartPoint { x: json!("Vientiane"), y: 6.5 },
            ]
        );
    }

    #[test]
    fn test_two_numeric_is_scatter() {
        let columns = [col("height", ColumnKind::Numeric), col("weight", ColumnKind::Numeric)];
        let data = rows(json!([{"height": 170, "weight": 65}, {"height": 180, "weight": null}]));

        let chart = select_chart(&columns, &data);
        assert_eq!(chart.kind, ChartKind::Scatter);
        assert_eq!(chart.title, "height vs weight");
        assert_eq!(chart.points, vec![ChartPoint { x: json!(170.0), y: 65.0 }]);
    }

    #[test]
    fn test_categorical_only_is_pie_of_top_counts() {
        let columns = [col("letter", ColumnKind::Categorical)];
        let mut values: Vec<Value> = (0..12)
            .map(|i| json!({"letter": format!("{}", (b'a' + i) as char)}))
            .collect();
        values.push(json!({"letter": "c"}));
        values.push(json!({"letter": "c"}));
        values.push(json!({"letter": "k"}));
        let data = rows(Value::Array(values));

        let chart = select_chart(&columns, &data);
        assert_eq!(chart.kind, ChartKind::Pie);
        assert_eq!(chart.title, "Distribution of letter");
        assert_eq!(chart.points.len(), 10);
        assert_eq!(chart.points[0], ChartPoint { x: json!("c"), y: 3.0 });
        assert_eq!(chart.points[1], ChartPoint { x: json!("k"), y: 2.0 });
        assert_eq!(chart.points[2], ChartPoint { x: json!("a"), y: 1.0 });
    }

    #[test]
    fn test_temporal_and_categorical_without_numeric_is_pie() {
        let columns = [col("day", ColumnKind::Temporal), col("status", ColumnKind::Categorical)];
        let data = rows(json!([
            {"day": "2024-01-01", "status": "open"},
            {"day": "2024-01-02", "status": "closed"},
            {"day": "2024-01-03", "status": "open"}
        ]));

        let chart = select_chart(&columns, &data);
        assert_eq!(chart.kind, ChartKind::Pie);
        assert_eq!(chart.title, "Distribution of status");
        assert_eq!(chart.points[0], ChartPoint { x: json!("open"), y: 2.0 });
    }

    #[test]
    fn test_single_numeric_is_histogram() {
        let columns = [col("age", ColumnKind::Numeric)];
        let data = rows(json!([{"age": 30}, {"age": null}, {"age": 41}]));

        let chart = select_chart(&columns, &data);
        assert_eq!(chart.kind, ChartKind::Histogram);
        assert_eq!(chart.title, "Distribution of age");
        let ys: Vec<f64> = chart.points.iter().map(|p| p.y).collect();
        assert_eq!(ys, vec![30.0, 41.0]);
    }

    #[test]
    fn test_unplottable_columns_fall_back_to_table() {
        let columns = [col("flag", ColumnKind::Other), col("day", ColumnKind::Temporal)];
        let data = rows(json!([{"flag": true, "day": "2024-01-01"}]));

        let chart = select_chart(&columns, &data);
        assert_eq!(chart.kind, ChartKind::Table);
        assert_eq!(chart.title, "Data Table");
        assert!(chart.points.is_empty());
    }
}
