use super::{ComponentRegistry, PropsError};
use serde::Deserialize;
use serde_json::Value;
use unicode_width::UnicodeWidthStr;

const BAR_WIDTH: usize = 32;

pub(super) fn register_builtin(registry: &mut ComponentRegistry) {
    registry.register("table", render_table);
    registry.register("card", render_card);
    registry.register("form", render_form);
    registry.register("stats", render_stats);
    registry.register("steps", render_steps);
    registry.register("chart", render_chart);
}

#[derive(Deserialize)]
struct TableProps {
    headers: Vec<String>,
    #[serde(default)]
    data: Vec<Vec<Value>>,
}

fn render_table(props: &Value) -> Result<Vec<String>, PropsError> {
    let table = TableProps::deserialize(props)?;
    let rows: Vec<Vec<String>> = table
        .data
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    let columns = rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(table.headers.len()))
        .max()
        .unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for row in std::iter::once(&table.headers).chain(rows.iter()) {
        for (index, cell) in row.iter().enumerate() {
            widths[index] = widths[index].max(cell.width());
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(table_row(&table.headers, &widths));
    lines.push(format!(
        "|{}|",
        widths
            .iter()
            .map(|width| "-".repeat(width + 2))
            .collect::<Vec<_>>()
            .join("|")
    ));
    for row in &rows {
        lines.push(table_row(row, &widths));
    }
    Ok(lines)
}

fn table_row(cells: &[String], widths: &[usize]) -> String {
    let padded: Vec<String> = widths
        .iter()
        .enumerate()
        .map(|(index, width)| {
            let cell = cells.get(index).map(String::as_str).unwrap_or("");
            format!(" {} ", pad_to_width(cell, *width))
        })
        .collect();
    format!("|{}|", padded.join("|"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardProps {
    title: String,
    #[serde(default)]
    description: String,
    image_url: Option<String>,
}

fn render_card(props: &Value) -> Result<Vec<String>, PropsError> {
    let card = CardProps::deserialize(props)?;
    let mut lines = vec![format!("== {} ==", card.title)];
    if !card.description.is_empty() {
        lines.extend(card.description.lines().map(str::to_string));
    }
    if let Some(url) = card.image_url.filter(|url| !url.trim().is_empty()) {
        lines.push(format!("image: {url}"));
    }
    Ok(lines)
}

#[derive(Deserialize)]
struct FormField {
    name: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(rename = "type", default)]
    field_type: Option<String>,
}

#[derive(Deserialize)]
struct FormProps {
    #[serde(default)]
    title: String,
    fields: Vec<FormField>,
}

fn render_form(props: &Value) -> Result<Vec<String>, PropsError> {
    let form = FormProps::deserialize(props)?;
    let mut lines = Vec::with_capacity(form.fields.len() + 1);
    if !form.title.is_empty() {
        lines.push(format!("== {} ==", form.title));
    }

    let labels: Vec<&str> = form
        .fields
        .iter()
        .map(|field| field.label.as_deref().unwrap_or(&field.name))
        .collect();
    let label_width = labels.iter().map(|label| label.width()).max().unwrap_or(0);
    for (field, label) in form.fields.iter().zip(labels) {
        let kind = field.field_type.as_deref().unwrap_or("text");
        lines.push(format!(
            "  {} [{kind}] ____________",
            pad_to_width(label, label_width)
        ));
    }
    Ok(lines)
}

#[derive(Deserialize)]
struct StatItem {
    label: String,
    value: Value,
    #[serde(default)]
    change: Option<String>,
    #[serde(default)]
    trend: Option<String>,
}

#[derive(Deserialize)]
struct StatsProps {
    items: Vec<StatItem>,
}

fn render_stats(props: &Value) -> Result<Vec<String>, PropsError> {
    let stats = StatsProps::deserialize(props)?;
    let label_width = stats
        .items
        .iter()
        .map(|item| item.label.width())
        .max()
        .unwrap_or(0);

    Ok(stats
        .items
        .iter()
        .map(|item| {
            let mut line = format!(
                "{}  {}",
                pad_to_width(&item.label, label_width),
                cell_text(&item.value)
            );
            if let Some(change) = &item.change {
                let arrow = match item.trend.as_deref() {
                    Some("up") => " ↑",
                    Some("down") => " ↓",
                    _ => "",
                };
                line.push_str(&format!(" ({change}{arrow})"));
            }
            line
        })
        .collect())
}

#[derive(Deserialize)]
struct StepItem {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize)]
struct StepsProps {
    items: Vec<StepItem>,
}

fn render_steps(props: &Value) -> Result<Vec<String>, PropsError> {
    let steps = StepsProps::deserialize(props)?;
    Ok(steps
        .items
        .iter()
        .map(|step| {
            let marker = match step.status.as_deref() {
                Some("completed") => "[x]",
                Some("current") => "[>]",
                _ => "[ ]",
            };
            if step.description.is_empty() {
                format!("{marker} {}", step.title)
            } else {
                format!("{marker} {}: {}", step.title, step.description)
            }
        })
        .collect())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartProps {
    #[serde(default)]
    title: String,
    #[serde(rename = "type", default)]
    chart_type: Option<String>,
    data: Vec<serde_json::Map<String, Value>>,
    data_key: String,
    category_key: String,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ChartKind {
    Bar,
    Line,
    Pie,
}

impl ChartKind {
    fn parse(kind: Option<&str>) -> Result<Self, PropsError> {
        match kind {
            None | Some("bar") => Ok(Self::Bar),
            Some("line") => Ok(Self::Line),
            Some("pie") => Ok(Self::Pie),
            Some(other) => Err(PropsError(format!("unsupported chart type `{other}`"))),
        }
    }
}

fn render_chart(props: &Value) -> Result<Vec<String>, PropsError> {
    let chart = ChartProps::deserialize(props)?;
    let kind = ChartKind::parse(chart.chart_type.as_deref())?;

    let mut points = Vec::with_capacity(chart.data.len());
    for row in &chart.data {
        let category = row.get(&chart.category_key).map(cell_text).unwrap_or_default();
        let value = row
            .get(&chart.data_key)
            .and_then(numeric_value)
            .ok_or_else(|| {
                PropsError(format!(
                    "row `{category}` has no numeric `{}` value",
                    chart.data_key
                ))
            })?;
        points.push((category, value));
    }

    let mut lines = Vec::with_capacity(points.len() + 1);
    if !chart.title.is_empty() {
        lines.push(format!("== {} ==", chart.title));
    }

    let label_width = points.iter().map(|(label, _)| label.width()).max().unwrap_or(0);
    let max = points.iter().map(|(_, value)| value.abs()).fold(0.0_f64, f64::max);
    let total: f64 = points.iter().map(|(_, value)| value.abs()).sum();

    for (label, value) in &points {
        let filled = if max > 0.0 {
            ((value.abs() / max) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        let annotation = if kind == ChartKind::Pie && total > 0.0 {
            format!("{:.1}%", value.abs() / total * 100.0)
        } else {
            format_number(*value)
        };
        let mark = match kind {
            ChartKind::Line => format!("{}*", " ".repeat(filled.saturating_sub(1))),
            ChartKind::Bar | ChartKind::Pie => "#".repeat(filled),
        };
        lines.push(format!(
            "{} | {mark} {annotation}",
            pad_to_width(label, label_width)
        ));
    }
    Ok(lines)
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn pad_to_width(text: &str, width: usize) -> String {
    let padding = width.saturating_sub(text.width());
    format!("{text}{}", " ".repeat(padding))
}
