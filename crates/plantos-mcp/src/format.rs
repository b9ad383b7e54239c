//! Render Plantos API payloads as Markdown text for a language model.
//!
//! Every function here is pure. Category formatters never fail: a category
//! with nothing usable renders a single "no data" marker instead.

use serde_json::{Map, Value};

pub const NO_SOIL_DATA: &str = "*No soil data available*";
pub const NO_WEATHER_DATA: &str = "*No weather data available*";
pub const NO_PREDICTIONS: &str = "*No crop predictions available*";
pub const NO_MARKET_DATA: &str = "*No market data available*";
pub const NO_ECONOMICS: &str = "*No economic analysis available*";
pub const NO_RECOMMENDATIONS: &str = "*No recommendations available*";
pub const NO_DATA: &str = "*No data available*";

static NULL: Value = Value::Null;

const SOIL_FIELDS: &[(&str, &str, &str)] = &[
    ("soil_texture", "Texture", ""),
    ("drainage_class", "Drainage", ""),
    ("ph_level", "pH Level", ""),
    ("organic_matter_pct", "Organic Matter", "%"),
    ("sand_pct", "Sand", "%"),
    ("silt_pct", "Silt", "%"),
    ("clay_pct", "Clay", "%"),
];

const WEATHER_FIELDS: &[(&str, &str, &str)] = &[
    ("current_temperature", "Temperature", "°F"),
    ("max_temperature", "Max Temp", "°F"),
    ("min_temperature", "Min Temp", "°F"),
    ("avg_relative_humidity", "Humidity", "%"),
    ("total_precipitation", "Precipitation", " inches"),
    ("growing_degree_days", "Growing Degree Days", ""),
    ("wind_speed_mph", "Wind Speed", " mph"),
];

// ── Category formatters ───────────────────────────────────────────

pub fn soil(soil: &Value) -> String {
    labeled_lines(soil, SOIL_FIELDS).unwrap_or_else(|| NO_SOIL_DATA.to_string())
}

pub fn weather(weather: &Value) -> String {
    labeled_lines(weather, WEATHER_FIELDS).unwrap_or_else(|| NO_WEATHER_DATA.to_string())
}

pub fn crop_predictions(predictions: &Value) -> String {
    let lines: Vec<String> = objects(predictions)
        .filter(|p| p.contains_key("crop_type") || p.contains_key("predicted_yield"))
        .map(|p| {
            let crop = crop_name(p);
            let mut line = match p.get("predicted_yield").and_then(Value::as_f64) {
                Some(y) => format!("**{}:** {:.1} bushels/acre", crop, y),
                None => format!("**{}:** no yield estimate", crop),
            };
            if let Some(ci) = p
                .get("confidence_interval")
                .and_then(Value::as_object)
                .filter(|ci| !ci.is_empty())
            {
                let lower = ci.get("lower").and_then(Value::as_f64).unwrap_or(0.0);
                let upper = ci.get("upper").and_then(Value::as_f64).unwrap_or(0.0);
                line.push_str(&format!(" (range: {:.1} - {:.1})", lower, upper));
            }
            line
        })
        .collect();

    non_empty(lines, "\n").unwrap_or_else(|| NO_PREDICTIONS.to_string())
}

pub fn market(market: &Value) -> String {
    let blocks: Vec<String> = objects(market)
        .filter_map(|item| {
            let mut lines = Vec::new();
            if let Some(v) = money(item, "current_price") {
                lines.push(format!("  - Current: {}/bu", v));
            }
            if let Some(v) = money(item, "futures_price") {
                lines.push(format!("  - Futures: {}/bu", v));
            }
            if let Some(v) = item.get("price_trend").and_then(scalar) {
                lines.push(format!("  - Trend: {}", v));
            }
            if lines.is_empty() && !item.contains_key("crop_type") {
                return None;
            }
            lines.insert(0, format!("**{}:**", crop_name(item)));
            Some(lines.join("\n"))
        })
        .collect();

    non_empty(blocks, "\n\n").unwrap_or_else(|| NO_MARKET_DATA.to_string())
}

pub fn economics(economics: &Value) -> String {
    let blocks: Vec<String> = objects(economics)
        .filter_map(|item| {
            let mut lines = Vec::new();
            if let Some(v) = money(item, "estimated_revenue_per_acre") {
                lines.push(format!("  - Revenue: {}/acre", v));
            }
            if let Some(v) = money(item, "estimated_input_costs") {
                lines.push(format!("  - Costs: {}/acre", v));
            }
            if let Some(v) = money(item, "net_profit_per_acre") {
                lines.push(format!("  - Profit: {}/acre", v));
            }
            if let Some(v) = item.get("roi_percentage").and_then(Value::as_f64) {
                lines.push(format!("  - ROI: {:.1}%", v));
            }
            if lines.is_empty() && !item.contains_key("crop_type") {
                return None;
            }
            lines.insert(0, format!("**{}:**", crop_name(item)));
            Some(lines.join("\n"))
        })
        .collect();

    non_empty(blocks, "\n\n").unwrap_or_else(|| NO_ECONOMICS.to_string())
}

pub fn recommendations(recommendations: &Value) -> String {
    let lines: Vec<String> = recommendations
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|rec| match rec {
            Value::Object(_) | Value::Array(_) => Some(format!("- {}", rec)),
            other => scalar(other).map(|s| format!("- {}", s)),
        })
        .collect();

    non_empty(lines, "\n").unwrap_or_else(|| NO_RECOMMENDATIONS.to_string())
}

/// Generic renderer for payloads without a dedicated formatter.
///
/// Keys keep the order the backend sent them in; nesting adds two spaces of
/// indentation per level.
pub fn nested(data: &Value) -> String {
    let mut lines = Vec::new();
    match data {
        Value::Object(map) => nested_map(map, 0, &mut lines),
        Value::Array(items) => nested_items(items, 0, &mut lines),
        other => {
            if let Some(s) = scalar(other) {
                lines.push(s);
            }
        }
    }
    non_empty(lines, "\n").unwrap_or_else(|| NO_DATA.to_string())
}

fn nested_map(map: &Map<String, Value>, indent: usize, lines: &mut Vec<String>) {
    let prefix = "  ".repeat(indent);
    for (key, value) in map {
        let label = title_case(&key.replace('_', " "));
        match value {
            Value::Object(inner) => {
                lines.push(format!("{}**{}:**", prefix, label));
                nested_map(inner, indent + 1, lines);
            }
            Value::Array(items) => {
                lines.push(format!("{}**{}:**", prefix, label));
                nested_items(items, indent, lines);
            }
            other => lines.push(format!("{}**{}:** {}", prefix, label, display(other))),
        }
    }
}

fn nested_items(items: &[Value], indent: usize, lines: &mut Vec<String>) {
    let prefix = "  ".repeat(indent);
    for item in items {
        match item {
            Value::Object(inner) => nested_map(inner, indent + 1, lines),
            Value::Array(_) => lines.push(format!("{}  - {}", prefix, item)),
            other => lines.push(format!("{}  - {}", prefix, display(other))),
        }
    }
}

// ── Per-tool reports ──────────────────────────────────────────────

pub fn location_analysis(latitude: &Value, longitude: &Value, data: &Map<String, Value>) -> Vec<String> {
    let field = |key: &str| data.get(key).unwrap_or(&NULL);
    vec![
        format!(
            "# Farm Location Analysis\n\n**Location:** {}, {}",
            display(latitude),
            display(longitude)
        ),
        format!("## Soil Properties\n{}", soil(field("soil_properties"))),
        format!("## Weather Conditions\n{}", weather(field("weather_data"))),
        format!(
            "## Crop Yield Predictions\n{}",
            crop_predictions(field("crop_predictions"))
        ),
        format!("## Market Data\n{}", market(field("market_data"))),
        format!(
            "## Economic Analysis\n{}",
            economics(field("economic_analysis"))
        ),
        format!(
            "## Recommendations\n{}",
            recommendations(field("recommendations"))
        ),
        format!(
            "---\n*Analysis generated at {}*",
            text_or_na(data, "analysis_timestamp")
        ),
    ]
}

pub fn soil_report(latitude: &Value, longitude: &Value, data: &Map<String, Value>) -> Vec<String> {
    vec![
        format!(
            "# Soil Data for {}, {}",
            display(latitude),
            display(longitude)
        ),
        soil(&Value::Object(data.clone())),
    ]
}

pub fn weather_report(latitude: &Value, longitude: &Value, data: &Map<String, Value>) -> Vec<String> {
    let mut sections = vec![
        format!(
            "# Weather Data for {}, {}",
            display(latitude),
            display(longitude)
        ),
        format!("**Source:** {}", text_or_na(data, "source")),
        weather(data.get("weather").unwrap_or(&NULL)),
    ];
    if let Some(note) = data.get("note").and_then(scalar) {
        sections.push(note);
    }
    sections
}

pub fn market_report(data: &Map<String, Value>) -> Vec<String> {
    let mut sections = vec![
        "# Market Data".to_string(),
        market(data.get("crops").unwrap_or(&NULL)),
        format!("**Last Updated:** {}", text_or_na(data, "last_updated")),
    ];
    if let Some(note) = data.get("note").and_then(scalar) {
        sections.push(note);
    }
    if let Some(info) = data.get("location_info").and_then(Value::as_object) {
        let adjusted = info
            .get("regional_adjustments_applied")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if adjusted {
            sections.push(format!(
                "*Regional price adjustments applied for {}, {}*",
                text_or_na(info, "latitude"),
                text_or_na(info, "longitude")
            ));
        }
    }
    sections
}

pub fn market_summary(data: &Map<String, Value>) -> Vec<String> {
    vec![
        "# Market Summary".to_string(),
        nested(&Value::Object(data.clone())),
    ]
}

/// Advisor reply. Fails when the payload has no `response` text.
pub fn advisor_reply(data: &Map<String, Value>) -> Result<Vec<String>, String> {
    let response = data
        .get("response")
        .and_then(Value::as_str)
        .ok_or_else(|| "advisor reply is missing 'response'".to_string())?;

    let mut sections = vec![response.to_string()];

    let sources: Vec<String> = data
        .get("sources")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(scalar)
        .map(|s| format!("- {}", s))
        .collect();
    if !sources.is_empty() {
        sections.push(format!("## Sources\n{}", sources.join("\n")));
    }

    if let Some(confidence) = data.get("confidence").and_then(Value::as_f64) {
        sections.push(format!("*Confidence: {:.0}%*", confidence * 100.0));
    }

    Ok(sections)
}

pub fn health_report(data: &Map<String, Value>) -> Vec<String> {
    let connected = data
        .get("database_connected")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    vec![
        "# Plantos API Health".to_string(),
        format!(
            "**Status:** {}\n**Database Connected:** {}\n**Timestamp:** {}",
            data.get("status").and_then(scalar).unwrap_or_else(|| "unknown".to_string()),
            connected,
            text_or_na(data, "timestamp")
        ),
    ]
}

// ── Helpers ───────────────────────────────────────────────────────

/// Python-style title case: upper-case every letter that follows a non-letter.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

fn labeled_lines(data: &Value, fields: &[(&str, &str, &str)]) -> Option<String> {
    let obj = data.as_object()?;
    let lines: Vec<String> = fields
        .iter()
        .filter_map(|(key, label, suffix)| {
            obj.get(*key)
                .and_then(scalar)
                .map(|v| format!("**{}:** {}{}", label, v, suffix))
        })
        .collect();
    non_empty(lines, "\n")
}

fn objects(value: &Value) -> impl Iterator<Item = &Map<String, Value>> {
    value
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn crop_name(item: &Map<String, Value>) -> String {
    let raw = item
        .get("crop_type")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or("unknown");
    title_case(raw)
}

fn money(item: &Map<String, Value>, key: &str) -> Option<String> {
    item.get(key)
        .and_then(Value::as_f64)
        .map(|v| format!("${:.2}", v))
}

/// A usable scalar: null and blank strings count as absent.
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "N/A".to_string(),
        other => other.to_string(),
    }
}

fn text_or_na(data: &Map<String, Value>, key: &str) -> String {
    data.get(key)
        .and_then(scalar)
        .unwrap_or_else(|| "N/A".to_string())
}

fn non_empty(lines: Vec<String>, sep: &str) -> Option<String> {
    if lines.is_empty() {
        None
    } else {
        Some(lines.join(sep))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_soil_renders_present_fields_in_order() {
        let text = soil(&json!({
            "clay_pct": 0,
            "soil_texture": "Silty clay loam",
            "ph_level": 6.5,
        }));
        assert_eq!(
            text,
            "**Texture:** Silty clay loam\n**pH Level:** 6.5\n**Clay:** 0%"
        );
    }

    #[test]
    fn test_every_category_has_explicit_no_data_marker() {
        let empty = json!({});
        assert_eq!(soil(&empty), NO_SOIL_DATA);
        assert_eq!(weather(&empty), NO_WEATHER_DATA);
        assert_eq!(crop_predictions(&json!([])), NO_PREDICTIONS);
        assert_eq!(market(&json!([])), NO_MARKET_DATA);
        assert_eq!(economics(&json!([])), NO_ECONOMICS);
        assert_eq!(recommendations(&json!([])), NO_RECOMMENDATIONS);
        assert_eq!(nested(&json!({})), NO_DATA);
    }

    #[test]
    fn test_absent_or_wrong_shape_is_no_data() {
        assert_eq!(soil(&Value::Null), NO_SOIL_DATA);
        assert_eq!(weather(&json!("sunny")), NO_WEATHER_DATA);
        assert_eq!(crop_predictions(&json!({"corn": 1})), NO_PREDICTIONS);
        assert_eq!(market(&json!([1, 2, 3])), NO_MARKET_DATA);
        assert_eq!(economics(&Value::Null), NO_ECONOMICS);
        assert_eq!(recommendations(&json!([null, ""])), NO_RECOMMENDATIONS);
    }

    #[test]
    fn test_fields_with_null_values_are_no_data() {
        let text = weather(&json!({"current_temperature": null, "wind_speed_mph": ""}));
        assert_eq!(text, NO_WEATHER_DATA);
    }

    #[test]
    fn test_weather_units() {
        let text = weather(&json!({
            "current_temperature": 72,
            "total_precipitation": 1.2,
            "wind_speed_mph": 8,
        }));
        assert_eq!(
            text,
            "**Temperature:** 72°F\n**Precipitation:** 1.2 inches\n**Wind Speed:** 8 mph"
        );
    }

    #[test]
    fn test_crop_predictions_with_range() {
        let text = crop_predictions(&json!([
            {"crop_type": "corn", "predicted_yield": 182.46,
             "confidence_interval": {"lower": 170, "upper": 195.04}},
            {"crop_type": "soybeans", "predicted_yield": 55},
        ]));
        assert_eq!(
            text,
            "**Corn:** 182.5 bushels/acre (range: 170.0 - 195.0)\n**Soybeans:** 55.0 bushels/acre"
        );
    }

    #[test]
    fn test_market_blocks() {
        let text = market(&json!([
            {"crop_type": "wheat", "current_price": 5.5, "futures_price": 5.75, "price_trend": "rising"},
        ]));
        assert_eq!(
            text,
            "**Wheat:**\n  - Current: $5.50/bu\n  - Futures: $5.75/bu\n  - Trend: rising"
        );
    }

    #[test]
    fn test_economics_blocks() {
        let text = economics(&json!([
            {"crop_type": "corn", "estimated_revenue_per_acre": 800,
             "estimated_input_costs": 500, "net_profit_per_acre": 300, "roi_percentage": 60},
        ]));
        assert_eq!(
            text,
            "**Corn:**\n  - Revenue: $800.00/acre\n  - Costs: $500.00/acre\n  - Profit: $300.00/acre\n  - ROI: 60.0%"
        );
    }

    #[test]
    fn test_recommendations_list() {
        let text = recommendations(&json!(["Plant corn early", "Test soil pH"]));
        assert_eq!(text, "- Plant corn early\n- Test soil pH");
    }

    #[test]
    fn test_nested_preserves_key_order_and_indents() {
        let data: Value = serde_json::from_str(
            r#"{"zeta_trend": "up", "overview": {"corn_price": 4.5, "notes": ["a", "b"]}, "alpha": null}"#,
        )
        .unwrap();
        assert_eq!(
            nested(&data),
            "**Zeta Trend:** up\n**Overview:**\n  **Corn Price:** 4.5\n  **Notes:**\n    - a\n    - b\n**Alpha:** N/A"
        );
    }

    #[test]
    fn test_nested_list_of_objects() {
        let data = json!({"regions": [{"name": "midwest"}]});
        assert_eq!(nested(&data), "**Regions:**\n  **Name:** midwest");
    }

    #[test]
    fn test_nested_is_deterministic() {
        let data = json!({"b": {"c": [1, {"d": true}]}, "a": 2});
        assert_eq!(nested(&data), nested(&data.clone()));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("sweet corn"), "Sweet Corn");
        assert_eq!(title_case("SOYBEANS"), "Soybeans");
        assert_eq!(title_case("market 2nd tier"), "Market 2Nd Tier");
    }

    #[test]
    fn test_location_analysis_sections() {
        let sections = location_analysis(
            &json!(41.6),
            &json!(-93.6),
            &obj(json!({"analysis_timestamp": "2026-05-01T12:00:00Z"})),
        );
        assert_eq!(sections.len(), 8);
        assert_eq!(sections[0], "# Farm Location Analysis\n\n**Location:** 41.6, -93.6");
        assert_eq!(sections[1], format!("## Soil Properties\n{}", NO_SOIL_DATA));
        assert_eq!(sections[6], format!("## Recommendations\n{}", NO_RECOMMENDATIONS));
        assert_eq!(sections[7], "---\n*Analysis generated at 2026-05-01T12:00:00Z*");
    }

    #[test]
    fn test_market_report_regional_note() {
        let sections = market_report(&obj(json!({
            "crops": [],
            "last_updated": "today",
            "location_info": {"regional_adjustments_applied": true, "latitude": 40, "longitude": -90},
        })));
        assert_eq!(sections[1], NO_MARKET_DATA);
        assert_eq!(sections[2], "**Last Updated:** today");
        assert_eq!(sections[3], "*Regional price adjustments applied for 40, -90*");
    }

    #[test]
    fn test_advisor_reply_with_sources_and_confidence() {
        let sections = advisor_reply(&obj(json!({
            "response": "Rotate with soybeans.",
            "sources": ["Iowa State Extension"],
            "confidence": 0.87,
        })))
        .unwrap();
        assert_eq!(
            sections,
            vec![
                "Rotate with soybeans.".to_string(),
                "## Sources\n- Iowa State Extension".to_string(),
                "*Confidence: 87%*".to_string(),
            ]
        );
    }

    #[test]
    fn test_advisor_reply_missing_response_fails() {
        assert!(advisor_reply(&obj(json!({"sources": []}))).is_err());
    }

    #[test]
    fn test_health_report_defaults() {
        let sections = health_report(&Map::new());
        assert_eq!(
            sections[1],
            "**Status:** unknown\n**Database Connected:** false\n**Timestamp:** N/A"
        );
    }
}
