//! Static catalog of Plantos tools.
//!
//! Every tool exposed to an MCP host is declared here once, with its
//! argument schema. Validation runs against these declarations before any
//! request leaves the process.

use serde_json::{json, Map, Value};

/// One variant per invocable tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    AnalyzeFarmLocation,
    GetSoilData,
    GetWeatherData,
    GetMarketData,
    GetMarketSummary,
    ChatWithAdvisor,
    GetApiHealth,
}

impl Tool {
    /// Stable identifier advertised to hosts.
    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn descriptor(self) -> &'static ToolDescriptor {
        match self {
            Tool::AnalyzeFarmLocation => &CATALOG[0],
            Tool::GetSoilData => &CATALOG[1],
            Tool::GetWeatherData => &CATALOG[2],
            Tool::GetMarketData => &CATALOG[3],
            Tool::GetMarketSummary => &CATALOG[4],
            Tool::ChatWithAdvisor => &CATALOG[5],
            Tool::GetApiHealth => &CATALOG[6],
        }
    }
}

/// Declared type of an argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// JSON number within an inclusive range.
    Number { min: f64, max: f64 },
    /// Non-empty string.
    Text,
    /// JSON object, passed through untouched.
    Object,
}

/// One named argument of a tool.
#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Advertised default. Applied to optional fields when the caller omits them.
    pub default: Option<fn() -> Value>,
}

/// Immutable description of a tool.
#[derive(Debug)]
pub struct ToolDescriptor {
    pub tool: Tool,
    pub name: &'static str,
    pub description: &'static str,
    pub fields: &'static [FieldSpec],
}

const LATITUDE: FieldKind = FieldKind::Number {
    min: -90.0,
    max: 90.0,
};
const LONGITUDE: FieldKind = FieldKind::Number {
    min: -180.0,
    max: 180.0,
};

fn default_crops() -> Value {
    Value::String("corn,soybeans,wheat".to_string())
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

const REQUIRED_COORDINATES: &[FieldSpec] = &[
    FieldSpec {
        name: "latitude",
        description: "Latitude coordinate of the farm location",
        kind: LATITUDE,
        required: true,
        default: None,
    },
    FieldSpec {
        name: "longitude",
        description: "Longitude coordinate of the farm location",
        kind: LONGITUDE,
        required: true,
        default: None,
    },
];

const OPTIONAL_COORDINATES: &[FieldSpec] = &[
    FieldSpec {
        name: "latitude",
        description: "Optional: Latitude for regional context",
        kind: LATITUDE,
        required: false,
        default: None,
    },
    FieldSpec {
        name: "longitude",
        description: "Optional: Longitude for regional context",
        kind: LONGITUDE,
        required: false,
        default: None,
    },
];

/// The full catalog, in advertised order.
pub static CATALOG: [ToolDescriptor; 7] = [
    ToolDescriptor {
        tool: Tool::AnalyzeFarmLocation,
        name: "analyze_farm_location",
        description: "Comprehensive agricultural analysis for a specific location. \
            Provides soil properties, crop yield predictions, weather data, \
            market intelligence, economic analysis, and AI-generated recommendations. \
            Returns complete farming intelligence package including optimal crop selection.",
        fields: REQUIRED_COORDINATES,
    },
    ToolDescriptor {
        tool: Tool::GetSoilData,
        name: "get_soil_data",
        description: "Get detailed soil properties for a specific location using SSURGO database. \
            Returns soil texture, composition, drainage, pH, organic matter, and other properties.",
        fields: REQUIRED_COORDINATES,
    },
    ToolDescriptor {
        tool: Tool::GetWeatherData,
        name: "get_weather_data",
        description: "Get current weather data from NOAA Weather.gov API for a location. \
            Includes temperature, precipitation, humidity, growing degree days, and wind data. \
            This data is used in crop yield prediction models.",
        fields: REQUIRED_COORDINATES,
    },
    ToolDescriptor {
        tool: Tool::GetMarketData,
        name: "get_market_data",
        description: "Get live commodity market data for specified crops. \
            Returns current prices, futures prices, price trends from USDA and CME. \
            Can include location-based regional price adjustments.",
        fields: &[
            FieldSpec {
                name: "crops",
                description: "Comma-separated list of crop types (e.g., 'corn,soybeans,wheat')",
                kind: FieldKind::Text,
                required: true,
                default: Some(default_crops),
            },
            FieldSpec {
                name: "latitude",
                description: "Optional: Latitude for regional price adjustments",
                kind: LATITUDE,
                required: false,
                default: None,
            },
            FieldSpec {
                name: "longitude",
                description: "Optional: Longitude for regional price adjustments",
                kind: LONGITUDE,
                required: false,
                default: None,
            },
        ],
    },
    ToolDescriptor {
        tool: Tool::GetMarketSummary,
        name: "get_market_summary",
        description: "Get comprehensive market summary with location-based insights. \
            Provides market overview, trends, and regional price context.",
        fields: OPTIONAL_COORDINATES,
    },
    ToolDescriptor {
        tool: Tool::ChatWithAdvisor,
        name: "chat_with_agricultural_advisor",
        description: "Ask questions to an AI agricultural advisor powered by RAG (Retrieval Augmented Generation). \
            The advisor has access to agricultural research papers, best practices, and farming knowledge. \
            Provides evidence-based recommendations with source citations. \
            You can provide optional context from previous interactions.",
        fields: &[
            FieldSpec {
                name: "message",
                description: "Your question or message to the agricultural advisor",
                kind: FieldKind::Text,
                required: true,
                default: None,
            },
            FieldSpec {
                name: "context",
                description: "Optional context including location, soil, weather, crops, and economics data",
                kind: FieldKind::Object,
                required: false,
                default: Some(empty_object),
            },
        ],
    },
    ToolDescriptor {
        tool: Tool::GetApiHealth,
        name: "get_api_health",
        description: "Check the health status of the Plantos API and database connection. \
            Useful for troubleshooting or verifying the service is available.",
        fields: &[],
    },
];

/// Find a descriptor by tool name.
pub fn lookup(name: &str) -> Option<&'static ToolDescriptor> {
    CATALOG.iter().find(|d| d.name == name)
}

/// `{"tools": [...]}` as returned by both transports.
pub fn list_tools_json() -> Value {
    json!({
        "tools": CATALOG.iter().map(ToolDescriptor::to_json).collect::<Vec<_>>()
    })
}

impl ToolDescriptor {
    /// MCP tool definition: name, description and JSON Schema.
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema(),
        })
    }

    /// JSON Schema for the tool arguments.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in self.fields {
            let mut prop = Map::new();
            match field.kind {
                FieldKind::Number { min, max } => {
                    prop.insert("type".into(), json!("number"));
                    prop.insert("description".into(), json!(field.description));
                    prop.insert("minimum".into(), json!(min));
                    prop.insert("maximum".into(), json!(max));
                }
                FieldKind::Text => {
                    prop.insert("type".into(), json!("string"));
                    prop.insert("description".into(), json!(field.description));
                }
                FieldKind::Object => {
                    prop.insert("type".into(), json!("object"));
                    prop.insert("description".into(), json!(field.description));
                }
            }
            if let Some(default) = field.default {
                prop.insert("default".into(), default());
            }
            properties.insert(field.name.into(), Value::Object(prop));
        }

        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Check `arguments` against the schema.
    ///
    /// Returns only the declared fields, with defaults applied to omitted
    /// optional ones. `null` arguments count as an empty object; a `null`
    /// field counts as omitted. Undeclared fields are dropped.
    pub fn validate(&self, arguments: &Value) -> Result<Map<String, Value>, String> {
        let empty = Map::new();
        let args = match arguments {
            Value::Null => &empty,
            Value::Object(map) => map,
            _ => return Err("Arguments must be a JSON object".to_string()),
        };

        let mut out = Map::new();
        for field in self.fields {
            match args.get(field.name).filter(|v| !v.is_null()) {
                Some(value) => {
                    check_field(field, value)?;
                    out.insert(field.name.to_string(), value.clone());
                }
                None if field.required => {
                    return Err(format!("Missing required argument '{}'", field.name));
                }
                None => {
                    if let Some(default) = field.default {
                        out.insert(field.name.to_string(), default());
                    }
                }
            }
        }
        Ok(out)
    }
}

fn check_field(field: &FieldSpec, value: &Value) -> Result<(), String> {
    match field.kind {
        FieldKind::Number { min, max } => {
            let n = value
                .as_f64()
                .ok_or_else(|| format!("Argument '{}' must be a number", field.name))?;
            if n < min || n > max {
                return Err(format!(
                    "Argument '{}' must be between {} and {}, got {}",
                    field.name, min, max, n
                ));
            }
        }
        FieldKind::Text => {
            let s = value
                .as_str()
                .ok_or_else(|| format!("Argument '{}' must be a string", field.name))?;
            if s.trim().is_empty() {
                return Err(format!("Argument '{}' must not be empty", field.name));
            }
        }
        FieldKind::Object => {
            if !value.is_object() {
                return Err(format!("Argument '{}' must be an object", field.name));
            }
        }
    }
    Ok(())
}
