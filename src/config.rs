//! Runtime settings resolved from the environment plus the fixed chart
//! geometry shared by every tile renderer.
//!
//! Environment variables:
//! - `NODE_ENV`: deployment profile; `local` targets a dev API on
//!   127.0.0.1, anything else targets the hosted API (default: `local`)
//! - `API_ROOT`: overrides the upstream API root regardless of profile
//! - `HOST` / `PORT`: bind address (default: 0.0.0.0:8080)

const LOCAL_API_ROOT: &str = "http://127.0.0.1:8080";
const HOSTED_API_ROOT: &str = "https://datacommons.org";

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub host: String,
    pub port: u16,
    pub api_root: String,
    pub env: String,
    pub request_timeout_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            api_root: LOCAL_API_ROOT.to_string(),
            env: "local".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let env = std::env::var("NODE_ENV").unwrap_or_else(|_| "local".to_string());
        let default_root = if env == "local" {
            LOCAL_API_ROOT
        } else {
            HOSTED_API_ROOT
        };
        let api_root = std::env::var("API_ROOT").unwrap_or_else(|_| default_root.to_string());
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);

        Self {
            host,
            port,
            api_root: api_root.trim_end_matches('/').to_string(),
            env,
            request_timeout_secs: 30,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Geometry every chart is drawn with. Tiles are fixed-size; the consumer
/// embeds the returned SVG as-is.
#[derive(Debug, Clone)]
pub struct ChartConfig {
    pub tile_width: f64,
    pub tile_height: f64,
    pub padding: f64,
    pub title_line_height: f64,
    pub y_axis_width: f64,
    pub x_axis_height: f64,
    pub legend_item_height: f64,
    pub legend_swatch_size: f64,
    pub bar_padding_ratio: f64,
    pub max_bar_places: usize,
    pub default_ranking_count: usize,
    pub ranking_row_height: f64,
    pub tick_count: usize,
    pub dot_radius: f64,
    pub event_dot_radius: f64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            tile_width: 500.0,
            tile_height: 400.0,
            padding: 16.0,
            title_line_height: 1.4,
            y_axis_width: 56.0,
            x_axis_height: 60.0,
            legend_item_height: 20.0,
            legend_swatch_size: 12.0,
            bar_padding_ratio: 0.2,
            max_bar_places: 7,
            default_ranking_count: 5,
            ranking_row_height: 26.0,
            tick_count: 5,
            dot_radius: 3.5,
            event_dot_radius: 4.0,
        }
    }
}
