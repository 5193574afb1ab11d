#[derive(Debug, Clone)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f64,
    pub title_font_size: f64,
    pub axis_font_size: f64,
    pub text_color: String,
    pub muted_text_color: String,
    pub axis_color: String,
    pub grid_color: String,
    pub background: String,
    pub region_border_color: String,
    pub missing_data_fill: String,
    pub series_colors: Vec<String>,
    pub ramp_low: String,
    pub ramp_mid: String,
    pub ramp_high: String,
}

impl Theme {
    pub fn base() -> Self {
        Self {
            font_family: "Roboto, Arial, sans-serif".to_string(),
            font_size: 12.0,
            title_font_size: 15.0,
            axis_font_size: 11.0,
            text_color: "#333333".to_string(),
            muted_text_color: "#666666".to_string(),
            axis_color: "#999999".to_string(),
            grid_color: "#E1E1E1".to_string(),
            background: "#FFFFFF".to_string(),
            region_border_color: "#FFFFFF".to_string(),
            missing_data_fill: "#EEEEEE".to_string(),
            series_colors: vec![
                "#4e79a7".to_string(),
                "#f28e2c".to_string(),
                "#e15759".to_string(),
                "#76b7b2".to_string(),
                "#59a14f".to_string(),
                "#edc949".to_string(),
                "#af7aa1".to_string(),
                "#ff9da7".to_string(),
            ],
            ramp_low: "#DEEBF7".to_string(),
            ramp_mid: "#6BAED6".to_string(),
            ramp_high: "#08306B".to_string(),
        }
    }

    /// Color for the n-th data series, cycling through the palette.
    pub fn series_color(&self, index: usize) -> &str {
        if self.series_colors.is_empty() {
            return "#333333";
        }
        &self.series_colors[index % self.series_colors.len()]
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::base()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_color_cycles() {
        let theme = Theme::base();
        let count = theme.series_colors.len();
        assert_eq!(theme.series_color(0), theme.series_color(count));
        assert_eq!(theme.series_color(2), theme.series_colors[2]);
    }
}
