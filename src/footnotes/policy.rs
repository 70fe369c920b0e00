use std::fmt;

/// Target formatting for footnote paragraphs and runs.
///
/// Spacing is in twentieths of a point, font size in half points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StylePolicy {
    pub spacing_before: u32,
    pub spacing_after: u32,
    /// 240 is single line spacing
    pub line: u32,
    /// ASCII, high-ANSI and complex-script face
    pub latin_font: String,
    pub east_asian_font: String,
    pub size_half_points: u32,
    /// RGB hex, no leading `#`
    pub color: String,
}

impl Default for StylePolicy {
    fn default() -> Self {
        Self {
            spacing_before: 0,
            spacing_after: 0,
            line: 240,
            latin_font: "Times New Roman".to_string(),
            east_asian_font: "宋体".to_string(),
            size_half_points: 20,
            color: "000000".to_string(),
        }
    }
}

impl fmt::Display for StylePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  - spacing before: {}", self.spacing_before)?;
        writeln!(f, "  - spacing after: {}", self.spacing_after)?;
        writeln!(f, "  - line spacing: {} (single)", self.line)?;
        writeln!(f, "  - East Asian font: {}", self.east_asian_font)?;
        writeln!(f, "  - Western font: {}", self.latin_font)?;
        writeln!(f, "  - size: {}pt", self.size_half_points as f32 / 2.0)?;
        write!(f, "  - italic removed, color #{}", self.color)
    }
}
