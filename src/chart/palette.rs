/// Colours shared by every chart of one report. Gene `i` uses
/// `series[i % series.len()]` everywhere so a gene keeps its colour across
/// line, bar and replicate charts.
#[derive(Clone, Debug)]
pub struct Palette {
    pub series: Vec<String>,
    pub low: [u8; 3],
    pub mid: [u8; 3],
    pub high: [u8; 3],
    pub missing: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            series: [
                "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#882255", "#332288",
                "#117733", "#DDCC77", "#8c564b",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            low: [0x3b, 0x6e, 0xa5],
            mid: [0xf7, 0xf7, 0xf7],
            high: [0xc0, 0x00, 0x00],
            missing: "#d9d9d9".to_string(),
        }
    }
}

impl Palette {
    pub fn series_color(&self, i: usize) -> &str {
        if self.series.is_empty() {
            return "#555";
        }
        &self.series[i % self.series.len()]
    }

    pub fn low_hex(&self) -> String {
        hex(self.low)
    }

    pub fn mid_hex(&self) -> String {
        hex(self.mid)
    }

    pub fn high_hex(&self) -> String {
        hex(self.high)
    }

    /// Maps `t` in [-1, 1] onto low → mid → high; values outside are clamped.
    pub fn diverging(&self, t: f64) -> String {
        let t = if t.is_finite() { t.clamp(-1.0, 1.0) } else { 0.0 };
        if t < 0.0 {
            hex(lerp(self.mid, self.low, -t))
        } else {
            hex(lerp(self.mid, self.high, t))
        }
    }
}

fn lerp(a: [u8; 3], b: [u8; 3], t: f64) -> [u8; 3] {
    let mut out = [0u8; 3];
    for i in 0..3 {
        let v = a[i] as f64 + (b[i] as f64 - a[i] as f64) * t;
        out[i] = v.round().clamp(0.0, 255.0) as u8;
    }
    out
}

fn hex(c: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", c[0], c[1], c[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diverging_endpoints_and_midpoint() {
        let p = Palette::default();
        assert_eq!(p.diverging(0.0), "#f7f7f7");
        assert_eq!(p.diverging(-1.0), "#3b6ea5");
        assert_eq!(p.diverging(1.0), "#c00000");
        assert_eq!(p.diverging(7.0), "#c00000");
        assert_eq!(p.diverging(f64::NAN), "#f7f7f7");
    }

    #[test]
    fn series_colors_wrap() {
        let p = Palette::default();
        assert_eq!(p.series_color(0), p.series_color(p.series.len()));
    }
}
