//! Server-side SVG for every chart. Interactive marks carry `data-*` indices
//! into the embedded JSON model so the inline script can look values up.

use super::escape_html;
use crate::chart::{AxisBounds, BarModel, GeneLabel, HeatmapModel, LineModel, ReplicateModel};
use crate::core::error::Result;
use std::fmt::Write;

const LEFT: f64 = 56.0;
const RIGHT: f64 = 20.0;
const TOP: f64 = 12.0;
const BOTTOM: f64 = 34.0;
/// Extra room under the plot for rotated category labels.
const CATEGORY_LABEL_ROOM: f64 = 46.0;

#[derive(Clone, Copy, Debug)]
struct Frame {
    left: f64,
    top: f64,
    plot_w: f64,
    plot_h: f64,
}

impl Frame {
    fn new(w: f64, h: f64, bottom: f64) -> Self {
        Self {
            left: LEFT,
            top: TOP,
            plot_w: (w - LEFT - RIGHT).max(1.0),
            plot_h: (h - TOP - bottom).max(1.0),
        }
    }

    fn y(&self, v: f64, axis: &AxisBounds) -> f64 {
        let span = axis.span().max(1e-9);
        self.top + self.plot_h - ((v - axis.min) / span) * self.plot_h
    }

    fn band(&self, n: usize) -> f64 {
        self.plot_w / n.max(1) as f64
    }

    fn category_x(&self, i: usize, n: usize) -> f64 {
        self.left + (i as f64 + 0.5) * self.band(n)
    }
}

fn open_svg(out: &mut String, id: &str, w: f64, h: f64) -> Result<()> {
    writeln!(
        out,
        "<svg id=\"{id}\" class=\"chart\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" preserveAspectRatio=\"xMinYMin meet\">"
    )?;
    Ok(())
}

fn plot_rect(out: &mut String, f: &Frame) -> Result<()> {
    writeln!(
        out,
        "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"#fff\" stroke=\"#ddd\"/>",
        f.left, f.top, f.plot_w, f.plot_h
    )?;
    Ok(())
}

pub fn line_chart(
    out: &mut String,
    model: &LineModel,
    genes: &[GeneLabel],
    w: f64,
    h: f64,
) -> Result<()> {
    let f = Frame::new(w, h, BOTTOM + CATEGORY_LABEL_ROOM);
    let n = model.categories.len();
    open_svg(out, "line-chart", w, h)?;
    plot_rect(out, &f)?;
    draw_y_axis_ticks(out, &f, &model.y_axis, 5)?;
    draw_category_labels(out, &f, &model.categories)?;
    draw_axis_labels(out, &f, CATEGORY_LABEL_ROOM, &model.x_label, &model.y_label)?;

    for s in &model.series {
        let color = genes.get(s.gene).map(|g| g.color.as_str()).unwrap_or("#555");
        writeln!(out, "<g class=\"series\" data-gene=\"{}\">", s.gene)?;
        // A missing value breaks the line into separate segments.
        let mut segment: Vec<(f64, f64)> = Vec::new();
        for (i, v) in s.values.iter().enumerate() {
            match v {
                Some(v) => segment.push((f.category_x(i, n), f.y(*v, &model.y_axis))),
                None => {
                    svg_path(out, &segment, color)?;
                    segment.clear();
                }
            }
        }
        svg_path(out, &segment, color)?;
        for (i, v) in s.values.iter().enumerate() {
            if let Some(v) = v {
                writeln!(
                    out,
                    "<circle class=\"pt\" cx=\"{:.2}\" cy=\"{:.2}\" r=\"3.5\" fill=\"{}\" data-gene=\"{}\" data-cat=\"{}\" data-value=\"{}\"/>",
                    f.category_x(i, n),
                    f.y(*v, &model.y_axis),
                    color,
                    s.gene,
                    i,
                    v
                )?;
            }
        }
        writeln!(out, "</g>")?;
    }
    writeln!(out, "</svg>")?;
    Ok(())
}

/// Bars sit in selection order; `data-rank-pos` is the slot each bar takes
/// when the chart is switched to ranked order.
pub fn bar_chart(
    out: &mut String,
    model: &BarModel,
    genes: &[GeneLabel],
    w: f64,
    h: f64,
) -> Result<()> {
    let f = Frame::new(w, h, BOTTOM + CATEGORY_LABEL_ROOM);
    let n = model.genes.len();
    let band = f.band(n);
    let bar_w = band * 0.7;
    let mut rank_pos = vec![0usize; n];
    for (pos, &gene) in model.rank.iter().enumerate() {
        if let Some(slot) = rank_pos.get_mut(gene) {
            *slot = pos;
        }
    }

    writeln!(
        out,
        "<svg id=\"bar-chart\" class=\"chart\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" preserveAspectRatio=\"xMinYMin meet\" data-left=\"{}\" data-band=\"{}\">",
        f.left, band
    )?;
    plot_rect(out, &f)?;
    draw_y_axis_ticks(out, &f, &model.y_axis, 5)?;
    draw_axis_labels(out, &f, CATEGORY_LABEL_ROOM, "Gene", &model.y_label)?;

    let base = f.y(0.0_f64.clamp(model.y_axis.min, model.y_axis.max), &model.y_axis);
    for (i, id) in model.genes.iter().enumerate() {
        let color = genes.get(i).map(|g| g.color.as_str()).unwrap_or("#555");
        let value = model.values[i];
        let missing = model.missing[i];
        let top = f.y(value, &model.y_axis);
        let (y, height) = if top <= base {
            (top, base - top)
        } else {
            (base, top - base)
        };
        writeln!(
            out,
            "<g class=\"bar-slot series\" data-gene=\"{i}\" data-order=\"{i}\" data-rank-pos=\"{}\" transform=\"translate({:.2},0)\">",
            rank_pos[i],
            f.left + i as f64 * band
        )?;
        if missing {
            writeln!(
                out,
                "<text class=\"bar\" x=\"{:.2}\" y=\"{:.2}\" font-size=\"10\" fill=\"#999\" text-anchor=\"middle\" data-gene=\"{i}\" data-missing=\"true\">n/a</text>",
                band / 2.0,
                base - 4.0
            )?;
        } else {
            writeln!(
                out,
                "<rect class=\"bar\" x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\" data-gene=\"{i}\" data-value=\"{}\"/>",
                (band - bar_w) / 2.0,
                y,
                bar_w,
                height,
                color,
                value
            )?;
        }
        let lx = band / 2.0;
        let ly = f.top + f.plot_h + 6.0;
        writeln!(
            out,
            "<text x=\"{lx:.2}\" y=\"{ly:.2}\" font-size=\"10\" fill=\"#444\" text-anchor=\"end\" transform=\"rotate(-40 {lx:.2} {ly:.2})\">{}</text>",
            escape_html(id)
        )?;
        writeln!(out, "</g>")?;
    }
    writeln!(out, "</svg>")?;
    Ok(())
}

pub fn heatmap(
    out: &mut String,
    model: &HeatmapModel,
    genes: &[GeneLabel],
    cell: f64,
) -> Result<()> {
    let label_w = genes
        .iter()
        .map(|g| g.display.chars().count())
        .max()
        .unwrap_or(4) as f64
        * 6.5
        + 12.0;
    let left = label_w.max(LEFT);
    let top = TOP + CATEGORY_LABEL_ROOM + 8.0;
    let cols = model.columns.len();
    let rows = model.genes.len();
    let grid_w = cols as f64 * cell;
    let grid_h = rows as f64 * cell;
    let legend_w = 80.0;
    let w = left + grid_w + legend_w + RIGHT;
    let h = (top + grid_h + BOTTOM).max(top + 160.0);

    open_svg(out, "heatmap-chart", w, h)?;
    for (j, name) in model.columns.iter().enumerate() {
        let x = left + (j as f64 + 0.5) * cell;
        let y = top - 6.0;
        writeln!(
            out,
            "<text x=\"{x:.2}\" y=\"{y:.2}\" font-size=\"10\" fill=\"#444\" text-anchor=\"start\" transform=\"rotate(-40 {x:.2} {y:.2})\">{}</text>",
            escape_html(name)
        )?;
    }
    for (i, row) in model.cells.iter().enumerate() {
        let y = top + i as f64 * cell;
        let label = genes.get(i).map(|g| g.display.as_str()).unwrap_or("");
        writeln!(out, "<g class=\"series heat-row\" data-gene=\"{i}\">")?;
        writeln!(
            out,
            "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"10\" fill=\"#444\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>",
            left - 4.0,
            y + cell / 2.0,
            escape_html(label)
        )?;
        for (j, c) in row.iter().enumerate() {
            write!(
                out,
                "<rect class=\"cell\" x=\"{:.2}\" y=\"{:.2}\" width=\"{}\" height=\"{}\" fill=\"{}\" stroke=\"#fff\" data-gene=\"{i}\" data-cat=\"{j}\" data-z=\"{}\"",
                left + j as f64 * cell,
                y,
                cell,
                cell,
                c.color,
                c.z
            )?;
            match c.raw {
                Some(v) => writeln!(out, " data-value=\"{}\"/>", v)?,
                None => writeln!(out, " data-missing=\"true\"/>")?,
            }
        }
        writeln!(out, "</g>")?;
    }
    heat_legend(out, model, left + grid_w + 24.0, top, 120.0)?;
    writeln!(out, "</svg>")?;
    Ok(())
}

fn heat_legend(out: &mut String, model: &HeatmapModel, x: f64, y: f64, h: f64) -> Result<()> {
    let cs = &model.color_scale;
    writeln!(
        out,
        "<defs><linearGradient id=\"heat-scale\" x1=\"0\" y1=\"1\" x2=\"0\" y2=\"0\"><stop offset=\"0\" stop-color=\"{}\"/><stop offset=\"0.5\" stop-color=\"{}\"/><stop offset=\"1\" stop-color=\"{}\"/></linearGradient></defs>",
        cs.low_color, cs.mid_color, cs.high_color
    )?;
    writeln!(
        out,
        "<rect x=\"{x}\" y=\"{y}\" width=\"14\" height=\"{h}\" fill=\"url(#heat-scale)\" stroke=\"#ccc\"/>"
    )?;
    for (v, frac) in [(cs.max, 0.0), (cs.mid, 0.5), (cs.min, 1.0)] {
        writeln!(
            out,
            "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"10\" fill=\"#666\" dominant-baseline=\"middle\">{}</text>",
            x + 18.0,
            y + frac * h,
            fmt_tick(v)
        )?;
    }
    writeln!(
        out,
        "<text x=\"{x}\" y=\"{:.2}\" font-size=\"10\" fill=\"#444\">z-score</text>",
        y - 6.0
    )?;
    writeln!(
        out,
        "<rect x=\"{x}\" y=\"{:.2}\" width=\"14\" height=\"10\" fill=\"{}\" stroke=\"#ccc\"/><text x=\"{:.2}\" y=\"{:.2}\" font-size=\"10\" fill=\"#666\" dominant-baseline=\"middle\">missing</text>",
        y + h + 12.0,
        cs.missing_color,
        x + 18.0,
        y + h + 17.0
    )?;
    Ok(())
}

/// One group per gene; only the first is visible until the selector changes.
pub fn replicate_chart(
    out: &mut String,
    model: &ReplicateModel,
    genes: &[GeneLabel],
    w: f64,
    h: f64,
) -> Result<()> {
    let f = Frame::new(w, h, BOTTOM + CATEGORY_LABEL_ROOM);
    let n = model.conditions.len();
    open_svg(out, "replicate-chart", w, h)?;
    plot_rect(out, &f)?;
    draw_category_labels(out, &f, &model.conditions)?;
    for (k, g) in model.genes.iter().enumerate() {
        let label = genes.get(g.gene).map(|l| l.display.as_str()).unwrap_or("");
        let hidden = if k == 0 { "" } else { " style=\"display:none\"" };
        writeln!(
            out,
            "<g class=\"rep-gene\" data-gene=\"{}\"{}>",
            g.gene, hidden
        )?;
        draw_y_axis_ticks(out, &f, &g.y_axis, 5)?;
        draw_axis_labels(
            out,
            &f,
            CATEGORY_LABEL_ROOM,
            "Condition",
            &format!("{} expression", label),
        )?;
        let tracks = g.tracks.len().max(1) as f64;
        let spread = f.band(n) * 0.4;
        for (r, t) in g.tracks.iter().enumerate() {
            // Replicates are fanned out inside the condition band.
            let dx = if tracks > 1.0 {
                (r as f64 / (tracks - 1.0) - 0.5) * spread
            } else {
                0.0
            };
            writeln!(out, "<g class=\"track\" data-track=\"{r}\">")?;
            for &(c, v) in &t.points {
                writeln!(
                    out,
                    "<circle class=\"pt\" cx=\"{:.2}\" cy=\"{:.2}\" r=\"4\" fill=\"{}\" fill-opacity=\"0.85\" data-gene=\"{}\" data-cat=\"{}\" data-track=\"{}\" data-value=\"{}\"/>",
                    f.category_x(c, n) + dx,
                    f.y(v, &g.y_axis),
                    t.color,
                    g.gene,
                    c,
                    r,
                    v
                )?;
            }
            writeln!(out, "</g>")?;
        }
        writeln!(out, "</g>")?;
    }
    writeln!(out, "</svg>")?;
    Ok(())
}

fn svg_path(out: &mut String, points: &[(f64, f64)], color: &str) -> Result<()> {
    if points.len() < 2 {
        return Ok(());
    }
    let mut path = String::new();
    for (i, (x, y)) in points.iter().enumerate() {
        if i == 0 {
            write!(path, "M {:.2} {:.2}", x, y)?;
        } else {
            write!(path, " L {:.2} {:.2}", x, y)?;
        }
    }
    writeln!(
        out,
        "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"2\"/>",
        path, color
    )?;
    Ok(())
}

fn draw_y_axis_ticks(out: &mut String, f: &Frame, axis: &AxisBounds, ticks: usize) -> Result<()> {
    if ticks < 2 || axis.span().abs() < 1e-9 {
        return Ok(());
    }
    let (start, step, count) = nice_ticks(axis.min, axis.max, ticks);
    for i in 0..count {
        let v = start + step * i as f64;
        if v < axis.min - 1e-9 || v > axis.max + 1e-9 {
            continue;
        }
        let y = f.y(v, axis);
        writeln!(
            out,
            "<line x1=\"{}\" y1=\"{:.2}\" x2=\"{}\" y2=\"{:.2}\" stroke=\"#eee\"/>",
            f.left,
            y,
            f.left + f.plot_w,
            y
        )?;
        writeln!(
            out,
            "<text x=\"{}\" y=\"{:.2}\" font-size=\"10\" fill=\"#666\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>",
            f.left - 4.0,
            y,
            fmt_tick(v)
        )?;
    }
    Ok(())
}

fn draw_category_labels(out: &mut String, f: &Frame, labels: &[String]) -> Result<()> {
    let n = labels.len();
    for (i, label) in labels.iter().enumerate() {
        let x = f.category_x(i, n);
        let y = f.top + f.plot_h + 6.0;
        writeln!(
            out,
            "<line x1=\"{x:.2}\" y1=\"{}\" x2=\"{x:.2}\" y2=\"{}\" stroke=\"#f2f2f2\"/>",
            f.top,
            f.top + f.plot_h
        )?;
        writeln!(
            out,
            "<text x=\"{x:.2}\" y=\"{y:.2}\" font-size=\"10\" fill=\"#444\" text-anchor=\"end\" transform=\"rotate(-40 {x:.2} {y:.2})\">{}</text>",
            escape_html(label)
        )?;
    }
    Ok(())
}

fn draw_axis_labels(
    out: &mut String,
    f: &Frame,
    below: f64,
    x_label: &str,
    y_label: &str,
) -> Result<()> {
    let x = f.left + f.plot_w / 2.0;
    let y = f.top + f.plot_h + below + 22.0;
    writeln!(
        out,
        "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"11\" fill=\"#444\" text-anchor=\"middle\">{}</text>",
        x,
        y,
        escape_html(x_label)
    )?;
    let yx = f.left - 40.0;
    let yy = f.top + f.plot_h / 2.0;
    writeln!(
        out,
        "<text x=\"{yx:.2}\" y=\"{yy:.2}\" font-size=\"11\" fill=\"#444\" text-anchor=\"middle\" transform=\"rotate(-90 {yx:.2} {yy:.2})\">{}</text>",
        escape_html(y_label)
    )?;
    Ok(())
}

pub(crate) fn fmt_tick(v: f64) -> String {
    if (v - v.round()).abs() < 0.001 {
        format!("{}", v.round() as i64)
    } else if v.abs() < 10.0 {
        format!("{:.2}", v)
    } else {
        format!("{:.1}", v)
    }
}

fn nice_ticks(min: f64, max: f64, ticks: usize) -> (f64, f64, usize) {
    let range = (max - min).abs().max(1e-9);
    let rough = range / (ticks as f64 - 1.0);
    let mag = 10f64.powf(rough.abs().log10().floor());
    let norm = rough / mag;
    let step = if norm <= 1.0 {
        1.0
    } else if norm <= 2.0 {
        2.0
    } else if norm <= 5.0 {
        5.0
    } else {
        10.0
    } * mag;
    let start = (min / step).floor() * step;
    let end = (max / step).ceil() * step;
    let count = ((end - start) / step).round() as usize + 1;
    (start, step, count)
}
