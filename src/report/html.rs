use super::{escape_html, svg};
use crate::chart::{AnnotationState, GeneLabel, ReportModel};
use crate::core::error::{AtlasError, Result};
use crate::core::model::Status;
use std::fmt::Write as FmtWrite;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const CHART_H: f64 = 380.0;
const HEAT_CELL: f64 = 22.0;

/// Renders the whole report as one self-contained HTML document.
pub fn render(model: &ReportModel) -> Result<String> {
    validate(model)?;
    let mut html = String::with_capacity(256 * 1024);

    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html lang=\"en\">")?;
    writeln!(html, "<head>")?;
    writeln!(html, "<meta charset=\"utf-8\"/>")?;
    writeln!(
        html,
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\"/>"
    )?;
    writeln!(html, "<title>{}</title>", escape_html(&model.title))?;
    write_css(&mut html)?;
    writeln!(html, "</head>")?;
    writeln!(html, "<body>")?;
    writeln!(html, "<div class=\"page\">")?;

    let st = &model.meta.statuses;
    writeln!(html, "<aside class=\"sidebar\">")?;
    writeln!(html, "<h2 id=\"summary\">Summary</h2>")?;
    writeln!(html, "<ul>")?;
    sidebar_item(&mut html, st.genes, "Gene matching", "gene_matching")?;
    sidebar_item(&mut html, st.annotation, "Annotation", "annotation")?;
    sidebar_item(&mut html, st.line, "Expression profile", "expression_profile")?;
    sidebar_item(&mut html, st.bar, "Expression summary", "expression_summary")?;
    sidebar_item(&mut html, st.heatmap, "Z-score heatmap", "zscore_heatmap")?;
    sidebar_item(&mut html, st.replicates, "Replicates", "replicates")?;
    sidebar_item(&mut html, st.table, "Expression table", "expression_table")?;
    writeln!(html, "</ul>")?;
    legend(&mut html, &model.genes)?;
    writeln!(html, "</aside>")?;

    writeln!(html, "<main class=\"main\">")?;
    writeln!(html, "<h1>{}</h1>", escape_html(&model.title))?;
    writeln!(
        html,
        "<div class=\"meta\">Matrix: {}<br/>Genes: {}<br/>Samples: {} in {} conditions<br/>Generated: {} (unix: {})</div>",
        escape_html(&model.meta.matrix_file),
        escape_html(&model.meta.genes_file),
        model.meta.samples,
        model.meta.conditions,
        fmt_timestamp(model.meta.generated_at),
        model.meta.generated_at
    )?;
    if !model.warnings.is_empty() {
        writeln!(html, "<ul class=\"warnings\">")?;
        for w in &model.warnings {
            writeln!(html, "<li>{}</li>", escape_html(w))?;
        }
        writeln!(html, "</ul>")?;
    }

    section_gene_matching(&mut html, model)?;
    section_annotation(&mut html, model)?;
    section_line(&mut html, model)?;
    section_bar(&mut html, model)?;
    section_heatmap(&mut html, model)?;
    section_replicates(&mut html, model)?;
    section_table(&mut html, model)?;

    writeln!(html, "<div class=\"meta\">Produced by kira-atlas</div>")?;
    writeln!(html, "</main>")?;
    writeln!(html, "</div>")?;
    writeln!(html, "<div id=\"tooltip\" class=\"tooltip\"></div>")?;
    embed_model(&mut html, model)?;
    html.push_str("<script>");
    html.push_str(SCRIPT);
    html.push_str("</script>\n");
    writeln!(html, "</body></html>")?;
    Ok(html)
}

pub fn write(path: &Path, html: &str) -> Result<()> {
    let file = File::create(path).map_err(|e| AtlasError::io(path, e))?;
    let mut w = BufWriter::new(file);
    w.write_all(html.as_bytes())
        .and_then(|_| w.flush())
        .map_err(|e| AtlasError::io(path, e))
}

/// Shape checks the script and SVG rely on: every per-gene vector has one
/// entry per gene and every gene index points at an existing gene.
fn validate(model: &ReportModel) -> Result<()> {
    let n = model.genes.len();
    let bad = |what: String| Err(AtlasError::RenderError(what));

    if let Some(line) = model.line() {
        for s in &line.series {
            if s.gene >= n {
                return bad(format!("line series refers to unknown gene {}", s.gene));
            }
            if s.values.len() != line.categories.len() {
                return bad(format!(
                    "line series for gene {} has {} values for {} categories",
                    s.gene,
                    s.values.len(),
                    line.categories.len()
                ));
            }
        }
    }
    if let Some(bar) = model.bar() {
        let lens = [
            bar.genes.len(),
            bar.values.len(),
            bar.missing.len(),
            bar.rank.len(),
        ];
        if lens.iter().any(|&l| l != n) || bar.rank.iter().any(|&g| g >= n) {
            return bad(format!("bar model does not cover {} genes", n));
        }
    }
    if let Some(heat) = model.heatmap() {
        if heat.cells.len() != n || heat.genes.len() != n || heat.zero_variance.len() != n {
            return bad(format!("heatmap has {} rows for {} genes", heat.cells.len(), n));
        }
        if let Some((i, row)) = heat
            .cells
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != heat.columns.len())
        {
            return bad(format!(
                "heatmap row {} has {} cells for {} columns",
                i,
                row.len(),
                heat.columns.len()
            ));
        }
    }
    if let Some(rep) = model.replicates() {
        for g in &rep.genes {
            if g.gene >= n {
                return bad(format!("replicate series refers to unknown gene {}", g.gene));
            }
            let out_of_range = g
                .tracks
                .iter()
                .flat_map(|t| t.points.iter())
                .any(|&(c, _)| c >= rep.conditions.len());
            if out_of_range {
                return bad(format!(
                    "replicate series for gene {} refers to an unknown condition",
                    g.gene
                ));
            }
        }
    }
    for row in &model.table.rows {
        if row.gene >= n
            || row.values.len() != model.table.value_columns.len()
            || row.annotation.len() != model.table.annotation_columns.len()
        {
            return bad(format!("table row for gene {} has the wrong width", row.gene));
        }
    }
    Ok(())
}

/// `<` is escaped as a JSON unicode escape so no text can close the element.
fn embed_model(out: &mut String, model: &ReportModel) -> Result<()> {
    let json = serde_json::to_string(model)?;
    writeln!(
        out,
        "<script type=\"application/json\" id=\"atlas-model\">{}</script>",
        json.replace('<', "\\u003c")
    )?;
    Ok(())
}

fn write_css(html: &mut String) -> Result<()> {
    writeln!(html, "<style>")?;
    writeln!(
        html,
        "body{{font-family:Arial,Helvetica,sans-serif;margin:0;background:#eee;color:#222;}}"
    )?;
    writeln!(
        html,
        ".page{{display:flex;align-items:flex-start;gap:16px;padding:16px;}}"
    )?;
    writeln!(
        html,
        ".sidebar{{width:250px;position:sticky;top:16px;background:#f6f6f6;border:1px solid #ddd;border-radius:4px;padding:10px;max-height:calc(100vh - 52px);overflow:auto;}}"
    )?;
    writeln!(html, ".sidebar h2{{margin:4px 0 8px 0;font-size:16px;}}")?;
    writeln!(html, ".sidebar ul{{list-style:none;margin:0;padding:0;}}")?;
    writeln!(
        html,
        ".sidebar li{{display:flex;align-items:center;gap:8px;padding:4px 0;font-size:13px;}}"
    )?;
    writeln!(html, ".sidebar a{{color:#003366;text-decoration:none;}}")?;
    writeln!(html, ".sidebar a:hover{{text-decoration:underline;}}")?;
    writeln!(
        html,
        ".legend{{margin-top:12px;border-top:1px solid #ddd;padding-top:8px;}}"
    )?;
    writeln!(
        html,
        ".legend input{{width:100%;box-sizing:border-box;margin-bottom:6px;padding:3px 5px;}}"
    )?;
    writeln!(
        html,
        ".legend-item{{cursor:pointer;user-select:none;}}.legend-item.off{{opacity:0.35;text-decoration:line-through;}}"
    )?;
    writeln!(
        html,
        ".swatch{{display:inline-block;width:14px;height:4px;vertical-align:middle;}}"
    )?;
    writeln!(
        html,
        ".main{{flex:1;min-width:0;background:#fff;border:1px solid #ddd;border-radius:4px;box-shadow:0 1px 3px rgba(0,0,0,0.08);padding:16px 20px;}}"
    )?;
    writeln!(html, "h1{{margin:0 0 6px 0;font-size:22px;}}")?;
    writeln!(
        html,
        ".meta{{color:#555;font-size:12px;margin-bottom:12px;}}"
    )?;
    writeln!(
        html,
        ".warnings{{background:#fff7e0;border:1px solid #f0d48a;border-radius:4px;padding:6px 10px 6px 28px;font-size:13px;}}"
    )?;
    writeln!(
        html,
        ".module{{padding:8px 0 14px 0;border-bottom:1px solid #eee;}}"
    )?;
    writeln!(html, ".module:last-child{{border-bottom:none;}}")?;
    writeln!(
        html,
        ".module h2{{display:flex;align-items:center;gap:8px;font-size:18px;margin:20px 0 6px 0;}}"
    )?;
    writeln!(
        html,
        ".desc{{color:#444;font-size:13px;max-width:1000px;margin:4px 0 10px 0;}}"
    )?;
    writeln!(html, ".tools{{margin:4px 0;}}.tools button,.tools select{{font-size:12px;margin-right:6px;}}")?;
    writeln!(html, ".plot{{margin:8px 0 6px 0;overflow-x:auto;}}")?;
    writeln!(html, "svg.chart{{background:#fafafa;border:1px solid #e5e5e5;}}")?;
    writeln!(html, "svg.chart.zoomed{{width:100%;height:auto;}}")?;
    writeln!(
        html,
        ".table{{border-collapse:collapse;width:100%;font-size:12px;}}"
    )?;
    writeln!(
        html,
        ".table th,.table td{{border:1px solid #ddd;padding:4px 6px;text-align:right;}}"
    )?;
    writeln!(
        html,
        ".table th{{background:#3b6ea5;color:#fff;cursor:pointer;}}"
    )?;
    writeln!(
        html,
        ".table th:first-child,.table td:first-child,.table td.attr{{text-align:left;}}"
    )?;
    writeln!(
        html,
        ".tooltip{{position:absolute;display:none;pointer-events:none;background:rgba(255,255,255,0.96);border:1px solid #bbb;border-radius:3px;padding:6px 8px;font-size:12px;box-shadow:0 1px 4px rgba(0,0,0,0.15);max-width:320px;}}"
    )?;
    writeln!(html, ".tip-k{{color:#777;}}")?;
    writeln!(
        html,
        ".back{{font-size:12px;margin-top:6px;display:inline-block;}}"
    )?;
    writeln!(
        html,
        "section:target{{outline:2px solid #99c;outline-offset:4px;border-radius:4px;}}"
    )?;
    writeln!(html, "</style>")?;
    Ok(())
}

fn section_gene_matching(out: &mut String, model: &ReportModel) -> Result<()> {
    section_header(out, model.meta.statuses.genes, "Gene matching", "gene_matching")?;
    module_desc(
        out,
        &format!(
            "{} of {} requested genes were found in the expression matrix.",
            model.meta.matched, model.meta.requested
        ),
    )?;
    if !model.unmatched.is_empty() {
        let ids = model
            .unmatched
            .iter()
            .map(|s| escape_html(s))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(out, "<p class=\"desc\"><b>Not found:</b> {}</p>", ids)?;
    }
    section_footer(out)
}

fn section_annotation(out: &mut String, model: &ReportModel) -> Result<()> {
    section_header(out, model.meta.statuses.annotation, "Annotation", "annotation")?;
    let text = match &model.meta.annotation {
        AnnotationState::NotProvided => "No annotation table was supplied.".to_string(),
        AnnotationState::Loaded {
            file,
            records,
            duplicates,
        } => {
            let annotated = model.genes.iter().filter(|g| !g.annotation.is_empty()).count();
            let mut s = format!(
                "{}: {} records; {} of {} displayed genes annotated.",
                escape_html(file),
                records,
                annotated,
                model.genes.len()
            );
            if *duplicates > 0 {
                write!(s, " {} duplicate records ignored.", duplicates)?;
            }
            s
        }
        AnnotationState::Degraded { file, reason } => format!(
            "{} could not be used ({}). Charts are shown without annotation.",
            escape_html(file),
            escape_html(reason)
        ),
    };
    module_desc(out, &text)?;
    section_footer(out)
}

fn section_line(out: &mut String, model: &ReportModel) -> Result<()> {
    let Some(line) = model.line() else {
        return Ok(());
    };
    section_header(
        out,
        model.meta.statuses.line,
        "Expression profile",
        "expression_profile",
    )?;
    module_desc(
        out,
        "Mean expression of each selected gene per condition. Gaps mark conditions with no measured value.",
    )?;
    zoom_button(out, "line-chart")?;
    writeln!(out, "<div class=\"plot\">")?;
    svg::line_chart(
        out,
        line,
        &model.genes,
        chart_width(line.categories.len()),
        CHART_H,
    )?;
    writeln!(out, "</div>")?;
    section_footer(out)
}

fn section_bar(out: &mut String, model: &ReportModel) -> Result<()> {
    let Some(bar) = model.bar() else {
        return Ok(());
    };
    section_header(
        out,
        model.meta.statuses.bar,
        "Expression summary",
        "expression_summary",
    )?;
    module_desc(
        out,
        &format!(
            "{} per gene. Bars marked n/a have no value for the chosen statistic.",
            escape_html(&bar.y_label)
        ),
    )?;
    writeln!(
        out,
        "<div class=\"tools\"><button id=\"bar-order\" type=\"button\">Ranked order</button><button class=\"zoom\" type=\"button\" data-target=\"bar-chart\">Zoom</button></div>"
    )?;
    writeln!(out, "<div class=\"plot\">")?;
    svg::bar_chart(out, bar, &model.genes, chart_width(bar.genes.len()), CHART_H)?;
    writeln!(out, "</div>")?;
    section_footer(out)
}

fn section_heatmap(out: &mut String, model: &ReportModel) -> Result<()> {
    let Some(heat) = model.heatmap() else {
        return Ok(());
    };
    section_header(
        out,
        model.meta.statuses.heatmap,
        "Z-score heatmap",
        "zscore_heatmap",
    )?;
    let mut desc = "Row-wise z-scores of condition means. Grey cells have no value.".to_string();
    if model.meta.zero_variance_rows > 0 {
        write!(
            desc,
            " {} gene(s) with zero variance are drawn at z = 0.",
            model.meta.zero_variance_rows
        )?;
    }
    module_desc(out, &desc)?;
    zoom_button(out, "heatmap-chart")?;
    writeln!(out, "<div class=\"plot\">")?;
    svg::heatmap(out, heat, &model.genes, HEAT_CELL)?;
    writeln!(out, "</div>")?;
    section_footer(out)
}

fn section_replicates(out: &mut String, model: &ReportModel) -> Result<()> {
    let Some(rep) = model.replicates() else {
        return Ok(());
    };
    section_header(out, model.meta.statuses.replicates, "Replicates", "replicates")?;
    module_desc(
        out,
        "Individual replicate values of one gene per condition. Columns sharing a header name are replicates.",
    )?;
    write!(out, "<div class=\"tools\"><select id=\"rep-gene\">")?;
    for g in &rep.genes {
        let label = model
            .genes
            .get(g.gene)
            .map(|l| l.display.as_str())
            .unwrap_or("");
        write!(
            out,
            "<option value=\"{}\">{}</option>",
            g.gene,
            escape_html(label)
        )?;
    }
    writeln!(
        out,
        "</select><button class=\"zoom\" type=\"button\" data-target=\"replicate-chart\">Zoom</button></div>"
    )?;
    writeln!(out, "<div class=\"plot\">")?;
    svg::replicate_chart(
        out,
        rep,
        &model.genes,
        chart_width(rep.conditions.len()),
        CHART_H,
    )?;
    writeln!(out, "</div>")?;
    section_footer(out)
}

fn section_table(out: &mut String, model: &ReportModel) -> Result<()> {
    let t = &model.table;
    section_header(
        out,
        model.meta.statuses.table,
        "Expression table",
        "expression_table",
    )?;
    module_desc(out, "Raw values of the selected genes. Click a column header to sort.")?;
    writeln!(
        out,
        "<details open><summary>Table</summary><table id=\"expr-table\" class=\"table sortable\">"
    )?;
    write!(out, "<thead><tr><th>{}</th>", escape_html(&t.id_column))?;
    for c in t.value_columns.iter().chain(&t.annotation_columns) {
        write!(out, "<th>{}</th>", escape_html(c))?;
    }
    writeln!(out, "</tr></thead><tbody>")?;
    for row in &t.rows {
        let id = model.genes.get(row.gene).map(|g| g.id.as_str()).unwrap_or("");
        write!(
            out,
            "<tr data-gene=\"{}\"><td>{}</td>",
            row.gene,
            escape_html(id)
        )?;
        for v in &row.values {
            match v {
                Some(v) => write!(out, "<td>{}</td>", v)?,
                None => write!(out, "<td class=\"na\">NA</td>")?,
            }
        }
        for a in &row.annotation {
            write!(out, "<td class=\"attr\">{}</td>", escape_html(a))?;
        }
        writeln!(out, "</tr>")?;
    }
    writeln!(out, "</tbody></table></details>")?;
    section_footer(out)
}

fn legend(out: &mut String, genes: &[GeneLabel]) -> Result<()> {
    writeln!(out, "<div class=\"legend\">")?;
    writeln!(out, "<h2>Genes</h2>")?;
    writeln!(
        out,
        "<input id=\"gene-filter\" type=\"search\" placeholder=\"Filter genes\"/>"
    )?;
    writeln!(out, "<ul>")?;
    for (i, g) in genes.iter().enumerate() {
        writeln!(
            out,
            "<li class=\"legend-item\" data-gene=\"{}\" title=\"Click to show or hide\"><span class=\"swatch\" style=\"background:{}\"></span>{}</li>",
            i,
            escape_html(&g.color),
            escape_html(&g.display)
        )?;
    }
    writeln!(out, "</ul>")?;
    writeln!(out, "</div>")?;
    Ok(())
}

fn zoom_button(out: &mut String, target: &str) -> Result<()> {
    writeln!(
        out,
        "<div class=\"tools\"><button class=\"zoom\" type=\"button\" data-target=\"{}\">Zoom</button></div>",
        target
    )?;
    Ok(())
}

fn chart_width(categories: usize) -> f64 {
    (140.0 + 64.0 * categories as f64).clamp(640.0, 1600.0)
}

fn module_desc(out: &mut String, text: &str) -> Result<()> {
    writeln!(out, "<p class=\"desc\">{}</p>", text)?;
    Ok(())
}

fn status_icon_svg(status: Status, size: u32) -> String {
    let (fill, mark) = match status {
        Status::Pass => ("#2e8b57", "M6 10 L10 14 L18 6"),
        Status::Warn => ("#e6a400", "M11 5 L11 13 M11 16 L11 18"),
        Status::Fail => ("#c00000", "M6 6 L18 18 M18 6 L6 18"),
    };
    format!(
        "<svg class=\"icon {cls}\" width=\"{s}\" height=\"{s}\" viewBox=\"0 0 24 24\" aria-hidden=\"true\"><circle cx=\"12\" cy=\"12\" r=\"11\" fill=\"{f}\"/><path d=\"{p}\" stroke=\"#fff\" stroke-width=\"2\" fill=\"none\" stroke-linecap=\"round\" stroke-linejoin=\"round\"/></svg>",
        cls = status.as_str_lower(),
        s = size,
        f = fill,
        p = mark
    )
}

fn sidebar_item(out: &mut String, status: Status, name: &str, id: &str) -> Result<()> {
    writeln!(
        out,
        "<li>{} <a href=\"#{}\">{}</a></li>",
        status_icon_svg(status, 14),
        id,
        name
    )?;
    Ok(())
}

fn section_header(out: &mut String, status: Status, title: &str, id: &str) -> Result<()> {
    writeln!(out, "<section id=\"{}\" class=\"module\">", id)?;
    writeln!(out, "<h2>{} {}</h2>", status_icon_svg(status, 16), title)?;
    Ok(())
}

fn section_footer(out: &mut String) -> Result<()> {
    writeln!(
        out,
        "<a class=\"back\" href=\"#summary\">Back to Summary</a>"
    )?;
    writeln!(out, "</section>")?;
    Ok(())
}

fn fmt_timestamp(ts: u64) -> String {
    let days = (ts / 86_400) as i64;
    let secs = (ts % 86_400) as u32;
    let (hour, min, sec) = (secs / 3_600, (secs % 3_600) / 60, secs % 60);

    // Civil date from days since 1970-01-01.
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(m <= 2);

    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02} UTC",
        year, m, d, hour, min, sec
    )
}

const SCRIPT: &str = r#"(function(){
const M=JSON.parse(document.getElementById('atlas-model').textContent);
const chart=t=>M.charts.find(c=>c.type===t)||{};
const cats={'line-chart':chart('line').categories,'heatmap-chart':chart('heatmap').columns,'replicate-chart':chart('replicates').conditions};
const tip=document.getElementById('tooltip');
const esc=s=>String(s).replace(/[&<>]/g,c=>({'&':'&amp;','<':'&lt;','>':'&gt;'}[c]));
const fmt=v=>{const n=Number(v);return Number.isInteger(n)||Math.abs(n)>=1000?String(n):n.toPrecision(4);};
function trackName(gene,track){const g=(chart('replicates').genes||[]).find(x=>x.gene===gene);return g&&g.tracks[track]?g.tracks[track].name:'';}
function tipHtml(el){
const gi=+el.dataset.gene;const g=M.genes[gi];const svg=el.closest('svg');
let h='<b>'+esc(g.display)+'</b>';
if(el.dataset.cat!==undefined&&cats[svg.id]){h+='<br>'+esc(cats[svg.id][+el.dataset.cat]);}
if(el.dataset.track!==undefined){h+=' &middot; '+esc(trackName(gi,+el.dataset.track));}
h+='<br>value: '+(el.dataset.missing?'missing':fmt(el.dataset.value));
if(el.dataset.z!==undefined&&!el.dataset.missing){h+='<br>z: '+fmt(el.dataset.z);}
g.annotation.forEach(a=>{h+='<br><span class=tip-k>'+esc(a.name)+':</span> '+esc(a.value);});
return h;}
document.querySelectorAll('svg .pt, svg .bar, svg .cell').forEach(el=>{
el.addEventListener('mouseenter',()=>{tip.innerHTML=tipHtml(el);tip.style.display='block';});
el.addEventListener('mousemove',e=>{tip.style.left=(e.pageX+12)+'px';tip.style.top=(e.pageY+12)+'px';});
el.addEventListener('mouseleave',()=>{tip.style.display='none';});});
const hidden=new Set();let filter='';
function apply(){M.genes.forEach((g,i)=>{
const sel='[data-gene="'+i+'"]';
const match=!filter||g.id.toLowerCase().includes(filter)||g.display.toLowerCase().includes(filter);
const show=match&&!hidden.has(i);
document.querySelectorAll('.series'+sel).forEach(el=>{el.style.display=show?'':'none';});
document.querySelectorAll('.legend-item'+sel).forEach(el=>{el.style.display=match?'':'none';el.classList.toggle('off',hidden.has(i));});
document.querySelectorAll('#expr-table tr'+sel).forEach(el=>{el.style.display=match?'':'none';});
const opt=document.querySelector('#rep-gene option[value="'+i+'"]');if(opt){opt.hidden=!match;}});}
document.querySelectorAll('.legend-item').forEach(el=>el.addEventListener('click',()=>{const i=+el.dataset.gene;if(hidden.has(i)){hidden.delete(i);}else{hidden.add(i);}apply();}));
const gf=document.getElementById('gene-filter');if(gf){gf.addEventListener('input',()=>{filter=gf.value.trim().toLowerCase();apply();});}
const bs=document.getElementById('bar-chart'),bo=document.getElementById('bar-order');
if(bs&&bo){let ranked=false;const left=+bs.dataset.left,band=+bs.dataset.band;
bo.addEventListener('click',()=>{ranked=!ranked;bo.textContent=ranked?'Selection order':'Ranked order';
bs.querySelectorAll('.bar-slot').forEach(g=>{const p=ranked?+g.dataset.rankPos:+g.dataset.order;g.setAttribute('transform','translate('+(left+p*band)+',0)');});});}
document.querySelectorAll('button.zoom').forEach(b=>b.addEventListener('click',()=>{const s=document.getElementById(b.dataset.target);if(s){s.classList.toggle('zoomed');b.textContent=s.classList.contains('zoomed')?'Reset zoom':'Zoom';}}));
const rs=document.getElementById('rep-gene');if(rs){rs.addEventListener('change',()=>{document.querySelectorAll('.rep-gene').forEach(g=>{g.style.display=g.dataset.gene===rs.value?'':'none';});});}
document.querySelectorAll('table.sortable').forEach(t=>{const body=t.tBodies[0];t.querySelectorAll('th').forEach((th,i)=>{th.addEventListener('click',()=>{const rows=[...body.rows];const asc=th.getAttribute('data-asc')!=='true';rows.sort((a,b)=>{const av=a.children[i].innerText;const bv=b.children[i].innerText;const an=parseFloat(av);const bn=parseFloat(bv);if(!isNaN(an)&&!isNaN(bn)){return asc?an-bn:bn-an;}return asc?av.localeCompare(bv):bv.localeCompare(av);});th.setAttribute('data-asc',asc);rows.forEach(r=>body.appendChild(r));});});});
})();"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{self, ChartConfig, ReportContext};
    use crate::core::align::align;
    use crate::core::annotation;
    use crate::core::genes::GeneSelection;
    use crate::core::matrix::{self, LoadOptions};
    use crate::core::stats::{StatsConfig, derive};

    fn model(genes: &[&str], ann: Option<&str>) -> ReportModel {
        let m = matrix::parse(
            b"gene\tliver\tliver\tbrain\nG1\t1\t3\t8\nG2\t2\t2\t2\nG3\t10\tNA\t0\n",
            &LoadOptions::default(),
        )
        .unwrap();
        let ann = ann.map(|a| annotation::parse(a.as_bytes(), None).unwrap());
        let a = align(&m, &GeneSelection::from_ids(genes), ann.as_ref()).unwrap();
        let d = derive(&a.dataset, &StatsConfig::default()).unwrap();
        let ctx = ReportContext {
            matrix_file: "counts.tsv".to_string(),
            genes_file: "genes.txt".to_string(),
            annotation: AnnotationState::NotProvided,
            requested: genes.len(),
            unmatched: a.unmatched.clone(),
            warnings: Vec::new(),
            generated_at: 1_700_000_000,
        };
        chart::build(&a.dataset, &d, &ctx, &ChartConfig::default())
    }

    #[test]
    fn report_is_self_contained() {
        let html = render(&model(&["G3", "G1", "G2"], None)).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("id=\"atlas-model\""));
        assert!(html.contains("id=\"line-chart\""));
        assert!(html.contains("id=\"bar-chart\""));
        assert!(html.contains("id=\"heatmap-chart\""));
        assert!(html.contains("id=\"replicate-chart\""));
        assert!(html.contains("table sortable"));
        assert!(!html.contains("http://"));
        assert!(!html.contains("https://"));
        assert!(!html.contains("<script src"));
        assert!(!html.contains("<link"));
    }

    #[test]
    fn embedded_json_follows_selection_order() {
        let html = render(&model(&["G3", "G1"], None)).unwrap();
        let start = html.find("id=\"atlas-model\">").unwrap() + "id=\"atlas-model\">".len();
        let end = start + html[start..].find("</script>").unwrap();
        let v: serde_json::Value = serde_json::from_str(&html[start..end]).unwrap();
        assert_eq!(v["genes"][0]["id"], "G3");
        assert_eq!(v["genes"][1]["id"], "G1");
        assert_eq!(v["charts"][0]["categories"][0], "liver");
        assert_eq!(v["charts"][0]["categories"][1], "brain");
    }

    #[test]
    fn hostile_text_is_escaped() {
        let ann = "gene_id\tsymbol\nG1\t</script><script>alert(1)</script>\n";
        let html = render(&model(&["G1"], Some(ann))).unwrap();
        assert_eq!(html.matches("<script").count(), 2);
        assert!(html.contains("&lt;/script&gt;&lt;script&gt;alert(1)"));
        assert!(html.contains("\\u003c/script>\\u003cscript>alert(1)"));
    }

    #[test]
    fn title_is_escaped() {
        let mut m = model(&["G1"], None);
        m.title = "A & B <test>".to_string();
        let html = render(&m).unwrap();
        assert!(html.contains("<title>A &amp; B &lt;test&gt;</title>"));
    }

    #[test]
    fn shape_violations_are_render_errors() {
        let mut m = model(&["G1", "G2"], None);
        if let Some(chart::ChartModel::Line(line)) = m.charts.get_mut(0) {
            line.series[0].values.pop();
        }
        assert!(matches!(render(&m), Err(AtlasError::RenderError(_))));

        let mut m = model(&["G1", "G2"], None);
        if let Some(chart::ChartModel::Heatmap(h)) = m.charts.get_mut(2) {
            let extra = h.cells[1][0].clone();
            h.cells[1].push(extra);
        }
        assert!(matches!(render(&m), Err(AtlasError::RenderError(_))));

        let mut m = model(&["G1"], None);
        if let Some(chart::ChartModel::Replicates(r)) = m.charts.get_mut(3) {
            r.genes[0].gene = 5;
        }
        assert!(matches!(render(&m), Err(AtlasError::RenderError(_))));
    }

    #[test]
    fn missing_values_render_as_na_and_gaps() {
        let html = render(&model(&["G3"], None)).unwrap();
        assert!(html.contains("<td class=\"na\">NA</td>"));
        assert!(html.contains("data-gene=\"0\""));
        assert!(html.contains("Ranked order"));
    }

    #[test]
    fn statuses_drive_sidebar_icons() {
        let html = render(&model(&["G2", "G1"], None)).unwrap();
        assert!(html.contains("icon warn"));
        assert!(html.contains("href=\"#zscore_heatmap\""));
    }

    #[test]
    fn timestamp_formatting() {
        assert_eq!(fmt_timestamp(0), "1970-01-01 00:00:00 UTC");
        assert_eq!(fmt_timestamp(1_700_000_000), "2023-11-14 22:13:20 UTC");
    }

    #[test]
    fn writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.html");
        write(&path, "<html></html>").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<html></html>");
    }
}
