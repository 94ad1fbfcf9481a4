//! Bar chart of the word ranking.
//!
//! The chart is a self-contained SVG document: words along the x-axis
//! with rotated labels, counts on the y-axis. It is also exposed as a
//! base64 data URI so reports can embed it inline.

use crate::models::WordFrequencyMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub const CHART_TITLE: &str = "Top 25 Words in Hacker News Titles";

const BAR_WIDTH: usize = 28;
const BAR_GAP: usize = 10;
const PLOT_HEIGHT: usize = 320;
const MARGIN_LEFT: usize = 60;
const MARGIN_RIGHT: usize = 20;
const MARGIN_TOP: usize = 50;
const LABEL_SPACE: usize = 110;
const MIN_WIDTH: usize = 400;

/// A rendered chart and its embeddable form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedChart {
    pub svg: String,
    pub data_uri: String,
}

/// Render the ranking as an SVG bar chart.
pub fn render_chart(words: &WordFrequencyMap) -> RenderedChart {
    let svg = render_svg(words);
    let data_uri = format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg.as_bytes()));
    RenderedChart { svg, data_uri }
}

fn render_svg(words: &WordFrequencyMap) -> String {
    let entries = words.entries();
    let plot_width = entries.len() * (BAR_WIDTH + BAR_GAP) + BAR_GAP;
    let width = (MARGIN_LEFT + plot_width + MARGIN_RIGHT).max(MIN_WIDTH);
    let height = MARGIN_TOP + PLOT_HEIGHT + LABEL_SPACE;
    let baseline = MARGIN_TOP + PLOT_HEIGHT;
    let max_count = entries.iter().map(|e| e.count).max().unwrap_or(0);

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" font-family=\"sans-serif\">\n",
        w = width,
        h = height
    ));
    svg.push_str(&format!(
        "<rect width=\"{}\" height=\"{}\" fill=\"white\"/>\n",
        width, height
    ));
    svg.push_str(&format!(
        "<text x=\"{}\" y=\"28\" font-size=\"18\" text-anchor=\"middle\">{}</text>\n",
        width / 2,
        CHART_TITLE
    ));

    // Axes
    svg.push_str(&format!(
        "<line x1=\"{x}\" y1=\"{top}\" x2=\"{x}\" y2=\"{base}\" stroke=\"black\"/>\n",
        x = MARGIN_LEFT,
        top = MARGIN_TOP,
        base = baseline
    ));
    svg.push_str(&format!(
        "<line x1=\"{}\" y1=\"{base}\" x2=\"{}\" y2=\"{base}\" stroke=\"black\"/>\n",
        MARGIN_LEFT,
        width - MARGIN_RIGHT,
        base = baseline
    ));

    if max_count == 0 {
        svg.push_str(&format!(
            "<text x=\"{}\" y=\"{}\" font-size=\"14\" text-anchor=\"middle\">No words to display</text>\n",
            width / 2,
            MARGIN_TOP + PLOT_HEIGHT / 2
        ));
        svg.push_str("</svg>\n");
        return svg;
    }

    // Y-axis ticks at 0, half and max
    let mut ticks = vec![0, max_count / 2, max_count];
    ticks.dedup();
    for tick in ticks {
        let y = baseline - scaled(tick, max_count);
        svg.push_str(&format!(
            "<text x=\"{}\" y=\"{}\" font-size=\"11\" text-anchor=\"end\">{}</text>\n",
            MARGIN_LEFT - 6,
            y + 4,
            tick
        ));
    }
    svg.push_str(&format!(
        "<text x=\"16\" y=\"{y}\" font-size=\"12\" text-anchor=\"middle\" transform=\"rotate(-90 16 {y})\">Count</text>\n",
        y = MARGIN_TOP + PLOT_HEIGHT / 2
    ));

    for (i, entry) in entries.iter().enumerate() {
        let x = MARGIN_LEFT + BAR_GAP + i * (BAR_WIDTH + BAR_GAP);
        let bar_height = scaled(entry.count, max_count);
        let word = escape_xml(&entry.word);

        svg.push_str(&format!(
            "<rect class=\"bar\" x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"#ff6600\"><title>{}: {}</title></rect>\n",
            x,
            baseline - bar_height,
            BAR_WIDTH,
            bar_height,
            word,
            entry.count
        ));

        let label_x = x + BAR_WIDTH / 2;
        let label_y = baseline + 12;
        svg.push_str(&format!(
            "<text x=\"{lx}\" y=\"{ly}\" font-size=\"11\" text-anchor=\"end\" transform=\"rotate(-45 {lx} {ly})\">{word}</text>\n",
            lx = label_x,
            ly = label_y,
            word = word
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

fn scaled(count: u64, max_count: u64) -> usize {
    ((count as f64 / max_count as f64) * PLOT_HEIGHT as f64).round() as usize
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
