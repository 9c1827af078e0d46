//! TUI rendering.
//!
//! ┌──────────────────────────────────────────────────────────┐
//! │  📡 beaconradar   devices 3   lines 812   every 0.20s    │
//! ├────────────────────────┬─────────────────────────────────┤
//! │         ·  │  ·        │ ADDRESS            RSSI SRC ... │
//! │      ·     │ ░░  ·     │ AA:BB:CC:DD:EE:01   -48 A   ... │
//! │   ─ ─ ─ ─ ─+─ ─ ─ A    │ 11:22:33:44:55:66   -71 B   ... │
//! │      ·  B  │     ·     │                                 │
//! ├────────────────────────┴─────────────────────────────────┤
//! │  q quit  p pause  x clear  s snapshot  +/- interval      │
//! └──────────────────────────────────────────────────────────┘

use super::app::App;
use ratatui::{prelude::*, widgets::*};

use beaconradar_core::render::grid::{CENTER, CROSS_H, CROSS_V, RING, SWEEP};
use beaconradar_core::{LegendLayout, LegendRow, SourceTag};

pub fn draw(f: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Min(10),   // main
            Constraint::Length(1), // keys
        ])
        .split(f.area());

    draw_title(f, rows[0], app);
    draw_main(f, rows[1], app);
    draw_keys(f, rows[2]);
}

fn draw_title(f: &mut Frame, area: Rect, app: &App) {
    let stats = app.engine().stats();
    let live = app.frame().map_or(0, |frame| frame.live_devices);
    let interval = app.engine().draw_interval().as_secs_f64();

    let mut spans = vec![
        Span::styled(" 📡 beaconradar ", Style::default().bold().fg(Color::Cyan)),
        Span::raw("  devices "),
        Span::styled(live.to_string(), Style::default().bold().fg(Color::Yellow)),
        Span::styled(
            format!(
                "  lines {}  accepted {}  unresolved {}  every {interval:.2}s ",
                stats.lines, stats.accepted, stats.unresolved
            ),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if app.is_paused() {
        spans.push(Span::styled(" PAUSED ", Style::default().bold().fg(Color::Red)));
    }
    if app.feeds_exhausted() {
        spans.push(Span::styled(" input ended ", Style::default().fg(Color::Magenta)));
    }
    if let Some(err) = app.export_error() {
        spans.push(Span::styled(
            format!(" snapshot failed: {err} "),
            Style::default().fg(Color::Red),
        ));
    } else if let Some(path) = app.last_export() {
        spans.push(Span::styled(
            format!(" saved {} ", path.display()),
            Style::default().fg(Color::Green),
        ));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(spans));

    f.render_widget(block, area);
}

fn draw_main(f: &mut Frame, area: Rect, app: &App) {
    let grid_width = u16::try_from(app.engine().config().grid_width).unwrap_or(u16::MAX);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(grid_width.saturating_add(2)), Constraint::Min(30)])
        .split(area);

    draw_radar(f, cols[0], app);
    draw_legend(f, cols[1], app);
}

fn draw_radar(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().borders(Borders::ALL).title(" Radar ");
    let Some(frame) = app.frame() else {
        let p = Paragraph::new("Waiting for the first frame…")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(p, area);
        return;
    };

    let title = format!(" Radar  sweep {:>3.0}° ", frame.sweep_angle);
    let lines: Vec<Line> = (0..frame.grid.height())
        .map(|row| {
            Line::from(
                frame
                    .grid
                    .row(row)
                    .iter()
                    .map(|&ch| Span::styled(ch.to_string(), glyph_style(ch)))
                    .collect::<Vec<_>>(),
            )
        })
        .collect();

    let p = Paragraph::new(lines).block(block.title(title));
    f.render_widget(p, area);
}

fn glyph_style(ch: char) -> Style {
    match ch {
        RING | CROSS_H | CROSS_V => Style::default().fg(Color::DarkGray),
        CENTER => Style::default().fg(Color::White),
        SWEEP => Style::default().fg(Color::Green),
        c if c == SourceTag::A.marker() => Style::default().bold().fg(Color::Yellow),
        c if c == SourceTag::B.marker() => Style::default().bold().fg(Color::Cyan),
        c if c == SourceTag::Unknown.marker() => Style::default().bold().fg(Color::Magenta),
        _ => Style::default(),
    }
}

fn draw_legend(f: &mut Frame, area: Rect, app: &App) {
    let layout = app.engine().config().legend_layout;
    let rows: Vec<Row> = app
        .frame()
        .map(|frame| frame.legend.rows.iter().map(|row| legend_row(row, layout)).collect())
        .unwrap_or_default();
    let count = rows.len();

    let table = Table::new(rows, legend_widths(layout))
        .header(Row::new(legend_header(layout)).style(Style::default().bold().fg(Color::Cyan)))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Strongest {count} ")),
        );

    f.render_widget(table, area);
}

fn legend_header(layout: LegendLayout) -> Vec<&'static str> {
    match layout {
        LegendLayout::Full => vec!["Address", "RSSI", "Src", "Age", "Name", "Trend"],
        LegendLayout::Compact => vec!["Address", "RSSI", "Src", "Age", "Trend"],
    }
}

fn legend_widths(layout: LegendLayout) -> Vec<Constraint> {
    let mut widths = vec![
        Constraint::Length(17), // address
        Constraint::Length(5),  // rssi
        Constraint::Length(3),  // source
        Constraint::Length(7),  // age
    ];
    if layout == LegendLayout::Full {
        widths.push(Constraint::Length(16)); // name
    }
    widths.push(Constraint::Min(8)); // trend
    widths
}

fn legend_cells(row: &LegendRow, layout: LegendLayout) -> Vec<Cell<'static>> {
    let rssi_style = match row.rssi {
        r if r >= -60 => Style::default().fg(Color::Green),
        r if r >= -75 => Style::default().fg(Color::Yellow),
        _ => Style::default().fg(Color::Red),
    };
    let mut cells = vec![
        Cell::from(row.address.to_string()),
        Cell::from(format!("{:>4}", row.rssi)).style(rssi_style),
        Cell::from(row.source.marker().to_string()),
        Cell::from(format!("{:.1}s", row.age_secs)),
    ];
    if layout == LegendLayout::Full {
        cells.push(Cell::from(row.name.clone().unwrap_or_else(|| "—".into())));
    }
    cells.push(Cell::from(row.sparkline.clone()).style(Style::default().fg(Color::Cyan)));
    cells
}

fn legend_row(row: &LegendRow, layout: LegendLayout) -> Row<'static> {
    Row::new(legend_cells(row, layout))
}

fn draw_keys(f: &mut Frame, area: Rect) {
    let bar = Paragraph::new(
        " q quit   p pause   x clear   s snapshot   +/- redraw interval",
    )
    .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(bar, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> LegendRow {
        LegendRow {
            address: "AA:BB:CC:DD:EE:01".parse().unwrap(),
            source: SourceTag::A,
            rssi: -50,
            age_secs: 0.5,
            name: Some("Tile".into()),
            sparkline: "▁█".into(),
        }
    }

    #[test]
    fn full_layout_has_name_column() {
        let layout = LegendLayout::Full;
        assert!(legend_header(layout).contains(&"Name"));
        assert_eq!(legend_widths(layout).len(), 6);
        assert_eq!(legend_cells(&row(), layout).len(), 6);
    }

    #[test]
    fn compact_layout_drops_name_column() {
        let layout = LegendLayout::Compact;
        assert!(!legend_header(layout).contains(&"Name"));
        assert_eq!(legend_widths(layout).len(), legend_header(layout).len());
        assert_eq!(legend_cells(&row(), layout).len(), 5);
    }
}
