// SPDX-License-Identifier: GPL-3.0-only

//! Terminal-based detection viewer
//!
//! Renders the latest annotated frame to the terminal using Unicode
//! half-block characters for improved vertical resolution, with detection
//! boxes and labels drawn on top.

use crate::backends::camera::Frame;
use crate::config::PipelineConfig;
use crate::constants::{self, driver::RESULT_POLL_TIMEOUT};
use crate::detection::{BoundingBox, Detection};
use crate::errors::AppResult;
use crate::pipelines::build_detection_pipeline;
use crate::pipelines::detection::{
    DetectionPipeline, DetectionResult, Received, StatsSnapshot, Termination, WorkerPhase,
};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};
use std::io::{self, stdout};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

/// Run the terminal viewer until the user quits or the pipeline ends
pub fn run(config: PipelineConfig) -> AppResult<Option<Termination>> {
    let mut pipeline = build_detection_pipeline(config)?;
    pipeline.start()?;

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let result = run_app(&mut terminal, &mut pipeline);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result?;
    Ok(pipeline.shutdown())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    pipeline: &mut DetectionPipeline,
) -> AppResult<()> {
    let mut frame_widget = FrameWidget::new();
    let mut notice: Option<String> = None;
    let mut last_phrase: Option<String> = None;

    while pipeline.is_alive() {
        // Wait briefly for a result, then skip to the newest one
        if let Received::Item(result) = pipeline.results().recv_timeout(RESULT_POLL_TIMEOUT) {
            frame_widget.update(result);
        }
        while let Some(result) = pipeline.results().try_recv() {
            frame_widget.update(result);
        }
        if let Some(announcement) = frame_widget
            .result
            .as_ref()
            .and_then(|r| r.announcement.as_ref())
        {
            last_phrase = Some(announcement.phrase.clone());
        }

        let status_message = notice.clone().unwrap_or_else(|| {
            build_status_message(
                frame_widget.result.as_ref(),
                &pipeline.stats(),
                pipeline.phase(),
                last_phrase.as_deref(),
            )
        });

        terminal.draw(|f| {
            let area = f.area();

            // Reserve bottom line for status
            let camera_area = Rect {
                x: area.x,
                y: area.y,
                width: area.width,
                height: area.height.saturating_sub(1),
            };
            f.render_widget(&frame_widget, camera_area);

            let status_area = Rect {
                x: area.x,
                y: area.height.saturating_sub(1),
                width: area.width,
                height: 1,
            };
            let status = StatusBar {
                message: &status_message,
            };
            f.render_widget(status, status_area);
        })?;

        if event::poll(Duration::ZERO)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            let ctrl_c =
                key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
            if ctrl_c || key.code == KeyCode::Char('q') {
                pipeline.stop();
                break;
            }

            if key.code == KeyCode::Char('p')
                && let Some(result) = &frame_widget.result
            {
                notice = Some(match save_snapshot(&result.frame) {
                    Ok(path) => format!("Saved: {}", path.display()),
                    Err(e) => {
                        error!("Failed to save snapshot: {}", e);
                        format!("Error: {}", e)
                    }
                });
            } else {
                notice = None;
            }
        }
    }

    Ok(())
}

fn build_status_message(
    result: Option<&DetectionResult>,
    stats: &StatsSnapshot,
    phase: WorkerPhase,
    last_phrase: Option<&str>,
) -> String {
    let mut msg = match result {
        Some(result) => format!("#{} {} objects", result.sequence, result.detections.len()),
        None => "waiting".to_string(),
    };
    if stats.dropped > 0 {
        msg.push_str(&format!(" | dropped {}", stats.dropped));
    }
    if let Some(phrase) = last_phrase {
        msg.push_str(&format!(" | said: {}", phrase));
    }
    msg.push_str(&format!(" | {} | 'p' snapshot | 'q' quit", phase));
    msg
}

fn snapshot_directory() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join(constants::APP_NAME)
}

/// Save a frame as a JPEG snapshot
fn save_snapshot(frame: &Frame) -> AppResult<PathBuf> {
    let img = frame.to_image().ok_or("Failed to create image")?;

    let dir = snapshot_directory();
    std::fs::create_dir_all(&dir)?;

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let filepath = dir.join(format!("IMG_{}.jpg", timestamp));

    img.save(&filepath)?;
    info!(path = %filepath.display(), "Snapshot saved");

    Ok(filepath)
}

/// Where a frame lands inside a terminal area
///
/// Each terminal cell displays 2 vertical pixels using half-block characters.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Viewport {
    x_offset: u16,
    y_offset: u16,
    width: u16,
    height: u16,
    /// Frame pixels per terminal column
    x_scale: f64,
    /// Frame pixels per half cell
    y_scale: f64,
}

impl Viewport {
    fn fit(frame_width: u32, frame_height: u32, area: Rect) -> Option<Self> {
        if frame_width == 0 || frame_height == 0 || area.width == 0 || area.height == 0 {
            return None;
        }

        // Calculate display dimensions maintaining aspect ratio
        let frame_aspect = frame_width as f64 / frame_height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height as f64) * 2.0; // *2 because half-blocks

        let (width, height) = if term_width / term_height > frame_aspect {
            // Terminal is wider - fit to height
            let w = term_height * frame_aspect;
            (w as u16, area.height)
        } else {
            // Terminal is taller - fit to width
            let h = term_width / frame_aspect;
            (area.width, (h / 2.0) as u16)
        };
        if width == 0 || height == 0 {
            return None;
        }

        Some(Self {
            x_offset: area.x + (area.width.saturating_sub(width)) / 2,
            y_offset: area.y + (area.height.saturating_sub(height)) / 2,
            width,
            height,
            x_scale: frame_width as f64 / width as f64,
            y_scale: frame_height as f64 / (height as f64 * 2.0),
        })
    }

    /// Terminal cell covering a frame pixel position
    fn cell_at(&self, x: f32, y: f32) -> (u16, u16) {
        let tx = ((x as f64 / self.x_scale) as u16).min(self.width - 1);
        let ty = ((y as f64 / (self.y_scale * 2.0)) as u16).min(self.height - 1);
        (self.x_offset + tx, self.y_offset + ty)
    }
}

/// Widget that renders the latest result using half-block characters
struct FrameWidget {
    result: Option<DetectionResult>,
}

impl FrameWidget {
    fn new() -> Self {
        Self { result: None }
    }

    fn update(&mut self, result: DetectionResult) {
        self.result = Some(result);
    }
}

impl Widget for &FrameWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(result) = &self.result else {
            // No frame yet - show placeholder
            let msg = "Waiting for camera...";
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, Style::default());
            }
            return;
        };

        let frame = &result.frame;
        let Some(view) = Viewport::fit(frame.width, frame.height, area) else {
            return;
        };

        // Upper half (▀) colored with fg, lower half with bg
        for ty in 0..view.height {
            for tx in 0..view.width {
                let src_x = (tx as f64 * view.x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * view.y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * view.y_scale) as u32;

                let (r, g, b) = frame.pixel(src_x, src_y_top);
                let top = Color::Rgb(r, g, b);
                let (r, g, b) = frame.pixel(src_x, src_y_bottom);
                let bottom = Color::Rgb(r, g, b);

                if let Some(cell) = buf.cell_mut((view.x_offset + tx, view.y_offset + ty)) {
                    cell.set_char('▀');
                    cell.set_fg(top);
                    cell.set_bg(bottom);
                }
            }
        }

        for detection in &result.detections {
            draw_detection(buf, &view, detection);
        }
    }
}

fn label_color(label: &str) -> Color {
    const PALETTE: [Color; 6] = [
        Color::Yellow,
        Color::LightGreen,
        Color::LightCyan,
        Color::LightMagenta,
        Color::LightRed,
        Color::LightBlue,
    ];
    let hash = label
        .bytes()
        .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
    PALETTE[hash % PALETTE.len()]
}

/// Outline a detection box and put its label on the top edge
fn draw_detection(buf: &mut Buffer, view: &Viewport, detection: &Detection) {
    let BoundingBox { x1, y1, x2, y2 } = detection.bbox;
    let (left, top) = view.cell_at(x1, y1);
    let (right, bottom) = view.cell_at(x2, y2);
    let color = label_color(&detection.label);

    let mut put = |x: u16, y: u16, ch: char| {
        if let Some(cell) = buf.cell_mut((x, y)) {
            cell.set_char(ch);
            cell.set_fg(color);
        }
    };

    for x in left..=right {
        put(x, top, '─');
        put(x, bottom, '─');
    }
    for y in top..=bottom {
        put(left, y, '│');
        put(right, y, '│');
    }
    put(left, top, '┌');
    put(right, top, '┐');
    put(left, bottom, '└');
    put(right, bottom, '┘');

    let caption = format!(" {} {:.2} ", detection.label, detection.confidence);
    let max_width = (view.x_offset + view.width).saturating_sub(left + 1) as usize;
    let caption: String = caption.chars().take(max_width).collect();
    buf.set_string(
        left + 1,
        top,
        caption,
        Style::default().fg(Color::Black).bg(color),
    );
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Fill background
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(
            area.x,
            area.y,
            text,
            Style::default().fg(Color::White).bg(Color::DarkGray),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn result_with(detections: Vec<Detection>) -> DetectionResult {
        DetectionResult {
            sequence: 3,
            frame: Frame::solid(80, 40, [10, 20, 30], 0),
            detections,
            announcement: None,
            cycle_duration: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_viewport_fits_wide_terminal() {
        // 80x40 frame in a 100x10 area: height-bound, 40 px tall over 20 half rows
        let view = Viewport::fit(80, 40, Rect::new(0, 0, 100, 10)).unwrap();
        assert_eq!(view.height, 10);
        assert_eq!(view.width, 40);
        assert_eq!(view.x_offset, 30);
        assert_eq!(view.y_offset, 0);
    }

    #[test]
    fn test_viewport_rejects_empty_area() {
        assert!(Viewport::fit(80, 40, Rect::new(0, 0, 0, 10)).is_none());
        assert!(Viewport::fit(0, 40, Rect::new(0, 0, 10, 10)).is_none());
    }

    #[test]
    fn test_placeholder_without_result() {
        let area = Rect::new(0, 0, 40, 5);
        let mut buf = Buffer::empty(area);
        (&FrameWidget::new()).render(area, &mut buf);
        let row: String = (0..area.width).map(|x| buf[(x, 2)].symbol()).collect();
        assert!(row.contains("Waiting for camera..."));
    }

    #[test]
    fn test_frame_and_box_rendering() {
        let area = Rect::new(0, 0, 80, 20);
        let mut buf = Buffer::empty(area);
        let mut widget = FrameWidget::new();
        widget.update(result_with(vec![Detection::new(
            "cat",
            0.9,
            BoundingBox::new(10.0, 10.0, 50.0, 30.0),
        )]));
        (&widget).render(area, &mut buf);

        // Pixels use half blocks with the frame colour
        let cell = &buf[(79, 19)];
        assert_eq!(cell.symbol(), "▀");
        assert_eq!(cell.fg, Color::Rgb(10, 20, 30));

        // One column per pixel, one row per two pixels
        assert_eq!(buf[(10, 5)].symbol(), "┌");
        assert_eq!(buf[(50, 15)].symbol(), "┘");
        let top: String = (11..20).map(|x| buf[(x, 5)].symbol()).collect();
        assert!(top.contains("cat 0.90"));
    }

    #[test]
    fn test_status_message() {
        let result = result_with(Vec::new());
        let stats = StatsSnapshot {
            dropped: 4,
            ..Default::default()
        };
        let msg = build_status_message(
            Some(&result),
            &stats,
            WorkerPhase::Pacing,
            Some("cat, dog"),
        );
        assert!(msg.starts_with("#3 0 objects"));
        assert!(msg.contains("dropped 4"));
        assert!(msg.contains("said: cat, dog"));
        assert!(msg.contains("pacing"));
    }

    #[test]
    fn test_label_colors_are_stable() {
        assert_eq!(label_color("person"), label_color("person"));
    }
}
