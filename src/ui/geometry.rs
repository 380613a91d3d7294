use crate::audio::constants;

/// A point in renderer coordinates, y grows downwards
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis aligned rectangle, `(x, y)` is the top left corner
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Shrink each edge by the given amount. Never produces a negative size.
    pub fn inset(&self, top: f32, bottom: f32, left: f32, right: f32) -> Self {
        Self {
            x: self.x + left,
            y: self.y + top,
            width: (self.width - left - right).max(0.0),
            height: (self.height - top - bottom).max(0.0),
        }
    }
}

/// Area the grid and curves are drawn in, leaving room for the labels
pub fn render_area(bounds: Rect) -> Rect {
    bounds.inset(12.0, 2.0, 20.0, 20.0)
}

/// Area the analyzer paths are mapped onto
pub fn analysis_area(bounds: Rect) -> Rect {
    render_area(bounds).inset(4.0, 4.0, 0.0, 0.0)
}

/// The analyzer floor for a view.
///
/// The analysis area spans -48 dB at its bottom edge to 0 dB at its top. Extending that scale down
/// to the view's bottom edge gives the level the floor should sit at, so a taller view shows a
/// little more of the noise floor.
pub fn negative_infinity_for(view: Rect, analysis: Rect) -> f32 {
    if analysis.height <= 0.0 {
        return constants::FLOOR_REFERENCE_BOTTOM_DB;
    }

    constants::map_range(
        view.bottom(),
        analysis.bottom(),
        analysis.y,
        constants::FLOOR_REFERENCE_BOTTOM_DB,
        constants::FLOOR_REFERENCE_TOP_DB,
    )
}

/// Frequencies that get a vertical grid line
pub const FREQUENCY_GRID: [f32; 10] = [
    20.0, 50.0, 100.0, 200.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0, 20000.0,
];

/// Gains that get a horizontal grid line
pub const GAIN_GRID: [f32; 5] = [-24.0, -12.0, 0.0, 12.0, 24.0];

/// Grid line data for the analyzer display
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub start: Point,
    pub end: Point,
}

/// Horizontal position of `frequency` within `area`, logarithmic between 20 Hz and 20 kHz
pub fn frequency_to_x(frequency: f32, area: Rect) -> f32 {
    area.x + constants::freq_to_log_position(frequency) * area.width
}

/// Vertical position of a grid gain within `area`, the grid spans -24..+24 dB
pub fn gain_to_y(gain_db: f32, area: Rect) -> f32 {
    constants::map_range(
        gain_db,
        constants::GAIN_MIN_DB,
        constants::GAIN_MAX_DB,
        area.bottom(),
        area.y,
    )
}

pub fn frequency_grid_lines(area: Rect) -> Vec<GridLine> {
    FREQUENCY_GRID
        .iter()
        .map(|&frequency| {
            let x = frequency_to_x(frequency, area);
            GridLine {
                start: Point::new(x, area.y),
                end: Point::new(x, area.bottom()),
            }
        })
        .collect()
}

pub fn gain_grid_lines(area: Rect) -> Vec<GridLine> {
    GAIN_GRID
        .iter()
        .map(|&gain_db| {
            let y = gain_to_y(gain_db, area);
            GridLine {
                start: Point::new(area.x, y),
                end: Point::new(area.right(), y),
            }
        })
        .collect()
}

/// Grid label for a frequency, e.g. "50Hz", "2kHz" or "1.5kHz"
pub fn format_frequency(frequency: f32) -> String {
    if frequency >= 1000.0 {
        let khz = frequency / 1000.0;
        if khz.fract() == 0.0 {
            format!("{}kHz", khz as u32)
        } else {
            format!("{khz:.1}kHz")
        }
    } else {
        format!("{}Hz", frequency.round() as u32)
    }
}

/// Grid label for a gain, with an explicit plus sign for boosts
pub fn format_gain(gain_db: f32) -> String {
    if gain_db > 0.0 {
        format!("+{}", gain_db.round() as i32)
    } else {
        format!("{}", gain_db.round() as i32)
    }
}
