use crate::audio::constants;
use crate::audio::spectral_transform::SpectralFrame;
use crate::ui::geometry::{Point, Rect};

/// Magnitude range mapped onto the vertical extent of the drawing area
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DbRange {
    /// Mapped to the bottom edge
    pub min_db: f32,
    /// Mapped to the top edge
    pub max_db: f32,
}

impl Default for DbRange {
    fn default() -> Self {
        Self {
            min_db: constants::ANALYZER_MIN_DB,
            max_db: constants::ANALYZER_MAX_DB,
        }
    }
}

impl DbRange {
    /// Vertical position for `db` in `area`, clamped to the area
    pub fn to_y(&self, db: f32, area: Rect) -> f32 {
        let db = db.clamp(self.min_db, self.max_db.max(self.min_db));
        if self.max_db <= self.min_db {
            return area.bottom();
        }

        constants::map_range(db, self.min_db, self.max_db, area.bottom(), area.y)
    }
}

/// One vertex per pixel column of the analysis area, left to right
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyzerPath {
    points: Vec<Point>,
}

impl AnalyzerPath {
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Maps spectral frames onto pixel columns.
///
/// Column `c` of a `W` pixel wide area covers the frequencies between the logarithmic positions
/// `c / W` and `(c + 1) / W` of the 20 Hz - 20 kHz range. High up, many bins fall into one column
/// and the loudest one wins so narrow peaks stay visible. Down low, where bins are spread out
/// further than a pixel, a column that doesn't contain any bin interpolates between the two
/// neighbouring bins instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurveGenerator {
    db_range: DbRange,
}

impl CurveGenerator {
    pub fn new(db_range: DbRange) -> Self {
        Self { db_range }
    }

    pub fn db_range(&self) -> DbRange {
        self.db_range
    }

    pub fn set_db_range(&mut self, db_range: DbRange) {
        self.db_range = db_range;
    }

    /// Build a fresh path for `frame`. The path has exactly `area.width` (rounded down) points.
    pub fn generate(&self, frame: &SpectralFrame, area: Rect) -> AnalyzerPath {
        let mut path = AnalyzerPath::default();
        self.generate_into(frame, area, &mut path);
        path
    }

    /// Same as [`generate()`][Self::generate()], reusing `path`'s allocation. Nothing of the old
    /// contents survives.
    pub fn generate_into(&self, frame: &SpectralFrame, area: Rect, path: &mut AnalyzerPath) {
        path.points.clear();

        let columns = area.width.max(0.0).floor() as usize;
        path.points.reserve(columns);
        for column in 0..columns {
            let db = column_magnitude(frame, column, columns);
            path.points.push(Point::new(
                area.x + column as f32,
                self.db_range.to_y(db, area),
            ));
        }
    }
}

/// Loudest bin inside the column's frequency span, or an interpolated value if the span is
/// narrower than a bin
fn column_magnitude(frame: &SpectralFrame, column: usize, columns: usize) -> f32 {
    let bins = frame.magnitudes_db();
    let bin_width = frame.bin_width_hz();
    if bins.is_empty() || bin_width <= 0.0 {
        return f32::NEG_INFINITY;
    }

    let low_hz = calculate_log_frequency(column as f32, columns);
    let high_hz = calculate_log_frequency(column as f32 + 1.0, columns);

    // Bins with `low_hz <= frequency < high_hz`
    let first_bin = ((low_hz / bin_width).ceil() as usize).min(bins.len());
    let end_bin = ((high_hz / bin_width).ceil() as usize).min(bins.len());

    if first_bin < end_bin {
        bins[first_bin..end_bin]
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max)
    } else {
        let center_hz = calculate_log_frequency(column as f32 + 0.5, columns);
        interpolate_bin_value(bins, center_hz, bin_width)
    }
}

/// Frequency at a (fractional) column position, logarithmic between 20 Hz and 20 kHz
pub fn calculate_log_frequency(position: f32, total_columns: usize) -> f32 {
    constants::log_position_to_freq(position / total_columns as f32)
}

/// Interpolate magnitude value from FFT bins at a specific frequency
///
/// Uses linear interpolation between adjacent bins. Frequencies past the last bin read the last
/// bin's value.
pub fn interpolate_bin_value(bins: &[f32], frequency: f32, bin_width: f32) -> f32 {
    let Some(&last) = bins.last() else {
        return f32::NEG_INFINITY;
    };

    let bin_position = (frequency / bin_width).max(0.0);
    let bin_index = bin_position.floor() as usize;
    let bin_fraction = bin_position.fract();

    if bin_index + 1 < bins.len() {
        let current_bin = bins[bin_index];
        let next_bin = bins[bin_index + 1];
        current_bin + (next_bin - current_bin) * bin_fraction
    } else {
        last
    }
}
