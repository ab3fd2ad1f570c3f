//! Turning a [`ProgressSnapshot`] into one line of text.
//!
//! Rendering is a pure function of a snapshot and the width budget: no clock reads, no
//! I/O. The [`DefaultRenderer`] produces lines such as
//!
//! ```text
//! Download  42% │█████████████▌                  │ 42/100 MB (0:00:02 / 0:00:03) 21.0 MB/s
//! ```
//!
//! and degrades as the width shrinks: first the track disappears, then the line is cut.
//! Widths are counted in `char`s and the result never exceeds the budget.

use std::time::Duration;

use compact_str::CompactString;

use crate::progress::ProgressSnapshot;

/// Narrowest track worth drawing; below this the track is dropped.
const MIN_TRACK_WIDTH: usize = 4;

/// Produces the text of one progress frame.
pub trait Renderer: Send {
    /// Renders `snapshot` into at most `max_width` chars.
    fn render(&self, snapshot: &ProgressSnapshot, max_width: usize) -> String;
}

impl<F> Renderer for F
where
    F: Fn(&ProgressSnapshot, usize) -> String + Send,
{
    fn render(&self, snapshot: &ProgressSnapshot, max_width: usize) -> String {
        truncate(self(snapshot, max_width), max_width)
    }
}

/// Glyph palettes for the bar track.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BarStyle {
    /// Box-drawing delimiters with eighth-block sub-cell precision.
    #[default]
    UnicodeBlock,
    /// Plain `[===>   ]` for terminals without Unicode support.
    Ascii,
}

impl BarStyle {
    const fn delimiters(self) -> (char, char) {
        match self {
            Self::UnicodeBlock => ('│', '│'),
            Self::Ascii => ('[', ']'),
        }
    }

    fn track(self, fraction: f64, width: usize) -> String {
        let exact = fraction.clamp(0.0, 1.0) * width as f64;
        let whole = (exact.floor() as usize).min(width);

        let mut track = String::with_capacity(width * 3);
        match self {
            Self::UnicodeBlock => {
                // Thinnest first; index 0 means "no partial cell".
                const PARTIALS: [char; 8] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉'];
                track.extend(std::iter::repeat_n('█', whole));
                if whole < width {
                    let idx = ((exact - whole as f64) * 8.0).floor() as usize;
                    track.push(PARTIALS[idx.min(7)]);
                    track.extend(std::iter::repeat_n(' ', width - whole - 1));
                }
            }
            Self::Ascii => {
                track.extend(std::iter::repeat_n('=', whole));
                if whole < width {
                    track.push('>');
                    track.extend(std::iter::repeat_n(' ', width - whole - 1));
                }
            }
        }
        track
    }
}

/// Knobs of the [`DefaultRenderer`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RenderOptions {
    /// Track glyphs.
    pub style: BarStyle,
    /// Appended to amounts, e.g. `" MB"`.
    pub unit: CompactString,
    /// How many counted items make one `unit`. `1` prints raw integers.
    pub unit_size: u64,
    /// Append the average speed.
    pub show_speed: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            style: BarStyle::default(),
            unit: CompactString::default(),
            unit_size: 1,
            show_speed: false,
        }
    }
}

/// The stock renderer: label, percentage, track, counts, timing, speed and extra message.
#[derive(Clone, Debug, Default)]
pub struct DefaultRenderer {
    options: RenderOptions,
}

impl DefaultRenderer {
    /// Creates a renderer with the given options.
    #[must_use]
    pub const fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Returns the options of this renderer.
    #[must_use]
    pub const fn options(&self) -> &RenderOptions {
        &self.options
    }

    fn amount(&self, value: u64) -> String {
        if self.options.unit_size <= 1 {
            value.to_string()
        } else {
            format!("{:.1}", value as f64 / self.options.unit_size as f64)
        }
    }

    fn prefix(snapshot: &ProgressSnapshot) -> String {
        let percent = snapshot.fraction().map_or_else(
            || "  ?".to_string(),
            |f| format!("{:>3}", (f * 100.0).floor() as u64),
        );
        if snapshot.name().is_empty() {
            format!("{percent}% ")
        } else {
            format!("{} {percent}% ", snapshot.name())
        }
    }

    fn suffix(&self, snapshot: &ProgressSnapshot) -> String {
        let unit = &self.options.unit;
        let max = snapshot.max().map_or_else(|| "?".to_string(), |m| self.amount(m));
        let eta = snapshot.eta().map_or_else(|| "?".to_string(), format_duration);

        let mut suffix = format!(
            " {}/{max}{unit} ({} / {eta})",
            self.amount(snapshot.current()),
            format_duration(snapshot.elapsed()),
        );
        if self.options.show_speed {
            let speed = snapshot.throughput() / self.options.unit_size.max(1) as f64;
            suffix.push_str(&format!(" {speed:.1}{unit}/s"));
        }
        if !snapshot.extra_message().is_empty() {
            suffix.push(' ');
            suffix.push_str(snapshot.extra_message());
        }
        suffix
    }
}

impl Renderer for DefaultRenderer {
    fn render(&self, snapshot: &ProgressSnapshot, max_width: usize) -> String {
        let prefix = Self::prefix(snapshot);
        let suffix = self.suffix(snapshot);

        let taken = prefix.chars().count() + suffix.chars().count() + 2;
        let track_width = max_width.saturating_sub(taken);
        if track_width < MIN_TRACK_WIDTH {
            return truncate(format!("{}{suffix}", prefix.trim_end()), max_width);
        }

        let (left, right) = self.options.style.delimiters();
        let track = self
            .options
            .style
            .track(snapshot.fraction().unwrap_or(0.0), track_width);
        format!("{prefix}{left}{track}{right}{suffix}")
    }
}

/// Cuts `line` down to `max_width` chars.
pub(crate) fn truncate(mut line: String, max_width: usize) -> String {
    if let Some((idx, _)) = line.char_indices().nth(max_width) {
        line.truncate(idx);
    }
    line
}

/// Formats as `H:MM:SS`.
fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    let hours = total / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}
