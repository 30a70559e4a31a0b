#![allow(clippy::uninlined_format_args)]

//! Log-report formatting for strategy results.
//!
//! Results are written to the batch log as small blocks:
//!
//! ```text
//! ********************************************
//! ***** Result of SPY for timeframe 1day *****
//! ********************************************
//! * Profit / Loss  : 123.45
//! * Wins / Losses  : 3 / 1
//! * Win Rate       : 75.00%
//! ```

/// Width of the title banners.
pub const BANNER_WIDTH: usize = 60;

/// Centers `text` in a field of `width` characters padded with `fill`.
///
/// When the padding cannot be split evenly the extra character goes to the
/// left for odd widths and to the right for even widths, which keeps banners
/// identical to the historical log files.
#[must_use]
pub fn center(text: &str, width: usize, fill: char) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let margin = width - len;
    let left = margin / 2 + (margin & width & 1);
    let right = margin - left;

    let mut out = String::with_capacity(width);
    out.extend(std::iter::repeat(fill).take(left));
    out.push_str(text);
    out.extend(std::iter::repeat(fill).take(right));
    out
}

/// Banner line of `*` with the title in the middle.
#[must_use]
pub fn banner(title: &str) -> String {
    center(title, BANNER_WIDTH, '*')
}

/// Win rate in percent, 0 when no trade closed with a gain or a loss.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn win_rate_pct(wins: f64, losses: f64) -> f64 {
    if wins + losses > 0.0 {
        100.0 * wins / (wins + losses)
    } else {
        0.0
    }
}

/// A titled block of `label : value` rows.
#[derive(Debug, Clone, Default)]
pub struct ResultBlock {
    title: String,
    rows: Vec<(String, String)>,
}

impl ResultBlock {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn row(mut self, label: impl Into<String>, value: impl std::fmt::Display) -> Self {
        self.rows.push((label.into(), value.to_string()));
        self
    }

    /// Appends the standard profit / wins / win-rate rows.
    #[must_use]
    pub fn outcome(self, profit: f64, wins: usize, losses: usize) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let rate = win_rate_pct(wins as f64, losses as f64);
        self.row("Profit / Loss", format!("{:.2}", profit))
            .row("Wins / Losses", format!("{} / {}", wins, losses))
            .row("Win Rate", format!("{:.2}%", rate))
    }

    /// Renders the block: the title framed by plain banners, then the rows
    /// with labels padded to a common width.
    #[must_use]
    pub fn render(&self) -> Vec<String> {
        let label_width = self.rows.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
        let mut lines = Vec::with_capacity(self.rows.len() + 3);
        lines.push(banner(""));
        lines.push(banner(&format!(" {} ", self.title)));
        lines.push(banner(""));
        for (label, value) in &self.rows {
            lines.push(format!("* {:<width$} : {}", label, value, width = label_width));
        }
        lines
    }

    /// Writes the rendered block to the log at info level.
    pub fn log(&self) {
        for line in self.render() {
            tracing::info!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_matches_reference_padding() {
        // odd margin, even width: extra fill on the right
        assert_eq!(center("abc", 6, '*'), "*abc**");
        // odd margin, odd width: extra fill on the left
        assert_eq!(center("ab", 5, '*'), "**ab*");
        assert_eq!(center("abcd", 8, '-'), "--abcd--");
        assert_eq!(center("too long", 4, '*'), "too long");
    }

    #[test]
    fn test_banner_width() {
        let line = banner(" Result of SPY ");
        assert_eq!(line.chars().count(), BANNER_WIDTH);
        assert!(line.contains(" Result of SPY "));
    }

    #[test]
    fn test_win_rate_handles_no_trades() {
        assert!((win_rate_pct(0.0, 0.0)).abs() < f64::EPSILON);
        assert!((win_rate_pct(3.0, 1.0) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_result_block_render() {
        let lines = ResultBlock::new("Result of QQQ")
            .outcome(123.456, 3, 1)
            .render();

        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "*".repeat(BANNER_WIDTH));
        assert!(lines[1].contains(" Result of QQQ "));
        assert_eq!(lines[1].chars().count(), BANNER_WIDTH);
        assert_eq!(lines[2], lines[0]);
        assert_eq!(lines[3], "* Profit / Loss : 123.46");
        assert_eq!(lines[4], "* Wins / Losses : 3 / 1");
        assert_eq!(lines[5], "* Win Rate      : 75.00%");
    }
}
