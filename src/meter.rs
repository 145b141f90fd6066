// SPDX-FileCopyrightText: 2025 The airrx developers
//
// SPDX-License-Identifier: BSD-2-Clause

//! Terminal level meter: a 7-cell Unicode bargraph with eighth-block
//! resolution, colored green/yellow/red over the -56..0 dBFS range.

const NOISE_FLOOR_DBFS: i32 = -56;

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Eighth blocks, one to seven eighths filled.
const PARTIAL: [&str; 7] = [
    "\u{258f}", "\u{258e}", "\u{258d}", "\u{258c}", "\u{258b}", "\u{258a}", "\u{2589}",
];

/// Render a dBFS level as a colored bargraph.
pub fn render_bargraph(level_dbfs: f32) -> String {
    let level = (level_dbfs as i32).clamp(NOISE_FLOOR_DBFS, 0);

    // 0..56 mapped over 7 cells of 8 eighths each.
    let eighths = (level - NOISE_FLOOR_DBFS) as usize;
    let full_cells = eighths / 8;
    let rest = eighths % 8;

    let mut bar = String::with_capacity(64);
    bar.push_str(GREEN);
    for cell in 0..7 {
        if cell == 5 {
            bar.push_str(YELLOW);
        }
        if cell == 6 {
            bar.push_str(RED);
        }

        if cell < full_cells {
            bar.push('\u{2588}');
        } else if cell == full_cells && rest > 0 {
            bar.push_str(PARTIAL[rest - 1]);
        } else {
            bar.push(' ');
        }
    }
    bar.push_str(RESET);

    bar
}

/// `name[snr]` element for the status line; an open channel is shown
/// inverted on yellow.
pub fn render_channel(name: &str, snr: f32, open: bool) -> String {
    if open {
        format!("  \x1b[103m\x1b[30m{name}\x1b[0m[\x1b[1;30m{snr:4.1}\x1b[0m]")
    } else {
        format!("  {name}[\x1b[1;30m{snr:4.1}\x1b[0m]")
    }
}

/// Leading `HH:MM:SS: Level[...]` part of the status line.
pub fn render_level(pwr_dbfs: f32) -> String {
    let now = chrono::Local::now();
    format!(
        "{}: Level[{}\x1b[1;30m{pwr_dbfs:5.1}\x1b[0m]",
        now.format("%H:%M:%S"),
        render_bargraph(pwr_dbfs)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_ansi(s: &str) -> String {
        let mut out = String::new();
        let mut in_escape = false;
        for c in s.chars() {
            match c {
                '\x1b' => in_escape = true,
                'm' if in_escape => in_escape = false,
                _ if !in_escape => out.push(c),
                _ => {}
            }
        }
        out
    }

    #[test]
    fn bar_is_always_seven_cells() {
        for level in [-80.0, -56.0, -33.3, -20.0, -0.5, 0.0, 10.0] {
            let bar = strip_ansi(&render_bargraph(level));
            assert_eq!(bar.chars().count(), 7, "level {level}: {bar:?}");
        }
    }

    #[test]
    fn floor_is_empty_and_ceiling_is_full() {
        let empty = strip_ansi(&render_bargraph(-56.0));
        assert!(empty.chars().all(|c| c == ' '), "{empty:?}");

        let full = strip_ansi(&render_bargraph(0.0));
        assert!(full.chars().all(|c| c == '\u{2588}'), "{full:?}");
    }

    #[test]
    fn partial_cells_track_level() {
        // -53 dBFS is 3 eighths into the first cell.
        let bar = strip_ansi(&render_bargraph(-53.0));
        assert_eq!(bar.chars().next().unwrap(), '\u{258d}');
        assert!(bar.chars().skip(1).all(|c| c == ' '));
    }
}
