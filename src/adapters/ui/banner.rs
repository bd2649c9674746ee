//! Neon ASCII banner with a gradient (GYM-BOOKING).
//! Uses figlet's built-in standard font.

use crossterm::ExecutableCommand;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use figlet_rs::FIGfont;
use std::io::{Write, stdout};

/// Energetic orange (#ff6b1a).
const PULSE_ORANGE: (u8, u8, u8) = (0xff, 0x6b, 0x1a);
/// Electric teal (#0ff0c8).
const ELECTRIC_TEAL: (u8, u8, u8) = (0x0f, 0xf0, 0xc8);

/// Linear interpolation between two RGB colors. `t` in [0.0, 1.0].
fn lerp_rgb(a: (u8, u8, u8), b: (u8, u8, u8), t: f64) -> (u8, u8, u8) {
    let r = (f64::from(a.0) * (1.0 - t) + f64::from(b.0) * t).round() as u8;
    let g = (f64::from(a.1) * (1.0 - t) + f64::from(b.1) * t).round() as u8;
    let bl = (f64::from(a.2) * (1.0 - t) + f64::from(b.2) * t).round() as u8;
    (r, g, bl)
}

/// Prints "GYM-BOOKING" with a top-to-bottom gradient, then the version.
/// Falls back to a plain title if the font cannot be rendered.
pub fn print_welcome() {
    let mut out = stdout();
    let art = FIGfont::standard()
        .ok()
        .and_then(|font| font.convert("GYM-BOOKING").map(|f| f.to_string()))
        .unwrap_or_else(|| "GYM-BOOKING".to_string());
    let lines: Vec<&str> = art.lines().collect();
    let total = lines.len().max(1);

    for (i, line) in lines.iter().enumerate() {
        let t = if total <= 1 {
            1.0
        } else {
            i as f64 / (total - 1) as f64
        };
        let (r, g, b) = lerp_rgb(PULSE_ORANGE, ELECTRIC_TEAL, t);
        let _ = out.execute(SetForegroundColor(Color::Rgb { r, g, b }));
        let _ = out.execute(Print(line));
        let _ = out.execute(Print("\r\n"));
        let _ = out.execute(ResetColor);
    }

    let version = env!("CARGO_PKG_VERSION");
    let _ = out.execute(SetForegroundColor(Color::Rgb {
        r: ELECTRIC_TEAL.0,
        g: ELECTRIC_TEAL.1,
        b: ELECTRIC_TEAL.2,
    }));
    let _ = out.execute(Print(format!("v{}\r\n", version)));
    let _ = out.execute(ResetColor);
    let _ = out.flush();
}
