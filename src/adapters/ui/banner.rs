//! ASCII banner with a vertical colour gradient (MAGISTER).

use crossterm::ExecutableCommand;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use figlet_rs::FIGfont;
use std::io::{Write, stdout};

/// Magister blue (#0066b3).
const MAGISTER_BLUE: (u8, u8, u8) = (0x00, 0x66, 0xb3);
/// Grade green (#2ecc71).
const PASS_GREEN: (u8, u8, u8) = (0x2e, 0xcc, 0x71);

/// Linear interpolation between two RGB colors. `t` in [0.0, 1.0].
fn lerp_rgb(a: (u8, u8, u8), b: (u8, u8, u8), t: f64) -> (u8, u8, u8) {
    let r = (f64::from(a.0) * (1.0 - t) + f64::from(b.0) * t).round() as u8;
    let g = (f64::from(a.1) * (1.0 - t) + f64::from(b.1) * t).round() as u8;
    let bl = (f64::from(a.2) * (1.0 - t) + f64::from(b.2) * t).round() as u8;
    (r, g, bl)
}

/// Prints "MAGISTER" in the standard figlet font, blue to green, then the version.
/// Falls back to plain text if the font cannot be rendered.
pub fn print_welcome() {
    let mut out = stdout();
    let art = FIGfont::standard()
        .ok()
        .and_then(|font| font.convert("MAGISTER").map(|f| f.to_string()))
        .unwrap_or_else(|| "MAGISTER\n".to_string());
    let lines: Vec<&str> = art.lines().collect();
    let total = lines.len().max(1);

    for (i, line) in lines.iter().enumerate() {
        let t = if total <= 1 {
            1.0
        } else {
            i as f64 / (total - 1) as f64
        };
        let (r, g, b) = lerp_rgb(MAGISTER_BLUE, PASS_GREEN, t);
        let _ = out.execute(SetForegroundColor(Color::Rgb { r, g, b }));
        let _ = out.execute(Print(line));
        let _ = out.execute(Print("\r\n"));
        let _ = out.execute(ResetColor);
    }

    let _ = out.execute(Print(format!(
        "watch v{}\r\n",
        env!("CARGO_PKG_VERSION")
    )));
    let _ = out.flush();
}
