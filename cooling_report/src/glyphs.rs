//! Built-in 5x7 bitmap font for chart text.
//!
//! Charts never depend on system fonts, so the rendered pixels are the same on
//! every host. Lowercase letters share the uppercase shapes and accents are
//! folded onto their base letter.

pub const GLYPH_ROWS: usize = 7;

pub type Glyph = [&'static str; GLYPH_ROWS];

const SPACE: Glyph = ["   "; GLYPH_ROWS];

const UNKNOWN: Glyph = [
    " ### ", "#   #", "    #", "   # ", "  #  ", "     ", "  #  ",
];

/// Pixel scale for a requested font size in pixels.
pub fn scale_for(size: f64) -> i32 {
    (size / 8.0).round().max(1.0) as i32
}

pub fn glyph_width(glyph: &Glyph) -> i32 {
    glyph[0].len() as i32
}

/// Horizontal advance including one column of spacing.
pub fn advance(glyph: &Glyph, scale: i32) -> i32 {
    (glyph_width(glyph) + 1) * scale
}

/// Bounding box of `text` in pixels at `scale`.
pub fn text_extent(text: &str, scale: i32) -> (u32, u32) {
    let width: i32 = text.chars().map(|ch| advance(lookup(ch), scale)).sum();
    let width = (width - scale).max(0);
    (width as u32, (GLYPH_ROWS as i32 * scale) as u32)
}

pub fn lookup(ch: char) -> &'static Glyph {
    let folded = match ch {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
        'ç' | 'Ç' => 'C',
        'é' | 'è' | 'ê' | 'É' | 'È' | 'Ê' => 'E',
        'í' | 'ì' | 'Í' | 'Ì' => 'I',
        'ó' | 'ò' | 'ô' | 'õ' | 'Ó' | 'Ò' | 'Ô' | 'Õ' => 'O',
        'ú' | 'ù' | 'ü' | 'Ú' | 'Ù' | 'Ü' => 'U',
        'º' | '°' => '°',
        '⁻' | '–' => '-',
        '¹' => '1',
        other => other.to_ascii_uppercase(),
    };
    match folded {
        ' ' => &SPACE,
        'A' => &[" ### ", "#   #", "#   #", "#####", "#   #", "#   #", "#   #"],
        'B' => &["#### ", "#   #", "#   #", "#### ", "#   #", "#   #", "#### "],
        'C' => &[" ### ", "#   #", "#    ", "#    ", "#    ", "#   #", " ### "],
        'D' => &["#### ", "#   #", "#   #", "#   #", "#   #", "#   #", "#### "],
        'E' => &["#####", "#    ", "#    ", "#### ", "#    ", "#    ", "#####"],
        'F' => &["#####", "#    ", "#    ", "#### ", "#    ", "#    ", "#    "],
        'G' => &[" ### ", "#   #", "#    ", "# ###", "#   #", "#   #", " ####"],
        'H' => &["#   #", "#   #", "#   #", "#####", "#   #", "#   #", "#   #"],
        'I' => &["###", " # ", " # ", " # ", " # ", " # ", "###"],
        'J' => &["  ###", "   # ", "   # ", "   # ", "   # ", "#  # ", " ##  "],
        'K' => &["#   #", "#  # ", "# #  ", "##   ", "# #  ", "#  # ", "#   #"],
        'L' => &["#    ", "#    ", "#    ", "#    ", "#    ", "#    ", "#####"],
        'M' => &["#   #", "## ##", "# # #", "# # #", "#   #", "#   #", "#   #"],
        'N' => &["#   #", "##  #", "# # #", "#  ##", "#   #", "#   #", "#   #"],
        'O' => &[" ### ", "#   #", "#   #", "#   #", "#   #", "#   #", " ### "],
        'P' => &["#### ", "#   #", "#   #", "#### ", "#    ", "#    ", "#    "],
        'Q' => &[" ### ", "#   #", "#   #", "#   #", "# # #", "#  # ", " ## #"],
        'R' => &["#### ", "#   #", "#   #", "#### ", "# #  ", "#  # ", "#   #"],
        'S' => &[" ####", "#    ", "#    ", " ### ", "    #", "    #", "#### "],
        'T' => &["#####", "  #  ", "  #  ", "  #  ", "  #  ", "  #  ", "  #  "],
        'U' => &["#   #", "#   #", "#   #", "#   #", "#   #", "#   #", " ### "],
        'V' => &["#   #", "#   #", "#   #", "#   #", "#   #", " # # ", "  #  "],
        'W' => &["#   #", "#   #", "#   #", "# # #", "# # #", "# # #", " # # "],
        'X' => &["#   #", "#   #", " # # ", "  #  ", " # # ", "#   #", "#   #"],
        'Y' => &["#   #", "#   #", " # # ", "  #  ", "  #  ", "  #  ", "  #  "],
        'Z' => &["#####", "    #", "   # ", "  #  ", " #   ", "#    ", "#####"],
        '0' => &[" ### ", "#   #", "#  ##", "# # #", "##  #", "#   #", " ### "],
        '1' => &["  #  ", " ##  ", "  #  ", "  #  ", "  #  ", "  #  ", " ### "],
        '2' => &[" ### ", "#   #", "    #", "   # ", "  #  ", " #   ", "#####"],
        '3' => &["#####", "   # ", "  #  ", "   # ", "    #", "#   #", " ### "],
        '4' => &["   # ", "  ## ", " # # ", "#  # ", "#####", "   # ", "   # "],
        '5' => &["#####", "#    ", "#### ", "    #", "    #", "#   #", " ### "],
        '6' => &["  ## ", " #   ", "#    ", "#### ", "#   #", "#   #", " ### "],
        '7' => &["#####", "    #", "   # ", "  #  ", " #   ", " #   ", " #   "],
        '8' => &[" ### ", "#   #", "#   #", " ### ", "#   #", "#   #", " ### "],
        '9' => &[" ### ", "#   #", "#   #", " ####", "    #", "   # ", " ##  "],
        '.' => &["  ", "  ", "  ", "  ", "  ", "##", "##"],
        ',' => &["  ", "  ", "  ", "  ", "##", " #", "# "],
        ':' => &["  ", "##", "##", "  ", "##", "##", "  "],
        ';' => &["  ", "##", "##", "  ", "##", " #", "# "],
        '-' => &["     ", "     ", "     ", "#####", "     ", "     ", "     "],
        '+' => &["     ", "  #  ", "  #  ", "#####", "  #  ", "  #  ", "     "],
        '=' => &["     ", "     ", "#####", "     ", "#####", "     ", "     "],
        '(' => &["  #", " # ", "#  ", "#  ", "#  ", " # ", "  #"],
        ')' => &["#  ", " # ", "  #", "  #", "  #", " # ", "#  "],
        '[' => &["###", "#  ", "#  ", "#  ", "#  ", "#  ", "###"],
        ']' => &["###", "  #", "  #", "  #", "  #", "  #", "###"],
        '/' => &["    #", "    #", "   # ", "  #  ", " #   ", "#    ", "#    "],
        '%' => &["##   ", "##  #", "   # ", "  #  ", " #   ", "#  ##", "   ##"],
        '°' => &[" ## ", "#  #", " ## ", "    ", "    ", "    ", "    "],
        '\'' => &["#", "#", " ", " ", " ", " ", " "],
        '_' => &["     ", "     ", "     ", "     ", "     ", "     ", "#####"],
        _ => &UNKNOWN,
    }
}
