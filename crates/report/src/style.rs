use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder};

use kiss_core::settings::{hex_color, Styling};
use kiss_core::SettingsError;

pub const MONEY_FORMAT: &str = "#,##0";
pub const PERCENT_FORMAT: &str = "0.0%";
pub const DATE_FORMAT: &str = "yyyy-mm-dd";

pub fn color(hex: &str) -> Result<Color, SettingsError> {
    Ok(Color::RGB(hex_color(hex)?))
}

/// Cell formats shared by the tabular sheets.
pub struct TableStyles {
    pub header: Format,
    pub title: Format,
    pub text: Format,
    pub group: Format,
    pub money: Format,
    pub percent: Format,
    pub date: Format,
    pub total_label: Format,
    pub total_money: Format,
    pub total_percent: Format,
}

impl TableStyles {
    pub fn new(styling: &Styling) -> Result<Self, SettingsError> {
        let base = || {
            Format::new()
                .set_font_name(styling.font_name.as_str())
                .set_border(FormatBorder::Thin)
        };
        let total_fill = color(&styling.total_fill)?;
        let total = || base().set_bold().set_background_color(total_fill);

        Ok(Self {
            header: base()
                .set_bold()
                .set_font_color(color(&styling.header_font)?)
                .set_background_color(color(&styling.header_fill)?)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter),
            title: Format::new()
                .set_font_name(styling.font_name.as_str())
                .set_bold()
                .set_font_size(12.0),
            text: base(),
            group: base()
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter),
            money: base().set_num_format(MONEY_FORMAT),
            percent: base().set_num_format(PERCENT_FORMAT),
            date: base().set_num_format(DATE_FORMAT),
            total_label: total().set_align(FormatAlign::Center),
            total_money: total().set_num_format(MONEY_FORMAT),
            total_percent: total().set_num_format(PERCENT_FORMAT),
        })
    }
}

/// "A1"-style reference for zero-based coordinates.
pub fn cell_ref(row: u32, col: u16) -> String {
    let mut letters = Vec::new();
    let mut n = u32::from(col) + 1;
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push((b'A' + rem) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect::<String>() + &(row + 1).to_string()
}

/// Cross-sheet reference, always quoted so Korean names and parentheses are
/// safe: `'총액'!D5`.
pub fn sheet_ref(sheet: &str, row: u32, col: u16) -> String {
    format!("'{}'!{}", sheet.replace('\'', "''"), cell_ref(row, col))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_refs() {
        assert_eq!(cell_ref(0, 0), "A1");
        assert_eq!(cell_ref(4, 3), "D5");
        assert_eq!(cell_ref(9, 25), "Z10");
        assert_eq!(cell_ref(0, 26), "AA1");
        assert_eq!(cell_ref(0, 701), "ZZ1");
    }

    #[test]
    fn sheet_refs_are_quoted() {
        assert_eq!(sheet_ref("총액", 4, 3), "'총액'!D5");
        assert_eq!(sheet_ref("집행관리(사업비)", 0, 0), "'집행관리(사업비)'!A1");
    }

    #[test]
    fn styles_reject_bad_colours() {
        let mut styling = Styling::default();
        assert!(TableStyles::new(&styling).is_ok());
        styling.total_fill = "zzz".to_string();
        assert!(TableStyles::new(&styling).is_err());
    }
}
