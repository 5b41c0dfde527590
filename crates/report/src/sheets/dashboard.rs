use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{
    Chart, ChartFormat, ChartLegendPosition, ChartPoint, ChartSolidFill, ChartType, Color,
    Format, FormatAlign, FormatBorder, Formula, Worksheet,
};

use kiss_core::settings::DashboardPalette;
use kiss_core::{FundType, TotalTable};

use crate::report::Report;
use crate::sheets::totals::{
    TotalsLayout, COL_BUSINESS, COL_ITEM, COL_PLANNED, COL_RATE, COL_RESEARCH, COL_REMAINING,
};
use crate::style::{color, sheet_ref, MONEY_FORMAT, PERCENT_FORMAT};
use crate::ExportError;

const WIDTH: u16 = 16;
const KPI_ROW: u32 = 5;
const CHART_ROW: u32 = 8;
const LOWER_ROW: u32 = 31;
const INDICATOR_COL: u16 = 8;

struct Palette {
    background: Color,
    card: Color,
    accent: Color,
    text: Color,
    good: Color,
    warning: Color,
    danger: Color,
    business: Color,
    research: Color,
}

impl Palette {
    fn new(p: &DashboardPalette) -> Result<Self, ExportError> {
        Ok(Self {
            background: color(&p.background)?,
            card: color(&p.card)?,
            accent: color(&p.accent)?,
            text: color(&p.text)?,
            good: color(&p.good)?,
            warning: color(&p.warning)?,
            danger: color(&p.danger)?,
            business: color(&p.business)?,
            research: color(&p.research)?,
        })
    }

    /// Execution measured against elapsed project time.
    fn status(&self, rate: Decimal, progress: Decimal) -> Color {
        if rate > Decimal::ONE {
            self.danger
        } else if rate >= progress {
            self.good
        } else if rate * Decimal::TWO >= progress {
            self.warning
        } else {
            self.danger
        }
    }
}

struct Formats {
    font: String,
    palette: Palette,
}

impl Formats {
    fn base(&self, fill: Color) -> Format {
        Format::new()
            .set_font_name(self.font.as_str())
            .set_background_color(fill)
            .set_font_color(self.palette.text)
    }

    fn background(&self) -> Format {
        self.base(self.palette.background)
    }

    fn title(&self) -> Format {
        self.background().set_bold().set_font_size(18.0)
    }

    fn label(&self) -> Format {
        self.background()
            .set_font_color(self.palette.accent)
            .set_font_size(10.0)
    }

    fn info(&self) -> Format {
        self.background().set_bold()
    }

    fn card_label(&self) -> Format {
        self.base(self.palette.card)
            .set_font_color(self.palette.accent)
            .set_align(FormatAlign::Center)
            .set_font_size(10.0)
    }

    fn card_value(&self, color: Color, num_format: &str) -> Format {
        self.base(self.palette.card)
            .set_font_color(color)
            .set_bold()
            .set_font_size(18.0)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_num_format(num_format)
    }

    fn table(&self) -> Format {
        self.base(self.palette.card)
            .set_font_size(10.0)
            .set_border(FormatBorder::Thin)
            .set_border_color(Color::RGB(0x000000))
    }

    fn table_header(&self) -> Format {
        self.table().set_bold().set_align(FormatAlign::Center)
    }
}

/// First sheet of the workbook: project info, KPI cards with live formulas
/// on the totals sheet, charts, per-item indicators.
pub fn write(
    report: &Report<'_>,
    layout: Option<&TotalsLayout>,
    name: &str,
    totals_sheet: &str,
) -> Result<Worksheet, ExportError> {
    let settings = report.settings;
    let formats = Formats {
        font: settings.styling.font_name.clone(),
        palette: Palette::new(&settings.styling.palette)?,
    };

    let mut sheet = Worksheet::new();
    sheet.set_name(name)?;
    sheet.set_screen_gridlines(false);
    sheet.set_tab_color(formats.palette.accent);

    let item_count = layout.map(|l| l.items.len() as u32).unwrap_or(0);
    let last_row = (LOWER_ROW + item_count + 3).max(LOWER_ROW + 18);
    let background = formats.background();
    for col in 0..WIDTH {
        sheet.set_column_width(col, 11.0)?;
        for row in 0..=last_row {
            sheet.write_blank(row, col, &background)?;
        }
    }

    let title = format!("{} 예산 집행 현황", settings.project_name);
    sheet.merge_range(0, 0, 0, WIDTH - 1, &title, &formats.title())?;
    sheet.set_row_height(0, 32.0)?;
    sheet.merge_range(
        1,
        0,
        1,
        WIDTH - 1,
        &format!("기준일 {}", report.today.format("%Y-%m-%d")),
        &formats.label(),
    )?;

    let progress = settings.project_period.progress(report.today);
    let totals = report.report_year_totals();
    write_project_info(&mut sheet, &formats, report, layout, totals_sheet, progress)?;

    match (layout, totals) {
        (Some(layout), Some(totals)) => {
            write_kpis(&mut sheet, &formats, report, layout, totals, totals_sheet, progress)?;
            if !layout.items.is_empty() {
                write_charts(&mut sheet, &formats, layout, totals_sheet)?;
                write_indicators(&mut sheet, &formats, layout, totals, totals_sheet, progress)?;
            }
        }
        _ => tracing::warn!("No totals for the report year; dashboard left without KPIs"),
    }

    tracing::info!("Wrote sheet '{}'", name);
    Ok(sheet)
}

fn write_project_info(
    sheet: &mut Worksheet,
    formats: &Formats,
    report: &Report<'_>,
    layout: Option<&TotalsLayout>,
    totals_sheet: &str,
    progress: Decimal,
) -> Result<(), ExportError> {
    let row = 3;
    let label = formats.label();
    let info = formats.info();

    sheet.merge_range(row, 0, row, 1, "사업기간", &label)?;
    sheet.merge_range(row, 2, row, 5, &report.settings.project_period.to_string(), &info)?;

    sheet.merge_range(row, 6, row, 7, "총 예산", &label)?;
    let planned = report.taxonomy.planned_total(report.settings.report_year);
    let money = info.clone().set_num_format(MONEY_FORMAT);
    sheet.merge_range(row, 8, row, 10, "", &money)?;
    match layout {
        Some(l) => {
            let formula = Formula::new(format!("={}", sheet_ref(totals_sheet, l.total_row, COL_PLANNED)))
                .set_result(planned.to_f64().to_string());
            sheet.write_formula_with_format(row, 8, formula, &money)?;
        }
        None => {
            sheet.write_number_with_format(row, 8, planned.to_f64(), &money)?;
        }
    }

    sheet.merge_range(row, 11, row, 12, "기간 경과율", &label)?;
    let pct = info
        .set_num_format(PERCENT_FORMAT)
        .set_font_color(formats.palette.warning);
    sheet.merge_range(row, 13, row, 15, "", &pct)?;
    sheet.write_number_with_format(row, 13, progress.to_f64().unwrap_or_default(), &pct)?;
    Ok(())
}

fn write_kpis(
    sheet: &mut Worksheet,
    formats: &Formats,
    report: &Report<'_>,
    layout: &TotalsLayout,
    totals: &TotalTable,
    totals_sheet: &str,
    progress: Decimal,
) -> Result<(), ExportError> {
    let t = layout.total_row;
    let r = |col: u16| sheet_ref(totals_sheet, t, col);
    let personnel = layout.rows_in_categories(&report.settings.personnel_categories);
    let minus = |col: u16| {
        if personnel.is_empty() {
            String::new()
        } else {
            let cells: Vec<String> = personnel.iter().map(|row| sheet_ref(totals_sheet, *row, col)).collect();
            format!("-SUM({})", cells.join(","))
        }
    };

    let planned = totals.planned();
    let rates = [
        (
            "총 집행률",
            format!("=IFERROR(({}+{})/{},0)", r(COL_BUSINESS), r(COL_RESEARCH), r(COL_PLANNED)),
            totals.execution_rate(),
        ),
        (
            "인건비 제외 집행률",
            format!(
                "=IFERROR(({}+{}{}{})/({}{}),0)",
                r(COL_BUSINESS),
                r(COL_RESEARCH),
                minus(COL_BUSINESS),
                minus(COL_RESEARCH),
                r(COL_PLANNED),
                minus(COL_PLANNED)
            ),
            totals.execution_rate_excluding(&report.settings.personnel_categories),
        ),
        (
            "센터 집행률",
            format!("=IFERROR({}/{},0)", r(COL_BUSINESS), r(COL_PLANNED)),
            totals.business().ratio_of(planned),
        ),
        (
            "심층연구 집행률",
            format!("=IFERROR({}/{},0)", r(COL_RESEARCH), r(COL_PLANNED)),
            totals.research().ratio_of(planned),
        ),
    ];

    sheet.set_row_height(KPI_ROW + 1, 36.0)?;
    let card_label = formats.card_label();
    for (i, (label, formula, value)) in rates.into_iter().enumerate() {
        let col = i as u16 * 3;
        sheet.merge_range(KPI_ROW, col, KPI_ROW, col + 2, label, &card_label)?;
        let format = formats.card_value(formats.palette.status(value, progress), PERCENT_FORMAT);
        sheet.merge_range(KPI_ROW + 1, col, KPI_ROW + 1, col + 2, "", &format)?;
        let formula = Formula::new(formula).set_result(value.to_f64().unwrap_or_default().to_string());
        sheet.write_formula_with_format(KPI_ROW + 1, col, formula, &format)?;
    }

    let col = 12;
    sheet.merge_range(KPI_ROW, col, KPI_ROW, col + 2, "예산 잔액", &card_label)?;
    let format = formats.card_value(formats.palette.text, MONEY_FORMAT);
    sheet.merge_range(KPI_ROW + 1, col, KPI_ROW + 1, col + 2, "", &format)?;
    let formula = Formula::new(format!("={}", r(COL_REMAINING)))
        .set_result(totals.remaining().to_f64().to_string());
    sheet.write_formula_with_format(KPI_ROW + 1, col, formula, &format)?;
    Ok(())
}

fn write_charts(
    sheet: &mut Worksheet,
    formats: &Formats,
    layout: &TotalsLayout,
    totals_sheet: &str,
) -> Result<(), ExportError> {
    let (first, last) = (layout.first_row, layout.last_row);
    let fill = |c: Color| {
        let mut format = ChartFormat::new();
        format.set_solid_fill(ChartSolidFill::new().set_color(c));
        format
    };
    let range = |col: u16| (totals_sheet, first, col, last, col);

    let mut rates = Chart::new(ChartType::Bar);
    rates
        .add_series()
        .set_categories(range(COL_ITEM))
        .set_values(range(COL_RATE))
        .set_name("집행률")
        .set_format(&mut fill(formats.palette.good));
    rates.title().set_name("예산과목별 집행률");
    rates.legend().set_hidden();
    rates.set_width(640).set_height(440);
    sheet.insert_chart(CHART_ROW, 0, &rates)?;

    let mut budget = Chart::new(ChartType::Column);
    budget
        .add_series()
        .set_categories(range(COL_ITEM))
        .set_values(range(COL_PLANNED))
        .set_name("예산금액")
        .set_format(&mut fill(formats.palette.accent));
    budget
        .add_series()
        .set_categories(range(COL_ITEM))
        .set_values(range(COL_BUSINESS))
        .set_name(FundType::Business.label())
        .set_format(&mut fill(formats.palette.business));
    budget
        .add_series()
        .set_categories(range(COL_ITEM))
        .set_values(range(COL_RESEARCH))
        .set_name(FundType::Research.label())
        .set_format(&mut fill(formats.palette.research));
    budget.title().set_name("예산 대비 집행");
    budget.legend().set_position(ChartLegendPosition::Bottom);
    budget.set_width(640).set_height(440);
    sheet.insert_chart(CHART_ROW, 8, &budget)?;

    let t = layout.total_row;
    let mut share = Chart::new(ChartType::Doughnut);
    share
        .add_series()
        .set_categories((totals_sheet, layout.header_row, COL_BUSINESS, layout.header_row, COL_RESEARCH))
        .set_values((totals_sheet, t, COL_BUSINESS, t, COL_RESEARCH))
        .set_name("집행 구성")
        .set_points(&[
            ChartPoint::new().set_format(&mut fill(formats.palette.business)),
            ChartPoint::new().set_format(&mut fill(formats.palette.research)),
        ]);
    share.title().set_name("센터 / 심층연구 집행 비중");
    share.legend().set_position(ChartLegendPosition::Bottom);
    share.set_width(560).set_height(360);
    sheet.insert_chart(LOWER_ROW, 0, &share)?;
    Ok(())
}

fn write_indicators(
    sheet: &mut Worksheet,
    formats: &Formats,
    layout: &TotalsLayout,
    totals: &TotalTable,
    totals_sheet: &str,
    progress: Decimal,
) -> Result<(), ExportError> {
    let col = INDICATOR_COL;
    let heading = formats.title().set_font_size(14.0).set_font_color(formats.palette.accent);
    sheet.merge_range(LOWER_ROW - 1, col, LOWER_ROW - 1, col + 4, "예산과목별 지표", &heading)?;

    let header = formats.table_header();
    for (i, h) in ["예산과목", "예산금액", "지출액", "예산잔액", "집행률"].iter().enumerate() {
        sheet.write_string_with_format(LOWER_ROW, col + i as u16, *h, &header)?;
    }

    let text = formats.table();
    let money = formats.table().set_num_format(MONEY_FORMAT);
    for (i, ((_, item, src), row)) in layout.items.iter().zip(&totals.rows).enumerate() {
        let out = LOWER_ROW + 1 + i as u32;
        let at = |c: u16| sheet_ref(totals_sheet, *src, c);
        sheet.write_string_with_format(out, col, item, &text)?;
        sheet.write_formula_with_format(
            out,
            col + 1,
            Formula::new(format!("={}", at(COL_PLANNED))).set_result(row.planned.to_f64().to_string()),
            &money,
        )?;
        sheet.write_formula_with_format(
            out,
            col + 2,
            Formula::new(format!("={}+{}", at(COL_BUSINESS), at(COL_RESEARCH)))
                .set_result(row.actual().to_f64().to_string()),
            &money,
        )?;
        sheet.write_formula_with_format(
            out,
            col + 3,
            Formula::new(format!("={}", at(COL_REMAINING)))
                .set_result(row.remaining().to_f64().to_string()),
            &money,
        )?;
        let rate = row.execution_rate();
        let pct = formats
            .table()
            .set_num_format(PERCENT_FORMAT)
            .set_font_color(formats.palette.status(rate, progress));
        sheet.write_formula_with_format(
            out,
            col + 4,
            Formula::new(format!("={}", at(COL_RATE))).set_result(rate.to_f64().unwrap_or_default().to_string()),
            &pct,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette() -> Palette {
        Palette::new(&DashboardPalette::default()).unwrap()
    }

    #[test]
    fn status_follows_elapsed_time() {
        let p = palette();
        let half = Decimal::new(5, 1);
        assert_eq!(p.status(Decimal::new(6, 1), half), p.good);
        assert_eq!(p.status(Decimal::new(3, 1), half), p.warning);
        assert_eq!(p.status(Decimal::new(1, 1), half), p.danger);
        assert_eq!(p.status(Decimal::new(11, 1), half), p.danger);
        assert_eq!(p.status(Decimal::ZERO, Decimal::ZERO), p.good);
    }
}
