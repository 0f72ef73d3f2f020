use std::fmt::Write as _;

use super::{PageContext, form, input, layout, text};
use crate::api::forms::{EditDateForm, FormErrors};
use crate::domain::calendar::{MonthCalendar, month_key, parse_month_key};
use crate::services::MonthlyReport;

/// Client side of `/tabletest`: pulls `/tbl_isdata/0/0` and fills the table.
pub const TABLE_SCRIPT: &str = r#"(function () {
  var body = document.querySelector('#punches tbody');
  if (!body) { return; }
  fetch('/tbl_isdata/0/0', { credentials: 'same-origin' })
    .then(function (res) { return res.json(); })
    .then(function (json) {
      (json.data || []).forEach(function (row) {
        var tr = document.createElement('tr');
        [row.id, row.time, row.card_number].forEach(function (value) {
          var td = document.createElement('td');
          td.textContent = value;
          tr.appendChild(td);
        });
        body.appendChild(tr);
      });
    });
})();
"#;

fn format_hours(hours: f64) -> String {
    format!("{hours:.2}")
}

fn calendar_href(card_number: i64, year: i32, month: u32) -> String {
    format!("/calendar/{card_number}/{year}/{month}")
}

/// Months with punches for the logged-in user's card.
#[must_use]
pub fn months_page(ctx: &PageContext, card_number: Option<i64>, months: &[String]) -> String {
    let body = match card_number {
        None => r#"<p>No card number is set. <a href="/account?next=%2Fvypisy">Add it on your account page</a>.</p>"#
            .to_string(),
        Some(_) if months.is_empty() => "<p>No punches recorded yet.</p>".to_string(),
        Some(card) => {
            let mut out = String::from("<table><thead><tr><th>Month</th><th>Report</th><th>Calendar</th></tr></thead><tbody>");
            for month in months {
                let calendar = parse_month_key(month).map_or_else(String::new, |(y, m)| {
                    format!(r#"<a href="{}">calendar</a>"#, calendar_href(card, y, m))
                });
                let _ = write!(
                    out,
                    r#"<tr><td>{month}</td><td><a href="/mesicni_vypis/{month}">summary</a></td><td>{calendar}</td></tr>"#,
                    month = text(month),
                );
            }
            out.push_str("</tbody></table>");
            out
        }
    };

    layout("Výpisy", ctx, &body)
}

/// Per-day first/last punch for one month.
#[must_use]
pub fn monthly_report_page(ctx: &PageContext, report: &MonthlyReport) -> String {
    let mut body = String::new();

    if report.days.is_empty() {
        body.push_str("<p>No punches in this month.</p>");
    } else {
        body.push_str(
            "<table><thead><tr><th>Date</th><th>First</th><th>Last</th><th>Hours</th></tr></thead><tbody>",
        );
        let mut total = 0.0;
        for day in &report.days {
            total += day.hours;
            let _ = write!(
                body,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                text(&day.date),
                text(&day.first_punch),
                text(&day.last_punch),
                format_hours(day.hours)
            );
        }
        let _ = write!(
            body,
            r#"</tbody><tfoot><tr><th colspan="3">Total</th><th>{}</th></tr></tfoot></table>"#,
            format_hours(total)
        );
    }

    body.push_str(r#"<p><a href="/vypisy">Back to months</a></p>"#);
    layout(&format!("Výpis {}", report.month), ctx, &body)
}

/// Shell of the punch table; rows arrive through [`TABLE_SCRIPT`].
#[must_use]
pub fn table_page(ctx: &PageContext) -> String {
    let body = r#"<table id="punches"><thead><tr><th>Id</th><th>Month</th><th>Card</th></tr></thead><tbody></tbody></table>
<script src="/static/table.js"></script>"#;
    layout("Punches", ctx, body)
}

fn neighbour_months(year: i32, month: u32) -> ((i32, u32), (i32, u32)) {
    let prev = if month == 1 { (year - 1, 12) } else { (year, month - 1) };
    let next = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    (prev, next)
}

const WEEKDAYS: [&str; 7] = ["Po", "Út", "St", "Čt", "Pá", "So", "Ne"];

#[must_use]
pub fn calendar_page(ctx: &PageContext, card_number: i64, calendar: &MonthCalendar) -> String {
    let (prev, next) = neighbour_months(calendar.year, calendar.month);
    let mut body = format!(
        r#"<p><a href="{}">&laquo; previous</a> | <a href="{}">next &raquo;</a></p>
<table><thead><tr><th>Day</th><th></th><th>Start</th><th>End</th><th>Hours</th><th>First punch</th><th>Last punch</th><th></th></tr></thead><tbody>"#,
        calendar_href(card_number, prev.0, prev.1),
        calendar_href(card_number, next.0, next.1),
    );

    for day in &calendar.days {
        let weekday = WEEKDAYS.get(day.dow as usize).copied().unwrap_or_default();
        let hours = day.timespend.map(format_hours).unwrap_or_default();
        let edit = if day.is_weekend() {
            String::new()
        } else {
            format!(
                r#"<a href="/calendar_edit/{card_number}/{}/{}/{}">edit</a>{}"#,
                calendar.year,
                calendar.month,
                day.day,
                if day.edited { " *" } else { "" }
            )
        };

        let _ = write!(
            body,
            r#"<tr{class}><td>{}</td><td>{weekday}</td><td>{}</td><td>{}</td><td>{hours}</td><td>{}</td><td>{}</td><td>{edit}</td></tr>"#,
            day.day,
            text(&day.startdate),
            text(&day.enddate),
            text(day.first_punch.as_deref().unwrap_or_default()),
            text(day.last_punch.as_deref().unwrap_or_default()),
            class = if day.is_weekend() { r#" class="weekend""# } else { "" },
        );
    }

    let _ = write!(
        body,
        r#"</tbody></table><p>Stravenky: <strong id="meal-vouchers">{}</strong></p>"#,
        calendar.meal_vouchers
    );

    layout(
        &format!(
            "Card {card_number}, {}",
            month_key(calendar.year, calendar.month)
        ),
        ctx,
        &body,
    )
}

#[must_use]
pub fn calendar_edit_page(
    ctx: &PageContext,
    card_number: i64,
    date: chrono::NaiveDate,
    data: &EditDateForm,
    errors: &FormErrors,
) -> String {
    use chrono::Datelike;

    let action = format!(
        "/calendar_edit/{card_number}/{}/{}/{}",
        date.year(),
        date.month(),
        date.day()
    );
    let fields = [
        input(
            "Start",
            "startdate",
            "text",
            &data.startdate,
            errors.get("startdate"),
        ),
        input("End", "enddate", "text", &data.enddate, errors.get("enddate")),
    ]
    .concat();

    let body = format!(
        r#"{}<p><a href="{}">Back to the calendar</a></p>"#,
        form(&action, &fields, "Save"),
        calendar_href(card_number, date.year(), date.month())
    );

    layout(
        &format!("Card {card_number}, {}", date.format("%Y-%m-%d")),
        ctx,
        &body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DailySummaryRow;
    use crate::domain::calendar::{WorkWindow, build_month_calendar};
    use std::collections::HashMap;

    #[test]
    fn test_neighbour_months_wrap_years() {
        assert_eq!(neighbour_months(2024, 1), ((2023, 12), (2024, 2)));
        assert_eq!(neighbour_months(2024, 12), ((2024, 11), (2025, 1)));
    }

    #[test]
    fn test_monthly_report_page_sums_hours() {
        let report = MonthlyReport {
            month: "2024-03".to_string(),
            days: vec![
                DailySummaryRow {
                    date: "2024-03-01".to_string(),
                    first_punch: "08:00".to_string(),
                    last_punch: "16:00".to_string(),
                    hours: 8.0,
                },
                DailySummaryRow {
                    date: "2024-03-04".to_string(),
                    first_punch: "07:30".to_string(),
                    last_punch: "12:00".to_string(),
                    hours: 4.5,
                },
            ],
        };

        let html = monthly_report_page(&PageContext::default(), &report);
        assert!(html.contains("<td>2024-03-04</td>"));
        assert!(html.contains("<th>12.50</th>"));
    }

    #[test]
    fn test_calendar_page_marks_weekends() {
        let window = WorkWindow::parse("8:00", "16:00").unwrap();
        let calendar =
            build_month_calendar(2024, 6, window, &HashMap::new(), &HashMap::new(), 3.0).unwrap();
        let html = calendar_page(&PageContext::default(), 42, &calendar);

        // 1 June 2024 is a Saturday
        assert!(html.contains(r#"<tr class="weekend"><td>1</td><td>So</td>"#));
        assert!(html.contains(r#"href="/calendar_edit/42/2024/6/3""#));
        assert!(!html.contains(r#"href="/calendar_edit/42/2024/6/1""#));
        assert!(html.contains(r#"<strong id="meal-vouchers">20</strong>"#));
        assert!(html.contains(r#"href="/calendar/42/2024/5""#));
    }

    #[test]
    fn test_months_page_without_card() {
        let html = months_page(&PageContext::default(), None, &[]);
        assert!(html.contains("No card number is set"));
    }
}
