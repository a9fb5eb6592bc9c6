//! Excel export functionality.

use chrono::Local;
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, Worksheet, XlsxError};
use std::path::Path;

use crate::models::attendance::{AttendanceLog, Direction};
use crate::session::{EvaluatedRecord, SessionStatistics};

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0x4472C4))
        .set_font_color(Color::White)
        .set_border(FormatBorder::Thin)
}

fn write_headers(worksheet: &mut Worksheet, headers: &[&str]) -> Result<(), XlsxError> {
    let format = header_format();
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &format)?;
    }
    Ok(())
}

/// Export evaluated attendance history to Excel file.
/// One row per clock event with its deadline and punctuality, plus a summary sheet.
pub fn export_history_to_excel(
    records: &[EvaluatedRecord],
    stats: &SessionStatistics,
    path: &Path,
) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    worksheet.set_name("Attendance History")?;

    let headers = ["Date", "Time", "Direction", "Deadline", "Status", "Message"];
    write_headers(worksheet, &headers)?;

    worksheet.set_column_width(0, 12)?; // Date
    worksheet.set_column_width(1, 10)?; // Time
    worksheet.set_column_width(2, 10)?; // Direction
    worksheet.set_column_width(3, 10)?; // Deadline
    worksheet.set_column_width(4, 10)?; // Status
    worksheet.set_column_width(5, 30)?; // Message

    for (idx, evaluated) in records.iter().enumerate() {
        let row = (idx + 1) as u32;

        // Unparseable times leave date and time blank; the message says why
        match evaluated.local_time {
            Some(at) => {
                worksheet.write_string(row, 0, at.format("%Y-%m-%d").to_string())?;
                worksheet.write_string(row, 1, at.format("%H:%M:%S").to_string())?;
            }
            None => {
                worksheet.write_string(row, 0, "")?;
                worksheet.write_string(row, 1, "")?;
            }
        }

        let direction = match evaluated.record.attendance_type {
            Direction::In => "Clock In",
            Direction::Out => "Clock Out",
        };
        worksheet.write_string(row, 2, direction)?;
        worksheet.write_string(row, 3, &evaluated.deadline)?;
        worksheet.write_string(row, 4, evaluated.result.status.as_str())?;
        worksheet.write_string(row, 5, &evaluated.result.message)?;
    }

    if !records.is_empty() {
        let last_row = records.len() as u32;
        worksheet.autofilter(0, 0, last_row, 5)?;
    }

    worksheet.set_freeze_panes(1, 0)?;

    let summary = workbook.add_worksheet();
    summary.set_name("Summary")?;
    write_headers(summary, &["Metric", "Value"])?;
    summary.set_column_width(0, 20)?;
    summary.set_column_width(1, 12)?;

    let percent_format = Format::new().set_num_format("0.0\"%\"");
    let counts = [
        ("On time", stats.on_time_count),
        ("Late", stats.late_count),
        ("Early", stats.early_count),
        ("Unknown", stats.unknown_count),
        ("Total", stats.total),
    ];
    for (idx, (label, count)) in counts.iter().enumerate() {
        let row = (idx + 1) as u32;
        summary.write_string(row, 0, *label)?;
        summary.write_number(row, 1, *count as f64)?;
    }
    let row = (counts.len() + 1) as u32;
    summary.write_string(row, 0, "On-time rate")?;
    summary.write_number_with_format(row, 1, stats.on_time_percentage(), &percent_format)?;

    workbook.save(path)?;
    Ok(())
}

/// Export the admin attendance log to Excel file.
pub fn export_logs_to_excel(logs: &[AttendanceLog], path: &Path) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    worksheet.set_name("Attendance Log")?;

    let headers = [
        "Employee Code",
        "Full Name",
        "Department",
        "Clock In",
        "Clock Out",
        "In Status",
        "Out Status",
    ];
    write_headers(worksheet, &headers)?;

    worksheet.set_column_width(0, 15)?; // Employee Code
    worksheet.set_column_width(1, 30)?; // Full Name
    worksheet.set_column_width(2, 25)?; // Department
    worksheet.set_column_width(3, 22)?; // Clock In
    worksheet.set_column_width(4, 22)?; // Clock Out
    worksheet.set_column_width(5, 12)?; // In Status
    worksheet.set_column_width(6, 12)?; // Out Status

    for (idx, log) in logs.iter().enumerate() {
        let row = (idx + 1) as u32;

        worksheet.write_string(row, 0, &log.employee_code)?;
        worksheet.write_string(row, 1, &log.full_name)?;
        worksheet.write_string(row, 2, &log.department_name)?;
        worksheet.write_string(row, 3, log.clock_in.as_deref().unwrap_or(""))?;
        worksheet.write_string(row, 4, log.clock_out.as_deref().unwrap_or(""))?;
        worksheet.write_string(row, 5, &log.in_punctuality)?;
        worksheet.write_string(row, 6, &log.out_punctuality)?;
    }

    if !logs.is_empty() {
        let last_row = logs.len() as u32;
        worksheet.autofilter(0, 0, last_row, 6)?;
    }

    worksheet.set_freeze_panes(1, 0)?;

    workbook.save(path)?;
    Ok(())
}

/// Generate default filename for export.
pub fn generate_export_filename(prefix: &str) -> String {
    let now = Local::now();
    format!("{prefix}_{ts}.xlsx", ts = now.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttendanceRecord, Department};
    use crate::punctuality::Zone;
    use crate::session::{SessionTracker, summarize};

    fn department() -> Department {
        Department {
            id: "d1".into(),
            name: "Engineering".into(),
            max_clock_in_time: "09:00".into(),
            max_clock_out_time: "17:00".into(),
            created_at: None,
            updated_at: None,
        }
    }

    fn record(id: &str, ts: Option<&str>, direction: Direction) -> AttendanceRecord {
        AttendanceRecord {
            id: id.into(),
            employee_code: "EMP-001".into(),
            attendance_id: "att-1".into(),
            date_attendance: ts.map(String::from),
            attendance_type: direction,
            description: String::new(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_export_filename_format() {
        let name = generate_export_filename("attendance_history");
        assert!(name.starts_with("attendance_history_"));
        assert!(name.ends_with(".xlsx"));
        // prefix + '_' + YYYYmmdd_HHMMSS + .xlsx
        assert_eq!(name.len(), "attendance_history_".len() + 15 + 5);
    }

    #[test]
    fn test_export_history_writes_file() {
        let tracker = SessionTracker::new(Zone::utc());
        let history = vec![
            record("r1", Some("2024-03-05T08:55:00Z"), Direction::In),
            record("r2", Some("2024-03-05T16:30:00Z"), Direction::Out),
            record("r3", None, Direction::In),
        ];
        let evaluated = tracker.evaluate_history(&history, &department());
        let stats = summarize(&evaluated);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.xlsx");
        export_history_to_excel(&evaluated, &stats, &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_export_empty_logs_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs.xlsx");
        export_logs_to_excel(&[], &path).unwrap();
        assert!(path.exists());
    }
}
