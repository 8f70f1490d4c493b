//! Export - Spreadsheet reports built in memory with rust_xlsxwriter

use crate::analytics::{UserTaskRow, user_task_rows};
use crate::entities::{Project, Task, User};
use chrono::{DateTime, Utc};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const HEADER_BACKGROUND: u32 = 0x4F81BD;

enum Cell {
    Text(String),
    Number(f64),
}

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_BACKGROUND))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin)
}

fn body_format() -> Format {
    Format::new()
        .set_font_color(Color::Black)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin)
}

fn day(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// One sheet with a styled header row followed by `rows`
fn write_sheet(
    worksheet: &mut Worksheet,
    name: &str,
    columns: &[(&str, f64)],
    rows: Vec<Vec<Cell>>,
) -> Result<(), XlsxError> {
    worksheet.set_name(name)?;
    let header = header_format();
    let body = body_format();

    for (col, (title, width)) in columns.iter().enumerate() {
        let col = col as u16;
        worksheet.set_column_width(col, *width)?;
        worksheet.write_string_with_format(0, col, *title, &header)?;
    }

    for (index, cells) in rows.into_iter().enumerate() {
        let row = index as u32 + 1;
        for (col, cell) in cells.into_iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Text(text) => worksheet.write_string_with_format(row, col, text, &body)?,
                Cell::Number(number) => worksheet.write_number_with_format(row, col, number, &body)?,
            };
        }
    }
    Ok(())
}

fn assignee_label(task: &Task) -> String {
    if task.assigned_to.is_empty() {
        return "Unassigned".to_string();
    }
    task.assigned_to
        .iter()
        .map(|u| format!("{} ({})", u.name, u.email))
        .collect::<Vec<_>>()
        .join(", ")
}

/// "Tasks Report": one row per task with its assignees
pub fn tasks_workbook(tasks: &[Task]) -> Result<Vec<u8>, XlsxError> {
    let rows = tasks
        .iter()
        .map(|task| {
            vec![
                Cell::Number(task.id as f64),
                Cell::Text(task.title.clone()),
                Cell::Text(task.description.clone()),
                Cell::Text(task.priority.to_string()),
                Cell::Text(task.status.to_string()),
                Cell::Text(task.due_date.map(day).unwrap_or_default()),
                Cell::Text(assignee_label(task)),
            ]
        })
        .collect();

    let mut workbook = Workbook::new();
    write_sheet(
        workbook.add_worksheet(),
        "Tasks Report",
        &[
            ("Task ID", 25.0),
            ("Title", 30.0),
            ("Description", 50.0),
            ("Priority", 15.0),
            ("Status", 20.0),
            ("Due Date", 20.0),
            ("Assigned To", 30.0),
        ],
        rows,
    )?;
    workbook.save_to_buffer()
}

/// "User Task Report": assigned task counts of every user
pub fn users_workbook(users: &[User], tasks: &[Task]) -> Result<Vec<u8>, XlsxError> {
    let rows = user_task_rows(users, tasks)
        .into_iter()
        .map(|UserTaskRow { name, email, counts }| {
            vec![
                Cell::Text(name),
                Cell::Text(email),
                Cell::Number(counts.total as f64),
                Cell::Number(counts.pending as f64),
                Cell::Number(counts.in_progress as f64),
                Cell::Number(counts.completed as f64),
            ]
        })
        .collect();

    let mut workbook = Workbook::new();
    write_sheet(
        workbook.add_worksheet(),
        "User Task Report",
        &[
            ("User Name", 30.0),
            ("Email", 40.0),
            ("Total Assigned Tasks", 20.0),
            ("Pending Tasks", 20.0),
            ("In Progress Tasks", 20.0),
            ("Completed Tasks", 20.0),
        ],
        rows,
    )?;
    workbook.save_to_buffer()
}

/// "Projects Report": every project with the number of linked tasks
pub fn projects_workbook(projects: &[Project]) -> Result<Vec<u8>, XlsxError> {
    let rows = projects
        .iter()
        .map(|project| {
            vec![
                Cell::Number(project.id as f64),
                Cell::Text(project.name.clone()),
                Cell::Text(project.description.clone()),
                Cell::Text(day(project.start_date)),
                Cell::Text(day(project.end_date)),
                Cell::Text(project.status.to_string()),
                Cell::Number(project.tasks.len() as f64),
            ]
        })
        .collect();

    let mut workbook = Workbook::new();
    write_sheet(
        workbook.add_worksheet(),
        "Projects Report",
        &[
            ("Project ID", 25.0),
            ("Name", 30.0),
            ("Description", 50.0),
            ("Start Date", 20.0),
            ("End Date", 20.0),
            ("Status", 20.0),
            ("Tasks Assigned", 30.0),
        ],
        rows,
    )?;
    workbook.save_to_buffer()
}
