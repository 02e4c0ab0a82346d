use colored::Colorize;
use comfy_table::{Cell, Table};

use super::parse_month;
use crate::db::open_initialized;
use crate::error::{Igreja360Error, Result};
use crate::models::ScheduleType;
use crate::roster::{self, NewSchedule};
use crate::scheduling::{parse_date, parse_time, TimeRange};
use crate::settings::get_db_path;

pub struct ShiftArgs<'a> {
    pub ministry: &'a str,
    pub volunteer: &'a str,
    pub date: &'a str,
    pub start: &'a str,
    pub end: &'a str,
}

pub fn add(args: &ShiftArgs<'_>, backup: bool) -> Result<()> {
    let conn = open_initialized(&get_db_path())?;
    let ministry_id = roster::ministry_id(&conn, args.ministry)?;
    let new = NewSchedule {
        ministry_id,
        volunteer_id: roster::volunteer_id(&conn, ministry_id, args.volunteer)?,
        date: parse_date(args.date)?,
        shift: TimeRange::parse(args.start, args.end)?,
        schedule_type: if backup { ScheduleType::Backup } else { ScheduleType::Primary },
    };
    let id = roster::add_schedule(&conn, &new)?;
    println!(
        "Scheduled #{id}: {} on {} {}-{}",
        args.volunteer, new.date, args.start, args.end
    );
    Ok(())
}

pub fn edit(id: i64, date: Option<&str>, start: Option<&str>, end: Option<&str>) -> Result<()> {
    let conn = open_initialized(&get_db_path())?;
    let updated = roster::edit_schedule(
        &conn,
        id,
        date.map(parse_date).transpose()?,
        start.map(parse_time).transpose()?,
        end.map(parse_time).transpose()?,
    )?;
    println!(
        "Updated #{id}: {} {}-{}",
        updated.date,
        updated.start_time.format("%H:%M"),
        updated.end_time.format("%H:%M")
    );
    Ok(())
}

pub fn remove(id: i64) -> Result<()> {
    let conn = open_initialized(&get_db_path())?;
    roster::remove_schedule(&conn, id)?;
    println!("Removed schedule {id}");
    Ok(())
}

pub fn confirm(id: i64) -> Result<()> {
    let conn = open_initialized(&get_db_path())?;
    roster::confirm_schedule(&conn, id)?;
    println!("Confirmed schedule {id}");
    Ok(())
}

pub fn list(ministry: &str, month: &str) -> Result<()> {
    let conn = open_initialized(&get_db_path())?;
    let ministry_id = roster::ministry_id(&conn, ministry)?;
    let (year, month_num) = parse_month(month)?;
    let schedules = roster::list_schedules_for_month(&conn, ministry_id, year, month_num)?;
    let volunteers = roster::list_volunteers(&conn, Some(ministry_id))?;

    if schedules.is_empty() {
        println!("No schedules for {ministry} in {month}.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Start", "End", "Volunteer", "Type", "Confirmed"]);
    for s in &schedules {
        let name = volunteers
            .iter()
            .find(|v| v.id == s.volunteer_id)
            .map(|v| v.name.as_str())
            .unwrap_or("?");
        let confirmed = if s.confirmed { "yes".green() } else { "no".yellow() };
        table.add_row(vec![
            Cell::new(s.id),
            Cell::new(s.date.format("%d/%m/%Y")),
            Cell::new(s.start_time.format("%H:%M")),
            Cell::new(s.end_time.format("%H:%M")),
            Cell::new(name),
            Cell::new(s.schedule_type.as_str()),
            Cell::new(confirmed),
        ]);
    }
    println!("{ministry} - {month}\n{table}");
    Ok(())
}

pub fn check(args: &ShiftArgs<'_>, exclude: Option<i64>) -> Result<()> {
    let conn = open_initialized(&get_db_path())?;
    let ministry_id = roster::ministry_id(&conn, args.ministry)?;
    let volunteer_id = roster::volunteer_id(&conn, ministry_id, args.volunteer)?;
    let date = parse_date(args.date)?;
    let shift = TimeRange::parse(args.start, args.end)?;

    let found = roster::find_conflicts(&conn, ministry_id, volunteer_id, date, &shift, exclude)?;
    if found.is_empty() {
        println!("{} {} is free on {date} {}-{}", "OK".green().bold(), args.volunteer, args.start, args.end);
        return Ok(());
    }
    println!("{} {} already serves:", "CONFLICT".red().bold(), args.volunteer);
    for s in &found {
        println!(
            "  #{} {} {}-{}",
            s.id,
            s.date,
            s.start_time.format("%H:%M"),
            s.end_time.format("%H:%M")
        );
    }
    Err(Igreja360Error::ScheduleConflict(format!(
        "{} overlapping shift(s)",
        found.len()
    )))
}
