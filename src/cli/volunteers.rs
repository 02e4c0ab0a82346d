use comfy_table::{Cell, Table};

use crate::db::open_initialized;
use crate::error::Result;
use crate::roster;
use crate::settings::get_db_path;

pub fn add(name: &str, ministry: &str, phone: Option<&str>, email: Option<&str>) -> Result<()> {
    let conn = open_initialized(&get_db_path())?;
    let ministry_id = roster::ministry_id(&conn, ministry)?;
    roster::add_volunteer(&conn, ministry_id, name, phone, email)?;
    println!("Added volunteer: {name} ({ministry})");
    Ok(())
}

pub fn list(ministry: Option<&str>) -> Result<()> {
    let conn = open_initialized(&get_db_path())?;
    let ministry_id = ministry.map(|m| roster::ministry_id(&conn, m)).transpose()?;
    let ministries = roster::list_ministries(&conn)?;
    let rows = roster::list_volunteers(&conn, ministry_id)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Ministry", "Phone", "Email"]);
    for v in rows {
        let ministry_name = ministries
            .iter()
            .find(|m| m.id == v.ministry_id)
            .map(|m| m.name.clone())
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(v.id),
            Cell::new(v.name),
            Cell::new(ministry_name),
            Cell::new(v.phone.unwrap_or_default()),
            Cell::new(v.email.unwrap_or_default()),
        ]);
    }
    println!("Volunteers\n{table}");
    Ok(())
}
