use comfy_table::{Cell, Table};

use crate::db::open_initialized;
use crate::error::Result;
use crate::roster;
use crate::settings::get_db_path;

pub fn add(name: &str) -> Result<()> {
    let conn = open_initialized(&get_db_path())?;
    roster::add_ministry(&conn, name)?;
    println!("Added ministry: {name}");
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_initialized(&get_db_path())?;
    let rows = roster::list_ministries(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name"]);
    for m in rows {
        table.add_row(vec![Cell::new(m.id), Cell::new(m.name)]);
    }
    println!("Ministries\n{table}");
    Ok(())
}
