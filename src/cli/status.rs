use crate::db::get_connection;
use crate::error::Result;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = settings.db_path();

    println!(
        "Church:     {}",
        if settings.church_name.is_empty() { "(not set)" } else { &settings.church_name }
    );
    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());

    if db_path.exists() {
        let conn = get_connection(&db_path)?;

        let transactions: i64 = conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))?;
        let plans: i64 = conn.query_row(
            "SELECT count(DISTINCT installment_group_id) FROM transactions WHERE installment_group_id IS NOT NULL",
            [],
            |r| r.get(0),
        )?;
        let overdue: i64 = conn.query_row(
            "SELECT count(*) FROM transactions WHERE status = 'overdue'",
            [],
            |r| r.get(0),
        )?;
        let ministries: i64 = conn.query_row("SELECT count(*) FROM ministries", [], |r| r.get(0))?;
        let volunteers: i64 = conn.query_row("SELECT count(*) FROM volunteers", [], |r| r.get(0))?;
        let schedules: i64 = conn.query_row("SELECT count(*) FROM volunteer_schedules", [], |r| r.get(0))?;

        println!();
        println!("Transactions:      {transactions}");
        println!("Installment plans: {plans}");
        println!("Overdue:           {overdue}");
        println!("Ministries:        {ministries}");
        println!("Volunteers:        {volunteers}");
        println!("Schedules:         {schedules}");
    } else {
        println!();
        println!("Database not found. Run `igreja360 init` to set up.");
    }

    Ok(())
}
