use std::path::PathBuf;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{expand_path, load_settings, save_settings};

pub fn run(data_dir: Option<String>, church_name: Option<String>) -> Result<()> {
    let mut settings = load_settings();

    if let Some(dir) = data_dir {
        settings.data_dir = expand_path(&dir);
    }
    if let Some(name) = church_name {
        settings.church_name = name;
    }

    save_settings(&settings)?;

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;
    std::fs::create_dir_all(resolved.join("imports"))?;

    let conn = get_connection(&settings.db_path())?;
    init_db(&conn)?;

    tracing::info!(data_dir = %resolved.display(), "initialized");
    println!("Initialized igreja360 at {}", resolved.display());
    Ok(())
}
