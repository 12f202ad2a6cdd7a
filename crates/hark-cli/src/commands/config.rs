//! Show the effective configuration and where it comes from.

use anyhow::Result;

use hark_core::Settings;

pub fn run(settings: Settings) -> Result<()> {
    match Settings::path() {
        Some(path) if path.exists() => println!("settings file: {}", path.display()),
        Some(path) => println!("settings file: {} (not present, using defaults)", path.display()),
        None => println!("settings file: <no config directory available>"),
    }
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}
