//! `assemble config`: print the default configuration or its path.

use assemble_config::AppConfig;

pub fn run(path: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render(path));
    Ok(())
}

fn render(path: bool) -> String {
    if path {
        AppConfig::config_path().display().to_string()
    } else {
        AppConfig::default_toml()
    }
}
